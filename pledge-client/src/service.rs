use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    api::{
        CampaignId, Comment, CommentId, CommentPage, CommentUpdate, NewComment, PageRequest,
        ReplyPage,
    },
    Error,
};

/// The remote comment API, as seen from one client
#[async_trait]
pub trait CommentService: Send + Sync {
    /// Top-level comments of a campaign, most recent first
    async fn fetch_comments(
        &self,
        campaign: &CampaignId,
        page: PageRequest,
    ) -> Result<CommentPage, Error>;

    async fn fetch_replies(&self, parent: &CommentId, page: PageRequest)
        -> Result<ReplyPage, Error>;

    /// Returns the canonical record as stored by the server
    async fn create_comment(&self, comment: NewComment) -> Result<Comment, Error>;

    async fn update_comment(&self, id: &CommentId, update: CommentUpdate)
        -> Result<Comment, Error>;

    async fn delete_comment(&self, id: &CommentId) -> Result<(), Error>;
}

#[async_trait]
impl<T: CommentService + ?Sized> CommentService for Arc<T> {
    async fn fetch_comments(
        &self,
        campaign: &CampaignId,
        page: PageRequest,
    ) -> Result<CommentPage, Error> {
        (**self).fetch_comments(campaign, page).await
    }

    async fn fetch_replies(
        &self,
        parent: &CommentId,
        page: PageRequest,
    ) -> Result<ReplyPage, Error> {
        (**self).fetch_replies(parent, page).await
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, Error> {
        (**self).create_comment(comment).await
    }

    async fn update_comment(
        &self,
        id: &CommentId,
        update: CommentUpdate,
    ) -> Result<Comment, Error> {
        (**self).update_comment(id, update).await
    }

    async fn delete_comment(&self, id: &CommentId) -> Result<(), Error> {
        (**self).delete_comment(id).await
    }
}
