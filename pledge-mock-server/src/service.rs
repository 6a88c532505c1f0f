use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use pledge_client::{
    api::{
        AuthToken, CampaignId, Comment, CommentId, CommentPage, CommentUpdate, NewComment,
        PageRequest, ReplyPage,
    },
    CommentService, Error,
};
use tokio::sync::{Mutex, OwnedRwLockWriteGuard, RwLock};

use crate::{MockServer, Op, SharedServer};

/// In-process `CommentService` for one user of a shared `MockServer`
#[derive(Clone)]
pub struct MockService {
    server: SharedServer,
    token: Option<AuthToken>,
    gate: Arc<RwLock<()>>,
    op_gates: Arc<HashMap<Op, Arc<RwLock<()>>>>,
}

impl MockService {
    pub fn new(server: SharedServer, token: Option<AuthToken>) -> MockService {
        MockService {
            server,
            token,
            gate: Arc::new(RwLock::new(())),
            op_gates: Arc::new(
                Op::ALL
                    .into_iter()
                    .map(|op| (op, Arc::new(RwLock::new(()))))
                    .collect(),
            ),
        }
    }

    /// Builds a fresh server and an anonymous service on it
    pub fn standalone() -> (MockService, SharedServer) {
        let server = Arc::new(Mutex::new(MockServer::new()));
        (MockService::new(server.clone(), None), server)
    }

    /// Same server and gate, other user
    pub fn as_user(&self, token: Option<AuthToken>) -> MockService {
        MockService {
            server: self.server.clone(),
            token,
            gate: self.gate.clone(),
            op_gates: self.op_gates.clone(),
        }
    }

    pub fn server(&self) -> &SharedServer {
        &self.server
    }

    /// Requests block until the returned guard is dropped
    pub async fn hold(&self) -> OwnedRwLockWriteGuard<()> {
        self.gate.clone().write_owned().await
    }

    /// Requests to `op` block until the returned guard is dropped, others go through
    pub async fn hold_op(&self, op: Op) -> OwnedRwLockWriteGuard<()> {
        self.op_gates[&op].clone().write_owned().await
    }

    async fn server_lock(&self, op: Op) -> tokio::sync::MutexGuard<'_, MockServer> {
        // interleave with concurrently spawned callers
        tokio::task::yield_now().await;
        let _gate = self.gate.read().await;
        let _op_gate = self.op_gates[&op].read().await;
        self.server.lock().await
    }
}

#[async_trait]
impl CommentService for MockService {
    async fn fetch_comments(
        &self,
        campaign: &CampaignId,
        page: PageRequest,
    ) -> Result<CommentPage, Error> {
        tracing::trace!(%campaign, ?page, "mock fetch_comments");
        Ok(self.server_lock(Op::FetchComments).await.fetch_comments(campaign, page)?)
    }

    async fn fetch_replies(
        &self,
        parent: &CommentId,
        page: PageRequest,
    ) -> Result<ReplyPage, Error> {
        tracing::trace!(%parent, ?page, "mock fetch_replies");
        Ok(self.server_lock(Op::FetchReplies).await.fetch_replies(parent, page)?)
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, Error> {
        Ok(self
            .server_lock(Op::Create)
            .await
            .create_comment(self.token.as_ref(), comment)?)
    }

    async fn update_comment(
        &self,
        id: &CommentId,
        update: CommentUpdate,
    ) -> Result<Comment, Error> {
        Ok(self
            .server_lock(Op::Update)
            .await
            .update_comment(self.token.as_ref(), id, update)?)
    }

    async fn delete_comment(&self, id: &CommentId) -> Result<(), Error> {
        Ok(self
            .server_lock(Op::Delete)
            .await
            .delete_comment(self.token.as_ref(), id)?)
    }
}
