use std::{future::Future, sync::Arc};

use futures::{
    channel::{mpsc, oneshot},
    future::{self, Either, FutureExt, Shared},
    pin_mut,
};
use parking_lot::Mutex;

use crate::{
    api::{CampaignId, Comment, CommentId, CommentUpdate, NewComment, PageRequest, UserId},
    tree, ClientConfig, CommentService, Composer, Error, Notice, Notices, Snapshot,
};

/// What `CommentView::toggle_replies` did
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Toggle {
    Collapsed,
    Expanded,
    /// Replies are already being fetched, nothing was done
    AlreadyLoading,
    /// No such comment in the thread
    NotFound,
}

/// The comment section of one campaign page.
///
/// Holds the thread as last confirmed by the server, and routes user input
/// to the `CommentService`. The tree is only ever modified once the server has
/// answered, and always with the server's version of the data.
///
/// All methods take `&self`, so several requests can be in flight at once;
/// the internal lock is never held across a request.
pub struct CommentView<S> {
    service: S,
    campaign: CampaignId,
    page_size: u32,
    reply_page_size: u32,
    state: Mutex<Snapshot>,
    notices: mpsc::UnboundedSender<Notice>,
    canceller: Mutex<Option<oneshot::Sender<()>>>,
    cancelled: Shared<oneshot::Receiver<()>>,
}

impl<S: CommentService> CommentView<S> {
    pub fn new(
        service: S,
        campaign: CampaignId,
        viewer: Option<UserId>,
        config: &ClientConfig,
    ) -> (CommentView<S>, Notices) {
        let (notices, notice_receiver) = mpsc::unbounded();
        let (canceller, cancelled) = oneshot::channel();
        let view = CommentView {
            service,
            campaign,
            page_size: config.page_size,
            reply_page_size: config.reply_page_size,
            state: Mutex::new(Snapshot {
                viewer,
                page: 1,
                ..Snapshot::default()
            }),
            notices,
            canceller: Mutex::new(Some(canceller)),
            cancelled: cancelled.shared(),
        };
        (view, notice_receiver)
    }

    pub fn campaign(&self) -> &CampaignId {
        &self.campaign
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.lock().clone()
    }

    pub fn comments(&self) -> Arc<Vec<Comment>> {
        self.state.lock().comments.clone()
    }

    pub fn find(&self, id: &CommentId) -> Option<Comment> {
        tree::find(&self.state.lock().comments, id).cloned()
    }

    /// Stops the view: every in-flight request resolves to `Error::Cancelled`
    /// and leaves the state as it was
    pub fn close(&self) {
        if self.canceller.lock().take().is_some() {
            tracing::debug!(campaign = %self.campaign, "closing comment view");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.canceller.lock().is_none()
    }

    async fn cancellable<T, F>(&self, fut: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        if self.is_closed() {
            return Err(Error::Cancelled);
        }
        pin_mut!(fut);
        match future::select(fut, self.cancelled.clone()).await {
            Either::Left(_) if self.is_closed() => Err(Error::Cancelled),
            Either::Left((res, _)) => res,
            Either::Right(_) => Err(Error::Cancelled),
        }
    }

    fn notify(&self, notice: Notice) {
        // the receiver may have been dropped by a caller that does not show notices
        let _ = self.notices.unbounded_send(notice);
    }

    fn report(&self, what: &'static str, err: &Error) {
        tracing::error!(campaign = %self.campaign, ?err, "{what}");
        self.notify(Notice::error(what));
    }

    /// Initial load: the first page of top-level comments
    pub async fn open(&self) -> Result<(), Error> {
        self.fetch_page(1, false).await
    }

    pub async fn load_more(&self) -> Result<(), Error> {
        let next = {
            let state = self.state.lock();
            if !state.has_more {
                return Err(Error::Disabled("there are no more comments"));
            }
            state.page + 1
        };
        self.fetch_page(next, true).await
    }

    /// Fetches one page of top-level comments, either replacing the held
    /// thread or appending to it
    pub async fn fetch_page(&self, page: u32, append: bool) -> Result<(), Error> {
        {
            let mut state = self.state.lock();
            if state.loading {
                return Err(Error::Disabled("comments are already loading"));
            }
            state.loading = true;
        }
        tracing::debug!(campaign = %self.campaign, page, append, "fetching comments");
        let res = self
            .cancellable(
                self.service
                    .fetch_comments(&self.campaign, PageRequest::new(page, self.page_size)),
            )
            .await;
        if let Err(Error::Cancelled) = res {
            return Err(Error::Cancelled);
        }

        let mut state = self.state.lock();
        state.loading = false;
        match res {
            Ok(fetched) => {
                let comments = match append {
                    true => {
                        // comments posted since the last page shift the server's
                        // offsets, so the head of this page may already be held
                        let mut all = Vec::clone(&state.comments);
                        for c in fetched.comments {
                            if tree::contains(&all, &c.id) {
                                tracing::debug!(comment = %c.id, "skipping comment already held");
                                continue;
                            }
                            all.push(c);
                        }
                        all
                    }
                    false => {
                        // a fresh load drops every reply fetched so far; reply
                        // fetches still in flight stay deduplicated
                        state.expanded.clear();
                        fetched.comments
                    }
                };
                state.comments = Arc::new(comments);
                state.has_more = fetched.pagination.has_next;
                state.page = page;
                Ok(())
            }
            Err(err) => {
                drop(state);
                self.report("Failed to load comments", &err);
                Err(err)
            }
        }
    }

    /// Shows or hides the replies of a comment, fetching them the first time
    /// they are shown if the server reports some
    pub async fn toggle_replies(&self, id: &CommentId) -> Result<Toggle, Error> {
        {
            let mut state = self.state.lock();
            if state.expanded.remove(id) {
                return Ok(Toggle::Collapsed);
            }
            let needs_fetch = match tree::find(&state.comments, id) {
                None => return Ok(Toggle::NotFound),
                Some(c) => c.replies_pending(),
            };
            if !needs_fetch {
                state.expanded.insert(id.clone());
                return Ok(Toggle::Expanded);
            }
            if !state.loading_replies.insert(id.clone()) {
                return Ok(Toggle::AlreadyLoading);
            }
        }

        tracing::debug!(comment = %id, "fetching replies");
        let res = self
            .cancellable(
                self.service
                    .fetch_replies(id, PageRequest::new(1, self.reply_page_size)),
            )
            .await;
        if let Err(Error::Cancelled) = res {
            return Err(Error::Cancelled);
        }

        let mut state = self.state.lock();
        match res {
            Ok(page) => {
                if !tree::contains(&state.comments, id) {
                    tracing::warn!(comment = %id, "fetched replies for a comment no longer in the thread");
                }
                state.comments = Arc::new(tree::set_replies(&state.comments, id, page.replies));
                state.expanded.insert(id.clone());
                state.loading_replies.remove(id);
                Ok(Toggle::Expanded)
            }
            Err(err) => {
                state.loading_replies.remove(id);
                drop(state);
                self.report("Failed to load replies", &err);
                Err(err)
            }
        }
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.state.lock().new_comment.draft = text.into();
    }

    /// Opens the reply form under `id`, or closes it if it was already open there
    pub fn start_reply(&self, id: &CommentId) -> Result<(), Error> {
        let mut state = self.state.lock();
        if matches!(&state.reply, Some((open, _)) if open == id) {
            state.reply = None;
            return Ok(());
        }
        let target = tree::find(&state.comments, id).ok_or(Error::Disabled("no such comment"))?;
        if state.viewer.is_none() {
            return Err(Error::unauthenticated());
        }
        if !state.can_reply_to(target) {
            return Err(Error::Disabled("cannot reply to your own comment"));
        }
        state.reply = Some((id.clone(), Composer::default()));
        Ok(())
    }

    pub fn cancel_reply(&self) {
        self.state.lock().reply = None;
    }

    pub fn set_reply_draft(&self, text: impl Into<String>) -> Result<(), Error> {
        match &mut self.state.lock().reply {
            Some((_, form)) => {
                form.draft = text.into();
                Ok(())
            }
            None => Err(Error::Disabled("no reply form is open")),
        }
    }

    /// Posts the new-comment draft as a top-level comment
    pub async fn submit(&self) -> Result<Comment, Error> {
        let content = {
            let mut state = self.state.lock();
            if state.viewer.is_none() {
                return Err(Error::unauthenticated());
            }
            state.new_comment.begin()?
        };
        let res = self
            .cancellable(self.service.create_comment(NewComment {
                campaign_id: self.campaign.clone(),
                content,
                parent_id: None,
            }))
            .await;
        if let Err(Error::Cancelled) = res {
            return Err(Error::Cancelled);
        }

        let mut state = self.state.lock();
        match res {
            Ok(comment) => {
                state.new_comment.succeed();
                // the thread is ordered most recent first
                let mut comments = Vec::with_capacity(state.comments.len() + 1);
                comments.push(Comment {
                    replies: Vec::new(),
                    ..comment.clone()
                });
                comments.extend(state.comments.iter().cloned());
                state.comments = Arc::new(comments);
                drop(state);
                self.notify(Notice::success(
                    "Comment posted",
                    "Your comment has been posted successfully.",
                ));
                Ok(comment)
            }
            Err(err) => {
                state.new_comment.fail(err.to_string());
                drop(state);
                self.report("Failed to post comment", &err);
                Err(err)
            }
        }
    }

    /// Posts the reply form's draft under its target comment
    pub async fn submit_reply(&self) -> Result<Comment, Error> {
        let (parent, content) = {
            let mut state = self.state.lock();
            if state.viewer.is_none() {
                return Err(Error::unauthenticated());
            }
            let (parent, form) = state
                .reply
                .as_mut()
                .ok_or(Error::Disabled("no reply form is open"))?;
            (parent.clone(), form.begin()?)
        };
        let res = self
            .cancellable(self.service.create_comment(NewComment {
                campaign_id: self.campaign.clone(),
                content,
                parent_id: Some(parent.clone()),
            }))
            .await;
        if let Err(Error::Cancelled) = res {
            return Err(Error::Cancelled);
        }

        let mut state = self.state.lock();
        match res {
            Ok(reply) => {
                if matches!(&state.reply, Some((target, _)) if *target == parent) {
                    state.reply = None;
                }
                let pending = match tree::find(&state.comments, &parent) {
                    Some(c) => c.replies_pending(),
                    None => {
                        tracing::warn!(comment = %parent, "posted reply under a comment no longer in the thread");
                        false
                    }
                };
                let comments = tree::adjust_reply_count(&state.comments, &parent, 1);
                if !pending {
                    state.comments = Arc::new(tree::append_reply(&comments, &parent, reply.clone()));
                    state.expanded.insert(parent);
                    drop(state);
                    self.notify(Notice::success(
                        "Reply posted",
                        "Your reply has been posted successfully.",
                    ));
                    return Ok(reply);
                }

                // the parent's other replies were never fetched: fetch them all
                // now so the new reply does not hide them
                state.comments = Arc::new(comments);
                let fetching = state.loading_replies.insert(parent.clone());
                drop(state);
                self.notify(Notice::success(
                    "Reply posted",
                    "Your reply has been posted successfully.",
                ));
                self.merge_replies_after_reply(parent, reply, fetching).await
            }
            Err(err) => {
                if let Some((target, form)) = &mut state.reply {
                    if *target == parent {
                        form.fail(err.to_string());
                    }
                }
                drop(state);
                self.report("Failed to post reply", &err);
                Err(err)
            }
        }
    }

    async fn merge_replies_after_reply(
        &self,
        parent: CommentId,
        reply: Comment,
        fetching: bool,
    ) -> Result<Comment, Error> {
        tracing::debug!(comment = %parent, "fetching replies after posting a reply");
        let res = self
            .cancellable(
                self.service
                    .fetch_replies(&parent, PageRequest::new(1, self.reply_page_size)),
            )
            .await;
        if let Err(Error::Cancelled) = res {
            return Err(Error::Cancelled);
        }

        let mut state = self.state.lock();
        if fetching {
            state.loading_replies.remove(&parent);
        }
        let failure = match res {
            Ok(page) => {
                let mut replies = page.replies;
                if !replies.iter().any(|r| r.id == reply.id) {
                    replies.push(reply.clone());
                }
                state.comments = Arc::new(tree::set_replies(&state.comments, &parent, replies));
                None
            }
            Err(err) => {
                state.comments =
                    Arc::new(tree::append_reply(&state.comments, &parent, reply.clone()));
                Some(err)
            }
        };
        state.expanded.insert(parent);
        drop(state);
        if let Some(err) = failure {
            self.report("Failed to load replies", &err);
        }
        Ok(reply)
    }

    /// Enters edit mode on one of the viewer's comments, seeding the draft with
    /// its current content
    pub fn start_edit(&self, id: &CommentId) -> Result<(), Error> {
        let mut state = self.state.lock();
        let target = tree::find(&state.comments, id).ok_or(Error::Disabled("no such comment"))?;
        if state.viewer.is_none() {
            return Err(Error::unauthenticated());
        }
        if !state.can_modify(target) {
            return Err(Error::Disabled("only the author can edit this comment"));
        }
        let draft = target.content.clone();
        state.edit = Some((id.clone(), Composer::with_draft(draft)));
        Ok(())
    }

    pub fn cancel_edit(&self) {
        self.state.lock().edit = None;
    }

    pub fn set_edit_draft(&self, text: impl Into<String>) -> Result<(), Error> {
        match &mut self.state.lock().edit {
            Some((_, form)) => {
                form.draft = text.into();
                Ok(())
            }
            None => Err(Error::Disabled("no comment is being edited")),
        }
    }

    /// Sends the edit draft; the thread then shows the content as returned by
    /// the server, which may differ from the draft
    pub async fn save_edit(&self) -> Result<Comment, Error> {
        let (id, content) = {
            let mut state = self.state.lock();
            let (id, form) = state
                .edit
                .as_mut()
                .ok_or(Error::Disabled("no comment is being edited"))?;
            (id.clone(), form.begin()?)
        };
        let res = self
            .cancellable(self.service.update_comment(&id, CommentUpdate { content }))
            .await;
        if let Err(Error::Cancelled) = res {
            return Err(Error::Cancelled);
        }

        let mut state = self.state.lock();
        match res {
            Ok(updated) => {
                if matches!(&state.edit, Some((target, _)) if *target == id) {
                    state.edit = None;
                }
                state.comments = Arc::new(tree::update_content(
                    &state.comments,
                    &id,
                    &updated.content,
                ));
                drop(state);
                self.notify(Notice::success(
                    "Comment updated",
                    "Your comment has been updated successfully.",
                ));
                Ok(updated)
            }
            Err(err) => {
                if let Some((target, form)) = &mut state.edit {
                    if *target == id {
                        form.fail(err.to_string());
                    }
                }
                drop(state);
                self.report("Failed to update comment", &err);
                Err(err)
            }
        }
    }

    /// Asks for deletion of a comment; nothing is sent until `confirm_delete`
    pub fn request_delete(&self, id: &CommentId) -> Result<(), Error> {
        let mut state = self.state.lock();
        let target = tree::find(&state.comments, id).ok_or(Error::Disabled("no such comment"))?;
        if !state.can_modify(target) {
            return Err(Error::Disabled("only the author can delete this comment"));
        }
        state.pending_delete = Some(id.clone());
        Ok(())
    }

    pub fn cancel_delete(&self) {
        self.state.lock().pending_delete = None;
    }

    /// Deletes the comment awaiting confirmation, with all its replies
    pub async fn confirm_delete(&self) -> Result<(), Error> {
        let id = self
            .state
            .lock()
            .pending_delete
            .take()
            .ok_or(Error::Disabled("no deletion was requested"))?;
        let res = self.cancellable(self.service.delete_comment(&id)).await;
        if let Err(Error::Cancelled) = res {
            return Err(Error::Cancelled);
        }

        match res {
            Ok(()) => {
                let mut state = self.state.lock();
                let parent = tree::find(&state.comments, &id).and_then(|c| c.parent_id.clone());
                let mut comments = tree::remove(&state.comments, &id);
                if let Some(parent) = parent {
                    comments = tree::adjust_reply_count(&comments, &parent, -1);
                }
                state.comments = Arc::new(comments);
                state.expanded.remove(&id);
                if matches!(&state.edit, Some((target, _)) if *target == id) {
                    state.edit = None;
                }
                if matches!(&state.reply, Some((target, _)) if *target == id) {
                    state.reply = None;
                }
                drop(state);
                self.notify(Notice::success(
                    "Comment deleted",
                    "Your comment has been deleted successfully.",
                ));
                Ok(())
            }
            Err(err) => {
                self.report("Failed to delete comment", &err);
                Err(err)
            }
        }
    }
}
