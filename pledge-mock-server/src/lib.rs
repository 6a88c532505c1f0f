use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, Utc};
use pledge_client::api::{
    Author, AuthToken, CampaignId, Comment, CommentId, CommentPage, CommentUpdate, Error,
    NewComment, PageRequest, Pagination, ReplyPage, Time, UserId,
};

mod http;
pub use http::{router, SharedServer};

mod service;
pub use service::MockService;

pub const MAX_PAGE_SIZE: u32 = 100;

/// Endpoints of the comment API, for failure injection and call counting
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Op {
    FetchComments,
    FetchReplies,
    Create,
    Update,
    Delete,
}

impl Op {
    pub const ALL: [Op; 5] = [
        Op::FetchComments,
        Op::FetchReplies,
        Op::Create,
        Op::Update,
        Op::Delete,
    ];
}

/// In-memory stand-in for the comment backend
pub struct MockServer {
    users: BTreeMap<UserId, MockUser>,
    sessions: HashMap<AuthToken, UserId>,
    comments: BTreeMap<CommentId, Stored>,
    next_seq: u64,
    epoch: Time,
    auto_approve: bool,
    moderator: Option<Box<dyn Fn(&str) -> String + Send + Sync>>,
    failures: HashMap<Op, Error>,
    calls: HashMap<Op, usize>,
}

#[derive(Debug)]
struct MockUser {
    first_name: String,
    last_name: String,
}

#[derive(Debug)]
struct Stored {
    seq: u64,
    comment: Comment,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer {
            users: BTreeMap::new(),
            sessions: HashMap::new(),
            comments: BTreeMap::new(),
            next_seq: 0,
            epoch: Utc::now(),
            auto_approve: true,
            moderator: None,
            failures: HashMap::new(),
            calls: HashMap::new(),
        }
    }

    /// Creates a user along with a session for it
    pub fn admin_create_user(&mut self, first_name: &str, last_name: &str) -> (UserId, AuthToken) {
        let id = UserId::random();
        self.users.insert(
            id.clone(),
            MockUser {
                first_name: String::from(first_name),
                last_name: String::from(last_name),
            },
        );
        let tok = AuthToken::random();
        self.sessions.insert(tok.clone(), id.clone());
        (id, tok)
    }

    /// New comments start unapproved when this is off
    pub fn set_auto_approve(&mut self, auto_approve: bool) {
        self.auto_approve = auto_approve;
    }

    /// Rewrites content on every create and update, like a server-side filter
    pub fn set_moderator<F>(&mut self, f: F)
    where
        F: 'static + Fn(&str) -> String + Send + Sync,
    {
        self.moderator = Some(Box::new(f));
    }

    /// Makes the next call to `op` fail with `err`
    pub fn fail_next(&mut self, op: Op, err: Error) {
        self.failures.insert(op, err);
    }

    /// Number of times `op` was called, including failed calls
    pub fn test_calls(&self, op: Op) -> usize {
        self.calls.get(&op).copied().unwrap_or(0)
    }

    /// Number of comments stored, at any depth
    pub fn test_num_comments(&self) -> usize {
        self.comments.len()
    }

    pub fn test_get_comment(&self, id: &CommentId) -> Option<Comment> {
        self.comments.get(id).map(|s| self.render(&s.comment))
    }

    /// Stores a comment without going through authentication
    pub fn test_insert_comment(
        &mut self,
        author: &UserId,
        campaign: &CampaignId,
        content: &str,
        parent: Option<&CommentId>,
    ) -> CommentId {
        let id = CommentId::random();
        self.store(Comment {
            id: id.clone(),
            campaign_id: campaign.clone(),
            author_id: author.clone(),
            content: String::from(content),
            parent_id: parent.cloned(),
            is_approved: true,
            created_at: self.now(),
            updated_at: self.now(),
            reply_count: 0,
            user: None,
            replies: Vec::new(),
        });
        id
    }

    fn store(&mut self, mut comment: Comment) {
        // dates follow insertion order
        let date = self.date_for(self.next_seq);
        comment.created_at = date;
        comment.updated_at = date;
        self.comments.insert(
            comment.id.clone(),
            Stored {
                seq: self.next_seq,
                comment,
            },
        );
        self.next_seq += 1;
    }

    fn date_for(&self, seq: u64) -> Time {
        self.epoch + Duration::seconds(seq as i64)
    }

    fn now(&self) -> Time {
        self.date_for(self.next_seq)
    }

    fn enter(&mut self, op: Op) -> Result<(), Error> {
        *self.calls.entry(op).or_insert(0) += 1;
        match self.failures.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn resolve(&self, tok: Option<&AuthToken>) -> Result<UserId, Error> {
        let tok = tok.ok_or(Error::Unauthenticated)?;
        self.sessions
            .get(tok)
            .cloned()
            .ok_or(Error::Unauthenticated)
    }

    fn moderate(&self, content: &str) -> String {
        match &self.moderator {
            Some(f) => f(content),
            None => String::from(content),
        }
    }

    /// The comment as returned on the wire: with author and reply count, and
    /// without replies
    fn render(&self, c: &Comment) -> Comment {
        let reply_count = self
            .comments
            .values()
            .filter(|s| s.comment.parent_id.as_ref() == Some(&c.id))
            .count() as u32;
        let user = self.users.get(&c.author_id).map(|u| Author {
            id: c.author_id.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            avatar: None,
        });
        Comment {
            reply_count,
            user,
            replies: Vec::new(),
            ..c.clone()
        }
    }

    fn paginate<'a, I>(&self, all: I, page: PageRequest) -> Result<(Vec<Comment>, Pagination), Error>
    where
        I: Iterator<Item = &'a Stored>,
    {
        if page.page == 0 || page.limit == 0 || page.limit > MAX_PAGE_SIZE {
            return Err(Error::BadRequest(format!(
                "invalid pagination: page {} with limit {}",
                page.page, page.limit
            )));
        }
        let all: Vec<&Stored> = all.collect();
        let pagination = Pagination::compute(page, all.len() as u32);
        let items = all
            .into_iter()
            .skip(page.offset())
            .take(page.limit as usize)
            .map(|s| self.render(&s.comment))
            .collect();
        Ok((items, pagination))
    }

    /// Top-level comments, most recent first
    pub fn fetch_comments(
        &mut self,
        campaign: &CampaignId,
        page: PageRequest,
    ) -> Result<CommentPage, Error> {
        self.enter(Op::FetchComments)?;
        let mut roots: Vec<&Stored> = self
            .comments
            .values()
            .filter(|s| s.comment.campaign_id == *campaign && s.comment.parent_id.is_none())
            .collect();
        roots.sort_unstable_by_key(|s| std::cmp::Reverse(s.seq));
        let (comments, pagination) = self.paginate(roots.into_iter(), page)?;
        Ok(CommentPage {
            comments,
            pagination,
        })
    }

    /// Direct replies, oldest first
    pub fn fetch_replies(
        &mut self,
        parent: &CommentId,
        page: PageRequest,
    ) -> Result<ReplyPage, Error> {
        self.enter(Op::FetchReplies)?;
        if !self.comments.contains_key(parent) {
            return Err(Error::NotFound(parent.clone()));
        }
        let mut replies: Vec<&Stored> = self
            .comments
            .values()
            .filter(|s| s.comment.parent_id.as_ref() == Some(parent))
            .collect();
        replies.sort_unstable_by_key(|s| s.seq);
        let (replies, pagination) = self.paginate(replies.into_iter(), page)?;
        Ok(ReplyPage {
            replies,
            pagination,
        })
    }

    pub fn create_comment(
        &mut self,
        tok: Option<&AuthToken>,
        c: NewComment,
    ) -> Result<Comment, Error> {
        self.enter(Op::Create)?;
        let author = self.resolve(tok)?;
        c.validate()?;
        if let Some(parent) = &c.parent_id {
            let parent = self
                .comments
                .get(parent)
                .ok_or_else(|| Error::NotFound(parent.clone()))?;
            if parent.comment.campaign_id != c.campaign_id {
                return Err(Error::BadRequest(String::from(
                    "parent comment belongs to another campaign",
                )));
            }
        }
        let id = CommentId::random();
        let now = self.now();
        let content = self.moderate(c.content.trim());
        self.store(Comment {
            id: id.clone(),
            campaign_id: c.campaign_id,
            author_id: author,
            content,
            parent_id: c.parent_id,
            is_approved: self.auto_approve,
            created_at: now,
            updated_at: now,
            reply_count: 0,
            user: None,
            replies: Vec::new(),
        });
        self.test_get_comment(&id)
            .ok_or_else(|| Error::Unknown(String::from("comment vanished after insertion")))
    }

    pub fn update_comment(
        &mut self,
        tok: Option<&AuthToken>,
        id: &CommentId,
        u: CommentUpdate,
    ) -> Result<Comment, Error> {
        self.enter(Op::Update)?;
        let user = self.resolve(tok)?;
        u.validate()?;
        let content = self.moderate(u.content.trim());
        let now = self.now();
        let stored = self
            .comments
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        if stored.comment.author_id != user {
            return Err(Error::PermissionDenied);
        }
        stored.comment.content = content;
        stored.comment.updated_at = now;
        let updated = stored.comment.clone();
        Ok(self.render(&updated))
    }

    /// Deletes a comment and all of its replies
    pub fn delete_comment(&mut self, tok: Option<&AuthToken>, id: &CommentId) -> Result<(), Error> {
        self.enter(Op::Delete)?;
        let user = self.resolve(tok)?;
        let stored = self
            .comments
            .get(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        if stored.comment.author_id != user {
            return Err(Error::PermissionDenied);
        }
        let mut to_remove = vec![id.clone()];
        while let Some(id) = to_remove.pop() {
            self.comments.remove(&id);
            to_remove.extend(
                self.comments
                    .values()
                    .filter(|s| s.comment.parent_id.as_ref() == Some(&id))
                    .map(|s| s.comment.id.clone()),
            );
        }
        Ok(())
    }

    /// Fills a campaign with a few threads of placeholder text
    pub fn seed_demo(&mut self, campaign: &CampaignId, threads: usize) -> Vec<UserId> {
        let authors: Vec<UserId> = [("Ada", "Lovelace"), ("Grace", "Hopper"), ("Alan", "Turing")]
            .iter()
            .map(|(first, last)| self.admin_create_user(first, last).0)
            .collect();
        for i in 0..threads {
            let author = &authors[i % authors.len()];
            let top = self.test_insert_comment(author, campaign, &lipsum::lipsum(12 + i % 7), None);
            let mut parent = top;
            for depth in 0..(i % 4) {
                let author = &authors[(i + depth + 1) % authors.len()];
                parent = self.test_insert_comment(
                    author,
                    campaign,
                    &lipsum::lipsum(5 + depth),
                    Some(&parent),
                );
            }
        }
        authors
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}
