use std::{collections::HashSet, sync::Arc};

use crate::{
    api::{Comment, CommentId, UserId},
    tree, Composer,
};

/// Replies deeper than this are drawn at this indentation
pub const MAX_INDENT: usize = 6;

/// Everything a campaign's comment section displays, at one point in time
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub comments: Arc<Vec<Comment>>,
    pub viewer: Option<UserId>,

    pub page: u32,
    pub has_more: bool,
    pub loading: bool,

    pub expanded: HashSet<CommentId>,
    pub loading_replies: HashSet<CommentId>,

    pub new_comment: Composer,
    /// At most one reply form is open
    pub reply: Option<(CommentId, Composer)>,
    /// At most one comment is in edit mode
    pub edit: Option<(CommentId, Composer)>,
    /// Deletion awaiting the user's confirmation
    pub pending_delete: Option<CommentId>,
}

/// One line of the rendered thread
#[derive(Clone, Debug, PartialEq)]
pub struct Row<'a> {
    pub comment: &'a Comment,
    pub depth: usize,
    pub expanded: bool,
    pub loading_replies: bool,
    pub can_reply: bool,
    pub can_modify: bool,
    pub replying: bool,
    pub editing: bool,
    pub delete_pending: bool,
}

impl Row<'_> {
    /// The reply toggle only shows for comments the server says have replies
    pub fn shows_reply_toggle(&self) -> bool {
        self.comment.has_replies()
    }

    pub fn pending_approval(&self) -> bool {
        !self.comment.is_approved
    }
}

impl Snapshot {
    pub fn find(&self, id: &CommentId) -> Option<&Comment> {
        tree::find(&self.comments, id)
    }

    pub fn roots(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(|c| c.is_top_level())
    }

    /// Count shown in the section header
    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    pub fn is_expanded(&self, id: &CommentId) -> bool {
        self.expanded.contains(id)
    }

    pub fn is_loading_replies(&self, id: &CommentId) -> bool {
        self.loading_replies.contains(id)
    }

    /// Signed-in users can reply to anyone but themselves
    pub fn can_reply_to(&self, c: &Comment) -> bool {
        matches!(&self.viewer, Some(v) if !c.is_authored_by(v))
    }

    /// Edit and delete are only offered to the author
    pub fn can_modify(&self, c: &Comment) -> bool {
        matches!(&self.viewer, Some(v) if c.is_authored_by(v))
    }

    pub fn rows(&self) -> Vec<Row<'_>> {
        let mut res = Vec::new();
        for c in self.roots() {
            self.push_rows(&mut res, c, 0);
        }
        res
    }

    fn push_rows<'a>(&'a self, res: &mut Vec<Row<'a>>, c: &'a Comment, depth: usize) {
        let expanded = self.is_expanded(&c.id);
        res.push(Row {
            comment: c,
            depth,
            expanded,
            loading_replies: self.is_loading_replies(&c.id),
            can_reply: self.can_reply_to(c),
            can_modify: self.can_modify(c),
            replying: matches!(&self.reply, Some((id, _)) if *id == c.id),
            editing: matches!(&self.edit, Some((id, _)) if *id == c.id),
            delete_pending: self.pending_delete.as_ref() == Some(&c.id),
        });
        if expanded {
            for r in &c.replies {
                self.push_rows(res, r, (depth + 1).min(MAX_INDENT));
            }
        }
    }
}
