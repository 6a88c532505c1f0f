//! Pure operations over a comment tree.
//!
//! A tree is the ordered list of comments held by one campaign view, each
//! carrying its loaded replies. Every operation returns a fresh tree and leaves
//! its input untouched, so a view can swap its whole state in one assignment.
//! Targeting an id that is not in the tree is never an error: the returned tree
//! is then equal to the input.

use crate::api::{Comment, CommentId};

/// Depth-first search through all loaded replies
pub fn find<'a>(tree: &'a [Comment], id: &CommentId) -> Option<&'a Comment> {
    for c in tree {
        if c.id == *id {
            return Some(c);
        }
        if let Some(res) = find(&c.replies, id) {
            return Some(res);
        }
    }
    None
}

pub fn contains(tree: &[Comment], id: &CommentId) -> bool {
    find(tree, id).is_some()
}

/// Number of nodes held locally, at any depth
pub fn count(tree: &[Comment]) -> usize {
    tree.iter().map(|c| 1 + count(&c.replies)).sum()
}

/// Rebuilds `tree` with `f` applied to the first node with id `id`
fn map_node<F>(tree: &[Comment], id: &CommentId, f: F) -> Vec<Comment>
where
    F: FnOnce(&Comment) -> Comment,
{
    let mut f = Some(f);
    map_node_impl(tree, id, &mut f)
}

fn map_node_impl<F>(tree: &[Comment], id: &CommentId, f: &mut Option<F>) -> Vec<Comment>
where
    F: FnOnce(&Comment) -> Comment,
{
    tree.iter()
        .map(|c| {
            if f.is_none() {
                return c.clone();
            }
            if c.id == *id {
                if let Some(f) = f.take() {
                    return f(c);
                }
            }
            if c.replies.is_empty() {
                return c.clone();
            }
            Comment {
                replies: map_node_impl(&c.replies, id, f),
                ..shallow_clone(c)
            }
        })
        .collect()
}

/// Clones everything but the replies
fn shallow_clone(c: &Comment) -> Comment {
    Comment {
        id: c.id.clone(),
        campaign_id: c.campaign_id.clone(),
        author_id: c.author_id.clone(),
        content: c.content.clone(),
        parent_id: c.parent_id.clone(),
        is_approved: c.is_approved,
        created_at: c.created_at,
        updated_at: c.updated_at,
        reply_count: c.reply_count,
        user: c.user.clone(),
        replies: Vec::new(),
    }
}

pub fn set_replies(tree: &[Comment], parent: &CommentId, replies: Vec<Comment>) -> Vec<Comment> {
    map_node(tree, parent, move |c| Comment {
        replies,
        ..shallow_clone(c)
    })
}

pub fn append_reply(tree: &[Comment], parent: &CommentId, reply: Comment) -> Vec<Comment> {
    map_node(tree, parent, move |c| {
        let mut c = c.clone();
        c.replies.push(reply);
        c
    })
}

/// Replaces the content only, keeping every other field and the replies
pub fn update_content(tree: &[Comment], id: &CommentId, content: &str) -> Vec<Comment> {
    map_node(tree, id, |c| {
        let mut c = c.clone();
        c.content = String::from(content);
        c
    })
}

/// Saturating adjustment of a node's `reply_count`
pub fn adjust_reply_count(tree: &[Comment], id: &CommentId, delta: i64) -> Vec<Comment> {
    map_node(tree, id, |c| {
        let mut c = c.clone();
        let count = (c.reply_count as i64).saturating_add(delta);
        c.reply_count = count.clamp(0, u32::MAX as i64) as u32;
        c
    })
}

/// Removes every node with id `id` along with its subtree
pub fn remove(tree: &[Comment], id: &CommentId) -> Vec<Comment> {
    tree.iter()
        .filter(|c| c.id != *id)
        .map(|c| {
            if c.replies.is_empty() {
                return c.clone();
            }
            Comment {
                replies: remove(&c.replies, id),
                ..shallow_clone(c)
            }
        })
        .collect()
}
