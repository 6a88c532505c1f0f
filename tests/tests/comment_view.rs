use std::time::Duration;

use pledge_client::{
    api::{CommentId, Error as ApiError},
    Error, FormState, NoticeKind, Toggle,
};
use tests::{drain, Harness, Op};

#[tokio::test]
async fn pages_load_most_recent_first() {
    let h = Harness::new();
    let mut ids = Vec::new();
    for i in 0..20 {
        ids.push(h.insert(&h.alice, &format!("comment {i}"), None).await);
    }
    let (view, _) = h.view(None);

    view.open().await.unwrap();
    let s = view.snapshot();
    assert_eq!(s.comment_count(), 10);
    assert_eq!(s.comments[0].id, ids[19]);
    assert_eq!(s.comments[9].id, ids[10]);
    assert!(s.has_more);
    assert_eq!(s.page, 1);
    assert!(!s.loading);

    view.load_more().await.unwrap();
    let s = view.snapshot();
    assert_eq!(s.comment_count(), 20);
    let expected: Vec<CommentId> = ids.iter().rev().cloned().collect();
    let got: Vec<CommentId> = s.comments.iter().map(|c| c.id.clone()).collect();
    assert_eq!(got, expected);
    assert!(!s.has_more);
    assert_eq!(s.page, 2);

    assert!(view.load_more().await.unwrap_err().is_disabled());
    assert_eq!(h.calls(Op::FetchComments).await, 2);
}

#[tokio::test]
async fn reopening_replaces_the_thread() {
    let h = Harness::new();
    let c1 = h.insert(&h.alice, "first", None).await;
    h.insert(&h.bob, "reply", Some(&c1)).await;
    let (view, _) = h.view(None);
    view.open().await.unwrap();
    assert_eq!(view.toggle_replies(&c1).await.unwrap(), Toggle::Expanded);

    h.insert(&h.bob, "second", None).await;
    view.open().await.unwrap();
    let s = view.snapshot();
    assert_eq!(s.comment_count(), 2);
    assert_eq!(s.comments[0].content, "second");
    assert!(s.expanded.is_empty());
    assert!(view.find(&c1).unwrap().replies_pending());
}

#[tokio::test]
async fn reply_shows_up_under_its_parent() {
    let h = Harness::new();
    let c1 = h.insert(&h.alice, "we reached 50%", None).await;
    let (view, mut notices) = h.view(Some(&h.bob));
    view.open().await.unwrap();

    view.start_reply(&c1).unwrap();
    view.set_reply_draft("nice work").unwrap();
    let reply = view.submit_reply().await.unwrap();

    let parent = view.find(&c1).unwrap();
    assert_eq!(parent.replies.len(), 1);
    assert_eq!(parent.replies[0].content, "nice work");
    assert_eq!(parent.replies[0].id, reply.id);
    assert_eq!(parent.replies[0].parent_id, Some(c1.clone()));
    assert_eq!(parent.reply_count, 1);

    let s = view.snapshot();
    assert!(s.is_expanded(&c1));
    assert_eq!(s.reply, None);
    assert_eq!(s.rows().len(), 2);
    assert_eq!(s.rows()[1].depth, 1);

    let notices = drain(&mut notices);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Success);
    assert_eq!(notices[0].title, "Reply posted");
}

#[tokio::test]
async fn reply_to_collapsed_parent_keeps_its_other_replies() {
    let h = Harness::new();
    let c1 = h.insert(&h.alice, "thread", None).await;
    let r1 = h.insert(&h.alice, "first answer", Some(&c1)).await;
    let (view, mut notices) = h.view(Some(&h.bob));
    view.open().await.unwrap();
    assert!(view.find(&c1).unwrap().replies_pending());

    view.start_reply(&c1).unwrap();
    view.set_reply_draft("second answer").unwrap();
    let reply = view.submit_reply().await.unwrap();

    let parent = view.find(&c1).unwrap();
    let ids: Vec<CommentId> = parent.replies.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, vec![r1, reply.id]);
    assert_eq!(parent.reply_count, 2);
    let s = view.snapshot();
    assert!(s.is_expanded(&c1));
    assert!(!s.is_loading_replies(&c1));
    assert_eq!(s.rows().len(), 3);
    assert_eq!(h.calls(Op::FetchReplies).await, 1);
    assert_eq!(drain(&mut notices)[0].title, "Reply posted");

    // replies are held now, collapsing and expanding does not fetch again
    view.toggle_replies(&c1).await.unwrap();
    view.toggle_replies(&c1).await.unwrap();
    assert_eq!(h.calls(Op::FetchReplies).await, 1);
}

#[tokio::test]
async fn reply_is_shown_even_if_refreshing_its_siblings_fails() {
    let h = Harness::new();
    let c1 = h.insert(&h.alice, "thread", None).await;
    h.insert(&h.alice, "first answer", Some(&c1)).await;
    let (view, mut notices) = h.view(Some(&h.bob));
    view.open().await.unwrap();

    view.start_reply(&c1).unwrap();
    view.set_reply_draft("second answer").unwrap();
    h.server
        .lock()
        .await
        .fail_next(Op::FetchReplies, ApiError::Unknown(String::from("db down")));
    let reply = view.submit_reply().await.unwrap();

    let parent = view.find(&c1).unwrap();
    assert_eq!(parent.replies.len(), 1);
    assert_eq!(parent.replies[0].id, reply.id);
    assert_eq!(parent.reply_count, 2);
    assert!(view.snapshot().is_expanded(&c1));
    let notices = drain(&mut notices);
    assert_eq!(notices.len(), 2);
    assert_eq!(notices[0].title, "Reply posted");
    assert!(notices[1].is_error());
    assert_eq!(notices[1].description, "Failed to load replies");
}

#[tokio::test]
async fn replying_to_own_comment_is_unavailable() {
    let h = Harness::new();
    let c1 = h.insert(&h.alice, "mine", None).await;
    let (view, _) = h.view(Some(&h.alice));
    view.open().await.unwrap();
    assert!(view.start_reply(&c1).unwrap_err().is_disabled());

    let (anon, _) = h.view(None);
    anon.open().await.unwrap();
    assert!(matches!(
        anon.start_reply(&c1),
        Err(Error::Api(ApiError::Unauthenticated))
    ));
}

#[tokio::test]
async fn edit_shows_the_moderated_content() {
    let h = Harness::new();
    h.server
        .lock()
        .await
        .set_moderator(|c| format!("{c} (moderated)"));
    let c1 = h.insert(&h.alice, "old text", None).await;
    let (view, mut notices) = h.view(Some(&h.alice));
    view.open().await.unwrap();

    view.start_edit(&c1).unwrap();
    assert_eq!(view.snapshot().edit.unwrap().1.draft, "old text");
    view.set_edit_draft("new text").unwrap();
    view.save_edit().await.unwrap();

    assert_eq!(view.find(&c1).unwrap().content, "new text (moderated)");
    assert_eq!(view.snapshot().edit, None);
    assert_eq!(drain(&mut notices)[0].title, "Comment updated");
}

#[tokio::test]
async fn only_the_author_can_edit_or_delete() {
    let h = Harness::new();
    let c1 = h.insert(&h.alice, "mine", None).await;
    let (view, _) = h.view(Some(&h.bob));
    view.open().await.unwrap();
    assert!(view.start_edit(&c1).unwrap_err().is_disabled());
    assert!(view.request_delete(&c1).unwrap_err().is_disabled());
    assert_eq!(h.calls(Op::Update).await, 0);
}

#[tokio::test]
async fn delete_removes_the_whole_subtree() {
    let h = Harness::new();
    let c3 = h.insert(&h.alice, "thread", None).await;
    let r1 = h.insert(&h.bob, "one", Some(&c3)).await;
    let r2 = h.insert(&h.bob, "two", Some(&c3)).await;
    let other = h.insert(&h.alice, "other", None).await;
    let (view, mut notices) = h.view(Some(&h.alice));
    view.open().await.unwrap();
    view.toggle_replies(&c3).await.unwrap();
    assert!(view.find(&r2).is_some());

    view.request_delete(&c3).unwrap();
    assert_eq!(view.snapshot().pending_delete, Some(c3.clone()));
    view.confirm_delete().await.unwrap();

    for id in [&c3, &r1, &r2] {
        assert!(view.find(id).is_none());
    }
    assert!(view.find(&other).is_some());
    let s = view.snapshot();
    assert_eq!(s.pending_delete, None);
    assert!(!s.is_expanded(&c3));
    assert_eq!(h.server.lock().await.test_num_comments(), 1);
    assert_eq!(drain(&mut notices)[0].title, "Comment deleted");
}

#[tokio::test]
async fn deleting_a_reply_updates_the_parent_count() {
    let h = Harness::new();
    let c1 = h.insert(&h.bob, "thread", None).await;
    let r1 = h.insert(&h.alice, "one", Some(&c1)).await;
    h.insert(&h.bob, "two", Some(&c1)).await;
    let (view, _) = h.view(Some(&h.alice));
    view.open().await.unwrap();
    view.toggle_replies(&c1).await.unwrap();

    view.request_delete(&r1).unwrap();
    view.confirm_delete().await.unwrap();
    let parent = view.find(&c1).unwrap();
    assert_eq!(parent.replies.len(), 1);
    assert_eq!(parent.reply_count, 1);
}

#[tokio::test]
async fn delete_needs_confirmation() {
    let h = Harness::new();
    let c1 = h.insert(&h.alice, "mine", None).await;
    let (view, _) = h.view(Some(&h.alice));
    view.open().await.unwrap();

    assert!(view.confirm_delete().await.unwrap_err().is_disabled());
    view.request_delete(&c1).unwrap();
    view.cancel_delete();
    assert!(view.confirm_delete().await.unwrap_err().is_disabled());
    assert!(view.find(&c1).is_some());
    assert_eq!(h.calls(Op::Delete).await, 0);
}

#[tokio::test]
async fn toggling_twice_restores_the_view() {
    let h = Harness::new();
    let c3 = h.insert(&h.alice, "thread", None).await;
    h.insert(&h.bob, "one", Some(&c3)).await;
    let (view, _) = h.view(None);
    view.open().await.unwrap();
    let before = view.snapshot();

    assert_eq!(view.toggle_replies(&c3).await.unwrap(), Toggle::Expanded);
    assert_eq!(view.snapshot().rows().len(), 2);
    assert_eq!(view.toggle_replies(&c3).await.unwrap(), Toggle::Collapsed);
    let after = view.snapshot();
    assert_eq!(after.expanded, before.expanded);
    assert_eq!(after.rows().len(), 1);
    // replies stay cached once fetched
    assert_eq!(view.find(&c3).unwrap().replies.len(), 1);

    assert_eq!(view.toggle_replies(&c3).await.unwrap(), Toggle::Expanded);
    assert_eq!(h.calls(Op::FetchReplies).await, 1);
}

#[tokio::test]
async fn comments_without_replies_expand_without_fetching() {
    let h = Harness::new();
    let c1 = h.insert(&h.alice, "alone", None).await;
    let (view, _) = h.view(None);
    view.open().await.unwrap();
    assert_eq!(view.toggle_replies(&c1).await.unwrap(), Toggle::Expanded);
    assert_eq!(
        view.toggle_replies(&CommentId::new("missing")).await.unwrap(),
        Toggle::NotFound
    );
    assert_eq!(h.calls(Op::FetchReplies).await, 0);
}

#[tokio::test]
async fn concurrent_toggles_fetch_once() {
    let h = Harness::new();
    let c1 = h.insert(&h.alice, "thread", None).await;
    h.insert(&h.bob, "one", Some(&c1)).await;
    let (view, _) = h.view(None);
    view.open().await.unwrap();

    let (a, b) = futures::join!(view.toggle_replies(&c1), view.toggle_replies(&c1));
    assert_eq!(a.unwrap(), Toggle::Expanded);
    assert_eq!(b.unwrap(), Toggle::AlreadyLoading);
    assert_eq!(h.calls(Op::FetchReplies).await, 1);
    assert!(view.snapshot().is_expanded(&c1));
    assert!(!view.snapshot().is_loading_replies(&c1));
}

#[tokio::test]
async fn reopening_keeps_reply_fetches_deduplicated() {
    let h = Harness::new();
    let c1 = h.insert(&h.alice, "thread", None).await;
    h.insert(&h.bob, "one", Some(&c1)).await;
    let (view, _) = h.shared_view(None);
    view.open().await.unwrap();

    let gate = h.service(None).hold_op(Op::FetchReplies).await;
    let pending = tokio::spawn({
        let view = view.clone();
        let c1 = c1.clone();
        async move { view.toggle_replies(&c1).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(view.snapshot().is_loading_replies(&c1));

    view.open().await.unwrap();
    assert!(view.snapshot().is_loading_replies(&c1));
    assert_eq!(view.toggle_replies(&c1).await.unwrap(), Toggle::AlreadyLoading);

    drop(gate);
    assert_eq!(pending.await.unwrap().unwrap(), Toggle::Expanded);
    assert_eq!(h.calls(Op::FetchReplies).await, 1);
    let s = view.snapshot();
    assert!(s.is_expanded(&c1));
    assert!(!s.is_loading_replies(&c1));
    assert_eq!(view.find(&c1).unwrap().replies.len(), 1);
}

#[tokio::test]
async fn failed_reply_fetch_can_be_retried() {
    let h = Harness::new();
    let c1 = h.insert(&h.alice, "thread", None).await;
    h.insert(&h.bob, "one", Some(&c1)).await;
    let (view, mut notices) = h.view(None);
    view.open().await.unwrap();

    h.server
        .lock()
        .await
        .fail_next(Op::FetchReplies, ApiError::Unknown(String::from("db down")));
    assert!(matches!(
        view.toggle_replies(&c1).await,
        Err(Error::Api(ApiError::Unknown(_)))
    ));
    let s = view.snapshot();
    assert!(!s.is_loading_replies(&c1));
    assert!(!s.is_expanded(&c1));
    let notices = drain(&mut notices);
    assert_eq!(notices.len(), 1);
    assert!(notices[0].is_error());
    assert_eq!(notices[0].title, "Error");
    assert_eq!(notices[0].description, "Failed to load replies");

    assert_eq!(view.toggle_replies(&c1).await.unwrap(), Toggle::Expanded);
    assert_eq!(view.find(&c1).unwrap().replies.len(), 1);
}

#[tokio::test]
async fn failed_page_load_keeps_the_thread() {
    let h = Harness::new();
    for i in 0..15 {
        h.insert(&h.alice, &format!("comment {i}"), None).await;
    }
    let (view, mut notices) = h.view(None);
    view.open().await.unwrap();
    h.server
        .lock()
        .await
        .fail_next(Op::FetchComments, ApiError::Unknown(String::from("timeout")));
    assert!(view.load_more().await.is_err());
    let s = view.snapshot();
    assert_eq!(s.comment_count(), 10);
    assert_eq!(s.page, 1);
    assert!(s.has_more);
    assert!(!s.loading);
    assert_eq!(drain(&mut notices)[0].description, "Failed to load comments");
}

#[tokio::test]
async fn failed_submit_keeps_the_draft() {
    let h = Harness::new();
    let (view, mut notices) = h.view(Some(&h.alice));
    view.open().await.unwrap();
    view.set_draft("hello");

    h.server
        .lock()
        .await
        .fail_next(Op::Create, ApiError::Unknown(String::from("db down")));
    assert!(view.submit().await.is_err());
    let s = view.snapshot();
    assert_eq!(s.new_comment.draft, "hello");
    assert!(s.new_comment.last_error().is_some());
    assert!(s.new_comment.can_submit());
    assert_eq!(s.comment_count(), 0);
    assert_eq!(drain(&mut notices)[0].description, "Failed to post comment");

    view.submit().await.unwrap();
    let s = view.snapshot();
    assert_eq!(s.new_comment.draft, "");
    assert_eq!(s.new_comment.last_error(), None);
    assert_eq!(s.comments[0].content, "hello");
    assert_eq!(drain(&mut notices)[0].title, "Comment posted");
}

#[tokio::test]
async fn failed_edit_keeps_the_draft_and_the_content() {
    let h = Harness::new();
    let c1 = h.insert(&h.alice, "old text", None).await;
    let (view, mut notices) = h.view(Some(&h.alice));
    view.open().await.unwrap();
    view.start_edit(&c1).unwrap();
    view.set_edit_draft("new text").unwrap();

    h.server
        .lock()
        .await
        .fail_next(Op::Update, ApiError::Unknown(String::from("db down")));
    assert!(matches!(
        view.save_edit().await,
        Err(Error::Api(ApiError::Unknown(_)))
    ));
    assert_eq!(view.find(&c1).unwrap().content, "old text");
    let (target, form) = view.snapshot().edit.unwrap();
    assert_eq!(target, c1);
    assert_eq!(form.draft, "new text");
    assert!(matches!(form.state, FormState::Failed(_)));
    let notices = drain(&mut notices);
    assert_eq!(notices.len(), 1);
    assert!(notices[0].is_error());
    assert_eq!(notices[0].description, "Failed to update comment");

    view.save_edit().await.unwrap();
    assert_eq!(view.find(&c1).unwrap().content, "new text");
    assert_eq!(view.snapshot().edit, None);
}

#[tokio::test]
async fn failed_delete_keeps_the_subtree() {
    let h = Harness::new();
    let c1 = h.insert(&h.alice, "thread", None).await;
    let r1 = h.insert(&h.bob, "one", Some(&c1)).await;
    let (view, mut notices) = h.view(Some(&h.alice));
    view.open().await.unwrap();
    view.toggle_replies(&c1).await.unwrap();

    h.server
        .lock()
        .await
        .fail_next(Op::Delete, ApiError::Unknown(String::from("db down")));
    view.request_delete(&c1).unwrap();
    assert!(matches!(
        view.confirm_delete().await,
        Err(Error::Api(ApiError::Unknown(_)))
    ));

    let parent = view.find(&c1).unwrap();
    assert_eq!(parent.reply_count, 1);
    assert!(view.find(&r1).is_some());
    let s = view.snapshot();
    assert!(s.is_expanded(&c1));
    assert_eq!(s.pending_delete, None);
    assert_eq!(s.rows().len(), 2);
    assert_eq!(h.server.lock().await.test_num_comments(), 2);
    let notices = drain(&mut notices);
    assert_eq!(notices.len(), 1);
    assert!(notices[0].is_error());
    assert_eq!(notices[0].description, "Failed to delete comment");
}

#[tokio::test]
async fn new_comments_go_on_top() {
    let h = Harness::new();
    h.insert(&h.bob, "older", None).await;
    let (view, _) = h.view(Some(&h.alice));
    view.open().await.unwrap();
    view.set_draft("  fresh  ");
    let posted = view.submit().await.unwrap();
    assert_eq!(posted.content, "fresh");
    let s = view.snapshot();
    assert_eq!(s.comment_count(), 2);
    assert_eq!(s.comments[0].id, posted.id);
    assert_eq!(s.comments[1].content, "older");
}

#[tokio::test]
async fn posting_then_loading_more_holds_each_comment_once() {
    let h = Harness::new();
    for i in 0..15 {
        h.insert(&h.bob, &format!("comment {i}"), None).await;
    }
    let (view, _) = h.view(Some(&h.alice));
    view.open().await.unwrap();
    view.set_draft("fresh");
    view.submit().await.unwrap();
    assert_eq!(view.snapshot().comment_count(), 11);

    // the new comment shifts the second page back by one
    view.load_more().await.unwrap();
    let s = view.snapshot();
    let mut ids: Vec<CommentId> = s.comments.iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids.len(), 16);
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);
    assert_eq!(s.comments[0].content, "fresh");
    assert_eq!(s.comments[15].content, "comment 0");
    assert!(!s.has_more);
}

#[tokio::test]
async fn blank_or_anonymous_submissions_are_not_sent() {
    let h = Harness::new();
    let (view, _) = h.view(Some(&h.alice));
    view.set_draft("   ");
    assert!(view.submit().await.unwrap_err().is_disabled());

    let (anon, _) = h.view(None);
    anon.set_draft("hello");
    assert!(matches!(
        anon.submit().await,
        Err(Error::Api(ApiError::Unauthenticated))
    ));
    assert_eq!(h.calls(Op::Create).await, 0);
}

#[tokio::test]
async fn closing_cancels_pending_requests() {
    let h = Harness::new();
    h.insert(&h.alice, "first", None).await;
    let (view, mut notices) = h.shared_view(None);

    let gate = h.service(None).hold().await;
    let pending = tokio::spawn({
        let view = view.clone();
        async move { view.open().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!pending.is_finished());

    view.close();
    assert!(pending.await.unwrap().unwrap_err().is_cancelled());
    drop(gate);

    assert_eq!(view.snapshot().comment_count(), 0);
    assert!(drain(&mut notices).is_empty());
    assert!(view.is_closed());
    assert!(view.toggle_replies(&CommentId::new("x")).await.is_ok());
    assert!(view.open().await.is_err());
}
