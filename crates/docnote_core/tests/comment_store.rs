use docnote_core::{
    Anchor, Comment, CommentStore, EntityError, MutationOutcome, RejectReason, Reply,
};

fn comment(id: &str, text: &str, start: usize, end: usize) -> Comment {
    Comment::with_id(
        id,
        format!("about {text}"),
        "1",
        1_700_000_000_000,
        Anchor::new(text, start, end),
    )
}

fn seeded() -> CommentStore {
    let mut store = CommentStore::default();
    store.add_comment(comment("c1", "quick", 4, 9));
    assert!(store
        .add_reply("c1", Reply::with_id("r1", "agreed", "2", 1_700_000_000_500))
        .is_applied());
    store
}

#[test]
fn add_comment_increments_count_and_starts_without_replies() {
    let mut store = CommentStore::default();
    assert!(store.is_empty());

    let outcome = store.add_comment(comment("c1", "quick", 4, 9));
    assert_eq!(outcome, MutationOutcome::Applied);
    assert_eq!(store.len(), 1);

    let loaded = store.comment("c1").unwrap();
    assert!(loaded.replies.is_empty());
    assert_eq!(loaded.selection, Anchor::new("quick", 4, 9));
}

#[test]
fn malformed_comment_is_rejected_without_state_change() {
    let mut store = CommentStore::default();
    let outcome = store.add_comment(comment("", "quick", 4, 9));
    assert_eq!(
        outcome,
        MutationOutcome::Rejected(RejectReason::Invalid(EntityError::EmptyCommentId))
    );
    assert!(store.is_empty());
    assert_eq!(store.revision(), 0);
}

#[test]
fn unknown_comment_ids_are_no_ops() {
    let mut store = seeded();
    let before = store.comments().to_vec();
    let revision = store.revision();

    assert_eq!(
        store.add_reply("missing", Reply::with_id("r9", "hi", "1", 0)),
        MutationOutcome::NotFound
    );
    assert_eq!(store.edit_comment("missing", "changed"), MutationOutcome::NotFound);
    assert_eq!(store.delete_reply("missing", "r1"), MutationOutcome::NotFound);
    assert_eq!(store.delete_reply("c1", "missing"), MutationOutcome::NotFound);
    assert_eq!(store.edit_reply("c1", "missing", "x"), MutationOutcome::NotFound);
    assert_eq!(store.mark_resolved("missing"), MutationOutcome::NotFound);
    assert_eq!(store.set_active_comment_id(Some("missing")), MutationOutcome::NotFound);

    assert_eq!(store.comments(), before.as_slice());
    assert_eq!(store.revision(), revision);
    assert!(!store.is_resolved("missing"));
}

#[test]
fn delete_comment_is_idempotent_and_drops_replies() {
    let mut store = seeded();
    assert_eq!(store.delete_comment("c1"), MutationOutcome::Applied);
    assert_eq!(store.delete_comment("c1"), MutationOutcome::NotFound);
    assert!(store.comment("c1").is_none());
    assert_eq!(store.delete_reply("c1", "r1"), MutationOutcome::NotFound);
}

#[test]
fn edits_replace_full_text() {
    let mut store = seeded();
    assert!(store.edit_comment("c1", "typo? fixed").is_applied());
    assert!(store.edit_reply("c1", "r1", "disagree").is_applied());

    let loaded = store.comment("c1").unwrap();
    assert_eq!(loaded.text, "typo? fixed");
    assert_eq!(loaded.reply("r1").unwrap().text, "disagree");
}

#[test]
fn grouping_uses_anchor_text_in_first_insertion_order() {
    let mut store = CommentStore::default();
    store.add_comment(comment("c1", "dolor", 12, 17));
    store.add_comment(comment("c2", "ipsum", 6, 11));
    store.add_comment(comment("c3", "dolor", 103, 108));

    let groups = store.groups();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].key, "dolor");
    let ids: Vec<&str> = groups[0].comments.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c3"]);
    assert_eq!(groups[1].key, "ipsum");
    assert_eq!(groups[1].comments.len(), 1);
}

#[test]
fn resolved_comment_is_read_only_except_deletion() {
    let mut store = seeded();
    assert!(store.mark_resolved("c1").is_applied());
    assert!(store.is_resolved("c1"));

    let read_only = MutationOutcome::Rejected(RejectReason::Resolved("c1".to_string()));
    assert_eq!(store.mark_resolved("c1"), read_only);
    assert_eq!(store.edit_comment("c1", "late edit"), read_only);
    assert_eq!(store.edit_reply("c1", "r1", "late edit"), read_only);
    assert_eq!(
        store.add_reply("c1", Reply::with_id("r2", "late", "3", 0)),
        read_only
    );

    assert!(store.delete_reply("c1", "r1").is_applied());
    assert!(store.delete_comment("c1").is_applied());
    assert!(store.is_empty());
}

#[test]
fn active_comment_pointer_tracks_existing_comments() {
    let mut store = seeded();
    assert!(store.set_active_comment_id(Some("c1")).is_applied());
    assert_eq!(store.active_comment_id(), Some("c1"));
    assert!(store.set_active_comment_id(None).is_applied());
    assert_eq!(store.active_comment_id(), None);
}

#[test]
fn duplicate_reply_id_is_rejected() {
    let mut store = seeded();
    assert_eq!(
        store.add_reply("c1", Reply::with_id("r1", "again", "3", 0)),
        MutationOutcome::Rejected(RejectReason::DuplicateReplyId("r1".to_string()))
    );
    assert_eq!(store.comment("c1").unwrap().replies.len(), 1);
}

#[test]
fn comments_revision_tracks_only_collection_changes() {
    let mut store = seeded();
    let saved = store.comments_revision();
    let revision = store.revision();

    store.set_selected_text(Some(Anchor::new("brown", 10, 15)));
    store.set_active_comment_id(Some("c1"));
    assert_eq!(store.comments_revision(), saved);
    assert_eq!(store.revision(), revision + 2);

    assert!(store.mark_resolved("c1").is_applied());
    assert_eq!(store.comments_revision(), saved);

    assert!(store.delete_reply("c1", "r1").is_applied());
    assert_eq!(store.comments_revision(), saved + 1);
}
