use docnote_core::{
    annotate, Anchor, Comment, CommentStore, Document, MutationOutcome, Segment, StaleReason,
};

fn comment(id: &str, doc: &Document, start: usize, end: usize) -> Comment {
    let anchor = Anchor::from_document(doc, start, end).unwrap();
    Comment::with_id(id, "note", "1", 0, anchor)
}

#[test]
fn overlapping_anchor_is_skipped_first_come_first_highlighted() {
    let doc = Document::new("abcdefghij");
    let comments = vec![comment("b", &doc, 2, 8), comment("a", &doc, 0, 5)];

    let annotation = annotate(&doc, &comments);
    assert_eq!(annotation.highlighted_ids(), vec!["a"]);
    assert_eq!(annotation.overlapped(), &["b".to_string()]);
    assert_eq!(annotation.render_markers(), vec!["<hl:abcde>", "fghij"]);
}

#[test]
fn quick_brown_fox_scenario() {
    let doc = Document::new("The quick brown fox");
    let comments = vec![comment("c1", &doc, 4, 9)];

    let annotation = annotate(&doc, &comments);
    assert_eq!(
        annotation.render_markers(),
        vec!["The ", "<hl:quick>", " brown fox"]
    );
    assert_eq!(
        annotation.segments()[1],
        Segment::Highlight {
            comment_id: "c1".to_string(),
            text: "quick".to_string(),
            start: 4,
            end: 9,
        }
    );
}

#[test]
fn stale_anchors_are_reported_and_not_highlighted() {
    let original = Document::new("The quick brown fox");
    let comments = vec![
        comment("kept", &original, 16, 19),
        comment("moved", &original, 4, 9),
    ];

    let edited = Document::new("The slow brown fox!");
    let annotation = annotate(&edited, &comments);

    assert!(annotation.highlighted_ids().is_empty());
    assert_eq!(annotation.stale().len(), 2);
    assert_eq!(annotation.stale()[0].comment_id, "kept");
    assert_eq!(
        annotation.stale()[1].reason,
        StaleReason::TextMismatch {
            found: "slow ".to_string()
        }
    );
    assert_eq!(annotation.plain_text(), edited.text());
}

#[test]
fn clicking_highlight_focuses_comment_through_store() {
    let doc = Document::new("The quick brown fox");
    let mut store = CommentStore::default();
    store.add_comment(comment("c1", &doc, 10, 15));

    let annotation = annotate(&doc, store.comments());
    assert_eq!(annotation.click(0, &mut store), MutationOutcome::NotFound);
    assert_eq!(store.active_comment_id(), None);

    assert_eq!(annotation.click(1, &mut store), MutationOutcome::Applied);
    assert_eq!(store.active_comment_id(), Some("c1"));
}

#[test]
fn click_on_deleted_comment_is_a_no_op() {
    let doc = Document::new("The quick brown fox");
    let mut store = CommentStore::default();
    store.add_comment(comment("c1", &doc, 4, 9));

    let annotation = annotate(&doc, store.comments());
    store.delete_comment("c1");
    assert_eq!(annotation.click(1, &mut store), MutationOutcome::NotFound);
}
