use docnote_core::{
    Anchor, CoreConfig, DocumentSession, FocusTarget, KvStore, MutationOutcome, ScopedKvStore,
    SelectionEvent, SessionError, SqliteKvStore, StoreEvent, ValidationError, COMMENTS_STORAGE_KEY,
    RESOLVED_STORAGE_KEY,
};
use std::sync::{Arc, Mutex};

const TEXT: &str = "The quick brown fox";

fn session() -> DocumentSession<SqliteKvStore> {
    let kv = SqliteKvStore::open_in_memory().unwrap();
    DocumentSession::open(TEXT, kv, &CoreConfig::default())
}

#[test]
fn select_comment_and_annotate_scenario() {
    let mut session = session();

    let selected = session
        .handle_selection(&SelectionEvent::range("quick", 4, 9))
        .cloned();
    assert_eq!(selected, Some(Anchor::new("quick", 4, 9)));

    let comment_id = session.submit_comment("typo?").unwrap();
    let comments = session.store().comments();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].id, comment_id);
    assert_eq!(comments[0].text, "typo?");
    assert_eq!(comments[0].user_id, "1");
    assert_eq!(comments[0].selection, Anchor::new("quick", 4, 9));

    assert_eq!(
        session.annotate().render_markers(),
        vec!["The ", "<hl:quick>", " brown fox"]
    );
}

#[test]
fn validation_failures_do_not_mutate() {
    let mut session = session();

    assert_eq!(
        session.submit_comment("no selection"),
        Err(SessionError::Validation(ValidationError::NoSelection))
    );

    session.handle_selection(&SelectionEvent::range("fox", 16, 19));
    assert_eq!(
        session.submit_comment("   "),
        Err(SessionError::Validation(ValidationError::EmptyText))
    );
    assert!(session.store().is_empty());

    let id = session.submit_comment("which fox?").unwrap();
    assert_eq!(
        session.submit_reply(&id, ""),
        Err(SessionError::Validation(ValidationError::EmptyText))
    );
    assert_eq!(
        session.edit_comment(&id, " "),
        Err(SessionError::Validation(ValidationError::EmptyText))
    );
    assert_eq!(session.store().comment(&id).unwrap().text, "which fox?");
}

#[test]
fn reply_to_missing_comment_is_silent_no_op() {
    let mut session = session();
    assert_eq!(
        session.submit_reply("missing", "hello"),
        Ok(MutationOutcome::NotFound)
    );
    assert_eq!(session.delete_comment("missing"), MutationOutcome::NotFound);
}

#[test]
fn focus_in_comment_panel_keeps_selection_for_submit() {
    let mut session = session();
    session.handle_selection(&SelectionEvent::range("brown", 10, 15));

    let kept = session
        .handle_selection(&SelectionEvent::collapsed(0, FocusTarget::CommentPanel))
        .cloned();
    assert_eq!(kept, Some(Anchor::new("brown", 10, 15)));
    assert!(session.submit_comment("colour?").is_ok());

    let cleared = session.handle_selection(&SelectionEvent::collapsed(3, FocusTarget::Document));
    assert!(cleared.is_none());
}

#[test]
fn cancel_clears_pending_selection() {
    let mut session = session();
    session.handle_selection(&SelectionEvent::range("quick", 4, 9));
    session.cancel_comment();
    assert!(session.store().selected_text().is_none());

    let restored =
        session.handle_selection(&SelectionEvent::collapsed(0, FocusTarget::CommentPanel));
    assert!(restored.is_none());
}

#[test]
fn comments_and_resolution_survive_session_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.sqlite3");
    let config = CoreConfig::default();

    let (first, second) = {
        let kv = SqliteKvStore::open(&path).unwrap();
        let mut session = DocumentSession::open(TEXT, kv, &config);
        session.handle_selection(&SelectionEvent::range("quick", 4, 9));
        let first = session.submit_comment("typo?").unwrap();
        session.handle_selection(&SelectionEvent::range("quick", 4, 9));
        let second = session.submit_comment("same word").unwrap();
        assert!(session.submit_reply(&first, "looks fine").unwrap().is_applied());
        assert!(session.resolve(&first).is_applied());
        (first, second)
    };

    let kv = SqliteKvStore::open(&path).unwrap();
    let session = DocumentSession::open(TEXT, kv, &config);
    let store = session.store();
    assert_eq!(store.len(), 2);
    assert_eq!(store.comment(&first).unwrap().replies.len(), 1);
    assert!(store.is_resolved(&first));
    assert!(!store.is_resolved(&second));

    let groups = store.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key, "quick");
}

#[test]
fn corrupt_comment_snapshot_starts_empty() {
    let kv = SqliteKvStore::open_in_memory().unwrap();
    kv.put(COMMENTS_STORAGE_KEY, "{\"broken\":").unwrap();
    let session = DocumentSession::open(TEXT, kv, &CoreConfig::default());
    assert!(session.store().is_empty());
}

#[test]
fn replacing_document_reports_stale_anchors_and_clears_stale_selection() {
    let mut session = session();
    session.handle_selection(&SelectionEvent::range("quick", 4, 9));
    let id = session.submit_comment("typo?").unwrap();

    let stale = session.replace_document("The slow brown fox");
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].comment_id, id);
    assert!(session.store().selected_text().is_none());
    assert_eq!(
        session.submit_comment("again"),
        Err(SessionError::Validation(ValidationError::NoSelection))
    );
    assert_eq!(
        session.annotate().render_markers(),
        vec!["The slow brown fox"]
    );
}

#[test]
fn subscribers_observe_annotate_triggers() {
    let mut session = session();
    let triggers = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&triggers);
    session.subscribe(move |event: &StoreEvent| {
        if event.affects_anchors() {
            sink.lock().unwrap().push(event.kind());
        }
    });

    session.handle_selection(&SelectionEvent::range("quick", 4, 9));
    let id = session.submit_comment("typo?").unwrap();
    session.click_highlight(&id);
    session.delete_comment(&id);

    assert_eq!(
        *triggers.lock().unwrap(),
        vec!["comment_added", "comment_deleted"]
    );
    assert_eq!(session.store().active_comment_id(), None);
}

#[test]
fn documents_sharing_one_file_keep_separate_threads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.sqlite3");
    let config = CoreConfig::default();
    let other_text = "Lorem ipsum dolor";

    let open_scoped = |scope: &str, text: &str| {
        let kv = ScopedKvStore::new(SqliteKvStore::open(&path).unwrap(), scope).unwrap();
        DocumentSession::open(text, kv, &config)
    };

    let quick_id = {
        let mut doc_a = open_scoped("doc-a", TEXT);
        let mut doc_b = open_scoped("doc-b", other_text);

        doc_a.handle_selection(&SelectionEvent::range("quick", 4, 9));
        let quick_id = doc_a.submit_comment("typo?").unwrap();
        assert!(doc_a.resolve(&quick_id).is_applied());

        doc_b.handle_selection(&SelectionEvent::range("ipsum", 6, 11));
        doc_b.submit_comment("placeholder").unwrap();
        quick_id
    };

    let doc_a = open_scoped("doc-a", TEXT);
    let doc_b = open_scoped("doc-b", other_text);

    let keys: Vec<&str> = doc_a.store().groups().iter().map(|group| group.key).collect();
    assert_eq!(keys, vec!["quick"]);
    assert!(doc_a.store().is_resolved(&quick_id));
    assert!(doc_a.annotate().stale().is_empty());

    let keys: Vec<&str> = doc_b.store().groups().iter().map(|group| group.key).collect();
    assert_eq!(keys, vec!["ipsum"]);
    assert!(!doc_b.store().is_resolved(&quick_id));
    assert!(doc_b.annotate().stale().is_empty());

    let raw = SqliteKvStore::open(&path).unwrap();
    assert!(raw.get(COMMENTS_STORAGE_KEY).unwrap().is_none());
    assert!(raw.get(RESOLVED_STORAGE_KEY).unwrap().is_none());
    assert!(raw.get("doc-a/resolvedReplies").unwrap().is_some());
}

#[test]
fn deleting_last_comment_removes_snapshot() {
    let mut session = session();
    session.handle_selection(&SelectionEvent::range("quick", 4, 9));
    let id = session.submit_comment("typo?").unwrap();
    assert!(session.kv().get(COMMENTS_STORAGE_KEY).unwrap().is_some());

    session.handle_selection(&SelectionEvent::range("fox", 16, 19));
    assert!(session.kv().get(COMMENTS_STORAGE_KEY).unwrap().is_some());

    assert!(session.delete_comment(&id).is_applied());
    assert!(session.kv().get(COMMENTS_STORAGE_KEY).unwrap().is_none());
}
