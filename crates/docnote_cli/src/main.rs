//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `docnote_core` linkage without a UI shell.
//! - Run the select/comment/annotate flow against an in-memory store and
//!   print deterministic output.

use docnote_core::{CoreConfig, DocumentSession, SelectionEvent, SqliteKvStore};
use std::process::ExitCode;

const SAMPLE_TEXT: &str = "The quick brown fox";

fn main() -> ExitCode {
    println!("docnote_core ping={}", docnote_core::ping());
    println!("docnote_core version={}", docnote_core::core_version());

    let kv = match SqliteKvStore::open_in_memory() {
        Ok(kv) => kv,
        Err(err) => {
            eprintln!("docnote_cli: failed to open store: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut session = DocumentSession::open(SAMPLE_TEXT, kv, &CoreConfig::default());
    session.handle_selection(&SelectionEvent::range("quick", 4, 9));
    if let Err(err) = session.submit_comment("typo?") {
        eprintln!("docnote_cli: {err}");
        return ExitCode::FAILURE;
    }

    println!("annotated={:?}", session.annotate().render_markers());
    for group in session.store().groups() {
        println!("thread `{}` comments={}", group.key, group.comments.len());
    }
    ExitCode::SUCCESS
}
