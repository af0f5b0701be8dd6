//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose document comment sessions to Dart via FRB.
//! - Flatten core types into plain DTOs with string ids and `u32` offsets.
//!
//! # Invariants
//! - Exported functions never panic across the FFI boundary.
//! - Each open session is owned by the registry until `session_close`.
//! - At most one session per document key is open; its persisted state is
//!   scoped to that key.
//! - Session access is serialized by one registry mutex.

use docnote_core::{
    core_version as core_version_inner, format_timestamp, init_logging as init_logging_inner,
    mention_query, mentioned_users, ping as ping_inner, suggest_users, Comment, CoreConfig,
    DocumentSession, FocusTarget, MutationOutcome, ScopedKvStore, Segment, SelectionEvent,
    SessionError, SqliteKvStore, User,
};
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

const DB_PATH_ENV: &str = "DOCNOTE_DB_PATH";

type DocumentKv = ScopedKvStore<SqliteKvStore>;
type Registry = BTreeMap<String, OpenSession>;

struct OpenSession {
    document_key: String,
    session: DocumentSession<DocumentKv>,
}

static SESSIONS: OnceLock<Mutex<Registry>> = OnceLock::new();
static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Exposes the core crate version.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// Returns an empty string on success and the error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Created or addressed entity id.
    pub id: Option<String>,
    /// Human-readable status for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            ok: true,
            id: Some(id.into()),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }

    fn from_outcome(outcome: MutationOutcome, id: &str) -> Self {
        match outcome {
            MutationOutcome::Applied => Self::success("ok", id),
            MutationOutcome::NotFound => Self::failure("not_found"),
            MutationOutcome::Rejected(reason) => Self::failure(format!("rejected: {reason:?}")),
        }
    }
}

/// Anchor projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorDto {
    pub text: String,
    pub start: u32,
    pub end: u32,
}

/// One rendered document segment; `comment_id` is set for highlights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentDto {
    pub text: String,
    pub comment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDto {
    pub id: String,
    pub name: String,
    pub avatar_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyDto {
    pub id: String,
    pub text: String,
    pub author: String,
    pub display_time: String,
    pub mentions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDto {
    pub id: String,
    pub text: String,
    pub author: String,
    pub display_time: String,
    pub resolved: bool,
    /// Names of users mentioned as `@Name` in the body.
    pub mentions: Vec<String>,
    pub replies: Vec<ReplyDto>,
}

/// Comments sharing one anchored text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadDto {
    pub key: String,
    pub comments: Vec<CommentDto>,
}

/// Opens a session for one document and returns its id in
/// `ActionResponse::id`.
///
/// `document_key` identifies the document across restarts; comments and
/// resolution flags are stored under it. `config_json` is an optional
/// `CoreConfig` document. Without a `db_path` there, `DOCNOTE_DB_PATH` and
/// then the config default apply. A configured `log_dir` initializes logging.
#[flutter_rust_bridge::frb(sync)]
pub fn session_open(
    document_key: String,
    document_text: String,
    config_json: Option<String>,
) -> ActionResponse {
    let document_key = document_key.trim().to_string();
    if document_key.is_empty() {
        return ActionResponse::failure("session_open failed: document key is empty");
    }
    let config = match resolve_config(config_json) {
        Ok(config) => config,
        Err(message) => return ActionResponse::failure(format!("session_open failed: {message}")),
    };
    if let Some(log_dir) = config.log_dir.as_deref() {
        if let Err(err) = init_logging_inner(&config.log_level, &log_dir.to_string_lossy()) {
            return ActionResponse::failure(format!("session_open failed: {err}"));
        }
    }

    let mut sessions = match registry().lock() {
        Ok(sessions) => sessions,
        Err(_) => return ActionResponse::failure("session_open failed: registry poisoned"),
    };
    if let Some((open_id, _)) = sessions
        .iter()
        .find(|(_, open)| open.document_key == document_key)
    {
        warn!(
            "event=ffi_session_open module=ffi status=rejected error_code=already_open session_id={open_id}"
        );
        return ActionResponse::failure(format!(
            "session_open failed: document `{document_key}` is already open as {open_id}"
        ));
    }

    let kv = match SqliteKvStore::open(config.effective_db_path())
        .and_then(|kv| ScopedKvStore::new(kv, &document_key))
    {
        Ok(kv) => kv,
        Err(err) => return ActionResponse::failure(format!("session_open failed: {err}")),
    };
    let session = DocumentSession::open(document_text, kv, &config);
    let session_id = format!("s{}", NEXT_SESSION.fetch_add(1, Ordering::Relaxed));
    sessions.insert(
        session_id.clone(),
        OpenSession {
            document_key,
            session,
        },
    );
    info!("event=ffi_session_open module=ffi status=ok session_id={session_id}");
    ActionResponse::success("Session opened.", session_id)
}

/// Drops a session. Returns `false` for unknown ids.
#[flutter_rust_bridge::frb(sync)]
pub fn session_close(session_id: String) -> bool {
    registry()
        .lock()
        .map(|mut sessions| sessions.remove(&session_id).is_some())
        .unwrap_or(false)
}

/// Applies a pointer-release selection and returns the current selection.
#[flutter_rust_bridge::frb(sync)]
pub fn session_select(
    session_id: String,
    text: String,
    start_offset: u32,
    end_offset: u32,
    focus_in_comment_panel: bool,
) -> Option<AnchorDto> {
    let event = SelectionEvent {
        text,
        start_offset: start_offset as usize,
        end_offset: end_offset as usize,
        focus: if focus_in_comment_panel {
            FocusTarget::CommentPanel
        } else {
            FocusTarget::Document
        },
    };
    with_session(&session_id, |session| {
        session.handle_selection(&event).map(|anchor| AnchorDto {
            text: anchor.text.clone(),
            start: to_u32(anchor.start),
            end: to_u32(anchor.end),
        })
    })
    .ok()
    .flatten()
}

#[flutter_rust_bridge::frb(sync)]
pub fn session_add_comment(session_id: String, text: String) -> ActionResponse {
    with_session(&session_id, |session| match session.submit_comment(&text) {
        Ok(comment_id) => ActionResponse::success("Comment added.", comment_id),
        Err(err) => session_error(err),
    })
    .unwrap_or_else(ActionResponse::failure)
}

#[flutter_rust_bridge::frb(sync)]
pub fn session_add_reply(session_id: String, comment_id: String, text: String) -> ActionResponse {
    with_session(&session_id, |session| {
        match session.submit_reply(&comment_id, &text) {
            Ok(outcome) => ActionResponse::from_outcome(outcome, &comment_id),
            Err(err) => session_error(err),
        }
    })
    .unwrap_or_else(ActionResponse::failure)
}

#[flutter_rust_bridge::frb(sync)]
pub fn session_edit_comment(session_id: String, comment_id: String, text: String) -> ActionResponse {
    with_session(&session_id, |session| {
        match session.edit_comment(&comment_id, &text) {
            Ok(outcome) => ActionResponse::from_outcome(outcome, &comment_id),
            Err(err) => session_error(err),
        }
    })
    .unwrap_or_else(ActionResponse::failure)
}

#[flutter_rust_bridge::frb(sync)]
pub fn session_edit_reply(
    session_id: String,
    comment_id: String,
    reply_id: String,
    text: String,
) -> ActionResponse {
    with_session(&session_id, |session| {
        match session.edit_reply(&comment_id, &reply_id, &text) {
            Ok(outcome) => ActionResponse::from_outcome(outcome, &reply_id),
            Err(err) => session_error(err),
        }
    })
    .unwrap_or_else(ActionResponse::failure)
}

#[flutter_rust_bridge::frb(sync)]
pub fn session_delete_comment(session_id: String, comment_id: String) -> ActionResponse {
    with_session(&session_id, |session| {
        ActionResponse::from_outcome(session.delete_comment(&comment_id), &comment_id)
    })
    .unwrap_or_else(ActionResponse::failure)
}

#[flutter_rust_bridge::frb(sync)]
pub fn session_delete_reply(
    session_id: String,
    comment_id: String,
    reply_id: String,
) -> ActionResponse {
    with_session(&session_id, |session| {
        ActionResponse::from_outcome(session.delete_reply(&comment_id, &reply_id), &reply_id)
    })
    .unwrap_or_else(ActionResponse::failure)
}

#[flutter_rust_bridge::frb(sync)]
pub fn session_resolve(session_id: String, comment_id: String) -> ActionResponse {
    with_session(&session_id, |session| {
        ActionResponse::from_outcome(session.resolve(&comment_id), &comment_id)
    })
    .unwrap_or_else(ActionResponse::failure)
}

/// Handles a click on a highlighted span.
#[flutter_rust_bridge::frb(sync)]
pub fn session_click_highlight(session_id: String, comment_id: String) -> ActionResponse {
    with_session(&session_id, |session| {
        ActionResponse::from_outcome(session.click_highlight(&comment_id), &comment_id)
    })
    .unwrap_or_else(ActionResponse::failure)
}

/// Renders the document body as plain/highlight segments.
#[flutter_rust_bridge::frb(sync)]
pub fn session_annotate(session_id: String) -> Vec<SegmentDto> {
    with_session(&session_id, |session| {
        session
            .annotate()
            .segments()
            .iter()
            .map(|segment| SegmentDto {
                text: segment.text().to_string(),
                comment_id: match segment {
                    Segment::Highlight { comment_id, .. } => Some(comment_id.clone()),
                    Segment::Plain { .. } => None,
                },
            })
            .collect()
    })
    .unwrap_or_default()
}

/// Lists comment threads grouped by anchored text.
#[flutter_rust_bridge::frb(sync)]
pub fn session_threads(session_id: String) -> Vec<ThreadDto> {
    with_session(&session_id, |session| {
        let store = session.store();
        store
            .groups()
            .into_iter()
            .map(|group| ThreadDto {
                key: group.key.to_string(),
                comments: group
                    .comments
                    .into_iter()
                    .map(|comment| to_comment_dto(comment, store.users(), store.is_resolved(&comment.id)))
                    .collect(),
            })
            .collect()
    })
    .unwrap_or_default()
}

/// Returns user suggestions for the `@` query in `input`.
///
/// Empty when `input` has no `@`.
#[flutter_rust_bridge::frb(sync)]
pub fn session_mention_suggestions(session_id: String, input: String) -> Vec<UserDto> {
    with_session(&session_id, |session| {
        let Some(query) = mention_query(&input) else {
            return Vec::new();
        };
        suggest_users(session.store().users(), query)
            .into_iter()
            .map(|user| UserDto {
                id: user.id.clone(),
                name: user.name.clone(),
                avatar_ref: user.avatar_ref.clone(),
            })
            .collect()
    })
    .unwrap_or_default()
}

fn registry() -> &'static Mutex<Registry> {
    SESSIONS.get_or_init(|| Mutex::new(BTreeMap::new()))
}

fn with_session<T>(
    session_id: &str,
    f: impl FnOnce(&mut DocumentSession<DocumentKv>) -> T,
) -> Result<T, String> {
    let mut sessions = registry()
        .lock()
        .map_err(|_| "session registry poisoned".to_string())?;
    match sessions.get_mut(session_id) {
        Some(open) => Ok(f(&mut open.session)),
        None => {
            warn!("event=ffi_session_lookup module=ffi status=error error_code=unknown_session session_id={session_id}");
            Err(format!("unknown session: {session_id}"))
        }
    }
}

fn resolve_config(config_json: Option<String>) -> Result<CoreConfig, String> {
    let raw = config_json.as_deref().map(str::trim).unwrap_or_default();
    let mut config = if raw.is_empty() {
        CoreConfig::default()
    } else {
        CoreConfig::from_json_str(raw).map_err(|err| err.to_string())?
    };
    if config.db_path.is_none() {
        config.db_path = std::env::var(DB_PATH_ENV)
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);
    }
    Ok(config)
}

fn session_error(err: SessionError) -> ActionResponse {
    ActionResponse::failure(err.to_string())
}

fn to_comment_dto(comment: &Comment, users: &[User], resolved: bool) -> CommentDto {
    CommentDto {
        id: comment.id.clone(),
        text: comment.text.clone(),
        author: author_name(users, &comment.user_id),
        display_time: format_timestamp(comment.timestamp),
        resolved,
        mentions: mention_names(&comment.text, users),
        replies: comment
            .replies
            .iter()
            .map(|reply| ReplyDto {
                id: reply.id.clone(),
                text: reply.text.clone(),
                author: author_name(users, &reply.user_id),
                display_time: format_timestamp(reply.timestamp),
                mentions: mention_names(&reply.text, users),
            })
            .collect(),
    }
}

fn mention_names(text: &str, users: &[User]) -> Vec<String> {
    mentioned_users(text, users)
        .into_iter()
        .map(|user| user.name.clone())
        .collect()
}

fn author_name(users: &[User], user_id: &str) -> String {
    users
        .iter()
        .find(|user| user.id == user_id)
        .map_or_else(|| user_id.to_string(), |user| user.name.clone())
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
