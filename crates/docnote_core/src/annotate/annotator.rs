//! Batch annotator.
//!
//! Re-run on comment add/delete or document replacement; it is not
//! incremental.

use crate::model::anchor::{Anchor, AnchorStatus, StaleReason};
use crate::model::comment::{Comment, CommentId};
use crate::model::document::Document;
use crate::store::comment_store::{CommentStore, MutationOutcome};
use log::debug;

/// One rendered piece of the document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Plain {
        text: String,
    },
    /// Clickable span tied to one comment.
    Highlight {
        comment_id: CommentId,
        text: String,
        start: usize,
        end: usize,
    },
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Highlight { text, .. } => text,
        }
    }

    pub fn comment_id(&self) -> Option<&str> {
        match self {
            Self::Plain { .. } => None,
            Self::Highlight { comment_id, .. } => Some(comment_id),
        }
    }
}

/// Comment whose anchor no longer matches the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleAnchor {
    pub comment_id: CommentId,
    pub anchor: Anchor,
    pub reason: StaleReason,
}

/// Result of one annotate pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    segments: Vec<Segment>,
    stale: Vec<StaleAnchor>,
    overlapped: Vec<CommentId>,
}

impl Annotation {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Anchors excluded because they failed revalidation.
    pub fn stale(&self) -> &[StaleAnchor] {
        &self.stale
    }

    /// Valid anchors dropped because they start inside an earlier highlight.
    pub fn overlapped(&self) -> &[CommentId] {
        &self.overlapped
    }

    /// Comment ids that received a highlight, in document order.
    pub fn highlighted_ids(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(Segment::comment_id)
            .collect()
    }

    /// Concatenation of every segment; equals the document text.
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(Segment::text).collect()
    }

    /// Debug rendering with highlights shown as `<hl:text>`.
    pub fn render_markers(&self) -> Vec<String> {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Plain { text } => text.clone(),
                Segment::Highlight { text, .. } => format!("<hl:{text}>"),
            })
            .collect()
    }

    /// Handles a click on segment `index`.
    ///
    /// Highlights focus their comment through the store's public API; plain
    /// segments and out-of-range indexes are no-ops.
    pub fn click(&self, index: usize, store: &mut CommentStore) -> MutationOutcome {
        match self.segments.get(index) {
            Some(Segment::Highlight { comment_id, .. }) => {
                store.set_active_comment_id(Some(comment_id.as_str()))
            }
            _ => MutationOutcome::NotFound,
        }
    }
}

/// Checks every comment anchor against `document`, in comment order.
pub fn revalidate_anchors<'a>(
    document: &Document,
    comments: &'a [Comment],
) -> Vec<(&'a Comment, AnchorStatus)> {
    comments
        .iter()
        .map(|comment| (comment, comment.selection.check(document)))
        .collect()
}

/// Splits `document` into plain and highlighted segments.
///
/// # Contract
/// - Anchors are revalidated first; stale ones are reported, not drawn.
/// - Remaining comments are visited by ascending `selection.start`
///   (insertion order breaks ties).
/// - A comment starting before the end of the previous highlight is skipped.
/// - Empty plain slices are not emitted.
pub fn annotate(document: &Document, comments: &[Comment]) -> Annotation {
    let mut annotation = Annotation::default();
    let mut live: Vec<&Comment> = Vec::with_capacity(comments.len());

    for (comment, status) in revalidate_anchors(document, comments) {
        match status {
            AnchorStatus::Valid(_) => live.push(comment),
            AnchorStatus::Stale { anchor, reason } => {
                debug!(
                    "event=anchor_revalidate module=annotate status=stale comment_id={} reason={}",
                    comment.id, reason
                );
                annotation.stale.push(StaleAnchor {
                    comment_id: comment.id.clone(),
                    anchor,
                    reason,
                });
            }
        }
    }
    live.sort_by_key(|comment| comment.selection.start);

    let mut cursor = 0usize;
    for comment in live {
        let (start, end) = (comment.selection.start, comment.selection.end);
        if start < cursor {
            annotation.overlapped.push(comment.id.clone());
            continue;
        }
        push_plain(&mut annotation.segments, document, cursor, start);
        annotation.segments.push(Segment::Highlight {
            comment_id: comment.id.clone(),
            text: document.slice(start, end).unwrap_or_default().to_string(),
            start,
            end,
        });
        cursor = end;
    }
    push_plain(
        &mut annotation.segments,
        document,
        cursor,
        document.len_chars(),
    );

    debug!(
        "event=annotate module=annotate status=ok highlights={} stale={} overlapped={}",
        annotation.highlighted_ids().len(),
        annotation.stale.len(),
        annotation.overlapped.len()
    );
    annotation
}

fn push_plain(segments: &mut Vec<Segment>, document: &Document, from: usize, to: usize) {
    match document.slice(from, to) {
        Some(text) if !text.is_empty() => segments.push(Segment::Plain {
            text: text.to_string(),
        }),
        _ => {}
    }
}
