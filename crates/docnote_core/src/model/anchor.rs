//! Selection anchors and their revalidation status.
//!
//! # Responsibility
//! - Bind a comment to a `[start, end)` character range of the document.
//! - Detect anchors that no longer match the document after an edit.
//!
//! # Invariants
//! - At creation time `start < end <= document.len_chars()` and
//!   `text == document[start..end]`.
//! - Anchors are never rewritten after creation; drift is reported as
//!   `AnchorStatus::Stale` instead.

use crate::model::document::Document;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Text range a comment is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anchor {
    /// Highlighted text as it appeared when the anchor was created.
    pub text: String,
    /// Inclusive start character offset.
    pub start: usize,
    /// Exclusive end character offset.
    pub end: usize,
}

impl Anchor {
    pub fn new(text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Builds an anchor from the document slice at `[start, end)`.
    ///
    /// Returns `None` for empty or out-of-range selections.
    pub fn from_document(document: &Document, start: usize, end: usize) -> Option<Self> {
        if start >= end {
            return None;
        }
        document
            .slice(start, end)
            .map(|text| Self::new(text, start, end))
    }

    /// Returns the range length in characters.
    pub fn len_chars(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Checks this anchor against the current document content.
    pub fn check(&self, document: &Document) -> AnchorStatus {
        let reason = if self.start >= self.end || self.text.is_empty() {
            Some(StaleReason::EmptyRange)
        } else if self.end > document.len_chars() {
            Some(StaleReason::OutOfBounds {
                end: self.end,
                document_len: document.len_chars(),
            })
        } else {
            match document.slice(self.start, self.end) {
                Some(found) if found == self.text => None,
                Some(found) => Some(StaleReason::TextMismatch {
                    found: found.to_string(),
                }),
                None => Some(StaleReason::OutOfBounds {
                    end: self.end,
                    document_len: document.len_chars(),
                }),
            }
        };

        match reason {
            None => AnchorStatus::Valid(self.clone()),
            Some(reason) => AnchorStatus::Stale {
                anchor: self.clone(),
                reason,
            },
        }
    }
}

/// Result of revalidating one anchor against the current document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorStatus {
    /// Anchor still matches the document and may be highlighted.
    Valid(Anchor),
    /// Anchor drifted; it is kept for display but never highlighted.
    Stale { anchor: Anchor, reason: StaleReason },
}

impl AnchorStatus {
    pub fn anchor(&self) -> &Anchor {
        match self {
            Self::Valid(anchor) => anchor,
            Self::Stale { anchor, .. } => anchor,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Why an anchor no longer matches the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// `start >= end` or the anchored text is empty.
    EmptyRange,
    /// The range runs past the end of the (shortened) document.
    OutOfBounds { end: usize, document_len: usize },
    /// The range is in bounds but the document text differs.
    TextMismatch { found: String },
}

impl Display for StaleReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyRange => write!(f, "anchor range is empty"),
            Self::OutOfBounds { end, document_len } => write!(
                f,
                "anchor end {end} is past document length {document_len}"
            ),
            Self::TextMismatch { found } => {
                write!(f, "anchored text no longer matches (found `{found}`)")
            }
        }
    }
}
