//! Selection anchor resolver.
//!
//! # Invariants
//! - `SelectionChange::Set` always carries non-empty text equal to
//!   `document[start..end]`.
//! - Resolution is synchronous and never retried.

use crate::model::anchor::Anchor;
use crate::model::document::Document;
use log::{debug, warn};

/// Where keyboard focus was when the selection event fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusTarget {
    /// Focus is on the document body or elsewhere outside the comment panel.
    #[default]
    Document,
    /// Focus is inside the comment panel (comment/reply input boxes).
    CommentPanel,
}

/// Raw selection notification from the rendering surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEvent {
    /// Selection string as reported by the surface, untrimmed.
    pub text: String,
    /// Character offset where the range starts.
    pub start_offset: usize,
    /// Character offset where the range ends.
    pub end_offset: usize,
    pub focus: FocusTarget,
}

impl SelectionEvent {
    pub fn range(text: impl Into<String>, start_offset: usize, end_offset: usize) -> Self {
        Self {
            text: text.into(),
            start_offset,
            end_offset,
            focus: FocusTarget::Document,
        }
    }

    /// Caret-only event (no range).
    pub fn collapsed(offset: usize, focus: FocusTarget) -> Self {
        Self {
            text: String::new(),
            start_offset: offset,
            end_offset: offset,
            focus,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start_offset == self.end_offset
    }
}

/// What the caller should do with its current selection after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionChange {
    Set(Anchor),
    Clear,
    /// Leave the current selection untouched.
    Keep,
}

/// Stateful resolver remembering the last anchor it produced.
#[derive(Debug, Default)]
pub struct SelectionResolver {
    last: Option<Anchor>,
}

impl SelectionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_anchor(&self) -> Option<&Anchor> {
        self.last.as_ref()
    }

    /// Forgets the remembered anchor.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Resolves one selection event against `document`.
    ///
    /// # Contract
    /// - Collapsed outside the comment panel: `Clear`.
    /// - Collapsed inside the comment panel: the last anchor when one exists,
    ///   `Keep` otherwise.
    /// - Whitespace-only ranges: `Keep`.
    /// - Ranges whose trimmed text does not match the document slice: `Clear`.
    pub fn resolve(&mut self, document: &Document, event: &SelectionEvent) -> SelectionChange {
        if event.is_collapsed() {
            return match (event.focus, self.last.as_ref()) {
                (FocusTarget::Document, _) => SelectionChange::Clear,
                (FocusTarget::CommentPanel, Some(last)) => SelectionChange::Set(last.clone()),
                (FocusTarget::CommentPanel, None) => SelectionChange::Keep,
            };
        }

        let (start, end) = if event.start_offset < event.end_offset {
            (event.start_offset, event.end_offset)
        } else {
            (event.end_offset, event.start_offset)
        };

        let trimmed_start = event.text.trim_start();
        let leading = event.text.chars().count() - trimmed_start.chars().count();
        let trimmed = trimmed_start.trim_end();
        if trimmed.is_empty() {
            debug!("event=selection_resolve module=selection status=skipped reason=blank");
            return SelectionChange::Keep;
        }
        let trailing = trimmed_start.chars().count() - trimmed.chars().count();

        let anchor_start = start + leading;
        let anchor_end = end.saturating_sub(trailing);
        match document.slice(anchor_start, anchor_end) {
            Some(found) if anchor_start < anchor_end && found == trimmed => {
                let anchor = Anchor::new(trimmed, anchor_start, anchor_end);
                debug!(
                    "event=selection_resolve module=selection status=ok start={} end={}",
                    anchor_start, anchor_end
                );
                self.last = Some(anchor.clone());
                SelectionChange::Set(anchor)
            }
            _ => {
                warn!(
                    "event=selection_resolve module=selection status=error error_code=slice_mismatch start={} end={} document_len={}",
                    anchor_start,
                    anchor_end,
                    document.len_chars()
                );
                SelectionChange::Clear
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FocusTarget, SelectionChange, SelectionEvent, SelectionResolver};
    use crate::model::anchor::Anchor;
    use crate::model::document::Document;

    fn doc() -> Document {
        Document::new("The quick brown fox")
    }

    #[test]
    fn range_selection_produces_anchor() {
        let mut resolver = SelectionResolver::new();
        let change = resolver.resolve(&doc(), &SelectionEvent::range("quick", 4, 9));
        assert_eq!(change, SelectionChange::Set(Anchor::new("quick", 4, 9)));
        assert_eq!(resolver.last_anchor(), Some(&Anchor::new("quick", 4, 9)));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_and_offsets_shift() {
        let mut resolver = SelectionResolver::new();
        let change = resolver.resolve(&doc(), &SelectionEvent::range(" quick ", 3, 10));
        assert_eq!(change, SelectionChange::Set(Anchor::new("quick", 4, 9)));
    }

    #[test]
    fn reversed_offsets_are_normalized() {
        let mut resolver = SelectionResolver::new();
        let change = resolver.resolve(&doc(), &SelectionEvent::range("brown", 15, 10));
        assert_eq!(change, SelectionChange::Set(Anchor::new("brown", 10, 15)));
    }

    #[test]
    fn collapsed_outside_panel_clears() {
        let mut resolver = SelectionResolver::new();
        resolver.resolve(&doc(), &SelectionEvent::range("quick", 4, 9));
        let change = resolver.resolve(&doc(), &SelectionEvent::collapsed(2, FocusTarget::Document));
        assert_eq!(change, SelectionChange::Clear);
    }

    #[test]
    fn collapsed_inside_panel_retains_last_anchor() {
        let mut resolver = SelectionResolver::new();
        let empty = resolver.resolve(
            &doc(),
            &SelectionEvent::collapsed(0, FocusTarget::CommentPanel),
        );
        assert_eq!(empty, SelectionChange::Keep);

        resolver.resolve(&doc(), &SelectionEvent::range("fox", 16, 19));
        let retained = resolver.resolve(
            &doc(),
            &SelectionEvent::collapsed(0, FocusTarget::CommentPanel),
        );
        assert_eq!(retained, SelectionChange::Set(Anchor::new("fox", 16, 19)));
    }

    #[test]
    fn blank_and_mismatched_selections_do_not_produce_anchors() {
        let mut resolver = SelectionResolver::new();
        assert_eq!(
            resolver.resolve(&doc(), &SelectionEvent::range("   ", 9, 10)),
            SelectionChange::Keep
        );
        assert_eq!(
            resolver.resolve(&doc(), &SelectionEvent::range("slow", 4, 8)),
            SelectionChange::Clear
        );
        assert!(resolver.last_anchor().is_none());
    }
}
