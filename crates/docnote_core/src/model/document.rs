//! Document text addressed by character offsets.

use serde::{Deserialize, Serialize};

/// Rendered text content that anchors point into.
///
/// Offsets handed out by the selection surface count characters (Unicode
/// scalar values). All slicing goes through this type so byte boundaries are
/// never exposed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Document {
    text: String,
    char_len: usize,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let char_len = text.chars().count();
        Self { text, char_len }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    pub fn len_chars(&self) -> usize {
        self.char_len
    }

    pub fn is_empty(&self) -> bool {
        self.char_len == 0
    }

    /// Returns the text in `[start, end)`, or `None` when the range is
    /// reversed or runs past the end of the document.
    pub fn slice(&self, start: usize, end: usize) -> Option<&str> {
        if start > end || end > self.char_len {
            return None;
        }
        let from = self.byte_offset(start)?;
        let to = self.byte_offset(end)?;
        self.text.get(from..to)
    }

    /// Returns everything from `start` to the end of the document.
    pub fn tail(&self, start: usize) -> &str {
        self.slice(start, self.char_len).unwrap_or("")
    }

    fn byte_offset(&self, char_index: usize) -> Option<usize> {
        if char_index == self.char_len {
            return Some(self.text.len());
        }
        self.text
            .char_indices()
            .nth(char_index)
            .map(|(byte_index, _)| byte_index)
    }
}

impl From<String> for Document {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Document {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Document> for String {
    fn from(value: Document) -> Self {
        value.text
    }
}
