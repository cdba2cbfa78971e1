//! Open documents and versioned results

use serde::Serialize;

/// Text of an open document and its version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentState {
    /// Bumped by every update, starting at 1
    pub version: u64,
    pub text: String,
}

impl DocumentState {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            version: 1,
            text: text.into(),
        }
    }

    /// State of a reopened document, continuing after the version it was
    /// closed at
    #[must_use]
    pub fn reopened(text: impl Into<String>, closed_at: u64) -> Self {
        Self {
            version: closed_at + 1,
            text: text.into(),
        }
    }

    /// Replace the text and bump the version
    pub fn update(&mut self, text: impl Into<String>) -> u64 {
        self.version += 1;
        self.text = text.into();
        self.version
    }
}

/// A value computed from one version of one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Versioned<T> {
    pub uri: String,
    pub version: u64,
    pub value: T,
}

impl<T> Versioned<T> {
    pub fn new(uri: impl Into<String>, version: u64, value: T) -> Self {
        Self {
            uri: uri.into(),
            version,
            value,
        }
    }

    /// Same tag, different value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Versioned<U> {
        Versioned {
            uri: self.uri,
            version: self.version,
            value: f(self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_bumps_version() {
        let mut state = DocumentState::new("profile:\n");
        assert_eq!(state.version, 1);
        assert_eq!(state.update("profile:\n  elements:\n"), 2);
        assert_eq!(state.text, "profile:\n  elements:\n");
    }

    #[test]
    fn test_reopened_continues_numbering() {
        assert_eq!(DocumentState::reopened("", 4).version, 5);
    }

    #[test]
    fn test_map_keeps_tag() {
        let tagged = Versioned::new("file:///act.yaml", 3, "abc").map(str::len);
        assert_eq!(tagged, Versioned::new("file:///act.yaml", 3, 3));
    }
}
