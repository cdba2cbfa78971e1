//! Line-range replacements
//!
//! Cascade operations never hand back a whole new document; they return the
//! smallest line range that changed, which an editor can apply in place.

use serde::{Deserialize, Serialize};

/// Replace lines `start_line..end_line` (0-based, end exclusive) with
/// `new_text`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub start_line: usize,
    pub end_line: usize,
    pub new_text: String,
}

/// Set of non-overlapping edits
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Delta {
    pub edits: Vec<TextEdit>,
}

impl Delta {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Single hunk turning `old` into `new`, built from the common leading
    /// and trailing lines
    #[must_use]
    pub fn compute(old: &str, new: &str) -> Self {
        let old_lines: Vec<&str> = old.split_inclusive('\n').collect();
        let new_lines: Vec<&str> = new.split_inclusive('\n').collect();

        let prefix = old_lines
            .iter()
            .zip(&new_lines)
            .take_while(|(a, b)| a == b)
            .count();
        if prefix == old_lines.len() && prefix == new_lines.len() {
            return Self::empty();
        }

        let room = old_lines.len().min(new_lines.len()) - prefix;
        let suffix = old_lines
            .iter()
            .rev()
            .zip(new_lines.iter().rev())
            .take(room)
            .take_while(|(a, b)| a == b)
            .count();

        Self {
            edits: vec![TextEdit {
                start_line: prefix,
                end_line: old_lines.len() - suffix,
                new_text: new_lines[prefix..new_lines.len() - suffix].concat(),
            }],
        }
    }

    /// Apply the edits to `text`
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        let mut lines: Vec<String> = text.split_inclusive('\n').map(str::to_string).collect();
        let mut edits: Vec<&TextEdit> = self.edits.iter().collect();
        edits.sort_by(|a, b| b.start_line.cmp(&a.start_line));

        for edit in edits {
            let start = edit.start_line.min(lines.len());
            let end = edit.end_line.clamp(start, lines.len());
            lines.splice(start..end, std::iter::once(edit.new_text.clone()));
        }
        lines.concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text_gives_empty_delta() {
        assert!(Delta::compute("a\nb\n", "a\nb\n").is_empty());
        assert!(Delta::compute("", "").is_empty());
    }

    #[test]
    fn test_single_hunk_in_the_middle() {
        let old = "profile:\n  elements:\n    act:\n";
        let new = "profile:\n  elements:\n    act:\n\n    meta:\n";
        let delta = Delta::compute(old, new);
        assert_eq!(delta.edits.len(), 1);
        assert_eq!(delta.edits[0].start_line, 3);
        assert_eq!(delta.edits[0].end_line, 3);
        assert_eq!(delta.edits[0].new_text, "\n    meta:\n");
        assert_eq!(delta.apply(old), new);
    }

    #[test]
    fn test_apply_reproduces_new_text() {
        let cases = [
            ("a\nb\nc\n", "a\nx\nc\n"),
            ("a\nb\nc\n", "c\n"),
            ("", "profile:\n  elements:\n"),
            ("a\nb", "a\nb\n"),
            ("a\na\na\n", "a\na\n"),
        ];
        for (old, new) in cases {
            assert_eq!(Delta::compute(old, new).apply(old), new, "{old:?} -> {new:?}");
        }
    }
}
