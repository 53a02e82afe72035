//! Value types produced by rules.

use serde::Serialize;

/// A single rule failure at a line and column (both 1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Identifier of the rule that reported this violation.
    pub rule_id: &'static str,
    /// Line number (1-based).
    pub line: usize,
    /// Column number (1-based).
    pub column: usize,
    /// Human-readable message.
    pub message: String,
    /// Whether the rule can rewrite this violation.
    pub fixable: bool,
    /// Suggested replacement, if the rule has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested: Option<String>,
}

impl Violation {
    /// Creates a fixable violation without a suggestion.
    pub fn new(rule_id: &'static str, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            rule_id,
            line,
            column,
            message: message.into(),
            fixable: true,
            suggested: None,
        }
    }

    /// Sets whether the violation is fixable.
    pub fn with_fixable(mut self, fixable: bool) -> Self {
        self.fixable = fixable;
        self
    }

    /// Attaches a suggested replacement.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggested = Some(suggestion.into());
        self
    }
}

/// Result of a rule rewrite: the full line sequence, not a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixOutcome {
    /// Whether the rewrite changed anything.
    pub changed: bool,
    /// Every line of the document after the rewrite.
    pub lines: Vec<String>,
}

impl FixOutcome {
    /// Creates an outcome from rewritten lines.
    pub fn new(changed: bool, lines: Vec<String>) -> Self {
        Self { changed, lines }
    }

    /// Creates an outcome indicating no changes were made.
    pub fn unchanged(text: &str) -> Self {
        Self {
            changed: false,
            lines: crate::text::split_lines(text)
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Serializes the lines back into document text.
    pub fn content(&self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unchanged_round_trips_text() {
        let text = "# Title\n\nbody\n";
        let outcome = FixOutcome::unchanged(text);
        assert!(!outcome.changed);
        assert_eq!(outcome.lines, vec!["# Title", "", "body", ""]);
        assert_eq!(outcome.content(), text);
    }

    #[test]
    fn test_violation_builders() {
        let v = Violation::new("MD051", 3, 7, "Invalid link fragment: #instal")
            .with_fixable(false)
            .with_suggestion("install");
        assert_eq!(v.rule_id, "MD051");
        assert!(!v.fixable);
        assert_eq!(v.suggested.as_deref(), Some("install"));
    }

    #[test]
    fn test_violation_serializes_without_empty_suggestion() {
        let v = Violation::new("MD009", 1, 5, "Trailing spaces");
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["rule_id"], "MD009");
        assert!(json.get("suggested").is_none());
    }
}
