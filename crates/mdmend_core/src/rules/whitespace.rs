use std::path::Path;

use crate::config::RuleSettings;
use crate::rule::Rule;
use crate::rules::rewrite_text_lines;
use crate::text::{self, Document, LineKind};
use crate::violation::{FixOutcome, Violation};

/// MD009: trailing spaces and tabs.
pub struct TrailingSpaces;

impl Rule for TrailingSpaces {
    fn id(&self) -> &'static str {
        "MD009"
    }
    fn name(&self) -> &'static str {
        "no-trailing-spaces"
    }
    fn description(&self) -> &'static str {
        "Trailing spaces"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        text::split_lines(text)
            .iter()
            .enumerate()
            .filter_map(|(i, line)| {
                let trimmed = line.trim_end_matches([' ', '\t']);
                (trimmed.len() < line.len())
                    .then(|| Violation::new(self.id(), i + 1, trimmed.len() + 1, "Trailing spaces"))
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let mut changed = false;
        let lines = text::split_lines(text)
            .into_iter()
            .map(|line| {
                let trimmed = line.trim_end_matches([' ', '\t']);
                changed |= trimmed.len() < line.len();
                trimmed.to_string()
            })
            .collect();
        FixOutcome::new(changed, lines)
    }
}

/// MD010: hard tabs outside code blocks.
pub struct HardTabs {
    tab_size: usize,
}

impl HardTabs {
    pub fn new(settings: &RuleSettings, default_tab_size: usize) -> Self {
        Self {
            tab_size: settings.tab_size.filter(|n| *n > 0).unwrap_or(default_tab_size),
        }
    }

    fn expand(&self, line: &str) -> String {
        let mut out = String::with_capacity(line.len() + self.tab_size);
        let mut width = 0;
        for c in line.chars() {
            if c == '\t' {
                let pad = self.tab_size - width % self.tab_size;
                out.extend(std::iter::repeat_n(' ', pad));
                width += pad;
            } else {
                out.push(c);
                width += 1;
            }
        }
        out
    }
}

impl Rule for HardTabs {
    fn id(&self) -> &'static str {
        "MD010"
    }
    fn name(&self) -> &'static str {
        "no-hard-tabs"
    }
    fn description(&self) -> &'static str {
        "Hard tabs"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        Document::parse(text)
            .text_lines()
            .filter_map(|(i, line)| {
                line.find('\t')
                    .map(|col| Violation::new(self.id(), i + 1, col + 1, "Hard tab"))
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        rewrite_text_lines(text, |_, line| line.contains('\t').then(|| self.expand(line)))
    }
}

/// MD012: more than one consecutive blank line.
pub struct MultipleBlankLines;

impl MultipleBlankLines {
    fn redundant(doc: &Document<'_>) -> Vec<usize> {
        // The final empty line only carries the trailing newline.
        let end = match doc.lines.last() {
            Some(last) if last.is_empty() => doc.len() - 1,
            _ => doc.len(),
        };
        (1..end)
            .filter(|&i| {
                doc.is_text(i)
                    && doc.is_text(i - 1)
                    && text::is_blank(doc.lines[i])
                    && text::is_blank(doc.lines[i - 1])
            })
            .collect()
    }
}

impl Rule for MultipleBlankLines {
    fn id(&self) -> &'static str {
        "MD012"
    }
    fn name(&self) -> &'static str {
        "no-multiple-blanks"
    }
    fn description(&self) -> &'static str {
        "Multiple consecutive blank lines"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        Self::redundant(&Document::parse(text))
            .into_iter()
            .map(|i| Violation::new(self.id(), i + 1, 1, "Multiple consecutive blank lines"))
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let doc = Document::parse(text);
        let redundant = Self::redundant(&doc);
        if redundant.is_empty() {
            return FixOutcome::unchanged(text);
        }
        let lines = doc
            .lines
            .iter()
            .enumerate()
            .filter(|(i, _)| redundant.binary_search(i).is_err())
            .map(|(_, l)| l.to_string())
            .collect();
        FixOutcome::new(true, lines)
    }
}

/// MD013: line length. Report only.
pub struct LineLength {
    limit: usize,
    code_blocks: bool,
    tables: bool,
}

impl LineLength {
    pub fn new(settings: &RuleSettings) -> Self {
        Self {
            limit: settings.line_length.unwrap_or(120),
            code_blocks: settings.code_blocks.unwrap_or(false),
            tables: settings.tables.unwrap_or(false),
        }
    }
}

impl Rule for LineLength {
    fn id(&self) -> &'static str {
        "MD013"
    }
    fn name(&self) -> &'static str {
        "line-length"
    }
    fn description(&self) -> &'static str {
        "Line length should not exceed configured limit"
    }
    fn fixable(&self) -> bool {
        false
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        let mut violations = Vec::new();
        for (i, line) in doc.lines.iter().enumerate() {
            match doc.kinds[i] {
                LineKind::FrontMatter => continue,
                LineKind::Code | LineKind::Fence if !self.code_blocks => continue,
                _ => {}
            }
            if !self.tables && line.trim_start().starts_with('|') {
                continue;
            }
            let length = line.chars().count();
            if length <= self.limit {
                continue;
            }
            // A long unbreakable token (usually a URL) past the limit is allowed.
            let tail: String = line.chars().skip(self.limit).collect();
            if !tail.contains(char::is_whitespace) {
                continue;
            }
            violations.push(
                Violation::new(
                    self.id(),
                    i + 1,
                    self.limit + 1,
                    format!("Line length {} exceeds {}", length, self.limit),
                )
                .with_fixable(false),
            );
        }
        violations
    }
}

/// MD047: files end with exactly one newline.
pub struct TrailingNewline;

impl Rule for TrailingNewline {
    fn id(&self) -> &'static str {
        "MD047"
    }
    fn name(&self) -> &'static str {
        "single-trailing-newline"
    }
    fn description(&self) -> &'static str {
        "Files should end with a single newline character"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        if text.is_empty() {
            return Vec::new();
        }
        let line = text::split_lines(text).len();
        if !text.ends_with('\n') {
            vec![Violation::new(
                self.id(),
                line,
                1,
                "File does not end with a single newline",
            )]
        } else if text.len() > 1 && text.ends_with("\n\n") {
            vec![Violation::new(
                self.id(),
                line,
                1,
                "File has multiple trailing newlines",
            )]
        } else {
            Vec::new()
        }
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        if text.is_empty() {
            return FixOutcome::unchanged(text);
        }
        let fixed = format!("{}\n", text.trim_end_matches('\n'));
        if fixed == text {
            return FixOutcome::unchanged(text);
        }
        FixOutcome::new(true, text::split_lines(&fixed).into_iter().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{check, fix};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn count(rule: &dyn Rule, text: &str) -> usize {
        check(rule, text).len()
    }

    #[test]
    fn test_trailing_spaces() {
        let text = "a  \nb\t\nc\n";
        let violations = check(&TrailingSpaces, text);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].column, 2);
        assert_eq!(fix(&TrailingSpaces, text), "a\nb\nc\n");
    }

    #[rstest]
    #[case::leading("\titem", "    item")]
    #[case::aligned("ab\tc", "ab  c")]
    #[case::two("\t\tx", "        x")]
    fn test_hard_tabs_expand_to_tab_stops(#[case] line: &str, #[case] expected: &str) {
        let rule = HardTabs::new(&RuleSettings::default(), 4);
        assert_eq!(fix(&rule, line), expected);
    }

    #[test]
    fn test_hard_tabs_leave_code_alone() {
        let rule = HardTabs::new(&RuleSettings::default(), 4);
        let text = "```make\nall:\n\tcc main.c\n```\n";
        assert_eq!(count(&rule, text), 0);
        assert_eq!(fix(&rule, text), text);
    }

    #[test]
    fn test_hard_tabs_setting_overrides_default() {
        let settings = RuleSettings {
            tab_size: Some(2),
            ..RuleSettings::default()
        };
        assert_eq!(fix(&HardTabs::new(&settings, 4), "\tx"), "  x");
    }

    #[test]
    fn test_multiple_blank_lines() {
        let text = "a\n\n\n\nb\n";
        assert_eq!(count(&MultipleBlankLines, text), 2);
        assert_eq!(fix(&MultipleBlankLines, text), "a\n\nb\n");
    }

    #[test]
    fn test_multiple_blank_lines_inside_code_are_kept() {
        let text = "```\na\n\n\nb\n```\n";
        assert_eq!(count(&MultipleBlankLines, text), 0);
    }

    #[test]
    fn test_line_length() {
        let settings = RuleSettings {
            line_length: Some(10),
            ..RuleSettings::default()
        };
        let rule = LineLength::new(&settings);
        let text = "short\nthis line is too long\nhttps://example.com/very/long\n";
        let violations = check(&rule, text);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 2);
        assert!(!violations[0].fixable);
    }

    #[rstest]
    #[case::missing("a", "a\n", 1)]
    #[case::extra("a\n\n\n", "a\n", 1)]
    #[case::ok("a\n", "a\n", 0)]
    #[case::empty("", "", 0)]
    fn test_trailing_newline(#[case] text: &str, #[case] expected: &str, #[case] violations: usize) {
        assert_eq!(count(&TrailingNewline, text), violations);
        assert_eq!(fix(&TrailingNewline, text), expected);
    }
}
