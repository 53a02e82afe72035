use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::RuleSettings;
use crate::rule::Rule;
use crate::rules::rewrite_text_lines;
use crate::text::{self, Document};
use crate::violation::{FixOutcome, Violation};

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([A-Za-z][A-Za-z0-9-]*)(?:\s[^<>]*)?/?>").expect("html tag pattern must compile")
});

/// The `>` markers that open a blockquote line, without trailing space.
fn quote_prefix(line: &str) -> &str {
    let body = line.trim_start_matches(['>', ' ', '\t']);
    line[..line.len() - body.len()].trim_end()
}

/// MD028: blank lines between two parts of a blockquote.
///
/// The fix turns each blank into an empty quote line, so the quote reads as
/// one block.
pub struct BlockquoteBlanks;

impl BlockquoteBlanks {
    /// Blank lines that split a blockquote, each with the prefix to fill it.
    fn gaps<'a>(doc: &Document<'a>) -> Vec<(usize, &'a str)> {
        let mut gaps = Vec::new();
        let mut i = 1;
        while i < doc.len() {
            let quoted = doc.is_text(i - 1) && text::is_blockquote(doc.lines[i - 1]);
            if !quoted || !doc.is_text(i) || !text::is_blank(doc.lines[i]) {
                i += 1;
                continue;
            }
            let end = (i..doc.len())
                .find(|&j| !(doc.is_text(j) && text::is_blank(doc.lines[j])))
                .unwrap_or(doc.len());
            if end < doc.len() && doc.is_text(end) && text::is_blockquote(doc.lines[end]) {
                let prefix = quote_prefix(doc.lines[i - 1]);
                gaps.extend((i..end).map(|j| (j, prefix)));
            }
            i = end;
        }
        gaps
    }
}

impl Rule for BlockquoteBlanks {
    fn id(&self) -> &'static str {
        "MD028"
    }
    fn name(&self) -> &'static str {
        "no-blanks-blockquote"
    }
    fn description(&self) -> &'static str {
        "Blank line inside blockquote"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        Self::gaps(&Document::parse(text))
            .into_iter()
            .map(|(i, prefix)| {
                Violation::new(self.id(), i + 1, 1, "Blank line inside blockquote")
                    .with_suggestion(prefix)
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let doc = Document::parse(text);
        let gaps = Self::gaps(&doc);
        if gaps.is_empty() {
            return FixOutcome::unchanged(text);
        }
        let mut lines: Vec<String> = doc.lines.iter().map(|l| l.to_string()).collect();
        for (i, prefix) in gaps {
            lines[i] = prefix.to_string();
        }
        FixOutcome::new(true, lines)
    }
}

/// MD033: inline HTML. Report only.
pub struct InlineHtml {
    allowed: Vec<String>,
}

impl InlineHtml {
    pub fn new(settings: &RuleSettings) -> Self {
        Self {
            allowed: settings
                .allowed_tags
                .iter()
                .flatten()
                .map(|tag| tag.to_ascii_lowercase())
                .collect(),
        }
    }
}

impl Rule for InlineHtml {
    fn id(&self) -> &'static str {
        "MD033"
    }
    fn name(&self) -> &'static str {
        "no-inline-html"
    }
    fn description(&self) -> &'static str {
        "Inline HTML"
    }
    fn fixable(&self) -> bool {
        false
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        let mut violations = Vec::new();
        for (i, line) in doc.text_lines() {
            for (offset, part) in text::outside_code(line) {
                for caps in HTML_TAG.captures_iter(part) {
                    let tag = &caps[1];
                    if self.allowed.contains(&tag.to_ascii_lowercase()) {
                        continue;
                    }
                    let column = offset + caps.get(0).map_or(0, |m| m.start()) + 1;
                    violations.push(
                        Violation::new(self.id(), i + 1, column, format!("Inline HTML: <{tag}>"))
                            .with_fixable(false),
                    );
                }
            }
        }
        violations
    }
}

/// MD035: thematic break style.
pub struct HrStyle {
    /// `None` means "whatever the first break uses".
    style: Option<String>,
}

impl HrStyle {
    pub fn new(settings: &RuleSettings) -> Self {
        let style = match settings.style.as_deref() {
            Some("consistent") => None,
            Some(style) if text::is_hr(style) => Some(style.trim().to_string()),
            _ => Some("---".to_string()),
        };
        Self { style }
    }

    /// Thematic breaks in the document. Setext underlines are not breaks.
    fn breaks<'a>(doc: &Document<'a>) -> Vec<(usize, &'a str)> {
        doc.text_lines()
            .filter(|(i, line)| {
                text::is_hr(line) && !(*i > 0 && doc.setext_text(i - 1).is_some())
            })
            .collect()
    }

    /// Whether writing `style` on line `i` would underline the line above.
    fn would_underline(doc: &Document<'_>, i: usize, style: &str) -> bool {
        style.starts_with('-')
            && i > 0
            && doc.is_text(i - 1)
            && !text::is_blank(doc.lines[i - 1])
    }

    fn mismatches<'a>(&self, doc: &Document<'a>) -> Vec<(usize, &'a str, String)> {
        let breaks = Self::breaks(doc);
        let Some(expected) = self
            .style
            .clone()
            .or_else(|| breaks.first().map(|(_, line)| line.trim().to_string()))
        else {
            return Vec::new();
        };
        breaks
            .into_iter()
            .filter(|(_, line)| line.trim() != expected)
            .map(|(i, line)| (i, line, expected.clone()))
            .collect()
    }
}

impl Rule for HrStyle {
    fn id(&self) -> &'static str {
        "MD035"
    }
    fn name(&self) -> &'static str {
        "hr-style"
    }
    fn description(&self) -> &'static str {
        "Horizontal rule style"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        self.mismatches(&doc)
            .into_iter()
            .map(|(i, line, expected)| {
                let column = text::leading_whitespace(line).len() + 1;
                let fixable = !Self::would_underline(&doc, i, &expected);
                Violation::new(
                    self.id(),
                    i + 1,
                    column,
                    format!("Expected horizontal rule {expected}"),
                )
                .with_suggestion(expected)
                .with_fixable(fixable)
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let doc = Document::parse(text);
        let mismatches = self.mismatches(&doc);
        rewrite_text_lines(text, |i, line| {
            let (_, _, expected) = mismatches.iter().find(|(j, _, _)| *j == i)?;
            if Self::would_underline(&doc, i, expected) {
                return None;
            }
            Some(format!("{}{}", text::leading_whitespace(line), expected))
        })
    }
}
