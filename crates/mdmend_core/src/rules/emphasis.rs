use std::path::Path;

use crate::config::RuleSettings;
use crate::rule::Rule;
use crate::rules::rewrite_text_lines;
use crate::text::{self, Document};
use crate::violation::{FixOutcome, Violation};

/// MD036: a paragraph made only of emphasis, standing in for a heading.
/// Report only.
pub struct EmphasisAsHeading {
    punctuation: String,
}

impl EmphasisAsHeading {
    pub fn new(settings: &RuleSettings) -> Self {
        Self {
            punctuation: settings
                .punctuation
                .clone()
                .unwrap_or_else(|| ".,;:!?".to_string()),
        }
    }

    /// Text of a line that is wholly wrapped in one emphasis span.
    fn emphasized(line: &str) -> Option<&str> {
        let trimmed = line.trim();
        for marker in ["**", "__", "*", "_"] {
            let Some(inner) = trimmed
                .strip_prefix(marker)
                .and_then(|rest| rest.strip_suffix(marker))
            else {
                continue;
            };
            let marker_char = &marker[..1];
            if inner.trim().is_empty()
                || inner.contains(marker_char)
                || inner.starts_with(char::is_whitespace)
                || inner.ends_with(char::is_whitespace)
            {
                return None;
            }
            return Some(inner);
        }
        None
    }

    fn alone(doc: &Document<'_>, i: usize) -> bool {
        let blank = |j: usize| doc.lines.get(j).is_none_or(|l| text::is_blank(l));
        (i == 0 || blank(i - 1)) && blank(i + 1)
    }
}

impl Rule for EmphasisAsHeading {
    fn id(&self) -> &'static str {
        "MD036"
    }
    fn name(&self) -> &'static str {
        "no-emphasis-as-heading"
    }
    fn description(&self) -> &'static str {
        "Emphasis used instead of a heading"
    }
    fn fixable(&self) -> bool {
        false
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        doc.text_lines()
            .filter(|(i, _)| Self::alone(&doc, *i))
            .filter_map(|(i, line)| {
                let inner = Self::emphasized(line)?;
                let last = inner.chars().last()?;
                if self.punctuation.contains(last) {
                    return None;
                }
                Some(
                    Violation::new(
                        self.id(),
                        i + 1,
                        text::leading_whitespace(line).len() + 1,
                        format!("Emphasis used instead of heading: {inner}"),
                    )
                    .with_fixable(false),
                )
            })
            .collect()
    }
}

/// An emphasis span found on a line: byte offsets of both delimiter runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    open: usize,
    close: usize,
    marker: u8,
}

/// Length of the run of `bytes[i]` starting at `i`.
fn run_at(bytes: &[u8], i: usize) -> usize {
    bytes[i..].iter().take_while(|b| **b == bytes[i]).count()
}

fn is_word(byte: Option<&u8>) -> bool {
    byte.is_some_and(|b| b.is_ascii_alphanumeric())
}

/// Emphasis spans in `part` whose delimiter runs are exactly `width` long.
///
/// Underscores only open and close at word boundaries. A span inside a URL
/// or link target is not emphasis.
fn spans(part: &str, width: usize) -> Vec<Span> {
    let bytes = part.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let marker = bytes[i];
        if marker != b'*' && marker != b'_' {
            i += 1;
            continue;
        }
        let run = run_at(bytes, i);
        let opens = run == width
            && bytes.get(i + run).is_some_and(|b| !b.is_ascii_whitespace())
            && !(marker == b'_' && is_word(i.checked_sub(1).and_then(|j| bytes.get(j))));
        if !opens {
            i += run;
            continue;
        }
        let mut j = i + run;
        let mut close = None;
        while j < bytes.len() {
            if bytes[j] != marker {
                j += 1;
                continue;
            }
            let closing = run_at(bytes, j);
            if closing == width
                && !bytes[j - 1].is_ascii_whitespace()
                && !(marker == b'_' && is_word(bytes.get(j + closing)))
            {
                close = Some(j);
                break;
            }
            j += closing;
        }
        match close {
            Some(j) => {
                let token = part[..i]
                    .rfind(char::is_whitespace)
                    .map_or(0, |at| at + 1);
                let linky = |s: &str| s.contains("://") || s.contains("](");
                if !linky(&part[token..i]) && !linky(&part[i + width..j]) {
                    spans.push(Span {
                        open: i,
                        close: j,
                        marker,
                    });
                }
                i = j + width;
            }
            None => i += run,
        }
    }
    spans
}

/// Shared check and fix for MD049 and MD050, which differ only in the
/// delimiter width.
struct DelimiterStyle {
    /// `None` means "whatever the first span uses".
    marker: Option<u8>,
    width: usize,
}

impl DelimiterStyle {
    fn new(settings: &RuleSettings, width: usize) -> Self {
        let marker = match settings.style.as_deref() {
            Some("underscore") => Some(b'_'),
            Some("consistent") => None,
            _ => Some(b'*'),
        };
        Self { marker, width }
    }

    /// Spans on each line, with offsets relative to the line.
    fn line_spans(&self, line: &str) -> Vec<Span> {
        text::outside_code(line)
            .into_iter()
            .flat_map(|(offset, part)| {
                spans(part, self.width).into_iter().map(move |s| Span {
                    open: s.open + offset,
                    close: s.close + offset,
                    marker: s.marker,
                })
            })
            .collect()
    }

    fn expected(&self, doc: &Document<'_>) -> Option<u8> {
        self.marker.or_else(|| {
            doc.text_lines()
                .find_map(|(_, line)| self.line_spans(line).first().map(|s| s.marker))
        })
    }

    /// Spans to convert. Swapping is skipped when a neighbouring byte is
    /// already the target marker, since the runs would merge.
    fn mismatches(&self, line: &str, expected: u8) -> Vec<Span> {
        let bytes = line.as_bytes();
        let touches = |at: usize| bytes.get(at) == Some(&expected);
        self.line_spans(line)
            .into_iter()
            .filter(|s| s.marker != expected)
            .filter(|s| {
                let before = s.open.checked_sub(1).is_some_and(|j| touches(j));
                !before && !touches(s.close + self.width)
            })
            .collect()
    }

    fn check(&self, rule: &dyn Rule, text: &str, message: &str) -> Vec<Violation> {
        let doc = Document::parse(text);
        let Some(expected) = self.expected(&doc) else {
            return Vec::new();
        };
        let mut violations = Vec::new();
        for (i, line) in doc.text_lines() {
            for span in self.mismatches(line, expected) {
                violations.push(Violation::new(rule.id(), i + 1, span.open + 1, message));
            }
        }
        violations
    }

    fn rewrite(&self, text: &str) -> FixOutcome {
        let doc = Document::parse(text);
        let Some(expected) = self.expected(&doc) else {
            return FixOutcome::unchanged(text);
        };
        rewrite_text_lines(text, |_, line| {
            let spans = self.mismatches(line, expected);
            if spans.is_empty() {
                return None;
            }
            let mut bytes = line.as_bytes().to_vec();
            for span in spans {
                for at in (span.open..span.open + self.width).chain(span.close..span.close + self.width) {
                    bytes[at] = expected;
                }
            }
            // Only ASCII delimiter bytes were swapped.
            String::from_utf8(bytes).ok()
        })
    }
}

fn marker_name(marker: Option<u8>) -> &'static str {
    match marker {
        Some(b'_') => "underscore",
        Some(_) => "asterisk",
        None => "consistent",
    }
}

/// MD049: emphasis style.
pub struct EmphasisStyle(DelimiterStyle);

impl EmphasisStyle {
    pub fn new(settings: &RuleSettings) -> Self {
        Self(DelimiterStyle::new(settings, 1))
    }
}

impl Rule for EmphasisStyle {
    fn id(&self) -> &'static str {
        "MD049"
    }
    fn name(&self) -> &'static str {
        "emphasis-style"
    }
    fn description(&self) -> &'static str {
        "Emphasis style should be consistent"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let message = format!("Expected {} emphasis", marker_name(self.0.marker));
        self.0.check(self, text, &message)
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        self.0.rewrite(text)
    }
}

/// MD050: strong style.
pub struct StrongStyle(DelimiterStyle);

impl StrongStyle {
    pub fn new(settings: &RuleSettings) -> Self {
        Self(DelimiterStyle::new(settings, 2))
    }
}

impl Rule for StrongStyle {
    fn id(&self) -> &'static str {
        "MD050"
    }
    fn name(&self) -> &'static str {
        "strong-style"
    }
    fn description(&self) -> &'static str {
        "Strong style should be consistent"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let message = format!("Expected {} strong", marker_name(self.0.marker));
        self.0.check(self, text, &message)
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        self.0.rewrite(text)
    }
}
