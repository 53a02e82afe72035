use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::warn;

use crate::config::RuleSettings;
use crate::rule::Rule;
use crate::rules::rewrite_text_lines;
use crate::text::{self, Document, LineKind};
use crate::violation::{FixOutcome, Violation};

static REVERSED_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(([^)]+)\)\[([^\]]+)\]").expect("reversed link pattern must compile")
});
static STAR_EMPHASIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\*\*|\*)([ \t]*)([^*]+?)([ \t]*)(\*\*|\*)").expect("emphasis pattern must compile")
});
static UNDERSCORE_EMPHASIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(__|_)([ \t]*)([^_]+?)([ \t]*)(__|_)").expect("emphasis pattern must compile")
});
static LINK_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(").expect("link text pattern must compile"));

/// A replacement inside one line: byte range and new text.
type Edit = (std::ops::Range<usize>, String);

/// Collects edits from every stretch of `line` outside code spans, with
/// ranges relative to the whole line.
fn edits_outside_code<F>(line: &str, mut f: F) -> Vec<Edit>
where
    F: FnMut(&str) -> Vec<Edit>,
{
    text::outside_code(line)
        .into_iter()
        .flat_map(|(offset, part)| {
            f(part)
                .into_iter()
                .map(move |(range, new)| (range.start + offset..range.end + offset, new))
        })
        .collect()
}

/// Applies non-overlapping edits sorted by position.
fn apply_edits(line: &str, edits: &[Edit]) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last = 0;
    for (range, new) in edits {
        out.push_str(&line[last..range.start]);
        out.push_str(new);
        last = range.end;
    }
    out.push_str(&line[last..]);
    out
}

fn check_edits<F>(rule: &dyn Rule, text: &str, message: &str, mut edits: F) -> Vec<Violation>
where
    F: FnMut(&str) -> Vec<Edit>,
{
    let doc = Document::parse(text);
    let mut violations = Vec::new();
    for (i, line) in doc.text_lines() {
        for (range, new) in edits(line) {
            violations.push(
                Violation::new(rule.id(), i + 1, range.start + 1, message).with_suggestion(new),
            );
        }
    }
    violations
}

fn rewrite_edits<F>(text: &str, mut edits: F) -> FixOutcome
where
    F: FnMut(&str) -> Vec<Edit>,
{
    rewrite_text_lines(text, |_, line| {
        let edits = edits(line);
        (!edits.is_empty()).then(|| apply_edits(line, &edits))
    })
}

/// MD011: `(text)[url]` instead of `[text](url)`.
pub struct ReversedLinks;

impl ReversedLinks {
    fn edits(line: &str) -> Vec<Edit> {
        edits_outside_code(line, |part| {
            REVERSED_LINK
                .captures_iter(part)
                .filter_map(|caps| {
                    let m = caps.get(0)?;
                    // `(a)[b](c)` and `[a](b)[c]` contain real links.
                    if part[m.end()..].starts_with('(') || part[..m.start()].ends_with(']') {
                        return None;
                    }
                    Some((m.range(), format!("[{}]({})", &caps[1], &caps[2])))
                })
                .collect()
        })
    }
}

impl Rule for ReversedLinks {
    fn id(&self) -> &'static str {
        "MD011"
    }
    fn name(&self) -> &'static str {
        "no-reversed-links"
    }
    fn description(&self) -> &'static str {
        "Reversed link syntax"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        check_edits(self, text, "Reversed link syntax", Self::edits)
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        rewrite_edits(text, Self::edits)
    }
}

/// MD027: more than one space after the blockquote marker.
pub struct BlockquoteSpaces;

impl BlockquoteSpaces {
    fn edits(line: &str) -> Vec<Edit> {
        if !text::is_blockquote(line) {
            return Vec::new();
        }
        let prefix_len = line.len() - line.trim_start_matches(['>', ' ', '\t']).len();
        let Some(marker) = line[..prefix_len].rfind('>') else {
            return Vec::new();
        };
        let gap = marker + 1..prefix_len;
        // Four or more spaces start an indented code block inside the quote.
        if gap.len() < 2 || gap.len() >= 4 || prefix_len == line.len() {
            return Vec::new();
        }
        vec![(gap, " ".to_string())]
    }
}

impl Rule for BlockquoteSpaces {
    fn id(&self) -> &'static str {
        "MD027"
    }
    fn name(&self) -> &'static str {
        "no-multiple-space-blockquote"
    }
    fn description(&self) -> &'static str {
        "Multiple spaces after blockquote symbol"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        check_edits(self, text, "Multiple spaces after blockquote symbol", Self::edits)
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        rewrite_edits(text, Self::edits)
    }
}

/// MD037: spaces inside emphasis markers.
pub struct SpacesInEmphasis;

impl SpacesInEmphasis {
    fn tighten(caps: &Captures<'_>) -> Option<Edit> {
        let m = caps.get(0)?;
        if caps[1] != caps[5] || (caps[2].is_empty() && caps[4].is_empty()) {
            return None;
        }
        Some((m.range(), format!("{}{}{}", &caps[1], &caps[3], &caps[5])))
    }

    fn edits(line: &str) -> Vec<Edit> {
        if text::is_hr(line) {
            return Vec::new();
        }
        // Emphasis is only searched after a list marker.
        let start = match text::list_item(line) {
            Some(item) => line.len() - item.content.len(),
            None => 0,
        };
        let mut edits: Vec<Edit> = edits_outside_code(&line[start..], |part| {
            let mut found: Vec<Edit> = STAR_EMPHASIS
                .captures_iter(part)
                .chain(UNDERSCORE_EMPHASIS.captures_iter(part))
                .filter_map(|caps| Self::tighten(&caps))
                .collect();
            found.sort_by_key(|(range, _)| range.start);
            // Star and underscore matches may overlap; the first one wins.
            let mut end = 0;
            found.retain(|(range, _)| {
                let keep = range.start >= end;
                if keep {
                    end = range.end;
                }
                keep
            });
            found
        });
        for (range, _) in &mut edits {
            *range = range.start + start..range.end + start;
        }
        edits
    }
}

impl Rule for SpacesInEmphasis {
    fn id(&self) -> &'static str {
        "MD037"
    }
    fn name(&self) -> &'static str {
        "no-space-in-emphasis"
    }
    fn description(&self) -> &'static str {
        "Spaces inside emphasis markers"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        check_edits(self, text, "Spaces inside emphasis markers", Self::edits)
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        rewrite_edits(text, Self::edits)
    }
}

/// MD038: spaces inside code spans.
pub struct SpacesInCodeSpans;

impl SpacesInCodeSpans {
    fn edits(line: &str) -> Vec<Edit> {
        text::code_spans(line)
            .into_iter()
            .filter_map(|span| {
                let code = &line[span.clone()];
                let ticks = code.bytes().take_while(|b| *b == b'`').count();
                let inner = &code[ticks..code.len() - ticks];
                let trimmed = inner.trim();
                if trimmed.len() == inner.len()
                    || trimmed.is_empty()
                    || trimmed.starts_with('`')
                    || trimmed.ends_with('`')
                {
                    return None;
                }
                let run = &code[..ticks];
                Some((span, format!("{run}{trimmed}{run}")))
            })
            .collect()
    }
}

impl Rule for SpacesInCodeSpans {
    fn id(&self) -> &'static str {
        "MD038"
    }
    fn name(&self) -> &'static str {
        "no-space-in-code"
    }
    fn description(&self) -> &'static str {
        "Spaces inside code span elements"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        check_edits(self, text, "Spaces inside code span elements", Self::edits)
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        rewrite_edits(text, Self::edits)
    }
}

/// MD039: spaces inside link text.
pub struct SpacesInLinkText;

impl SpacesInLinkText {
    fn edits(line: &str) -> Vec<Edit> {
        edits_outside_code(line, |part| {
            LINK_TEXT
                .captures_iter(part)
                .filter_map(|caps| {
                    let label = caps.get(1)?;
                    let trimmed = label.as_str().trim();
                    if trimmed.is_empty() || trimmed.len() == label.len() {
                        return None;
                    }
                    Some((label.range(), trimmed.to_string()))
                })
                .collect()
        })
    }
}

impl Rule for SpacesInLinkText {
    fn id(&self) -> &'static str {
        "MD039"
    }
    fn name(&self) -> &'static str {
        "no-space-in-links"
    }
    fn description(&self) -> &'static str {
        "Spaces inside link text"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        check_edits(self, text, "Spaces inside link text", Self::edits)
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        rewrite_edits(text, Self::edits)
    }
}

/// MD044: proper names with the wrong capitalization.
pub struct ProperNames {
    names: Vec<(String, Regex)>,
    code_blocks: bool,
}

impl ProperNames {
    pub fn new(settings: &RuleSettings) -> Self {
        let names = settings
            .names
            .iter()
            .flatten()
            .filter(|name| !name.trim().is_empty())
            .filter_map(|name| {
                // Word boundaries only make sense next to word characters.
                let edge = |c: Option<char>| match c {
                    Some(c) if c.is_alphanumeric() || c == '_' => r"\b",
                    _ => "",
                };
                let pattern = format!(
                    "(?i){}{}{}",
                    edge(name.chars().next()),
                    regex::escape(name),
                    edge(name.chars().last())
                );
                match Regex::new(&pattern) {
                    Ok(re) => Some((name.clone(), re)),
                    Err(e) => {
                        warn!("Skipping proper name {:?}: {}", name, e);
                        None
                    }
                }
            })
            .collect();
        Self {
            names,
            code_blocks: settings.code_blocks.unwrap_or(false),
        }
    }

    /// Whether the match sits in a URL, address, domain or link target.
    fn in_address(part: &str, range: &std::ops::Range<usize>) -> bool {
        let start = part[..range.start]
            .rfind(char::is_whitespace)
            .map_or(0, |at| at + 1);
        let end = part[range.end..]
            .find(char::is_whitespace)
            .map_or(part.len(), |at| range.end + at);
        let token = &part[start..end];
        let after = &part[range.end..];
        token.contains("://")
            || token.starts_with("www.")
            || token.contains('@')
            || token.contains("](")
            || part[..range.start].ends_with(['.', '/'])
            || (after.starts_with('.') && after[1..].starts_with(char::is_alphanumeric))
    }

    fn edits(&self, line: &str) -> Vec<Edit> {
        let mut edits: Vec<Edit> = edits_outside_code(line, |part| {
            self.names
                .iter()
                .flat_map(|(name, re)| {
                    re.find_iter(part)
                        .filter(|m| m.as_str() != name && !Self::in_address(part, &m.range()))
                        .map(|m| (m.range(), name.clone()))
                        .collect::<Vec<_>>()
                })
                .collect()
        });
        edits.sort_by_key(|(range, _)| range.start);
        let mut last_end = 0;
        edits.retain(|(range, _)| {
            let keep = range.start >= last_end;
            if keep {
                last_end = range.end;
            }
            keep
        });
        edits
    }

    fn checked(&self, kind: LineKind) -> bool {
        kind == LineKind::Text || (self.code_blocks && kind == LineKind::Code)
    }
}

impl Rule for ProperNames {
    fn id(&self) -> &'static str {
        "MD044"
    }
    fn name(&self) -> &'static str {
        "proper-names"
    }
    fn description(&self) -> &'static str {
        "Proper names should have the correct capitalization"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        let mut violations = Vec::new();
        for (i, line) in doc.lines.iter().enumerate() {
            if !self.checked(doc.kinds[i]) {
                continue;
            }
            for (range, name) in self.edits(line) {
                violations.push(
                    Violation::new(
                        self.id(),
                        i + 1,
                        range.start + 1,
                        format!("Proper name should be written {name}: {}", &line[range]),
                    )
                    .with_suggestion(name),
                );
            }
        }
        violations
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let doc = Document::parse(text);
        let mut changed = false;
        let lines = doc
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let edits = if self.checked(doc.kinds[i]) { self.edits(line) } else { Vec::new() };
                if edits.is_empty() {
                    return line.to_string();
                }
                changed = true;
                apply_edits(line, &edits)
            })
            .collect();
        FixOutcome::new(changed, lines)
    }
}
