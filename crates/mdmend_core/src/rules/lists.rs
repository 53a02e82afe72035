use std::collections::BTreeMap;
use std::path::Path;

use crate::config::RuleSettings;
use crate::rule::Rule;
use crate::rules::{blank_gaps, rewrite_text_lines};
use crate::text::{self, Document};
use crate::violation::{FixOutcome, Violation};

/// MD004: unordered list marker style.
pub struct ListStyle {
    /// `None` means "whatever the first bullet uses".
    marker: Option<&'static str>,
}

impl ListStyle {
    pub fn new(settings: &RuleSettings) -> Self {
        let marker = match settings.style.as_deref() {
            Some("asterisk") => Some("*"),
            Some("plus") => Some("+"),
            Some("consistent") => None,
            _ => Some("-"),
        };
        Self { marker }
    }

    fn expected<'a>(&self, doc: &Document<'a>) -> Option<&'a str> {
        if let Some(marker) = self.marker {
            return Some(marker);
        }
        doc.text_lines()
            .filter_map(|(_, line)| text::list_item(line))
            .find(|item| item.is_bullet())
            .map(|item| item.marker)
    }
}

impl Rule for ListStyle {
    fn id(&self) -> &'static str {
        "MD004"
    }
    fn name(&self) -> &'static str {
        "ul-style"
    }
    fn description(&self) -> &'static str {
        "Unordered list style should be consistent"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        let Some(expected) = self.expected(&doc) else {
            return Vec::new();
        };
        doc.text_lines()
            .filter_map(|(i, line)| {
                let item = text::list_item(line)?;
                (item.is_bullet() && item.marker != expected).then(|| {
                    Violation::new(
                        self.id(),
                        i + 1,
                        item.indent.len() + 1,
                        format!("Expected list marker '{}', found '{}'", expected, item.marker),
                    )
                })
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let expected = match self.expected(&Document::parse(text)) {
            Some(marker) => marker.to_string(),
            None => return FixOutcome::unchanged(text),
        };
        rewrite_text_lines(text, |_, line| {
            let item = text::list_item(line)?;
            if !item.is_bullet() || item.marker == expected {
                return None;
            }
            let at = item.indent.len();
            Some(format!("{}{}{}", &line[..at], expected, &line[at + 1..]))
        })
    }
}

/// Width of an indent with tabs counted as four columns.
fn indent_width(indent: &str) -> usize {
    indent.chars().map(|c| if c == '\t' { 4 } else { 1 }).sum()
}

/// Replaces the indent of `line` with `width` spaces.
fn reindent(line: &str, width: usize) -> String {
    format!("{}{}", " ".repeat(width), line.trim_start_matches([' ', '\t']))
}

/// Groups list item lines into blocks. Blank lines and indented continuation
/// lines keep a block open; any other line closes it.
fn list_blocks(doc: &Document<'_>) -> Vec<Vec<usize>> {
    let mut blocks = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    for (i, line) in doc.lines.iter().enumerate() {
        if doc.is_text(i) {
            if text::list_item(line).is_some() {
                current.push(i);
                continue;
            }
            if text::is_blank(line) || (!current.is_empty() && line.starts_with([' ', '\t'])) {
                continue;
            }
        }
        if !current.is_empty() {
            blocks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// MD005: list items at the same level share one indent.
pub struct ListIndent;

impl ListIndent {
    /// Items whose indent differs from the most common one at their level,
    /// paired with that indent.
    fn misaligned(doc: &Document<'_>) -> Vec<(usize, usize)> {
        let mut found = Vec::new();
        for block in list_blocks(doc) {
            // Two columns make one level.
            let mut levels: BTreeMap<usize, Vec<(usize, usize)>> = BTreeMap::new();
            for i in block {
                let width = indent_width(text::leading_whitespace(doc.lines[i]));
                levels.entry(width / 2).or_default().push((i, width));
            }
            for items in levels.values().filter(|items| items.len() > 1) {
                let mut counts: Vec<(usize, usize)> = Vec::new();
                for &(_, width) in items {
                    match counts.iter_mut().find(|(w, _)| *w == width) {
                        Some((_, n)) => *n += 1,
                        None => counts.push((width, 1)),
                    }
                }
                // Ties go to the indent seen first.
                let Some(common) = counts
                    .iter()
                    .fold(None, |best: Option<(usize, usize)>, &(w, n)| match best {
                        Some((_, m)) if m >= n => best,
                        _ => Some((w, n)),
                    })
                    .map(|(w, _)| w)
                else {
                    continue;
                };
                found.extend(
                    items
                        .iter()
                        .filter(|(_, width)| *width != common)
                        .map(|&(i, _)| (i, common)),
                );
            }
        }
        found.sort_unstable();
        found
    }
}

impl Rule for ListIndent {
    fn id(&self) -> &'static str {
        "MD005"
    }
    fn name(&self) -> &'static str {
        "list-indent"
    }
    fn description(&self) -> &'static str {
        "Inconsistent indentation for list items at the same level"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        Self::misaligned(&Document::parse(text))
            .into_iter()
            .map(|(i, expected)| {
                Violation::new(
                    self.id(),
                    i + 1,
                    1,
                    "Inconsistent list indentation at same level",
                )
                .with_suggestion(" ".repeat(expected))
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let doc = Document::parse(text);
        let misaligned: BTreeMap<usize, usize> = Self::misaligned(&doc).into_iter().collect();
        rewrite_text_lines(text, |i, line| {
            misaligned.get(&i).map(|&width| reindent(line, width))
        })
    }
}

/// MD007: nested bullets are indented by a fixed step per level.
pub struct UnorderedListIndent {
    indent: usize,
}

impl UnorderedListIndent {
    pub fn new(settings: &RuleSettings) -> Self {
        Self {
            indent: settings.indent.filter(|n| *n > 0).unwrap_or(2),
        }
    }

    /// Nesting depth of the item on line `i`, or `None` when an ancestor is
    /// an ordered item, whose content column decides the nesting instead.
    fn depth(doc: &Document<'_>, i: usize) -> Option<usize> {
        let mut depth = 0;
        let mut current = indent_width(text::leading_whitespace(doc.lines[i]));
        for j in (0..i).rev() {
            let line = doc.lines[j];
            if !doc.is_text(j) {
                break;
            }
            if text::is_blank(line) {
                continue;
            }
            let Some(item) = text::list_item(line) else {
                if line.starts_with([' ', '\t']) {
                    continue;
                }
                break;
            };
            let width = indent_width(item.indent);
            if width < current {
                if !item.is_bullet() {
                    return None;
                }
                depth += 1;
                current = width;
            }
            if current == 0 {
                break;
            }
        }
        Some(depth)
    }

    /// Bullets whose indent is off, paired with the expected indent.
    fn misindented(&self, doc: &Document<'_>) -> Vec<(usize, usize)> {
        doc.text_lines()
            .filter_map(|(i, line)| {
                let item = text::list_item(line).filter(|item| item.is_bullet())?;
                let expected = Self::depth(doc, i)? * self.indent;
                (indent_width(item.indent) != expected).then_some((i, expected))
            })
            .collect()
    }
}

impl Rule for UnorderedListIndent {
    fn id(&self) -> &'static str {
        "MD007"
    }
    fn name(&self) -> &'static str {
        "ul-indent"
    }
    fn description(&self) -> &'static str {
        "Unordered list indentation should use consistent spacing"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        self.misindented(&Document::parse(text))
            .into_iter()
            .map(|(i, expected)| {
                Violation::new(
                    self.id(),
                    i + 1,
                    1,
                    format!("Unordered list indentation should be {expected}"),
                )
                .with_suggestion(" ".repeat(expected))
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let doc = Document::parse(text);
        let expected: BTreeMap<usize, usize> = self.misindented(&doc).into_iter().collect();
        rewrite_text_lines(text, |i, line| {
            expected.get(&i).map(|&width| reindent(line, width))
        })
    }
}

/// MD030: exactly one space after list markers.
pub struct ListMarkerSpace;

impl ListMarkerSpace {
    /// Byte offset where the marker ends, when the gap after it needs fixing.
    fn bad_gap(line: &str) -> Option<usize> {
        let item = text::list_item(line)?;
        if item.content.is_empty() || item.gap == " " {
            return None;
        }
        Some(item.indent.len() + item.marker.len())
    }
}

impl Rule for ListMarkerSpace {
    fn id(&self) -> &'static str {
        "MD030"
    }
    fn name(&self) -> &'static str {
        "list-marker-space"
    }
    fn description(&self) -> &'static str {
        "Spaces after list markers"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        Document::parse(text)
            .text_lines()
            .filter_map(|(i, line)| {
                let end = Self::bad_gap(line)?;
                Some(Violation::new(
                    self.id(),
                    i + 1,
                    end + 1,
                    "Expected one space after list marker",
                ))
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        rewrite_text_lines(text, |_, line| {
            let end = Self::bad_gap(line)?;
            let content = line[end..].trim_start_matches([' ', '\t']);
            Some(format!("{} {}", &line[..end], content))
        })
    }
}

/// MD032: lists surrounded by blank lines.
pub struct BlanksAroundLists;

impl BlanksAroundLists {
    /// Inclusive line ranges of list blocks. A block runs from a list item
    /// through the following non-blank lines, up to a heading, a thematic
    /// break or a code fence.
    fn lists(doc: &Document<'_>) -> Vec<(usize, usize)> {
        let continues = |i: usize| {
            doc.is_text(i)
                && !text::is_blank(doc.lines[i])
                && text::atx_heading(doc.lines[i]).is_none()
                && !text::is_hr(doc.lines[i])
        };
        let mut ranges = Vec::new();
        let mut i = 0;
        while i < doc.len() {
            if !doc.is_text(i) || text::list_item(doc.lines[i]).is_none() {
                i += 1;
                continue;
            }
            let start = i;
            while i + 1 < doc.len() && continues(i + 1) {
                i += 1;
            }
            ranges.push((start, i));
            i += 1;
        }
        ranges
    }
}

impl Rule for BlanksAroundLists {
    fn id(&self) -> &'static str {
        "MD032"
    }
    fn name(&self) -> &'static str {
        "blanks-around-lists"
    }
    fn description(&self) -> &'static str {
        "Lists should be surrounded by blank lines"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        let ranges = Self::lists(&doc);
        let gaps = blank_gaps(&doc, &ranges);
        let mut violations = Vec::new();
        for (start, end) in ranges {
            if gaps.above.contains(&start) {
                violations.push(Violation::new(
                    self.id(),
                    start + 1,
                    1,
                    "List missing blank line above",
                ));
            }
            if gaps.below.contains(&(end + 1)) {
                violations.push(Violation::new(
                    self.id(),
                    end + 1,
                    1,
                    "List missing blank line below",
                ));
            }
        }
        violations
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let doc = Document::parse(text);
        let ranges = Self::lists(&doc);
        blank_gaps(&doc, &ranges).apply(&doc.lines)
    }
}
