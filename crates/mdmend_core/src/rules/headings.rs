use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::RuleSettings;
use crate::rule::Rule;
use crate::rules::{blank_gaps, offset_in, rewrite_text_lines};
use crate::text::{self, Document, Heading, LineKind};
use crate::violation::{FixOutcome, Violation};

static ENTITY_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)&(#\d+|#x[0-9a-f]+|[a-z][a-z0-9]*);$").expect("entity pattern must compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StyleChoice {
    Consistent,
    Fixed(text::HeadingStyle),
}

/// MD003: heading style.
pub struct HeadingStyle {
    style: StyleChoice,
}

impl HeadingStyle {
    pub fn new(settings: &RuleSettings) -> Self {
        let style = match settings.style.as_deref() {
            Some("atx_closed") => StyleChoice::Fixed(text::HeadingStyle::AtxClosed),
            Some("setext") => StyleChoice::Fixed(text::HeadingStyle::Setext),
            Some("consistent") => StyleChoice::Consistent,
            _ => StyleChoice::Fixed(text::HeadingStyle::Atx),
        };
        Self { style }
    }

    /// Headings that do not match the expected style, with that style.
    fn mismatches<'h>(&self, headings: &'h [Heading]) -> Vec<(&'h Heading, text::HeadingStyle)> {
        let mut candidates = headings.iter().filter(|h| !h.text.is_empty()).peekable();
        let expected = match self.style {
            StyleChoice::Fixed(style) => style,
            StyleChoice::Consistent => match candidates.peek() {
                Some(first) => first.style,
                None => return Vec::new(),
            },
        };
        candidates
            .filter(|h| h.style != expected)
            // Setext cannot express levels past 2, so ATX is fine there.
            .filter(|h| !(expected == text::HeadingStyle::Setext && h.level > 2))
            .map(|h| (h, expected))
            .collect()
    }
}

fn style_name(style: text::HeadingStyle) -> &'static str {
    match style {
        text::HeadingStyle::Atx => "atx",
        text::HeadingStyle::AtxClosed => "atx_closed",
        text::HeadingStyle::Setext => "setext",
    }
}

fn atx_line(indent: &str, level: usize, text: &str, closed: bool) -> String {
    let hashes = "#".repeat(level);
    if closed {
        format!("{indent}{hashes} {text} {hashes}")
    } else {
        format!("{indent}{hashes} {text}")
    }
}

impl Rule for HeadingStyle {
    fn id(&self) -> &'static str {
        "MD003"
    }
    fn name(&self) -> &'static str {
        "heading-style"
    }
    fn description(&self) -> &'static str {
        "Heading style should be consistent"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        let headings = doc.headings();
        self.mismatches(&headings)
            .into_iter()
            .map(|(heading, expected)| {
                Violation::new(
                    self.id(),
                    heading.line + 1,
                    1,
                    format!("Heading style should be {}", style_name(expected)),
                )
                .with_fixable(expected != text::HeadingStyle::Setext)
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let doc = Document::parse(text);
        let headings = doc.headings();
        let mismatches = self.mismatches(&headings);
        if mismatches.iter().all(|(_, s)| *s == text::HeadingStyle::Setext) {
            return FixOutcome::unchanged(text);
        }

        let mut lines: Vec<Option<String>> = doc.lines.iter().map(|l| Some(l.to_string())).collect();
        for (heading, expected) in mismatches {
            let line = heading.line;
            let closed = expected == text::HeadingStyle::AtxClosed;
            match heading.style {
                text::HeadingStyle::Setext => {
                    lines[line] = Some(atx_line("", heading.level, &heading.text, closed));
                    lines[line + 1] = None;
                }
                text::HeadingStyle::Atx | text::HeadingStyle::AtxClosed => {
                    if expected == text::HeadingStyle::Setext {
                        continue;
                    }
                    let indent = text::leading_whitespace(doc.lines[line]);
                    lines[line] = Some(atx_line(indent, heading.level, &heading.text, closed));
                }
            }
        }
        FixOutcome::new(true, lines.into_iter().flatten().collect())
    }
}

/// Splits `#Title` into its hashes and the rest when there is no space
/// between them.
fn missing_space(line: &str) -> Option<(usize, usize)> {
    let indent = text::leading_whitespace(line);
    if indent.len() > 3 {
        return None;
    }
    let rest = &line[indent.len()..];
    let hashes = rest.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let next = rest[hashes..].chars().next()?;
    if next.is_whitespace() || next == '#' || closed_without_space(line).is_some() {
        return None;
    }
    Some((indent.len(), hashes))
}

/// Splits `#Title#` into indent, opening hashes, text and closing hashes
/// when neither side of the text has a space.
fn closed_without_space(line: &str) -> Option<(&str, &str, &str, &str)> {
    let indent = text::leading_whitespace(line);
    if indent.len() > 3 {
        return None;
    }
    let rest = line[indent.len()..].trim_end();
    let open = rest.bytes().take_while(|b| *b == b'#').count();
    if open == 0 || open > 6 {
        return None;
    }
    let body = rest[open..].trim_end_matches('#');
    if body.is_empty()
        || body.len() == rest.len() - open
        || body.starts_with(char::is_whitespace)
        || body.ends_with(char::is_whitespace)
    {
        return None;
    }
    Some((indent, &rest[..open], body, &rest[open + body.len()..]))
}

/// Whether `line` is a level-one heading that only lacks the space after
/// its hash, which the inline phase repairs.
fn pending_title(line: &str) -> bool {
    missing_space(line).is_some_and(|(_, hashes)| hashes == 1)
        || closed_without_space(line).is_some_and(|(_, open, _, _)| open.len() == 1)
}

/// Whether the front matter carries a `title:` key.
pub(crate) fn front_matter_title(doc: &Document<'_>) -> bool {
    doc.lines
        .iter()
        .zip(&doc.kinds)
        .take_while(|(_, kind)| **kind == LineKind::FrontMatter)
        .any(|(line, _)| {
            line.strip_prefix("title:")
                .is_some_and(|value| !value.trim().is_empty())
        })
}

/// MD018: no space after the hashes of an ATX heading.
pub struct NoSpaceAfterHash;

impl Rule for NoSpaceAfterHash {
    fn id(&self) -> &'static str {
        "MD018"
    }
    fn name(&self) -> &'static str {
        "no-missing-space-atx"
    }
    fn description(&self) -> &'static str {
        "No space after hash in ATX heading"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        Document::parse(text)
            .text_lines()
            .filter(|(_, line)| missing_space(line).is_some())
            .map(|(i, _)| Violation::new(self.id(), i + 1, 1, "No space after hash in ATX heading"))
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        rewrite_text_lines(text, |_, line| {
            let (indent, hashes) = missing_space(line)?;
            let split = indent + hashes;
            Some(format!("{} {}", &line[..split], &line[split..]))
        })
    }
}

/// MD019: more than one space after the hashes of an open ATX heading.
pub struct MultipleSpacesAfterHash;

impl MultipleSpacesAfterHash {
    /// Byte range of the oversized gap.
    fn wide_gap(line: &str) -> Option<(usize, usize)> {
        let heading = text::atx_heading(line)?;
        if heading.closed || heading.gap.len() < 2 || heading.text.is_empty() {
            return None;
        }
        let start = offset_in(line, heading.gap);
        Some((start, start + heading.gap.len()))
    }
}

impl Rule for MultipleSpacesAfterHash {
    fn id(&self) -> &'static str {
        "MD019"
    }
    fn name(&self) -> &'static str {
        "no-multiple-space-atx"
    }
    fn description(&self) -> &'static str {
        "Multiple spaces after hash in ATX heading"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        Document::parse(text)
            .text_lines()
            .filter_map(|(i, line)| {
                let (start, _) = Self::wide_gap(line)?;
                Some(Violation::new(
                    self.id(),
                    i + 1,
                    start + 1,
                    "Multiple spaces after hash in ATX heading",
                ))
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        rewrite_text_lines(text, |_, line| {
            let (start, end) = Self::wide_gap(line)?;
            Some(format!("{} {}", &line[..start], &line[end..]))
        })
    }
}

/// MD020: no space inside the hashes of a closed ATX heading.
pub struct NoSpaceInClosedHeading;

impl Rule for NoSpaceInClosedHeading {
    fn id(&self) -> &'static str {
        "MD020"
    }
    fn name(&self) -> &'static str {
        "no-missing-space-closed-atx"
    }
    fn description(&self) -> &'static str {
        "No space inside hashes on closed ATX heading"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        Document::parse(text)
            .text_lines()
            .filter(|(_, line)| closed_without_space(line).is_some())
            .map(|(i, _)| {
                Violation::new(self.id(), i + 1, 1, "No space inside hashes on closed ATX heading")
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        rewrite_text_lines(text, |_, line| {
            let (indent, open, body, close) = closed_without_space(line)?;
            Some(format!("{indent}{open} {body} {close}"))
        })
    }
}

/// MD021: more than one space inside the hashes of a closed ATX heading.
pub struct MultipleSpacesInClosedHeading;

impl MultipleSpacesInClosedHeading {
    /// The heading with single spaces inside its hashes, when it needs it.
    fn tightened(line: &str) -> Option<String> {
        let heading = text::atx_heading(line)?;
        if !heading.closed || heading.text.is_empty() {
            return None;
        }
        let rest = line.trim_end();
        let close_len = rest.len() - rest.trim_end_matches('#').len();
        let (before_close, close) = rest.split_at(rest.len() - close_len);
        let inner_gap = before_close.len() - before_close.trim_end().len();
        if heading.gap.len() < 2 && inner_gap < 2 {
            return None;
        }
        Some(format!(
            "{}{} {} {close}",
            heading.indent,
            "#".repeat(heading.level),
            heading.text,
        ))
    }
}

impl Rule for MultipleSpacesInClosedHeading {
    fn id(&self) -> &'static str {
        "MD021"
    }
    fn name(&self) -> &'static str {
        "no-multiple-space-closed-atx"
    }
    fn description(&self) -> &'static str {
        "Multiple spaces inside hashes on closed ATX heading"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        Document::parse(text)
            .text_lines()
            .filter_map(|(i, line)| {
                let fixed = Self::tightened(line)?;
                Some(
                    Violation::new(
                        self.id(),
                        i + 1,
                        1,
                        "Multiple spaces inside hashes on closed ATX heading",
                    )
                    .with_suggestion(fixed),
                )
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        rewrite_text_lines(text, |_, line| Self::tightened(line))
    }
}

/// MD022: headings surrounded by blank lines.
pub struct BlanksAroundHeadings;

impl BlanksAroundHeadings {
    fn ranges(headings: &[Heading]) -> Vec<(usize, usize)> {
        headings
            .iter()
            .map(|h| match h.style {
                text::HeadingStyle::Setext => (h.line, h.line + 1),
                _ => (h.line, h.line),
            })
            .collect()
    }
}

impl Rule for BlanksAroundHeadings {
    fn id(&self) -> &'static str {
        "MD022"
    }
    fn name(&self) -> &'static str {
        "blanks-around-headings"
    }
    fn description(&self) -> &'static str {
        "Headings should be surrounded by blank lines"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        let ranges = Self::ranges(&doc.headings());
        let gaps = blank_gaps(&doc, &ranges);
        let mut violations = Vec::new();
        for (start, end) in ranges {
            if gaps.above.contains(&start) {
                violations.push(Violation::new(
                    self.id(),
                    start + 1,
                    1,
                    "Heading missing blank line above",
                ));
            }
            if gaps.below.contains(&(end + 1)) {
                violations.push(Violation::new(
                    self.id(),
                    start + 1,
                    1,
                    "Heading missing blank line below",
                ));
            }
        }
        violations
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let doc = Document::parse(text);
        let ranges = Self::ranges(&doc.headings());
        blank_gaps(&doc, &ranges).apply(&doc.lines)
    }
}

/// MD023: headings start at the beginning of the line.
pub struct HeadingStartLeft;

impl Rule for HeadingStartLeft {
    fn id(&self) -> &'static str {
        "MD023"
    }
    fn name(&self) -> &'static str {
        "heading-start-left"
    }
    fn description(&self) -> &'static str {
        "Headings must start at the beginning of the line"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        Document::parse(text)
            .text_lines()
            .filter(|(_, line)| text::atx_heading(line).is_some_and(|h| !h.indent.is_empty()))
            .map(|(i, _)| {
                Violation::new(
                    self.id(),
                    i + 1,
                    1,
                    "Heading does not start at the beginning of the line",
                )
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        rewrite_text_lines(text, |_, line| {
            let heading = text::atx_heading(line)?;
            (!heading.indent.is_empty()).then(|| line.trim_start().to_string())
        })
    }
}

/// MD024: headings with the same content. Report only.
pub struct DuplicateHeadings {
    siblings_only: bool,
}

impl DuplicateHeadings {
    pub fn new(settings: &RuleSettings) -> Self {
        Self {
            siblings_only: settings.allow_different_nesting.unwrap_or(true),
        }
    }
}

impl Rule for DuplicateHeadings {
    fn id(&self) -> &'static str {
        "MD024"
    }
    fn name(&self) -> &'static str {
        "no-duplicate-heading"
    }
    fn description(&self) -> &'static str {
        "Multiple headings with the same content"
    }
    fn fixable(&self) -> bool {
        false
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let mut seen = HashSet::new();
        let mut parents: Vec<(usize, String)> = Vec::new();
        let mut violations = Vec::new();

        for heading in Document::parse(text).headings() {
            if heading.text.is_empty() {
                continue;
            }
            while parents.last().is_some_and(|(level, _)| *level >= heading.level) {
                parents.pop();
            }
            let key = if self.siblings_only {
                let mut key: Vec<&str> = parents.iter().map(|(_, t)| t.as_str()).collect();
                key.push(&heading.text);
                key.join("\u{1f}")
            } else {
                heading.text.clone()
            };
            if !seen.insert(key) {
                violations.push(
                    Violation::new(
                        self.id(),
                        heading.line + 1,
                        1,
                        format!("Duplicate heading: {}", heading.text),
                    )
                    .with_fixable(false),
                );
            }
            parents.push((heading.level, heading.text));
        }
        violations
    }
}

/// MD025: one top-level heading per document. Report only.
pub struct SingleTitle {
    level: usize,
    front_matter: bool,
}

impl SingleTitle {
    pub fn new(settings: &RuleSettings) -> Self {
        Self {
            level: settings.level.filter(|l| (1..=6).contains(l)).unwrap_or(1),
            front_matter: settings.front_matter.unwrap_or(true),
        }
    }
}

impl Rule for SingleTitle {
    fn id(&self) -> &'static str {
        "MD025"
    }
    fn name(&self) -> &'static str {
        "single-title"
    }
    fn description(&self) -> &'static str {
        "Multiple top-level headings in the same document"
    }
    fn fixable(&self) -> bool {
        false
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        // A front matter title takes the place of the first heading.
        let skip = if self.front_matter && front_matter_title(&doc) { 0 } else { 1 };
        doc.headings()
            .into_iter()
            .filter(|h| h.level == self.level && !h.text.is_empty())
            .skip(skip)
            .map(|h| {
                Violation::new(
                    self.id(),
                    h.line + 1,
                    1,
                    format!("Multiple top-level headings in the same document: {}", h.text),
                )
                .with_fixable(false)
            })
            .collect()
    }
}

/// File names that are exempt from needing a title.
const UNTITLED_FILES: [&str; 4] = ["_sidebar.md", "sidebar.md", "nav.md", "index.md"];

/// Title derived from a file name: `getting-started.md` gives
/// `Getting Started`.
fn filename_title(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// MD041: documents have a top-level heading.
///
/// The fix promotes the first level-two heading, or failing that inserts a
/// title derived from the file name.
pub struct FirstHeading {
    derive_from_filename: bool,
    promote_first: bool,
    front_matter: bool,
}

impl FirstHeading {
    pub fn new(settings: &RuleSettings) -> Self {
        Self {
            derive_from_filename: settings.derive_from_filename.unwrap_or(true),
            promote_first: settings.promote_first.unwrap_or(true),
            front_matter: settings.front_matter.unwrap_or(true),
        }
    }

    /// First line after the front matter.
    fn body_start(doc: &Document<'_>) -> usize {
        doc.kinds
            .iter()
            .position(|kind| *kind != LineKind::FrontMatter)
            .unwrap_or(doc.len())
    }

    fn needs_title(&self, doc: &Document<'_>, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if UNTITLED_FILES.contains(&name.as_str()) || name.starts_with("changelog") {
            return false;
        }
        if self.front_matter && front_matter_title(doc) {
            return false;
        }
        let start = Self::body_start(doc);
        let Some(first) = doc.lines[start..].iter().find(|l| !text::is_blank(l)) else {
            return false;
        };
        if first.trim_start().starts_with("<!--") {
            return false;
        }
        !doc.headings().iter().any(|h| h.level == 1)
            && !doc.text_lines().any(|(_, line)| pending_title(line))
    }

    /// Line of the heading to promote to level one.
    fn promotable(&self, doc: &Document<'_>) -> Option<Heading> {
        if !self.promote_first {
            return None;
        }
        doc.headings()
            .into_iter()
            .find(|h| h.level == 2 && !h.text.is_empty())
    }
}

impl Rule for FirstHeading {
    fn id(&self) -> &'static str {
        "MD041"
    }
    fn name(&self) -> &'static str {
        "first-line-heading"
    }
    fn description(&self) -> &'static str {
        "First line in a file should be a top-level heading"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        if !self.needs_title(&doc, path) {
            return Vec::new();
        }
        let violation = Violation::new(
            self.id(),
            Self::body_start(&doc) + 1,
            1,
            "First line should be a top-level heading",
        );
        if let Some(heading) = self.promotable(&doc) {
            return vec![violation.with_suggestion(format!("# {}", heading.text))];
        }
        let title = filename_title(path);
        if self.derive_from_filename && !title.is_empty() {
            vec![violation.with_suggestion(format!("# {title}"))]
        } else {
            vec![violation.with_fixable(false)]
        }
    }

    fn rewrite(&self, text: &str, path: &Path) -> FixOutcome {
        let doc = Document::parse(text);
        if !self.needs_title(&doc, path) {
            return FixOutcome::unchanged(text);
        }
        let mut lines: Vec<String> = doc.lines.iter().map(|l| l.to_string()).collect();
        if let Some(heading) = self.promotable(&doc) {
            match heading.style {
                text::HeadingStyle::Setext => {
                    let width = doc.lines[heading.line + 1].trim().len();
                    lines[heading.line + 1] = "=".repeat(width);
                }
                _ => {
                    let closed = heading.style == text::HeadingStyle::AtxClosed;
                    let indent = text::leading_whitespace(doc.lines[heading.line]);
                    lines[heading.line] = atx_line(indent, 1, &heading.text, closed);
                }
            }
            return FixOutcome::new(true, lines);
        }
        let title = filename_title(path);
        if !self.derive_from_filename || title.is_empty() {
            return FixOutcome::unchanged(text);
        }
        let start = Self::body_start(&doc);
        let mut inserted = vec![format!("# {title}")];
        if !text::is_blank(doc.lines.get(start).copied().unwrap_or("")) {
            inserted.push(String::new());
        }
        lines.splice(start..start, inserted);
        FixOutcome::new(true, lines)
    }
}

/// MD043: required heading structure. Report only; off when no headings are
/// configured.
pub struct RequiredHeadings {
    headings: Vec<String>,
}

impl RequiredHeadings {
    pub fn new(settings: &RuleSettings) -> Self {
        Self {
            headings: settings.headings.clone().unwrap_or_default(),
        }
    }
}

impl Rule for RequiredHeadings {
    fn id(&self) -> &'static str {
        "MD043"
    }
    fn name(&self) -> &'static str {
        "required-headings"
    }
    fn description(&self) -> &'static str {
        "Required heading structure"
    }
    fn fixable(&self) -> bool {
        false
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        if self.headings.is_empty() {
            return Vec::new();
        }
        let found: HashSet<String> = Document::parse(text)
            .headings()
            .iter()
            .map(|h| format!("{} {}", "#".repeat(h.level), h.text))
            .collect();
        self.headings
            .iter()
            .filter(|required| !found.contains(required.trim()))
            .map(|required| {
                Violation::new(
                    self.id(),
                    1,
                    1,
                    format!("Missing required heading: {required}"),
                )
                .with_fixable(false)
            })
            .collect()
    }
}

/// MD026: trailing punctuation in headings.
pub struct TrailingPunctuation {
    punctuation: String,
}

impl TrailingPunctuation {
    pub fn new(settings: &RuleSettings) -> Self {
        Self {
            punctuation: settings
                .punctuation
                .clone()
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| ".,;:!".to_string()),
        }
    }

    /// The heading text with trailing punctuation removed, when it has any.
    /// `Some("")` means stripping would leave nothing.
    fn stripped<'a>(&self, text: &'a str) -> Option<&'a str> {
        let last = text.chars().last()?;
        if !self.punctuation.contains(last) || ENTITY_END.is_match(text) {
            return None;
        }
        Some(text.trim_end_matches(|c: char| self.punctuation.contains(c) || c.is_whitespace()))
    }

    /// Byte range of the heading text on `line`, if the line is a heading.
    fn text_range(doc: &Document<'_>, heading: &Heading) -> Option<(usize, usize)> {
        let line = doc.lines[heading.line];
        let text = match heading.style {
            text::HeadingStyle::Setext => line.trim(),
            _ => text::atx_heading(line)?.text,
        };
        let start = offset_in(line, text);
        Some((start, start + text.len()))
    }
}

impl Rule for TrailingPunctuation {
    fn id(&self) -> &'static str {
        "MD026"
    }
    fn name(&self) -> &'static str {
        "no-trailing-punctuation"
    }
    fn description(&self) -> &'static str {
        "Trailing punctuation in heading"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        doc.headings()
            .iter()
            .filter_map(|h| {
                let stripped = self.stripped(&h.text)?;
                Some(
                    Violation::new(
                        self.id(),
                        h.line + 1,
                        doc.lines[h.line].len(),
                        "Trailing punctuation in heading",
                    )
                    .with_fixable(!stripped.is_empty()),
                )
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let doc = Document::parse(text);
        let mut lines: Vec<String> = doc.lines.iter().map(|l| l.to_string()).collect();
        let mut changed = false;
        for heading in doc.headings() {
            let Some(stripped) = self.stripped(&heading.text).filter(|s| !s.is_empty()) else {
                continue;
            };
            let Some((start, end)) = Self::text_range(&doc, &heading) else {
                continue;
            };
            let line = doc.lines[heading.line];
            lines[heading.line] = format!("{}{}{}", &line[..start], stripped, &line[end..]);
            changed = true;
        }
        FixOutcome::new(changed, lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_fixed_point, check, fix};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn style(name: &str) -> HeadingStyle {
        HeadingStyle::new(&RuleSettings {
            style: Some(name.to_string()),
            ..RuleSettings::default()
        })
    }

    #[test]
    fn test_heading_style_converts_setext_to_atx() {
        let rule = style("atx");
        let text = "Title\n=====\n\nPart\n----\n\n### Deep ###\n";
        assert_eq!(check(&rule, text).len(), 3);
        assert_eq!(fix(&rule, text), "# Title\n\n## Part\n\n### Deep\n");
        assert_fixed_point(&rule, text);
    }

    #[test]
    fn test_heading_style_atx_closed() {
        let rule = style("atx_closed");
        assert_eq!(fix(&rule, "# Title\n"), "# Title #\n");
        assert_fixed_point(&rule, "# Title\n\nSub\n---\n");
    }

    #[test]
    fn test_heading_style_consistent_follows_first() {
        let rule = style("consistent");
        let text = "# One #\n\n## Two\n";
        let violations = check(&rule, text);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 3);
    }

    #[test]
    fn test_heading_style_setext_only_reports() {
        let rule = style("setext");
        let text = "# One\n\n### Three\n";
        let violations = check(&rule, text);
        assert_eq!(violations.len(), 1);
        assert!(!violations[0].fixable);
        assert!(!rule.rewrite(text, Path::new("a.md")).changed);
    }

    #[rstest]
    #[case::h1("#Heading", "# Heading")]
    #[case::h3("###Deep", "### Deep")]
    #[case::indented("  ##Indented", "  ## Indented")]
    fn test_no_space_after_hash(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(check(&NoSpaceAfterHash, line).len(), 1);
        assert_eq!(fix(&NoSpaceAfterHash, line), expected);
    }

    #[rstest]
    #[case::proper("# Heading")]
    #[case::seven("#######Nope")]
    #[case::in_code("```\n#include <stdio.h>\n```")]
    fn test_no_space_after_hash_ignores(#[case] text: &str) {
        assert!(check(&NoSpaceAfterHash, text).is_empty());
    }

    #[test]
    fn test_multiple_spaces_after_hash() {
        let text = "##   Title\n";
        assert_eq!(check(&MultipleSpacesAfterHash, text)[0].column, 3);
        assert_eq!(fix(&MultipleSpacesAfterHash, text), "## Title\n");
        assert!(check(&MultipleSpacesAfterHash, "##   Title ##\n").is_empty());
    }

    #[rstest]
    #[case::h1("#Title#", "# Title #")]
    #[case::h2_uneven("##Title###", "## Title ###")]
    #[case::indented(" #Title#", " # Title #")]
    fn test_no_space_in_closed_heading(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(check(&NoSpaceInClosedHeading, line).len(), 1);
        assert!(check(&NoSpaceAfterHash, line).is_empty());
        assert_eq!(fix(&NoSpaceInClosedHeading, line), expected);
        assert_fixed_point(&NoSpaceInClosedHeading, line);
    }

    #[rstest]
    #[case::open("#Title")]
    #[case::spaced("# Title #")]
    #[case::only_hashes("###")]
    fn test_no_space_in_closed_heading_ignores(#[case] line: &str) {
        assert!(check(&NoSpaceInClosedHeading, line).is_empty());
    }

    #[rstest]
    #[case::both("##   Title   ##", "## Title ##")]
    #[case::opening("#  Title #", "# Title #")]
    #[case::closing("### Title    ###", "### Title ###")]
    fn test_multiple_spaces_in_closed_heading(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(check(&MultipleSpacesInClosedHeading, line).len(), 1);
        assert_eq!(fix(&MultipleSpacesInClosedHeading, line), expected);
        assert_fixed_point(&MultipleSpacesInClosedHeading, line);
    }

    #[test]
    fn test_single_title() {
        let rule = SingleTitle::new(&RuleSettings::default());
        let text = "# One\n\n## Sub\n\n# Two\n\nThree\n=====\n";
        let violations = check(&rule, text);
        let lines: Vec<_> = violations.iter().map(|v| v.line).collect();
        assert_eq!(lines, vec![5, 7]);
        assert!(violations.iter().all(|v| !v.fixable));
    }

    #[test]
    fn test_single_title_counts_front_matter_title() {
        let rule = SingleTitle::new(&RuleSettings::default());
        let text = "---\ntitle: Guide\n---\n# Guide\n";
        assert_eq!(check(&rule, text).len(), 1);
        let rule = SingleTitle::new(&RuleSettings {
            front_matter: Some(false),
            ..RuleSettings::default()
        });
        assert!(check(&rule, text).is_empty());
    }

    fn first_heading() -> FirstHeading {
        FirstHeading::new(&RuleSettings::default())
    }

    fn fix_at(rule: &dyn Rule, text: &str, path: &str) -> String {
        rule.rewrite(text, Path::new(path)).content()
    }

    #[test]
    fn test_first_heading_promotes_level_two() {
        let rule = first_heading();
        let text = "Intro\n\n## Usage\n\n## More\n";
        let violations = check(&rule, text);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].suggested.as_deref(), Some("# Usage"));
        assert_eq!(fix(&rule, text), "Intro\n\n# Usage\n\n## More\n");
        assert_fixed_point(&rule, text);
        assert_eq!(fix(&rule, "Usage\n-----\n"), "Usage\n=====\n");
    }

    #[test]
    fn test_first_heading_from_file_name() {
        let rule = FirstHeading::new(&RuleSettings {
            promote_first: Some(false),
            ..RuleSettings::default()
        });
        let text = "Some text.\n\n## Usage\n";
        assert_eq!(
            fix_at(&rule, text, "docs/getting-started.md"),
            "# Getting Started\n\nSome text.\n\n## Usage\n"
        );
        assert_eq!(
            fix_at(&rule, "---\nauthor: me\n---\ntext\n", "docs/api_notes.md"),
            "---\nauthor: me\n---\n# Api Notes\n\ntext\n"
        );
        let fixed = fix_at(&rule, text, "docs/getting-started.md");
        assert!(rule.check(&fixed, Path::new("docs/getting-started.md")).is_empty());
    }

    #[rstest]
    #[case::has_title("# Title\n\ntext\n", "docs/guide.md")]
    #[case::pending_title("#Title\n\ntext\n", "docs/guide.md")]
    #[case::front_matter_title("---\ntitle: Guide\n---\ntext\n", "docs/guide.md")]
    #[case::comment("<!-- generated -->\ntext\n", "docs/guide.md")]
    #[case::index("text\n", "docs/index.md")]
    #[case::changelog("text\n", "CHANGELOG-2024.md")]
    #[case::empty("\n", "docs/guide.md")]
    fn test_first_heading_not_needed(#[case] text: &str, #[case] path: &str) {
        assert!(first_heading().check(text, Path::new(path)).is_empty());
    }

    #[test]
    fn test_first_heading_without_fix() {
        let rule = FirstHeading::new(&RuleSettings {
            promote_first: Some(false),
            derive_from_filename: Some(false),
            ..RuleSettings::default()
        });
        let violations = check(&rule, "text\n");
        assert!(!violations[0].fixable);
        assert_eq!(fix(&rule, "text\n"), "text\n");
    }

    #[test]
    fn test_required_headings() {
        let rule = RequiredHeadings::new(&RuleSettings {
            headings: Some(vec!["# Guide".to_string(), "## Install".to_string()]),
            ..RuleSettings::default()
        });
        let violations = check(&rule, "# Guide\n\n## Usage\n");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "Missing required heading: ## Install");
        assert!(check(&RequiredHeadings::new(&RuleSettings::default()), "text\n").is_empty());
    }

    #[test]
    fn test_blanks_around_headings() {
        let text = "intro\n# Title\nbody\n\nSub\n---\nmore\n";
        assert_eq!(check(&BlanksAroundHeadings, text).len(), 3);
        assert_eq!(
            fix(&BlanksAroundHeadings, text),
            "intro\n\n# Title\n\nbody\n\nSub\n---\n\nmore\n"
        );
        assert_fixed_point(&BlanksAroundHeadings, text);
    }

    #[test]
    fn test_blanks_around_headings_shared_gap() {
        let text = "# One\n## Two\n";
        assert_eq!(fix(&BlanksAroundHeadings, text), "# One\n\n## Two\n");
    }

    #[test]
    fn test_blanks_around_headings_after_front_matter() {
        let text = "---\ntitle: x\n---\n# Title\n";
        assert!(check(&BlanksAroundHeadings, text).is_empty());
    }

    #[test]
    fn test_heading_start_left() {
        let text = "  # Title\n";
        assert_eq!(check(&HeadingStartLeft, text).len(), 1);
        assert_eq!(fix(&HeadingStartLeft, text), "# Title\n");
    }

    #[test]
    fn test_duplicate_headings_siblings_only() {
        let rule = DuplicateHeadings::new(&RuleSettings::default());
        let text = "# A\n\n## Usage\n\n# B\n\n## Usage\n\n## Usage\n";
        let violations = check(&rule, text);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 9);
    }

    #[test]
    fn test_duplicate_headings_anywhere() {
        let rule = DuplicateHeadings::new(&RuleSettings {
            allow_different_nesting: Some(false),
            ..RuleSettings::default()
        });
        let text = "# A\n\n## Usage\n\n# B\n\n## Usage\n";
        assert_eq!(check(&rule, text).len(), 1);
    }

    #[rstest]
    #[case::period("# Title.\n", "# Title\n")]
    #[case::several("## Title!!\n", "## Title\n")]
    #[case::closed("# Title: #\n", "# Title #\n")]
    #[case::setext("Title;\n====\n", "Title\n====\n")]
    #[case::question_kept("# Why?\n", "# Why?\n")]
    #[case::entity_kept("# Fish &amp;\n", "# Fish &amp;\n")]
    fn test_trailing_punctuation(#[case] text: &str, #[case] expected: &str) {
        let rule = TrailingPunctuation::new(&RuleSettings::default());
        assert_eq!(fix(&rule, text), expected);
        assert_fixed_point(&rule, text);
    }

    #[test]
    fn test_trailing_punctuation_only_heading_is_unfixable() {
        let rule = TrailingPunctuation::new(&RuleSettings::default());
        let violations = check(&rule, "# ...\n");
        assert_eq!(violations.len(), 1);
        assert!(!violations[0].fixable);
        assert_eq!(fix(&rule, "# ...\n"), "# ...\n");
    }
}
