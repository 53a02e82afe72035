//! Line-oriented view of a Markdown document.
//!
//! Rules do not parse Markdown into a tree. They work on lines, with a small
//! amount of pre-computed structure: which lines are front matter or fenced
//! code, where headings and list items are, and where inline code spans sit.

use std::ops::Range;

/// Splits text on `\n`. A trailing newline yields a final empty line, so
/// `split_lines(t).join("\n") == t` for every `t`.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

/// Whether a line contains only whitespace.
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Leading spaces and tabs of a line.
pub fn leading_whitespace(line: &str) -> &str {
    let content = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - content.len()]
}

/// Classification of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Ordinary Markdown content.
    Text,
    /// Part of a YAML front matter block, delimiters included.
    FrontMatter,
    /// Opening or closing fence of a code block.
    Fence,
    /// Content inside a fenced code block.
    Code,
}

/// An opening code fence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fence<'a> {
    pub indent: &'a str,
    pub marker: char,
    pub len: usize,
    pub info: &'a str,
}

/// Parses an opening fence: three or more backticks or tildes, optionally
/// followed by an info string. Backtick fences may not carry backticks in
/// their info string.
pub fn parse_fence(line: &str) -> Option<Fence<'_>> {
    let indent = leading_whitespace(line);
    let rest = &line[indent.len()..];
    let marker = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = rest.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    let info = rest[len..].trim();
    if marker == '`' && info.contains('`') {
        return None;
    }
    Some(Fence {
        indent,
        marker,
        len,
        info,
    })
}

/// Whether `line` closes a block opened by `open`.
pub fn closes_fence(open: &Fence<'_>, line: &str) -> bool {
    let rest = line.trim_start_matches([' ', '\t']);
    let len = rest.chars().take_while(|c| *c == open.marker).count();
    len >= open.len && rest[len..].trim().is_empty()
}

/// A fenced code block, by 0-based line index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Line of the opening fence.
    pub open: usize,
    /// Line of the closing fence; `None` when the block runs to the end.
    pub close: Option<usize>,
    pub indent: String,
    pub marker: char,
    pub fence_len: usize,
    pub info: String,
}

impl CodeBlock {
    /// Line range of the block's content.
    pub fn content(&self, line_count: usize) -> Range<usize> {
        self.open + 1..self.close.unwrap_or(line_count)
    }

    /// Last line belonging to the block.
    pub fn last_line(&self, line_count: usize) -> usize {
        self.close.unwrap_or(line_count.saturating_sub(1))
    }
}

/// Returns the index of the closing front matter delimiter, if the document
/// opens with a `---` block that is closed by `---` or `...`.
pub fn front_matter_end(lines: &[&str]) -> Option<usize> {
    if lines.first().map(|l| l.trim_end()) != Some("---") {
        return None;
    }
    lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, l)| matches!(l.trim_end(), "---" | "..."))
        .map(|(i, _)| i)
}

/// Heading syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingStyle {
    /// `# Title`
    Atx,
    /// `# Title #`
    AtxClosed,
    /// `Title` underlined with `=` or `-`.
    Setext,
}

/// An ATX heading line split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtxHeading<'a> {
    pub indent: &'a str,
    pub level: usize,
    /// Whitespace between the opening hashes and the text.
    pub gap: &'a str,
    pub text: &'a str,
    pub closed: bool,
}

/// Parses an ATX heading (`#` to `######` followed by whitespace or end of
/// line), indented by at most three spaces.
pub fn atx_heading(line: &str) -> Option<AtxHeading<'_>> {
    let indent = leading_whitespace(line);
    if indent.len() > 3 || indent.contains('\t') {
        return None;
    }
    let rest = &line[indent.len()..];
    let level = rest.bytes().take_while(|b| *b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let after = &rest[level..];
    if !(after.is_empty() || after.starts_with([' ', '\t'])) {
        return None;
    }
    let body = after.trim_start_matches([' ', '\t']);
    let gap = &after[..after.len() - body.len()];
    let body = body.trim_end();

    let without_hashes = body.trim_end_matches('#');
    let (text, closed) = if without_hashes.len() < body.len()
        && (without_hashes.is_empty() || without_hashes.ends_with([' ', '\t']))
    {
        (without_hashes.trim_end(), !without_hashes.is_empty())
    } else {
        (body, false)
    };

    Some(AtxHeading {
        indent,
        level,
        gap,
        text,
        closed,
    })
}

/// Level of a setext underline (`=` is 1, `-` is 2). Needs at least two
/// marker characters.
pub fn setext_underline(line: &str) -> Option<usize> {
    let indent = leading_whitespace(line);
    if indent.len() > 3 {
        return None;
    }
    let run = line.trim();
    let marker = run.chars().next()?;
    if run.len() < 2 || !run.chars().all(|c| c == marker) {
        return None;
    }
    match marker {
        '=' => Some(1),
        '-' => Some(2),
        _ => None,
    }
}

/// A heading in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// 0-based line of the heading text.
    pub line: usize,
    pub level: usize,
    pub text: String,
    pub style: HeadingStyle,
}

/// A list item marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem<'a> {
    pub indent: &'a str,
    /// `-`, `*`, `+`, or an ordinal such as `1.` / `2)`.
    pub marker: &'a str,
    /// Whitespace between the marker and the content.
    pub gap: &'a str,
    pub content: &'a str,
}

impl ListItem<'_> {
    /// Whether the marker is a bullet rather than an ordinal.
    pub fn is_bullet(&self) -> bool {
        matches!(self.marker, "-" | "*" | "+")
    }
}

/// Parses a list item. Thematic breaks are not list items.
pub fn list_item(line: &str) -> Option<ListItem<'_>> {
    if is_hr(line) {
        return None;
    }
    let indent = leading_whitespace(line);
    let rest = &line[indent.len()..];
    let marker_len = match rest.as_bytes().first()? {
        b'-' | b'*' | b'+' => 1,
        b'0'..=b'9' => {
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits > 9 || !matches!(rest.as_bytes().get(digits), Some(b'.' | b')')) {
                return None;
            }
            digits + 1
        }
        _ => return None,
    };
    let after = &rest[marker_len..];
    if !(after.is_empty() || after.starts_with([' ', '\t'])) {
        return None;
    }
    let content = after.trim_start_matches([' ', '\t']);
    Some(ListItem {
        indent,
        marker: &rest[..marker_len],
        gap: &after[..after.len() - content.len()],
        content,
    })
}

/// Whether the line is a thematic break (`---`, `* * *`, `___`).
pub fn is_hr(line: &str) -> bool {
    if leading_whitespace(line).len() > 3 {
        return false;
    }
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    let Some(marker) = compact.chars().next() else {
        return false;
    };
    matches!(marker, '-' | '*' | '_') && compact.len() >= 3 && compact.chars().all(|c| c == marker)
}

/// Whether the line starts a blockquote.
pub fn is_blockquote(line: &str) -> bool {
    line.trim_start().starts_with('>')
}

/// Byte ranges of inline code spans, backticks included. Unmatched backtick
/// runs are literal text.
pub fn code_spans(line: &str) -> Vec<Range<usize>> {
    let bytes = line.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let open_len = bytes[i..].iter().take_while(|b| **b == b'`').count();
        let mut j = i + open_len;
        let mut closed = None;
        while j < bytes.len() {
            if bytes[j] == b'`' {
                let run = bytes[j..].iter().take_while(|b| **b == b'`').count();
                if run == open_len {
                    closed = Some(j + run);
                    break;
                }
                j += run;
            } else {
                j += 1;
            }
        }
        match closed {
            Some(end) => {
                spans.push(i..end);
                i = end;
            }
            None => i += open_len,
        }
    }
    spans
}

/// Stretches of the line outside code spans, with their byte offsets.
pub fn outside_code(line: &str) -> Vec<(usize, &str)> {
    let mut parts = Vec::new();
    let mut last = 0;
    for span in code_spans(line) {
        parts.push((last, &line[last..span.start]));
        last = span.end;
    }
    parts.push((last, &line[last..]));
    parts
}

/// A document split into lines with its block structure resolved.
#[derive(Debug, Clone)]
pub struct Document<'a> {
    pub lines: Vec<&'a str>,
    pub kinds: Vec<LineKind>,
    pub blocks: Vec<CodeBlock>,
}

impl<'a> Document<'a> {
    /// Splits and classifies `text`.
    pub fn parse(text: &'a str) -> Self {
        let lines = split_lines(text);
        let mut kinds = vec![LineKind::Text; lines.len()];
        let mut blocks = Vec::new();

        let start = match front_matter_end(&lines) {
            Some(end) => {
                kinds[..=end].fill(LineKind::FrontMatter);
                end + 1
            }
            None => 0,
        };

        let mut i = start;
        while i < lines.len() {
            let Some(fence) = parse_fence(lines[i]) else {
                i += 1;
                continue;
            };
            kinds[i] = LineKind::Fence;
            let close = (i + 1..lines.len()).find(|&j| closes_fence(&fence, lines[j]));
            let end = close.unwrap_or(lines.len());
            kinds[i + 1..end].fill(LineKind::Code);
            if let Some(c) = close {
                kinds[c] = LineKind::Fence;
            }
            blocks.push(CodeBlock {
                open: i,
                close,
                indent: fence.indent.to_string(),
                marker: fence.marker,
                fence_len: fence.len,
                info: fence.info.to_string(),
            });
            i = end + 1;
        }

        Self {
            lines,
            kinds,
            blocks,
        }
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the document has no lines. Never true for parsed text.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether line `i` is ordinary Markdown content.
    pub fn is_text(&self, i: usize) -> bool {
        self.kinds.get(i) == Some(&LineKind::Text)
    }

    /// Indices of ordinary content lines paired with the line.
    pub fn text_lines(&self) -> impl Iterator<Item = (usize, &'a str)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .filter(|(i, _)| self.is_text(*i))
            .map(|(i, l)| (i, *l))
    }

    /// Level of the setext heading whose text is line `i`.
    pub fn setext_text(&self, i: usize) -> Option<usize> {
        let line = *self.lines.get(i)?;
        let next = *self.lines.get(i + 1)?;
        if !self.is_text(i) || !self.is_text(i + 1) || is_blank(line) {
            return None;
        }
        if leading_whitespace(line).len() > 3
            || atx_heading(line).is_some()
            || list_item(line).is_some()
            || is_blockquote(line)
            || is_hr(line)
            || setext_underline(line).is_some()
        {
            return None;
        }
        if i > 0 && self.is_text(i - 1) && !is_blank(self.lines[i - 1]) {
            // Multi-line setext headings are treated as paragraphs.
            let prev = self.lines[i - 1];
            if atx_heading(prev).is_none() && setext_underline(prev).is_none() {
                return None;
            }
        }
        setext_underline(next)
    }

    /// All headings in document order.
    pub fn headings(&self) -> Vec<Heading> {
        let mut headings = Vec::new();
        let mut i = 0;
        while i < self.lines.len() {
            if !self.is_text(i) {
                i += 1;
                continue;
            }
            if let Some(atx) = atx_heading(self.lines[i]) {
                headings.push(Heading {
                    line: i,
                    level: atx.level,
                    text: atx.text.to_string(),
                    style: if atx.closed {
                        HeadingStyle::AtxClosed
                    } else {
                        HeadingStyle::Atx
                    },
                });
            } else if let Some(level) = self.setext_text(i) {
                headings.push(Heading {
                    line: i,
                    level,
                    text: self.lines[i].trim().to_string(),
                    style: HeadingStyle::Setext,
                });
                i += 1;
            }
            i += 1;
        }
        headings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_split_lines_keeps_trailing_empty_line() {
        assert_eq!(split_lines("a\nb\n"), vec!["a", "b", ""]);
        assert_eq!(split_lines(""), vec![""]);
    }

    #[rstest]
    #[case::backticks("```", Some(('`', 3, "")))]
    #[case::with_info("````rust ignore", Some(('`', 4, "rust ignore")))]
    #[case::tildes("  ~~~ yaml", Some(('~', 3, "yaml")))]
    #[case::too_short("``", None)]
    #[case::backtick_in_info("``` a`b", None)]
    #[case::text("text", None)]
    fn test_parse_fence(#[case] line: &str, #[case] expected: Option<(char, usize, &str)>) {
        let parsed = parse_fence(line).map(|f| (f.marker, f.len, f.info));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_closing_fence_must_be_long_enough() {
        let open = parse_fence("````").unwrap();
        assert!(!closes_fence(&open, "```"));
        assert!(closes_fence(&open, "`````"));
        assert!(!closes_fence(&open, "~~~~"));
        assert!(!closes_fence(&open, "```` rust"));
    }

    #[test]
    fn test_document_classifies_lines() {
        let doc = Document::parse("---\ntitle: x\n---\n# A\n```\n# not a heading\n```\ntext");
        assert_eq!(
            doc.kinds,
            vec![
                LineKind::FrontMatter,
                LineKind::FrontMatter,
                LineKind::FrontMatter,
                LineKind::Text,
                LineKind::Fence,
                LineKind::Code,
                LineKind::Fence,
                LineKind::Text,
            ]
        );
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].close, Some(6));
    }

    #[test]
    fn test_unclosed_block_runs_to_end() {
        let doc = Document::parse("intro\n~~~\ncode\nmore");
        assert_eq!(doc.blocks[0].close, None);
        assert_eq!(doc.blocks[0].content(doc.len()), 2..4);
        assert_eq!(doc.kinds[3], LineKind::Code);
    }

    #[test]
    fn test_front_matter_requires_closing_delimiter() {
        assert_eq!(front_matter_end(&["---", "a: b", "..."]), Some(2));
        assert_eq!(front_matter_end(&["---", "a: b"]), None);
        assert_eq!(front_matter_end(&["text", "---"]), None);
    }

    #[rstest]
    #[case::simple("# Title", Some((1, "Title", false)))]
    #[case::closed("## Title ##", Some((2, "Title", true)))]
    #[case::hash_in_text("# C#", Some((1, "C#", false)))]
    #[case::empty("###", Some((3, "", false)))]
    #[case::indented("   # Title", Some((1, "Title", false)))]
    #[case::no_space("#Title", None)]
    #[case::too_deep("####### Title", None)]
    #[case::code_indent("    # Title", None)]
    fn test_atx_heading(#[case] line: &str, #[case] expected: Option<(usize, &str, bool)>) {
        let parsed = atx_heading(line).map(|h| (h.level, h.text, h.closed));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_headings_include_setext() {
        let doc = Document::parse("Title\n=====\n\n## Part\n\nSub\n---\n");
        let headings: Vec<_> = doc
            .headings()
            .into_iter()
            .map(|h| (h.line, h.level, h.text, h.style))
            .collect();
        assert_eq!(
            headings,
            vec![
                (0, 1, "Title".to_string(), HeadingStyle::Setext),
                (3, 2, "Part".to_string(), HeadingStyle::Atx),
                (5, 2, "Sub".to_string(), HeadingStyle::Setext),
            ]
        );
    }

    #[test]
    fn test_hr_after_blank_is_not_setext() {
        let doc = Document::parse("para\n\n---\n");
        assert!(doc.headings().is_empty());
    }

    #[rstest]
    #[case::dash("- item", Some(("-", "item")))]
    #[case::ordered("12. item", Some(("12.", "item")))]
    #[case::paren("3) item", Some(("3)", "item")))]
    #[case::emphasis("*emphasis*", None)]
    #[case::hr("* * *", None)]
    #[case::number("2024 was a year", None)]
    fn test_list_item(#[case] line: &str, #[case] expected: Option<(&str, &str)>) {
        let parsed = list_item(line).map(|l| (l.marker, l.content));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_code_spans() {
        let line = "use `a` and ``b ` c`` but not `d";
        let spans = code_spans(line);
        assert_eq!(spans.len(), 2);
        assert_eq!(&line[spans[0].clone()], "`a`");
        assert_eq!(&line[spans[1].clone()], "``b ` c``");
    }
}
