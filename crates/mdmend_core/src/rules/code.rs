use std::path::Path;

use tracing::debug;

use crate::config::RuleSettings;
use crate::infer::infer_language;
use crate::rule::Rule;
use crate::rules::blank_gaps;
use crate::text::{self, CodeBlock, Document};
use crate::violation::{FixOutcome, Violation};

/// Lines before a fence that are searched for hints about its language.
const CONTEXT_LINES: usize = 5;

/// MD031: fenced code blocks surrounded by blank lines.
pub struct BlanksAroundFences;

impl BlanksAroundFences {
    fn ranges(doc: &Document<'_>) -> Vec<(usize, usize)> {
        doc.blocks
            .iter()
            .map(|b| (b.open, b.last_line(doc.len())))
            .collect()
    }
}

impl Rule for BlanksAroundFences {
    fn id(&self) -> &'static str {
        "MD031"
    }
    fn name(&self) -> &'static str {
        "blanks-around-fences"
    }
    fn description(&self) -> &'static str {
        "Fenced code blocks should be surrounded by blank lines"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        let ranges = Self::ranges(&doc);
        let gaps = blank_gaps(&doc, &ranges);
        let mut violations = Vec::new();
        for (start, end) in ranges {
            if gaps.above.contains(&start) {
                violations.push(Violation::new(
                    self.id(),
                    start + 1,
                    1,
                    "Fenced code block missing blank line above",
                ));
            }
            if gaps.below.contains(&(end + 1)) {
                violations.push(Violation::new(
                    self.id(),
                    end + 1,
                    1,
                    "Fenced code block missing blank line below",
                ));
            }
        }
        violations
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let doc = Document::parse(text);
        let ranges = Self::ranges(&doc);
        blank_gaps(&doc, &ranges).apply(&doc.lines)
    }
}

/// Info strings of blocks that hold shell sessions.
const SHELL_LANGUAGES: [&str; 7] = ["bash", "sh", "shell", "console", "terminal", "zsh", "fish"];

/// MD014: shell commands shown with a `$` prompt.
///
/// In smart mode a block that also shows command output is left alone,
/// since the prompt is what tells commands and output apart.
pub struct CommandPrompts {
    smart: bool,
}

impl CommandPrompts {
    pub fn new(settings: &RuleSettings) -> Self {
        Self {
            smart: settings.smart.unwrap_or(true),
        }
    }

    fn prompted(line: &str) -> bool {
        line[text::leading_whitespace(line).len()..].starts_with("$ ")
    }

    /// Content lines whose prompt should go.
    fn prompt_lines(&self, doc: &Document<'_>, block: &CodeBlock) -> Vec<usize> {
        let range = block.content(doc.len());
        let language = block
            .info
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        let prompts: Vec<usize> = range
            .clone()
            .filter(|&i| Self::prompted(doc.lines[i]))
            .collect();
        let shell = SHELL_LANGUAGES.contains(&language.as_str());
        if prompts.is_empty() || !(shell || language.is_empty()) {
            return Vec::new();
        }
        let mixed = doc.lines[range].iter().any(|line| {
            let trimmed = line.trim_start();
            !trimmed.is_empty() && !trimmed.starts_with("$ ") && !trimmed.starts_with('>')
        });
        if self.smart && mixed {
            return Vec::new();
        }
        prompts
    }

    fn strip(line: &str) -> String {
        let indent = text::leading_whitespace(line);
        format!("{}{}", indent, &line[indent.len() + 2..])
    }
}

impl Rule for CommandPrompts {
    fn id(&self) -> &'static str {
        "MD014"
    }
    fn name(&self) -> &'static str {
        "commands-show-output"
    }
    fn description(&self) -> &'static str {
        "Dollar signs used before commands without showing output"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        doc.blocks
            .iter()
            .flat_map(|block| self.prompt_lines(&doc, block))
            .map(|i| {
                let column = text::leading_whitespace(doc.lines[i]).len() + 1;
                Violation::new(self.id(), i + 1, column, "Dollar sign before command in code block")
                    .with_suggestion(Self::strip(doc.lines[i]))
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let doc = Document::parse(text);
        let mut lines: Vec<String> = doc.lines.iter().map(|l| l.to_string()).collect();
        let mut changed = false;
        for block in &doc.blocks {
            for i in self.prompt_lines(&doc, block) {
                lines[i] = Self::strip(doc.lines[i]);
                changed = true;
            }
        }
        FixOutcome::new(changed, lines)
    }
}

/// MD040: fenced code blocks declare a language.
///
/// The fix infers the language from the block content and the lines before
/// it. Guesses below the confidence threshold are replaced with the fallback
/// label unless aggressive mode is on.
pub struct FencedCodeLanguage {
    fallback: String,
    confidence: f64,
    aggressive: bool,
}

impl FencedCodeLanguage {
    pub fn new(settings: &RuleSettings, aggressive: bool) -> Self {
        Self {
            fallback: settings.fallback.clone().unwrap_or_else(|| "text".to_string()),
            confidence: settings.confidence.unwrap_or(0.6),
            aggressive,
        }
    }

    /// Label to write on an unlabelled block, if any. Only `aggressive`
    /// accepts guesses below the threshold.
    fn label(&self, doc: &Document<'_>, block: &CodeBlock, aggressive: bool) -> Option<String> {
        let content = &doc.lines[block.content(doc.len())];
        let context = &doc.lines[block.open.saturating_sub(CONTEXT_LINES)..block.open];
        let result = infer_language(content, context);
        debug!(
            "Inferred {:?} for block at line {} ({}, {:.2})",
            result.language,
            block.open + 1,
            result.source,
            result.confidence
        );
        match result.language {
            Some(language) if aggressive || result.confidence >= self.confidence => {
                Some(language.to_string())
            }
            _ => (!self.fallback.is_empty()).then(|| self.fallback.clone()),
        }
    }

    fn unlabelled<'d>(doc: &'d Document<'_>) -> impl Iterator<Item = &'d CodeBlock> {
        doc.blocks.iter().filter(|b| b.info.is_empty())
    }
}

impl Rule for FencedCodeLanguage {
    fn id(&self) -> &'static str {
        "MD040"
    }
    fn name(&self) -> &'static str {
        "fenced-code-language"
    }
    fn description(&self) -> &'static str {
        "Fenced code blocks should have a language specified"
    }
    fn fixable(&self) -> bool {
        true
    }
    fn heuristic(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        Self::unlabelled(&doc)
            .map(|block| {
                let violation = Violation::new(
                    self.id(),
                    block.open + 1,
                    block.indent.len() + 1,
                    "Fenced code block has no language specified",
                );
                match self.label(&doc, block, false) {
                    Some(label) => violation.with_suggestion(label),
                    None => violation.with_fixable(false),
                }
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let doc = Document::parse(text);
        let mut lines: Vec<String> = doc.lines.iter().map(|l| l.to_string()).collect();
        let mut changed = false;
        for block in Self::unlabelled(&doc) {
            let Some(label) = self.label(&doc, block, self.aggressive) else {
                continue;
            };
            let run = block.marker.to_string().repeat(block.fence_len);
            lines[block.open] = format!("{}{}{}", block.indent, run, label);
            changed = true;
        }
        FixOutcome::new(changed, lines)
    }
}

/// MD048: code fence style.
pub struct FenceStyle {
    /// `None` means "whatever the first block uses".
    marker: Option<char>,
}

impl FenceStyle {
    pub fn new(settings: &RuleSettings) -> Self {
        let marker = match settings.style.as_deref() {
            Some("tilde") => Some('~'),
            Some("consistent") => None,
            _ => Some('`'),
        };
        Self { marker }
    }

    fn expected(&self, doc: &Document<'_>) -> Option<char> {
        self.marker.or_else(|| doc.blocks.first().map(|b| b.marker))
    }

    /// Whether switching `block` to `marker` would change how it parses.
    fn conflicts(doc: &Document<'_>, block: &CodeBlock, marker: char) -> bool {
        if marker == '`' && block.info.contains('`') {
            return true;
        }
        let run = marker.to_string().repeat(block.fence_len);
        doc.lines[block.content(doc.len())]
            .iter()
            .any(|line| line.trim_start().starts_with(&run))
    }

    /// Replaces the leading marker run of a fence line.
    fn swap_run(line: &str, marker: char) -> String {
        let indent = text::leading_whitespace(line);
        let rest = &line[indent.len()..];
        let len = rest.chars().take_while(|c| *c == '`' || *c == '~').count();
        format!("{}{}{}", indent, marker.to_string().repeat(len), &rest[len..])
    }
}

impl Rule for FenceStyle {
    fn id(&self) -> &'static str {
        "MD048"
    }
    fn name(&self) -> &'static str {
        "code-fence-style"
    }
    fn description(&self) -> &'static str {
        "Code fence style"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        let Some(expected) = self.expected(&doc) else {
            return Vec::new();
        };
        doc.blocks
            .iter()
            .filter(|b| b.marker != expected)
            .map(|b| {
                let name = if expected == '`' { "backtick" } else { "tilde" };
                Violation::new(
                    self.id(),
                    b.open + 1,
                    b.indent.len() + 1,
                    format!("Expected {} code fence", name),
                )
                .with_fixable(!Self::conflicts(&doc, b, expected))
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let doc = Document::parse(text);
        let Some(expected) = self.expected(&doc) else {
            return FixOutcome::unchanged(text);
        };
        let mut lines: Vec<String> = doc.lines.iter().map(|l| l.to_string()).collect();
        let mut changed = false;
        for block in doc.blocks.iter().filter(|b| b.marker != expected) {
            if Self::conflicts(&doc, block, expected) {
                continue;
            }
            lines[block.open] = Self::swap_run(doc.lines[block.open], expected);
            if let Some(close) = block.close {
                lines[close] = Self::swap_run(doc.lines[close], expected);
            }
            changed = true;
        }
        FixOutcome::new(changed, lines)
    }
}
