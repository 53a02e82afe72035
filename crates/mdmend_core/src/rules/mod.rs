//! Built-in rules.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::Config;
use crate::rule::Rule;
use crate::text::{self, Document, LineKind};
use crate::violation::FixOutcome;

mod blocks;
mod code;
mod emphasis;
mod headings;
mod inline;
mod links;
mod lists;
mod tables;
mod whitespace;

pub use blocks::{BlockquoteBlanks, HrStyle, InlineHtml};
pub use code::{BlanksAroundFences, CommandPrompts, FenceStyle, FencedCodeLanguage};
pub use emphasis::{EmphasisAsHeading, EmphasisStyle, StrongStyle};
pub use headings::{
    BlanksAroundHeadings, DuplicateHeadings, FirstHeading, HeadingStartLeft, HeadingStyle,
    MultipleSpacesAfterHash, MultipleSpacesInClosedHeading, NoSpaceAfterHash,
    NoSpaceInClosedHeading, RequiredHeadings, SingleTitle, TrailingPunctuation,
};
pub use inline::{
    BlockquoteSpaces, ProperNames, ReversedLinks, SpacesInCodeSpans, SpacesInEmphasis,
    SpacesInLinkText,
};
pub use links::{
    BareUrls, BrokenRelativeLinks, EmptyLinks, ImageAltText, LinkFragments, UndefinedReferences,
    UnusedDefinitions,
};
pub use lists::{BlanksAroundLists, ListIndent, ListMarkerSpace, ListStyle, UnorderedListIndent};
pub use tables::{BlanksAroundTables, TableColumns, TablePipes};
pub use whitespace::{HardTabs, LineLength, MultipleBlankLines, TrailingNewline, TrailingSpaces};

/// Instantiates every built-in rule, configured from `config`.
///
/// Within each phase the order here is the order in which the fixer runs
/// the rules.
pub fn builtin_rules(config: &Config) -> Vec<Arc<dyn Rule>> {
    let settings = |id: &str| config.rule_settings(id);
    vec![
        // Structure
        Arc::new(HeadingStyle::new(&settings("MD003"))),
        Arc::new(ListStyle::new(&settings("MD004"))),
        Arc::new(ListIndent),
        Arc::new(UnorderedListIndent::new(&settings("MD007"))),
        Arc::new(TrailingSpaces),
        Arc::new(HardTabs::new(&settings("MD010"), config.tab_size())),
        Arc::new(FirstHeading::new(&settings("MD041"))),
        Arc::new(BlanksAroundHeadings),
        Arc::new(BlockquoteBlanks),
        Arc::new(BlanksAroundFences),
        Arc::new(BlanksAroundLists),
        Arc::new(TableColumns::new(&settings("MD056"))),
        Arc::new(BlanksAroundTables),
        Arc::new(MultipleBlankLines),
        // Inline
        Arc::new(ReversedLinks),
        Arc::new(CommandPrompts::new(&settings("MD014"))),
        Arc::new(NoSpaceAfterHash),
        Arc::new(MultipleSpacesAfterHash),
        Arc::new(NoSpaceInClosedHeading),
        Arc::new(MultipleSpacesInClosedHeading),
        Arc::new(HeadingStartLeft),
        Arc::new(DuplicateHeadings::new(&settings("MD024"))),
        Arc::new(SingleTitle::new(&settings("MD025"))),
        Arc::new(TrailingPunctuation::new(&settings("MD026"))),
        Arc::new(BlockquoteSpaces),
        Arc::new(ListMarkerSpace),
        Arc::new(InlineHtml::new(&settings("MD033"))),
        Arc::new(EmphasisAsHeading::new(&settings("MD036"))),
        Arc::new(SpacesInEmphasis),
        Arc::new(SpacesInCodeSpans),
        Arc::new(SpacesInLinkText),
        Arc::new(EmptyLinks),
        Arc::new(RequiredHeadings::new(&settings("MD043"))),
        Arc::new(ProperNames::new(&settings("MD044"))),
        Arc::new(LinkFragments::new(&settings("MD051"), config.aggressive)),
        Arc::new(UndefinedReferences),
        Arc::new(BrokenRelativeLinks::new(&settings("MD057"))),
        // Style
        Arc::new(LineLength::new(&settings("MD013"))),
        Arc::new(HrStyle::new(&settings("MD035"))),
        Arc::new(ImageAltText),
        Arc::new(TrailingNewline),
        Arc::new(FenceStyle::new(&settings("MD048"))),
        Arc::new(EmphasisStyle::new(&settings("MD049"))),
        Arc::new(StrongStyle::new(&settings("MD050"))),
        Arc::new(TablePipes),
        // Heuristic
        Arc::new(BareUrls::new(&settings("MD034"))),
        Arc::new(FencedCodeLanguage::new(&settings("MD040"), config.aggressive)),
        // Cleanup
        Arc::new(UnusedDefinitions),
    ]
}

/// Byte offset of `inner` within `outer`. `inner` must be a subslice of
/// `outer`.
pub(crate) fn offset_in(outer: &str, inner: &str) -> usize {
    inner.as_ptr() as usize - outer.as_ptr() as usize
}

/// Builds an outcome by rewriting single lines of ordinary Markdown content.
/// Front matter and code are passed through untouched.
pub(crate) fn rewrite_text_lines<F>(text: &str, mut f: F) -> FixOutcome
where
    F: FnMut(usize, &str) -> Option<String>,
{
    let doc = Document::parse(text);
    let mut changed = false;
    let lines = doc
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if doc.kinds[i] == LineKind::Text
                && let Some(new) = f(i, *line)
                && new != *line
            {
                changed = true;
                return new;
            }
            line.to_string()
        })
        .collect();
    FixOutcome::new(changed, lines)
}

/// Gaps that need a blank line around the given inclusive line ranges.
///
/// Gap `g` sits between line `g - 1` and line `g`. A gap is needed when the
/// neighbouring line exists, is not blank and is not front matter. Shared
/// gaps between adjacent blocks are reported once.
pub(crate) fn blank_gaps(doc: &Document<'_>, ranges: &[(usize, usize)]) -> BlankGaps {
    let mut above = BTreeSet::new();
    let mut below = BTreeSet::new();
    for &(start, end) in ranges {
        if start > 0
            && !text::is_blank(doc.lines[start - 1])
            && doc.kinds[start - 1] != LineKind::FrontMatter
        {
            above.insert(start);
        }
        if end + 1 < doc.len() && !text::is_blank(doc.lines[end + 1]) {
            below.insert(end + 1);
        }
    }
    BlankGaps { above, below }
}

/// Result of [`blank_gaps`].
pub(crate) struct BlankGaps {
    /// Gaps before the first line of a range, keyed by that line.
    pub above: BTreeSet<usize>,
    /// Gaps after the last line of a range, keyed by the following line.
    pub below: BTreeSet<usize>,
}

impl BlankGaps {
    pub fn is_empty(&self) -> bool {
        self.above.is_empty() && self.below.is_empty()
    }

    /// Inserts one blank line into every gap.
    pub fn apply(&self, lines: &[&str]) -> FixOutcome {
        if self.is_empty() {
            return FixOutcome::new(false, lines.iter().map(|l| l.to_string()).collect());
        }
        let mut out = Vec::with_capacity(lines.len() + self.above.len() + self.below.len());
        for (i, line) in lines.iter().enumerate() {
            if self.above.contains(&i) || self.below.contains(&i) {
                out.push(String::new());
            }
            out.push(line.to_string());
        }
        FixOutcome::new(true, out)
    }
}
