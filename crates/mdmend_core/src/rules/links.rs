use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::config::RuleSettings;
use crate::distance::{closest, levenshtein};
use crate::rule::Rule;
use crate::rules::rewrite_text_lines;
use crate::slug::slugify;
use crate::text::{self, Document};
use crate::violation::{FixOutcome, Violation};

static BARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>\[\]"'`]+"#).expect("url pattern must compile")
});
static DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s{0,3}\[([^\]]+)\]:\s*\S").expect("definition pattern must compile")
});
static INLINE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(!?)\[([^\]]*)\]\(([^)]*)\)").expect("link pattern must compile")
});
static MISSING_ALT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[\]\(([^)]+)\)").expect("image pattern must compile"));
static FRAGMENT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]*)\]\(#([^)]+)\)").expect("fragment pattern must compile")
});
static RELATIVE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]*)\]\(([^)#][^)]*)\)").expect("relative link pattern must compile")
});
static BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").expect("bracket pattern must compile"));
static REFERENCE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\[([^\]]*)\]").expect("reference link pattern must compile")
});
static SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").expect("scheme pattern must compile")
});

/// Fragments within this distance of a heading slug are suggested.
const SUGGEST_DISTANCE: usize = 2;
/// Fragments within this distance are rewritten in aggressive mode.
const REWRITE_DISTANCE: usize = 1;

fn is_definition(line: &str) -> bool {
    DEFINITION.is_match(line)
}

/// Reference labels match case-insensitively with collapsed whitespace.
fn normalize_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UrlStyle {
    Angle,
    Link,
}

/// MD034: bare URLs.
pub struct BareUrls {
    style: UrlStyle,
    skip: Vec<Regex>,
}

impl BareUrls {
    pub fn new(settings: &RuleSettings) -> Self {
        let style = match settings.style.as_deref() {
            Some("link") => UrlStyle::Link,
            _ => UrlStyle::Angle,
        };
        let skip = settings
            .skip_patterns
            .iter()
            .flatten()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Ignoring invalid MD034 skip pattern '{}': {}", pattern, e);
                    None
                }
            })
            .collect();
        Self { style, skip }
    }

    /// Trims punctuation that ends a sentence rather than the URL.
    fn trim_url(url: &str) -> &str {
        let mut url = url;
        loop {
            if let Some(stripped) = url.strip_suffix(['.', ',', ';', ':', '!', '?']) {
                url = stripped;
            } else if url.ends_with(')') && url.matches(')').count() > url.matches('(').count() {
                url = &url[..url.len() - 1];
            } else {
                return url;
            }
        }
    }

    /// Byte ranges of bare URLs on the line.
    fn urls(&self, line: &str) -> Vec<(usize, usize)> {
        if is_definition(line) {
            return Vec::new();
        }
        let mut found = Vec::new();
        for (offset, part) in text::outside_code(line) {
            for m in BARE_URL.find_iter(part) {
                let url = Self::trim_url(m.as_str());
                let before = part[..m.start()].chars().last();
                let after = part[m.start() + url.len()..].chars().next();
                if matches!(before, Some('<' | '(' | '[' | '"' | '\'' | '='))
                    || matches!(after, Some('>' | ']'))
                    || self.skip.iter().any(|re| re.is_match(url))
                {
                    continue;
                }
                found.push((offset + m.start(), offset + m.start() + url.len()));
            }
        }
        found
    }

    fn wrap(&self, url: &str) -> String {
        match self.style {
            UrlStyle::Angle => format!("<{url}>"),
            UrlStyle::Link => format!("[{url}]({url})"),
        }
    }
}

impl Rule for BareUrls {
    fn id(&self) -> &'static str {
        "MD034"
    }
    fn name(&self) -> &'static str {
        "no-bare-urls"
    }
    fn description(&self) -> &'static str {
        "Bare URL used"
    }
    fn fixable(&self) -> bool {
        true
    }
    fn heuristic(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        let mut violations = Vec::new();
        for (i, line) in doc.text_lines() {
            for (start, end) in self.urls(line) {
                let url = &line[start..end];
                violations.push(
                    Violation::new(self.id(), i + 1, start + 1, format!("Bare URL used: {url}"))
                        .with_suggestion(self.wrap(url)),
                );
            }
        }
        violations
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        rewrite_text_lines(text, |_, line| {
            let urls = self.urls(line);
            if urls.is_empty() {
                return None;
            }
            let mut out = String::with_capacity(line.len() + urls.len() * 2);
            let mut last = 0;
            for (start, end) in urls {
                out.push_str(&line[last..start]);
                out.push_str(&self.wrap(&line[start..end]));
                last = end;
            }
            out.push_str(&line[last..]);
            Some(out)
        })
    }
}

/// MD042: links without a destination. Report only.
pub struct EmptyLinks;

impl Rule for EmptyLinks {
    fn id(&self) -> &'static str {
        "MD042"
    }
    fn name(&self) -> &'static str {
        "no-empty-links"
    }
    fn description(&self) -> &'static str {
        "No empty links"
    }
    fn fixable(&self) -> bool {
        false
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        let mut violations = Vec::new();
        for (i, line) in doc.text_lines() {
            for (offset, part) in text::outside_code(line) {
                for caps in INLINE_LINK.captures_iter(part) {
                    let href = caps[3].trim();
                    if !caps[1].is_empty() || !(href.is_empty() || href == "#") {
                        continue;
                    }
                    let column = offset + caps.get(0).map_or(0, |m| m.start()) + 1;
                    violations.push(
                        Violation::new(
                            self.id(),
                            i + 1,
                            column,
                            format!("Empty link: [{}]", &caps[2]),
                        )
                        .with_fixable(false),
                    );
                }
            }
        }
        violations
    }
}

/// MD045: images without alternate text. Report only.
pub struct ImageAltText;

impl Rule for ImageAltText {
    fn id(&self) -> &'static str {
        "MD045"
    }
    fn name(&self) -> &'static str {
        "no-alt-text"
    }
    fn description(&self) -> &'static str {
        "Images should have alternate text"
    }
    fn fixable(&self) -> bool {
        false
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        let mut violations = Vec::new();
        for (i, line) in doc.text_lines() {
            for (offset, part) in text::outside_code(line) {
                for caps in MISSING_ALT.captures_iter(part) {
                    let column = offset + caps.get(0).map_or(0, |m| m.start()) + 1;
                    violations.push(
                        Violation::new(
                            self.id(),
                            i + 1,
                            column,
                            format!("Image missing alt text: {}", &caps[1]),
                        )
                        .with_fixable(false),
                    );
                }
            }
        }
        violations
    }
}

/// Slugs of every heading in the document. Repeated headings get `-1`,
/// `-2`, ... suffixes.
fn heading_slugs(doc: &Document<'_>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    doc.headings()
        .iter()
        .map(|h| {
            let slug = slugify(&h.text);
            let seen = counts.entry(slug.clone()).or_insert(0);
            let unique = if *seen == 0 {
                slug
            } else {
                format!("{}-{}", slug, seen)
            };
            *seen += 1;
            unique
        })
        .collect()
}

/// A fragment link whose target heading does not exist.
struct BrokenFragment {
    line: usize,
    /// Byte range of the fragment, without the `#`.
    range: std::ops::Range<usize>,
    fragment: String,
    closest: Option<(String, usize)>,
}

/// MD051: link fragments point at existing headings.
pub struct LinkFragments {
    suggest: bool,
    aggressive: bool,
}

impl LinkFragments {
    pub fn new(settings: &RuleSettings, aggressive: bool) -> Self {
        Self {
            suggest: settings.suggest_closest.unwrap_or(true),
            aggressive,
        }
    }

    fn broken(&self, doc: &Document<'_>) -> Vec<BrokenFragment> {
        let slugs = heading_slugs(doc);
        let known: HashSet<&str> = slugs.iter().map(String::as_str).collect();
        let mut broken = Vec::new();
        for (i, line) in doc.text_lines() {
            for (offset, part) in text::outside_code(line) {
                for caps in FRAGMENT_LINK.captures_iter(part) {
                    let Some(m) = caps.get(2) else {
                        continue;
                    };
                    let fragment = m.as_str();
                    let lower = fragment.to_lowercase();
                    if known.contains(fragment) || known.contains(lower.as_str()) {
                        continue;
                    }
                    let nearest = closest(&lower, slugs.iter().map(String::as_str))
                        .filter(|(_, d)| *d <= SUGGEST_DISTANCE)
                        .map(|(s, d)| (s.to_string(), d));
                    broken.push(BrokenFragment {
                        line: i,
                        range: offset + m.start()..offset + m.end(),
                        fragment: fragment.to_string(),
                        closest: nearest,
                    });
                }
            }
        }
        broken
    }
}

impl Rule for LinkFragments {
    fn id(&self) -> &'static str {
        "MD051"
    }
    fn name(&self) -> &'static str {
        "link-fragments"
    }
    fn description(&self) -> &'static str {
        "Link fragments should be valid"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        self.broken(&doc)
            .into_iter()
            .map(|b| {
                let violation = Violation::new(
                    self.id(),
                    b.line + 1,
                    b.range.start,
                    format!("Link fragment '#{}' does not match any heading", b.fragment),
                );
                let rewritable = b.closest.as_ref().is_some_and(|(_, d)| *d <= REWRITE_DISTANCE);
                let violation = violation.with_fixable(rewritable);
                match b.closest.filter(|_| self.suggest) {
                    Some((slug, _)) => violation.with_suggestion(format!("#{slug}")),
                    None => violation,
                }
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        if !self.aggressive {
            return FixOutcome::unchanged(text);
        }
        let doc = Document::parse(text);
        let mut lines: Vec<String> = doc.lines.iter().map(|l| l.to_string()).collect();
        let mut changed = false;
        // Later fragments first so earlier byte ranges stay valid.
        for b in self.broken(&doc).into_iter().rev() {
            let Some((slug, distance)) = b.closest else {
                continue;
            };
            if distance > REWRITE_DISTANCE {
                continue;
            }
            debug!("Rewriting fragment #{} to #{}", b.fragment, slug);
            lines[b.line].replace_range(b.range, &slug);
            changed = true;
        }
        FixOutcome::new(changed, lines)
    }
}

/// MD053: reference definitions that nothing uses.
pub struct UnusedDefinitions;

impl UnusedDefinitions {
    /// Lines holding definitions whose label is never referenced.
    fn unused(doc: &Document<'_>) -> Vec<(usize, String)> {
        let mut definitions = Vec::new();
        let mut used = HashSet::new();
        for (i, line) in doc.text_lines() {
            if let Some(caps) = DEFINITION.captures(line) {
                let label = normalize_label(&caps[1]);
                // Footnotes are resolved elsewhere.
                if !label.starts_with('^') {
                    definitions.push((i, label));
                }
                continue;
            }
            for (_, part) in text::outside_code(line) {
                for caps in BRACKETS.captures_iter(part) {
                    used.insert(normalize_label(&caps[1]));
                }
            }
        }
        definitions.retain(|(_, label)| !used.contains(label));
        definitions
    }
}

impl Rule for UnusedDefinitions {
    fn id(&self) -> &'static str {
        "MD053"
    }
    fn name(&self) -> &'static str {
        "link-image-reference-definitions"
    }
    fn description(&self) -> &'static str {
        "Link and image reference definitions should be needed"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        Self::unused(&Document::parse(text))
            .into_iter()
            .map(|(i, label)| {
                Violation::new(
                    self.id(),
                    i + 1,
                    1,
                    format!("Unused reference definition: [{label}]"),
                )
            })
            .collect()
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let doc = Document::parse(text);
        let unused: HashSet<usize> = Self::unused(&doc).into_iter().map(|(i, _)| i).collect();
        if unused.is_empty() {
            return FixOutcome::unchanged(text);
        }
        let mut lines: Vec<String> = Vec::with_capacity(doc.len());
        let mut removed = false;
        for (i, line) in doc.lines.iter().enumerate() {
            if unused.contains(&i) {
                removed = true;
                continue;
            }
            // Do not leave a doubled blank line where a definition was.
            let previous_blank = lines.last().is_none_or(|l| text::is_blank(l));
            if removed && text::is_blank(line) && previous_blank {
                removed = false;
                if i + 1 < doc.len() {
                    continue;
                }
                // Keep the final empty line that carries the trailing newline.
                lines.pop();
            }
            removed = false;
            lines.push(line.to_string());
        }
        FixOutcome::new(true, lines)
    }
}

/// MD052: reference links whose label has no definition. Report only.
pub struct UndefinedReferences;

impl Rule for UndefinedReferences {
    fn id(&self) -> &'static str {
        "MD052"
    }
    fn name(&self) -> &'static str {
        "reference-links-images"
    }
    fn description(&self) -> &'static str {
        "Reference links and images should use a label that is defined"
    }
    fn fixable(&self) -> bool {
        false
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        let defined: HashSet<String> = doc
            .text_lines()
            .filter_map(|(_, line)| DEFINITION.captures(line))
            .map(|caps| normalize_label(&caps[1]))
            .collect();
        let mut violations = Vec::new();
        for (i, line) in doc.text_lines() {
            if is_definition(line) {
                continue;
            }
            for (offset, part) in text::outside_code(line) {
                for caps in REFERENCE_LINK.captures_iter(part) {
                    // `[text][]` uses the text as its label.
                    let label = match &caps[2] {
                        "" => &caps[1],
                        label => label,
                    };
                    let key = normalize_label(label);
                    if key.is_empty() || key.starts_with('^') || defined.contains(&key) {
                        continue;
                    }
                    let column = offset + caps.get(0).map_or(0, |m| m.start()) + 1;
                    violations.push(
                        Violation::new(
                            self.id(),
                            i + 1,
                            column,
                            format!("Undefined reference link: [{label}]"),
                        )
                        .with_fixable(false),
                    );
                }
            }
        }
        violations
    }
}

/// A relative link target that does not exist on disk.
struct MissingTarget {
    line: usize,
    column: usize,
    target: String,
}

/// MD057: relative links point at existing files. Report only, with a
/// suggestion when a similarly named file sits next to the document.
pub struct BrokenRelativeLinks {
    suggest: bool,
}

impl BrokenRelativeLinks {
    pub fn new(settings: &RuleSettings) -> Self {
        Self {
            suggest: settings.suggest_closest.unwrap_or(true),
        }
    }

    /// The file part of a link destination, or `None` for links that are
    /// not relative file paths.
    fn file_target(destination: &str) -> Option<&str> {
        let destination = destination.trim();
        let destination = match destination.strip_prefix('<') {
            Some(inner) => inner.split('>').next()?,
            None => destination.split_whitespace().next()?,
        };
        if destination.starts_with(['/', '#', '?']) || SCHEME.is_match(destination) {
            return None;
        }
        let file = destination.split(['#', '?']).next()?;
        (!file.is_empty()).then_some(file)
    }

    fn missing(doc: &Document<'_>, base: &Path) -> Vec<MissingTarget> {
        let mut missing = Vec::new();
        for (i, line) in doc.text_lines() {
            for (offset, part) in text::outside_code(line) {
                for caps in RELATIVE_LINK.captures_iter(part) {
                    let Some(target) = Self::file_target(&caps[2]) else {
                        continue;
                    };
                    if base.join(target).exists() {
                        continue;
                    }
                    let column = offset + caps.get(2).map_or(0, |m| m.start()) + 1;
                    missing.push(MissingTarget {
                        line: i,
                        column,
                        target: target.to_string(),
                    });
                }
            }
        }
        missing
    }

    /// Closest file name in `base` to the target's file name.
    fn suggestion(base: &Path, target: &str) -> Option<String> {
        let wanted = Path::new(target).file_name()?.to_str()?;
        let entries = match fs::read_dir(base) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot list {}: {}", base.display(), e);
                return None;
            }
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        if names.iter().any(|n| n == wanted) {
            return Some(wanted.to_string());
        }
        let wanted = wanted.to_lowercase();
        let mut best: Option<(&String, usize)> = None;
        for name in &names {
            let distance = levenshtein(&wanted, &name.to_lowercase());
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((name, distance));
            }
        }
        best.filter(|(_, d)| *d <= SUGGEST_DISTANCE)
            .map(|(name, _)| name.clone())
    }
}

fn base_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

impl Rule for BrokenRelativeLinks {
    fn id(&self) -> &'static str {
        "MD057"
    }
    fn name(&self) -> &'static str {
        "broken-links"
    }
    fn description(&self) -> &'static str {
        "Broken relative links should be fixed"
    }
    fn fixable(&self) -> bool {
        false
    }

    fn check(&self, text: &str, path: &Path) -> Vec<Violation> {
        let base = base_dir(path);
        Self::missing(&Document::parse(text), &base)
            .into_iter()
            .map(|m| {
                let violation = Violation::new(
                    self.id(),
                    m.line + 1,
                    m.column,
                    format!("Broken relative link: {}", m.target),
                )
                .with_fixable(false);
                match Self::suggestion(&base, &m.target).filter(|_| self.suggest) {
                    Some(name) => violation.with_suggestion(name),
                    None => violation,
                }
            })
            .collect()
    }
}
