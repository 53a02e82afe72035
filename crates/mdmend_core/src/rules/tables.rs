use std::path::Path;

use crate::config::RuleSettings;
use crate::rule::Rule;
use crate::rules::{blank_gaps, rewrite_text_lines};
use crate::text::{self, Document};
use crate::violation::{FixOutcome, Violation};

/// Byte offsets of the pipes that separate cells: not escaped and not
/// inside a code span.
fn separators(row: &str) -> Vec<usize> {
    let spans = text::code_spans(row);
    let bytes = row.as_bytes();
    (0..bytes.len())
        .filter(|&i| bytes[i] == b'|')
        .filter(|&i| i == 0 || bytes[i - 1] != b'\\')
        .filter(|&i| !spans.iter().any(|span| span.contains(&i)))
        .collect()
}

/// Trimmed cells of a row. Edge pipes do not open empty cells.
fn cells(row: &str) -> Vec<&str> {
    let row = row.trim();
    let pipes = separators(row);
    let mut bounds = vec![0];
    for &pipe in &pipes {
        bounds.push(pipe);
        bounds.push(pipe + 1);
    }
    bounds.push(row.len());
    let mut cells: Vec<&str> = bounds
        .chunks(2)
        .map(|pair| row[pair[0]..pair[1]].trim())
        .collect();
    if pipes.first() == Some(&0) {
        cells.remove(0);
    }
    if !row.is_empty() && pipes.last() == Some(&(row.len() - 1)) {
        cells.pop();
    }
    cells
}

fn leading_pipe(row: &str) -> bool {
    row.trim_start().starts_with('|')
}

fn trailing_pipe(row: &str) -> bool {
    let row = row.trim();
    !row.is_empty() && separators(row).last() == Some(&(row.len() - 1))
}

fn is_delimiter_row(row: &str) -> bool {
    let cells = cells(row);
    !cells.is_empty()
        && cells.iter().all(|cell| {
            let dashes = cell.trim_start_matches(':').trim_end_matches(':');
            !dashes.is_empty() && dashes.bytes().all(|b| b == b'-')
        })
}

/// A table: header row, delimiter row and body rows.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Table {
    header: usize,
    /// Last body row, or the delimiter row for a table without a body.
    end: usize,
    columns: usize,
}

impl Table {
    fn body(&self) -> std::ops::RangeInclusive<usize> {
        self.header + 2..=self.end
    }
}

fn is_row(doc: &Document<'_>, i: usize) -> bool {
    doc.is_text(i)
        && !text::is_blank(doc.lines[i])
        && !text::is_blockquote(doc.lines[i])
        && text::leading_whitespace(doc.lines[i]).len() <= 3
        && !separators(doc.lines[i].trim()).is_empty()
}

fn tables(doc: &Document<'_>) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut i = 0;
    while i + 1 < doc.len() {
        let columns = cells(doc.lines[i]).len();
        let starts = is_row(doc, i)
            && is_row(doc, i + 1)
            && is_delimiter_row(doc.lines[i + 1])
            && cells(doc.lines[i + 1]).len() == columns;
        if !starts {
            i += 1;
            continue;
        }
        let mut end = i + 1;
        while end + 1 < doc.len() && is_row(doc, end + 1) {
            end += 1;
        }
        tables.push(Table {
            header: i,
            end,
            columns,
        });
        i = end + 1;
    }
    tables
}

/// MD055: table rows start and end with a pipe.
pub struct TablePipes;

impl TablePipes {
    fn piped(row: &str) -> Option<String> {
        let (leading, trailing) = (leading_pipe(row), trailing_pipe(row));
        if leading && trailing {
            return None;
        }
        let indent = text::leading_whitespace(row);
        let body = row.trim();
        Some(format!(
            "{indent}{}{body}{}",
            if leading { "" } else { "| " },
            if trailing { "" } else { " |" }
        ))
    }
}

impl Rule for TablePipes {
    fn id(&self) -> &'static str {
        "MD055"
    }
    fn name(&self) -> &'static str {
        "table-pipe-style"
    }
    fn description(&self) -> &'static str {
        "Table pipe style"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        let mut violations = Vec::new();
        for table in tables(&doc) {
            for i in table.header..=table.end {
                let row = doc.lines[i];
                if !leading_pipe(row) {
                    violations.push(Violation::new(
                        self.id(),
                        i + 1,
                        1,
                        "Table row should start with pipe",
                    ));
                }
                if !trailing_pipe(row) {
                    violations.push(Violation::new(
                        self.id(),
                        i + 1,
                        row.trim_end().len(),
                        "Table row should end with pipe",
                    ));
                }
            }
        }
        violations
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        let doc = Document::parse(text);
        let rows: Vec<usize> = tables(&doc)
            .iter()
            .flat_map(|t| t.header..=t.end)
            .collect();
        rewrite_text_lines(text, |i, line| {
            rows.binary_search(&i).ok().and_then(|_| Self::piped(line))
        })
    }
}

/// MD056: body rows have as many cells as the header.
///
/// Short rows are padded with empty cells. Long rows are only reported,
/// since dropping cells would lose content.
pub struct TableColumns {
    pad_short_rows: bool,
}

impl TableColumns {
    pub fn new(settings: &RuleSettings) -> Self {
        Self {
            pad_short_rows: settings.pad_short_rows.unwrap_or(true),
        }
    }

    fn padded(row: &str, missing: usize) -> String {
        let extra = if trailing_pipe(row) { missing } else { missing + 1 };
        format!("{}{}", row.trim_end(), " |".repeat(extra))
    }
}

impl Rule for TableColumns {
    fn id(&self) -> &'static str {
        "MD056"
    }
    fn name(&self) -> &'static str {
        "table-column-count"
    }
    fn description(&self) -> &'static str {
        "Table column count should be consistent"
    }
    fn fixable(&self) -> bool {
        true
    }

    fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
        let doc = Document::parse(text);
        let mut violations = Vec::new();
        for table in tables(&doc) {
            for i in table.body() {
                let found = cells(doc.lines[i]).len();
                let message = if found < table.columns {
                    "Table row has fewer columns than header"
                } else if found > table.columns {
                    "Table row has more columns than header"
                } else {
                    continue;
                };
                violations.push(
                    Violation::new(
                        self.id(),
                        i + 1,
                        1,
                        format!("{message} ({found} of {})", table.columns),
                    )
                    .with_fixable(found < table.columns && self.pad_short_rows),
                );
            }
        }
        violations
    }

    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        if !self.pad_short_rows {
            return FixOutcome::unchanged(text);
        }
        let doc = Document::parse(text);
        let short: Vec<(usize, usize)> = tables(&doc)
            .iter()
            .flat_map(|t| t.body().map(move |i| (i, t.columns)))
            .filter_map(|(i, columns)| {
                let found = cells(doc.lines[i]).len();
                (found < columns).then_some((i, columns - found))
            })
            .collect();
        rewrite_text_lines(text, |i, line| {
            let (_, missing) = short.iter().find(|(row, _)| *row == i)?;
            Some(Self::padded(line, *missing))
        })
    }
}

/// MD058: tables surrounded by blank lines.
pub struct BlanksAroundTables;

impl BlanksAroundTables {
    fn ranges(doc: &Document<'_>) -> Vec<(usize, usize)> {
        tables(doc).iter().map(|t| (t.header, t.end)).collect()
    }
}

impl Rule for BlanksAroundTables {
    fn id(&self) -> &'static str {
        "MD058"
    }
    fn name(&self) -> &'static str {
        "blanks-around-tables"
    }
    fn description(&self) -> &'static str {
        "Tables should be surrounded by blank lines"
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
                    "Table missing blank line above",
                ));
            }
            if gaps.below.contains(&(end + 1)) {
                violations.push(Violation::new(
                    self.id(),
                    end + 1,
                    1,
                    "Table missing blank line below",
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
