//! The rule abstraction and the static phase table.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::violation::{FixOutcome, Violation};

/// Fix-application phase. Phases run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Heading style, list style and blank-line placement.
    Structure,
    /// Spacing inside headings, emphasis, code spans and links.
    Inline,
    /// Fence style, line length and other presentation checks.
    Style,
    /// Inferred fixes: code fence languages and bare URLs.
    Heuristic,
    /// Removal of definitions left unused by earlier phases.
    Cleanup,
}

impl Phase {
    /// All phases in application order.
    pub const ALL: [Phase; 5] = [
        Phase::Structure,
        Phase::Inline,
        Phase::Style,
        Phase::Heuristic,
        Phase::Cleanup,
    ];

    /// Looks up the phase of a rule id.
    ///
    /// Ids absent from the table have no phase and never take part in fixing.
    pub fn of(rule_id: &str) -> Option<Phase> {
        let phase = match rule_id {
            "MD003" | "MD004" | "MD005" | "MD007" | "MD009" | "MD010" | "MD012" | "MD022"
            | "MD028" | "MD031" | "MD032" | "MD041" | "MD056" | "MD058" => Phase::Structure,
            "MD011" | "MD014" | "MD018" | "MD019" | "MD020" | "MD021" | "MD023" | "MD024"
            | "MD025" | "MD026" | "MD027" | "MD030" | "MD033" | "MD036" | "MD037" | "MD038"
            | "MD039" | "MD042" | "MD043" | "MD044" | "MD051" | "MD052" | "MD057" => Phase::Inline,
            "MD013" | "MD035" | "MD045" | "MD047" | "MD048" | "MD049" | "MD050" | "MD055" => {
                Phase::Style
            }
            "MD034" | "MD040" => Phase::Heuristic,
            "MD053" => Phase::Cleanup,
            _ => return None,
        };
        Some(phase)
    }

    /// Lowercase phase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Structure => "structure",
            Phase::Inline => "inline",
            Phase::Style => "style",
            Phase::Heuristic => "heuristic",
            Phase::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static metadata describing a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub fixable: bool,
    pub heuristic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
}

/// A lint rule with an optional mechanical rewrite.
///
/// `check` must be a pure function of its inputs so it can be re-run against
/// progressively rewritten text. For non-heuristic rules `rewrite` reaches its
/// fixed point in a single call.
pub trait Rule: Send + Sync {
    /// Stable identifier, e.g. `MD040`.
    fn id(&self) -> &'static str;

    /// Short kebab-case name.
    fn name(&self) -> &'static str;

    /// One-line description.
    fn description(&self) -> &'static str;

    /// Whether `rewrite` can resolve violations.
    fn fixable(&self) -> bool;

    /// Whether the fix is inferred with a confidence rather than certain.
    fn heuristic(&self) -> bool {
        false
    }

    /// Reports violations in `text`.
    fn check(&self, text: &str, path: &Path) -> Vec<Violation>;

    /// Rewrites `text`, returning every line of the result.
    fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
        FixOutcome::unchanged(text)
    }

    /// Collects the rule's metadata.
    fn descriptor(&self) -> RuleDescriptor {
        RuleDescriptor {
            id: self.id(),
            name: self.name(),
            description: self.description(),
            fixable: self.fixable(),
            heuristic: self.heuristic(),
            phase: Phase::of(self.id()),
        }
    }
}
