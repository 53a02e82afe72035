//! Phase-ordered fix pipeline.
//!
//! One pass walks every enabled fixable rule in phase order. For each rule
//! the current text is re-checked, and only when the rule reports something
//! is its rewrite applied. Later rules therefore always see the output of
//! earlier ones.

use std::path::Path;
use std::sync::Arc;

use blake3::Hash;
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::registry::Registry;
use crate::rule::Rule;

/// How the pass loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum Convergence {
    /// A pass left the text unchanged, or the single configured pass ran.
    Converged { passes: usize },
    /// The pass budget ran out while the text was still changing.
    MaxPassesReached { passes: usize },
    /// A pass produced text seen after an earlier pass.
    CycleDetected { cycle_length: usize },
}

/// Result of fixing one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixReport {
    /// Whether any rule changed the text.
    pub changed: bool,
    /// The fixed text.
    pub content: String,
    /// Violations seen by rules whose rewrite changed the text.
    pub fixes: usize,
    pub convergence: Convergence,
}

impl FixReport {
    /// A report for text that needed no changes.
    pub fn unchanged(content: String) -> Self {
        Self {
            changed: false,
            content,
            fixes: 0,
            convergence: Convergence::Converged { passes: 1 },
        }
    }
}

/// Applies enabled fixable rules in phase order.
pub struct Fixer {
    rules: Vec<Arc<dyn Rule>>,
    max_passes: usize,
}

impl Fixer {
    /// Builds a fixer over the registry's fixable rules minus those the
    /// config disables.
    pub fn new(registry: &Registry, config: &Config) -> Self {
        let rules: Vec<Arc<dyn Rule>> = registry
            .ordered_for_fix()
            .into_iter()
            .filter(|rule| !config.is_disabled(rule.id()))
            .cloned()
            .collect();
        debug!("Fixer enabled {} rules", rules.len());
        Self {
            rules,
            max_passes: config.fix_passes.max(1),
        }
    }

    /// Ids of the rules this fixer runs, in the order it runs them.
    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    /// Fixes `content`.
    pub fn fix(&self, content: &str, path: &Path) -> FixReport {
        let mut current = content.to_string();
        let mut fixes = 0;
        let mut changed = false;
        let mut history: Vec<Hash> = vec![blake3::hash(current.as_bytes())];
        let mut passes = 0;

        let convergence = loop {
            passes += 1;
            let pass = self.run_pass(&current, path);
            changed |= pass.touched;
            fixes += pass.fixes;
            if pass.content == current {
                break Convergence::Converged { passes };
            }
            current = pass.content;

            let hash = blake3::hash(current.as_bytes());
            if let Some(seen) = history.iter().position(|h| *h == hash) {
                break Convergence::CycleDetected {
                    cycle_length: history.len() - seen,
                };
            }
            history.push(hash);

            if passes >= self.max_passes {
                break if self.max_passes == 1 {
                    Convergence::Converged { passes }
                } else {
                    Convergence::MaxPassesReached { passes }
                };
            }
        };

        debug!(
            "Fixed {}: {} fixes, {:?}",
            path.display(),
            fixes,
            convergence
        );
        FixReport {
            changed,
            content: current,
            fixes,
            convergence,
        }
    }

    /// One walk over every rule.
    fn run_pass(&self, content: &str, path: &Path) -> Pass {
        let mut pass = Pass {
            content: content.to_string(),
            fixes: 0,
            touched: false,
        };
        for rule in &self.rules {
            let violations = rule.check(&pass.content, path);
            if violations.is_empty() {
                continue;
            }
            let outcome = rule.rewrite(&pass.content, path);
            if !outcome.changed {
                continue;
            }
            let next = outcome.content();
            if next == pass.content {
                continue;
            }
            debug!("{} fixed {} violations", rule.id(), violations.len());
            pass.fixes += violations.len();
            pass.touched = true;
            pass.content = next;
        }
        pass
    }
}

/// Outcome of one walk over the rules.
struct Pass {
    content: String,
    /// Violations seen by rules that changed the text.
    fixes: usize,
    /// Whether any rule changed the text, even if a later one undid it.
    touched: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryBuilder;
    use crate::registry::tests::StubRule;
    use crate::violation::{FixOutcome, Violation};
    use pretty_assertions::assert_eq;

    /// Appends `marker` to the text once, and records what it saw.
    struct Append {
        id: &'static str,
        marker: &'static str,
    }

    impl Rule for Append {
        fn id(&self) -> &'static str {
            self.id
        }
        fn name(&self) -> &'static str {
            "append"
        }
        fn description(&self) -> &'static str {
            "Appends a marker"
        }
        fn fixable(&self) -> bool {
            true
        }
        fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
            if text.contains(self.marker) {
                Vec::new()
            } else {
                vec![Violation::new(self.id, 1, 1, "missing marker")]
            }
        }
        fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
            FixOutcome::new(true, vec![format!("{}{}", text, self.marker)])
        }
    }

    /// Flips between two texts forever.
    struct Flip;

    impl Rule for Flip {
        fn id(&self) -> &'static str {
            "MD009"
        }
        fn name(&self) -> &'static str {
            "flip"
        }
        fn description(&self) -> &'static str {
            "Flips text"
        }
        fn fixable(&self) -> bool {
            true
        }
        fn check(&self, _text: &str, _path: &Path) -> Vec<Violation> {
            vec![Violation::new("MD009", 1, 1, "flip")]
        }
        fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
            let next = if text == "a" { "b" } else { "a" };
            FixOutcome::new(true, vec![next.to_string()])
        }
    }

    fn registry(rules: Vec<Arc<dyn Rule>>) -> Registry {
        let mut builder = RegistryBuilder::new();
        for rule in rules {
            builder.register(rule).unwrap();
        }
        builder.build()
    }

    #[test]
    fn test_rules_run_in_phase_order() {
        // Registered cleanup first, structure last.
        let registry = registry(vec![
            Arc::new(Append { id: "MD053", marker: "[cleanup]" }),
            Arc::new(Append { id: "MD040", marker: "[heuristic]" }),
            Arc::new(Append { id: "MD047", marker: "[style]" }),
            Arc::new(Append { id: "MD018", marker: "[inline]" }),
            Arc::new(Append { id: "MD009", marker: "[structure]" }),
        ]);
        let fixer = Fixer::new(&registry, &Config::default());
        let report = fixer.fix("", Path::new("a.md"));
        assert_eq!(
            report.content,
            "[structure][inline][style][heuristic][cleanup]"
        );
        assert_eq!(report.fixes, 5);
        assert!(report.changed);
    }

    #[test]
    fn test_disabled_and_unfixable_rules_are_skipped() {
        let registry = registry(vec![
            Arc::new(Append { id: "MD009", marker: "x" }),
            Arc::new(Append { id: "MD010", marker: "y" }),
            Arc::new(StubRule { id: "MD013", fixable: false }),
        ]);
        let mut config = Config::default();
        config.disable_rules(["md010"]);
        let fixer = Fixer::new(&registry, &config);
        assert_eq!(fixer.rule_ids(), vec!["MD009"]);
        assert_eq!(fixer.fix("", Path::new("a.md")).content, "x");
    }

    #[test]
    fn test_rules_without_phase_never_fix() {
        let registry = registry(vec![Arc::new(Append { id: "X001", marker: "x" })]);
        let report = Fixer::new(&registry, &Config::default()).fix("text", Path::new("a.md"));
        assert_eq!(report, FixReport::unchanged("text".to_string()));
    }

    #[test]
    fn test_cycle_detection() {
        let registry = registry(vec![Arc::new(Flip)]);
        let config = Config {
            fix_passes: 5,
            ..Config::default()
        };
        let report = Fixer::new(&registry, &config).fix("a", Path::new("a.md"));
        assert_eq!(report.convergence, Convergence::CycleDetected { cycle_length: 2 });
        assert_eq!(report.content, "a");
        assert!(report.changed);
    }

    /// Removes the marker a structure-phase rule appends.
    struct Strip;

    impl Rule for Strip {
        fn id(&self) -> &'static str {
            "MD047"
        }
        fn name(&self) -> &'static str {
            "strip"
        }
        fn description(&self) -> &'static str {
            "Strips a marker"
        }
        fn fixable(&self) -> bool {
            true
        }
        fn check(&self, text: &str, _path: &Path) -> Vec<Violation> {
            if text.ends_with('!') {
                vec![Violation::new("MD047", 1, 1, "marker")]
            } else {
                Vec::new()
            }
        }
        fn rewrite(&self, text: &str, _path: &Path) -> FixOutcome {
            FixOutcome::new(true, vec![text.trim_end_matches('!').to_string()])
        }
    }

    #[test]
    fn test_undone_edit_still_counts_as_changed() {
        let registry = registry(vec![
            Arc::new(Append { id: "MD009", marker: "!" }),
            Arc::new(Strip),
        ]);
        let report = Fixer::new(&registry, &Config::default()).fix("hi", Path::new("a.md"));
        assert_eq!(report.content, "hi");
        assert!(report.changed);
        assert_eq!(report.fixes, 2);
        assert_eq!(report.convergence, Convergence::Converged { passes: 1 });
    }

    #[test]
    fn test_single_pass_counts_as_converged() {
        let registry = registry(vec![Arc::new(Flip)]);
        let report = Fixer::new(&registry, &Config::default()).fix("a", Path::new("a.md"));
        assert_eq!(report.convergence, Convergence::Converged { passes: 1 });
        assert_eq!(report.content, "b");
    }

    #[test]
    fn test_multiple_passes_stop_when_stable() {
        let registry = registry(vec![Arc::new(Append { id: "MD009", marker: "!" })]);
        let config = Config {
            fix_passes: 4,
            ..Config::default()
        };
        let report = Fixer::new(&registry, &config).fix("hi", Path::new("a.md"));
        assert_eq!(report.content, "hi!");
        assert_eq!(report.convergence, Convergence::Converged { passes: 2 });
    }
}
