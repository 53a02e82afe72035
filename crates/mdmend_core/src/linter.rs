//! Read-only aggregation of rule findings.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::registry::Registry;
use crate::rule::Rule;
use crate::violation::Violation;

/// Violations found in one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
    /// Sorted by line, then column.
    pub violations: Vec<Violation>,
    pub fixable: usize,
    pub unfixable: usize,
}

impl LintReport {
    fn new(violations: Vec<Violation>) -> Self {
        let fixable = violations.iter().filter(|v| v.fixable).count();
        Self {
            unfixable: violations.len() - fixable,
            fixable,
            violations,
        }
    }

    /// Total number of violations.
    pub fn total(&self) -> usize {
        self.violations.len()
    }
}

/// Runs every enabled rule against unmodified text.
pub struct Linter {
    rules: Vec<Arc<dyn Rule>>,
}

impl Linter {
    pub fn new(registry: &Registry, config: &Config) -> Self {
        let rules: Vec<Arc<dyn Rule>> = registry
            .all()
            .iter()
            .filter(|rule| !config.is_disabled(rule.id()))
            .cloned()
            .collect();
        debug!("Linter enabled {} rules", rules.len());
        Self { rules }
    }

    /// Ids of the enabled rules in registration order.
    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    pub fn lint(&self, content: &str, path: &Path) -> LintReport {
        let mut violations: Vec<Violation> = self
            .rules
            .iter()
            .flat_map(|rule| rule.check(content, path))
            .collect();
        // Stable, so equal positions keep registration order.
        violations.sort_by_key(|v| (v.line, v.column));
        LintReport::new(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryBuilder;
    use pretty_assertions::assert_eq;

    struct Fixed {
        id: &'static str,
        at: Vec<(usize, usize, bool)>,
    }

    impl Rule for Fixed {
        fn id(&self) -> &'static str {
            self.id
        }
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn description(&self) -> &'static str {
            "Reports fixed positions"
        }
        fn fixable(&self) -> bool {
            true
        }
        fn check(&self, _text: &str, _path: &Path) -> Vec<Violation> {
            self.at
                .iter()
                .map(|&(line, column, fixable)| {
                    Violation::new(self.id, line, column, "fixed").with_fixable(fixable)
                })
                .collect()
        }
    }

    fn linter(config: &Config) -> Linter {
        let mut builder = RegistryBuilder::new();
        builder
            .register(Arc::new(Fixed {
                id: "MD009",
                at: vec![(3, 1, true), (1, 5, true)],
            }))
            .unwrap();
        builder
            .register(Arc::new(Fixed {
                id: "MD042",
                at: vec![(1, 5, false), (1, 2, false)],
            }))
            .unwrap();
        Linter::new(&builder.build(), config)
    }

    #[test]
    fn test_violations_are_sorted_stably() {
        let report = linter(&Config::default()).lint("", Path::new("a.md"));
        let order: Vec<_> = report
            .violations
            .iter()
            .map(|v| (v.rule_id, v.line, v.column))
            .collect();
        assert_eq!(
            order,
            vec![
                ("MD042", 1, 2),
                ("MD009", 1, 5),
                ("MD042", 1, 5),
                ("MD009", 3, 1),
            ]
        );
        assert_eq!((report.total(), report.fixable, report.unfixable), (4, 2, 2));
    }

    #[test]
    fn test_disabled_rules_do_not_run() {
        let mut config = Config::default();
        config.disable_rules(["MD042"]);
        let linter = linter(&config);
        assert_eq!(linter.rule_ids(), vec!["MD009"]);
        assert_eq!(linter.lint("", Path::new("a.md")).unfixable, 0);
    }
}
