//! Rule registry.
//!
//! Registration happens once, through a [`RegistryBuilder`]. The built
//! [`Registry`] is immutable and is shared behind an `Arc` by every linter,
//! fixer and worker.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::error::{MdmendError, Result};
use crate::rule::{Phase, Rule};
use crate::rules::builtin_rules;

/// Collects rules before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    rules: Vec<Arc<dyn Rule>>,
    index: HashMap<&'static str, usize>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule. A second rule with the same id is an error.
    pub fn register(&mut self, rule: Arc<dyn Rule>) -> Result<()> {
        let id = rule.id();
        if self.index.contains_key(id) {
            return Err(MdmendError::DuplicateRule(id.to_string()));
        }
        self.index.insert(id, self.rules.len());
        self.rules.push(rule);
        Ok(())
    }

    /// Adds a rule unless its id is taken. Returns whether it was added.
    pub fn register_checked(&mut self, rule: Arc<dyn Rule>) -> bool {
        let id = rule.id();
        match self.register(rule) {
            Ok(()) => true,
            Err(_) => {
                debug!("Skipping rule {}: id already registered", id);
                false
            }
        }
    }

    /// Freezes the builder into a registry.
    pub fn build(self) -> Registry {
        Registry {
            rules: self.rules,
            index: self.index,
        }
    }
}

/// Immutable table of rules, in registration order.
pub struct Registry {
    rules: Vec<Arc<dyn Rule>>,
    index: HashMap<&'static str, usize>,
}

impl Registry {
    /// Builds the registry of built-in rules configured from `config`.
    pub fn builtin(config: &Config) -> Result<Self> {
        let mut builder = RegistryBuilder::new();
        for rule in builtin_rules(config) {
            builder.register(rule)?;
        }
        let registry = builder.build();
        debug!("Registered {} built-in rules", registry.len());
        Ok(registry)
    }

    /// Looks up a rule by id.
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Rule>> {
        self.index.get(id).map(|&i| &self.rules[i])
    }

    /// All rules in registration order.
    pub fn all(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    /// All rule ids in registration order.
    pub fn ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    /// Rules whose `fixable()` equals `fixable`.
    pub fn filter_by_fixable(&self, fixable: bool) -> Vec<&Arc<dyn Rule>> {
        self.rules.iter().filter(|r| r.fixable() == fixable).collect()
    }

    /// Rules assigned to `phase`, in registration order.
    pub fn rules_in_phase(&self, phase: Phase) -> Vec<&Arc<dyn Rule>> {
        self.rules
            .iter()
            .filter(|r| Phase::of(r.id()) == Some(phase))
            .collect()
    }

    /// Fixable rules with a phase, ordered by phase then registration.
    pub fn ordered_for_fix(&self) -> Vec<&Arc<dyn Rule>> {
        Phase::ALL
            .iter()
            .flat_map(|&phase| self.rules_in_phase(phase))
            .filter(|r| r.fixable())
            .collect()
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::Path;

    use super::*;
    use crate::violation::Violation;
    use pretty_assertions::assert_eq;

    /// Minimal rule for registry tests.
    pub(crate) struct StubRule {
        pub id: &'static str,
        pub fixable: bool,
    }

    impl Rule for StubRule {
        fn id(&self) -> &'static str {
            self.id
        }
        fn name(&self) -> &'static str {
            "stub"
        }
        fn description(&self) -> &'static str {
            "Stub rule"
        }
        fn fixable(&self) -> bool {
            self.fixable
        }
        fn check(&self, _text: &str, _path: &Path) -> Vec<Violation> {
            Vec::new()
        }
    }

    fn stub(id: &'static str, fixable: bool) -> Arc<dyn Rule> {
        Arc::new(StubRule { id, fixable })
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut builder = RegistryBuilder::new();
        builder.register(stub("MD009", true)).unwrap();
        let err = builder.register(stub("MD009", false)).unwrap_err();
        assert!(matches!(err, MdmendError::DuplicateRule(id) if id == "MD009"));

        let registry = builder.build();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("MD009").unwrap().fixable());
    }

    #[test]
    fn test_register_checked_never_overwrites() {
        let mut builder = RegistryBuilder::new();
        assert!(builder.register_checked(stub("MD040", true)));
        assert!(!builder.register_checked(stub("MD040", false)));
        let registry = builder.build();
        assert!(registry.get("MD040").unwrap().fixable());
    }

    #[test]
    fn test_queries() {
        let mut builder = RegistryBuilder::new();
        for (id, fixable) in [("MD053", true), ("MD013", false), ("MD009", true)] {
            builder.register(stub(id, fixable)).unwrap();
        }
        let registry = builder.build();

        assert_eq!(registry.ids(), vec!["MD053", "MD013", "MD009"]);
        assert_eq!(registry.filter_by_fixable(false).len(), 1);
        assert_eq!(registry.filter_by_fixable(true).len(), 2);
        assert!(registry.get("MD001").is_none());
    }

    #[test]
    fn test_ordered_for_fix_follows_phases() {
        let mut builder = RegistryBuilder::new();
        for (id, fixable) in [
            ("MD053", true),
            ("MD040", true),
            ("MD018", true),
            ("MD009", true),
            ("MD013", false),
            ("X001", true),
        ] {
            builder.register(stub(id, fixable)).unwrap();
        }
        let registry = builder.build();
        let order: Vec<_> = registry.ordered_for_fix().iter().map(|r| r.id()).collect();
        assert_eq!(order, vec!["MD009", "MD018", "MD040", "MD053"]);
    }

    #[test]
    fn test_builtin_registry_is_complete() {
        let registry = Registry::builtin(&Config::default()).unwrap();
        assert_eq!(registry.len(), 48);
        for rule in registry.all() {
            assert!(
                Phase::of(rule.id()).is_some(),
                "{} has no phase",
                rule.id()
            );
        }
    }
}
