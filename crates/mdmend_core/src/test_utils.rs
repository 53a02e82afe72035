use std::path::Path;

use crate::rule::Rule;
use crate::violation::Violation;

/// Path handed to rules in unit tests.
pub fn doc_path() -> &'static Path {
    Path::new("docs/guide.md")
}

/// Runs `rule.check` against `text`.
pub fn check(rule: &dyn Rule, text: &str) -> Vec<Violation> {
    rule.check(text, doc_path())
}

/// Runs `rule.rewrite` against `text` and returns the new content.
pub fn fix(rule: &dyn Rule, text: &str) -> String {
    rule.rewrite(text, doc_path()).content()
}

/// Asserts that a second rewrite changes nothing and leaves no fixable violation.
pub fn assert_fixed_point(rule: &dyn Rule, text: &str) {
    let once = fix(rule, text);
    let twice = rule.rewrite(&once, doc_path());
    assert!(
        !twice.changed,
        "{} is not idempotent on {:?}: {:?} became {:?}",
        rule.id(),
        text,
        once,
        twice.content()
    );
    let left: Vec<_> = check(rule, &once).into_iter().filter(|v| v.fixable).collect();
    assert!(
        left.is_empty(),
        "{} left fixable violations in {:?}: {:?}",
        rule.id(),
        once,
        left
    );
}
