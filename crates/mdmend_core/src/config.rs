//! Engine configuration.
//!
//! Settings come from `.mdmend.jsonc` or `.mdmend.json` (JSON with comments).
//! Values present in the file overlay the built-in defaults; per-rule
//! settings merge field by field.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use jsonc_parser::ParseOptions;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MdmendError, Result};

/// Configuration file names tried when no explicit path is given.
pub const CONFIG_FILES: [&str; 2] = [".mdmend.jsonc", ".mdmend.json"];

const DEFAULT_TAB_SIZE: usize = 4;

/// Options for a single rule. Every field is optional; rules fall back to
/// their own defaults for anything left unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub punctuation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_patterns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggest_closest: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_different_nesting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_blocks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front_matter: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derive_from_filename: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promote_first: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pad_short_rows: Option<bool>,
}

impl RuleSettings {
    /// Overlays every field that is set in `other`.
    pub fn merge(&mut self, other: RuleSettings) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field;
                })*
            };
        }
        overlay!(
            style,
            tab_size,
            line_length,
            punctuation,
            skip_patterns,
            fallback,
            confidence,
            suggest_closest,
            allow_different_nesting,
            code_blocks,
            tables,
            indent,
            smart,
            level,
            front_matter,
            allowed_tags,
            names,
            headings,
            derive_from_filename,
            promote_first,
            pad_short_rows
        );
    }

    fn style(style: &str) -> Self {
        Self {
            style: Some(style.to_string()),
            ..Self::default()
        }
    }
}

/// Resolved engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    /// Rule ids that never run.
    pub disable: Vec<String>,
    /// Per-rule options keyed by rule id.
    pub rules: BTreeMap<String, RuleSettings>,
    /// Glob patterns excluded from file discovery.
    pub ignore: Vec<String>,
    /// Default tab width.
    pub tab_size: usize,
    /// Allow heuristic rules to apply low-confidence fixes.
    pub aggressive: bool,
    /// Worker count for multi-file runs; 0 uses the available parallelism.
    pub workers: usize,
    /// Maximum number of full fix pipeline passes per document.
    pub fix_passes: usize,
    /// File this configuration was loaded from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// On-disk shape: everything optional so the file only overrides what it names.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    disable: Option<Vec<String>>,
    rules: BTreeMap<String, RuleSettings>,
    ignore: Option<Vec<String>>,
    tab_size: Option<usize>,
    aggressive: Option<bool>,
    workers: Option<usize>,
    fix_passes: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        let mut rules = BTreeMap::new();
        rules.insert("MD003".to_string(), RuleSettings::style("atx"));
        rules.insert("MD004".to_string(), RuleSettings::style("dash"));
        rules.insert(
            "MD007".to_string(),
            RuleSettings {
                indent: Some(2),
                ..RuleSettings::default()
            },
        );
        rules.insert(
            "MD010".to_string(),
            RuleSettings {
                tab_size: Some(DEFAULT_TAB_SIZE),
                ..RuleSettings::default()
            },
        );
        rules.insert(
            "MD013".to_string(),
            RuleSettings {
                line_length: Some(120),
                code_blocks: Some(false),
                tables: Some(false),
                ..RuleSettings::default()
            },
        );
        rules.insert(
            "MD014".to_string(),
            RuleSettings {
                smart: Some(true),
                ..RuleSettings::default()
            },
        );
        rules.insert(
            "MD024".to_string(),
            RuleSettings {
                allow_different_nesting: Some(true),
                ..RuleSettings::default()
            },
        );
        rules.insert(
            "MD026".to_string(),
            RuleSettings {
                punctuation: Some(".,;:!".to_string()),
                ..RuleSettings::default()
            },
        );
        rules.insert(
            "MD025".to_string(),
            RuleSettings {
                level: Some(1),
                front_matter: Some(true),
                ..RuleSettings::default()
            },
        );
        rules.insert(
            "MD033".to_string(),
            RuleSettings {
                allowed_tags: Some(Vec::new()),
                ..RuleSettings::default()
            },
        );
        rules.insert(
            "MD034".to_string(),
            RuleSettings {
                style: Some("angle".to_string()),
                skip_patterns: Some(Vec::new()),
                ..RuleSettings::default()
            },
        );
        rules.insert(
            "MD040".to_string(),
            RuleSettings {
                fallback: Some("text".to_string()),
                confidence: Some(0.6),
                ..RuleSettings::default()
            },
        );
        rules.insert(
            "MD036".to_string(),
            RuleSettings {
                punctuation: Some(".,;:!?".to_string()),
                ..RuleSettings::default()
            },
        );
        rules.insert(
            "MD041".to_string(),
            RuleSettings {
                derive_from_filename: Some(true),
                promote_first: Some(true),
                front_matter: Some(true),
                ..RuleSettings::default()
            },
        );
        rules.insert(
            "MD044".to_string(),
            RuleSettings {
                names: Some(
                    ["JavaScript", "TypeScript", "GitHub", "macOS"]
                        .map(String::from)
                        .to_vec(),
                ),
                code_blocks: Some(false),
                ..RuleSettings::default()
            },
        );
        rules.insert("MD048".to_string(), RuleSettings::style("backtick"));
        rules.insert("MD049".to_string(), RuleSettings::style("asterisk"));
        rules.insert("MD050".to_string(), RuleSettings::style("asterisk"));
        for id in ["MD051", "MD057"] {
            rules.insert(
                id.to_string(),
                RuleSettings {
                    suggest_closest: Some(true),
                    ..RuleSettings::default()
                },
            );
        }
        rules.insert(
            "MD056".to_string(),
            RuleSettings {
                pad_short_rows: Some(true),
                ..RuleSettings::default()
            },
        );

        Self {
            disable: vec!["MD013".to_string(), "MD033".to_string()],
            rules,
            ignore: vec![
                "node_modules/".to_string(),
                "vendor/".to_string(),
                "*.generated.md".to_string(),
                "CHANGELOG.md".to_string(),
            ],
            tab_size: DEFAULT_TAB_SIZE,
            aggressive: false,
            workers: 0,
            fix_passes: 1,
            source: None,
        }
    }
}

impl Config {
    /// Loads configuration.
    ///
    /// With an explicit path the file must exist. Without one the default
    /// file names are tried in the working directory and absence yields the
    /// defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::discover(Path::new(".")) {
                Some(found) => Self::from_file(&found),
                None => Ok(Self::default()),
            },
        }
    }

    /// Returns the first default configuration file present in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MdmendError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_jsonc(&content)?;
        config.source = Some(path.to_path_buf());
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses JSON-with-comments text and overlays it on the defaults.
    pub fn from_jsonc(content: &str) -> Result<Self> {
        let value = jsonc_parser::parse_to_serde_value(content, &ParseOptions::default())
            .map_err(|e| MdmendError::config(format!("Invalid JSON: {}", e)))?
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));

        let file: ConfigFile = serde_json::from_value(value)
            .map_err(|e| MdmendError::config(format!("Invalid config: {}", e)))?;

        let mut config = Self::default();
        config.apply(file);
        Ok(config)
    }

    fn apply(&mut self, file: ConfigFile) {
        if let Some(disable) = file.disable {
            self.disable = disable;
        }
        if let Some(ignore) = file.ignore {
            self.ignore = ignore;
        }
        if let Some(tab_size) = file.tab_size {
            self.tab_size = tab_size;
        }
        if let Some(aggressive) = file.aggressive {
            self.aggressive = aggressive;
        }
        if let Some(workers) = file.workers {
            self.workers = workers;
        }
        if let Some(fix_passes) = file.fix_passes {
            self.fix_passes = fix_passes;
        }
        for (id, settings) in file.rules {
            self.rules.entry(id).or_default().merge(settings);
        }
    }

    /// Whether `rule_id` is disabled.
    pub fn is_disabled(&self, rule_id: &str) -> bool {
        self.disable.iter().any(|id| id.eq_ignore_ascii_case(rule_id))
    }

    /// Returns the settings for `rule_id`, empty when none are configured.
    pub fn rule_settings(&self, rule_id: &str) -> RuleSettings {
        self.rules.get(rule_id).cloned().unwrap_or_default()
    }

    /// Tab width, never zero.
    pub fn tab_size(&self) -> usize {
        if self.tab_size > 0 {
            self.tab_size
        } else {
            DEFAULT_TAB_SIZE
        }
    }

    /// Adds rule ids to the disable list, skipping ones already present.
    pub fn disable_rules<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in ids {
            let id = id.as_ref().trim().to_ascii_uppercase();
            if !id.is_empty() && !self.is_disabled(&id) {
                self.disable.push(id);
            }
        }
    }
}
