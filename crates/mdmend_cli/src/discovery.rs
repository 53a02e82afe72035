//! Expands command-line paths into the Markdown files to process.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use thiserror::Error;
use tracing::{debug, info, warn};

const EXTENSIONS: [&str; 2] = ["md", "markdown"];

#[derive(Debug, Error, miette::Diagnostic)]
pub enum DiscoveryError {
    #[error("Invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("Failed to build ignore patterns: {0}")]
    Build(#[source] globset::Error),
}

/// Finds Markdown files, skipping config `ignore` patterns.
pub struct FileFinder {
    ignore: Option<GlobSet>,
}

impl FileFinder {
    pub fn new(patterns: &[String]) -> Result<Self, DiscoveryError> {
        if patterns.is_empty() {
            return Ok(Self { ignore: None });
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(&to_glob(pattern)).map_err(|source| {
                DiscoveryError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                }
            })?;
            builder.add(glob);
        }
        let ignore = builder.build().map_err(DiscoveryError::Build)?;
        Ok(Self {
            ignore: Some(ignore),
        })
    }

    pub fn should_ignore(&self, path: &Path) -> bool {
        self.ignore.as_ref().is_some_and(|set| set.is_match(path))
    }

    /// Expands `paths` into a sorted, de-duplicated file list.
    ///
    /// Directories are walked honoring `.gitignore` and skipping hidden
    /// entries. Other paths are kept as given, so a missing file surfaces
    /// as a per-file read error.
    pub fn discover(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for path in paths {
            if path.is_dir() {
                self.walk(path, &mut files);
            } else if self.should_ignore(path) {
                debug!("Ignoring {}", path.display());
            } else {
                files.push(path.clone());
            }
        }

        files.sort();
        files.dedup();
        info!("Discovered {} files", files.len());
        files
    }

    fn walk(&self, root: &Path, files: &mut Vec<PathBuf>) {
        for entry in WalkBuilder::new(root).build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) || !is_markdown(entry.path()) {
                continue;
            }
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if self.should_ignore(relative) {
                debug!("Ignoring {}", entry.path().display());
                continue;
            }
            files.push(entry.into_path());
        }
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// Anchors a gitignore-style pattern anywhere in the tree. A trailing `/`
/// matches everything below a directory of that name.
fn to_glob(pattern: &str) -> String {
    let pattern = pattern.trim_start_matches("./");
    if let Some(dir) = pattern.strip_suffix('/') {
        format!("**/{}/**", dir)
    } else if pattern.starts_with("**/") {
        pattern.to_string()
    } else {
        format!("**/{}", pattern)
    }
}
