//! Code block language inference.
//!
//! A short-circuiting chain of heuristics, strongest first:
//!
//! 1. the interpreter named by a shebang on the first line,
//! 2. language-specific line patterns in the block itself,
//! 3. keywords in the lines preceding the block (usually a heading),
//! 4. file extensions or well-known file names mentioned in those lines.
//!
//! Each stage runs only if every earlier stage came back empty. All tables
//! are ordered, so ties resolve the same way on every run.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

const SHEBANG_CONFIDENCE: f64 = 0.95;
const KEYWORD_CONFIDENCE: f64 = 0.75;
const MENTION_CONFIDENCE: f64 = 0.8;

/// Which heuristic produced an [`InferResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InferSource {
    /// The block had no lines.
    Empty,
    Shebang,
    Pattern,
    Keyword,
    Extension,
    Filename,
    /// Nothing matched.
    Fallback,
}

impl fmt::Display for InferSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InferSource::Empty => "empty",
            InferSource::Shebang => "shebang",
            InferSource::Pattern => "pattern",
            InferSource::Keyword => "keyword",
            InferSource::Extension => "extension",
            InferSource::Filename => "filename",
            InferSource::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

/// An inferred language with its confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InferResult {
    pub language: Option<&'static str>,
    pub confidence: f64,
    pub source: InferSource,
}

impl InferResult {
    fn found(language: &'static str, confidence: f64, source: InferSource) -> Self {
        Self {
            language: Some(language),
            confidence,
            source,
        }
    }

    fn none(source: InferSource) -> Self {
        Self {
            language: None,
            confidence: 0.0,
            source,
        }
    }
}

struct LanguagePattern {
    language: &'static str,
    pattern: Regex,
}

fn pattern(language: &'static str, source: &str) -> LanguagePattern {
    LanguagePattern {
        language,
        pattern: Regex::new(source).expect("language pattern must compile"),
    }
}

static PATTERNS: LazyLock<Vec<LanguagePattern>> = LazyLock::new(|| {
    vec![
        pattern("json", r"(?m)^\s*[\[{]"),
        pattern("yaml", r"(?m)^[\w-]+:\s"),
        pattern(
            "bash",
            r"(?m)^\$\s|^(apt|brew|npm|pip|git|curl|wget|echo|export|source)\s",
        ),
        pattern("sql", r"(?mi)^(SELECT|INSERT|UPDATE|DELETE|CREATE|DROP|ALTER)\s"),
        pattern(
            "dockerfile",
            r"(?m)^(FROM|RUN|CMD|EXPOSE|ENV|ADD|COPY|ENTRYPOINT|WORKDIR)\s",
        ),
        pattern("toml", r"(?m)^\[[\w.]+\]"),
        pattern("xml", r"(?m)^<\?xml|^<[\w:]+[\s>]"),
        pattern("html", r"(?mi)^<!DOCTYPE|^<html"),
        pattern(
            "java",
            r"(?m)^package\s+[\w.]+;|^(import java\.|import javax\.|public class|private class|public interface)",
        ),
        pattern("go", r"(?m)^package\s+\w+\s*$|^func\s|^import\s"),
        pattern("python", r"(?m)^(import |from \w+ import|def |class |if __name__)"),
        pattern(
            "javascript",
            r"(?m)^(const |let |var |function |import |export |module\.exports)",
        ),
        pattern("typescript", r"(?m)^(interface |type |enum |const .+:\s*\w+)"),
        pattern("rust", r"(?m)^(fn |use |mod |impl |struct |enum |pub )"),
        pattern(
            "css",
            r"(?m)^\.[a-zA-Z][\w-]*\s*\{|^#[a-zA-Z][\w-]*\s*\{",
        ),
        pattern("diff", r"(?m)^(\+\+\+|---|@@\s)"),
        pattern("ini", r"(?m)^\[[A-Za-z\s]+\]\s*$"),
        pattern("makefile", r"(?m)^[a-zA-Z_-]+:|^\.PHONY"),
        pattern("sh", r"(?m)^#!/.*/(bash|sh|zsh)"),
        pattern("ruby", r"(?m)^(require|class|def |module |end$)"),
        pattern("c", r"(?m)^(#include|#define|int |void |char )"),
        pattern("cpp", r"(?m)^(#include|#include <iostream>|using namespace|std::)"),
    ]
});

const KEYWORDS: &[(&str, &[&str])] = &[
    (
        "dockerfile",
        &["docker", "dockerfile", "docker compose", "container"],
    ),
    ("yaml", &["yaml", "yml", "kubernetes", "k8s", "helm"]),
    ("json", &["json", "api response", "response", "config"]),
    ("bash", &["shell", "bash", "terminal", "command line", "cli"]),
    ("sql", &["sql", "query", "database", "postgres", "mysql"]),
    ("python", &["python", "py"]),
    ("javascript", &["javascript", "js", "node", "nodejs"]),
    ("typescript", &["typescript", "ts"]),
    ("go", &["go", "golang"]),
    ("rust", &["rust", "cargo"]),
    ("ruby", &["ruby", "rb", "rails"]),
    ("makefile", &["makefile", "make"]),
];

const EXTENSIONS: &[(&str, &str)] = &[
    (".yml", "yaml"),
    (".yaml", "yaml"),
    (".json", "json"),
    (".toml", "toml"),
    (".xml", "xml"),
    (".html", "html"),
    (".css", "css"),
    (".sql", "sql"),
    (".sh", "bash"),
    (".bash", "bash"),
    (".zsh", "bash"),
    (".py", "python"),
    (".js", "javascript"),
    (".ts", "typescript"),
    (".go", "go"),
    (".rs", "rust"),
    (".rb", "ruby"),
    (".java", "java"),
    (".cpp", "cpp"),
    (".hpp", "cpp"),
    (".c", "c"),
    (".h", "c"),
];

const FILENAMES: &[(&str, &str)] = &[
    ("dockerfile", "dockerfile"),
    ("makefile", "makefile"),
    ("pipfile", "toml"),
    ("gemfile", "ruby"),
];

/// Infers the language of a code block from its lines and the document
/// lines that precede it.
pub fn infer_language(block: &[&str], context: &[&str]) -> InferResult {
    if block.is_empty() {
        return InferResult::none(InferSource::Empty);
    }

    if let Some(result) = from_shebang(block[0]) {
        return result;
    }
    if let Some(result) = from_patterns(&block.join("\n")) {
        return result;
    }

    let context = context.join(" ").to_lowercase();
    from_keywords(&context)
        .or_else(|| from_mentions(&context))
        .unwrap_or(InferResult::none(InferSource::Fallback))
}

fn from_shebang(first_line: &str) -> Option<InferResult> {
    let command = first_line.trim().strip_prefix("#!")?.to_lowercase();
    let mut words = command.split_whitespace();
    let program = words.next()?;
    let mut interpreter = program.rsplit('/').next().unwrap_or(program);
    if interpreter == "env" {
        interpreter = words.find(|w| !w.starts_with('-'))?;
    }

    let language = match interpreter.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.') {
        "bash" | "sh" => "bash",
        "python" => "python",
        "node" => "javascript",
        "ruby" => "ruby",
        "perl" => "perl",
        _ => return None,
    };
    Some(InferResult::found(
        language,
        SHEBANG_CONFIDENCE,
        InferSource::Shebang,
    ))
}

fn from_patterns(joined: &str) -> Option<InferResult> {
    let mut best: Option<(&'static str, usize)> = None;
    for lp in PATTERNS.iter() {
        let count = lp.pattern.find_iter(joined).count();
        if count > 0 && best.is_none_or(|(_, max)| count > max) {
            best = Some((lp.language, count));
        }
    }

    let (language, count) = best?;
    let confidence = match count {
        1 => 0.7,
        2 => 0.8,
        _ => 0.9,
    };
    Some(InferResult::found(language, confidence, InferSource::Pattern))
}

fn from_keywords(context: &str) -> Option<InferResult> {
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| contains_word(context, w)))
        .map(|&(language, _)| {
            InferResult::found(language, KEYWORD_CONFIDENCE, InferSource::Keyword)
        })
}

fn from_mentions(context: &str) -> Option<InferResult> {
    if let Some(&(_, language)) = EXTENSIONS
        .iter()
        .find(|(ext, _)| contains_extension(context, ext))
    {
        return Some(InferResult::found(
            language,
            MENTION_CONFIDENCE,
            InferSource::Extension,
        ));
    }
    FILENAMES
        .iter()
        .find(|(name, _)| contains_word(context, name))
        .map(|&(_, language)| InferResult::found(language, MENTION_CONFIDENCE, InferSource::Filename))
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Whether `needle` occurs in `haystack` with no word character on either side.
fn contains_word(haystack: &str, needle: &str) -> bool {
    let bytes = haystack.as_bytes();
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before = start == 0 || !is_word_byte(bytes[start - 1]);
        let after = end == bytes.len() || !is_word_byte(bytes[end]);
        before && after
    })
}

/// Whether `ext` (with its dot) occurs and is not followed by more letters.
fn contains_extension(haystack: &str, ext: &str) -> bool {
    let bytes = haystack.as_bytes();
    haystack.match_indices(ext).any(|(start, _)| {
        let end = start + ext.len();
        end == bytes.len() || !bytes[end].is_ascii_alphanumeric()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn language(block: &[&str], context: &[&str]) -> Option<&'static str> {
        infer_language(block, context).language
    }

    #[rstest]
    #[case::bash(&["#!/bin/bash", "echo hello"], "bash")]
    #[case::sh(&["#!/bin/sh"], "bash")]
    #[case::python(&["#!/usr/bin/python3", "print('hello')"], "python")]
    #[case::node(&["#!/usr/bin/node", "console.log('hello')"], "javascript")]
    #[case::ruby(&["#!/usr/bin/ruby", "puts 'hello'"], "ruby")]
    #[case::perl(&["#!/usr/bin/perl"], "perl")]
    #[case::env_python(&["#!/usr/bin/env python3", "print(1)"], "python")]
    #[case::env_flags(&["#!/usr/bin/env -S node --harmony"], "javascript")]
    fn test_shebang(#[case] block: &[&str], #[case] expected: &str) {
        let result = infer_language(block, &[]);
        assert_eq!(result.language, Some(expected));
        assert_eq!(result.confidence, 0.95);
        assert_eq!(result.source, InferSource::Shebang);
    }

    #[test]
    fn test_shebang_outranks_patterns() {
        let result = infer_language(&["#!/bin/bash", "SELECT 1;"], &[]);
        assert_eq!(result.language, Some("bash"));
    }

    #[test]
    fn test_unknown_interpreter_falls_through() {
        let result = infer_language(&["#!/usr/bin/awk -f"], &[]);
        assert_ne!(result.source, InferSource::Shebang);
    }

    #[rstest]
    #[case::json(&["{", r#"  "key": "value""#, "}"], "json")]
    #[case::yaml(&["key:", "  nested: value"], "yaml")]
    #[case::go(&["package main", "", "func main() {}"], "go")]
    #[case::python(&["import os", "", "def main():", "    pass"], "python")]
    #[case::sql(&["SELECT * FROM users;", "WHERE id = 1;"], "sql")]
    #[case::dockerfile(&["FROM alpine:latest", "RUN apk add bash"], "dockerfile")]
    #[case::javascript(&["const x = 1;", "function test() {}"], "javascript")]
    #[case::rust(&["fn main() {", "    println!(\"hello\");", "}"], "rust")]
    fn test_content_patterns(#[case] block: &[&str], #[case] expected: &str) {
        assert_eq!(language(block, &[]), Some(expected));
    }

    #[rstest]
    #[case::one(&["def main():"], 0.7)]
    #[case::two(&["import os", "def main():"], 0.8)]
    #[case::three(&["import os", "import sys", "def main():"], 0.9)]
    fn test_pattern_confidence_buckets(#[case] block: &[&str], #[case] expected: f64) {
        let result = infer_language(block, &[]);
        assert_eq!(result.language, Some("python"));
        assert_eq!(result.confidence, expected);
    }

    #[test]
    fn test_pattern_ties_follow_table_order() {
        // "key:" matches both yaml and makefile once; yaml is listed first.
        let result = infer_language(&["key:"], &[]);
        assert_eq!(result.language, Some("yaml"));
        assert_eq!(result.confidence, 0.7);
    }

    #[rstest]
    #[case::docker(&["## Docker Setup", "Run this:"], "dockerfile")]
    #[case::api(&["### API Response", "Example:"], "json")]
    #[case::python(&["## Python Example", "Code:"], "python")]
    #[case::golang(&["## Building with Go"], "go")]
    fn test_context_keywords(#[case] context: &[&str], #[case] expected: &str) {
        let result = infer_language(&["hello there"], context);
        assert_eq!(result.language, Some(expected));
        assert_eq!(result.confidence, 0.75);
        assert_eq!(result.source, InferSource::Keyword);
    }

    #[test]
    fn test_keywords_need_word_boundaries() {
        // "going" and "typescripts" must not read as go / typescript.
        let result = infer_language(&["hello there"], &["Going further with typescripts"]);
        assert_eq!(result.source, InferSource::Fallback);
    }

    #[rstest]
    #[case::toml(&["Save as settings.toml:"], "toml", InferSource::Extension)]
    #[case::cpp(&["Compile main.cpp first"], "cpp", InferSource::Extension)]
    #[case::header(&["Declared in util.h"], "c", InferSource::Extension)]
    #[case::gemfile(&["Add to the Gemfile"], "ruby", InferSource::Filename)]
    #[case::pipfile(&["Pipfile contents"], "toml", InferSource::Filename)]
    fn test_file_mentions(
        #[case] context: &[&str],
        #[case] expected: &str,
        #[case] source: InferSource,
    ) {
        let result = infer_language(&["hello there"], context);
        assert_eq!(result.language, Some(expected));
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.source, source);
    }

    #[test]
    fn test_extension_not_matched_inside_longer_one() {
        let result = infer_language(&["hello there"], &["see data.jsonl"]);
        assert_eq!(result.language, None);
    }

    #[test]
    fn test_fallback_and_empty() {
        let fallback = infer_language(&["some random text", "without patterns"], &[]);
        assert_eq!(fallback, InferResult::none(InferSource::Fallback));

        let empty = infer_language(&[], &["## Python"]);
        assert_eq!(empty.language, None);
        assert_eq!(empty.source, InferSource::Empty);
    }
}
