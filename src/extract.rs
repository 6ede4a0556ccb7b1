//! Pulls the code and its language out of a model reply.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::deploy::language::{self, UNKNOWN};

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[ \t]*([\w+#.-]*)[^\n]*\n(.*?)```").unwrap());

/// An opening fence that is never closed, as in a reply cut off at the token limit.
static OPEN_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[ \t]*([\w+#.-]*)[^\n]*\n(.*)").unwrap());

/// Content signatures, checked in order. The first match wins.
static SIGNATURES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("html", r"(?i)<!doctype html|<html[\s>]|<body[\s>]"),
        ("php", r"<\?php"),
        ("go", r"(?m)^package \w+\s*$"),
        ("rust", r"fn main\(\)|println!\(|let mut |use std::"),
        ("java", r"public\s+(static\s+)?(class|void)\s"),
        ("cpp", r"#include\s*<|std::cout"),
        ("typescript", r"(?m)^\s*(interface|type)\s+\w+|\b(const|let|function)\b[^\n]*:\s*(string|number|boolean)\b"),
        ("javascript", r#"(?m)\b(const|let|var)\s+\w+\s*=|console\.log\(|require\(|=>|^\s*import .* from ['"]"#),
        ("python", r"(?m)^\s*(def \w+\(|class \w+.*:\s*$|import \w+|from [\w.]+ import|print\(|elif |if __name__)"),
        ("ruby", r#"(?m)^\s*(puts |require ['"]|def \w+\s*$)"#),
        ("shell", r"(?m)^#!/bin/(ba|z)?sh|^\s*(echo |apt-get |sudo )"),
        ("css", r"(?m)^[\w.#:\-\s,>*\[\]=]+\{[^}]*:[^}]*;"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).unwrap()))
    .collect()
});

/// Code and normalized language found in a reply, or `None` if there is no code.
///
/// The first fenced block wins, and a block cut off before its closing fence
/// still counts. Without a fence the whole reply is the code.
pub fn extract_code(raw: &str) -> Option<(String, String)> {
    let (code, tag) = match FENCE.captures(raw) {
        Some(cap) => fenced_body(&cap),
        None => match OPEN_FENCE.captures(raw) {
            Some(cap) => {
                warn!("Model reply ends inside a code block; using the truncated block");
                let (body, tag) = fenced_body(&cap);
                (body.trim_end().to_string(), tag)
            }
            None => (raw.trim().to_string(), String::new()),
        },
    };

    if code.trim().is_empty() {
        return None;
    }

    let language = if tag.is_empty() {
        guess_language(&code).to_string()
    } else {
        language::normalize(&tag)
    };
    Some((code, language))
}

fn fenced_body(cap: &regex::Captures<'_>) -> (String, String) {
    let body = cap.get(2).map_or("", |m| m.as_str());
    let body = body.strip_suffix('\n').unwrap_or(body);
    (body.to_string(), cap.get(1).map_or("", |m| m.as_str()).to_string())
}

/// Best-effort language guess from the code itself.
pub fn guess_language(code: &str) -> &'static str {
    SIGNATURES
        .iter()
        .find(|(_, re)| re.is_match(code))
        .map(|(name, _)| *name)
        .unwrap_or(UNKNOWN)
}

/// Text of the reply outside the first code block, trimmed.
pub fn explanation(raw: &str) -> String {
    match FENCE.find(raw) {
        Some(m) => format!("{}\n{}", raw[..m.start()].trim(), raw[m.end()..].trim())
            .trim()
            .to_string(),
        None => String::new(),
    }
}
