//! Purpose: Provide the internal runtime JSON decode entrypoints.
//! Exports: `from_str`, `ParseFailureCategory`, `categorize_error`, `hint_for_error`.
//! Role: Parser boundary that centralizes serde_json usage and failure labelling.
//! Invariants: Category mapping is deterministic for a given error.
//! Notes: Callers attach domain context (file path, op index) via the `context` label.

use std::fmt;

use serde::de::DeserializeOwned;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ParseFailureCategory {
    Syntax,
    Eof,
    Data,
    Io,
    NumericRange,
    DepthLimit,
    Unknown,
}

impl fmt::Display for ParseFailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Syntax => "syntax",
            Self::Eof => "eof",
            Self::Data => "data",
            Self::Io => "io",
            Self::NumericRange => "numeric-range",
            Self::DepthLimit => "depth-limit",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

pub(crate) fn from_str<T: DeserializeOwned>(input: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(input)
}

pub(crate) fn categorize_error(err: &serde_json::Error) -> ParseFailureCategory {
    match categorize_message(&err.to_string()) {
        ParseFailureCategory::Unknown => match err.classify() {
            serde_json::error::Category::Syntax => ParseFailureCategory::Syntax,
            serde_json::error::Category::Eof => ParseFailureCategory::Eof,
            serde_json::error::Category::Data => ParseFailureCategory::Data,
            serde_json::error::Category::Io => ParseFailureCategory::Io,
        },
        specific => specific,
    }
}

/// Picks out failure modes serde_json only reports through its message text.
pub(crate) fn categorize_message(message: &str) -> ParseFailureCategory {
    let lower = message.to_ascii_lowercase();
    if lower.contains("recursion limit") {
        ParseFailureCategory::DepthLimit
    } else if lower.contains("number out of range") {
        ParseFailureCategory::NumericRange
    } else {
        ParseFailureCategory::Unknown
    }
}

pub(crate) fn hint_for_error(err: &serde_json::Error, context: &str) -> String {
    format!(
        "parse category: {}; context: {context}; at line {}, column {}",
        categorize_error(err),
        err.line(),
        err.column()
    )
}
