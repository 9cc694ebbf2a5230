//! Purpose: Regression coverage for parse-failure category mapping.
//! Exports: Integration tests only.
//! Role: Verify stable category labels used by fixture and script diagnostics.
//! Invariants: Category mapping remains deterministic for representative errors.
//! Notes: Uses source include to exercise internal helper logic without widening API surface.
#![allow(dead_code)]

#[path = "../src/json/parse.rs"]
mod parse;

use parse::ParseFailureCategory;
use serde_json::Value;

#[test]
fn category_mapping_handles_syntax_and_eof_errors() {
    let syntax_err = parse::from_str::<Value>(r#"{"a":}"#).unwrap_err();
    assert_eq!(
        parse::categorize_error(&syntax_err),
        ParseFailureCategory::Syntax
    );

    let eof_err = parse::from_str::<Value>(r#"{"a": [1, 2"#).unwrap_err();
    assert_eq!(parse::categorize_error(&eof_err), ParseFailureCategory::Eof);
}

#[test]
fn category_mapping_handles_numeric_and_depth_errors() {
    let number_err = parse::from_str::<Value>(r#"{"n": 1e999}"#).unwrap_err();
    assert_eq!(
        parse::categorize_error(&number_err),
        ParseFailureCategory::NumericRange
    );

    let deep = "[".repeat(200) + &"]".repeat(200);
    let depth_err = parse::from_str::<Value>(&deep).unwrap_err();
    assert_eq!(
        parse::categorize_error(&depth_err),
        ParseFailureCategory::DepthLimit
    );
}

#[test]
fn data_errors_come_from_shape_mismatches() {
    let err = parse::from_str::<Vec<u8>>(r#"{"a": 1}"#).unwrap_err();
    assert_eq!(parse::categorize_error(&err), ParseFailureCategory::Data);
}

#[test]
fn hint_contains_category_and_context() {
    let err = parse::from_str::<Value>(r#"{"n": 1e999}"#).unwrap_err();
    let hint = parse::hint_for_error(&err, "fixtures.json");
    assert!(hint.contains("parse category: numeric-range"));
    assert!(hint.contains("context: fixtures.json"));
}

#[test]
fn unknown_category_fallback_is_stable() {
    assert_eq!(
        parse::categorize_message("opaque parser issue"),
        ParseFailureCategory::Unknown
    );
}
