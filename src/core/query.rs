//! Purpose: Record filters used by `find_where`, `update`, and `remove`.
//! Exports: `Query`, `loose_string`.
//! Role: Field-equality maps, caller predicates, and compiled expressions behind one type.
//! Invariants: Field maps compare stringified values, so `1` matches `"1"`.
//! Invariants: Matching never fails; expression anomalies count as "no match".
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::core::error::Error;
use crate::core::expr::WhereExpr;
use crate::core::record::Record;

type Predicate = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

#[derive(Clone)]
pub enum Query {
    /// Every key must stringify equal to the record's value for that key.
    Fields(Record),
    Predicate(Predicate),
    Expr(WhereExpr),
}

impl Query {
    pub fn fields(fields: impl Into<Record>) -> Self {
        Self::Fields(fields.into())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    pub fn expr(source: &str) -> Result<Self, Error> {
        WhereExpr::compile(source).map(Self::Expr)
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Fields(fields) => fields
                .fields()
                .all(|(key, want)| loose_string(record.get(key)) == loose_string(Some(want))),
            Self::Predicate(f) => f(record),
            Self::Expr(expr) => match expr.matches(&record.to_value()) {
                Ok(matched) => matched,
                Err(err) => {
                    tracing::warn!(expr = expr.source(), error = %err, "where expression skipped record");
                    false
                }
            },
        }
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fields(fields) => f.debug_tuple("Fields").field(fields).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
            Self::Expr(expr) => f.debug_tuple("Expr").field(&expr.source()).finish(),
        }
    }
}

impl From<Record> for Query {
    fn from(fields: Record) -> Self {
        Self::Fields(fields)
    }
}

impl From<WhereExpr> for Query {
    fn from(expr: WhereExpr) -> Self {
        Self::Expr(expr)
    }
}

/// Script-style string conversion used by field matching.
///
/// A missing field reads as `"undefined"`, so it never equals an explicit `null`.
pub fn loose_string(value: Option<&Value>) -> String {
    let Some(value) = value else {
        return "undefined".to_string();
    };
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(num) => match num.as_f64() {
            Some(f) if num.is_f64() => script_number(f),
            _ => num.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => loose_string(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

// Plain decimals in [1e-6, 1e21), exponent form (`1e-7`, `1e+21`) outside it.
fn script_number(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }
    if (1e-6..1e21).contains(&f.abs()) {
        return format!("{f}");
    }
    let sci = format!("{f:e}");
    match sci.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => sci,
    }
}
