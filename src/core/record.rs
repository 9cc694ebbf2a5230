//! Purpose: Define the row type stored by collections and the id it is addressed by.
//! Exports: `Record`, `RecordId`, `ID_FIELD`.
//! Role: Owned field map with shallow-merge and id helpers; values are plain JSON.
//! Invariants: A stored record always carries a non-null `id` field.
//! Invariants: Lookups coerce all-digit string ids to integers before comparison.
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::{Error, ErrorKind};

pub const ID_FIELD: &str = "id";

#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl RecordId {
    /// Reads an id out of a JSON value. Only integers (including integral
    /// floats) and strings qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(num) => {
                if let Some(n) = num.as_i64() {
                    return Some(Self::Int(n));
                }
                let f = num.as_f64()?;
                let in_range = f >= i64::MIN as f64 && f <= i64::MAX as f64;
                (f.is_finite() && f.fract() == 0.0 && in_range).then(|| Self::Int(f as i64))
            }
            Value::String(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(n) => Value::from(*n),
            Self::Str(s) => Value::from(s.as_str()),
        }
    }

    /// Lookup form of the id: `"12"` becomes `12`, anything else is unchanged.
    pub fn coerced(&self) -> Self {
        match self {
            Self::Str(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => s
                .parse::<i64>()
                .map(Self::Int)
                .unwrap_or_else(|_| self.clone()),
            other => other.clone(),
        }
    }

    /// Strict comparison against a stored `id` value; callers coerce first.
    pub(crate) fn matches_value(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Int(n), Value::Number(num)) => match num.as_i64() {
                Some(stored) => stored == *n,
                None => num.as_f64() == Some(*n as f64),
            },
            (Self::Str(s), Value::String(stored)) => stored == s,
            _ => false,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for RecordId {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for RecordId {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Accepts a JSON object; any other shape is a usage error.
    pub fn from_json(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::new(ErrorKind::Usage)
                .with_message("record must be a JSON object")
                .with_hint(format!("Got {}; wrap fields in {{...}}.", json_kind(&other)))),
        }
    }

    pub fn id(&self) -> Option<RecordId> {
        self.0.get(ID_FIELD).and_then(RecordId::from_value)
    }

    pub fn has_id(&self) -> bool {
        !matches!(self.0.get(ID_FIELD), None | Some(Value::Null))
    }

    pub fn set_id(&mut self, id: impl Into<RecordId>) {
        self.0.insert(ID_FIELD.to_string(), id.into().to_value());
    }

    pub(crate) fn has_matching_id(&self, id: &RecordId) -> bool {
        self.0
            .get(ID_FIELD)
            .is_some_and(|stored| id.matches_value(stored))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Shallow merge: every field of `attrs` overwrites the same field here.
    pub fn assign(&mut self, attrs: &Record) {
        for (field, value) in attrs.0.iter() {
            self.0.insert(field.clone(), value.clone());
        }
    }

    /// Deep value equality where `1` and `1.0` are the same number.
    pub fn same_values(&self, other: &Record) -> bool {
        maps_equal(&self.0, &other.0)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

impl TryFrom<Value> for Record {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(value)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x == y || matches!((x.as_f64(), y.as_f64()), (Some(l), Some(r)) if l == r)
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => maps_equal(xs, ys),
        _ => a == b,
    }
}

fn maps_equal(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(field, x)| b.get(field).is_some_and(|y| values_equal(x, y)))
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::{Record, RecordId};
    use serde_json::json;

    #[test]
    fn digit_strings_coerce_to_integers() {
        assert_eq!(RecordId::from("42").coerced(), RecordId::Int(42));
        assert_eq!(RecordId::from("007").coerced(), RecordId::Int(7));
        assert_eq!(RecordId::from("4a").coerced(), RecordId::from("4a"));
        assert_eq!(RecordId::from("-4").coerced(), RecordId::from("-4"));
        assert_eq!(RecordId::from("").coerced(), RecordId::from(""));
        // Too large for i64: stays a string.
        let huge = "99999999999999999999";
        assert_eq!(RecordId::from(huge).coerced(), RecordId::from(huge));
    }

    #[test]
    fn id_values_accept_integral_numbers_and_strings() {
        assert_eq!(RecordId::from_value(&json!(3)), Some(RecordId::Int(3)));
        assert_eq!(RecordId::from_value(&json!(3.0)), Some(RecordId::Int(3)));
        assert_eq!(RecordId::from_value(&json!("x")), Some(RecordId::from("x")));
        assert_eq!(RecordId::from_value(&json!(3.5)), None);
        assert_eq!(RecordId::from_value(&json!(true)), None);
        assert_eq!(RecordId::from_value(&json!(null)), None);
    }

    #[test]
    fn integer_ids_do_not_match_string_ids() {
        let record = Record::from_json(json!({"id": "5"})).unwrap();
        assert!(!record.has_matching_id(&RecordId::Int(5)));
        assert!(record.has_matching_id(&RecordId::from("5")));
    }

    #[test]
    fn null_id_counts_as_missing() {
        let record = Record::from_json(json!({"id": null, "name": "a"})).unwrap();
        assert!(!record.has_id());
        assert_eq!(record.id(), None);
    }

    #[test]
    fn assign_overwrites_and_adds_fields() {
        let mut record = Record::from_json(json!({"id": 1, "name": "a", "age": 3})).unwrap();
        let attrs = Record::from_json(json!({"name": "b", "flag": true})).unwrap();
        record.assign(&attrs);
        assert_eq!(
            record.into_value(),
            json!({"id": 1, "name": "b", "age": 3, "flag": true})
        );
    }

    #[test]
    fn same_values_normalizes_number_representation() {
        let int = Record::from_json(json!({"n": 1, "tags": [2], "meta": {"w": 3}})).unwrap();
        let float = Record::from_json(json!({"n": 1.0, "tags": [2.0], "meta": {"w": 3.0}})).unwrap();
        assert!(int.same_values(&float));
        assert_ne!(int, float);

        let other = Record::from_json(json!({"n": 1.5, "tags": [2], "meta": {"w": 3}})).unwrap();
        assert!(!int.same_values(&other));
        let extra = Record::from_json(json!({"n": 1, "tags": [2], "meta": {"w": 3}, "x": null})).unwrap();
        assert!(!int.same_values(&extra));
    }

    #[test]
    fn non_object_is_rejected() {
        let err = Record::from_json(json!([1, 2])).unwrap_err();
        assert_eq!(err.kind(), crate::core::error::ErrorKind::Usage);
        assert!(err.hint().unwrap().contains("an array"));
    }
}
