// Text decoding for fixture files and op scripts; parse failures become usage/corrupt errors.
use serde_json::Value;

use crate::api::ops::Operation;
use crate::core::db::Db;
use crate::core::error::{Error, ErrorKind};
use crate::json::parse;

/// Parses fixture JSON text into a populated `Db`. `context` labels the source
/// (usually the file path) in error hints.
pub fn load_fixtures(text: &str, context: &str) -> Result<Db, Error> {
    let value: Value = parse::from_str(text).map_err(|err| {
        Error::new(ErrorKind::Corrupt)
            .with_message("fixture file is not valid JSON")
            .with_hint(parse::hint_for_error(&err, context))
            .with_source(err)
    })?;
    Db::from_fixtures(value)
}

/// Parses an op script: a JSON array of ops, or a single op object.
pub fn parse_script(text: &str, context: &str) -> Result<Vec<Operation>, Error> {
    let value: Value = parse::from_str(text).map_err(|err| script_error(err, context))?;
    let value = match value {
        Value::Object(_) => Value::Array(vec![value]),
        other => other,
    };
    serde_json::from_value(value).map_err(|err| script_error(err, context))
}

fn script_error(err: serde_json::Error, context: &str) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message(format!("invalid op script: {err}"))
        .with_hint(parse::hint_for_error(&err, context))
        .with_source(err)
}

#[cfg(test)]
mod tests {
    use super::{load_fixtures, parse_script};
    use crate::api::ops::Operation;
    use crate::core::error::ErrorKind;

    #[test]
    fn fixtures_parse_errors_are_corrupt() {
        let err = load_fixtures("{\"users\": [", "fixtures.json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        let hint = err.hint().unwrap();
        assert!(hint.contains("parse category: eof"));
        assert!(hint.contains("context: fixtures.json"));
    }

    #[test]
    fn single_op_object_is_accepted() {
        let ops = parse_script(r#"{"op":"all","collection":"users"}"#, "inline").unwrap();
        assert!(matches!(ops.as_slice(), [Operation::All { .. }]));
    }

    #[test]
    fn unknown_op_is_usage_error() {
        let err = parse_script(r#"[{"op":"truncate","collection":"users"}]"#, "inline").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.hint().unwrap().contains("parse category: data"));
    }
}
