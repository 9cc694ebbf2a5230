//! Purpose: Hold top-level CLI command dispatch for `fixturedb`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every command loads the fixture fresh; state never outlives the process.
//! Invariants: Output envelopes are plain JSON values on stdout.

use super::*;

use fixturedb::api::{Query, Record, apply, parse_script};

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "fixturedb", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Show {
            fixture,
            collection,
        } => {
            let db = read_fixture(&fixture)?;
            match collection {
                Some(name) => emit_json(db.require(&name)?.to_value()),
                None => emit_json(db.dump()),
            }
            Ok(RunOutcome::ok())
        }
        Command::Find {
            fixture,
            collection,
            ids,
        } => {
            let db = read_fixture(&fixture)?;
            let records = db.require(&collection)?;
            let found = match ids.as_slice() {
                [id] => records
                    .find(id.as_str())
                    .map(Value::from)
                    .unwrap_or(Value::Null),
                _ => records_json(records.find_many(ids.iter().map(String::as_str))),
            };
            emit_json(found);
            Ok(RunOutcome::ok())
        }
        Command::Where {
            fixture,
            collection,
            fields,
            expr,
        } => {
            if fields.is_empty() && expr.is_none() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("where needs --field or --expr")
                    .with_hint("Example: fixturedb where fx.json users --field type=admin"));
            }
            let field_query = Query::Fields(parse_field_args(&fields)?);
            let expr_query = expr.as_deref().map(Query::expr).transpose()?;

            let db = read_fixture(&fixture)?;
            let matched = db
                .require(&collection)?
                .find_where(&field_query)
                .into_iter()
                .filter(|record| expr_query.as_ref().is_none_or(|q| q.matches(record)))
                .collect::<Vec<_>>();
            emit_json(records_json(matched));
            Ok(RunOutcome::ok())
        }
        Command::Apply {
            fixture,
            script,
            no_state,
        } => {
            let mut db = read_fixture(&fixture)?;
            let text = read_script_text(&script)?;
            let context = if script == "-" { "stdin" } else { script.as_str() };
            let ops = parse_script(&text, context)?;
            let results = apply(&mut db, &ops)?;
            let output = if no_state {
                json!({ "results": results })
            } else {
                json!({ "results": results, "state": db.dump() })
            };
            emit_json(output);
            Ok(RunOutcome::ok())
        }
    }
}

fn parse_field_args(fields: &[String]) -> Result<Record, Error> {
    fields
        .iter()
        .map(|arg| match arg.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key, value)),
            _ => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("invalid --field `{arg}`"))
                .with_hint("Use KEY=VALUE, e.g. --field type=admin.")),
        })
        .collect()
}

fn records_json(records: Vec<Record>) -> Value {
    Value::Array(records.into_iter().map(Value::from).collect())
}

#[cfg(test)]
mod tests {
    use super::parse_field_args;
    use serde_json::json;

    #[test]
    fn field_args_split_on_first_equals() {
        let record = parse_field_args(&["a=1".to_string(), "b=x=y".to_string()]).unwrap();
        assert_eq!(record.into_value(), json!({"a": "1", "b": "x=y"}));
    }

    #[test]
    fn field_args_need_a_key() {
        assert!(parse_field_args(&["=1".to_string()]).is_err());
        assert!(parse_field_args(&["novalue".to_string()]).is_err());
    }
}
