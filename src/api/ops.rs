//! Purpose: Decode and run JSON operation scripts against a `Db`.
//! Exports: `Operation`, `apply`, `apply_one`.
//! Role: Scriptable CRUD surface used by `fixturedb apply` and by tests seeding state.
//! Invariants: Ops run in order; the first failing op stops the run and earlier effects remain.
//! Invariants: Result shapes mirror the collection API (scalar id in, record-or-null out).
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::core::db::Db;
use crate::core::error::{Error, ErrorKind};
use crate::core::query::Query;
use crate::core::record::Record;
use crate::core::target::Target;

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    CreateCollection {
        collection: String,
        #[serde(default)]
        data: Value,
    },
    All {
        collection: String,
    },
    Insert {
        collection: String,
        #[serde(default)]
        data: Value,
    },
    Find {
        collection: String,
        ids: Value,
    },
    Where {
        collection: String,
        #[serde(default)]
        query: Option<Record>,
        #[serde(default)]
        expr: Option<String>,
    },
    FirstOrCreate {
        collection: String,
        query: Record,
        #[serde(default)]
        defaults: Record,
    },
    Update {
        collection: String,
        #[serde(default)]
        target: Option<Value>,
        attrs: Record,
    },
    Remove {
        collection: String,
        #[serde(default)]
        target: Option<Value>,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateCollection { .. } => "create_collection",
            Self::All { .. } => "all",
            Self::Insert { .. } => "insert",
            Self::Find { .. } => "find",
            Self::Where { .. } => "where",
            Self::FirstOrCreate { .. } => "first_or_create",
            Self::Update { .. } => "update",
            Self::Remove { .. } => "remove",
        }
    }
}

pub fn apply(db: &mut Db, ops: &[Operation]) -> Result<Vec<Value>, Error> {
    let mut results = Vec::with_capacity(ops.len());
    for (idx, op) in ops.iter().enumerate() {
        debug!(index = idx, op = op.name(), "apply op");
        let result = apply_one(db, op).map_err(|err| {
            if err.hint().is_some() {
                err
            } else {
                let hint = format!("Failed at op #{idx} (`{}`).", op.name());
                err.with_hint(hint)
            }
        })?;
        results.push(result);
    }
    Ok(results)
}

pub fn apply_one(db: &mut Db, op: &Operation) -> Result<Value, Error> {
    match op {
        Operation::CreateCollection { collection, data } => {
            let created = db.create_collection(collection, data.clone())?;
            Ok(json!({ "collection": created.name(), "len": created.len() }))
        }
        Operation::All { collection } => Ok(records_json(db.require(collection)?.all())),
        Operation::Insert { collection, data } => db
            .create_collection(collection, Value::Null)?
            .insert_value(data.clone()),
        Operation::Find { collection, ids } => {
            let records = db.require(collection)?;
            match Target::from_json(Some(ids))? {
                Target::Id(id) => Ok(records.find(id).map(Value::from).unwrap_or(Value::Null)),
                Target::Ids(ids) => Ok(records_json(records.find_many(ids))),
                _ => Err(Error::new(ErrorKind::Usage)
                    .with_message("find expects an id or an array of ids")
                    .with_collection(collection.clone())
                    .with_hint("Use `where` to match on fields.")),
            }
        }
        Operation::Where {
            collection,
            query,
            expr,
        } => {
            let query = match (query, expr) {
                (Some(fields), None) => Query::Fields(fields.clone()),
                (None, Some(source)) => Query::expr(source)?,
                _ => {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message("where needs exactly one of `query` or `expr`")
                        .with_collection(collection.clone())
                        .with_hint(r#"Example: {"op":"where","collection":"users","query":{"type":"admin"}}"#));
                }
            };
            Ok(records_json(db.require(collection)?.find_where(&query)))
        }
        Operation::FirstOrCreate {
            collection,
            query,
            defaults,
        } => {
            let records = db.create_collection(collection, Value::Null)?;
            Ok(records.first_or_create(query, defaults).into_value())
        }
        Operation::Update {
            collection,
            target,
            attrs,
        } => {
            let target = Target::from_json(target.as_ref())?;
            let records = db.require_mut(collection)?;
            match target {
                Target::Id(id) => Ok(records
                    .update_id(id, attrs)
                    .map(Value::from)
                    .unwrap_or(Value::Null)),
                other => Ok(records_json(records.update(other, attrs))),
            }
        }
        Operation::Remove { collection, target } => {
            let target = Target::from_json(target.as_ref())?;
            let removed = db.require_mut(collection)?.remove(target);
            Ok(json!({ "removed": removed }))
        }
    }
}

fn records_json(records: Vec<Record>) -> Value {
    Value::Array(records.into_iter().map(Value::from).collect())
}
