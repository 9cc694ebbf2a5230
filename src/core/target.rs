// Selector for `update`/`remove`: everything, one id, several ids, or a query.
use serde_json::Value;

use crate::core::error::{Error, ErrorKind};
use crate::core::query::Query;
use crate::core::record::{Record, RecordId, json_kind};

#[derive(Clone, Debug)]
pub enum Target {
    All,
    Id(RecordId),
    Ids(Vec<RecordId>),
    Where(Query),
}

impl Target {
    /// Dispatch on the JSON shape: absent/null, scalar id, id array, or field map.
    pub fn from_json(value: Option<&Value>) -> Result<Self, Error> {
        match value {
            None | Some(Value::Null) => Ok(Self::All),
            Some(Value::Array(items)) => items
                .iter()
                .map(id_from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Ids),
            Some(Value::Object(map)) => Ok(Self::Where(Query::fields(Record::from(map.clone())))),
            Some(scalar) => id_from_json(scalar).map(Self::Id),
        }
    }
}

fn id_from_json(value: &Value) -> Result<RecordId, Error> {
    RecordId::from_value(value).ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid record id")
            .with_hint(format!(
                "Ids are integers or strings; got {}.",
                json_kind(value)
            ))
    })
}

impl From<RecordId> for Target {
    fn from(id: RecordId) -> Self {
        Self::Id(id)
    }
}

impl From<i64> for Target {
    fn from(id: i64) -> Self {
        Self::Id(id.into())
    }
}

impl From<i32> for Target {
    fn from(id: i32) -> Self {
        Self::Id(id.into())
    }
}

impl From<&str> for Target {
    fn from(id: &str) -> Self {
        Self::Id(id.into())
    }
}

impl From<String> for Target {
    fn from(id: String) -> Self {
        Self::Id(id.into())
    }
}

impl From<Vec<RecordId>> for Target {
    fn from(ids: Vec<RecordId>) -> Self {
        Self::Ids(ids)
    }
}

impl From<Query> for Target {
    fn from(query: Query) -> Self {
        Self::Where(query)
    }
}

impl From<Record> for Target {
    fn from(fields: Record) -> Self {
        Self::Where(Query::Fields(fields))
    }
}
