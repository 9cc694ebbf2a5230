// Registry of named collections, loadable from and dumpable to fixture JSON.
use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::core::collection::RecordCollection;
use crate::core::error::{Error, ErrorKind};
use crate::core::record::json_kind;

#[derive(Clone, Debug, Default)]
pub struct Db {
    collections: BTreeMap<String, RecordCollection>,
}

impl Db {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a database from a fixture object (`{"users": [...], ...}`).
    pub fn from_fixtures(fixtures: Value) -> Result<Self, Error> {
        let mut db = Self::new();
        db.load_fixtures(fixtures)?;
        Ok(db)
    }

    /// Creates `name` if missing, then inserts `seed` into it. Seeding an
    /// existing collection appends rather than replaces.
    pub fn create_collection(
        &mut self,
        name: &str,
        seed: Value,
    ) -> Result<&mut RecordCollection, Error> {
        let collection = self
            .collections
            .entry(name.to_string())
            .or_insert_with(|| RecordCollection::new(name));
        if !seed.is_null() {
            collection.insert_value(seed)?;
        }
        debug!(collection = name, len = collection.len(), "create collection");
        Ok(collection)
    }

    pub fn load_fixtures(&mut self, fixtures: Value) -> Result<(), Error> {
        let map = match fixtures {
            Value::Object(map) => map,
            other => {
                return Err(Error::new(ErrorKind::Corrupt)
                    .with_message("fixtures must be a JSON object")
                    .with_hint(format!(
                        "Expected {{\"<collection>\": [records...]}}; got {}.",
                        json_kind(&other)
                    )));
            }
        };
        for (name, seed) in map {
            self.create_collection(&name, seed).map_err(|err| {
                Error::new(ErrorKind::Corrupt)
                    .with_message(format!("invalid fixture data for `{name}`"))
                    .with_collection(name.clone())
                    .with_hint(err.hint().unwrap_or("Records must be JSON objects.").to_string())
            })?;
        }
        Ok(())
    }

    pub fn collection(&self, name: &str) -> Option<&RecordCollection> {
        self.collections.get(name)
    }

    pub fn collection_mut(&mut self, name: &str) -> Option<&mut RecordCollection> {
        self.collections.get_mut(name)
    }

    /// Like `collection`, but a miss is a `NotFound` error naming the collection.
    pub fn require(&self, name: &str) -> Result<&RecordCollection, Error> {
        self.collections
            .get(name)
            .ok_or_else(|| unknown_collection(name, self.collections.keys()))
    }

    pub fn require_mut(&mut self, name: &str) -> Result<&mut RecordCollection, Error> {
        // The hint needs the other names, which a live `get_mut` borrow would lock out.
        let known: Vec<String> = self.collections.keys().cloned().collect();
        self.collections
            .get_mut(name)
            .ok_or_else(|| unknown_collection(name, known.iter()))
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn drop_collection(&mut self, name: &str) -> Option<RecordCollection> {
        self.collections.remove(name)
    }

    /// Empties every collection but keeps them registered.
    pub fn empty_data(&mut self) {
        for collection in self.collections.values_mut() {
            collection.clear();
        }
    }

    pub fn dump(&self) -> Value {
        let map: Map<String, Value> = self
            .collections
            .iter()
            .map(|(name, collection)| (name.clone(), collection.to_value()))
            .collect();
        Value::Object(map)
    }
}

fn unknown_collection<'a>(name: &str, known: impl Iterator<Item = &'a String>) -> Error {
    let known = known.map(String::as_str).collect::<Vec<_>>();
    let hint = if known.is_empty() {
        "The database has no collections; load fixtures or insert first.".to_string()
    } else {
        format!("Known collections: {}.", known.join(", "))
    };
    Error::new(ErrorKind::NotFound)
        .with_message("unknown collection")
        .with_collection(name)
        .with_hint(hint)
}

#[cfg(test)]
mod tests {
    use super::Db;
    use crate::core::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn fixtures_round_through_dump() {
        let db = Db::from_fixtures(json!({
            "users": [{"name": "a"}, {"name": "b"}],
            "posts": [{"id": "p1", "title": "t"}]
        }))
        .unwrap();
        assert_eq!(db.collection_names().collect::<Vec<_>>(), vec!["posts", "users"]);
        assert_eq!(
            db.dump(),
            json!({
                "posts": [{"id": "p1", "title": "t"}],
                "users": [{"name": "a", "id": 1}, {"name": "b", "id": 2}]
            })
        );
    }

    #[test]
    fn non_object_fixtures_are_corrupt() {
        let err = Db::from_fixtures(json!([1, 2])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupt);

        let err = Db::from_fixtures(json!({"users": [1]})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert_eq!(err.collection(), Some("users"));
    }

    #[test]
    fn create_collection_appends_to_existing() {
        let mut db = Db::new();
        db.create_collection("users", json!([{"name": "a"}])).unwrap();
        db.create_collection("users", json!({"name": "b"})).unwrap();
        assert_eq!(db.require("users").unwrap().len(), 2);
    }

    #[test]
    fn empty_data_keeps_names() {
        let mut db = Db::from_fixtures(json!({"users": [{"name": "a"}]})).unwrap();
        db.empty_data();
        assert!(db.require("users").unwrap().is_empty());
        assert!(db.drop_collection("users").is_some());
        let err = db.require("users").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.hint().unwrap().contains("no collections"));
    }

    #[test]
    fn require_mut_names_known_collections_on_miss() {
        let mut db = Db::from_fixtures(json!({"users": [], "posts": []})).unwrap();
        db.require_mut("posts").unwrap().insert_value(json!({"t": 1})).unwrap();
        assert_eq!(db.require("posts").unwrap().len(), 1);

        let err = db.require_mut("ghosts").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.collection(), Some("ghosts"));
        assert_eq!(err.hint(), Some("Known collections: posts, users."));
    }
}
