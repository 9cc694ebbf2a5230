//! Purpose: In-memory table of JSON records with insert/find/where/update/remove.
//! Exports: `RecordCollection`.
//! Role: The mock backing store; callers simulate a database without a real backend.
//! Invariants: Every read hands out owned copies; stored records are never exposed by reference.
//! Invariants: Missing ids are assigned `len + 1` at insert time; existing ids are never checked for uniqueness.
//! Invariants: Misses never fail: lookups return `None`/empty and updates/removals no-op.
use serde_json::Value;
use tracing::{debug, trace};

use crate::core::error::{Error, ErrorKind};
use crate::core::query::Query;
use crate::core::record::{Record, RecordId, json_kind};
use crate::core::target::Target;

#[derive(Clone, Debug, Default)]
pub struct RecordCollection {
    name: String,
    records: Vec<Record>,
}

impl RecordCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Vec::new(),
        }
    }

    /// Creates the collection and inserts `seed`, assigning ids as `insert` does.
    pub fn with_records<I>(name: impl Into<String>, seed: I) -> Self
    where
        I: IntoIterator<Item = Record>,
    {
        let mut collection = Self::new(name);
        collection.insert_many(seed);
        collection
    }

    /// Seeds from JSON: an object, an array of objects, or null for an empty collection.
    pub fn from_value(name: impl Into<String>, seed: Value) -> Result<Self, Error> {
        let mut collection = Self::new(name);
        if !seed.is_null() {
            collection.insert_value(seed)?;
        }
        Ok(collection)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn all(&self) -> Vec<Record> {
        self.records.clone()
    }

    pub fn insert(&mut self, record: Record) -> Record {
        let mut record = record;
        if !record.has_id() {
            record.set_id(self.records.len() + 1);
        }
        debug!(collection = %self.name, id = ?record.id(), "insert record");
        self.records.push(record.clone());
        record
    }

    pub fn insert_many<I>(&mut self, records: I) -> Vec<Record>
    where
        I: IntoIterator<Item = Record>,
    {
        records
            .into_iter()
            .map(|record| self.insert(record))
            .collect()
    }

    /// JSON entry point for `insert`: an object yields an object, an array yields
    /// an array, and null inserts an empty record. Shapes are validated before
    /// anything is stored.
    pub fn insert_value(&mut self, data: Value) -> Result<Value, Error> {
        match data {
            Value::Null => Ok(self.insert(Record::new()).into_value()),
            Value::Object(map) => Ok(self.insert(Record::from(map)).into_value()),
            Value::Array(items) => {
                let records = items
                    .into_iter()
                    .enumerate()
                    .map(|(idx, item)| {
                        Record::from_json(item).map_err(|err| {
                            err.with_collection(self.name.clone()).with_hint(format!(
                                "Element {idx} of the inserted array is not an object."
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let inserted = self.insert_many(records);
                Ok(Value::Array(inserted.into_iter().map(Value::from).collect()))
            }
            other => Err(Error::new(ErrorKind::Usage)
                .with_message("insert expects an object or an array of objects")
                .with_hint(format!("Got {}.", json_kind(&other)))
                .with_collection(self.name.clone())),
        }
    }

    pub fn find(&self, id: impl Into<RecordId>) -> Option<Record> {
        let id = id.into();
        let found = self.position_of(&id).map(|idx| self.records[idx].clone());
        trace!(collection = %self.name, %id, hit = found.is_some(), "find record");
        found
    }

    /// Copies of the matches, in the order the ids were given; misses are omitted.
    pub fn find_many<I>(&self, ids: I) -> Vec<Record>
    where
        I: IntoIterator,
        I::Item: Into<RecordId>,
    {
        let ids: Vec<RecordId> = ids.into_iter().map(Into::into).collect();
        self.positions_of(&ids)
            .into_iter()
            .flatten()
            .map(|idx| self.records[idx].clone())
            .collect()
    }

    pub fn find_where(&self, query: &Query) -> Vec<Record> {
        self.positions_where(query)
            .into_iter()
            .map(|idx| self.records[idx].clone())
            .collect()
    }

    /// First match of `query`, or a freshly inserted `defaults` merged with `query`
    /// (query fields win).
    pub fn first_or_create(&mut self, query: &Record, defaults: &Record) -> Record {
        let existing = self
            .positions_where(&Query::Fields(query.clone()))
            .first()
            .map(|&idx| self.records[idx].clone());
        if let Some(record) = existing {
            return record;
        }

        let mut attrs = defaults.clone();
        attrs.assign(query);
        self.insert(attrs)
    }

    /// Shallow-merges `attrs` into the targeted records and returns them as they
    /// are after the merge. `Target::All` returns only the records whose value
    /// actually changed.
    pub fn update(&mut self, target: impl Into<Target>, attrs: &Record) -> Vec<Record> {
        let positions: Vec<usize> = match target.into() {
            Target::All => return self.update_all(attrs),
            Target::Id(id) => self.position_of(&id).into_iter().collect(),
            Target::Ids(ids) => self.positions_of(&ids).into_iter().flatten().collect(),
            Target::Where(query) => self.positions_where(&query),
        };

        let updated: Vec<Record> = positions
            .into_iter()
            .map(|idx| {
                let record = &mut self.records[idx];
                record.assign(attrs);
                record.clone()
            })
            .collect();
        debug!(collection = %self.name, updated = updated.len(), "update records");
        updated
    }

    pub fn update_id(&mut self, id: impl Into<RecordId>, attrs: &Record) -> Option<Record> {
        self.update(Target::Id(id.into()), attrs).into_iter().next()
    }

    pub fn update_all(&mut self, attrs: &Record) -> Vec<Record> {
        let mut changed = Vec::new();
        for record in self.records.iter_mut() {
            let before = record.clone();
            record.assign(attrs);
            if !record.same_values(&before) {
                changed.push(record.clone());
            }
        }
        debug!(
            collection = %self.name,
            total = self.records.len(),
            changed = changed.len(),
            "update all records"
        );
        changed
    }

    /// Removes the targeted records and returns how many went away.
    pub fn remove(&mut self, target: impl Into<Target>) -> usize {
        let before = self.records.len();
        let mut positions: Vec<usize> = match target.into() {
            Target::All => {
                self.records.clear();
                debug!(collection = %self.name, removed = before, "clear collection");
                return before;
            }
            Target::Id(id) => self.position_of(&id).into_iter().collect(),
            Target::Ids(ids) => self.positions_of(&ids).into_iter().flatten().collect(),
            Target::Where(query) => self.positions_where(&query),
        };

        // Descending so earlier indices stay valid; repeated ids collapse.
        positions.sort_unstable_by(|a, b| b.cmp(a));
        positions.dedup();
        for idx in positions {
            self.records.remove(idx);
        }

        let removed = before - self.records.len();
        debug!(collection = %self.name, removed, "remove records");
        removed
    }

    pub fn clear(&mut self) {
        self.remove(Target::All);
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.records.iter().map(Record::to_value).collect())
    }

    fn position_of(&self, id: &RecordId) -> Option<usize> {
        let id = id.coerced();
        self.records
            .iter()
            .position(|record| record.has_matching_id(&id))
    }

    fn positions_of(&self, ids: &[RecordId]) -> Vec<Option<usize>> {
        ids.iter().map(|id| self.position_of(id)).collect()
    }

    fn positions_where(&self, query: &Query) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, record)| query.matches(record))
            .map(|(idx, _)| idx)
            .collect()
    }
}
