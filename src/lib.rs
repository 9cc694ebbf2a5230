//! Purpose: In-memory mock record collections for tests that need a fake database.
//! Exports: `api` (stable surface), `core` (records, queries, collections, errors).
//! Role: Library backing the `fixturedb` CLI and embedders that seed fixtures in tests.
//! Invariants: Collections never hand out references to stored records.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
mod json;
