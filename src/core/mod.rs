// Core modules implementing records, queries, collections, and error modeling.
pub mod collection;
pub mod db;
pub mod error;
pub mod expr;
pub mod query;
pub mod record;
pub mod target;
