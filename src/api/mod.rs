//! Purpose: Define the stable public Rust API boundary for fixturedb.
//! Exports: Core record/collection types, op scripts, and fixture loading.
//! Role: Public, additive-only surface used by the CLI and by test suites embedding the crate.
//! Invariants: Everything a caller needs is reachable from this module.
//! Invariants: Internal decode helpers (`json::parse`) remain private.

mod input;
mod ops;

pub use crate::core::collection::RecordCollection;
pub use crate::core::db::Db;
pub use crate::core::error::{Error, ErrorKind, to_exit_code};
pub use crate::core::expr::WhereExpr;
pub use crate::core::query::{Query, loose_string};
pub use crate::core::record::{ID_FIELD, Record, RecordId};
pub use crate::core::target::Target;
pub use input::{load_fixtures, parse_script};
pub use ops::{Operation, apply, apply_one};
