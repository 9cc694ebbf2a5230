//! Purpose: Internal JSON parsing boundary shared by runtime callsites.
//! Exports: `parse` module with decode helpers used by the CLI and op scripts.
//! Role: Single seam for decoding so callsites avoid ad hoc error mapping.
//! Invariants: Fixture and script decoding goes through this module.
//! Invariants: Helper APIs stay small and deterministic (no hidden global state).

pub(crate) mod parse;
