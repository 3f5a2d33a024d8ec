//! Pure domain layer for scoped configuration sync.
//!
//! Nothing in this crate performs I/O. It owns the settings data model,
//! the merge rules, color token translation and the write permission gate.

pub mod color;
pub mod error;
pub mod merge;
pub mod roles;
pub mod scope;
pub mod settings;
pub mod types;
