//! Context Store — per-user conversation history, trimmed and
//! orphan-tool-repaired on read (§4.2).

pub mod store;

pub use store::ContextStore;
