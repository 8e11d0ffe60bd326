//! Persistence for recorded log events.
//!
//! The wire format is JSON Lines: one event per line, appendable and
//! streamable without loading the whole file.

pub mod jsonl;

pub use jsonl::{EventRecord, JsonlEventLog, MarkerRecord};
