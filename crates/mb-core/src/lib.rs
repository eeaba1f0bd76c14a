//! MoJuBlock Core Library
//!
//! This crate provides the blocklist-matching and site-state engine for the
//! MoJuBlock content blocker. Hosts (browser extension via wasm, the CLI)
//! supply page content, storage and network access; the engine decides.
//!
//! # Architecture
//!
//! The active blocklist is an immutable snapshot that is swapped as a whole
//! on refresh, with keyword patterns compiled once per snapshot. Site state
//! (ignore exemptions, reports) lives in an injected key-value store and is
//! updated by serialized read-modify-write cycles.
//!
//! # Modules
//!
//! - `list`: newline-delimited list parsing
//! - `patterns`: per-entry keyword regex compilation
//! - `blocklist`: snapshot storage, refresh and atomic replace
//! - `ignore`: time-bounded ignore registry
//! - `report`: append-only report log
//! - `matcher`: the block/allow decision
//! - `blocker`: facade over all of the above
//! - `storage`: key-value store abstraction and implementations
//! - `page`, `url`, `clock`, `types`, `error`: supporting types

pub mod blocker;
pub mod blocklist;
pub mod clock;
pub mod error;
pub mod ignore;
pub mod list;
pub mod matcher;
pub mod page;
pub mod patterns;
pub mod report;
pub mod storage;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use blocker::{Blocker, BlockerOptions};
pub use blocklist::{BlocklistStore, CompiledSnapshot, ListFetcher, ListSources, RefreshReport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, FetchError, PatternError, Result, StorageError};
pub use ignore::IgnoreRegistry;
pub use list::parse_list;
pub use matcher::Matcher;
pub use page::PageMetadata;
pub use report::{ReportLog, ReportSink};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use types::{BlockReason, BlocklistSnapshot, IgnoreEntry, PageContent, ReportRecord, Stats, Verdict};
