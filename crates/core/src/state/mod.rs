//! # State
//!
//! Durable state: the SQLite database behind the memory store, runtime
//! directory helpers, and the per-run Output Archive.

pub mod archive;
pub mod db;
pub mod io;

pub use archive::{ArchiveSummary, ArchivedRun, ArchivedTeam, ManifestTeam, OutputArchive, RunManifest};
pub use db::TeamflowDb;
pub use io::{ensure_runtime_dir, get_runtime_path, write_atomic};
