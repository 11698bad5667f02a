//! Configuration, git-backed note source, sync orchestration, and the query
//! pipeline.

pub mod config;
pub mod query;
pub mod repo;
pub mod sync;

pub use config::{Config, ConfigError};
pub use query::{QueryError, QueryOutcome, QueryPipeline};
pub use repo::{GitNoteSource, NoteSource, RepoError};
pub use sync::{SyncError, SyncOrchestrator, SyncPhase, SyncReport};
