//! SeaSync Sync - the synchronization engine
//!
//! Per cycle, for each library: list the remote tree, scan the local tree,
//! read the last-synced baseline, reconcile the three into an ordered action
//! plan, execute it, and persist a new baseline. The trigger side (periodic
//! timer, filesystem watcher, manual requests) collapses into at most one
//! in-flight cycle.
//!
//! ## Components
//!
//! - [`scanner`] - local tree snapshots
//! - [`reconciler`] - pure three-way planning
//! - [`executor`] - ordered action execution
//! - [`engine`] - per-cycle orchestration and status publication
//! - [`service`] - configure / trigger / logout facade
//! - [`watcher`] / [`scheduler`] - change detection and cycle triggering
//! - [`filesystem`] - `ILocalFileSystem` adapter over `tokio::fs`

pub mod engine;
pub mod executor;
pub mod filesystem;
pub mod reconciler;
pub mod scanner;
pub mod scheduler;
pub mod service;
pub mod watcher;

pub use engine::{CycleReport, SyncEngine};
pub use service::SyncService;
