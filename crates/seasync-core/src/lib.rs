//! SeaSync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - Domain entities (Account, Library, RemoteEntry, SyncState, SyncAction)
//! - Port definitions (traits for adapters)
//! - Configuration loading and validation

pub mod config;
pub mod domain;
pub mod ports;
