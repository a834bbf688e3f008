//! Port definitions (traits for adapters)
//!
//! Driven/secondary ports of the hexagonal core. Implementations live in the
//! adapter crates (`seasync-api`, `seasync-store`, `seasync-sync`).

pub mod library_provider;
pub mod local_filesystem;
pub mod secret_store;
pub mod state_store;

pub use library_provider::ILibraryProvider;
pub use local_filesystem::{FileSystemState, ILocalFileSystem};
pub use secret_store::ISecretStore;
pub use state_store::IStateStore;
