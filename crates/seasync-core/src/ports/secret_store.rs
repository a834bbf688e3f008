//! Secret store port (driven/secondary port)
//!
//! Keyed secret storage for the account and per-library passwords. Backed by
//! the OS credential store in production. Absent entries are `Ok(None)`,
//! never errors.

use crate::domain::newtypes::LibraryId;
use crate::domain::Account;

/// Port trait for secret storage
///
/// Operations are synchronous because OS keyrings expose blocking APIs; the
/// engine only touches secrets at cycle start and on setup/logout.
pub trait ISecretStore: Send + Sync {
    /// Stores the account (serialized by the implementation)
    fn save_account(&self, account: &Account) -> anyhow::Result<()>;

    /// Loads the stored account, or `None` when unconfigured
    fn load_account(&self) -> anyhow::Result<Option<Account>>;

    /// Removes the stored account; absence is not an error
    fn delete_account(&self) -> anyhow::Result<()>;

    /// Stores an encrypted library's password
    fn save_library_password(&self, library_id: &LibraryId, password: &str) -> anyhow::Result<()>;

    /// Loads an encrypted library's password, or `None` when unset
    fn load_library_password(&self, library_id: &LibraryId) -> anyhow::Result<Option<String>>;

    /// Removes a stored library password; absence is not an error
    fn delete_library_password(&self, library_id: &LibraryId) -> anyhow::Result<()>;
}
