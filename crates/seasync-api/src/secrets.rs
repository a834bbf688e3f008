//! Secret storage over the OS credential store
//!
//! Two kinds of entries under the `seasync` service:
//! - `account`: the JSON-serialized [`Account`]
//! - `library:<library_id>`: the UTF-8 password of an encrypted library
//!
//! Absent entries are `Ok(None)`, never errors.

use anyhow::{Context, Result};
use tracing::{debug, info};

use seasync_core::domain::newtypes::LibraryId;
use seasync_core::domain::Account;
use seasync_core::ports::ISecretStore;

/// Keyring service name
const KEYRING_SERVICE: &str = "seasync";

/// Keyring entry name for the account
const ACCOUNT_ENTRY: &str = "account";

/// Secret store backed by the system keyring
///
/// Uses the `keyring` crate to store secrets in the OS credential store
/// (GNOME Keyring, KDE Wallet, macOS Keychain, Windows Credential Manager).
#[derive(Debug, Clone, Default)]
pub struct KeyringSecretStore;

impl KeyringSecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn entry(name: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(KEYRING_SERVICE, name).context("Failed to create keyring entry")
    }

    fn library_entry_name(library_id: &LibraryId) -> String {
        format!("library:{}", library_id.as_str())
    }

    fn load(name: &str) -> Result<Option<String>> {
        match Self::entry(name)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    fn delete(name: &str) -> Result<()> {
        match Self::entry(name)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete keyring entry")),
        }
    }
}

impl ISecretStore for KeyringSecretStore {
    fn save_account(&self, account: &Account) -> Result<()> {
        let json = serde_json::to_string(account).context("Failed to serialize account")?;
        Self::entry(ACCOUNT_ENTRY)?
            .set_password(&json)
            .context("Failed to store account in keyring")?;
        info!(username = %account.username(), "Stored account in keyring");
        Ok(())
    }

    fn load_account(&self) -> Result<Option<Account>> {
        match Self::load(ACCOUNT_ENTRY)? {
            Some(json) => {
                let account: Account = serde_json::from_str(&json)
                    .context("Failed to deserialize account from keyring")?;
                debug!(username = %account.username(), "Loaded account from keyring");
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    fn delete_account(&self) -> Result<()> {
        Self::delete(ACCOUNT_ENTRY)?;
        info!("Removed account from keyring");
        Ok(())
    }

    fn save_library_password(&self, library_id: &LibraryId, password: &str) -> Result<()> {
        Self::entry(&Self::library_entry_name(library_id))?
            .set_password(password)
            .context("Failed to store library password in keyring")?;
        debug!(library_id = %library_id, "Stored library password");
        Ok(())
    }

    fn load_library_password(&self, library_id: &LibraryId) -> Result<Option<String>> {
        Self::load(&Self::library_entry_name(library_id))
    }

    fn delete_library_password(&self, library_id: &LibraryId) -> Result<()> {
        Self::delete(&Self::library_entry_name(library_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_entry_name() {
        let id = LibraryId::new("lib-42".to_string()).unwrap();
        assert_eq!(
            KeyringSecretStore::library_entry_name(&id),
            "library:lib-42"
        );
    }
}
