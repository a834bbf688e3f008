//! Seafile wire DTOs
//!
//! Raw response shapes from the web API. The server returns directory
//! listings and the library list as bare JSON arrays (no envelope); link
//! endpoints return a JSON-encoded string with surrounding quotes.

use serde::Deserialize;
use std::str::FromStr;

use seasync_core::domain::newtypes::LibraryId;
use seasync_core::domain::{Library, Permission};

use crate::ApiError;

/// One element of the `GET /api2/repos/` array
#[derive(Debug, Clone, Deserialize)]
pub struct LibraryInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub encrypted: bool,
    pub permission: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub mtime: i64,
}

impl LibraryInfo {
    /// Converts the wire form into the domain entity
    pub fn into_library(self) -> Result<Library, ApiError> {
        let id = LibraryId::new(self.id)
            .map_err(|e| ApiError::InvalidResponse(format!("bad library id: {e}")))?;
        let permission = Permission::from_str(&self.permission)
            .map_err(|e| ApiError::InvalidResponse(format!("bad permission: {e}")))?;
        Ok(Library {
            id,
            name: self.name,
            encrypted: self.encrypted,
            permission,
            size: self.size,
            mtime: self.mtime,
        })
    }
}

/// One element of the `GET /api2/repos/{id}/dir/` array
#[derive(Debug, Clone, Deserialize)]
pub struct DirEntry {
    pub id: String,
    /// `"file"` or `"dir"`
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub mtime: i64,
    #[serde(default)]
    pub size: u64,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == "dir"
    }
}

/// Response from `POST /api2/auth-token/`
#[derive(Debug, Deserialize)]
pub struct AuthTokenResponse {
    pub token: String,
}

/// Strips the surrounding double quotes from a JSON-encoded string body
///
/// The download-link and upload-link endpoints return `"https://..."`
/// including the quotes.
pub fn unquote(body: &str) -> &str {
    body.trim().trim_matches('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_info_deserialization() {
        let json = r#"[
            {"id": "lib-1", "name": "Docs", "encrypted": false,
             "permission": "rw", "size": 1024, "mtime": 1700000000},
            {"id": "lib-2", "name": "Shared", "encrypted": true,
             "permission": "r", "size": 0, "mtime": 0}
        ]"#;
        let infos: Vec<LibraryInfo> = serde_json::from_str(json).unwrap();
        assert_eq!(infos.len(), 2);

        let docs = infos[0].clone().into_library().unwrap();
        assert_eq!(docs.name, "Docs");
        assert_eq!(docs.permission, Permission::ReadWrite);

        let shared = infos[1].clone().into_library().unwrap();
        assert!(shared.encrypted);
        assert!(shared.permission.is_read_only());
    }

    #[test]
    fn test_library_info_rejects_unknown_permission() {
        let info = LibraryInfo {
            id: "lib-1".to_string(),
            name: "Docs".to_string(),
            encrypted: false,
            permission: "admin".to_string(),
            size: 0,
            mtime: 0,
        };
        assert!(matches!(
            info.into_library(),
            Err(ApiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_dir_entry_deserialization() {
        // Bare array, no envelope.
        let json = r#"[
            {"id": "d1", "type": "dir", "name": "sub", "mtime": 100},
            {"id": "f1", "type": "file", "name": "a.txt", "mtime": 101, "size": 7}
        ]"#;
        let entries: Vec<DirEntry> = serde_json::from_str(json).unwrap();
        assert!(entries[0].is_dir());
        assert!(!entries[1].is_dir());
        assert_eq!(entries[1].size, 7);
    }

    #[test]
    fn test_auth_token_response() {
        let resp: AuthTokenResponse =
            serde_json::from_str(r#"{"token": "24fd3c026886e3121b2ca630805ed425c272cb96"}"#)
                .unwrap();
        assert_eq!(resp.token, "24fd3c026886e3121b2ca630805ed425c272cb96");
    }

    #[test]
    fn test_unquote() {
        assert_eq!(
            unquote("\"https://example.com/seafhttp/files/x\""),
            "https://example.com/seafhttp/files/x"
        );
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote(" \"padded\" \n"), "padded");
    }
}
