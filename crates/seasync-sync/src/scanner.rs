//! Local directory scanner (C2)
//!
//! Walks a library's local subtree and produces the `LocalTree` snapshot the
//! reconciler compares against the remote listing.
//!
//! ## Contract
//!
//! - Keys are `"/" + path_relative_to_root` with POSIX separators.
//! - Hidden entries (any segment with a leading dot) are excluded.
//! - Symlinks are never recursed into; they are reported as files with the
//!   link target's mtime when resolvable.
//! - mtime is integer seconds since epoch, floored.
//! - An absent root yields an empty map, not an error; the orchestrator
//!   ensures the root exists before scanning.

use std::path::Path;
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use seasync_core::domain::entry::{LocalEntry, LocalTree};
use seasync_core::domain::newtypes::SyncPath;

/// Scans a local subtree into a map of relative path to entry
#[instrument(skip(root), fields(root = %root))]
pub async fn scan(root: &SyncPath) -> Result<LocalTree> {
    let mut tree = LocalTree::new();

    match tokio::fs::metadata(root.as_path()).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            warn!("scan root is not a directory");
            return Ok(tree);
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("scan root absent, returning empty tree");
            return Ok(tree);
        }
        Err(e) => return Err(e).context("Failed to stat scan root"),
    }

    walk(root.as_path(), "", &mut tree).await?;
    debug!(entries = tree.len(), "scan complete");
    Ok(tree)
}

fn walk<'a>(
    dir: &'a Path,
    prefix: &'a str,
    tree: &'a mut LocalTree,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let name = match entry.file_name().into_string() {
                Ok(n) => n,
                Err(os) => {
                    warn!(name = ?os, "Skipping entry with non-UTF-8 name");
                    continue;
                }
            };

            if name.starts_with('.') {
                continue;
            }

            let rel = format!("{prefix}/{name}");

            // symlink_metadata so links are classified without following;
            // a symlinked directory is treated as a file, never recursed.
            let symlink_meta = tokio::fs::symlink_metadata(entry.path()).await?;
            let is_symlink = symlink_meta.file_type().is_symlink();
            let is_dir = !is_symlink && symlink_meta.is_dir();

            let mtime_meta = if is_symlink {
                // Follow the link for its target's mtime; a broken link
                // falls back to the link's own metadata.
                tokio::fs::metadata(entry.path()).await.unwrap_or(symlink_meta)
            } else {
                symlink_meta
            };

            let mtime = mtime_meta
                .modified()
                .ok()
                .and_then(|st| st.duration_since(UNIX_EPOCH).ok())
                .map(|dur| dur.as_secs() as i64)
                .unwrap_or(0);

            tree.insert(rel.clone(), LocalEntry { mtime, is_dir });

            if is_dir {
                walk(&entry.path(), &rel, tree).await?;
            }
        }

        Ok(())
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn root(dir: &TempDir) -> SyncPath {
        SyncPath::new(dir.path().to_path_buf()).unwrap()
    }

    #[tokio::test]
    async fn test_scan_absent_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let missing = SyncPath::new(dir.path().join("nope")).unwrap();
        let tree = scan(&missing).await.unwrap();
        assert!(tree.is_empty());
    }

    #[tokio::test]
    async fn test_scan_empty_root() {
        let dir = TempDir::new().unwrap();
        let tree = scan(&root(&dir).await).await.unwrap();
        assert!(tree.is_empty());
    }

    #[tokio::test]
    async fn test_scan_keys_have_leading_slash() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/a.txt"), b"hi").unwrap();

        let tree = scan(&root(&dir).await).await.unwrap();
        assert_eq!(tree.len(), 2);
        assert!(tree.contains_key("/docs"));
        assert!(tree.contains_key("/docs/a.txt"));

        let docs = tree.get("/docs").unwrap();
        assert!(docs.is_dir);
        let a = tree.get("/docs/a.txt").unwrap();
        assert!(!a.is_dir);
        assert!(a.mtime > 0);
    }

    #[tokio::test]
    async fn test_scan_excludes_hidden_entries() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".hidden"), b"x").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/config"), b"x").unwrap();
        std::fs::write(dir.path().join("visible.txt"), b"x").unwrap();

        let tree = scan(&root(&dir).await).await.unwrap();
        let keys: Vec<&str> = tree.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["/visible.txt"]);
    }

    #[tokio::test]
    async fn test_scan_nested_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
        std::fs::write(dir.path().join("a/b/c/deep.txt"), b"x").unwrap();

        let tree = scan(&root(&dir).await).await.unwrap();
        assert!(tree.contains_key("/a"));
        assert!(tree.contains_key("/a/b"));
        assert!(tree.contains_key("/a/b/c"));
        assert!(tree.contains_key("/a/b/c/deep.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_symlinked_directory_not_recursed() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("real")).unwrap();
        std::fs::write(dir.path().join("real/inner.txt"), b"x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();

        let tree = scan(&root(&dir).await).await.unwrap();
        let link = tree.get("/link").expect("link present");
        assert!(!link.is_dir, "symlink treated as file");
        assert!(!tree.contains_key("/link/inner.txt"));
        // The real directory is still walked.
        assert!(tree.contains_key("/real/inner.txt"));
    }
}
