//! Three-way reconciliation (C4)
//!
//! Pure planning: `(remote tree, local tree, baseline) -> ordered actions`.
//! The baseline is the last agreed state; a path missing on one side that is
//! present in the baseline and present on the other side is unambiguously a
//! deletion to propagate. Without the baseline, "new on one side" and
//! "deleted on the other" are indistinguishable.
//!
//! ## Ordering
//!
//! Within the output: `CreateDirectory` top-down by depth, then `Download`
//! (listing order), then `Upload` parents-first, then `DeleteRemote`
//! children-first, then `DeleteLocal` children-first. Each action's
//! precondition (parent exists, children removed) therefore holds at
//! execution time.

use std::collections::{HashMap, HashSet};

use seasync_core::domain::entry::LocalTree;
use seasync_core::domain::newtypes::{RemotePath, SyncPath};
use seasync_core::domain::{RemoteEntry, SyncAction, SyncedFile};

/// Produces the ordered action plan for one library
///
/// `writable` is false for read-only libraries: uploads and remote deletions
/// are suppressed, locally-originated changes are simply not propagated.
pub fn plan(
    remote: &[RemoteEntry],
    local: &LocalTree,
    baseline: &[SyncedFile],
    local_root: &SyncPath,
    writable: bool,
) -> Vec<SyncAction> {
    let remote_by_path: HashMap<&str, &RemoteEntry> = remote
        .iter()
        .filter(|e| !e.path.is_hidden())
        .map(|e| (e.path.as_str(), e))
        .collect();
    let baseline_by_path: HashMap<&str, &SyncedFile> = baseline
        .iter()
        .filter(|b| !b.path.is_hidden())
        .map(|b| (b.path.as_str(), b))
        .collect();

    // Baseline-anchored deletion detection runs first; paths it claims are
    // excluded from the transfer passes below.
    let mut delete_local: Vec<&SyncedFile> = Vec::new();
    let mut delete_remote: Vec<&SyncedFile> = Vec::new();
    for row in baseline_by_path.values() {
        let in_remote = remote_by_path.contains_key(row.path.as_str());
        let in_local = local.contains_key(row.path.as_str());
        match (in_remote, in_local) {
            // Gone from the server, still here: the server deleted it.
            (false, true) => delete_local.push(row),
            // Gone locally, still on the server: the user deleted it.
            (true, false) => delete_remote.push(row),
            // Gone on both sides, or untouched.
            _ => {}
        }
    }
    let deleting_locally: HashSet<&str> =
        delete_local.iter().map(|b| b.path.as_str()).collect();
    let deleting_remotely: HashSet<&str> =
        delete_remote.iter().map(|b| b.path.as_str()).collect();

    // Pass 1: descend the remote listing, collecting mkdirs and downloads.
    let mut mkdirs: Vec<SyncAction> = Vec::new();
    let mut downloads: Vec<SyncAction> = Vec::new();
    for entry in remote {
        if entry.path.is_hidden() {
            continue;
        }
        if deleting_remotely.contains(entry.path.as_str()) {
            continue;
        }

        let local_entry = local.get(entry.path.as_str());

        if entry.is_dir {
            match local_entry {
                None => mkdirs.push(SyncAction::CreateDirectory {
                    local: local_root.join_remote(&entry.path),
                }),
                // A local file shadowing a remote directory: the remote side
                // replaced the file with a directory, so the local file
                // yields. The executor clears the file before creating.
                Some(l) if !l.is_dir => mkdirs.push(SyncAction::CreateDirectory {
                    local: local_root.join_remote(&entry.path),
                }),
                Some(_) => {}
            }
            continue;
        }

        let wanted = match local_entry {
            None => true,
            // A local directory shadowing a remote file: the remote side
            // replaced the directory with a file. The atomic write clears
            // the directory before renaming the content in.
            Some(l) if l.is_dir => true,
            Some(l) => {
                l.mtime < entry.mtime
                    || (l.mtime == entry.mtime
                        && baseline_by_path
                            .get(entry.path.as_str())
                            .map(|b| !b.is_dir && b.object_id != entry.object_id)
                            .unwrap_or(false))
            }
        };
        if wanted {
            downloads.push(SyncAction::Download {
                remote: entry.path.clone(),
                local: local_root.join_remote(&entry.path),
            });
        }
    }

    // Parents before children; the recursive listing already yields parents
    // first, the sort makes the guarantee explicit.
    mkdirs.sort_by_key(|a| match a {
        SyncAction::CreateDirectory { local } => local.as_path().components().count(),
        _ => 0,
    });

    // Pass 2: walk the local tree, collecting uploads.
    let mut uploads: Vec<SyncAction> = Vec::new();
    if writable {
        for (path_str, entry) in local {
            if entry.is_dir {
                // Empty directories are not uploaded; files inside create
                // the chain server-side on demand.
                continue;
            }
            let Ok(path) = RemotePath::new(path_str.clone()) else {
                continue;
            };
            if path.is_hidden() {
                continue;
            }
            if deleting_locally.contains(path.as_str()) {
                continue;
            }

            let wanted = match remote_by_path.get(path.as_str()) {
                None => true,
                Some(r) if !r.is_dir => entry.mtime > r.mtime,
                // Remote directory of the same name; resolved by the
                // directory passes, never by uploading over it.
                Some(_) => false,
            };
            if wanted {
                uploads.push(SyncAction::Upload {
                    local: local_root.join_remote(&path),
                    remote: path,
                });
            }
        }
        uploads.sort_by_key(|a| match a {
            SyncAction::Upload { remote, .. } => remote.depth(),
            _ => 0,
        });
    }

    // Pass 3: deletions, children before parents.
    let mut remote_deletes: Vec<SyncAction> = Vec::new();
    if writable {
        delete_remote.sort_by_key(|b| std::cmp::Reverse(b.path.depth()));
        remote_deletes.extend(delete_remote.into_iter().map(|b| SyncAction::DeleteRemote {
            remote: b.path.clone(),
            is_dir: b.is_dir,
        }));
    }

    delete_local.sort_by_key(|b| std::cmp::Reverse(b.path.depth()));
    let local_deletes: Vec<SyncAction> = delete_local
        .into_iter()
        .map(|b| SyncAction::DeleteLocal {
            local: local_root.join_remote(&b.path),
        })
        .collect();

    let mut actions = mkdirs;
    actions.extend(downloads);
    actions.extend(uploads);
    actions.extend(remote_deletes);
    actions.extend(local_deletes);
    actions
}

// ============================================================================
// Tests
// ============================================================================
