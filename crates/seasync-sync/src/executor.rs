//! Action executor (C5)
//!
//! Runs a planned action list in order against the remote provider and the
//! local filesystem. A single action's failure is captured and reported; the
//! cycle continues with the next action.
//!
//! Failures of materializing actions (downloads, local mkdirs) are reported
//! back by remote path so the orchestrator can exclude them from the baseline
//! it persists. Leaving them in would convert a transient local failure into
//! a remote deletion on the next cycle.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use seasync_core::domain::newtypes::{RemotePath, SyncPath};
use seasync_core::domain::{Library, RemoteEntry, SyncAction, SyncErrorRecord};
use seasync_core::ports::{ILibraryProvider, ILocalFileSystem};

/// Outcome of executing one library's plan
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub downloaded: u32,
    pub uploaded: u32,
    pub deleted: u32,
    /// Per-action error records, in execution order
    pub errors: Vec<SyncErrorRecord>,
    /// Remote paths of failed downloads and directory creations; these are
    /// dropped from the persisted baseline
    pub failed_materializations: HashSet<String>,
}

impl ExecutionReport {
    pub fn had_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Executes planned actions one at a time
pub struct ActionExecutor {
    provider: Arc<dyn ILibraryProvider>,
    filesystem: Arc<dyn ILocalFileSystem>,
}

impl ActionExecutor {
    pub fn new(
        provider: Arc<dyn ILibraryProvider>,
        filesystem: Arc<dyn ILocalFileSystem>,
    ) -> Self {
        Self {
            provider,
            filesystem,
        }
    }

    /// Runs the plan in order, capturing per-action errors
    ///
    /// `remote` is the cycle-start listing; it supplies the mtimes stamped
    /// onto downloaded files.
    pub async fn execute(
        &self,
        library: &Library,
        local_root: &SyncPath,
        actions: &[SyncAction],
        remote: &[RemoteEntry],
    ) -> ExecutionReport {
        let remote_mtimes: HashMap<&str, i64> = remote
            .iter()
            .map(|e| (e.path.as_str(), e.mtime))
            .collect();

        let mut report = ExecutionReport::default();

        for action in actions {
            debug!(library = %library.name, verb = action.verb(), "executing action");

            let result = match action {
                SyncAction::CreateDirectory { local } => self.create_directory(local).await,
                SyncAction::Download { remote, local } => {
                    let mtime = remote_mtimes.get(remote.as_str()).copied();
                    self.download(library, remote, local, mtime).await
                }
                SyncAction::Upload { local, remote } => self.upload(library, local, remote).await,
                SyncAction::DeleteRemote { remote, is_dir } => {
                    self.delete_remote(library, remote, *is_dir).await
                }
                SyncAction::DeleteLocal { local } => self
                    .filesystem
                    .delete_file(local)
                    .await
                    .context("Failed to delete local path"),
                SyncAction::Conflict { remote } => {
                    // Unreachable under last-modified-wins.
                    warn!(path = %remote, "conflict action reached executor");
                    Ok(())
                }
            };

            match result {
                Ok(()) => match action {
                    SyncAction::Download { .. } => report.downloaded += 1,
                    SyncAction::Upload { .. } => report.uploaded += 1,
                    SyncAction::DeleteRemote { .. } | SyncAction::DeleteLocal { .. } => {
                        report.deleted += 1
                    }
                    _ => {}
                },
                Err(err) => {
                    let message = format!("{err:#}");
                    warn!(
                        library = %library.name,
                        verb = action.verb(),
                        error = %message,
                        "action failed"
                    );

                    let path_for_record = action
                        .remote_path()
                        .map(|p| p.as_str().to_string())
                        .or_else(|| local_action_path(action, local_root));

                    let mut record =
                        SyncErrorRecord::new(message).with_library(library.name.clone());
                    if let Some(ref p) = path_for_record {
                        record = record.with_path(p.clone());
                    }
                    report.errors.push(record);

                    // Only failed materializations poison the baseline; a
                    // failed remote delete keeps its row so the deletion is
                    // retried instead of the file being re-downloaded.
                    match action {
                        SyncAction::Download { remote, .. } => {
                            report
                                .failed_materializations
                                .insert(remote.as_str().to_string());
                        }
                        SyncAction::CreateDirectory { .. } => {
                            if let Some(p) = path_for_record {
                                report.failed_materializations.insert(p);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        report
    }

    async fn create_directory(&self, local: &SyncPath) -> Result<()> {
        // A regular file occupying the path loses to the incoming directory
        // (delete-before-create for type flips).
        let state = self
            .filesystem
            .get_state(local)
            .await
            .context("Failed to stat mkdir target")?;
        if state.is_regular_file() {
            self.filesystem
                .delete_file(local)
                .await
                .context("Failed to clear file occupying directory path")?;
        }
        self.filesystem
            .create_directory(local)
            .await
            .context("Failed to create local directory")
    }

    async fn download(
        &self,
        library: &Library,
        remote: &RemotePath,
        local: &SyncPath,
        mtime: Option<i64>,
    ) -> Result<()> {
        let data = self.provider.download(&library.id, remote).await?;

        self.filesystem
            .write_file(local, &data)
            .await
            .context("Failed to write downloaded file")?;

        // Stamp the remote mtime so the next cycle sees both sides agreeing.
        if let Some(mtime) = mtime {
            self.filesystem
                .set_mtime(local, mtime)
                .await
                .context("Failed to set downloaded file mtime")?;
        }

        Ok(())
    }

    async fn upload(
        &self,
        library: &Library,
        local: &SyncPath,
        remote: &RemotePath,
    ) -> Result<()> {
        let data = self
            .filesystem
            .read_file(local)
            .await
            .context("Failed to read local file for upload")?;

        let name = remote
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Upload path has no file name: {remote}"))?
            .to_string();
        let parent = remote.parent().unwrap_or_else(RemotePath::root);

        self.provider
            .upload(&library.id, &parent, &name, &data)
            .await
    }

    async fn delete_remote(
        &self,
        library: &Library,
        remote: &RemotePath,
        is_dir: bool,
    ) -> Result<()> {
        if is_dir {
            self.provider.delete_directory(&library.id, remote).await
        } else {
            self.provider.delete_file(&library.id, remote).await
        }
    }
}

/// Maps a local-only action back to its remote path string for records
fn local_action_path(action: &SyncAction, local_root: &SyncPath) -> Option<String> {
    let local = match action {
        SyncAction::CreateDirectory { local } | SyncAction::DeleteLocal { local } => local,
        _ => return None,
    };
    let rel = local.relative_to(local_root).ok()?;
    Some(format!("/{}", rel.display()))
}
