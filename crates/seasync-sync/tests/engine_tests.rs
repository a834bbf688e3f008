//! Engine integration tests
//!
//! Drive full cycles against a mock remote provider, a real temp-directory
//! filesystem, and an in-memory SQLite state store.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;

use seasync_core::domain::newtypes::{LibraryId, ObjectId, RemotePath, SyncPath};
use seasync_core::domain::{Account, Library, Permission, RemoteEntry, SyncPhase, SyncStatus};
use seasync_core::ports::{ILibraryProvider, ISecretStore, IStateStore};
use seasync_store::{DatabasePool, SqliteStateStore};
use seasync_sync::engine::{StatusPublisher, SyncEngine};
use seasync_sync::filesystem::LocalFileSystemAdapter;

// ============================================================================
// Mock provider
// ============================================================================

#[derive(Default)]
struct MockProvider {
    libraries: Vec<Library>,
    trees: Mutex<HashMap<String, Vec<RemoteEntry>>>,
    content: Mutex<HashMap<String, Vec<u8>>>,
    uploads: Mutex<Vec<String>>,
    remote_deletes: Mutex<Vec<String>>,
    password_calls: Mutex<Vec<String>>,
    list_entry_calls: AtomicU32,
    download_calls: AtomicU32,
    /// When set, uploads fail with a quota error
    fail_uploads: bool,
    /// Artificial latency in list_libraries, for overlap tests
    listing_delay: Option<Duration>,
}

impl MockProvider {
    fn with_library(library: Library) -> Self {
        Self {
            libraries: vec![library],
            ..Self::default()
        }
    }

    fn set_tree(&self, library: &LibraryId, entries: Vec<RemoteEntry>) {
        self.trees
            .lock()
            .unwrap()
            .insert(library.as_str().to_string(), entries);
    }

    fn set_content(&self, path: &str, data: &[u8]) {
        self.content
            .lock()
            .unwrap()
            .insert(path.to_string(), data.to_vec());
    }
}

#[async_trait::async_trait]
impl ILibraryProvider for MockProvider {
    async fn list_libraries(&self) -> Result<Vec<Library>> {
        if let Some(delay) = self.listing_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.libraries.clone())
    }

    async fn set_library_password(&self, library: &LibraryId, _password: &str) -> Result<()> {
        self.password_calls
            .lock()
            .unwrap()
            .push(library.as_str().to_string());
        Ok(())
    }

    async fn list_entries(&self, library: &LibraryId) -> Result<Vec<RemoteEntry>> {
        self.list_entry_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .trees
            .lock()
            .unwrap()
            .get(library.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn download(&self, _library: &LibraryId, path: &RemotePath) -> Result<Vec<u8>> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .content
            .lock()
            .unwrap()
            .get(path.as_str())
            .cloned()
            .unwrap_or_else(|| b"content".to_vec()))
    }

    async fn upload(
        &self,
        _library: &LibraryId,
        parent: &RemotePath,
        name: &str,
        _data: &[u8],
    ) -> Result<()> {
        if self.fail_uploads {
            return Err(seasync_api::ApiError::QuotaExceeded.into());
        }
        let full = if parent.as_str() == "/" {
            format!("/{name}")
        } else {
            format!("{}/{name}", parent.as_str())
        };
        self.uploads.lock().unwrap().push(full);
        Ok(())
    }

    async fn delete_file(&self, _library: &LibraryId, path: &RemotePath) -> Result<()> {
        self.remote_deletes
            .lock()
            .unwrap()
            .push(path.as_str().to_string());
        Ok(())
    }

    async fn delete_directory(&self, _library: &LibraryId, path: &RemotePath) -> Result<()> {
        self.remote_deletes
            .lock()
            .unwrap()
            .push(path.as_str().to_string());
        Ok(())
    }

    async fn make_directory(&self, _library: &LibraryId, _path: &RemotePath) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Mock secret store
// ============================================================================

#[derive(Default)]
struct MockSecretStore {
    passwords: Mutex<HashMap<String, String>>,
}

impl ISecretStore for MockSecretStore {
    fn save_account(&self, _account: &Account) -> Result<()> {
        Ok(())
    }
    fn load_account(&self) -> Result<Option<Account>> {
        Ok(None)
    }
    fn delete_account(&self) -> Result<()> {
        Ok(())
    }
    fn save_library_password(&self, library_id: &LibraryId, password: &str) -> Result<()> {
        self.passwords
            .lock()
            .unwrap()
            .insert(library_id.as_str().to_string(), password.to_string());
        Ok(())
    }
    fn load_library_password(&self, library_id: &LibraryId) -> Result<Option<String>> {
        Ok(self.passwords.lock().unwrap().get(library_id.as_str()).cloned())
    }
    fn delete_library_password(&self, library_id: &LibraryId) -> Result<()> {
        self.passwords.lock().unwrap().remove(library_id.as_str());
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn library(id: &str, name: &str, permission: Permission, encrypted: bool) -> Library {
    Library {
        id: LibraryId::new(id.to_string()).unwrap(),
        name: name.to_string(),
        encrypted,
        permission,
        size: 0,
        mtime: 0,
    }
}

fn remote(path: &str, oid: &str, mtime: i64, size: u64, is_dir: bool) -> RemoteEntry {
    RemoteEntry {
        path: RemotePath::new(path.to_string()).unwrap(),
        object_id: ObjectId::new(oid.to_string()).unwrap(),
        mtime,
        size,
        is_dir,
    }
}

struct Harness {
    _dir: TempDir,
    root: PathBuf,
    provider: Arc<MockProvider>,
    store: Arc<SqliteStateStore>,
    engine: SyncEngine,
    status: StatusPublisher,
}

async fn harness(provider: MockProvider) -> Harness {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_path_buf();
    let pool = DatabasePool::in_memory().await.unwrap();
    let store = Arc::new(SqliteStateStore::new(pool.pool().clone()));
    let provider = Arc::new(provider);
    let (status, _rx) = StatusPublisher::new(SyncStatus {
        is_configured: true,
        ..SyncStatus::default()
    });

    let engine = SyncEngine::new(
        Arc::clone(&provider) as Arc<dyn ILibraryProvider>,
        Arc::clone(&store) as Arc<dyn IStateStore>,
        Arc::new(MockSecretStore::default()),
        Arc::new(LocalFileSystemAdapter::new()),
        SyncPath::new(root.clone()).unwrap(),
        status.clone(),
    );

    Harness {
        _dir: dir,
        root,
        provider,
        store,
        engine,
        status,
    }
}

fn file_mtime(path: &std::path::Path) -> i64 {
    std::fs::metadata(path)
        .unwrap()
        .modified()
        .unwrap()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

// ============================================================================
// Cycles
// ============================================================================

#[tokio::test]
async fn first_run_downloads_remote_tree_and_writes_baseline() {
    let lib = library("lib-1", "Docs", Permission::ReadWrite, false);
    let provider = MockProvider::with_library(lib.clone());
    provider.set_tree(
        &lib.id,
        vec![
            remote("/docs", "d1", 100, 0, true),
            remote("/docs/a.txt", "x", 100, 5, false),
        ],
    );
    provider.set_content("/docs/a.txt", b"hello");

    let h = harness(provider).await;
    let report = h.engine.sync_all().await.unwrap();

    assert_eq!(report.files_downloaded, 1);
    assert!(report.errors.is_empty());

    let target = h.root.join("Docs/docs/a.txt");
    assert_eq!(std::fs::read(&target).unwrap(), b"hello");
    assert_eq!(file_mtime(&target), 100);

    // Baseline equals the flattened remote listing observed at cycle start.
    let state = h.store.get_state(&lib.id).await.unwrap().unwrap();
    let mut paths: Vec<&str> = state.files.iter().map(|f| f.path.as_str()).collect();
    paths.sort_unstable();
    assert_eq!(paths, vec!["/docs", "/docs/a.txt"]);

    let snapshot = h.status.snapshot();
    assert_eq!(snapshot.phase, SyncPhase::Idle);
    assert!(snapshot.last_sync_time.is_some());
    assert_eq!(snapshot.libraries.len(), 1);
}

#[tokio::test]
async fn second_cycle_without_changes_is_a_no_op() {
    let lib = library("lib-1", "Docs", Permission::ReadWrite, false);
    let provider = MockProvider::with_library(lib.clone());
    provider.set_tree(
        &lib.id,
        vec![
            remote("/docs", "d1", 100, 0, true),
            remote("/docs/a.txt", "x", 100, 5, false),
        ],
    );

    let h = harness(provider).await;
    h.engine.sync_all().await.unwrap();
    let downloads_after_first = h.provider.download_calls.load(Ordering::SeqCst);

    let report = h.engine.sync_all().await.unwrap();

    assert_eq!(report.files_downloaded, 0);
    assert_eq!(report.files_uploaded, 0);
    assert_eq!(report.files_deleted, 0);
    assert_eq!(
        h.provider.download_calls.load(Ordering::SeqCst),
        downloads_after_first
    );
}

#[tokio::test]
async fn local_deletion_propagates_to_remote() {
    let lib = library("lib-1", "Docs", Permission::ReadWrite, false);
    let provider = MockProvider::with_library(lib.clone());
    provider.set_tree(
        &lib.id,
        vec![
            remote("/docs", "d1", 100, 0, true),
            remote("/docs/a.txt", "x", 100, 5, false),
        ],
    );

    let h = harness(provider).await;
    h.engine.sync_all().await.unwrap();

    std::fs::remove_file(h.root.join("Docs/docs/a.txt")).unwrap();
    let report = h.engine.sync_all().await.unwrap();

    assert_eq!(report.files_deleted, 1);
    assert_eq!(
        h.provider.remote_deletes.lock().unwrap().as_slice(),
        &["/docs/a.txt".to_string()]
    );
}

#[tokio::test]
async fn new_local_file_is_uploaded() {
    let lib = library("lib-1", "Docs", Permission::ReadWrite, false);
    let provider = MockProvider::with_library(lib.clone());
    provider.set_tree(&lib.id, vec![]);

    let h = harness(provider).await;
    // First cycle creates the library root.
    h.engine.sync_all().await.unwrap();

    std::fs::write(h.root.join("Docs/new.txt"), b"fresh").unwrap();
    let report = h.engine.sync_all().await.unwrap();

    assert_eq!(report.files_uploaded, 1);
    assert_eq!(
        h.provider.uploads.lock().unwrap().as_slice(),
        &["/new.txt".to_string()]
    );
}

#[tokio::test]
async fn read_only_library_never_uploads_or_deletes_remotely() {
    let lib = library("lib-1", "Shared", Permission::ReadOnly, false);
    let provider = MockProvider::with_library(lib.clone());
    provider.set_tree(&lib.id, vec![remote("/keep.txt", "k", 100, 3, false)]);

    let h = harness(provider).await;
    h.engine.sync_all().await.unwrap();

    // Local-only change in a read-only library.
    std::fs::write(h.root.join("Shared/local-only.txt"), b"mine").unwrap();
    let report = h.engine.sync_all().await.unwrap();

    assert_eq!(report.files_uploaded, 0);
    assert!(h.provider.uploads.lock().unwrap().is_empty());
    assert!(h.provider.remote_deletes.lock().unwrap().is_empty());
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn quota_failure_records_error_without_corrupting_baseline() {
    let lib = library("lib-1", "Docs", Permission::ReadWrite, false);
    let mut provider = MockProvider::with_library(lib.clone());
    provider.fail_uploads = true;
    provider.set_tree(&lib.id, vec![]);

    let h = harness(provider).await;
    h.engine.sync_all().await.unwrap();

    std::fs::write(h.root.join("Docs/big.bin"), b"too large").unwrap();
    let report = h.engine.sync_all().await.unwrap();

    assert_eq!(report.files_uploaded, 0);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("quota"), "{:?}", report.errors);

    // The failing path is simply absent from the baseline and reappears as
    // a pending upload next cycle.
    let state = h.store.get_state(&lib.id).await.unwrap();
    assert!(state.is_none(), "baseline should hold zero rows");

    let snapshot = h.status.snapshot();
    assert_eq!(snapshot.errors.len(), 1);
    assert_eq!(snapshot.errors[0].library_name.as_deref(), Some("Docs"));
}

#[tokio::test]
async fn encrypted_library_without_password_is_skipped() {
    let lib = library("lib-1", "Vault", Permission::ReadWrite, true);
    let provider = MockProvider::with_library(lib.clone());
    provider.set_tree(&lib.id, vec![remote("/secret.txt", "s", 100, 1, false)]);

    let h = harness(provider).await;
    let report = h.engine.sync_all().await.unwrap();

    assert_eq!(h.provider.list_entry_calls.load(Ordering::SeqCst), 0);
    assert!(report.errors.iter().any(|e| e.contains("needs a password")));
}

#[tokio::test]
async fn overlapping_cycles_collapse_to_one() {
    let lib = library("lib-1", "Docs", Permission::ReadWrite, false);
    let mut provider = MockProvider::with_library(lib.clone());
    provider.listing_delay = Some(Duration::from_millis(100));
    provider.set_tree(&lib.id, vec![]);

    let h = harness(provider).await;
    let engine = Arc::new(h.engine);

    let (a, b) = tokio::join!(engine.sync_all(), engine.sync_all());
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(
        a.skipped != b.skipped,
        "exactly one of two overlapping cycles must be dropped"
    );
}

#[tokio::test]
async fn remote_edit_overwrites_older_local_copy() {
    let lib = library("lib-1", "Docs", Permission::ReadWrite, false);
    let provider = MockProvider::with_library(lib.clone());
    provider.set_tree(&lib.id, vec![remote("/note.txt", "v1", 100, 3, false)]);
    provider.set_content("/note.txt", b"old");

    let h = harness(provider).await;
    h.engine.sync_all().await.unwrap();
    assert_eq!(std::fs::read(h.root.join("Docs/note.txt")).unwrap(), b"old");

    // Server-side edit: newer mtime, new object id.
    h.provider
        .set_tree(&lib.id, vec![remote("/note.txt", "v2", 200, 3, false)]);
    h.provider.set_content("/note.txt", b"new");

    let report = h.engine.sync_all().await.unwrap();
    assert_eq!(report.files_downloaded, 1);
    assert_eq!(std::fs::read(h.root.join("Docs/note.txt")).unwrap(), b"new");
    assert_eq!(file_mtime(&h.root.join("Docs/note.txt")), 200);
}
