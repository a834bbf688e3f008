//! SQLite implementation of IStateStore
//!
//! Handles domain type serialization and SQL query construction for the
//! baseline tables.
//!
//! ## Type Mapping
//!
//! | Domain Type | SQL Type | Strategy                                   |
//! |-------------|----------|--------------------------------------------|
//! | LibraryId   | TEXT     | `.as_str()` / `LibraryId::new()`           |
//! | RemotePath  | TEXT     | `.as_str()` / `RemotePath::new()`          |
//! | ObjectId    | TEXT     | `.as_str()` / `ObjectId::new()`            |
//! | mtime       | INTEGER  | seconds since epoch, `i64`                 |
//! | is_dir      | INTEGER  | 0/1                                        |

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use seasync_core::domain::newtypes::{LibraryId, ObjectId, RemotePath};
use seasync_core::domain::{SyncState, SyncedFile};
use seasync_core::ports::IStateStore;

use crate::StoreError;

/// SQLite-based implementation of the state store port
///
/// All operations go through a connection pool. Only the orchestrator writes;
/// the baseline for a library is replaced atomically inside one transaction.
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Reconstruct a SyncedFile from a `synced_files` row
fn synced_file_from_row(row: &SqliteRow) -> Result<SyncedFile, StoreError> {
    let path_str: String = row.get("path");
    let object_id_str: String = row.get("object_id");
    let mtime: i64 = row.get("mtime");
    let size: i64 = row.get("size");
    let is_directory: i64 = row.get("is_directory");

    let path = RemotePath::new(path_str.clone()).map_err(|e| {
        StoreError::SerializationError(format!("Invalid path '{}': {}", path_str, e))
    })?;
    let object_id = ObjectId::new(object_id_str.clone()).map_err(|e| {
        StoreError::SerializationError(format!("Invalid object id '{}': {}", object_id_str, e))
    })?;

    Ok(SyncedFile {
        path,
        object_id,
        mtime,
        size: size.max(0) as u64,
        is_dir: is_directory != 0,
    })
}

#[async_trait::async_trait]
impl IStateStore for SqliteStateStore {
    async fn get_state(&self, library_id: &LibraryId) -> anyhow::Result<Option<SyncState>> {
        let rows = sqlx::query(
            "SELECT path, object_id, mtime, size, is_directory \
             FROM synced_files WHERE library_id = ? ORDER BY path ASC",
        )
        .bind(library_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        // A timestamp without baseline rows is treated as never-synced.
        if rows.is_empty() {
            return Ok(None);
        }

        let mut files = Vec::with_capacity(rows.len());
        for row in &rows {
            files.push(synced_file_from_row(row)?);
        }

        let last_sync_time: Option<i64> =
            sqlx::query_scalar("SELECT last_sync_time FROM sync_state WHERE library_id = ?")
                .bind(library_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::from)?;

        Ok(Some(SyncState::new(
            library_id.clone(),
            last_sync_time.unwrap_or(0),
            files,
        )))
    }

    async fn save_state(&self, state: &SyncState) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        sqlx::query(
            "INSERT INTO sync_state (library_id, last_sync_time) VALUES (?, ?) \
             ON CONFLICT(library_id) DO UPDATE SET last_sync_time = excluded.last_sync_time",
        )
        .bind(state.library_id.as_str())
        .bind(state.last_sync_time)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from)?;

        sqlx::query("DELETE FROM synced_files WHERE library_id = ?")
            .bind(state.library_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;

        for file in &state.files {
            sqlx::query(
                "INSERT INTO synced_files \
                 (library_id, path, object_id, mtime, size, is_directory) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(state.library_id.as_str())
            .bind(file.path.as_str())
            .bind(file.object_id.as_str())
            .bind(file.mtime)
            .bind(file.size as i64)
            .bind(i64::from(file.is_dir))
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;
        }

        tx.commit().await.map_err(StoreError::from)?;

        tracing::trace!(
            library_id = %state.library_id,
            rows = state.files.len(),
            "Saved sync state"
        );
        Ok(())
    }

    async fn get_file(
        &self,
        library_id: &LibraryId,
        path: &RemotePath,
    ) -> anyhow::Result<Option<SyncedFile>> {
        let row = sqlx::query(
            "SELECT path, object_id, mtime, size, is_directory \
             FROM synced_files WHERE library_id = ? AND path = ?",
        )
        .bind(library_id.as_str())
        .bind(path.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        match row {
            Some(ref r) => Ok(Some(synced_file_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn delete_all(&self) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        sqlx::query("DELETE FROM synced_files")
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;
        sqlx::query("DELETE FROM sync_state")
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;

        tx.commit().await.map_err(StoreError::from)?;

        tracing::info!("Cleared all sync state");
        Ok(())
    }
}
