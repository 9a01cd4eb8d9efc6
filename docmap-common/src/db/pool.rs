//! Self-healing SQLite pool
//!
//! The backing file of a store can be wiped by an external rebuild at any
//! point in the store's lifetime. Pooled connections keep the unlinked inode
//! open, so writes would silently land in a file nobody can see anymore.
//! [`ManagedPool`] checks the path before every access and reopens the
//! database (recreating the schema) when the file is gone, or when a different
//! file now sits at the same path.
//!
//! Schema statements must be idempotent (`CREATE ... IF NOT EXISTS`); they are
//! re-applied on every access so a dropped table is also recovered.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// SQLite busy timeout applied to every connection
pub const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Sidecar files SQLite may leave next to the database
const SIDECAR_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

/// Lazily (re)opened pool bound to one database file and its schema
pub struct ManagedPool {
    path: PathBuf,
    schema: &'static [&'static str],
    pool: Mutex<Option<OpenPool>>,
}

struct OpenPool {
    pool: SqlitePool,
    identity: Option<FileIdentity>,
}

/// Distinguishes a recreated file from the one a pool was opened on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    #[cfg(unix)]
    fn of(metadata: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        }
    }

    // Open files cannot be unlinked on other platforms, so existence is enough
    #[cfg(not(unix))]
    fn of(_metadata: &std::fs::Metadata) -> Self {
        Self { dev: 0, ino: 0 }
    }
}

impl ManagedPool {
    /// Open (or create) the database at `path` and apply `schema`
    pub async fn open(path: impl Into<PathBuf>, schema: &'static [&'static str]) -> Result<Self> {
        let managed = Self {
            path: path.into(),
            schema,
            pool: Mutex::new(None),
        };
        managed.for_write().await?;
        Ok(managed)
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pool for a mutating operation
    ///
    /// Recreates the file and schema if the file was deleted since the last call.
    pub async fn for_write(&self) -> Result<SqlitePool> {
        let pool = self.current_pool().await?;
        apply_schema(&pool, self.schema).await?;
        Ok(pool)
    }

    /// Pool for a read, or `None` when the backing file does not exist
    ///
    /// Reads never create the file; a wiped store simply reads as empty.
    pub async fn for_read(&self) -> Result<Option<SqlitePool>> {
        if !tokio::fs::try_exists(&self.path).await? {
            debug!(path = %self.path.display(), "Database file absent, reading as empty");
            return Ok(None);
        }
        self.for_write().await.map(Some)
    }

    /// Close pooled connections. The next access reopens the file.
    pub async fn close(&self) {
        if let Some(open) = self.pool.lock().await.take() {
            open.pool.close().await;
        }
    }

    async fn current_pool(&self) -> Result<SqlitePool> {
        let identity = file_identity(&self.path).await?;
        let mut guard = self.pool.lock().await;

        if let (Some(open), Some(identity)) = (guard.as_ref(), identity) {
            if open.identity == Some(identity) {
                return Ok(open.pool.clone());
            }
        }

        if let Some(stale) = guard.take() {
            if identity.is_some() {
                warn!(
                    path = %self.path.display(),
                    "Database file was replaced externally, reopening"
                );
            } else {
                warn!(
                    path = %self.path.display(),
                    "Database file was removed externally, recreating"
                );
            }
            stale.pool.close().await;
        }

        if identity.is_none() {
            remove_sidecars(&self.path).await?;
        }

        let pool = connect(&self.path).await?;
        if identity.is_some() {
            info!("Opened existing database: {}", self.path.display());
        } else {
            info!("Initialized new database: {}", self.path.display());
        }

        let identity = file_identity(&self.path).await?;

        *guard = Some(OpenPool {
            pool: pool.clone(),
            identity,
        });
        Ok(pool)
    }
}

async fn file_identity(path: &Path) -> Result<Option<FileIdentity>> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => Ok(Some(FileIdentity::of(&metadata))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Connect to `path`, creating parent folders and the file if missing
pub async fn connect(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    // Rollback journal rather than WAL: a stale -wal file outliving an external
    // deletion would be replayed into the recreated database.
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete)
        .foreign_keys(false)
        .busy_timeout(BUSY_TIMEOUT);

    // Single writer per store
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Run idempotent schema statements
pub async fn apply_schema(pool: &SqlitePool, schema: &[&str]) -> Result<()> {
    for statement in schema {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

async fn remove_sidecars(path: &Path) -> Result<()> {
    for suffix in SIDECAR_SUFFIXES {
        let mut name = OsString::from(path.as_os_str());
        name.push(suffix);
        let sidecar = PathBuf::from(name);
        match tokio::fs::remove_file(&sidecar).await {
            Ok(()) => debug!(path = %sidecar.display(), "Removed stale sidecar"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
