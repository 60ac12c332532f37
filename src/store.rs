//! SQLite persistence for tasks.
//!
//! Every write or read of tasks opens the database file fresh and runs the
//! migration routine, so a store that was locked or missing recovers on the
//! next call. Diagnostics open the file read-only and never migrate.

use crate::error::StoreError;
use crate::task::{Task, TaskId, TaskText};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info};

/// Highest schema version this build knows how to create.
pub const SCHEMA_VERSION: u32 = 1;

/// Store calls run on the UI loop; a locked database has to fail within this.
const BUSY_TIMEOUT: Duration = Duration::from_millis(100);

/// Ordered migration steps. New versions are appended, never rewritten.
const MIGRATIONS: &[(u32, &str)] = &[(
    1,
    "CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        done INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL
    );",
)];

/// The capabilities the board needs from a task store.
pub trait TaskRepository {
    fn create(&self, text: &TaskText) -> Result<(), StoreError>;

    /// Every stored task, in no particular order.
    fn read_all(&self) -> Result<Vec<Task>, StoreError>;

    /// Flips `done` for `id`. Unknown ids are a successful no-op.
    fn toggle(&self, id: TaskId) -> Result<(), StoreError>;

    fn engine_version(&self) -> Result<String, StoreError>;

    fn schema_version(&self) -> Result<u32, StoreError>;
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut conn = Connection::open(&self.path)?;
        configure_connection(&conn)?;
        migrate(&mut conn)?;
        Ok(conn)
    }

    /// Opens an existing database without creating, configuring or migrating it.
    fn connect_read_only(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

impl TaskRepository for SqliteStore {
    fn create(&self, text: &TaskText) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let created_at = Utc::now().timestamp_millis();
        conn.execute(
            "INSERT INTO tasks (text, done, created_at) VALUES (?1, 0, ?2)",
            params![text.as_str(), created_at],
        )?;
        debug!(id = conn.last_insert_rowid(), "task created");
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Task>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT id, text, done, created_at FROM tasks")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, text, done, created_at)| {
                let created_at = DateTime::<Utc>::from_timestamp_millis(created_at)
                    .ok_or(StoreError::BadTimestamp(created_at))?;
                Ok(Task {
                    id: TaskId(id),
                    text,
                    done,
                    created_at,
                })
            })
            .collect()
    }

    fn toggle(&self, id: TaskId) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let changed = conn.execute("UPDATE tasks SET done = NOT done WHERE id = ?1", params![id.0])?;
        if changed == 0 {
            debug!(%id, "toggle matched no task");
        }
        Ok(())
    }

    fn engine_version(&self) -> Result<String, StoreError> {
        let conn = self.connect_read_only()?;
        Ok(conn.query_row("SELECT sqlite_version()", [], |row| row.get(0))?)
    }

    fn schema_version(&self) -> Result<u32, StoreError> {
        let conn = self.connect_read_only()?;
        read_user_version(&conn)
    }
}

fn configure_connection(conn: &Connection) -> Result<(), StoreError> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    Ok(())
}

fn read_user_version(conn: &Connection) -> Result<u32, StoreError> {
    let version = conn.query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))?;
    u32::try_from(version).map_err(|_| StoreError::BadSchemaVersion(version))
}

/// Brings the schema up to [`SCHEMA_VERSION`] and returns the resulting version.
/// Running it on an up-to-date database changes nothing.
pub fn migrate(conn: &mut Connection) -> Result<u32, StoreError> {
    let current = read_user_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(StoreError::SchemaTooNew {
            found: current,
            supported: SCHEMA_VERSION,
        });
    }
    if current == SCHEMA_VERSION {
        return Ok(current);
    }

    let tx = conn.transaction()?;
    for (version, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", *version as i64)?;
        info!(from = current, to = *version, "applied schema migration");
    }
    tx.commit()?;
    Ok(SCHEMA_VERSION)
}
