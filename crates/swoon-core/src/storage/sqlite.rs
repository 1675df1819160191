use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

use super::backend::StorageBackend;
use crate::error::{Result, SwoonError};
use crate::model::*;

/// SQLite-backed storage for shops, catalogs, sessions and swipes.
///
/// Uses a single `Connection` behind `Arc<Mutex<>>` so it can be shared
/// across async tasks.  All blocking SQLite calls go through
/// [`with_conn`](Self::with_conn) which runs them on the Tokio blocking
/// thread-pool.  Several processes may open the same file; the
/// `UNIQUE(session_id, dress_id)` constraint is what keeps swipes unique.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

const DRESS_COLUMNS: &str = "id, shop_id, name, price, brand, color, silhouette, neckline, fabric, \
     stock, size_range, style_tags, created_at";

const SESSION_COLUMNS: &str = "token, shop_id, created_by, bride_name, created_at, completed_at";

impl SqliteStorage {
    /// Open (or create) a file-backed SQLite database at `path`.
    ///
    /// Sets WAL journal mode, a busy timeout, and enables foreign keys, then
    /// creates all tables and indexes if they don't already exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SwoonError::Storage(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(&path)
            .map_err(|e| SwoonError::Storage(format!("failed to open SQLite database: {e}")))?;

        Self::configure_and_init(conn, path)
    }

    /// Open an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            SwoonError::Storage(format!("failed to open in-memory SQLite database: {e}"))
        })?;

        Self::configure_and_init(conn, PathBuf::from(":memory:"))
    }

    /// Return the path this database was opened with (`:memory:` for in-memory).
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ── helpers ────────────────────────────────────────────────────────

    fn configure_and_init(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(|e| SwoonError::Storage(format!("failed to set WAL mode: {e}")))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| SwoonError::Storage(format!("failed to enable foreign keys: {e}")))?;

        // Other processes writing the same file surface as SQLITE_BUSY after this.
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(|e| SwoonError::Storage(format!("failed to set busy timeout: {e}")))?;

        let storage = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };

        storage.create_tables()?;
        Ok(storage)
    }

    /// Create all tables and indexes (idempotent).
    fn create_tables(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SwoonError::Storage(format!("failed to acquire database lock: {e}")))?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS shops (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS dresses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                shop_id TEXT NOT NULL REFERENCES shops(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                price REAL NOT NULL,
                brand TEXT NOT NULL DEFAULT '',
                color TEXT NOT NULL DEFAULT '',
                silhouette TEXT NOT NULL DEFAULT '',
                neckline TEXT NOT NULL DEFAULT '',
                fabric TEXT NOT NULL DEFAULT '',
                stock INTEGER NOT NULL DEFAULT 0,
                size_range TEXT NOT NULL DEFAULT '',
                style_tags TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token TEXT NOT NULL UNIQUE,
                shop_id TEXT NOT NULL REFERENCES shops(id) ON DELETE CASCADE,
                created_by TEXT NOT NULL,
                bride_name TEXT,
                created_at TEXT NOT NULL,
                completed_at TEXT
            );

            CREATE TABLE IF NOT EXISTS swipes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                dress_id INTEGER NOT NULL REFERENCES dresses(id) ON DELETE CASCADE,
                liked INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(session_id, dress_id)
            );

            CREATE INDEX IF NOT EXISTS idx_dresses_shop_id ON dresses(shop_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_shop_created
                ON sessions(shop_id, created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_swipes_session_id ON swipes(session_id);
            ",
        )
        .map_err(|e| SwoonError::Storage(format!("failed to create tables: {e}")))?;

        Ok(())
    }

    /// Run a blocking closure against the SQLite connection on the Tokio
    /// blocking thread-pool.  This is the primary way trait methods
    /// interact with the database.
    pub(crate) async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                SwoonError::Storage(format!("failed to acquire database lock: {e}"))
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| SwoonError::Storage(format!("task join error: {e}")))?
    }
}

// ── row mapping ────────────────────────────────────────────────────────

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_uuid(idx: usize, raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_shop(row: &Row<'_>) -> rusqlite::Result<Shop> {
    Ok(Shop {
        id: parse_uuid(0, &row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        created_at: parse_timestamp(2, &row.get::<_, String>(2)?)?,
    })
}

fn row_to_dress(row: &Row<'_>) -> rusqlite::Result<Dress> {
    Ok(Dress {
        id: row.get(0)?,
        shop_id: parse_uuid(1, &row.get::<_, String>(1)?)?,
        name: row.get(2)?,
        price: row.get(3)?,
        brand: row.get(4)?,
        color: row.get(5)?,
        silhouette: row.get(6)?,
        neckline: row.get(7)?,
        fabric: row.get(8)?,
        stock: row.get(9)?,
        size_range: row.get(10)?,
        style_tags: row.get(11)?,
        created_at: parse_timestamp(12, &row.get::<_, String>(12)?)?,
    })
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    let completed_at: Option<String> = row.get(5)?;
    let state = match completed_at {
        Some(raw) => SessionState::Completed {
            at: parse_timestamp(5, &raw)?,
        },
        None => SessionState::Active,
    };
    Ok(Session {
        token: parse_uuid(0, &row.get::<_, String>(0)?)?,
        shop_id: parse_uuid(1, &row.get::<_, String>(1)?)?,
        created_by: row.get(2)?,
        bride_name: row.get(3)?,
        created_at: parse_timestamp(4, &row.get::<_, String>(4)?)?,
        state,
    })
}

/// Resolve a session token to its internal row id.
fn session_key(conn: &Connection, token: Uuid) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM sessions WHERE token = ?1",
        params![token.to_string()],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| SwoonError::NotFound(format!("session {token}")))
}

fn swipe_count(conn: &Connection, session_id: i64) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM swipes WHERE session_id = ?1",
        params![session_id],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

fn unseen(conn: &Connection, session_id: i64) -> Result<Vec<Dress>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DRESS_COLUMNS} FROM dresses
         WHERE shop_id = (SELECT shop_id FROM sessions WHERE id = ?1)
           AND id NOT IN (SELECT dress_id FROM swipes WHERE session_id = ?1)
         ORDER BY id"
    ))?;
    let dresses = stmt
        .query_map(params![session_id], row_to_dress)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(dresses)
}

fn load_session(conn: &Connection, token: Uuid) -> Result<Session> {
    conn.query_row(
        &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE token = ?1"),
        params![token.to_string()],
        row_to_session,
    )
    .optional()?
    .ok_or_else(|| SwoonError::NotFound(format!("session {token}")))
}

impl StorageBackend for SqliteStorage {
    async fn create_shop(&self, shop: &Shop) -> Result<()> {
        let shop = shop.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO shops (id, name, created_at) VALUES (?1, ?2, ?3)",
                params![
                    shop.id.to_string(),
                    shop.name,
                    shop.created_at.to_rfc3339()
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_shop(&self, id: Uuid) -> Result<Shop> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, name, created_at FROM shops WHERE id = ?1",
                params![id.to_string()],
                row_to_shop,
            )
            .optional()?
            .ok_or_else(|| SwoonError::NotFound(format!("shop {id}")))
        })
        .await
    }

    async fn list_shops(&self) -> Result<Vec<Shop>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, created_at FROM shops ORDER BY created_at, name")?;
            let shops = stmt
                .query_map([], row_to_shop)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(shops)
        })
        .await
    }

    async fn add_dress(&self, input: &NewDress) -> Result<Dress> {
        let input = input.clone();
        self.with_conn(move |conn| {
            let created_at = Utc::now();
            let name = input.name.trim().to_string();
            let inserted = conn.execute(
                "INSERT INTO dresses (shop_id, name, price, brand, color, silhouette, neckline,
                                      fabric, stock, size_range, style_tags, created_at)
                 SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12
                 WHERE EXISTS (SELECT 1 FROM shops WHERE id = ?1)",
                params![
                    input.shop_id.to_string(),
                    name,
                    input.price,
                    input.brand,
                    input.color,
                    input.silhouette,
                    input.neckline,
                    input.fabric,
                    input.stock,
                    input.size_range,
                    input.style_tags,
                    created_at.to_rfc3339(),
                ],
            )?;
            if inserted == 0 {
                return Err(SwoonError::NotFound(format!("shop {}", input.shop_id)));
            }
            let id = conn.last_insert_rowid();
            Ok(input.into_dress(id, created_at))
        })
        .await
    }

    async fn get_dress(&self, id: DressId) -> Result<Dress> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {DRESS_COLUMNS} FROM dresses WHERE id = ?1"),
                params![id],
                row_to_dress,
            )
            .optional()?
            .ok_or_else(|| SwoonError::NotFound(format!("dress {id}")))
        })
        .await
    }

    async fn list_dresses(&self, shop_id: Uuid, price: &PriceRange) -> Result<Vec<Dress>> {
        // A NaN bound would bind as NULL and silently drop the filter
        price.validate()?;
        let price = *price;
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DRESS_COLUMNS} FROM dresses
                 WHERE shop_id = ?1
                   AND (?2 IS NULL OR price >= ?2)
                   AND (?3 IS NULL OR price <= ?3)
                 ORDER BY id"
            ))?;
            let dresses = stmt
                .query_map(
                    params![shop_id.to_string(), price.min, price.max],
                    row_to_dress,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(dresses)
        })
        .await
    }

    async fn save_session(&self, session: &Session) -> Result<()> {
        let session = session.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sessions
                    (token, shop_id, created_by, bride_name, created_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    session.token.to_string(),
                    session.shop_id.to_string(),
                    session.created_by,
                    session.bride_name,
                    session.created_at.to_rfc3339(),
                    session.completed_at().map(|at| at.to_rfc3339()),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_session(&self, token: Uuid) -> Result<Session> {
        self.with_conn(move |conn| load_session(conn, token)).await
    }

    async fn list_sessions(&self, shop_id: Uuid, limit: usize) -> Result<Vec<Session>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE shop_id = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2"
            ))?;
            let sessions = stmt
                .query_map(params![shop_id.to_string(), limit as i64], row_to_session)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(sessions)
        })
        .await
    }

    async fn complete_session(&self, token: Uuid, at: DateTime<Utc>) -> Result<Session> {
        self.with_conn(move |conn| {
            // The IS NULL guard makes the timestamp set-once even across processes.
            conn.execute(
                "UPDATE sessions SET completed_at = ?2 WHERE token = ?1 AND completed_at IS NULL",
                params![token.to_string(), at.to_rfc3339()],
            )?;
            load_session(conn, token)
        })
        .await
    }

    async fn insert_swipe_if_absent(
        &self,
        token: Uuid,
        dress_id: DressId,
        liked: bool,
    ) -> Result<RecordedEvent> {
        self.with_conn(move |conn| {
            // IMMEDIATE takes the write lock up front so a competing writer waits
            // on busy_timeout instead of failing a read-to-write upgrade.
            let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
            let session_id = session_key(&tx, token)?;
            let inserted = tx.execute(
                "INSERT INTO swipes (session_id, dress_id, liked, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(session_id, dress_id) DO NOTHING",
                params![session_id, dress_id, liked, Utc::now().to_rfc3339()],
            )?;
            let (stored_liked, created_at): (bool, String) = tx.query_row(
                "SELECT liked, created_at FROM swipes WHERE session_id = ?1 AND dress_id = ?2",
                params![session_id, dress_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            tx.commit()?;

            Ok(RecordedEvent {
                event: SwipeEvent {
                    session: token,
                    dress_id,
                    liked: stored_liked,
                    created_at: parse_timestamp(1, &created_at)?,
                },
                created: inserted == 1,
            })
        })
        .await
    }

    async fn swipes_for_session(&self, token: Uuid) -> Result<Vec<SwipeEvent>> {
        self.with_conn(move |conn| {
            let session_id = session_key(conn, token)?;
            let mut stmt = conn.prepare(
                "SELECT dress_id, liked, created_at FROM swipes WHERE session_id = ?1 ORDER BY id",
            )?;
            let events = stmt
                .query_map(params![session_id], |row| {
                    Ok(SwipeEvent {
                        session: token,
                        dress_id: row.get(0)?,
                        liked: row.get(1)?,
                        created_at: parse_timestamp(2, &row.get::<_, String>(2)?)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(events)
        })
        .await
    }

    async fn count_swipes(&self, token: Uuid) -> Result<usize> {
        self.with_conn(move |conn| {
            let session_id = session_key(conn, token)?;
            swipe_count(conn, session_id)
        })
        .await
    }

    async fn unseen_dresses(&self, token: Uuid) -> Result<Vec<Dress>> {
        self.with_conn(move |conn| {
            let session_id = session_key(conn, token)?;
            unseen(conn, session_id)
        })
        .await
    }

    async fn swipe_progress(&self, token: Uuid) -> Result<(usize, Vec<Dress>)> {
        self.with_conn(move |conn| {
            // Both reads see the same WAL snapshot
            let tx = Transaction::new_unchecked(conn, TransactionBehavior::Deferred)?;
            let session_id = session_key(&tx, token)?;
            let count = swipe_count(&tx, session_id)?;
            let dresses = unseen(&tx, session_id)?;
            tx.commit()?;
            Ok((count, dresses))
        })
        .await
    }
}
