mod backend;
mod memory;
mod sqlite;

pub use backend::StorageBackend;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use crate::config::SwoonConfig;
use crate::error::{Result, SwoonError};
use crate::model::*;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Enum wrapper for storage backends. Dispatches to the concrete implementation.
/// Using an enum instead of `Box<dyn StorageBackend>` because the trait uses RPITIT.
pub enum Storage {
    Sqlite(SqliteStorage),
    Memory(MemoryStorage),
}

impl StorageBackend for Storage {
    async fn create_shop(&self, shop: &Shop) -> Result<()> {
        match self {
            Storage::Sqlite(s) => s.create_shop(shop).await,
            Storage::Memory(s) => s.create_shop(shop).await,
        }
    }

    async fn get_shop(&self, id: Uuid) -> Result<Shop> {
        match self {
            Storage::Sqlite(s) => s.get_shop(id).await,
            Storage::Memory(s) => s.get_shop(id).await,
        }
    }

    async fn list_shops(&self) -> Result<Vec<Shop>> {
        match self {
            Storage::Sqlite(s) => s.list_shops().await,
            Storage::Memory(s) => s.list_shops().await,
        }
    }

    async fn add_dress(&self, input: &NewDress) -> Result<Dress> {
        match self {
            Storage::Sqlite(s) => s.add_dress(input).await,
            Storage::Memory(s) => s.add_dress(input).await,
        }
    }

    async fn get_dress(&self, id: DressId) -> Result<Dress> {
        match self {
            Storage::Sqlite(s) => s.get_dress(id).await,
            Storage::Memory(s) => s.get_dress(id).await,
        }
    }

    async fn list_dresses(&self, shop_id: Uuid, price: &PriceRange) -> Result<Vec<Dress>> {
        match self {
            Storage::Sqlite(s) => s.list_dresses(shop_id, price).await,
            Storage::Memory(s) => s.list_dresses(shop_id, price).await,
        }
    }

    async fn save_session(&self, session: &Session) -> Result<()> {
        match self {
            Storage::Sqlite(s) => s.save_session(session).await,
            Storage::Memory(s) => s.save_session(session).await,
        }
    }

    async fn get_session(&self, token: Uuid) -> Result<Session> {
        match self {
            Storage::Sqlite(s) => s.get_session(token).await,
            Storage::Memory(s) => s.get_session(token).await,
        }
    }

    async fn list_sessions(&self, shop_id: Uuid, limit: usize) -> Result<Vec<Session>> {
        match self {
            Storage::Sqlite(s) => s.list_sessions(shop_id, limit).await,
            Storage::Memory(s) => s.list_sessions(shop_id, limit).await,
        }
    }

    async fn complete_session(&self, token: Uuid, at: DateTime<Utc>) -> Result<Session> {
        match self {
            Storage::Sqlite(s) => s.complete_session(token, at).await,
            Storage::Memory(s) => s.complete_session(token, at).await,
        }
    }

    async fn insert_swipe_if_absent(
        &self,
        token: Uuid,
        dress_id: DressId,
        liked: bool,
    ) -> Result<RecordedEvent> {
        match self {
            Storage::Sqlite(s) => s.insert_swipe_if_absent(token, dress_id, liked).await,
            Storage::Memory(s) => s.insert_swipe_if_absent(token, dress_id, liked).await,
        }
    }

    async fn swipes_for_session(&self, token: Uuid) -> Result<Vec<SwipeEvent>> {
        match self {
            Storage::Sqlite(s) => s.swipes_for_session(token).await,
            Storage::Memory(s) => s.swipes_for_session(token).await,
        }
    }

    async fn count_swipes(&self, token: Uuid) -> Result<usize> {
        match self {
            Storage::Sqlite(s) => s.count_swipes(token).await,
            Storage::Memory(s) => s.count_swipes(token).await,
        }
    }

    async fn unseen_dresses(&self, token: Uuid) -> Result<Vec<Dress>> {
        match self {
            Storage::Sqlite(s) => s.unseen_dresses(token).await,
            Storage::Memory(s) => s.unseen_dresses(token).await,
        }
    }

    async fn swipe_progress(&self, token: Uuid) -> Result<(usize, Vec<Dress>)> {
        match self {
            Storage::Sqlite(s) => s.swipe_progress(token).await,
            Storage::Memory(s) => s.swipe_progress(token).await,
        }
    }
}

impl Storage {
    /// Human-readable backend name plus location, for status output.
    pub fn describe(&self) -> String {
        match self {
            Storage::Sqlite(s) => format!("sqlite ({})", s.path().display()),
            Storage::Memory(_) => "memory".to_string(),
        }
    }
}

/// Create a storage backend from the given configuration.
pub fn create_backend(config: &SwoonConfig) -> Result<Storage> {
    match config.storage.backend.as_str() {
        "sqlite" => {
            let path = match &config.storage.path {
                Some(p) => std::path::PathBuf::from(p),
                None => default_sqlite_path()?,
            };
            let storage = SqliteStorage::open(&path)?;
            Ok(Storage::Sqlite(storage))
        }
        "memory" => Ok(Storage::Memory(MemoryStorage::new())),
        other => Err(SwoonError::Config(format!(
            "unknown storage backend: {other}"
        ))),
    }
}

/// Default SQLite path: `~/.config/swoon/swoon.db`
fn default_sqlite_path() -> Result<std::path::PathBuf> {
    dirs::config_dir()
        .map(|p| p.join("swoon").join("swoon.db"))
        .ok_or_else(|| SwoonError::Config("cannot determine config directory".to_string()))
}
