use crate::error::Result;
use crate::model::*;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Abstract storage backend. SQLite is the durable implementation; the
/// in-memory one backs tests and throwaway demos.
///
/// Sessions are addressed by token only. A backend may key rows by an
/// internal integer but must not leak it through this interface.
pub trait StorageBackend: Send + Sync {
    // -- Catalog --

    fn create_shop(&self, shop: &Shop) -> impl std::future::Future<Output = Result<()>> + Send;

    fn get_shop(&self, id: Uuid) -> impl std::future::Future<Output = Result<Shop>> + Send;

    fn list_shops(&self) -> impl std::future::Future<Output = Result<Vec<Shop>>> + Send;

    /// Insert a dress and return it with its assigned id.
    fn add_dress(
        &self,
        input: &NewDress,
    ) -> impl std::future::Future<Output = Result<Dress>> + Send;

    fn get_dress(&self, id: DressId) -> impl std::future::Future<Output = Result<Dress>> + Send;

    /// All dresses of a shop within `price`, ordered by id.
    fn list_dresses(
        &self,
        shop_id: Uuid,
        price: &PriceRange,
    ) -> impl std::future::Future<Output = Result<Vec<Dress>>> + Send;

    // -- Sessions --

    fn save_session(
        &self,
        session: &Session,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn get_session(&self, token: Uuid)
        -> impl std::future::Future<Output = Result<Session>> + Send;

    /// Most recent sessions of a shop first.
    fn list_sessions(
        &self,
        shop_id: Uuid,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<Session>>> + Send;

    /// Set the completion timestamp if it is not set yet, and return the
    /// stored session. An already-completed session is returned unchanged.
    fn complete_session(
        &self,
        token: Uuid,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Session>> + Send;

    // -- Swipes --

    /// Atomically insert a swipe unless one already exists for the
    /// (session, dress) pair, returning whatever row is stored afterwards.
    fn insert_swipe_if_absent(
        &self,
        token: Uuid,
        dress_id: DressId,
        liked: bool,
    ) -> impl std::future::Future<Output = Result<RecordedEvent>> + Send;

    fn swipes_for_session(
        &self,
        token: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<SwipeEvent>>> + Send;

    fn count_swipes(&self, token: Uuid) -> impl std::future::Future<Output = Result<usize>> + Send;

    /// Dresses of the session's shop that have no swipe in this session yet.
    fn unseen_dresses(
        &self,
        token: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Dress>>> + Send;

    /// Swipe count and unseen dresses read from one consistent state.
    fn swipe_progress(
        &self,
        token: Uuid,
    ) -> impl std::future::Future<Output = Result<(usize, Vec<Dress>)>> + Send;
}
