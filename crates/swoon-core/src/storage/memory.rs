use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::backend::StorageBackend;
use crate::error::{Result, SwoonError};
use crate::model::*;

#[derive(Default)]
struct Tables {
    shops: HashMap<Uuid, Shop>,
    dresses: BTreeMap<DressId, Dress>,
    last_dress_id: DressId,
    sessions: HashMap<Uuid, Session>,
    /// Keyed by session token, then dress id. The inner map is the
    /// uniqueness constraint.
    swipes: HashMap<Uuid, BTreeMap<DressId, SwipeEvent>>,
}

/// Process-local storage. Everything lives behind one mutex, so each trait
/// call is atomic with respect to every other call.
#[derive(Default)]
pub struct MemoryStorage {
    tables: Mutex<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|e| SwoonError::Storage(format!("failed to acquire storage lock: {e}")))
    }
}

impl Tables {
    fn session(&self, token: Uuid) -> Result<&Session> {
        self.sessions
            .get(&token)
            .ok_or_else(|| SwoonError::NotFound(format!("session {token}")))
    }

    fn swipe_count(&self, token: Uuid) -> Result<usize> {
        self.session(token)?;
        Ok(self.swipes.get(&token).map_or(0, BTreeMap::len))
    }

    fn unseen(&self, token: Uuid) -> Result<Vec<Dress>> {
        let shop_id = self.session(token)?.shop_id;
        let seen = self.swipes.get(&token);
        Ok(self
            .dresses
            .values()
            .filter(|d| d.shop_id == shop_id)
            .filter(|d| seen.map_or(true, |s| !s.contains_key(&d.id)))
            .cloned()
            .collect())
    }
}

impl StorageBackend for MemoryStorage {
    async fn create_shop(&self, shop: &Shop) -> Result<()> {
        let mut tables = self.lock()?;
        if tables.shops.contains_key(&shop.id) {
            return Err(SwoonError::Storage(format!("shop {} already exists", shop.id)));
        }
        tables.shops.insert(shop.id, shop.clone());
        Ok(())
    }

    async fn get_shop(&self, id: Uuid) -> Result<Shop> {
        self.lock()?
            .shops
            .get(&id)
            .cloned()
            .ok_or_else(|| SwoonError::NotFound(format!("shop {id}")))
    }

    async fn list_shops(&self) -> Result<Vec<Shop>> {
        let mut shops: Vec<Shop> = self.lock()?.shops.values().cloned().collect();
        shops.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(shops)
    }

    async fn add_dress(&self, input: &NewDress) -> Result<Dress> {
        let mut tables = self.lock()?;
        if !tables.shops.contains_key(&input.shop_id) {
            return Err(SwoonError::NotFound(format!("shop {}", input.shop_id)));
        }
        tables.last_dress_id += 1;
        let dress = input.clone().into_dress(tables.last_dress_id, Utc::now());
        tables.dresses.insert(dress.id, dress.clone());
        Ok(dress)
    }

    async fn get_dress(&self, id: DressId) -> Result<Dress> {
        self.lock()?
            .dresses
            .get(&id)
            .cloned()
            .ok_or_else(|| SwoonError::NotFound(format!("dress {id}")))
    }

    async fn list_dresses(&self, shop_id: Uuid, price: &PriceRange) -> Result<Vec<Dress>> {
        price.validate()?;
        Ok(self
            .lock()?
            .dresses
            .values()
            .filter(|d| d.shop_id == shop_id && price.contains(d.price))
            .cloned()
            .collect())
    }

    async fn save_session(&self, session: &Session) -> Result<()> {
        let mut tables = self.lock()?;
        if !tables.shops.contains_key(&session.shop_id) {
            return Err(SwoonError::NotFound(format!("shop {}", session.shop_id)));
        }
        if tables.sessions.contains_key(&session.token) {
            return Err(SwoonError::Storage(format!(
                "session {} already exists",
                session.token
            )));
        }
        tables.sessions.insert(session.token, session.clone());
        Ok(())
    }

    async fn get_session(&self, token: Uuid) -> Result<Session> {
        self.lock()?.session(token).cloned()
    }

    async fn list_sessions(&self, shop_id: Uuid, limit: usize) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .lock()?
            .sessions
            .values()
            .filter(|s| s.shop_id == shop_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions.truncate(limit);
        Ok(sessions)
    }

    async fn complete_session(&self, token: Uuid, at: DateTime<Utc>) -> Result<Session> {
        let mut tables = self.lock()?;
        let session = tables
            .sessions
            .remove(&token)
            .ok_or_else(|| SwoonError::NotFound(format!("session {token}")))?
            .complete(at);
        tables.sessions.insert(token, session.clone());
        Ok(session)
    }

    async fn insert_swipe_if_absent(
        &self,
        token: Uuid,
        dress_id: DressId,
        liked: bool,
    ) -> Result<RecordedEvent> {
        let mut tables = self.lock()?;
        tables.session(token)?;
        if !tables.dresses.contains_key(&dress_id) {
            return Err(SwoonError::NotFound(format!("dress {dress_id}")));
        }

        let mut created = false;
        let event = tables
            .swipes
            .entry(token)
            .or_default()
            .entry(dress_id)
            .or_insert_with(|| {
                created = true;
                SwipeEvent {
                    session: token,
                    dress_id,
                    liked,
                    created_at: Utc::now(),
                }
            })
            .clone();
        Ok(RecordedEvent { event, created })
    }

    async fn swipes_for_session(&self, token: Uuid) -> Result<Vec<SwipeEvent>> {
        let tables = self.lock()?;
        tables.session(token)?;
        let mut events: Vec<SwipeEvent> = tables
            .swipes
            .get(&token)
            .map(|by_dress| by_dress.values().cloned().collect())
            .unwrap_or_default();
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }

    async fn count_swipes(&self, token: Uuid) -> Result<usize> {
        self.lock()?.swipe_count(token)
    }

    async fn unseen_dresses(&self, token: Uuid) -> Result<Vec<Dress>> {
        self.lock()?.unseen(token)
    }

    async fn swipe_progress(&self, token: Uuid) -> Result<(usize, Vec<Dress>)> {
        let tables = self.lock()?;
        Ok((tables.swipe_count(token)?, tables.unseen(token)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn seeded() -> (MemoryStorage, Shop, Vec<Dress>) {
        let storage = MemoryStorage::new();
        let shop = Shop::new("Test Shop".to_string());
        storage.create_shop(&shop).await.unwrap();
        let mut dresses = Vec::new();
        for (name, price) in [("A", 1000.0), ("B", 1500.0)] {
            dresses.push(
                storage
                    .add_dress(&NewDress::new(shop.id, name, price))
                    .await
                    .unwrap(),
            );
        }
        (storage, shop, dresses)
    }

    #[tokio::test]
    async fn dress_ids_are_sequential() {
        let (_, _, dresses) = seeded().await;
        assert_eq!(dresses[0].id, 1);
        assert_eq!(dresses[1].id, 2);
    }

    #[tokio::test]
    async fn session_for_unknown_shop_is_rejected() {
        let storage = MemoryStorage::new();
        let session = Session::new(Uuid::new_v4(), "op".to_string(), None);
        assert!(matches!(
            storage.save_session(&session).await,
            Err(SwoonError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_swipe_is_absorbed() {
        let (storage, shop, dresses) = seeded().await;
        let session = Session::new(shop.id, "op".to_string(), None);
        storage.save_session(&session).await.unwrap();

        let first = storage
            .insert_swipe_if_absent(session.token, dresses[0].id, false)
            .await
            .unwrap();
        let second = storage
            .insert_swipe_if_absent(session.token, dresses[0].id, true)
            .await
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.event, second.event);
        assert_eq!(storage.count_swipes(session.token).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_inserts_store_one_event() {
        let (storage, shop, dresses) = seeded().await;
        let storage = Arc::new(storage);
        let session = Session::new(shop.id, "op".to_string(), None);
        storage.save_session(&session).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let storage = Arc::clone(&storage);
            let token = session.token;
            let dress_id = dresses[1].id;
            handles.push(tokio::spawn(async move {
                storage
                    .insert_swipe_if_absent(token, dress_id, i % 2 == 0)
                    .await
            }));
        }

        let mut created = 0;
        let mut outcomes = Vec::new();
        for handle in handles {
            let recorded = handle.await.unwrap().unwrap();
            if recorded.created {
                created += 1;
            }
            outcomes.push(recorded.event.liked);
        }

        assert_eq!(created, 1);
        assert!(outcomes.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(storage.count_swipes(session.token).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn complete_session_is_set_once() {
        let (storage, shop, _) = seeded().await;
        let session = Session::new(shop.id, "op".to_string(), None);
        storage.save_session(&session).await.unwrap();

        let at = Utc::now();
        storage.complete_session(session.token, at).await.unwrap();
        let again = storage
            .complete_session(session.token, at + chrono::Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(again.completed_at(), Some(at));
    }

    #[tokio::test]
    async fn unseen_dresses_scoped_to_shop() {
        let (storage, shop, dresses) = seeded().await;
        let other = Shop::new("Other".to_string());
        storage.create_shop(&other).await.unwrap();
        storage
            .add_dress(&NewDress::new(other.id, "Elsewhere", 900.0))
            .await
            .unwrap();

        let session = Session::new(shop.id, "op".to_string(), None);
        storage.save_session(&session).await.unwrap();
        storage
            .insert_swipe_if_absent(session.token, dresses[0].id, true)
            .await
            .unwrap();

        let unseen = storage.unseen_dresses(session.token).await.unwrap();
        assert_eq!(unseen.len(), 1);
        assert_eq!(unseen[0].id, dresses[1].id);
    }

    #[tokio::test]
    async fn swipe_progress_matches_separate_reads() {
        let (storage, shop, dresses) = seeded().await;
        let session = Session::new(shop.id, "op".to_string(), None);
        storage.save_session(&session).await.unwrap();
        storage
            .insert_swipe_if_absent(session.token, dresses[1].id, false)
            .await
            .unwrap();

        let (count, unseen) = storage.swipe_progress(session.token).await.unwrap();
        assert_eq!(count, storage.count_swipes(session.token).await.unwrap());
        assert_eq!(unseen, storage.unseen_dresses(session.token).await.unwrap());
        assert_eq!(count + unseen.len(), dresses.len());
    }
}
