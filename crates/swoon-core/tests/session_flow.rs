//! End-to-end session scenarios against the SQLite backend.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use swoon_core::config::RetryConfig;
use swoon_core::lifecycle::{self, NextStep, Presentation, SessionPolicy};
use swoon_core::model::{Dress, NewDress, PriceRange, Shop};
use swoon_core::ranking::{self, RankQuery, RankingWeights};
use swoon_core::recorder;
use swoon_core::selector;
use swoon_core::storage::{MemoryStorage, SqliteStorage, StorageBackend};
use swoon_core::SwoonError;
use uuid::Uuid;

fn retry() -> RetryConfig {
    RetryConfig {
        max_retries: 5,
        base_delay_ms: 5,
    }
}

async fn shop_with<S>(storage: &S, name: &str, prices: &[f64]) -> (Shop, Vec<Dress>)
where
    S: StorageBackend,
{
    let shop = Shop::new(name.to_string());
    storage.create_shop(&shop).await.unwrap();
    let mut dresses = Vec::new();
    for (i, price) in prices.iter().enumerate() {
        dresses.push(
            storage
                .add_dress(&NewDress::new(shop.id, format!("{name} {i}"), *price))
                .await
                .unwrap(),
        );
    }
    (shop, dresses)
}

fn temp_db() -> PathBuf {
    std::env::temp_dir()
        .join(format!("swoon-it-{}", Uuid::now_v7()))
        .join("swoon.db")
}

#[tokio::test]
async fn exhaustion_ends_session_before_cap() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let (shop, dresses) = shop_with(&storage, "Three", &[1000.0, 1100.0, 1200.0]).await;
    let session = lifecycle::create_session(&storage, shop.id, "stylist", Some("Bea"))
        .await
        .unwrap();
    let policy = SessionPolicy { max_swipes: 20 };
    let mut rng = StdRng::seed_from_u64(7);

    let mut finished = Vec::new();
    for d in &dresses {
        let out = lifecycle::submit(
            &storage,
            session.token,
            d.id,
            true,
            &policy,
            &retry(),
            &mut rng,
        )
        .await
        .unwrap();
        finished.push(out.is_finished());
    }
    assert_eq!(finished, vec![false, false, true]);

    let stored = storage.get_session(session.token).await.unwrap();
    assert!(stored.is_completed());
    assert_eq!(storage.count_swipes(session.token).await.unwrap(), 3);
}

#[tokio::test]
async fn cap_ends_session_with_dresses_left() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let prices: Vec<f64> = (0..50).map(|i| 900.0 + f64::from(i) * 10.0).collect();
    let (shop, _) = shop_with(&storage, "Fifty", &prices).await;
    let session = lifecycle::create_session(&storage, shop.id, "stylist", None)
        .await
        .unwrap();
    let policy = SessionPolicy { max_swipes: 20 };
    let mut rng = StdRng::seed_from_u64(21);

    let mut shown = match lifecycle::present_next(&storage, session.token, &policy, &mut rng)
        .await
        .unwrap()
    {
        Presentation::Dress { dress, .. } => dress,
        Presentation::Terminated => panic!("fresh session should present a dress"),
    };

    for n in 1..=20 {
        let out = lifecycle::submit(
            &storage,
            session.token,
            shown.id,
            n % 2 == 0,
            &policy,
            &retry(),
            &mut rng,
        )
        .await
        .unwrap();
        match out.step {
            NextStep::Continue { next, swipe_count, .. } => {
                assert!(n < 20, "swipe {n} should have finished the session");
                assert_eq!(swipe_count, n);
                shown = next;
            }
            NextStep::Finish { session } => {
                assert_eq!(n, 20);
                assert!(session.is_completed());
            }
        }
    }

    assert_eq!(
        selector::candidates(&storage, &session).await.unwrap().len(),
        30
    );
    assert_eq!(
        lifecycle::present_next(&storage, session.token, &policy, &mut rng)
            .await
            .unwrap(),
        Presentation::Terminated
    );
}

#[tokio::test]
async fn liked_dress_always_ranks_above_disliked() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let (shop, dresses) = shop_with(&storage, "Pair", &[1000.0, 1500.0]).await;
    let (a, b) = (&dresses[0], &dresses[1]);
    let session = lifecycle::create_session(&storage, shop.id, "stylist", None)
        .await
        .unwrap();
    recorder::record_swipe(&storage, session.token, a.id, true, &retry())
        .await
        .unwrap();
    recorder::record_swipe(&storage, session.token, b.id, false, &retry())
        .await
        .unwrap();

    let weights = RankingWeights::default();
    let mut rng = StdRng::from_os_rng();
    for _ in 0..25 {
        let query = RankQuery::new(2);
        let ranked = ranking::rank(&storage, shop.id, session.token, &query, &weights, &mut rng)
            .await
            .unwrap();
        let ids: Vec<_> = ranked.iter().map(|r| r.dress.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }
}

#[tokio::test]
async fn budget_filter_drops_cheaper_dress() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let (shop, dresses) = shop_with(&storage, "Budget", &[1000.0, 1500.0]).await;
    let session = lifecycle::create_session(&storage, shop.id, "stylist", None)
        .await
        .unwrap();

    let query = RankQuery::new(10).with_price(PriceRange::new(Some(1200.0), None));
    let ranked = ranking::rank(
        &storage,
        shop.id,
        session.token,
        &query,
        &RankingWeights::default(),
        &mut StdRng::seed_from_u64(0),
    )
    .await
    .unwrap();

    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].dress.id, dresses[1].id);
}

/// Rank with each bad budget on one backend and collect the error kinds.
async fn bad_budget_kinds<S: StorageBackend>(storage: &S) -> Vec<&'static str> {
    let (shop, _) = shop_with(storage, "Bounds", &[1000.0, 1500.0]).await;
    let session = lifecycle::create_session(storage, shop.id, "stylist", None)
        .await
        .unwrap();

    let mut kinds = Vec::new();
    for price in [
        PriceRange::new(Some(f64::NAN), None),
        PriceRange::new(None, Some(f64::NAN)),
        PriceRange::new(Some(-5.0), None),
        PriceRange::new(Some(1500.0), Some(1000.0)),
    ] {
        let query = RankQuery::new(10).with_price(price);
        let err = ranking::rank(
            storage,
            shop.id,
            session.token,
            &query,
            &RankingWeights::default(),
            &mut StdRng::seed_from_u64(0),
        )
        .await
        .unwrap_err();
        kinds.push(err.kind());

        let listed = storage.list_dresses(shop.id, &price).await.unwrap_err();
        assert!(matches!(listed, SwoonError::InvalidInput(_)));
    }
    kinds
}

#[tokio::test]
async fn invalid_budget_is_rejected_by_both_backends() {
    let sqlite = SqliteStorage::open_in_memory().unwrap();
    let memory = MemoryStorage::new();

    let from_sqlite = bad_budget_kinds(&sqlite).await;
    let from_memory = bad_budget_kinds(&memory).await;

    assert_eq!(from_sqlite, vec!["invalid_input"; 4]);
    assert_eq!(from_sqlite, from_memory);
}

#[tokio::test]
async fn shops_never_see_each_others_dresses() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let (x, x_dresses) = shop_with(&storage, "X", &[1000.0, 1200.0, 1400.0]).await;
    let (_, y_dresses) = shop_with(&storage, "Y", &[1000.0, 1200.0]).await;
    let x_ids: HashSet<_> = x_dresses.iter().map(|d| d.id).collect();

    let session = lifecycle::create_session(&storage, x.id, "stylist", None)
        .await
        .unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..30 {
        let next = selector::next_candidate(&storage, &session, &mut rng)
            .await
            .unwrap()
            .unwrap();
        assert!(x_ids.contains(&next.id));
    }

    let ranked = ranking::rank(
        &storage,
        x.id,
        session.token,
        &RankQuery::new(100),
        &RankingWeights::default(),
        &mut rng,
    )
    .await
    .unwrap();
    assert_eq!(ranked.len(), x_dresses.len());
    assert!(ranked.iter().all(|r| x_ids.contains(&r.dress.id)));

    let err = recorder::record_swipe(&storage, session.token, y_dresses[0].id, true, &retry())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_reference");
}

#[tokio::test]
async fn concurrent_submissions_from_two_connections_store_one_swipe() {
    let path = temp_db();
    let first = Arc::new(SqliteStorage::open(&path).unwrap());
    let second = Arc::new(SqliteStorage::open(&path).unwrap());

    let (shop, dresses) = shop_with(first.as_ref(), "Race", &[1000.0, 2000.0]).await;
    let session = lifecycle::create_session(first.as_ref(), shop.id, "stylist", None)
        .await
        .unwrap();
    let dress = dresses[0].id;

    let mut handles = Vec::new();
    for i in 0..16 {
        let storage = if i % 2 == 0 {
            Arc::clone(&first)
        } else {
            Arc::clone(&second)
        };
        let token = session.token;
        handles.push(tokio::spawn(async move {
            let policy = SessionPolicy::default();
            let mut rng = StdRng::seed_from_u64(i);
            let liked = i % 3 == 0;
            lifecycle::submit(storage.as_ref(), token, dress, liked, &policy, &retry(), &mut rng)
                .await
        }));
    }

    let mut created = 0;
    let mut stored = HashSet::new();
    for handle in handles {
        let out = handle.await.unwrap().unwrap();
        created += usize::from(out.recorded.created);
        stored.insert(out.recorded.event.liked);
    }
    assert_eq!(created, 1);
    assert_eq!(stored.len(), 1);
    assert_eq!(second.count_swipes(session.token).await.unwrap(), 1);

    drop(first);
    drop(second);
    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[tokio::test]
async fn progress_snapshot_stays_consistent_under_concurrent_swipes() {
    let path = temp_db();
    let writer = Arc::new(SqliteStorage::open(&path).unwrap());
    let reader = SqliteStorage::open(&path).unwrap();

    let prices: Vec<f64> = (0..12).map(|i| 1000.0 + i as f64).collect();
    let (shop, dresses) = shop_with(writer.as_ref(), "Snapshot", &prices).await;
    let session = lifecycle::create_session(writer.as_ref(), shop.id, "stylist", None)
        .await
        .unwrap();

    let token = session.token;
    let ids: Vec<_> = dresses.iter().map(|d| d.id).collect();
    let swiper = {
        let writer = Arc::clone(&writer);
        tokio::spawn(async move {
            for id in ids {
                writer.insert_swipe_if_absent(token, id, true).await.unwrap();
            }
        })
    };

    // Every swipe moves one dress from unseen to counted, so a consistent
    // read always sums to the catalog size.
    for _ in 0..50 {
        let (count, unseen) = reader.swipe_progress(token).await.unwrap();
        assert_eq!(count + unseen.len(), dresses.len());
    }
    swiper.await.unwrap();

    let (count, unseen) = reader.swipe_progress(token).await.unwrap();
    assert_eq!(count, dresses.len());
    assert!(unseen.is_empty());

    drop(writer);
    drop(reader);
    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[tokio::test]
async fn session_survives_reopen() {
    let path = temp_db();
    let (token, dress) = {
        let storage = SqliteStorage::open(&path).unwrap();
        let (shop, dresses) = shop_with(&storage, "Durable", &[1000.0, 1100.0]).await;
        let session = lifecycle::create_session(&storage, shop.id, "stylist", None)
            .await
            .unwrap();
        recorder::record_swipe(&storage, session.token, dresses[0].id, true, &retry())
            .await
            .unwrap();
        (session.token, dresses[0].id)
    };

    let reopened = SqliteStorage::open(&path).unwrap();
    let swipes = reopened.swipes_for_session(token).await.unwrap();
    assert_eq!(swipes.len(), 1);
    assert_eq!(swipes[0].dress_id, dress);
    assert!(swipes[0].liked);

    drop(reopened);
    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}
