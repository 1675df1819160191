//! Demo catalog for trying sessions end to end.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;

use crate::error::{Result, SwoonError};
use crate::model::{NewDress, Shop};
use crate::storage::StorageBackend;

pub const DEMO_SHOP_NAME: &str = "Luna Bridal Atelier";
pub const DEMO_DRESS_COUNT: usize = 30;

const SILHOUETTES: &[&str] = &["A-Line", "Mermaid", "Ballgown", "Sheath", "Fit & Flare"];
const NECKLINES: &[&str] = &["Sweetheart", "V-neck", "Off-shoulder", "Scoop", "Halter"];
const FABRICS: &[&str] = &["Lace", "Chiffon", "Satin", "Tulle", "Crepe"];
const COLORS: &[&str] = &["Ivory", "Champagne", "Blush", "Snow", "Sand"];
const BRANDS: &[&str] = &["Eloise", "Atelier Rose", "Marina", "Aurora", "Celeste"];
const SIZE_RANGE: &str = "0-18";
const STYLE_TAGS: &str = "romantic, modern";

#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    pub shop: Shop,
    pub dresses_created: usize,
    /// True when the shop already had dresses and nothing was added.
    pub skipped: bool,
}

fn choose<R: Rng + ?Sized>(palette: &[&str], rng: &mut R) -> Result<String> {
    palette
        .choose(rng)
        .map(|s| s.to_string())
        .ok_or_else(|| SwoonError::InvalidInput("empty palette".to_string()))
}

/// Create the demo shop (reusing it if one with the same name exists) and
/// fill it with dresses. Does nothing to a demo shop that already has stock.
pub async fn seed_demo<S, R>(storage: &S, rng: &mut R) -> Result<SeedReport>
where
    S: StorageBackend,
    R: Rng + ?Sized,
{
    let existing = storage
        .list_shops()
        .await?
        .into_iter()
        .find(|s| s.name == DEMO_SHOP_NAME);
    let shop = match existing {
        Some(shop) => shop,
        None => {
            let shop = Shop::new(DEMO_SHOP_NAME.to_string());
            storage.create_shop(&shop).await?;
            shop
        }
    };

    let stocked = storage
        .list_dresses(shop.id, &Default::default())
        .await?;
    if !stocked.is_empty() {
        tracing::warn!(
            shop = %shop.id,
            dresses = stocked.len(),
            "demo dresses already exist, skipping"
        );
        return Ok(SeedReport {
            shop,
            dresses_created: 0,
            skipped: true,
        });
    }

    for index in 1..=DEMO_DRESS_COUNT {
        let price = f64::from(rng.random_range(900u32..=3500));
        let input = NewDress::new(shop.id, format!("Luna {index}"), price)
            .with_color(choose(COLORS, rng)?)
            .with_brand(choose(BRANDS, rng)?)
            .with_silhouette(choose(SILHOUETTES, rng)?)
            .with_neckline(choose(NECKLINES, rng)?)
            .with_fabric(choose(FABRICS, rng)?)
            .with_size_range(SIZE_RANGE)
            .with_style_tags(STYLE_TAGS);
        storage.add_dress(&input).await?;
    }

    tracing::info!(shop = %shop.id, dresses = DEMO_DRESS_COUNT, "seeded demo catalog");
    Ok(SeedReport {
        shop,
        dresses_created: DEMO_DRESS_COUNT,
        skipped: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PriceRange;
    use crate::storage::MemoryStorage;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[tokio::test]
    async fn test_seed_creates_catalog() {
        let storage = MemoryStorage::new();
        let report = seed_demo(&storage, &mut StdRng::seed_from_u64(3))
            .await
            .unwrap();
        assert!(!report.skipped);
        assert_eq!(report.dresses_created, DEMO_DRESS_COUNT);

        let dresses = storage
            .list_dresses(report.shop.id, &PriceRange::default())
            .await
            .unwrap();
        assert_eq!(dresses.len(), DEMO_DRESS_COUNT);
        assert!(dresses.iter().any(|d| d.name == "Luna 1"));
        assert!(dresses.iter().any(|d| d.name == "Luna 30"));
        for d in &dresses {
            assert!((900.0..=3500.0).contains(&d.price));
            assert!(SILHOUETTES.contains(&d.silhouette.as_str()));
            assert!(BRANDS.contains(&d.brand.as_str()));
            assert_eq!(d.size_range, "0-18");
            assert_eq!(d.style_tags, "romantic, modern");
            assert_eq!(d.stock, 0);
        }
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let storage = MemoryStorage::new();
        let mut rng = StdRng::seed_from_u64(3);
        let first = seed_demo(&storage, &mut rng).await.unwrap();
        let second = seed_demo(&storage, &mut rng).await.unwrap();

        assert!(second.skipped);
        assert_eq!(second.dresses_created, 0);
        assert_eq!(first.shop.id, second.shop.id);
        assert_eq!(storage.list_shops().await.unwrap().len(), 1);
    }
}
