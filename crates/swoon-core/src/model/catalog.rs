use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SwoonError};

pub const MAX_NAME_LENGTH: usize = 255;

/// Catalog-scoped dress identifier.
pub type DressId = i64;

/// Validate inputs for adding a dress to a shop catalog.
pub fn validate_new_dress(input: &NewDress) -> Result<()> {
    let trimmed = input.name.trim();
    if trimmed.is_empty() {
        return Err(SwoonError::InvalidInput("dress name cannot be empty".into()));
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(SwoonError::InvalidInput(format!(
            "dress name exceeds maximum length of {MAX_NAME_LENGTH} characters"
        )));
    }
    if !input.price.is_finite() || input.price < 0.0 {
        return Err(SwoonError::InvalidInput(
            "price must be a non-negative number".into(),
        ));
    }
    Ok(())
}

/// Validate a shop name before registering it.
pub fn validate_shop_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SwoonError::InvalidInput("shop name cannot be empty".into()));
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(SwoonError::InvalidInput(format!(
            "shop name exceeds maximum length of {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Shop {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
        }
    }
}

/// A catalog record. The swipe engine only reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dress {
    pub id: DressId,
    pub shop_id: Uuid,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub silhouette: String,
    #[serde(default)]
    pub neckline: String,
    #[serde(default)]
    pub fabric: String,
    /// Units on hand. Informational; selection ignores it.
    #[serde(default)]
    pub stock: u32,
    /// Free-form size span, e.g. "0-18".
    #[serde(default)]
    pub size_range: String,
    /// Comma-separated style keywords.
    #[serde(default)]
    pub style_tags: String,
    pub created_at: DateTime<Utc>,
}

/// Input for adding a dress. The backend assigns the id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDress {
    pub shop_id: Uuid,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub silhouette: String,
    #[serde(default)]
    pub neckline: String,
    #[serde(default)]
    pub fabric: String,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub size_range: String,
    #[serde(default)]
    pub style_tags: String,
}

impl NewDress {
    pub fn new(shop_id: Uuid, name: impl Into<String>, price: f64) -> Self {
        Self {
            shop_id,
            name: name.into(),
            price,
            ..Default::default()
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_silhouette(mut self, silhouette: impl Into<String>) -> Self {
        self.silhouette = silhouette.into();
        self
    }

    pub fn with_neckline(mut self, neckline: impl Into<String>) -> Self {
        self.neckline = neckline.into();
        self
    }

    pub fn with_fabric(mut self, fabric: impl Into<String>) -> Self {
        self.fabric = fabric.into();
        self
    }

    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_size_range(mut self, size_range: impl Into<String>) -> Self {
        self.size_range = size_range.into();
        self
    }

    pub fn with_style_tags(mut self, style_tags: impl Into<String>) -> Self {
        self.style_tags = style_tags.into();
        self
    }

    /// Materialize into a stored record once the backend has picked an id.
    pub fn into_dress(self, id: DressId, created_at: DateTime<Utc>) -> Dress {
        Dress {
            id,
            shop_id: self.shop_id,
            name: self.name.trim().to_string(),
            price: self.price,
            brand: self.brand,
            color: self.color,
            silhouette: self.silhouette,
            neckline: self.neckline,
            fabric: self.fabric,
            stock: self.stock,
            size_range: self.size_range,
            style_tags: self.style_tags,
            created_at,
        }
    }
}

/// Optional budget bounds. Both ends are inclusive and independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// Build a range from caller-supplied bounds. Bounds must be finite and
    /// non-negative, and `min` may not exceed `max`.
    pub fn validated(min: Option<f64>, max: Option<f64>) -> Result<Self> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, bound) in [("price_min", self.min), ("price_max", self.max)] {
            if let Some(v) = bound {
                if !v.is_finite() || v < 0.0 {
                    return Err(SwoonError::InvalidInput(format!(
                        "{name} must be a non-negative number"
                    )));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(SwoonError::InvalidInput(
                    "price_min cannot exceed price_max".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn contains(&self, price: f64) -> bool {
        self.min.map_or(true, |min| price >= min) && self.max.map_or(true, |max| price <= max)
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}
