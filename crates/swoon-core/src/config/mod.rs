use crate::error::{Result, SwoonError};
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwoonConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    /// Custom path for SQLite database. Defaults to `~/.config/swoon/swoon.db`.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_web_port")]
    pub port: u16,
    #[serde(default = "default_web_host")]
    pub host: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: default_web_port(),
            host: default_web_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Swipes after which a session ends even if unseen dresses remain.
    #[serde(default = "default_max_swipes")]
    pub max_swipes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_swipes: default_max_swipes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_like_weight")]
    pub like_weight: f64,
    /// Subtracted once per dislike.
    #[serde(default = "default_dislike_weight")]
    pub dislike_weight: f64,
    /// Upper (exclusive) bound of the per-dress random jitter. 0 disables it.
    #[serde(default = "default_exploration")]
    pub exploration: f64,
    #[serde(default = "default_result_limit")]
    pub default_limit: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            like_weight: default_like_weight(),
            dislike_weight: default_dislike_weight(),
            exploration: default_exploration(),
            default_limit: default_result_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Valid storage backend names.
pub const VALID_STORAGE_BACKENDS: &[&str] = &["sqlite", "memory"];

// -- Defaults --

fn default_storage_backend() -> String {
    "sqlite".to_string()
}
fn default_web_port() -> u16 {
    38080
}
fn default_web_host() -> String {
    "127.0.0.1".to_string()
}
fn default_max_swipes() -> usize {
    20
}
fn default_like_weight() -> f64 {
    2.0
}
fn default_dislike_weight() -> f64 {
    1.0
}
fn default_exploration() -> f64 {
    0.5
}
fn default_result_limit() -> usize {
    10
}
fn default_max_retries() -> usize {
    3
}
fn default_base_delay_ms() -> u64 {
    20
}

impl SwoonConfig {
    /// Load configuration with three-layer TOML merge:
    /// 1. ~/.config/swoon/config.toml (global)
    /// 2. .swoon/config.toml (project)
    /// 3. .swoon/config.local.toml (local, gitignored)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        // Layer 1: Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        // Layer 2: Project config
        if let Some(dir) = project_dir {
            let project_config = dir.join(".swoon").join("config.toml");
            if project_config.exists() {
                builder = builder.add_source(File::from(project_config).required(false));
            }

            // Layer 3: Local config (gitignored)
            let local_config = dir.join(".swoon").join("config.local.toml");
            if local_config.exists() {
                builder = builder.add_source(File::from(local_config).required(false));
            }
        }

        let config = builder
            .build()
            .map_err(|e| SwoonError::Config(e.to_string()))?;

        let mut cfg: Self = config
            .try_deserialize()
            .map_err(|e| SwoonError::Config(e.to_string()))?;

        cfg.validate();
        Ok(cfg)
    }

    /// Load with defaults only (no files).
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SwoonError::Config(e.to_string()))
    }

    /// Validate config values, clamping out-of-range values and logging warnings.
    /// Lenient: it fixes values rather than rejecting the config.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !VALID_STORAGE_BACKENDS.contains(&self.storage.backend.as_str()) {
            warnings.push(format!(
                "unknown storage backend '{}', valid: {}",
                self.storage.backend,
                VALID_STORAGE_BACKENDS.join(", ")
            ));
        }

        if self.session.max_swipes == 0 {
            warnings.push("session.max_swipes = 0, setting to 1".to_string());
            self.session.max_swipes = 1;
        }
        if self.ranking.default_limit == 0 {
            warnings.push("ranking.default_limit = 0, setting to 1".to_string());
            self.ranking.default_limit = 1;
        }

        // Weights and jitter must be finite and non-negative
        let float_checks: Vec<(&str, &mut f64)> = vec![
            ("ranking.like_weight", &mut self.ranking.like_weight),
            ("ranking.dislike_weight", &mut self.ranking.dislike_weight),
            ("ranking.exploration", &mut self.ranking.exploration),
        ];
        for (name, val) in float_checks {
            if !val.is_finite() || *val < 0.0 {
                warnings.push(format!("{name} = {val} must be >= 0, setting to 0"));
                *val = 0.0;
            }
        }

        // Jitter wider than the like/dislike gap would let noise reorder decisions
        let gap = self.ranking.like_weight.min(self.ranking.dislike_weight);
        if gap > 0.0 && self.ranking.exploration > gap {
            warnings.push(format!(
                "ranking.exploration ({:.2}) exceeds the smallest swipe weight ({:.2}), clamping",
                self.ranking.exploration, gap
            ));
            self.ranking.exploration = gap;
        }

        for w in &warnings {
            tracing::warn!("config: {}", w);
        }

        warnings
    }
}

/// `~/.config/swoon/config.toml`, or `None` when there is no config directory.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("swoon").join("config.toml"))
}
