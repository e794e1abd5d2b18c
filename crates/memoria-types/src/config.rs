//! Configuration types for Memoria.
//!
//! `MemoriaConfig` represents `memoria.toml`: where cache databases and vector
//! index files live, and how logging is set up.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration. All fields have defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoriaConfig {
    /// Directory holding one `{name}.db` file per memoized operation family.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Directory holding one `{name}.vdb` file per vector index.
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// Dimension used when creating a vector index that has no file yet.
    #[serde(default)]
    pub default_dimension: Option<usize>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("index")
}

impl Default for MemoriaConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            index_dir: default_index_dir(),
            default_dimension: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl MemoriaConfig {
    /// Location of the cache database for `name`.
    pub fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{name}.db"))
    }

    /// Location of the vector index file for `name`.
    pub fn index_path(&self, name: &str) -> PathBuf {
        self.index_dir.join(format!("{name}.vdb"))
    }

    /// Rebase relative directories onto `base`.
    pub fn rooted_at(mut self, base: &std::path::Path) -> Self {
        if self.cache_dir.is_relative() {
            self.cache_dir = base.join(&self.cache_dir);
        }
        if self.index_dir.is_relative() {
            self.index_dir = base.join(&self.index_dir);
        }
        self
    }
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,

    /// Bridge spans to OpenTelemetry (stdout exporter).
    #[serde(default)]
    pub otel: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            otel: false,
        }
    }
}
