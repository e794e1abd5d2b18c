//! Configuration loader for Memoria.
//!
//! Reads `memoria.toml` from the data directory and deserializes it into
//! [`MemoriaConfig`]. A missing or malformed file yields defaults. Relative
//! store directories are resolved against the data directory.

use std::path::{Path, PathBuf};

use memoria_types::config::MemoriaConfig;

/// File name looked up inside the data directory.
pub const CONFIG_FILE: &str = "memoria.toml";

/// Load configuration from `{data_dir}/memoria.toml`.
pub async fn load_config(data_dir: &Path) -> MemoriaConfig {
    let config_path = data_dir.join(CONFIG_FILE);

    let config = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => match toml::from_str::<MemoriaConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    "Failed to parse {}: {err}, using defaults",
                    config_path.display()
                );
                MemoriaConfig::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {CONFIG_FILE} found at {}, using defaults", config_path.display());
            MemoriaConfig::default()
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            MemoriaConfig::default()
        }
    };

    config.rooted_at(data_dir)
}

/// Resolve the data directory.
///
/// Priority:
/// 1. `MEMORIA_DATA_DIR` environment variable
/// 2. `~/.memoria`
/// 3. `.memoria` in the current directory
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MEMORIA_DATA_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".memoria");
    }
    PathBuf::from(".memoria")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config.cache_dir, tmp.path().join("cache"));
        assert_eq!(config.index_dir, tmp.path().join("index"));
        assert!(config.default_dimension.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
cache_dir = "llm"
index_dir = "/var/lib/memoria/index"
default_dimension = 1536

[logging]
level = "debug"
json = true
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.cache_dir, tmp.path().join("llm"));
        assert_eq!(config.index_dir, PathBuf::from("/var/lib/memoria/index"));
        assert_eq!(config.default_dimension, Some(1536));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert!(!config.logging.otel);
        assert_eq!(
            config.cache_path("llm_cache"),
            tmp.path().join("llm/llm_cache.db")
        );
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join(CONFIG_FILE), "default_dimension = [[[")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.cache_dir, tmp.path().join("cache"));
        assert!(config.default_dimension.is_none());
    }
}
