//! Runtime settings for the demo binaries.
//!
//! Layered figment sources: `config.toml`, then a `RUST_ENV`-selected overlay
//! (`config.dev.toml` and friends), then `APP_*` environment variables where
//! a double underscore separates sections (`APP_STORE__TABLE_NAME`).

use std::path::PathBuf;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Directory holding the LanceDB database files.
    pub lancedb_dir: String,
    pub table_name: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            lancedb_dir: "./mmdb_data/lancedb".to_string(),
            table_name: "mm_contents".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { dim: 512 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Default ingest directory when none is given on the command line.
    pub raw_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { raw_dir: "./dev_data".to_string() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub embedding: EmbeddingSettings,
    pub data: DataSettings,
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = std::env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Figment::new()
            .merge(Toml::file("config.toml"))
            .merge(Toml::file(format!("config.{env_name}.toml")))
            .merge(Env::prefixed("APP_").split("__"))
            .extract()
            .map_err(|e| anyhow::anyhow!("configuration error: {e}"))
    }

    pub fn store_dir(&self) -> PathBuf {
        expand_path(&self.store.lancedb_dir)
    }

    pub fn raw_data_dir(&self) -> PathBuf {
        expand_path(&self.data.raw_dir)
    }
}

/// `~` and `$VAR` expansion for user-supplied paths; no canonicalization.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let raw = input.as_ref();
    let with_env = shellexpand::env(raw).unwrap_or(std::borrow::Cow::Borrowed(raw));
    PathBuf::from(shellexpand::tilde(with_env.as_ref()).as_ref())
}
