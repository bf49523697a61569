use anyhow::Context;
use blobpath_core::{BlobPath, BlobResult, BlobStore, Executor};
use blobpath_store_local::{LocalBlobStore, LocalStoreConfig};
use blobpath_store_url::{UrlBlobStore, UrlStoreConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlobpathConfig {
    #[serde(default)]
    pub store: BTreeMap<String, StoreConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum StoreConfig {
    Url(UrlStoreConfig),
    Local(LocalStoreConfig),
}

impl BlobpathConfig {
    pub fn load(file: &Path) -> anyhow::Result<Self> {
        let toml_content = std::fs::read_to_string(file)
            .with_context(|| format!("failed to read config file {}", file.display()))?;
        let config = toml::from_str(&toml_content)
            .with_context(|| format!("invalid config file {}", file.display()))?;
        Ok(config)
    }

    pub fn store(&self, name: &str) -> anyhow::Result<&StoreConfig> {
        self.store
            .get(name)
            .with_context(|| format!("no store named '{name}' present in config"))
    }
}

/// A store built from config, keeping its concrete type for the commands
/// that need backend-specific information.
#[derive(Debug)]
pub enum ConfiguredStore {
    Url(UrlBlobStore),
    Local(LocalBlobStore),
}

impl ConfiguredStore {
    pub fn as_store(&self) -> &dyn BlobStore {
        match self {
            ConfiguredStore::Url(store) => store,
            ConfiguredStore::Local(store) => store,
        }
    }

    /// Where the blob `name` under `path` lives, or the container itself
    /// when `name` is absent.
    pub fn locate(&self, path: &BlobPath, name: Option<&str>) -> BlobResult<String> {
        match self {
            ConfiguredStore::Url(store) => {
                let container = store.container_for(path)?;
                Ok(match name {
                    Some(name) => container.blob_url(name)?.to_string(),
                    None => container.location().to_string(),
                })
            }
            ConfiguredStore::Local(store) => {
                let container = store.container_for(path)?;
                Ok(match name {
                    Some(name) => container.blob_file(name)?.display().to_string(),
                    None => container.dir().display().to_string(),
                })
            }
        }
    }
}

pub fn create_store(config: StoreConfig, executor: Executor) -> BlobResult<ConfiguredStore> {
    let store = match config {
        StoreConfig::Url(config) => ConfiguredStore::Url(UrlBlobStore::create(config, executor)?),
        StoreConfig::Local(config) => {
            ConfiguredStore::Local(LocalBlobStore::create(config, executor)?)
        }
    };
    Ok(store)
}
