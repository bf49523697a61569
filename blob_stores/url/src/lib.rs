//! Read-only blob store over URLs.
//!
//! A container's location is composed by resolving every path segment,
//! followed by `/`, against the previous location, starting from the base
//! URL. Blobs are read from `location.join(name)`. Opening and reading run
//! on the executor handed to the store; writes, deletes and listings are
//! always rejected.

mod container;
mod open;
mod store;

pub use container::UrlBlobContainer;
pub use open::{BlobReader, SchemeOpener, UrlOpener};
pub use store::{UrlBlobStore, compose};

use blobpath_core::Settings;

pub(crate) const READ_ONLY: &str = "URL repository is read only";
pub(crate) const NO_LISTING: &str = "URL repository does not support listing";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct UrlStoreConfig {
    pub url: String,
    #[serde(default)]
    pub settings: Settings,
}
