use async_trait::async_trait;
use blobpath_core::settings::buffer_size_from;
use blobpath_core::{
    BlobContainer, BlobPath, BlobResult, BlobStore, BlobStoreError, Executor, Settings,
    StoreFeatures,
};
use std::fmt;
use std::sync::Arc;
use url::Url;

use crate::container::UrlBlobContainer;
use crate::open::{SchemeOpener, UrlOpener};
use crate::{READ_ONLY, UrlStoreConfig};

/// Read-only blob store over a base URL.
///
/// Recognised settings:
///
/// - `buffer_size`: chunk size of streamed reads, defaults to `100kb`.
#[derive(Clone)]
pub struct UrlBlobStore {
    base: Url,
    buffer_size: usize,
    executor: Executor,
    opener: Arc<dyn UrlOpener>,
}

impl UrlBlobStore {
    pub fn new(settings: &Settings, executor: Executor, base: Url) -> BlobResult<Self> {
        Self::with_opener(settings, executor, base, Arc::new(SchemeOpener::new()))
    }

    /// Like [`UrlBlobStore::new`], reading through a custom opener.
    pub fn with_opener(
        settings: &Settings,
        executor: Executor,
        base: Url,
        opener: Arc<dyn UrlOpener>,
    ) -> BlobResult<Self> {
        if base.cannot_be_a_base() {
            return Err(BlobStoreError::configuration(format!(
                "base URL {base} cannot be used to resolve relative locations"
            )));
        }
        let buffer_size = buffer_size_from(settings)?;
        Ok(Self {
            base,
            buffer_size,
            executor,
            opener,
        })
    }

    pub fn create(config: UrlStoreConfig, executor: Executor) -> BlobResult<Self> {
        let base = Url::parse(&config.url).map_err(|e| BlobStoreError::Configuration {
            message: format!("malformed base URL '{}'", config.url),
            source: Some(e.into()),
        })?;
        Self::new(&config.settings, executor, base)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn buffer_size_in_bytes(&self) -> usize {
        self.buffer_size
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub(crate) fn opener(&self) -> &Arc<dyn UrlOpener> {
        &self.opener
    }

    /// Composes the location of the container at `path`.
    pub fn compose(&self, path: &BlobPath) -> BlobResult<Url> {
        compose(&self.base, path)
    }

    /// Typed variant of [`BlobStore::blob_container`].
    pub fn container_for(&self, path: &BlobPath) -> BlobResult<UrlBlobContainer> {
        let location = self.compose(path)?;
        tracing::debug!(%path, %location, "url store: bound container");
        Ok(UrlBlobContainer::new(self.clone(), path.clone(), location))
    }
}

/// Resolves each segment, followed by `/`, against the previous location,
/// starting from `base`. The empty path composes to `base` itself.
pub fn compose(base: &Url, path: &BlobPath) -> BlobResult<Url> {
    let mut url = base.clone();
    for segment in path.segments() {
        url = resolve(&url, &format!("{segment}/"))
            .map_err(|e| BlobStoreError::malformed_location(path, e))?;
    }
    Ok(url)
}

/// Resolves `reference` against `parent`, rejecting results that do not
/// add a component below the parent's directory.
pub(crate) fn resolve(parent: &Url, reference: &str) -> Result<Url, InvalidComponent> {
    let next = parent
        .join(reference)
        .map_err(|e| InvalidComponent::new(reference, e.to_string()))?;

    let dir = match parent.path().rfind('/') {
        Some(i) => &parent.path()[..=i],
        None => "",
    };
    let same_origin = next.scheme() == parent.scheme()
        && next.username() == parent.username()
        && next.password() == parent.password()
        && next.host_str() == parent.host_str()
        && next.port() == parent.port();
    let below = next.path().len() > dir.len() && next.path().starts_with(dir);

    if !same_origin || !below || next.query().is_some() || next.fragment().is_some() {
        return Err(InvalidComponent::new(
            reference,
            format!("resolves to {next}, outside of {parent}"),
        ));
    }
    Ok(next)
}

#[derive(Debug)]
pub(crate) struct InvalidComponent {
    reference: String,
    reason: String,
}

impl InvalidComponent {
    fn new(reference: &str, reason: String) -> Self {
        Self {
            reference: reference.to_owned(),
            reason,
        }
    }
}

impl fmt::Display for InvalidComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid component '{}': {}", self.reference, self.reason)
    }
}

impl std::error::Error for InvalidComponent {}

impl fmt::Display for UrlBlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.base, f)
    }
}

impl fmt::Debug for UrlBlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlBlobStore")
            .field("base", &self.base.as_str())
            .field("buffer_size", &self.buffer_size)
            .finish()
    }
}

#[async_trait]
impl BlobStore for UrlBlobStore {
    fn blob_container(&self, path: &BlobPath) -> BlobResult<Box<dyn BlobContainer>> {
        Ok(Box::new(self.container_for(path)?))
    }

    async fn delete(&self, _path: &BlobPath) -> BlobResult<()> {
        Err(BlobStoreError::unsupported("delete", READ_ONLY))
    }

    fn close(&self) {
        // nothing owned; the executor belongs to the caller
    }

    fn features(&self) -> StoreFeatures {
        StoreFeatures {
            read_only: true,
            supports_listing: false,
        }
    }
}
