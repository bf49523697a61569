use async_trait::async_trait;
use blobpath_core::{
    BlobContainer, BlobMetadata, BlobPath, BlobResult, BlobStoreError, BlockingReadStream,
    ByteStream,
};
use bytes::Bytes;
use std::collections::BTreeMap;
use url::Url;

use crate::store::{UrlBlobStore, resolve};
use crate::{NO_LISTING, READ_ONLY};

/// Read access to the blobs under one composed URL.
#[derive(Debug, Clone)]
pub struct UrlBlobContainer {
    store: UrlBlobStore,
    path: BlobPath,
    location: Url,
}

impl UrlBlobContainer {
    pub(crate) fn new(store: UrlBlobStore, path: BlobPath, location: Url) -> Self {
        Self {
            store,
            path,
            location,
        }
    }

    /// The URL this container was bound to.
    pub fn location(&self) -> &Url {
        &self.location
    }

    /// The URL `name` is read from.
    pub fn blob_url(&self, name: &str) -> BlobResult<Url> {
        resolve(&self.location, name)
            .map_err(|e| BlobStoreError::malformed_location(&self.path.add(name), e))
    }
}

#[async_trait]
impl BlobContainer for UrlBlobContainer {
    fn path(&self) -> &BlobPath {
        &self.path
    }

    async fn blob_exists(&self, name: &str) -> BlobResult<bool> {
        let url = self.blob_url(name)?;
        let opener = self.store.opener().clone();
        let probe = url.clone();
        self.store
            .executor()
            .run_blocking(move || opener.exists(&probe))
            .await
            .map_err(|e| BlobStoreError::io(url, e))
    }

    async fn read_blob(&self, name: &str) -> BlobResult<ByteStream> {
        let url = self.blob_url(name)?;
        tracing::debug!(location = %url, "url store: opening blob");
        let opener = self.store.opener().clone();
        let target = url.clone();
        let reader = self
            .store
            .executor()
            .run_blocking(move || opener.open(&target))
            .await
            .map_err(|e| BlobStoreError::io(url, e))?;

        Ok(Box::new(BlockingReadStream::new(
            self.store.executor().clone(),
            reader,
            self.store.buffer_size_in_bytes(),
        )))
    }

    async fn write_blob(&self, _name: &str, _data: Bytes) -> BlobResult<()> {
        Err(BlobStoreError::unsupported("write_blob", READ_ONLY))
    }

    async fn delete_blob(&self, _name: &str) -> BlobResult<()> {
        Err(BlobStoreError::unsupported("delete_blob", READ_ONLY))
    }

    async fn list_blobs_by_prefix(
        &self,
        _prefix: Option<&str>,
    ) -> BlobResult<BTreeMap<String, BlobMetadata>> {
        Err(BlobStoreError::unsupported("list_blobs", NO_LISTING))
    }
}
