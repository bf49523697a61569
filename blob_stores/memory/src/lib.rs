use async_trait::async_trait;
use blobpath_core::{
    BlobContainer, BlobMetadata, BlobPath, BlobResult, BlobStore, BlobStoreError, ByteStream,
    StoreFeatures,
};
use bytes::Bytes;
use dashmap::DashMap;
use blobpath_core::path::check_component;
use futures::stream;
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

/// Keys are `segment/segment/.../name`.
type Files = Arc<DashMap<String, Bytes>>;

#[derive(Debug, Clone)]
pub struct MemoryBlobStore {
    files: Files,
}

impl MemoryBlobStore {
    /// Creates a new, empty `MemoryBlobStore`.
    pub fn new() -> Self {
        Self {
            files: Arc::new(DashMap::new()),
        }
    }

    /// Binds a container to `path`. Segments follow the same rules as blob
    /// names, so no two containers share a key space.
    pub fn container_for(&self, path: &BlobPath) -> BlobResult<MemoryBlobContainer> {
        path.check_segments()?;
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path.build_as_string("/"))
        };
        Ok(MemoryBlobContainer {
            files: self.files.clone(),
            path: path.clone(),
            prefix,
        })
    }

    /// Total number of blobs held, across all paths.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn blob_container(&self, path: &BlobPath) -> BlobResult<Box<dyn BlobContainer>> {
        Ok(Box::new(self.container_for(path)?))
    }

    /// Removes every blob at or below `path`.
    async fn delete(&self, path: &BlobPath) -> BlobResult<()> {
        let prefix = self.container_for(path)?.prefix;
        self.files.retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    fn close(&self) {}

    fn features(&self) -> StoreFeatures {
        StoreFeatures {
            read_only: false,
            supports_listing: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryBlobContainer {
    files: Files,
    path: BlobPath,
    prefix: String,
}

impl MemoryBlobContainer {
    fn key(&self, name: &str) -> BlobResult<String> {
        check_component(name)
            .map_err(|e| BlobStoreError::malformed_location(&self.path.add(name), e))?;
        Ok(format!("{}{}", self.prefix, name))
    }
}

#[async_trait]
impl BlobContainer for MemoryBlobContainer {
    fn path(&self) -> &BlobPath {
        &self.path
    }

    async fn blob_exists(&self, name: &str) -> BlobResult<bool> {
        Ok(self.files.contains_key(&self.key(name)?))
    }

    /// Returns a single-chunk stream over the stored bytes.
    async fn read_blob(&self, name: &str) -> BlobResult<ByteStream> {
        let key = self.key(name)?;
        let bytes = self
            .files
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BlobStoreError::io(key, io::Error::from(io::ErrorKind::NotFound)))?;
        let future = Box::pin(async { Ok::<_, io::Error>(bytes) });
        Ok(Box::new(stream::once(future)))
    }

    async fn write_blob(&self, name: &str, data: Bytes) -> BlobResult<()> {
        self.files.insert(self.key(name)?, data);
        Ok(())
    }

    async fn delete_blob(&self, name: &str) -> BlobResult<()> {
        self.files.remove(&self.key(name)?);
        Ok(())
    }

    async fn list_blobs_by_prefix(
        &self,
        prefix: Option<&str>,
    ) -> BlobResult<BTreeMap<String, BlobMetadata>> {
        let wanted = format!("{}{}", self.prefix, prefix.unwrap_or_default());
        let blobs = self
            .files
            .iter()
            .filter(|entry| entry.key().starts_with(&wanted))
            .filter_map(|entry| {
                let name = &entry.key()[self.prefix.len()..];
                // deeper keys belong to nested containers
                (!name.contains('/')).then(|| {
                    let metadata = BlobMetadata {
                        name: name.to_owned(),
                        length: entry.value().len() as u64,
                    };
                    (metadata.name.clone(), metadata)
                })
            })
            .collect();
        Ok(blobs)
    }
}
