use async_trait::async_trait;
use blobpath_core::path::check_component;
use blobpath_core::settings::buffer_size_from;
use blobpath_core::{
    BlobContainer, BlobMetadata, BlobPath, BlobResult, BlobStore, BlobStoreError,
    BlockingReadStream, ByteStream, Executor, Settings, StoreFeatures,
};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct LocalStoreConfig {
    pub base_path: String,
    #[serde(default)]
    pub settings: Settings,
}

/// Blob store rooted at a local directory. Each path segment is a
/// directory level and each blob a regular file.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    base_path: PathBuf,
    buffer_size: usize,
    executor: Executor,
}

impl LocalBlobStore {
    pub fn new(
        settings: &Settings,
        executor: Executor,
        base_path: impl Into<PathBuf>,
    ) -> BlobResult<Self> {
        Ok(LocalBlobStore {
            base_path: base_path.into(),
            buffer_size: buffer_size_from(settings)?,
            executor,
        })
    }

    pub fn create(config: LocalStoreConfig, executor: Executor) -> BlobResult<Self> {
        Self::new(&config.settings, executor, config.base_path)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn buffer_size_in_bytes(&self) -> usize {
        self.buffer_size
    }

    fn resolve_path(&self, path: &BlobPath) -> BlobResult<PathBuf> {
        path.check_segments()?;
        let mut dir = self.base_path.clone();
        dir.extend(path.segments());
        Ok(dir)
    }

    pub fn container_for(&self, path: &BlobPath) -> BlobResult<LocalBlobContainer> {
        let dir = self.resolve_path(path)?;
        Ok(LocalBlobContainer {
            store: self.clone(),
            path: path.clone(),
            dir,
        })
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn blob_container(&self, path: &BlobPath) -> BlobResult<Box<dyn BlobContainer>> {
        Ok(Box::new(self.container_for(path)?))
    }

    /// Removes the directory tree behind `path`. Missing directories are fine.
    async fn delete(&self, path: &BlobPath) -> BlobResult<()> {
        let dir = self.resolve_path(path)?;
        let target = dir.clone();
        tracing::debug!(path = %dir.display(), "local store: deleting tree");
        self.executor
            .run_blocking(move || match std::fs::remove_dir_all(&target) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other,
            })
            .await
            .map_err(|e| BlobStoreError::io(dir.display().to_string(), e))
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
pub struct LocalBlobContainer {
    store: LocalBlobStore,
    path: BlobPath,
    dir: PathBuf,
}

impl LocalBlobContainer {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file `name` is stored in, after validating the name.
    pub fn blob_file(&self, name: &str) -> BlobResult<PathBuf> {
        check_component(name)
            .map_err(|e| BlobStoreError::malformed_location(&self.path.add(name), e))?;
        Ok(self.dir.join(name))
    }

    async fn run<T, F>(&self, file: &Path, f: F) -> BlobResult<T>
    where
        F: FnOnce() -> io::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.store
            .executor
            .run_blocking(f)
            .await
            .map_err(|e| BlobStoreError::io(file.display().to_string(), e))
    }
}

#[async_trait]
impl BlobContainer for LocalBlobContainer {
    fn path(&self) -> &BlobPath {
        &self.path
    }

    async fn blob_exists(&self, name: &str) -> BlobResult<bool> {
        let file = self.blob_file(name)?;
        let target = file.clone();
        self.run(&file, move || match std::fs::metadata(&target) {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        })
        .await
    }

    async fn read_blob(&self, name: &str) -> BlobResult<ByteStream> {
        let file = self.blob_file(name)?;
        let target = file.clone();
        let reader = self.run(&file, move || std::fs::File::open(&target)).await?;
        Ok(Box::new(BlockingReadStream::new(
            self.store.executor.clone(),
            reader,
            self.store.buffer_size,
        )))
    }

    /// Writes `data`, creating parent directories as needed.
    async fn write_blob(&self, name: &str, data: Bytes) -> BlobResult<()> {
        let file = self.blob_file(name)?;
        let target = file.clone();
        self.run(&file, move || {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, &data)
        })
        .await
    }

    async fn delete_blob(&self, name: &str) -> BlobResult<()> {
        let file = self.blob_file(name)?;
        let target = file.clone();
        self.run(&file, move || match std::fs::remove_file(&target) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        })
        .await
    }

    async fn list_blobs_by_prefix(
        &self,
        prefix: Option<&str>,
    ) -> BlobResult<BTreeMap<String, BlobMetadata>> {
        let dir = self.dir.clone();
        let prefix = prefix.unwrap_or_default().to_owned();
        self.run(&self.dir, move || {
            let mut blobs = BTreeMap::new();
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(blobs),
                Err(e) => return Err(e),
            };
            for entry in entries {
                let entry = entry?;
                let metadata = entry.metadata()?;
                if !metadata.is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with(&prefix) {
                    let length = metadata.len();
                    blobs.insert(name.clone(), BlobMetadata { name, length });
                }
            }
            Ok(blobs)
        })
        .await
    }
}
