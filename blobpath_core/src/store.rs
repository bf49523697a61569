use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::collections::BTreeMap;

use crate::error::{BlobResult, BlobStoreError};
use crate::path::BlobPath;
use crate::stream::ByteStream;

/// A blob-store backend: a factory for containers bound to composed
/// locations.
#[async_trait]
pub trait BlobStore: std::fmt::Debug + Send + Sync + 'static {
    /// Returns a container bound to the location `path` composes to.
    fn blob_container(&self, path: &BlobPath) -> BlobResult<Box<dyn BlobContainer>>;

    /// Deletes everything stored at or below `path`.
    async fn delete(&self, path: &BlobPath) -> BlobResult<()>;

    /// Releases resources owned by the store. The executor it was given is
    /// never shut down here.
    fn close(&self);

    fn features(&self) -> StoreFeatures;
}

/// Per-blob operations at one fixed location.
#[async_trait]
pub trait BlobContainer: std::fmt::Debug + Send + Sync {
    fn path(&self) -> &BlobPath;

    async fn blob_exists(&self, name: &str) -> BlobResult<bool>;

    /// Opens `name` for streaming. Open failures surface here; read
    /// failures surface as items of the returned stream.
    async fn read_blob(&self, name: &str) -> BlobResult<ByteStream>;

    async fn write_blob(&self, name: &str, data: Bytes) -> BlobResult<()>;

    async fn delete_blob(&self, name: &str) -> BlobResult<()>;

    /// Lists blobs whose names start with `prefix` (all blobs for `None`).
    async fn list_blobs_by_prefix(
        &self,
        prefix: Option<&str>,
    ) -> BlobResult<BTreeMap<String, BlobMetadata>>;

    async fn list_blobs(&self) -> BlobResult<BTreeMap<String, BlobMetadata>> {
        self.list_blobs_by_prefix(None).await
    }

    /// Reads a whole blob into memory.
    async fn read_blob_fully(&self, name: &str) -> BlobResult<Bytes> {
        let mut stream = self.read_blob(name).await?;
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| BlobStoreError::io(self.path().add(name).to_string(), e))?;
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlobMetadata {
    pub name: String,
    pub length: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreFeatures {
    pub read_only: bool,
    pub supports_listing: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io;

    /// Serves one good chunk, then fails.
    #[derive(Debug)]
    struct Truncated {
        path: BlobPath,
    }

    #[async_trait]
    impl BlobContainer for Truncated {
        fn path(&self) -> &BlobPath {
            &self.path
        }

        async fn blob_exists(&self, _name: &str) -> BlobResult<bool> {
            Ok(true)
        }

        async fn read_blob(&self, _name: &str) -> BlobResult<ByteStream> {
            let items = vec![
                Ok(Bytes::from_static(b"head")),
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            ];
            Ok(Box::new(futures::stream::iter(items)))
        }

        async fn write_blob(&self, _name: &str, _data: Bytes) -> BlobResult<()> {
            Err(BlobStoreError::unsupported("write_blob", "test container"))
        }

        async fn delete_blob(&self, _name: &str) -> BlobResult<()> {
            Err(BlobStoreError::unsupported("delete_blob", "test container"))
        }

        async fn list_blobs_by_prefix(
            &self,
            _prefix: Option<&str>,
        ) -> BlobResult<BTreeMap<String, BlobMetadata>> {
            Ok(BTreeMap::new())
        }
    }

    #[tokio::test]
    async fn read_fully_reports_where_the_stream_failed() {
        let container = Truncated {
            path: BlobPath::new().add("a").add("b"),
        };
        let err = container.read_blob_fully("file.dat").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(
            err.to_string().starts_with("failed to access [a][b][file.dat]: "),
            "{err}"
        );
    }
}
