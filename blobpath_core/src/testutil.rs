//! Test utilities for `BlobStore` implementations.
//!
//! This module provides a conformance suite that can be run against any
//! writable `BlobStore` to verify it honours the container contract.
//!
//! # Usage
//!
//! In your store crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! blobpath_core = { workspace = true, features = ["testutil"] }
//! ```
//!
//! In your test file:
//!
//! ```ignore
//! use blobpath_core::testutil::ContainerTests;
//!
//! #[tokio::test(flavor = "multi_thread")]
//! async fn test_my_store() {
//!     let store = MyStore::new(...);
//!     ContainerTests::new(&store).run_all().await.unwrap();
//! }
//! ```

use crate::error::{BlobResult, ErrorKind};
use crate::path::BlobPath;
use crate::store::BlobStore;
use bytes::Bytes;
use futures::StreamExt;
use rand::Rng;

/// Test suite for writable `BlobStore` implementations.
pub struct ContainerTests<'a, S: ?Sized> {
    store: &'a S,
    /// Root for everything the suite writes, to avoid conflicts
    root: BlobPath,
}

impl<'a, S: BlobStore + ?Sized> ContainerTests<'a, S> {
    /// Create a new test suite for the given store.
    pub fn new(store: &'a S) -> Self {
        let root = BlobPath::new().add(format!("_test_{}", rand::rng().random::<u32>()));
        Self { store, root }
    }

    /// Create a new test suite rooted at a custom path.
    pub fn with_root(store: &'a S, root: BlobPath) -> Self {
        Self { store, root }
    }

    fn path(&self, segment: &str) -> BlobPath {
        self.root.add(segment)
    }

    /// Run all tests.
    pub async fn run_all(&self) -> BlobResult<()> {
        self.test_write_read().await?;
        self.test_read_stream().await?;
        self.test_exists().await?;
        self.test_overwrite().await?;
        self.test_delete_blob().await?;
        self.test_missing_blob().await?;
        self.test_list_by_prefix().await?;
        self.test_containers_are_isolated().await?;
        self.test_delete_path().await?;
        self.test_aliasing_components_rejected().await?;

        // Cleanup
        self.store.delete(&self.root).await?;

        Ok(())
    }

    /// Test basic write then read.
    pub async fn test_write_read(&self) -> BlobResult<()> {
        let container = self.store.blob_container(&self.path("write_read"))?;
        let data = Bytes::from_static(b"hello, world!");

        container.write_blob("greeting", data.clone()).await?;

        let retrieved = container.read_blob_fully("greeting").await?;
        assert_eq!(retrieved, data, "retrieved data should match original");

        Ok(())
    }

    /// Test streamed reads of a blob larger than a typical chunk.
    pub async fn test_read_stream(&self) -> BlobResult<()> {
        let container = self.store.blob_container(&self.path("stream"))?;
        let data = random_bytes(1024 * 300);

        container.write_blob("large.bin", data.clone()).await?;

        let mut stream = container.read_blob("large.bin").await?;
        let mut retrieved = Vec::new();
        while let Some(chunk) = stream.next().await {
            retrieved.extend_from_slice(&chunk.expect("chunk should read"));
        }

        assert_eq!(retrieved.len(), data.len(), "stream data length should match");
        assert_eq!(retrieved, data.as_ref(), "stream data should match");

        Ok(())
    }

    /// Test exists check.
    pub async fn test_exists(&self) -> BlobResult<()> {
        let container = self.store.blob_container(&self.path("exists"))?;

        assert!(
            !container.blob_exists("probe").await?,
            "blob should not exist before creation"
        );

        container
            .write_blob("probe", Bytes::from_static(b"test"))
            .await?;

        assert!(
            container.blob_exists("probe").await?,
            "blob should exist after creation"
        );

        Ok(())
    }

    /// Test overwriting existing blobs.
    pub async fn test_overwrite(&self) -> BlobResult<()> {
        let container = self.store.blob_container(&self.path("overwrite"))?;

        container
            .write_blob("doc", Bytes::from_static(b"original content"))
            .await?;
        container
            .write_blob("doc", Bytes::from_static(b"new content"))
            .await?;

        let retrieved = container.read_blob_fully("doc").await?;
        assert_eq!(
            retrieved.as_ref(),
            b"new content",
            "overwritten content should be new"
        );

        Ok(())
    }

    /// Test blob deletion.
    pub async fn test_delete_blob(&self) -> BlobResult<()> {
        let container = self.store.blob_container(&self.path("delete_blob"))?;

        container
            .write_blob("doomed", Bytes::from_static(b"to be deleted"))
            .await?;
        container.delete_blob("doomed").await?;

        assert!(
            !container.blob_exists("doomed").await?,
            "blob should not exist after delete"
        );

        Ok(())
    }

    /// Test that reading a missing blob is a not-found I/O error.
    pub async fn test_missing_blob(&self) -> BlobResult<()> {
        let container = self.store.blob_container(&self.path("missing"))?;

        let err = container
            .read_blob("nope")
            .await
            .err()
            .expect("reading a missing blob should fail");
        assert_eq!(err.kind(), ErrorKind::Io, "missing blob should be an i/o error");
        assert!(err.is_not_found(), "missing blob should be not-found: {err}");

        Ok(())
    }

    /// Test prefix listing, including that nested containers are not listed.
    pub async fn test_list_by_prefix(&self) -> BlobResult<()> {
        let path = self.path("list");
        let container = self.store.blob_container(&path)?;
        for (name, data) in [
            ("snap-1", &b"a"[..]),
            ("snap-2", &b"bb"[..]),
            ("meta-1", &b"ccc"[..]),
        ] {
            container
                .write_blob(name, Bytes::copy_from_slice(data))
                .await?;
        }
        self.store
            .blob_container(&path.add("nested"))?
            .write_blob("snap-3", Bytes::from_static(b"hidden"))
            .await?;

        let snaps = container.list_blobs_by_prefix(Some("snap-")).await?;
        let names: Vec<&str> = snaps.keys().map(String::as_str).collect();
        assert_eq!(names, ["snap-1", "snap-2"], "prefix listing should filter");
        assert_eq!(snaps["snap-2"].length, 2, "metadata should carry length");

        let all = container.list_blobs().await?;
        assert_eq!(all.len(), 3, "listing should only include direct blobs");

        Ok(())
    }

    /// Test that blobs with the same name in different containers are distinct.
    pub async fn test_containers_are_isolated(&self) -> BlobResult<()> {
        let left = self.store.blob_container(&self.path("left"))?;
        let right = self.store.blob_container(&self.path("right"))?;

        left.write_blob("same", Bytes::from_static(b"left")).await?;
        right.write_blob("same", Bytes::from_static(b"right")).await?;

        assert_eq!(left.read_blob_fully("same").await?.as_ref(), b"left");
        assert_eq!(right.read_blob_fully("same").await?.as_ref(), b"right");

        Ok(())
    }

    /// Test that deleting a path removes blobs at and below it.
    pub async fn test_delete_path(&self) -> BlobResult<()> {
        let path = self.path("delete_path");
        let top = self.store.blob_container(&path)?;
        let nested = self.store.blob_container(&path.add("child"))?;
        let sibling = self.store.blob_container(&self.path("delete_path_sibling"))?;

        top.write_blob("a", Bytes::from_static(b"a")).await?;
        nested.write_blob("b", Bytes::from_static(b"b")).await?;
        sibling.write_blob("c", Bytes::from_static(b"c")).await?;

        self.store.delete(&path).await?;

        assert!(!top.blob_exists("a").await?, "top blob should be gone");
        assert!(!nested.blob_exists("b").await?, "nested blob should be gone");
        assert!(sibling.blob_exists("c").await?, "sibling should survive");

        Ok(())
    }

    /// Test that segments and names cannot reach into another container.
    pub async fn test_aliasing_components_rejected(&self) -> BlobResult<()> {
        let path = self.path("aliasing");
        for bad in ["", ".", "..", "b/c"] {
            let err = self
                .store
                .blob_container(&path.add(bad))
                .err()
                .expect("aliasing segment should be rejected");
            assert_eq!(
                err.kind(),
                ErrorKind::Configuration,
                "segment {bad:?} should be a configuration error"
            );
        }

        let container = self.store.blob_container(&path)?;
        for bad in ["", "..", "b/c"] {
            let err = container
                .write_blob(bad, Bytes::from_static(b"x"))
                .await
                .expect_err("aliasing name should be rejected");
            assert_eq!(
                err.kind(),
                ErrorKind::Configuration,
                "name {bad:?} should be a configuration error"
            );
        }
        assert!(
            container.list_blobs().await?.is_empty(),
            "nothing should have been written"
        );

        Ok(())
    }
}

/// Generate random bytes for testing.
pub fn random_bytes(len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    rand::rng().fill(&mut data[..]);
    Bytes::from(data)
}
