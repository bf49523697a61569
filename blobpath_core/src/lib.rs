//! Core blobpath types and traits.
//!
//! This crate defines the shared pieces every blob-store backend builds on:
//!
//! - Hierarchical locations (`path::BlobPath`)
//! - The backend capability set (`store::BlobStore`, `store::BlobContainer`)
//! - The error taxonomy (`error::BlobStoreError`)
//! - Runtime options (`settings::Settings`, `size::ByteSize`)
//! - The borrowed worker pool (`executor::Executor`) and the chunked
//!   blocking reader that runs on it (`stream::BlockingReadStream`)
//!
//! Backends live in their own crates (`blobpath_store_url`,
//! `blobpath_store_local`, `blobpath_store_memory`) and only depend on the
//! traits defined here.

pub mod error;
pub mod executor;
pub mod path;
pub mod settings;
pub mod size;
pub mod store;
pub mod stream;

// Test utilities (behind feature flag)
#[cfg(feature = "testutil")]
pub mod testutil;

pub use error::{BlobResult, BlobStoreError, ErrorKind};
pub use executor::Executor;
pub use path::BlobPath;
pub use settings::Settings;
pub use size::ByteSize;
pub use store::{BlobContainer, BlobMetadata, BlobStore, StoreFeatures};
pub use stream::{BlockingReadStream, ByteStream};
