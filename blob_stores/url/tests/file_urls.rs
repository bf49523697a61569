use blobpath_core::{BlobContainer, BlobPath, BlobStore, ErrorKind, Executor, Settings};
use blobpath_store_local::LocalBlobStore;
use blobpath_store_url::UrlBlobStore;
use bytes::Bytes;
use futures::StreamExt;
use url::Url;

fn url_store(dir: &std::path::Path, settings: &Settings) -> UrlBlobStore {
    let base = Url::from_directory_path(dir).unwrap();
    UrlBlobStore::new(settings, Executor::current(), base).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn reads_what_the_local_store_wrote() {
    let temp_dir = tempfile::tempdir().unwrap();
    let local = LocalBlobStore::new(&Settings::default(), Executor::current(), temp_dir.path())
        .unwrap();
    let path = BlobPath::new().add("indices").add("0");
    let data = patterned_bytes(250_000);
    local
        .blob_container(&path)
        .unwrap()
        .write_blob("snap-1", data.clone())
        .await
        .unwrap();

    let settings = Settings::builder().put("buffer_size", "64kb").build();
    let store = url_store(temp_dir.path(), &settings);
    let container = store.container_for(&path).unwrap();

    assert!(container.blob_exists("snap-1").await.unwrap());
    assert!(!container.blob_exists("snap-2").await.unwrap());

    let mut stream = container.read_blob("snap-1").await.unwrap();
    let mut read = Vec::new();
    let mut chunks = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.unwrap();
        assert!(chunk.len() <= 65536);
        read.extend_from_slice(&chunk);
        chunks += 1;
    }
    assert_eq!(read, data.as_ref());
    assert!(chunks >= 4, "250kB in 64kB chunks, got {chunks}");
}

#[tokio::test(flavor = "multi_thread")]
async fn composed_location_matches_directory_layout() {
    let temp_dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(temp_dir.path().join("a/b")).unwrap();
    std::fs::write(temp_dir.path().join("a/b/file.dat"), b"payload").unwrap();

    let store = url_store(temp_dir.path(), &Settings::default());
    let container = store.container_for(&BlobPath::from(&["a", "b"][..])).unwrap();
    let expected = Url::from_directory_path(temp_dir.path())
        .unwrap()
        .join("a/b/file.dat")
        .unwrap();

    assert_eq!(container.blob_url("file.dat").unwrap(), expected);
    let bytes = container.read_blob_fully("file.dat").await.unwrap();
    assert_eq!(bytes.as_ref(), b"payload");
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_blob_fails_with_io_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = url_store(temp_dir.path(), &Settings::default());
    let container = store.container_for(&BlobPath::new().add("a")).unwrap();

    let err = container
        .read_blob("does-not-exist")
        .await
        .err()
        .expect("missing blob should not open");
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.is_not_found(), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn abandoned_stream_does_not_block_later_reads() {
    let temp_dir = tempfile::tempdir().unwrap();
    std::fs::write(temp_dir.path().join("big"), vec![1u8; 1 << 20]).unwrap();
    let settings = Settings::builder().put("buffer_size", "4kb").build();
    let store = url_store(temp_dir.path(), &settings);
    let container = store.container_for(&BlobPath::new()).unwrap();

    let mut stream = container.read_blob("big").await.unwrap();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.len(), 4096);
    drop(stream);

    // a fresh read starts from the beginning again
    let again = container.read_blob_fully("big").await.unwrap();
    assert_eq!(again.len(), 1 << 20);
}

fn patterned_bytes(len: usize) -> Bytes {
    (0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>().into()
}
