use reqwest::StatusCode;
use reqwest::blocking::{Client, ClientBuilder};
use std::fs::File;
use std::io::{self, Read};
use std::sync::OnceLock;
use url::Url;

pub type BlobReader = Box<dyn Read + Send + 'static>;

/// Blocking access to the resource behind a URL.
///
/// Both methods are only ever called on the store's executor.
pub trait UrlOpener: std::fmt::Debug + Send + Sync + 'static {
    fn open(&self, url: &Url) -> io::Result<BlobReader>;

    /// Returns `Ok(false)` when the resource is reported missing.
    fn exists(&self, url: &Url) -> io::Result<bool>;
}

/// Opens `file:` URLs from the local filesystem and `http(s):` URLs with a
/// blocking HTTP client.
#[derive(Debug)]
pub struct SchemeOpener {
    builder: fn() -> ClientBuilder,
    http: OnceLock<Client>,
}

impl SchemeOpener {
    pub fn new() -> Self {
        Self::with_client_builder(Client::builder)
    }

    /// Builds the HTTP client from `builder` on first use, e.g. to set
    /// timeouts or proxies.
    pub fn with_client_builder(builder: fn() -> ClientBuilder) -> Self {
        Self {
            builder,
            http: OnceLock::new(),
        }
    }

    fn http(&self) -> io::Result<&Client> {
        if let Some(client) = self.http.get() {
            return Ok(client);
        }
        let client = (self.builder)().build().map_err(io::Error::other)?;
        // a racing thread may have won; its client is kept and ours dropped here
        let _ = self.http.set(client);
        self.http
            .get()
            .ok_or_else(|| io::Error::other("http client unavailable"))
    }
}

impl Default for SchemeOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SchemeOpener {
    fn drop(&mut self) {
        // The blocking client tears down its own runtime when dropped, which
        // must not happen on an async worker thread.
        if let Some(client) = self.http.take() {
            std::thread::spawn(move || drop(client));
        }
    }
}

impl UrlOpener for SchemeOpener {
    fn open(&self, url: &Url) -> io::Result<BlobReader> {
        match url.scheme() {
            "file" => {
                let path = file_path(url)?;
                let file = File::open(&path)?;
                if file.metadata()?.is_dir() {
                    return Err(io::Error::new(
                        io::ErrorKind::IsADirectory,
                        format!("{url} is a directory"),
                    ));
                }
                Ok(Box::new(file))
            }
            "http" | "https" => {
                let response = self
                    .http()?
                    .get(url.clone())
                    .send()
                    .map_err(io::Error::other)?;
                let status = response.status();
                if !status.is_success() {
                    return Err(status_error(url, status));
                }
                Ok(Box::new(response))
            }
            scheme => Err(unsupported_scheme(scheme)),
        }
    }

    fn exists(&self, url: &Url) -> io::Result<bool> {
        match url.scheme() {
            "file" => match std::fs::metadata(file_path(url)?) {
                Ok(metadata) => Ok(metadata.is_file()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e),
            },
            "http" | "https" => {
                let response = self
                    .http()?
                    .head(url.clone())
                    .send()
                    .map_err(io::Error::other)?;
                let status = response.status();
                if status.is_success() {
                    Ok(true)
                } else if matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE) {
                    Ok(false)
                } else {
                    Err(status_error(url, status))
                }
            }
            scheme => Err(unsupported_scheme(scheme)),
        }
    }
}

fn file_path(url: &Url) -> io::Result<std::path::PathBuf> {
    url.to_file_path().map_err(|()| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{url} does not name a local file"),
        )
    })
}

fn status_error(url: &Url, status: StatusCode) -> io::Error {
    let kind = match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => io::ErrorKind::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => io::ErrorKind::PermissionDenied,
        _ => io::ErrorKind::Other,
    };
    io::Error::new(kind, format!("{url} responded with HTTP {status}"))
}

fn unsupported_scheme(scheme: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("no reader for URL scheme '{scheme}'"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let url = Url::parse("http://example.org/repo/blob").unwrap();
        assert_eq!(
            status_error(&url, StatusCode::NOT_FOUND).kind(),
            io::ErrorKind::NotFound
        );
        assert_eq!(
            status_error(&url, StatusCode::GONE).kind(),
            io::ErrorKind::NotFound
        );
        assert_eq!(
            status_error(&url, StatusCode::FORBIDDEN).kind(),
            io::ErrorKind::PermissionDenied
        );
        assert_eq!(
            status_error(&url, StatusCode::BAD_GATEWAY).kind(),
            io::ErrorKind::Other
        );
    }

    #[test]
    fn file_urls_read_local_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blob"), b"contents").unwrap();
        let base = Url::from_directory_path(dir.path()).unwrap();
        let opener = SchemeOpener::new();

        let mut buf = String::new();
        opener
            .open(&base.join("blob").unwrap())
            .unwrap()
            .read_to_string(&mut buf)
            .unwrap();
        assert_eq!(buf, "contents");

        assert!(opener.exists(&base.join("blob").unwrap()).unwrap());
        assert!(!opener.exists(&base.join("other").unwrap()).unwrap());
        assert!(!opener.exists(&base).unwrap(), "directories are not blobs");

        let err = opener
            .open(&base.join("other").unwrap())
            .err()
            .expect("missing file should not open");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn unknown_schemes_are_unsupported() {
        let url = Url::parse("ftp://example.org/blob").unwrap();
        let err = SchemeOpener::new()
            .open(&url)
            .err()
            .expect("ftp should not open");
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
