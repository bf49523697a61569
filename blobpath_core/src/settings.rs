use crate::error::{BlobResult, BlobStoreError};
use crate::size::ByteSize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the option controlling the chunk size of streamed reads.
pub const BUFFER_SIZE_SETTING: &str = "buffer_size";

pub const DEFAULT_BUFFER_SIZE: ByteSize = ByteSize::kb(100);

/// Flat string options handed to a backend when it is constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_as_bytes_size(&self, key: &str, default: ByteSize) -> BlobResult<ByteSize> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value
                .parse()
                .map_err(|e| BlobStoreError::invalid_setting(key, value, e)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Settings {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SettingsBuilder {
    values: BTreeMap<String, String>,
}

impl SettingsBuilder {
    pub fn put(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.values.insert(key.into(), value.to_string());
        self
    }

    pub fn build(self) -> Settings {
        Settings {
            values: self.values,
        }
    }
}

/// Resolves `buffer_size` (default 100kb) into a usable, non-zero chunk size.
pub fn buffer_size_from(settings: &Settings) -> BlobResult<usize> {
    let size = settings.get_as_bytes_size(BUFFER_SIZE_SETTING, DEFAULT_BUFFER_SIZE)?;
    let shown = size.to_string();
    if size.bytes() == 0 {
        return Err(BlobStoreError::invalid_setting(
            BUFFER_SIZE_SETTING,
            &shown,
            "buffer size must be greater than zero",
        ));
    }
    usize::try_from(size.bytes())
        .map_err(|e| BlobStoreError::invalid_setting(BUFFER_SIZE_SETTING, &shown, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn default_buffer_size() {
        assert_eq!(buffer_size_from(&Settings::default()).unwrap(), 102400);
    }

    #[test]
    fn configured_buffer_size() {
        let settings = Settings::builder().put("buffer_size", "64kb").build();
        assert_eq!(buffer_size_from(&settings).unwrap(), 65536);
    }

    #[test]
    fn invalid_buffer_size_is_a_configuration_error() {
        for value in ["fast", "0", "-10kb"] {
            let settings: Settings = [("buffer_size", value)].into_iter().collect();
            let err = buffer_size_from(&settings).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "value {value}");
        }
    }

    #[test]
    fn unrelated_keys_are_ignored() {
        let settings = Settings::builder()
            .put("compress", true)
            .put("buffer_size", 4096)
            .build();
        assert_eq!(settings.get("compress"), Some("true"));
        assert_eq!(buffer_size_from(&settings).unwrap(), 4096);
    }
}
