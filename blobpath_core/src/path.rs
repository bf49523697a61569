use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BlobResult, BlobStoreError};

/// An ordered, immutable list of segments addressing a location in a
/// blob store's namespace.
///
/// Segments are not validated on construction; what counts as a legal
/// segment is up to the backend that composes the path into a concrete
/// location.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobPath {
    segments: Vec<String>,
}

impl BlobPath {
    /// Creates the empty (root) path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new path with `segment` appended. `self` is left untouched.
    pub fn add(&self, segment: impl Into<String>) -> BlobPath {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment.into());
        BlobPath { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.segments.clone()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Joins the segments with `separator`, e.g. `a/b` for `["a", "b"]`.
    pub fn build_as_string(&self, separator: &str) -> String {
        self.segments.join(separator)
    }

    /// Checks every segment with [`check_component`], for backends that map
    /// segments one-to-one onto names.
    pub fn check_segments(&self) -> BlobResult<()> {
        for segment in &self.segments {
            check_component(segment).map_err(|e| BlobStoreError::malformed_location(self, e))?;
        }
        Ok(())
    }
}

/// Accepts a single, non-empty name that cannot alias another location:
/// no `.` or `..`, and no slash, backslash or NUL.
pub fn check_component(component: &str) -> Result<(), String> {
    if component.is_empty()
        || component == "."
        || component == ".."
        || component.contains(['/', '\\', '\0'])
    {
        return Err(format!(
            "invalid component '{component}': must be a single, non-empty name"
        ));
    }
    Ok(())
}

impl fmt::Display for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "[{segment}]")?;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for BlobPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        BlobPath {
            segments: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Vec<String>> for BlobPath {
    fn from(segments: Vec<String>) -> Self {
        BlobPath { segments }
    }
}

impl From<&[&str]> for BlobPath {
    fn from(segments: &[&str]) -> Self {
        segments.iter().copied().collect()
    }
}
