//! Object Key Layout
//!
//! A logical object `path` occupies one manifest entry plus one entry per
//! chunk, the chunks living in a hidden directory next to the object:
//!
//! ```text
//! /photos/2024/trip.mov           logical object
//! /photos/2024/trip.mov.          manifest, body = chunk count
//! /photos/2024/.DT_Store/trip.mov.0.
//! /photos/2024/.DT_Store/trip.mov.1.
//! ...
//! ```

use crate::config::DEFAULT_STORE_DIR_NAME;
use crate::error::{Error, Result};

/// Store keys belonging to one logical object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    path: String,
    store_dir: String,
    basename: String,
}

impl ObjectKey {
    /// Keys for `path` using the default store directory name
    pub fn new(path: &str) -> Result<Self> {
        Self::with_store_dir(path, DEFAULT_STORE_DIR_NAME)
    }

    /// Keys for `path` with chunks under the sibling directory `store_dir_name`
    pub fn with_store_dir(path: &str, store_dir_name: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidKey {
            key: path.to_string(),
            reason: reason.to_string(),
        };

        if path.trim_matches('/').is_empty() {
            return Err(invalid("path has no object name"));
        }
        if path.ends_with('/') {
            return Err(invalid("path names a directory"));
        }

        let (parent, basename) = match path.rfind('/') {
            Some(pos) => (&path[..pos], &path[pos + 1..]),
            None => ("", path),
        };
        if basename == "." || basename == ".." {
            return Err(invalid("path ends in a relative segment"));
        }

        let store_dir = if parent.is_empty() && !path.starts_with('/') {
            store_dir_name.to_string()
        } else {
            format!("{}/{}", parent, store_dir_name)
        };

        Ok(Self {
            path: path.to_string(),
            store_dir,
            basename: basename.to_string(),
        })
    }

    /// Logical object path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Final path segment
    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Hidden sibling directory holding this object's chunks
    pub fn store_dir(&self) -> &str {
        &self.store_dir
    }

    /// Key of the manifest entry
    pub fn manifest_key(&self) -> String {
        format!("{}.", self.path)
    }

    /// Key of chunk `index`
    pub fn chunk_key(&self, index: usize) -> String {
        format!("{}/{}.{}.", self.store_dir, self.basename, index)
    }

    /// Keys of chunks `0..blocks`, in order
    pub fn chunk_keys(&self, blocks: usize) -> impl Iterator<Item = String> + '_ {
        (0..blocks).map(move |i| self.chunk_key(i))
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}
