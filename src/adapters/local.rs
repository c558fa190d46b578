//! Local directory object store
//!
//! Maps each key onto a file below a root directory. Writes go to a temp file
//! in the destination directory and are renamed into place, so a concurrent
//! reader sees either the old body or the new one.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tracing::debug;

use crate::domain::ports::{ObjectStore, Status};
use crate::error::{Error, Result};

/// Filesystem-backed [`ObjectStore`]
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    /// Store rooted at `root`, created if missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let root = fs::canonicalize(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path under the root, rejecting keys that could escape it.
    pub fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = key.trim_start_matches('/');
        let invalid = |reason: &str| Error::InvalidKey {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        if relative.is_empty() {
            return Err(invalid("empty key"));
        }
        if relative.contains('\\') {
            return Err(invalid("contains backslash"));
        }
        if Path::new(relative)
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(invalid("parent traversal"));
        }
        Ok(self.root.join(relative))
    }

    fn atomic_write(&self, path: &Path, body: &[u8]) -> Result<()> {
        let dir = path.parent().unwrap_or(&self.root);
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(body)?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn write(&self, path: &Path, body: &[u8]) -> Result<()> {
        match self.atomic_write(path, body) {
            Err(Error::Io(ref e)) if e.kind() == ErrorKind::NotFound => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                self.atomic_write(path, body)
            }
            other => other,
        }
    }
}

/// Status for a failed local operation
fn status_of(err: &Error) -> Status {
    match err {
        Error::InvalidKey { .. } => Status::BAD_REQUEST,
        Error::Io(e) => match e.kind() {
            ErrorKind::NotFound => Status::NOT_FOUND,
            ErrorKind::PermissionDenied => Status(403),
            _ => Status::INTERNAL_ERROR,
        },
        _ => Status::INTERNAL_ERROR,
    }
}

fn log_failure(op: &str, key: &str, err: &Error) -> Status {
    let status = status_of(err);
    debug!(op, key, status = %status, error = %err, "local store request failed");
    status
}

impl ObjectStore for LocalDirStore {
    fn put(&self, key: &str, body: &[u8]) -> Status {
        let result = self.resolve(key).and_then(|path| self.write(&path, body));
        match result {
            Ok(()) => Status::CREATED,
            Err(e) => log_failure("PUT", key, &e),
        }
    }

    fn get(&self, key: &str) -> (Bytes, Status) {
        let result = self
            .resolve(key)
            .and_then(|path| fs::read(path).map_err(Error::from));
        match result {
            Ok(body) => (Bytes::from(body), Status::OK),
            Err(e) => (Bytes::new(), log_failure("GET", key, &e)),
        }
    }

    fn delete(&self, key: &str) -> Status {
        let result = self
            .resolve(key)
            .and_then(|path| fs::remove_file(path).map_err(Error::from));
        match result {
            Ok(()) => Status::NO_CONTENT,
            Err(e) => log_failure("DELETE", key, &e),
        }
    }

    fn copy(&self, src: &str, dst: &str) -> Status {
        let result = self.resolve(src).and_then(|from| {
            let to = self.resolve(dst)?;
            let body = fs::read(from)?;
            self.write(&to, &body)
        });
        match result {
            Ok(()) => Status::CREATED,
            Err(e) => log_failure("COPY", dst, &e),
        }
    }

    fn create_directory(&self, key: &str) -> Status {
        let result = self
            .resolve(key)
            .and_then(|path| fs::create_dir_all(path).map_err(Error::from));
        match result {
            Ok(()) => Status::CREATED,
            Err(e) => log_failure("MKDIR", key, &e),
        }
    }
}
