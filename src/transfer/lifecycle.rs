//! Object Lifecycle
//!
//! Delete, copy and truncate act on every store entry of a logical object.
//! Each one starts from the manifest to learn how many chunk keys exist.

use tracing::{debug, warn};

use crate::domain::ports::{ObjectStore, Status};
use crate::error::{Error, Result};

use super::keys::ObjectKey;
use super::manifest::Manifest;

/// Fetch and parse the manifest of `key`.
pub fn read_manifest<S: ObjectStore + ?Sized>(store: &S, key: &ObjectKey) -> Result<Manifest> {
    let manifest_key = key.manifest_key();
    let (body, status) = store.get(&manifest_key);
    if !status.is_success() {
        return Err(Error::Store {
            op: "GET",
            key: manifest_key,
            status: status.code(),
        });
    }
    Manifest::decode(key.path(), &body)
}

/// Publish `manifest` for `key`.
pub fn write_manifest<S: ObjectStore + ?Sized>(
    store: &S,
    key: &ObjectKey,
    manifest: &Manifest,
) -> Result<()> {
    let manifest_key = key.manifest_key();
    let status = store.put(&manifest_key, &manifest.encode());
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::Store {
            op: "PUT",
            key: manifest_key,
            status: status.code(),
        })
    }
}

/// Remove the manifest of `key` if there is one, returning what it said.
///
/// A missing manifest is not an error. A manifest that exists but cannot be
/// parsed is still removed and yields `None`. Fails only if the DELETE itself
/// is refused, in which case the object is left as it was.
pub fn withdraw_manifest<S: ObjectStore + ?Sized>(
    store: &S,
    key: &ObjectKey,
) -> Result<Option<Manifest>> {
    let manifest_key = key.manifest_key();
    let (body, status) = store.get(&manifest_key);
    if status == Status::NOT_FOUND {
        return Ok(None);
    }

    let previous = if status.is_success() {
        Manifest::decode(key.path(), &body).ok()
    } else {
        None
    };

    let status = store.delete(&manifest_key);
    if !status.is_success() && status != Status::NOT_FOUND {
        return Err(Error::Store {
            op: "DELETE",
            key: manifest_key,
            status: status.code(),
        });
    }
    Ok(previous)
}

/// Delete every chunk, then the manifest.
///
/// All deletes are attempted even after a failure; the manifest delete is
/// attempted last in every case. Returns the AND of every status.
pub fn delete_object<S: ObjectStore + ?Sized>(store: &S, key: &ObjectKey) -> Result<bool> {
    let manifest = read_manifest(store, key)?;
    let mut ok = true;

    for chunk_key in key.chunk_keys(manifest.blocks) {
        let status = store.delete(&chunk_key);
        if !status.is_success() {
            warn!(key = %chunk_key, status = %status, "chunk delete failed");
            ok = false;
        }
    }

    let status = store.delete(&key.manifest_key());
    if !status.is_success() {
        warn!(object = %key, status = %status, "manifest delete failed");
        ok = false;
    }

    debug!(object = %key, blocks = manifest.blocks, ok, "object deleted");
    Ok(ok)
}

/// Server-side copy of every chunk of `src` onto the chunk keys of `dst`,
/// then of the manifest.
///
/// The destination manifest is copied only if every chunk copy succeeded, so
/// a failed copy never publishes a manifest that points at missing chunks.
pub fn copy_object<S: ObjectStore + ?Sized>(
    store: &S,
    src: &ObjectKey,
    dst: &ObjectKey,
) -> Result<bool> {
    let manifest = read_manifest(store, src)?;
    let mut ok = true;

    for index in 0..manifest.blocks {
        let from = src.chunk_key(index);
        let to = dst.chunk_key(index);
        let status = store.copy(&from, &to);
        if !status.is_success() {
            warn!(from = %from, to = %to, status = %status, "chunk copy failed");
            ok = false;
        }
    }

    if !ok {
        return Ok(false);
    }

    let status = store.copy(&src.manifest_key(), &dst.manifest_key());
    if !status.is_success() {
        warn!(from = %src, to = %dst, status = %status, "manifest copy failed");
        return Ok(false);
    }

    debug!(from = %src, to = %dst, blocks = manifest.blocks, "object copied");
    Ok(true)
}

/// Truncate `key` to `size` bytes.
///
/// Only truncation to zero is supported: the manifest is overwritten with an
/// empty body, which reads back as a zero-chunk object. Chunks named by the
/// old manifest are deleted afterwards; failures there are only logged.
pub fn truncate_object<S: ObjectStore + ?Sized>(
    store: &S,
    key: &ObjectKey,
    size: u64,
) -> Result<bool> {
    if size != 0 {
        return Err(Error::Unsupported(format!(
            "truncate of '{}' to {} bytes",
            key, size
        )));
    }

    let old_blocks = read_manifest(store, key).map_or(0, |m| m.blocks);

    let status = store.put(&key.manifest_key(), &[]);
    if !status.is_success() {
        warn!(object = %key, status = %status, "truncate failed");
        return Ok(false);
    }

    for chunk_key in key.chunk_keys(old_blocks) {
        let status = store.delete(&chunk_key);
        if !status.is_success() {
            warn!(key = %chunk_key, status = %status, "failed to delete truncated chunk");
        }
    }
    debug!(object = %key, old_blocks, "object truncated");
    Ok(true)
}
