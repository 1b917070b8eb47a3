//! Single-writer enforcement via an `fs2` advisory lock on a dedicated
//! sidecar file (`<name>.lock`), separate from the data and base files.
//!
//! Spec §5 assumes the caller already guarantees one writer at a time;
//! this is a cheap same-host safety net on top of that, not a substitute
//! for it — grounded on `rdms`'s hand-rolled `file_lock.rs` (itself a
//! derived `flock`/`LockFileEx` wrapper predating its later move to the
//! `fs2` crate proper, see `fs2_test.rs`'s shared/exclusive experiments).
//! A second writable [`Table`](crate::btree::Table) opened against the
//! same table while the first is still open fails fast with
//! [`Error::DatabaseOpeningError`] instead of corrupting state.
//!
//! Read-only opens take no lock at all: any number of readers coexist
//! with the single writer, which is the entire point of the
//! copy-on-write design — only writer-vs-writer needs arbitrating here.

use std::{fs, path::Path};

use fs2::FileExt;

use crate::error::Result;

pub struct WriteLock {
    file: fs::File,
}

impl WriteLock {
    /// Try to take an exclusive, non-blocking lock on `<dir>/<name>.lock`,
    /// creating it if necessary. Fails immediately (rather than blocking)
    /// if another writable handle already holds it.
    pub fn acquire(dir: &Path, name: &str) -> Result<WriteLock> {
        let path = dir.join(format!("{}.lock", name));
        let file = err_at!(
            IOError,
            fs::OpenOptions::new().write(true).create(true).open(&path)
        )?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(WriteLock { file }),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => err_at!(
                DatabaseOpeningError,
                msg: "table {:?} already has a writable handle open", dir.join(name)
            ),
            Err(e) => err_at!(IOError, Err(e)),
        }
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            log::warn!("failed to release write lock: {}", err);
        }
    }
}

#[cfg(test)]
#[path = "lockfile_test.rs"]
mod lockfile_test;
