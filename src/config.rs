//! Table configuration: a small builder, mirroring `robt::Config`, that
//! collects create-time and open-time options before `Table::create`/
//! `Table::open` consume them. See `SPEC_FULL.md` "AMBIENT STACK" and §9.

use std::path::{Path, PathBuf};

use crate::codec::{BLOCK_CAPACITY, DIR_START};

/// Default block size substituted whenever a caller passes something
/// outside `2048..=32768` or not a power of two.
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

#[derive(Clone, Debug)]
pub struct Config {
    dir: PathBuf,
    name: String,
    block_size: usize,
    readonly: bool,
    revision: Option<u64>,
}

impl Config {
    /// `path` is the directory the table's files live under; `name` is
    /// the shared stem of `<name>.baseA`, `<name>.baseB`, `<name>.data`.
    pub fn new<P: AsRef<Path>>(path: P, name: &str) -> Config {
        Config {
            dir: path.as_ref().to_path_buf(),
            name: name.to_string(),
            block_size: DEFAULT_BLOCK_SIZE,
            readonly: false,
            revision: None,
        }
    }

    /// Create-time only. Values outside `2048..=32768` or that are not a
    /// power of two are silently replaced with [`DEFAULT_BLOCK_SIZE`],
    /// per spec §9 — this is a deliberately forgiving knob, not one that
    /// rejects the caller.
    pub fn set_block_size(mut self, block_size: usize) -> Config {
        self.block_size = if (2048..=32768).contains(&block_size) && block_size.is_power_of_two() {
            block_size
        } else {
            DEFAULT_BLOCK_SIZE
        };
        self
    }

    /// Open-time only. A read-only handle never writes a base file, data
    /// block, or the data file's length, and its commit/cancel are no-ops
    /// other than returning an error.
    pub fn set_readonly(mut self, readonly: bool) -> Config {
        self.readonly = readonly;
        self
    }

    /// Open-time only. Pins the opened snapshot to a specific committed
    /// revision rather than the most recent one.
    pub fn set_revision(mut self, revision: u64) -> Config {
        self.revision = Some(revision);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn readonly(&self) -> bool {
        self.readonly
    }

    pub fn revision(&self) -> Option<u64> {
        self.revision
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.join(format!("{}.data", self.name))
    }

    /// Largest item (key + component + tag chunk, or key + child block
    /// number) a block of this size is guaranteed to hold at least
    /// [`BLOCK_CAPACITY`] of, per spec §3.4.
    pub fn max_item_size(&self) -> usize {
        (self.block_size - DIR_START - BLOCK_CAPACITY * 2) / BLOCK_CAPACITY
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
