//! Dual alternating base files (`<name>.baseA` / `<name>.baseB`) that hold
//! everything needed to re-open a committed revision without scanning the
//! data file: the root block, tree height, item count, and the
//! allocation bitmap. See `SPEC_FULL.md` §4.C.
//!
//! File-naming mirrors `rdms::robt::files::{IndexFileName, VlogFileName}`
//! (name plus a fixed suffix, joined under the table's directory). The
//! record itself borrows the "varint header, length-prefixed blob" shape
//! this crate already uses for the bitmap, rather than bringing in
//! `cbordata` for a handful of scalar fields.

use std::{fs, path::Path, path::PathBuf};

use crate::codec::{get_varint, put_varint};
use crate::error::Result;

/// Bumped if the on-disk base record shape ever changes; a base file
/// carrying any other value is rejected outright rather than guessed at.
pub const FORMAT_VERSION: u64 = 1;

/// Everything persisted about one committed revision, other than the
/// data blocks themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseRecord {
    pub revision: u64,
    pub block_size: u32,
    pub root: u32,
    /// Tree height: 0 for a single leaf root, increasing with every split
    /// that promotes a new root.
    pub level: u8,
    pub item_count: u64,
    pub last_block: u32,
    /// Set once, the first time the tree ever splits its root — lets
    /// `open()` tell a never-split one-block tree from a corrupt one.
    pub have_fakeroot: bool,
    /// Whether the writer closed out of sequential-append mode.
    pub sequential: bool,
    pub bitmap_bytes: Vec<u8>,
}

impl BaseRecord {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_varint(&mut out, self.revision);
        put_varint(&mut out, FORMAT_VERSION);
        put_varint(&mut out, self.block_size as u64);
        put_varint(&mut out, self.root as u64);
        put_varint(&mut out, self.level as u64);
        put_varint(&mut out, self.item_count);
        put_varint(&mut out, self.last_block as u64);
        let flags = (self.have_fakeroot as u8) | ((self.sequential as u8) << 1);
        out.push(flags);
        put_varint(&mut out, self.bitmap_bytes.len() as u64);
        out.extend_from_slice(&self.bitmap_bytes);
        // Revision repeated after the payload: a write truncated partway
        // through never gets this far, so a record that decodes cleanly
        // but whose trailing revision disagrees with the leading one was
        // torn by a crash mid-rewrite of the same file.
        put_varint(&mut out, self.revision);
        out
    }

    pub fn decode(buf: &[u8]) -> Result<BaseRecord> {
        let mut pos = 0usize;
        let revision = read_varint(buf, &mut pos)?;
        let format = read_varint(buf, &mut pos)?;
        if format != FORMAT_VERSION {
            return err_at!(DatabaseCorruptError, msg: "unrecognised base format {}", format);
        }
        let block_size = read_varint(buf, &mut pos)? as u32;
        let root = read_varint(buf, &mut pos)? as u32;
        let level = read_varint(buf, &mut pos)? as u8;
        let item_count = read_varint(buf, &mut pos)?;
        let last_block = read_varint(buf, &mut pos)? as u32;
        if pos >= buf.len() {
            return err_at!(DatabaseCorruptError, msg: "truncated base record: missing flags");
        }
        let flags = buf[pos];
        pos += 1;
        let have_fakeroot = flags & 0x1 != 0;
        let sequential = flags & 0x2 != 0;
        let bitmap_len = read_varint(buf, &mut pos)? as usize;
        if pos + bitmap_len > buf.len() {
            return err_at!(DatabaseCorruptError, msg: "truncated base record: bitmap short");
        }
        let bitmap_bytes = buf[pos..pos + bitmap_len].to_vec();
        pos += bitmap_len;
        let revision_again = read_varint(buf, &mut pos)?;
        if revision_again != revision {
            return err_at!(
                DatabaseCorruptError,
                msg: "torn base record: revision {} then {}", revision, revision_again
            );
        }
        Ok(BaseRecord {
            revision,
            block_size,
            root,
            level,
            item_count,
            last_block,
            have_fakeroot,
            sequential,
            bitmap_bytes,
        })
    }
}

fn read_varint(buf: &[u8], pos: &mut usize) -> Result<u64> {
    let (v, n) = get_varint(&buf[*pos..])?;
    *pos += n;
    Ok(v)
}

/// Which of the two alternating base files is live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Slot::A => "baseA",
            Slot::B => "baseB",
        }
    }
}

pub fn path_for(dir: &Path, name: &str, slot: Slot) -> PathBuf {
    dir.join(format!("{}.{}", name, slot.suffix()))
}

fn read_slot(dir: &Path, name: &str, slot: Slot) -> Result<BaseRecord> {
    let path = path_for(dir, name, slot);
    let bytes = err_at!(IOError, fs::read(&path))?;
    BaseRecord::decode(&bytes)
}

/// A successfully loaded base record, tagged with which file it came from.
pub struct Loaded {
    pub slot: Slot,
    pub record: BaseRecord,
}

/// Load whichever base file is authoritative. With both valid, pick the
/// explicitly requested revision if one was given, otherwise the higher
/// revision. With only one valid, use it regardless of its revision
/// number — it survived a crash that left the other torn or missing.
pub fn load(dir: &Path, name: &str, want_revision: Option<u64>) -> Result<Loaded> {
    let a = read_slot(dir, name, Slot::A);
    let b = read_slot(dir, name, Slot::B);
    match (a, b) {
        (Ok(ra), Ok(rb)) => {
            if let Some(rev) = want_revision {
                if ra.revision == rev {
                    return Ok(Loaded { slot: Slot::A, record: ra });
                }
                if rb.revision == rev {
                    return Ok(Loaded { slot: Slot::B, record: rb });
                }
                return err_at!(
                    DatabaseOpeningError,
                    msg: "revision {} present in neither base file ({}, {})", rev, ra.revision, rb.revision
                );
            }
            if ra.revision >= rb.revision {
                Ok(Loaded { slot: Slot::A, record: ra })
            } else {
                Ok(Loaded { slot: Slot::B, record: rb })
            }
        }
        (Ok(ra), Err(_)) => Ok(Loaded { slot: Slot::A, record: ra }),
        (Err(_), Ok(rb)) => Ok(Loaded { slot: Slot::B, record: rb }),
        (Err(ea), Err(eb)) => err_at!(
            DatabaseOpeningError,
            msg: "neither base file is readable: A: {}; B: {}", ea, eb
        ),
    }
}

/// First-write protocol (§4.C/§4.H): before any data block of the new
/// revision is written, delete the base file that is about to become
/// stale. A crash between here and the final [`write`] then leaves at
/// most one valid base file on disk (the one belonging to the revision
/// still being committed), never two half-consistent ones.
pub fn delete_stale(dir: &Path, name: &str, stale: Slot) -> Result<()> {
    let path = path_for(dir, name, stale);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => err_at!(IOError, Err(e)),
    }
}

/// Write (or overwrite) the base record for `slot`.
pub fn write(dir: &Path, name: &str, slot: Slot, record: &BaseRecord) -> Result<()> {
    let path = path_for(dir, name, slot);
    let bytes = record.encode();
    err_at!(IOError, fs::write(&path, &bytes))
}

#[cfg(test)]
#[path = "base_test.rs"]
mod base_test;
