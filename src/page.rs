//! Block-structured page layout: header, directory, item views, and item
//! construction. See `SPEC_FULL.md` §3 (data model) and §4.D/§4.E.
//!
//! Simplification from the original (documented in `DESIGN.md`): rather
//! than the original's three-way replace/relocate/delete-then-insert
//! dance that tolerates a fragmented free area between compactions, this
//! implementation keeps every page fully compacted after each mutation
//! (`total_free == max_free` always holds). This preserves every
//! invariant in spec §3/§8 and all externally visible behaviour; it
//! trades away the micro-optimisation of an in-place memmove for a
//! same-size replace.

use std::cmp::Ordering;

use crate::codec::{
    get_u16, get_u32, get_u8, put_u16, put_u32, put_u8, BYTES_PER_BLOCK_NUMBER, C2, D2, DIR_START,
    I2, K1,
};
use crate::error::Result;

/// The 11-byte prefix of every block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub revision: u32,
    pub level: u8,
    pub max_free: u16,
    pub total_free: u16,
    pub dir_end: u16,
}

impl Header {
    pub fn read(buf: &[u8]) -> Header {
        Header {
            revision: get_u32(buf, 0),
            level: get_u8(buf, 4),
            max_free: get_u16(buf, 5),
            total_free: get_u16(buf, 7),
            dir_end: get_u16(buf, 9),
        }
    }

    pub fn write(&self, buf: &mut [u8]) {
        put_u32(buf, 0, self.revision);
        put_u8(buf, 4, self.level);
        put_u16(buf, 5, self.max_free);
        put_u16(buf, 7, self.total_free);
        put_u16(buf, 9, self.dir_end);
    }

    /// Check the header against the invariants in spec §3.1/§8: `dir_end`
    /// must lie within the block, `total_free >= max_free`, and the
    /// directory must describe a whole number of entries.
    pub fn validate(&self, block_size: usize) -> Result<()> {
        if (self.dir_end as usize) > block_size {
            return err_at!(
                DatabaseCorruptError,
                msg: "dir_end {} beyond block_size {}", self.dir_end, block_size
            );
        }
        if (self.dir_end as usize) < DIR_START {
            return err_at!(DatabaseCorruptError, msg: "dir_end {} before header", self.dir_end);
        }
        if self.total_free < self.max_free {
            return err_at!(
                DatabaseCorruptError,
                msg: "total_free {} < max_free {}", self.total_free, self.max_free
            );
        }
        if (self.dir_end as usize - DIR_START) % D2 != 0 {
            return err_at!(DatabaseCorruptError, msg: "directory size not a multiple of {}", D2);
        }
        Ok(())
    }
}

/// Read-only view over one item inside a page buffer.
pub struct ItemView<'a> {
    buf: &'a [u8],
    off: usize,
}

impl<'a> ItemView<'a> {
    pub fn new(buf: &'a [u8], off: usize) -> ItemView<'a> {
        ItemView { buf, off }
    }

    /// `I`: total item length in bytes.
    pub fn len(&self) -> usize {
        get_u16(self.buf, self.off) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// `K`: key-field length, including the trailing component counter.
    fn k_field(&self) -> usize {
        get_u8(self.buf, self.off + I2) as usize
    }

    /// The logical user-key (excludes the trailing component counter).
    pub fn user_key(&self) -> &'a [u8] {
        let k = self.k_field();
        let start = self.off + I2 + K1;
        &self.buf[start..start + (k - C2)]
    }

    /// The 2-byte component counter trailing the key.
    pub fn component(&self) -> u16 {
        let k = self.k_field();
        get_u16(self.buf, self.off + I2 + K1 + (k - C2))
    }

    /// Raw on-disk bytes of this item (used to copy it unchanged, e.g.
    /// while rebuilding a page or staging a block split).
    pub fn raw(&self) -> &'a [u8] {
        &self.buf[self.off..self.off + self.len()]
    }

    /// Leaf-only: how many components make up the full tag.
    pub fn components_count(&self) -> u16 {
        let k = self.k_field();
        get_u16(self.buf, self.off + I2 + K1 + k)
    }

    /// Leaf-only: this item's chunk of the tag.
    pub fn tag_chunk(&self) -> &'a [u8] {
        let k = self.k_field();
        let start = self.off + I2 + K1 + k + C2;
        &self.buf[start..self.off + self.len()]
    }

    /// Internal-only: child block number this item routes to.
    pub fn child_block(&self) -> u32 {
        get_u32(self.buf, self.off + self.len() - BYTES_PER_BLOCK_NUMBER)
    }
}

/// Order two (key, component) pairs the way the directory is sorted:
/// common-prefix bytewise, then length, then component counter. Rust's
/// slice `Ord` already implements "prefix bytes then length" lexicographic
/// order, so the key comparison is exactly `key_a.cmp(key_b)`.
pub fn cmp_key(key_a: &[u8], comp_a: u16, key_b: &[u8], comp_b: u16) -> Ordering {
    match key_a.cmp(key_b) {
        Ordering::Equal => comp_a.cmp(&comp_b),
        other => other,
    }
}

/// Build a leaf item: `[I][K][user_key][component][components][tag_chunk]`.
pub fn build_leaf_item(user_key: &[u8], component: u16, components: u16, tag_chunk: &[u8]) -> Vec<u8> {
    let k = user_key.len() + C2;
    let total = I2 + K1 + k + C2 + tag_chunk.len();
    let mut item = Vec::with_capacity(total);
    item.extend_from_slice(&(total as u16).to_be_bytes());
    item.push(k as u8);
    item.extend_from_slice(user_key);
    item.extend_from_slice(&component.to_be_bytes());
    item.extend_from_slice(&components.to_be_bytes());
    item.extend_from_slice(tag_chunk);
    item
}

/// Build an internal item: `[I][K][user_key][component][child_block]`.
pub fn build_internal_item(user_key: &[u8], component: u16, child: u32) -> Vec<u8> {
    let k = user_key.len() + C2;
    let total = I2 + K1 + k + BYTES_PER_BLOCK_NUMBER;
    let mut item = Vec::with_capacity(total);
    item.extend_from_slice(&(total as u16).to_be_bytes());
    item.push(k as u8);
    item.extend_from_slice(user_key);
    item.extend_from_slice(&component.to_be_bytes());
    item.extend_from_slice(&child.to_be_bytes());
    item
}

/// The dummy first item of every internal block: an empty key that is
/// never compared against, routing to `child`.
pub fn build_null_key_item(child: u32) -> Vec<u8> {
    build_internal_item(&[], 0, child)
}

/// An owned, fixed-size block buffer plus the directory/header
/// convenience methods used by the B-tree core and the cursor.
#[derive(Clone)]
pub struct Page {
    pub buf: Vec<u8>,
}

impl Page {
    pub fn new(block_size: usize) -> Page {
        Page {
            buf: vec![0u8; block_size],
        }
    }

    pub fn from_buf(buf: Vec<u8>) -> Page {
        Page { buf }
    }

    pub fn block_size(&self) -> usize {
        self.buf.len()
    }

    pub fn header(&self) -> Header {
        Header::read(&self.buf)
    }

    pub fn is_leaf(&self) -> bool {
        self.header().level == 0
    }

    pub fn revision(&self) -> u32 {
        self.header().revision
    }

    /// Re-stamp the revision in place, used by copy-on-write `alter()`
    /// when a block keeps its number but still needs a fresh revision.
    pub fn set_revision(&mut self, revision: u32) {
        put_u32(&mut self.buf, 0, revision);
    }

    pub fn dir_len(&self) -> usize {
        (self.header().dir_end as usize - DIR_START) / D2
    }

    pub fn dir_offset(&self, i: usize) -> usize {
        get_u16(&self.buf, DIR_START + i * D2) as usize
    }

    pub fn item_at(&self, i: usize) -> ItemView {
        ItemView::new(&self.buf, self.dir_offset(i))
    }

    /// All items in directory (ascending key) order, as owned byte blobs.
    pub fn collect_items(&self) -> Vec<Vec<u8>> {
        (0..self.dir_len())
            .map(|i| self.item_at(i).raw().to_vec())
            .collect()
    }

    /// Initialise an empty page (no items, no directory entries).
    pub fn init_empty(&mut self, revision: u32, level: u8) {
        for b in self.buf.iter_mut() {
            *b = 0;
        }
        let free = (self.buf.len() - DIR_START) as u16;
        let header = Header {
            revision,
            level,
            max_free: free,
            total_free: free,
            dir_end: DIR_START as u16,
        };
        header.write(&mut self.buf);
    }

    /// Rewrite the page from scratch with `items` (already in ascending
    /// key order), fully compacted. Fails if the items plus their
    /// directory entries do not fit — the caller is responsible for
    /// splitting before calling this.
    pub fn rebuild(&mut self, items: &[Vec<u8>], revision: u32, level: u8) -> Result<()> {
        let dir_end = DIR_START + items.len() * D2;
        let items_bytes: usize = items.iter().map(|b| b.len()).sum();
        if dir_end + items_bytes > self.buf.len() {
            return err_at!(
                DatabaseCorruptError,
                msg: "page rebuild overflow: {} directory + {} items > {} block",
                dir_end, items_bytes, self.buf.len()
            );
        }

        for b in self.buf.iter_mut() {
            *b = 0;
        }

        let block_size = self.buf.len();
        let mut offset = block_size;
        let mut offsets = Vec::with_capacity(items.len());
        for item in items.iter().rev() {
            offset -= item.len();
            self.buf[offset..offset + item.len()].copy_from_slice(item);
            offsets.push(offset as u16);
        }
        offsets.reverse();
        for (i, off) in offsets.into_iter().enumerate() {
            put_u16(&mut self.buf, DIR_START + i * D2, off);
        }

        let free = (offset - dir_end) as u16;
        let header = Header {
            revision,
            level,
            max_free: free,
            total_free: free,
            dir_end: dir_end as u16,
        };
        header.write(&mut self.buf);
        Ok(())
    }

    /// Bytes free for new items: always equal to `total_free` since pages
    /// here are kept fully compacted (see module doc).
    pub fn free_space(&self) -> usize {
        self.header().total_free as usize
    }

    /// Whether an item of `item_len` bytes (plus its directory entry)
    /// would fit without a split.
    pub fn fits(&self, item_len: usize) -> bool {
        self.free_space() >= item_len + D2
    }

    /// Binary search the directory for the greatest key <= (key,
    /// component). Optionally probes `c_hint` and `c_hint + 1` first for
    /// sequential-access locality. Returns `(slot, exact_match)`; slot is
    /// `None` if every key in the block is greater than the search key.
    pub fn find_in_block(
        &self,
        key: &[u8],
        component: u16,
        c_hint: Option<usize>,
    ) -> (Option<usize>, bool) {
        let n = self.dir_len();
        if n == 0 {
            return (None, false);
        }

        if let Some(h) = c_hint {
            for idx in [h, h + 1] {
                if idx < n {
                    let iv = self.item_at(idx);
                    if cmp_key(iv.user_key(), iv.component(), key, component) == Ordering::Equal {
                        return (Some(idx), true);
                    }
                }
            }
        }

        let mut lo = 0usize;
        let mut hi = n;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let iv = self.item_at(mid);
            match cmp_key(iv.user_key(), iv.component(), key, component) {
                Ordering::Greater => hi = mid,
                _ => lo = mid + 1,
            }
        }
        if lo == 0 {
            return (None, false);
        }
        let idx = lo - 1;
        let iv = self.item_at(idx);
        let exact = cmp_key(iv.user_key(), iv.component(), key, component) == Ordering::Equal;
        (Some(idx), exact)
    }

    /// Patch the child-block-number field of item `i` in place. Safe
    /// because the field is fixed-width and its position does not move
    /// the rest of the item; used by copy-on-write propagation when a
    /// child block is renumbered but this page otherwise doesn't change.
    pub fn set_child_at(&mut self, i: usize, child: u32) {
        let off = self.dir_offset(i);
        let item_len = get_u16(&self.buf, off) as usize;
        let pos = off + item_len - BYTES_PER_BLOCK_NUMBER;
        put_u32(&mut self.buf, pos, child);
    }

    /// Split point that balances the byte count of items on either side
    /// (used outside sequential-append mode).
    pub fn mid_point_split(&self) -> usize {
        let items = self.collect_items();
        let total: usize = items.iter().map(Vec::len).sum();
        let mut acc = 0usize;
        for (i, item) in items.iter().enumerate() {
            acc += item.len();
            if acc * 2 >= total {
                return i + 1;
            }
        }
        items.len()
    }
}

#[cfg(test)]
#[path = "page_test.rs"]
mod page_test;
