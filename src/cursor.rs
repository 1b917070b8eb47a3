//! Ordered, crash-consistent iteration over a [`Table`]. Grounded on the
//! frame-stack cursor in `examples/original_source`
//! (`xapian-core/backends/quartz/btree.cc`'s `Cursor`/`Btree_item`), but
//! built here on top of the generic root-to-leaf [`crate::btree::Frame`]
//! path rather than a dedicated shared-buffer cache — see `DESIGN.md` for
//! the tradeoff. See spec §4.G "Cursors".

use crate::block_io::BlockIo;
use crate::btree::{Frame, Table};
use crate::error::Result;

/// A positioned, independently-movable read cursor over a [`Table`].
///
/// A cursor tracks the key it last visited so that, if the table is
/// mutated underneath it (its `cursor_version` advances), the next call
/// re-seeks to that key instead of reading a path that may no longer
/// exist.
pub struct Cursor {
    frames: Vec<(u32, usize)>,
    before_start: bool,
    at_end: bool,
    last_key: Option<Vec<u8>>,
    cursor_version_seen: u64,
}

impl Cursor {
    /// A fresh, unpositioned cursor: before the first item until
    /// [`Cursor::next`], [`Cursor::first`], or [`Cursor::find`] is called.
    pub fn new() -> Cursor {
        Cursor {
            frames: Vec::new(),
            before_start: true,
            at_end: false,
            last_key: None,
            cursor_version_seen: 0,
        }
    }

    fn sync_version<B: BlockIo>(&mut self, tree: &Table<B>) {
        self.cursor_version_seen = tree.cursor_version();
    }

    /// If `tree` was mutated since this cursor last read it, re-seek to
    /// the last key visited (or the logical start/end, if none was
    /// visited yet) before doing anything else. Spec §4.G "Stale
    /// cursors".
    fn rebuild_if_stale<B: BlockIo>(&mut self, tree: &mut Table<B>) -> Result<()> {
        if self.cursor_version_seen == tree.cursor_version() {
            return Ok(());
        }
        if self.at_end {
            self.sync_version(tree);
            return Ok(());
        }
        match self.last_key.clone() {
            Some(key) => {
                self.find(tree, &key)?;
            }
            None => {
                self.frames.clear();
                self.before_start = true;
                self.at_end = false;
                self.sync_version(tree);
            }
        }
        Ok(())
    }

    fn current_frames<B: BlockIo>(&self, tree: &Table<B>) -> Vec<Frame> {
        tree.frames_from_tuples(&self.frames)
    }

    /// Position at the greatest key `<=` key (exact match preferred).
    /// Returns whether an exact match was found. Leaves the cursor
    /// `before_start` and positioned at the leftmost leaf item if every
    /// key in the table is greater than `key`.
    pub fn find<B: BlockIo>(&mut self, tree: &mut Table<B>, key: &[u8]) -> Result<bool> {
        if tree.have_fakeroot() {
            self.frames.clear();
            self.before_start = true;
            self.at_end = false;
            self.last_key = Some(key.to_vec());
            self.sync_version(tree);
            return Ok(false);
        }
        let walk = tree.find_path(key, 1)?;
        self.frames = tree.frame_tuples(&walk.frames);
        self.before_start = walk.leaf_slot.is_none();
        self.at_end = false;
        self.last_key = Some(key.to_vec());
        self.sync_version(tree);
        Ok(walk.exact)
    }

    /// Position before the first item, so the next [`Cursor::next`]
    /// lands on it.
    pub fn first<B: BlockIo>(&mut self, tree: &mut Table<B>) -> Result<()> {
        self.find(tree, b"")?;
        self.before_start = true;
        Ok(())
    }

    /// Position at the very last item in the table, if any.
    pub fn last<B: BlockIo>(&mut self, tree: &mut Table<B>) -> Result<bool> {
        if tree.have_fakeroot() {
            self.frames.clear();
            self.before_start = true;
            self.at_end = false;
            self.last_key = None;
            self.sync_version(tree);
            return Ok(false);
        }
        let mut frames = tree.rightmost_path()?;
        // A multi-component tag's trailing components sort after
        // component 1; walk back to the first component so the cursor
        // always rests on a whole logical entry.
        loop {
            let component = tree.item_key_at(&frames)?.1;
            if component <= 1 {
                break;
            }
            match tree.prev_item_path(&frames)? {
                Some(prev) => frames = prev,
                None => break,
            }
        }
        self.frames = tree.frame_tuples(&frames);
        self.before_start = false;
        self.at_end = false;
        let (key, _) = tree.item_key_at(&frames)?;
        self.last_key = Some(key);
        self.sync_version(tree);
        Ok(true)
    }

    /// Advance to the next logical entry (skipping any trailing
    /// tag-chunk components) and return its `(key, tag)`, or `None` at
    /// the end of the table.
    pub fn next<B: BlockIo>(&mut self, tree: &mut Table<B>) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        self.rebuild_if_stale(tree)?;
        if self.at_end || tree.have_fakeroot() {
            return Ok(None);
        }

        let mut frames = if self.before_start {
            if self.frames.is_empty() {
                tree.find_path(b"", 1)?.frames
            } else {
                self.current_frames(tree)
            }
        } else {
            match tree.next_item_path(&self.current_frames(tree))? {
                Some(f) => f,
                None => {
                    self.at_end = true;
                    self.sync_version(tree);
                    return Ok(None);
                }
            }
        };

        // A plain advance can land mid-way through a multi-component tag
        // (sharing a key with the entry just returned); skip the
        // remaining components to reach the next whole logical entry.
        while tree.item_key_at(&frames)?.1 > 1 {
            match tree.next_item_path(&frames)? {
                Some(f) => frames = f,
                None => {
                    self.at_end = true;
                    self.sync_version(tree);
                    return Ok(None);
                }
            }
        }

        self.before_start = false;
        self.frames = tree.frame_tuples(&frames);
        let (key, _) = tree.item_key_at(&frames)?;
        let tag = tree.read_tag_at(&frames)?;
        self.last_key = Some(key.clone());
        self.sync_version(tree);
        Ok(Some((key, tag)))
    }

    /// Retreat to the previous logical entry and return its `(key,
    /// tag)`, or `None` before the start of the table.
    pub fn prev<B: BlockIo>(&mut self, tree: &mut Table<B>) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        self.rebuild_if_stale(tree)?;
        if self.before_start || tree.have_fakeroot() || self.frames.is_empty() {
            self.before_start = true;
            return Ok(None);
        }

        let frames = if self.at_end {
            self.at_end = false;
            self.current_frames(tree)
        } else {
            match tree.prev_item_path(&self.current_frames(tree))? {
                Some(f) => f,
                None => {
                    self.before_start = true;
                    self.sync_version(tree);
                    return Ok(None);
                }
            }
        };

        // Land on the first component of whatever logical entry this is.
        let mut frames = frames;
        loop {
            let (_, component) = tree.item_key_at(&frames)?;
            if component <= 1 {
                break;
            }
            match tree.prev_item_path(&frames)? {
                Some(f) => frames = f,
                None => break,
            }
        }

        self.frames = tree.frame_tuples(&frames);
        let (key, _) = tree.item_key_at(&frames)?;
        let tag = tree.read_tag_at(&frames)?;
        self.last_key = Some(key.clone());
        self.sync_version(tree);
        Ok(Some((key, tag)))
    }

    /// Reassemble the tag at the cursor's current position without
    /// moving it.
    pub fn read_tag<B: BlockIo>(&mut self, tree: &mut Table<B>) -> Result<Option<Vec<u8>>> {
        self.rebuild_if_stale(tree)?;
        if self.before_start || self.at_end || self.frames.is_empty() {
            return Ok(None);
        }
        let frames = self.current_frames(tree);
        Ok(Some(tree.read_tag_at(&frames)?))
    }

    /// Read only the tag chunk stored at the item the cursor is currently
    /// resting on, without reassembling the rest of a multi-component tag.
    /// Most callers want [`Cursor::read_tag`]; this is exposed for callers
    /// walking components directly (mirrors the original's `get_entry`
    /// versus `readahead` split, see `SPEC_FULL.md`).
    pub fn read_component<B: BlockIo>(&mut self, tree: &mut Table<B>) -> Result<Option<Vec<u8>>> {
        self.rebuild_if_stale(tree)?;
        if self.before_start || self.at_end || self.frames.is_empty() {
            return Ok(None);
        }
        let frames = self.current_frames(tree);
        Ok(Some(tree.tag_chunk_at(&frames)?))
    }
}

impl Default for Cursor {
    fn default() -> Cursor {
        Cursor::new()
    }
}

#[cfg(test)]
#[path = "cursor_test.rs"]
mod cursor_test;
