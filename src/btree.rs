//! The B-tree core: search, insert, delete, block split, root promotion,
//! copy-on-write `alter`, long-tag chunking, and the sequential-append
//! optimisation. See `SPEC_FULL.md` §4.F and the grounding in
//! `examples/original_source` (`xapian-core/backends/quartz/btree.cc`).
//!
//! Pages here are always kept fully compacted (see `page.rs`'s module
//! doc), which collapses the original's three-way
//! replace-in-place/relocate/delete-then-reinsert update path into a
//! single collect-items/splice/rebuild step. Block splits, root
//! promotion, the copy-on-write walk, and the sequential/mid-point split
//! choice are implemented in full.

use std::collections::HashMap;

use crate::base::{self, BaseRecord, Slot};
use crate::bitmap::Bitmap;
use crate::block_io::BlockIo;
use crate::codec::{BTREE_CURSOR_LEVELS, BTREE_MAX_KEY_LEN, C2, D2, DIR_START, I2, K1, SEQ_START_POINT};
use crate::config::Config;
use crate::error::Result;
use crate::lockfile::WriteLock;
use crate::page::{build_internal_item, build_leaf_item, build_null_key_item, cmp_key, ItemView, Page};

/// One step of a root-to-leaf descent: the block visited, and the
/// directory slot chosen in it (the slot that routes to the next frame,
/// or — for the last, leaf frame — the matched/insertion slot).
#[derive(Clone, Copy, Debug)]
pub(crate) struct Frame {
    pub n: u32,
    pub slot: usize,
}

pub(crate) struct Walk {
    pub frames: Vec<Frame>,
    pub leaf_slot: Option<usize>,
    pub exact: bool,
}

/// A persistent, revision-numbered, copy-on-write B-tree table.
pub struct Table<B: BlockIo> {
    cfg: Config,
    io: B,
    bitmap: Bitmap,
    slot: Slot,
    revision: u64,
    next_revision: u64,
    root: u32,
    level: u8,
    item_count: u64,
    have_fakeroot: bool,
    sequential: bool,
    seq_count: i32,
    /// `(block, slot)` of the most recent insertion, used to detect a
    /// run of sequential appends.
    changed: Option<(u32, usize)>,
    dirty: HashMap<u32, Page>,
    writable: bool,
    max_item_size: usize,
    cursor_version: u64,
    /// Held only by a writable handle; enforces spec §5's single-writer
    /// rule across processes on the same host. `None` for a read-only
    /// handle — any number of those may coexist with the one writer.
    write_lock: Option<WriteLock>,
}

impl<B: BlockIo> Table<B> {
    /// Bootstrap a brand-new table: write `baseA` at revision 0 with a
    /// faked (never-allocated) root, delete any stale `baseB`, per
    /// spec §4.I.
    pub fn create(io: B, cfg: Config) -> Result<Table<B>> {
        if io.block_size() != cfg.block_size() {
            return err_at!(
                InvalidArgumentError,
                msg: "block io configured for {} bytes but table wants {}", io.block_size(), cfg.block_size()
            );
        }
        let write_lock = WriteLock::acquire(cfg.dir(), cfg.name())?;
        let bitmap = Bitmap::empty();
        base::delete_stale(cfg.dir(), cfg.name(), Slot::B)?;
        let record = BaseRecord {
            revision: 0,
            block_size: cfg.block_size() as u32,
            root: 0,
            level: 0,
            item_count: 0,
            last_block: 0,
            have_fakeroot: true,
            sequential: false,
            bitmap_bytes: bitmap.to_bytes(),
        };
        base::write(cfg.dir(), cfg.name(), Slot::A, &record)?;
        let max_item_size = cfg.max_item_size();
        Ok(Table {
            cfg,
            io,
            bitmap,
            slot: Slot::A,
            revision: 0,
            next_revision: 1,
            root: 0,
            level: 0,
            item_count: 0,
            have_fakeroot: true,
            sequential: false,
            seq_count: SEQ_START_POINT,
            changed: None,
            dirty: HashMap::new(),
            writable: true,
            max_item_size,
            cursor_version: 0,
            write_lock: Some(write_lock),
        })
    }

    /// Open an existing table against its most recent (or explicitly
    /// requested, via [`Config::set_revision`]) committed revision.
    pub fn open(io: B, cfg: Config) -> Result<Table<B>> {
        let loaded = base::load(cfg.dir(), cfg.name(), cfg.revision())?;
        let rec = loaded.record;
        if io.block_size() != rec.block_size as usize {
            return err_at!(
                DatabaseOpeningError,
                msg: "block io size {} does not match base record {}", io.block_size(), rec.block_size
            );
        }
        let writable = !cfg.readonly();
        let write_lock = if writable {
            Some(WriteLock::acquire(cfg.dir(), cfg.name())?)
        } else {
            None
        };
        let bitmap = Bitmap::from_bytes(rec.bitmap_bytes.clone());
        let max_item_size = cfg.max_item_size();
        Ok(Table {
            cfg,
            io,
            bitmap,
            slot: loaded.slot,
            revision: rec.revision,
            next_revision: rec.revision + 1,
            root: rec.root,
            level: rec.level,
            item_count: rec.item_count,
            have_fakeroot: rec.have_fakeroot,
            sequential: rec.sequential,
            seq_count: SEQ_START_POINT,
            changed: None,
            dirty: HashMap::new(),
            writable,
            max_item_size,
            cursor_version: 0,
            write_lock,
        })
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> u64 {
        self.item_count
    }

    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }

    pub fn block_size(&self) -> usize {
        self.cfg.block_size()
    }

    pub fn height(&self) -> u8 {
        self.level
    }

    pub(crate) fn have_fakeroot(&self) -> bool {
        self.have_fakeroot
    }

    pub(crate) fn cursor_version(&self) -> u64 {
        self.cursor_version
    }

    pub(crate) fn block_free_now(&self, n: u32) -> bool {
        self.bitmap.block_free_now(n)
    }

    pub(crate) fn root(&self) -> u32 {
        self.root
    }

    fn max_key_len(&self) -> usize {
        let cap = self.max_item_size.saturating_sub(K1 + I2 + 2 * C2);
        cap.min(BTREE_MAX_KEY_LEN)
    }

    /// Read block `n` and check it against the revision this handle is
    /// allowed to see. A block stamped with a revision newer than ours
    /// means a later commit has recycled it out from under us: for a
    /// read-only handle that is the ordinary "revision discarded"
    /// outcome (reopen and retry); for a writable handle it can only mean
    /// another writer touched the same table concurrently, which this
    /// layer does not support and treats as corruption. Spec §7.3.
    fn read_disk_page(&mut self, n: u32) -> Result<Page> {
        let mut buf = vec![0u8; self.cfg.block_size()];
        self.io.read_block(n, &mut buf)?;
        let page = Page::from_buf(buf);
        if page.revision() as u64 > self.revision {
            return if self.writable {
                err_at!(
                    DatabaseCorruptError,
                    msg: "block {} carries revision {} newer than this writer's {}; concurrent writer?",
                    n, page.revision(), self.revision
                )
            } else {
                err_at!(
                    DatabaseModifiedError,
                    msg: "block {} was recycled by a later commit; revision {} has been discarded",
                    n, self.revision
                )
            };
        }
        Ok(page)
    }

    pub(crate) fn load_page(&mut self, n: u32) -> Result<Page> {
        if let Some(p) = self.dirty.get(&n) {
            return Ok(p.clone());
        }
        self.read_disk_page(n)
    }

    /// Descend from the root to the leaf slot whose key is the greatest
    /// `<= (key, component)`. See spec §4.F "Search".
    pub(crate) fn find_path(&mut self, key: &[u8], component: u16) -> Result<Walk> {
        let mut frames = Vec::new();
        let mut n = self.root;
        loop {
            let page = self.load_page(n)?;
            let hint = match self.changed {
                Some((cn, cs)) if cn == n => Some(cs),
                _ => None,
            };
            let (slot_opt, exact) = page.find_in_block(key, component, hint);
            if page.is_leaf() {
                frames.push(Frame { n, slot: slot_opt.unwrap_or(0) });
                return Ok(Walk { frames, leaf_slot: slot_opt, exact });
            }
            let slot = slot_opt.unwrap_or(0);
            frames.push(Frame { n, slot });
            n = page.item_at(slot).child_block();
        }
    }

    pub(crate) fn rightmost_path(&mut self) -> Result<Vec<Frame>> {
        let mut frames = Vec::new();
        let mut n = self.root;
        loop {
            let page = self.load_page(n)?;
            let last = page.dir_len().saturating_sub(1);
            frames.push(Frame { n, slot: last });
            if page.is_leaf() {
                return Ok(frames);
            }
            n = page.item_at(last).child_block();
        }
    }

    /// Frame whose directory slot is one past `frames`'s leaf slot,
    /// crossing block/level boundaries as needed. `None` past the last
    /// item in the tree.
    pub(crate) fn next_item_path(&mut self, frames: &[Frame]) -> Result<Option<Vec<Frame>>> {
        let mut frames = frames.to_vec();
        let mut level = frames.len() - 1;
        loop {
            let page = self.load_page(frames[level].n)?;
            if frames[level].slot + 1 < page.dir_len() {
                frames[level].slot += 1;
                break;
            }
            if level == 0 {
                return Ok(None);
            }
            level -= 1;
        }
        frames.truncate(level + 1);
        loop {
            let page = self.load_page(frames[level].n)?;
            if page.is_leaf() {
                return Ok(Some(frames));
            }
            let child = page.item_at(frames[level].slot).child_block();
            frames.push(Frame { n: child, slot: 0 });
            level += 1;
        }
    }

    /// Symmetric predecessor of [`Table::next_item_path`].
    pub(crate) fn prev_item_path(&mut self, frames: &[Frame]) -> Result<Option<Vec<Frame>>> {
        let mut frames = frames.to_vec();
        let mut level = frames.len() - 1;
        loop {
            if frames[level].slot > 0 {
                frames[level].slot -= 1;
                break;
            }
            if level == 0 {
                return Ok(None);
            }
            level -= 1;
        }
        frames.truncate(level + 1);
        loop {
            let page = self.load_page(frames[level].n)?;
            if page.is_leaf() {
                return Ok(Some(frames));
            }
            let child = page.item_at(frames[level].slot).child_block();
            let child_page = self.load_page(child)?;
            let last = child_page.dir_len().saturating_sub(1);
            frames.push(Frame { n: child, slot: last });
            level += 1;
        }
    }

    pub(crate) fn frame_tuples(&self, frames: &[Frame]) -> Vec<(u32, usize)> {
        frames.iter().map(|f| (f.n, f.slot)).collect()
    }

    pub(crate) fn frames_from_tuples(&self, tuples: &[(u32, usize)]) -> Vec<Frame> {
        tuples.iter().map(|&(n, slot)| Frame { n, slot }).collect()
    }

    pub(crate) fn item_key_at(&mut self, frames: &[Frame]) -> Result<(Vec<u8>, u16)> {
        let f = frames.last().unwrap();
        let page = self.load_page(f.n)?;
        let item = page.item_at(f.slot);
        Ok((item.user_key().to_vec(), item.component()))
    }

    pub(crate) fn components_count_at(&mut self, frames: &[Frame]) -> Result<u16> {
        let f = frames.last().unwrap();
        let page = self.load_page(f.n)?;
        Ok(page.item_at(f.slot).components_count())
    }

    /// This item's own tag chunk, without reassembling the rest of a
    /// multi-component tag. Mirrors the original's `get_entry` (whole tag)
    /// vs. `readahead` (one component) split; used by
    /// [`crate::cursor::Cursor::read_component`].
    pub(crate) fn tag_chunk_at(&mut self, frames: &[Frame]) -> Result<Vec<u8>> {
        let f = frames.last().unwrap();
        let page = self.load_page(f.n)?;
        Ok(page.item_at(f.slot).tag_chunk().to_vec())
    }

    /// Concatenate a multi-component tag starting at the component-1 item
    /// described by `frames`, walking forward via [`Table::next_item_path`]
    /// for the remaining components. Spec §4.F "Long tag reconstruction".
    pub(crate) fn read_tag_at(&mut self, frames: &[Frame]) -> Result<Vec<u8>> {
        let f = frames.last().unwrap();
        let page = self.load_page(f.n)?;
        let item = page.item_at(f.slot);
        let n_components = item.components_count();
        let mut tag = Vec::with_capacity(self.max_item_size * n_components.max(1) as usize);
        tag.extend_from_slice(item.tag_chunk());

        let mut cur = frames.to_vec();
        for _ in 2..=n_components {
            cur = match self.next_item_path(&cur)? {
                Some(f) => f,
                None => return err_at!(DatabaseCorruptError, msg: "missing tag component"),
            };
            let p = self.load_page(cur.last().unwrap().n)?;
            let it = p.item_at(cur.last().unwrap().slot);
            tag.extend_from_slice(it.tag_chunk());
        }
        Ok(tag)
    }

    /// Point lookup. Reassembles the full tag across however many
    /// components it was chunked into.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if self.have_fakeroot {
            return Ok(None);
        }
        let walk = self.find_path(key, 1)?;
        if !walk.exact {
            return Ok(None);
        }
        Ok(Some(self.read_tag_at(&walk.frames)?))
    }

    /// Copy-on-write walk from leaf to root along `frames`: already-dirty
    /// blocks (touched earlier this transaction) are reused as-is;
    /// others are renumbered unless they were free at the start of the
    /// transaction, per spec §4.F "Copy-on-write (alter)". Updates
    /// `frames` in place with the final block numbers, and patches each
    /// ancestor's child pointer when its child renumbers.
    fn alter_path(&mut self, frames: &mut [Frame]) -> Result<()> {
        let mut child_update: Option<u32> = None;
        for i in (0..frames.len()).rev() {
            let old_n = frames[i].n;
            let existing = self.dirty.remove(&old_n);
            let was_dirty = existing.is_some();
            let mut page = match existing {
                Some(p) => p,
                None => self.read_disk_page(old_n)?,
            };
            let mut n = old_n;
            if !was_dirty {
                if self.bitmap.block_free_at_start(old_n) {
                    // Safe to rewrite in place: no earlier revision can
                    // still be reading it.
                } else {
                    self.bitmap.free_block(old_n);
                    n = self.bitmap.next_free_block()?;
                }
                page.set_revision(self.next_revision as u32);
            }
            if let Some(new_child) = child_update {
                page.set_child_at(frames[i].slot, new_child);
            }
            self.dirty.insert(n, page);
            let renumbered = n != old_n;
            frames[i].n = n;
            child_update = if renumbered { Some(n) } else { None };
        }
        if let Some(new_root) = child_update {
            // `frames` always starts at the root (see `find_path`), so a
            // renumbering that survives the whole walk is the root's.
            self.root = new_root;
        }
        Ok(())
    }

    /// Insert or update `key` -> `tag`. Oversize tags are split across up
    /// to 65535 component items; see spec §4.F "Insertion and
    /// replacement".
    pub fn set(&mut self, key: &[u8], tag: &[u8]) -> Result<()> {
        if !self.writable {
            return err_at!(InvalidArgumentError, msg: "table was opened read-only");
        }
        if key.len() > self.max_key_len() {
            return err_at!(
                InvalidArgumentError,
                msg: "key length {} exceeds maximum {}", key.len(), self.max_key_len()
            );
        }

        if self.have_fakeroot {
            let n = self.bitmap.next_free_block()?;
            let mut page = Page::new(self.cfg.block_size());
            page.init_empty(self.next_revision as u32, 0);
            self.dirty.insert(n, page);
            self.root = n;
            self.level = 0;
            self.have_fakeroot = false;
        }

        let old_walk = self.find_path(key, 1)?;
        let old_components: u16 = if old_walk.exact {
            self.components_count_at(&old_walk.frames)?
        } else {
            0
        };

        let cd = key.len() + K1 + I2 + 2 * C2;
        if cd >= self.max_item_size {
            return err_at!(InvalidArgumentError, msg: "key too large for this block size");
        }
        let l = self.max_item_size - cd;
        let first_l = l;

        let m: usize = if tag.len() <= first_l {
            1
        } else {
            1 + ((tag.len() - first_l) + l - 1) / l
        };
        if m > u16::MAX as usize {
            return err_at!(InvalidArgumentError, msg: "tag requires {} components, more than 65535", m);
        }

        for i in 1..=m {
            let chunk: &[u8] = if i == 1 {
                &tag[0..first_l.min(tag.len())]
            } else {
                let start = first_l + (i - 2) * l;
                let end = (start + l).min(tag.len());
                &tag[start..end]
            };
            let item = build_leaf_item(key, i as u16, m as u16, chunk);
            self.add_kt(key, i as u16, item)?;
        }

        if (m as u16) < old_components {
            for i in (m as u16 + 1)..=old_components {
                self.delete_component(key, i)?;
            }
        }

        if !old_walk.exact {
            self.item_count += 1;
        }
        Ok(())
    }

    fn add_kt(&mut self, key: &[u8], component: u16, item: Vec<u8>) -> Result<()> {
        let mut path = self.find_path(key, component)?;
        let leaf_n = path.frames.last().unwrap().n;
        let leaf = self.load_page(leaf_n)?;
        let mut items = leaf.collect_items();

        let (insert_at, exact) = match path.leaf_slot {
            Some(slot) => {
                let iv = leaf.item_at(slot);
                if cmp_key(iv.user_key(), iv.component(), key, component) == std::cmp::Ordering::Equal {
                    (slot, true)
                } else {
                    (slot + 1, false)
                }
            }
            None => (0, false),
        };

        if exact {
            items[insert_at] = item;
        } else {
            let follows_last_insert = self.changed == Some((leaf_n, insert_at));
            if follows_last_insert {
                self.seq_count = (self.seq_count + 1).min(0);
                if self.seq_count == 0 {
                    self.sequential = true;
                }
            } else {
                self.seq_count = SEQ_START_POINT;
                self.sequential = false;
            }
            items.insert(insert_at, item);
            self.changed = Some((leaf_n, insert_at + 1));
        }

        self.alter_path(&mut path.frames)?;
        let leaf_idx = path.frames.len() - 1;
        self.write_node_or_split(&mut path.frames, leaf_idx, items, 0, insert_at)
    }

    /// Rebuild `node_idx`'s block with `items`, splitting (and
    /// recursively inserting a separator into the parent, promoting the
    /// root if necessary) when they do not fit. Spec §4.F "Block split".
    fn write_node_or_split(
        &mut self,
        frames: &mut [Frame],
        node_idx: usize,
        items: Vec<Vec<u8>>,
        level: u8,
        insert_at: usize,
    ) -> Result<()> {
        let block_size = self.cfg.block_size();
        let dir_end = DIR_START + items.len() * D2;
        let bytes: usize = items.iter().map(Vec::len).sum();
        let node_n = frames[node_idx].n;

        if dir_end + bytes <= block_size {
            let mut page = self.dirty.remove(&node_n).unwrap_or_else(|| Page::new(block_size));
            page.rebuild(&items, self.next_revision as u32, level)?;
            self.dirty.insert(node_n, page);
            return Ok(());
        }

        let m = if level == 0 && self.sequential {
            insert_at.clamp(1, items.len().saturating_sub(1))
        } else {
            mid_point_of(&items)
        };
        let m = m.max(1).min(items.len() - 1);
        let lower = items[..m].to_vec();
        let upper = items[m..].to_vec();

        let lower_n = node_n;
        let upper_n = self.bitmap.next_free_block()?;

        let mut lower_page = Page::new(block_size);
        lower_page.rebuild(&lower, self.next_revision as u32, level)?;
        self.dirty.insert(lower_n, lower_page);

        let mut upper_page = Page::new(block_size);
        upper_page.rebuild(&upper, self.next_revision as u32, level)?;
        self.dirty.insert(upper_n, upper_page);

        let sep_view = ItemView::new(&upper[0], 0);
        let sep_item = build_internal_item(sep_view.user_key(), sep_view.component(), upper_n);

        if node_idx == 0 {
            return self.split_root(lower_n, sep_item);
        }

        let parent_idx = node_idx - 1;
        let parent_n = frames[parent_idx].n;
        let parent_slot = frames[parent_idx].slot;
        let parent_page = self.load_page(parent_n)?;
        let mut parent_items = parent_page.collect_items();
        let parent_level = parent_page.header().level;
        parent_items.insert(parent_slot + 1, sep_item);

        self.write_node_or_split(frames, parent_idx, parent_items, parent_level, parent_slot + 1)
    }

    fn split_root(&mut self, lower_n: u32, upper_item: Vec<u8>) -> Result<()> {
        if self.level as usize + 1 >= BTREE_CURSOR_LEVELS {
            return err_at!(
                DatabaseCorruptError,
                msg: "tree would exceed maximum height {}", BTREE_CURSOR_LEVELS
            );
        }
        let new_root_n = self.bitmap.next_free_block()?;
        let mut page = Page::new(self.cfg.block_size());
        let null_item = build_null_key_item(lower_n);
        page.rebuild(&[null_item, upper_item], self.next_revision as u32, self.level + 1)?;
        self.dirty.insert(new_root_n, page);
        self.root = new_root_n;
        self.level += 1;
        Ok(())
    }

    /// Remove `key` and every component of its tag. Returns whether the
    /// key was present.
    pub fn delete(&mut self, key: &[u8]) -> Result<bool> {
        if !self.writable {
            return err_at!(InvalidArgumentError, msg: "table was opened read-only");
        }
        if self.have_fakeroot {
            return Ok(false);
        }
        let walk = self.find_path(key, 1)?;
        if !walk.exact {
            return Ok(false);
        }
        let n_components = self.components_count_at(&walk.frames)?;
        for i in 1..=n_components {
            self.delete_component(key, i)?;
        }
        self.item_count = self.item_count.saturating_sub(1);
        self.seq_count = SEQ_START_POINT;
        self.sequential = false;
        self.changed = None;
        Ok(true)
    }

    fn delete_component(&mut self, key: &[u8], component: u16) -> Result<()> {
        let mut walk = self.find_path(key, component)?;
        if !walk.exact {
            return Ok(());
        }
        self.alter_path(&mut walk.frames)?;

        let leaf_idx = walk.frames.len() - 1;
        let leaf_n = walk.frames[leaf_idx].n;
        let slot = walk.frames[leaf_idx].slot;
        let mut page = self.dirty.remove(&leaf_n).unwrap();
        let level = page.header().level;
        let mut items = page.collect_items();
        items.remove(slot);

        if items.is_empty() && leaf_idx > 0 {
            self.bitmap.free_block(leaf_n);
            walk.frames.truncate(leaf_idx);
            self.collapse_parent(&mut walk.frames)?;
        } else {
            page.rebuild(&items, self.next_revision as u32, level)?;
            self.dirty.insert(leaf_n, page);
        }
        Ok(())
    }

    /// After a child block has been freed, remove its pointer from the
    /// parent, recursing upward through any parent that itself becomes
    /// empty, and collapsing the root by a level if it is left holding a
    /// single child.
    fn collapse_parent(&mut self, frames: &mut Vec<Frame>) -> Result<()> {
        loop {
            let Some(parent) = frames.last().copied() else {
                // The (internal) root itself was just freed: the tree is
                // now empty.
                self.have_fakeroot = true;
                self.root = 0;
                self.level = 0;
                return Ok(());
            };
            let is_root = frames.len() == 1;
            let mut page = self.dirty.remove(&parent.n).unwrap_or(self.load_page(parent.n)?);
            let level = page.header().level;
            let mut items = page.collect_items();
            items.remove(parent.slot);

            if items.is_empty() {
                self.bitmap.free_block(parent.n);
                frames.pop();
                continue;
            }
            if is_root && items.len() == 1 && level > 0 {
                let only_child = ItemView::new(&items[0], 0).child_block();
                self.bitmap.free_block(parent.n);
                self.root = only_child;
                self.level = self.level.saturating_sub(1);
                return Ok(());
            }
            page.rebuild(&items, self.next_revision as u32, level)?;
            self.dirty.insert(parent.n, page);
            return Ok(());
        }
    }

    /// Flush dirty blocks, persist the bitmap and root into the inactive
    /// base file, and flip the active base letter. Spec §4.H.
    pub fn commit(&mut self, new_revision: u64) -> Result<()> {
        if !self.writable {
            return err_at!(InvalidArgumentError, msg: "table was opened read-only");
        }
        if new_revision <= self.revision {
            return err_at!(
                InvalidArgumentError,
                msg: "commit revision {} must exceed current revision {}", new_revision, self.revision
            );
        }

        let inactive = self.slot.other();
        base::delete_stale(self.cfg.dir(), self.cfg.name(), inactive)?;

        for (&n, page) in self.dirty.iter() {
            self.io.write_block(n, &page.buf)?;
        }
        self.io.flush()?;

        self.bitmap.recommit();
        let record = BaseRecord {
            revision: new_revision,
            block_size: self.cfg.block_size() as u32,
            root: self.root,
            level: self.level,
            item_count: self.item_count,
            last_block: self.bitmap.get_last_block().unwrap_or(0),
            have_fakeroot: self.have_fakeroot,
            sequential: self.sequential,
            bitmap_bytes: self.bitmap.to_bytes(),
        };
        base::write(self.cfg.dir(), self.cfg.name(), inactive, &record)?;

        self.slot = inactive;
        self.revision = new_revision;
        self.next_revision = new_revision + 1;
        self.dirty.clear();
        self.changed = None;
        self.seq_count = SEQ_START_POINT;
        self.cursor_version += 1;
        log::debug!("committed revision {} ({} items)", new_revision, self.item_count);
        Ok(())
    }

    /// Discard uncommitted writes and reload the last committed state.
    /// `next_revision` is left unchanged so the next commit still targets
    /// `revision + 1`.
    pub fn cancel(&mut self) -> Result<()> {
        if !self.writable {
            return err_at!(InvalidArgumentError, msg: "table was opened read-only");
        }
        let loaded = base::load(self.cfg.dir(), self.cfg.name(), Some(self.revision))?;
        let rec = loaded.record;
        self.bitmap = Bitmap::from_bytes(rec.bitmap_bytes);
        self.root = rec.root;
        self.level = rec.level;
        self.item_count = rec.item_count;
        self.have_fakeroot = rec.have_fakeroot;
        self.sequential = rec.sequential;
        self.slot = loaded.slot;
        self.dirty.clear();
        self.changed = None;
        self.seq_count = SEQ_START_POINT;
        self.cursor_version += 1;
        log::debug!("cancelled transaction, reverted to revision {}", self.revision);
        Ok(())
    }
}

fn mid_point_of(items: &[Vec<u8>]) -> usize {
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

#[cfg(test)]
#[path = "btree_test.rs"]
mod btree_test;
