//! Read-only structural validator. Grounded on the original Xapian
//! `Btree::check()` (used by the `quartzdump`/`quartzcheck` tools) — walks
//! every block reachable from the root and asserts the invariants from
//! spec §3/§8: directory ordering, free-space bookkeeping, and
//! revision-monotonicity down the tree.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::block_io::BlockIo;
use crate::btree::Table;
use crate::error::Result;
use crate::page::cmp_key;

/// Summary of one [`Table::check`] pass.
///
/// `items` counts logical entries, not directory slots: internal separator
/// items and trailing tag-chunk components (component > 1) are not counted,
/// only each leaf item whose component counter is 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub blocks_visited: usize,
    pub leaf_blocks: usize,
    pub internal_blocks: usize,
    pub items: usize,
    pub max_depth: usize,
}

impl<B: BlockIo> Table<B> {
    /// Walk every block reachable from the current root, verifying that
    /// each is marked allocated in the bitmap, that its header and
    /// free-space bookkeeping are self-consistent, that its directory is
    /// strictly ordered, and that no child's revision exceeds its
    /// parent's.
    pub fn check(&mut self) -> Result<CheckReport> {
        let mut report = CheckReport::default();
        if self.have_fakeroot() {
            return Ok(report);
        }
        let mut visited = HashSet::new();
        let revision = self.revision() as u32;
        let root = self.root();
        self.check_block(root, revision, 1, &mut visited, &mut report)?;
        Ok(report)
    }

    fn check_block(
        &mut self,
        n: u32,
        parent_revision: u32,
        depth: usize,
        visited: &mut HashSet<u32>,
        report: &mut CheckReport,
    ) -> Result<()> {
        if !visited.insert(n) {
            return err_at!(DatabaseCorruptError, msg: "block {} reachable from more than one parent", n);
        }
        if self.block_free_now(n) {
            return err_at!(
                DatabaseCorruptError,
                msg: "block {} is reachable from the tree but not marked allocated", n
            );
        }

        let page = self.load_page(n)?;
        let header = page.header();
        header.validate(self.block_size())?;
        if header.revision > parent_revision {
            return err_at!(
                DatabaseCorruptError,
                msg: "block {} has revision {} newer than its parent's {}", n, header.revision, parent_revision
            );
        }

        let item_bytes: usize = (0..page.dir_len()).map(|i| page.item_at(i).len()).sum();
        let accounted = item_bytes + header.total_free as usize + header.dir_end as usize;
        if accounted != self.block_size() {
            return err_at!(
                DatabaseCorruptError,
                msg: "block {} bookkeeping mismatch: {} items + {} free + {} directory != {} block size",
                n, item_bytes, header.total_free, header.dir_end, self.block_size()
            );
        }

        report.blocks_visited += 1;
        report.max_depth = report.max_depth.max(depth);

        let mut prev: Option<(Vec<u8>, u16)> = None;
        for i in 0..page.dir_len() {
            let item = page.item_at(i);
            let key = (item.user_key().to_vec(), item.component());
            if let Some((pk, pc)) = &prev {
                if cmp_key(pk, *pc, &key.0, key.1) != Ordering::Less {
                    return err_at!(DatabaseCorruptError, msg: "block {} directory is not strictly ascending", n);
                }
            }
            prev = Some(key);
        }

        if page.is_leaf() {
            report.leaf_blocks += 1;
            report.items += (0..page.dir_len()).filter(|&i| page.item_at(i).component() == 1).count();
        } else {
            report.internal_blocks += 1;
            let children: Vec<u32> = (0..page.dir_len()).map(|i| page.item_at(i).child_block()).collect();
            for child in children {
                self.check_block(child, header.revision, depth + 1, visited, report)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "check_test.rs"]
mod check_test;
