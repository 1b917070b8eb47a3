use super::*;
use crate::block_io::MemBlockIo;
use crate::config::Config;

fn new_table(dir: &std::path::Path, block_size: usize) -> Table<MemBlockIo> {
    let cfg = Config::new(dir, "tbl").set_block_size(block_size);
    let io = MemBlockIo::new(block_size);
    Table::create(io, cfg).unwrap()
}

#[test]
fn test_check_on_empty_table_reports_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut t = new_table(dir.path(), 2048);
    let report = t.check().unwrap();
    assert_eq!(report, CheckReport::default());
}

#[test]
fn test_check_on_single_leaf() {
    let dir = tempfile::tempdir().unwrap();
    let mut t = new_table(dir.path(), 2048);
    t.set(b"a", b"1").unwrap();
    t.set(b"b", b"2").unwrap();
    let report = t.check().unwrap();
    assert_eq!(report.blocks_visited, 1);
    assert_eq!(report.leaf_blocks, 1);
    assert_eq!(report.internal_blocks, 0);
    assert_eq!(report.items, 2);
    assert_eq!(report.max_depth, 1);
}

#[test]
fn test_check_after_splits_walks_every_level() {
    let dir = tempfile::tempdir().unwrap();
    let mut t = new_table(dir.path(), 2048);
    for i in 0..400u32 {
        let key = format!("key-{:06}", i);
        t.set(key.as_bytes(), b"v").unwrap();
    }
    let report = t.check().unwrap();
    assert_eq!(report.items, 400);
    assert!(report.internal_blocks > 0);
    assert!(report.max_depth >= 2);
}

#[test]
fn test_check_after_deletes_still_passes() {
    let dir = tempfile::tempdir().unwrap();
    let mut t = new_table(dir.path(), 2048);
    for i in 0..200u32 {
        let key = format!("k{:05}", i);
        t.set(key.as_bytes(), b"v").unwrap();
    }
    for i in (0..200u32).step_by(2) {
        let key = format!("k{:05}", i);
        t.delete(key.as_bytes()).unwrap();
    }
    let report = t.check().unwrap();
    assert_eq!(report.items, 100);
}

#[test]
fn test_check_passes_after_commit() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config::new(dir.path(), "tbl").set_block_size(2048);
    let io = MemBlockIo::new(2048);
    let mut t = Table::create(io, cfg).unwrap();
    for i in 0..50u32 {
        let key = format!("k{:04}", i);
        t.set(key.as_bytes(), b"v").unwrap();
    }
    t.commit(1).unwrap();
    let report = t.check().unwrap();
    assert_eq!(report.items, 50);
}
