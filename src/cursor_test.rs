use super::*;
use crate::block_io::MemBlockIo;
use crate::config::Config;

fn new_table(dir: &std::path::Path, block_size: usize) -> Table<MemBlockIo> {
    let cfg = Config::new(dir, "tbl").set_block_size(block_size);
    let io = MemBlockIo::new(block_size);
    Table::create(io, cfg).unwrap()
}

#[test]
fn test_next_on_empty_table_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let mut t = new_table(dir.path(), 2048);
    let mut c = Cursor::new();
    assert_eq!(c.next(&mut t).unwrap(), None);
}

#[test]
fn test_first_then_next_walks_in_key_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut t = new_table(dir.path(), 2048);
    for k in ["c", "a", "b"] {
        t.set(k.as_bytes(), b"v").unwrap();
    }
    let mut c = Cursor::new();
    c.first(&mut t).unwrap();
    let mut seen = Vec::new();
    while let Some((k, _)) = c.next(&mut t).unwrap() {
        seen.push(k);
    }
    assert_eq!(seen, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn test_last_then_prev_walks_in_reverse_key_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut t = new_table(dir.path(), 2048);
    for k in ["c", "a", "b"] {
        t.set(k.as_bytes(), b"v").unwrap();
    }
    let mut c = Cursor::new();
    assert!(c.last(&mut t).unwrap());
    let mut seen = vec![c_key(&mut c, &mut t)];
    while let Some((k, _)) = c.prev(&mut t).unwrap() {
        seen.push(k);
    }
    assert_eq!(seen, vec![b"c".to_vec(), b"b".to_vec(), b"a".to_vec()]);
}

fn c_key(c: &mut Cursor, t: &mut Table<MemBlockIo>) -> Vec<u8> {
    let frames = t.frames_from_tuples(&c.frames);
    t.item_key_at(&frames).unwrap().0
}

#[test]
fn test_find_exact_and_missing_key() {
    let dir = tempfile::tempdir().unwrap();
    let mut t = new_table(dir.path(), 2048);
    t.set(b"m", b"mid").unwrap();
    t.set(b"z", b"last").unwrap();
    let mut c = Cursor::new();
    assert!(c.find(&mut t, b"m").unwrap());
    assert_eq!(c.read_tag(&mut t).unwrap(), Some(b"mid".to_vec()));

    assert!(!c.find(&mut t, b"n").unwrap());
    let (next_key, _) = c.next(&mut t).unwrap().unwrap();
    assert_eq!(next_key, b"z".to_vec());
}

#[test]
fn test_cursor_over_long_tag_spanning_components() {
    let dir = tempfile::tempdir().unwrap();
    let mut t = new_table(dir.path(), 2048);
    let tag: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
    t.set(b"only", &tag).unwrap();
    let mut c = Cursor::new();
    c.first(&mut t).unwrap();
    let (key, got) = c.next(&mut t).unwrap().unwrap();
    assert_eq!(key, b"only".to_vec());
    assert_eq!(got, tag);
    assert_eq!(c.next(&mut t).unwrap(), None);
}

#[test]
fn test_cursor_rebuilds_after_table_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let mut t = new_table(dir.path(), 2048);
    t.set(b"a", b"1").unwrap();
    t.set(b"c", b"3").unwrap();
    let mut c = Cursor::new();
    assert!(c.find(&mut t, b"a").unwrap());

    t.set(b"b", b"2").unwrap();
    let tag = c.read_tag(&mut t).unwrap();
    assert_eq!(tag, Some(b"1".to_vec()));

    let (next_key, _) = c.next(&mut t).unwrap().unwrap();
    assert_eq!(next_key, b"b".to_vec());
}

#[test]
fn test_read_component_returns_only_current_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let mut t = new_table(dir.path(), 2048);
    t.set(b"short", b"v").unwrap();
    let mut c = Cursor::new();
    assert!(c.find(&mut t, b"short").unwrap());
    assert_eq!(c.read_component(&mut t).unwrap(), Some(b"v".to_vec()));
    assert_eq!(c.read_tag(&mut t).unwrap(), Some(b"v".to_vec()));
}

#[test]
fn test_many_items_roundtrip_through_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let mut t = new_table(dir.path(), 2048);
    for i in 0..150u32 {
        let key = format!("k{:05}", i);
        t.set(key.as_bytes(), b"v").unwrap();
    }
    let mut c = Cursor::new();
    c.first(&mut t).unwrap();
    let mut count = 0;
    let mut prev: Option<Vec<u8>> = None;
    while let Some((k, _)) = c.next(&mut t).unwrap() {
        if let Some(p) = &prev {
            assert!(p < &k, "cursor must yield strictly ascending keys");
        }
        prev = Some(k);
        count += 1;
    }
    assert_eq!(count, 150);
}
