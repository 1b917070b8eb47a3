use super::*;

#[test]
fn test_alloc_free_reuse() {
    let mut bm = Bitmap::empty();

    let a = bm.next_free_block().unwrap();
    let b = bm.next_free_block().unwrap();
    assert_eq!(a, 0);
    assert_eq!(b, 1);
    assert!(!bm.block_free_now(a));
    assert!(!bm.block_free_now(b));

    // freed-but-not-committed block is reused ahead of fresh ones.
    bm.free_block(a);
    assert!(bm.block_free_now(a));
    assert!(bm.block_free_at_start(a)); // still set in committed

    let c = bm.next_free_block().unwrap();
    assert_eq!(c, a);
}

#[test]
fn test_free_at_start_vs_working() {
    let mut bm = Bitmap::empty();
    let n = bm.next_free_block().unwrap();
    bm.recommit();
    assert!(!bm.block_free_at_start(n));
    bm.free_block(n);
    assert!(bm.block_free_now(n));
    assert!(!bm.block_free_at_start(n));
}

#[test]
fn test_extends_past_bytes_step() {
    let mut bm = Bitmap::empty();
    let mut last = 0;
    for _ in 0..(BYTES_STEP * 8 + 10) {
        last = bm.next_free_block().unwrap();
    }
    assert_eq!(last, (BYTES_STEP * 8 + 9) as u32);
}

#[test]
fn test_rollback_discards_working_allocations() {
    let mut bm = Bitmap::empty();
    let a = bm.next_free_block().unwrap();
    bm.recommit();

    let _b = bm.next_free_block().unwrap();
    bm.rollback();

    assert!(!bm.block_free_now(a));
    let again = bm.next_free_block().unwrap();
    assert_eq!(again, 1);
}

#[test]
fn test_to_bytes_trims_trailing_zeros() {
    let mut bm = Bitmap::empty();
    let a = bm.next_free_block().unwrap();
    bm.free_block(a);
    let bytes = bm.to_bytes();
    assert!(bytes.is_empty() || *bytes.last().unwrap() != 0);
}

#[test]
fn test_get_last_block_none_when_empty() {
    let mut bm = Bitmap::empty();
    assert_eq!(bm.get_last_block(), None);
}

#[test]
fn test_get_last_block_highest_bit() {
    let mut bm = Bitmap::empty();
    for _ in 0..20 {
        bm.next_free_block().unwrap();
    }
    let nineteen = 19;
    bm.free_block(nineteen);
    assert_eq!(bm.get_last_block(), Some(18));
}
