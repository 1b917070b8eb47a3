use super::*;

#[test]
fn test_be_roundtrip() {
    let mut buf = [0u8; 16];
    put_u8(&mut buf, 0, 0xAB);
    put_u16(&mut buf, 1, 0x1234);
    put_u32(&mut buf, 3, 0xDEAD_BEEF);
    assert_eq!(get_u8(&buf, 0), 0xAB);
    assert_eq!(get_u16(&buf, 1), 0x1234);
    assert_eq!(get_u32(&buf, 3), 0xDEAD_BEEF);
}

#[test]
fn test_varint_roundtrip_small_and_large() {
    for v in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
        let mut out = Vec::new();
        put_varint(&mut out, v);
        let (decoded, n) = get_varint(&out).unwrap();
        assert_eq!(decoded, v);
        assert_eq!(n, out.len());
    }
}

#[test]
fn test_varint_single_byte_for_small_values() {
    let mut out = Vec::new();
    put_varint(&mut out, 42);
    assert_eq!(out, vec![42]);
}

#[test]
fn test_varint_truncated_is_corrupt_error() {
    let buf = [0x80u8]; // continuation bit set, nothing follows
    assert!(get_varint(&buf).is_err());
}

#[test]
fn test_varint_sequence_back_to_back() {
    let mut out = Vec::new();
    put_varint(&mut out, 5);
    put_varint(&mut out, 300);
    put_varint(&mut out, 1);

    let (a, n1) = get_varint(&out).unwrap();
    let (b, n2) = get_varint(&out[n1..]).unwrap();
    let (c, _n3) = get_varint(&out[n1 + n2..]).unwrap();
    assert_eq!((a, b, c), (5, 300, 1));
}
