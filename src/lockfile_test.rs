use super::*;

#[test]
fn test_second_writer_is_rejected_while_first_holds_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let _first = WriteLock::acquire(dir.path(), "tbl").unwrap();
    assert!(WriteLock::acquire(dir.path(), "tbl").is_err());
}

#[test]
fn test_lock_is_released_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    {
        let _lock = WriteLock::acquire(dir.path(), "tbl").unwrap();
    }
    let second = WriteLock::acquire(dir.path(), "tbl");
    assert!(second.is_ok());
}

#[test]
fn test_independent_tables_do_not_contend() {
    let dir = tempfile::tempdir().unwrap();
    let _a = WriteLock::acquire(dir.path(), "a").unwrap();
    let _b = WriteLock::acquire(dir.path(), "b").unwrap();
}
