use super::*;

#[test]
fn test_default_block_size() {
    let cfg = Config::new("/tmp", "tbl");
    assert_eq!(cfg.block_size(), DEFAULT_BLOCK_SIZE);
}

#[test]
fn test_valid_block_size_kept() {
    let cfg = Config::new("/tmp", "tbl").set_block_size(4096);
    assert_eq!(cfg.block_size(), 4096);
}

#[test]
fn test_non_power_of_two_falls_back() {
    let cfg = Config::new("/tmp", "tbl").set_block_size(5000);
    assert_eq!(cfg.block_size(), DEFAULT_BLOCK_SIZE);
}

#[test]
fn test_out_of_range_falls_back() {
    let cfg = Config::new("/tmp", "tbl").set_block_size(1024);
    assert_eq!(cfg.block_size(), DEFAULT_BLOCK_SIZE);

    let cfg = Config::new("/tmp", "tbl").set_block_size(65536);
    assert_eq!(cfg.block_size(), DEFAULT_BLOCK_SIZE);
}

#[test]
fn test_data_path_and_names() {
    let cfg = Config::new("/tmp/db", "people");
    assert_eq!(cfg.data_path(), std::path::PathBuf::from("/tmp/db/people.data"));
    assert_eq!(cfg.name(), "people");
}

#[test]
fn test_max_item_size_matches_block_capacity_formula() {
    let cfg = Config::new("/tmp", "tbl").set_block_size(8192);
    assert_eq!(cfg.max_item_size(), (8192 - 11 - 4 * 2) / 4);
}

#[test]
fn test_readonly_and_revision_setters() {
    let cfg = Config::new("/tmp", "tbl").set_readonly(true).set_revision(7);
    assert!(cfg.readonly());
    assert_eq!(cfg.revision(), Some(7));
}
