use std::rc::Rc;

use lispstreams::error::ErrorKind;
use lispstreams::ops::read_file_until;
use lispstreams::stream::FileTable;

fn temp_path(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("lispstreams-it-{tag}-{}.txt", std::process::id()))
}

#[test]
fn open_write_close_then_reopen_for_reading() {
    let _ = env_logger::builder().is_test(true).try_init();
    let path = temp_path("roundtrip");
    let mut table = FileTable::new();
    {
        let f = table.open(path.to_str(), Some("w"), None).unwrap();
        assert_eq!(f.borrow_mut().write_bytes(b"line one\nline two\n"), 18);
    }
    {
        let f = table.open(path.to_str(), Some("r"), None).unwrap();
        let line = f.borrow_mut().read_line(400).unwrap();
        assert_eq!(line, b"line one\n");
    }
    let _ = std::fs::remove_file(path);
}

#[test]
fn sweep_preserves_files_still_referenced() {
    let path = temp_path("sweep-keep");
    let mut table = FileTable::new();
    let kept = table.open(path.to_str(), Some("w"), None).unwrap();
    table.sweep(|rc| Rc::strong_count(rc) > 1);
    assert_eq!(table.chain_len(), 1);
    drop(kept);
    table.sweep(|rc| Rc::strong_count(rc) > 1);
    assert_eq!(table.chain_len(), 0);
    let _ = std::fs::remove_file(path);
}

#[test]
fn shutdown_force_closes_every_open_file() {
    let path = temp_path("shutdown");
    let mut table = FileTable::new();
    let f = table.open(path.to_str(), Some("w"), None).unwrap();
    table.shutdown();
    assert!(!f.borrow().is_bound());
    assert_eq!(table.chain_len(), 0);
    let _ = std::fs::remove_file(path);
}

#[test]
fn read_file_until_scans_to_matching_line() {
    let path = temp_path("read-until");
    std::fs::write(&path, "one\ntwo\nthree\n").unwrap();
    let mut table = FileTable::new();
    let f = table.open(path.to_str(), Some("r"), None).unwrap();
    let line = read_file_until(&f, "^two$", false).unwrap();
    assert_eq!(line, Some(b"two\n".to_vec()));
    let _ = std::fs::remove_file(path);
}

#[test]
fn read_file_until_returns_none_without_a_match() {
    let path = temp_path("read-until-miss");
    std::fs::write(&path, "one\ntwo\n").unwrap();
    let mut table = FileTable::new();
    let f = table.open(path.to_str(), Some("r"), None).unwrap();
    let line = read_file_until(&f, "zzz", false).unwrap();
    assert_eq!(line, None);
    let _ = std::fs::remove_file(path);
}

#[test]
fn standard_streams_are_pinned_and_reused() {
    let table = FileTable::new();
    assert!(Rc::ptr_eq(&table.stdin_file(), &table.stdin_file()));
    assert!(Rc::ptr_eq(&table.stdout_file(), &table.stdout_file()));
    assert!(!Rc::ptr_eq(&table.stdin_file(), &table.stdout_file()));
}

#[test]
fn open_missing_file_signals_file_error() {
    let mut table = FileTable::new();
    let err = table.open(Some("/no/such/directory/file.txt"), Some("r"), None).unwrap_err();
    assert_eq!(*err.kind(), ErrorKind::FileError);
}
