//! Black-box coverage of the scanner's decision procedure, exercised only
//! through the crate's public API, one test per scenario.

use std::fs::File;
use std::io::Write;

use wal_tail_scanner::format::{encode_entry, LogEntry};
use wal_tail_scanner::{LogFileSet, LogPosition, ScannerConfig, TailScanner, NO_TRANSACTION_ID};

fn start() -> LogEntry {
    LogEntry::Start {
        previous_checksum: 0,
        time_written: 0,
        last_committed_tx: 0,
        additional: Vec::new(),
    }
}

fn commit(tx_id: i64) -> LogEntry {
    LogEntry::Commit {
        tx_id,
        time_committed: 0,
        checksum: 0,
    }
}

fn checkpoint(target: LogPosition) -> LogEntry {
    LogEntry::CheckPoint { target }
}

fn write_segment(dir: &std::path::Path, version: u64, entries: &[LogEntry]) {
    let mut file = File::create(dir.join(format!("wal.{version}"))).unwrap();
    for entry in entries {
        file.write_all(&encode_entry(entry)).unwrap();
    }
}

fn scan(dir: &std::path::Path) -> wal_tail_scanner::TailInformation {
    let file_set = LogFileSet::new(dir, "wal");
    TailScanner::new(file_set, ScannerConfig::default())
        .scan_tail()
        .unwrap()
}

#[test]
fn empty_directory_requires_recovery_with_no_logs() {
    let dir = tempfile::tempdir().unwrap();
    let info = scan(dir.path());
    assert!(info.logs_missing);
    assert!(info.is_recovery_required);
    assert_eq!(info.oldest_segment_version_found, -1);
}

#[test]
fn single_empty_segment_needs_no_recovery_history_but_has_no_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    write_segment(dir.path(), 43, &[]);

    let info = scan(dir.path());
    assert!(!info.logs_missing);
    assert_eq!(info.last_check_point, None);
    assert!(!info.commits_after_last_check_point);
    assert_eq!(info.oldest_segment_version_found, 43);
}

#[test]
fn uncheckpointed_commit_in_the_only_segment() {
    let dir = tempfile::tempdir().unwrap();
    write_segment(dir.path(), 43, &[start(), commit(10)]);

    let info = scan(dir.path());
    assert!(info.commits_after_last_check_point);
    assert_eq!(info.first_tx_id_after_last_check_point, 10);
}

#[test]
fn uncheckpointed_commit_in_an_older_segment() {
    let dir = tempfile::tempdir().unwrap();
    write_segment(dir.path(), 43, &[]);
    write_segment(dir.path(), 42, &[start(), commit(21)]);

    let info = scan(dir.path());
    assert!(info.commits_after_last_check_point);
    assert_eq!(info.first_tx_id_after_last_check_point, 21);
    assert_eq!(info.oldest_segment_version_found, 42);
}

#[test]
fn checkpoint_targeting_its_own_position_sees_no_activity() {
    let dir = tempfile::tempdir().unwrap();
    write_segment(dir.path(), 43, &[checkpoint(LogPosition::new(43, 0))]);

    let info = scan(dir.path());
    assert!(info.last_check_point.is_some());
    assert!(!info.commits_after_last_check_point);
    assert_eq!(info.first_tx_id_after_last_check_point, NO_TRANSACTION_ID);
}

#[test]
fn checkpoint_hops_to_an_older_segment_to_find_the_tail() {
    let dir = tempfile::tempdir().unwrap();
    write_segment(dir.path(), 43, &[checkpoint(LogPosition::new(42, 0))]);
    write_segment(dir.path(), 42, &[start(), commit(11)]);

    let info = scan(dir.path());
    assert!(info.last_check_point.is_some());
    assert!(info.commits_after_last_check_point);
    assert_eq!(info.first_tx_id_after_last_check_point, 11);
    assert_eq!(info.oldest_segment_version_found, 42);
}

#[test]
fn repeated_scans_agree() {
    let dir = tempfile::tempdir().unwrap();
    write_segment(dir.path(), 43, &[checkpoint(LogPosition::new(42, 0))]);
    write_segment(dir.path(), 42, &[start(), commit(11)]);

    assert_eq!(scan(dir.path()), scan(dir.path()));
}

#[test]
fn non_contiguous_versions_report_actual_bounds() {
    let dir = tempfile::tempdir().unwrap();
    write_segment(dir.path(), 50, &[]);
    write_segment(dir.path(), 41, &[]);

    let info = scan(dir.path());
    assert_eq!(info.latest_segment_version, 50);
    assert_eq!(info.oldest_segment_version_found, 41);
}
