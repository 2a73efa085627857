//! Enumerates WAL segment files on disk by version.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// The set of segment files in a directory, named `<prefix>.<version>`.
/// The set is defined purely as "whatever exists on disk" — there is no
/// in-memory registry to keep in sync.
pub struct LogFileSet {
    dir: PathBuf,
    prefix: String,
}

impl LogFileSet {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn any_files(&self) -> Result<bool> {
        Ok(self.versions()?.next().is_some())
    }

    pub fn highest_version(&self) -> Result<Option<u64>> {
        Ok(self.versions()?.max())
    }

    pub fn lowest_version(&self) -> Result<Option<u64>> {
        Ok(self.versions()?.min())
    }

    /// Existing segment versions, highest first. This is the order
    /// [`crate::scanner::TailScanner`] walks in.
    pub fn versions_descending(&self) -> Result<Vec<u64>> {
        let mut versions: Vec<u64> = self.versions()?.collect();
        versions.sort_unstable_by(|a, b| b.cmp(a));
        Ok(versions)
    }

    pub fn open(&self, version: u64) -> Result<File> {
        Ok(File::open(self.path_for(version))?)
    }

    pub fn size(&self, version: u64) -> Result<u64> {
        Ok(std::fs::metadata(self.path_for(version))?.len())
    }

    /// Truncate a segment to `len` bytes. The scanner never calls this —
    /// it is exposed only so the test suite can simulate a crash mid-write.
    pub fn truncate(&self, version: u64, len: u64) -> Result<()> {
        let file = std::fs::OpenOptions::new()
            .write(true)
            .open(self.path_for(version))?;
        file.set_len(len)?;
        Ok(())
    }

    fn path_for(&self, version: u64) -> PathBuf {
        self.dir.join(format!("{}.{version}", self.prefix))
    }

    fn versions(&self) -> Result<impl Iterator<Item = u64> + '_> {
        let prefix = self.prefix.clone();
        let entries = std::fs::read_dir(&self.dir)?;
        Ok(entries.filter_map(move |entry| {
            let entry = entry.ok()?;
            if !entry.file_type().ok()?.is_file() {
                return None;
            }
            parse_segment_file_name(entry.file_name().to_str()?, &prefix)
        }))
    }
}

/// Parse `<prefix>.<version>` out of a file name, accepting only a
/// non-negative integer in canonical decimal form (no leading zeroes, no
/// sign) — anything else is ignored.
pub fn parse_segment_file_name(file_name: &str, prefix: &str) -> Option<u64> {
    let rest = file_name.strip_prefix(prefix)?.strip_prefix('.')?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if rest.len() > 1 && rest.starts_with('0') {
        return None;
    }
    rest.parse::<u64>().ok()
}

/// Present only so callers can report the directory a set was rooted at
/// without reaching into private fields.
impl LogFileSet {
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_canonical_decimal_versions() {
        assert_eq!(parse_segment_file_name("wal.43", "wal"), Some(43));
        assert_eq!(parse_segment_file_name("wal.0", "wal"), Some(0));
    }

    #[test]
    fn rejects_non_matching_names() {
        assert_eq!(parse_segment_file_name("wal.43.tmp", "wal"), None);
        assert_eq!(parse_segment_file_name("wal.", "wal"), None);
        assert_eq!(parse_segment_file_name("wal.-1", "wal"), None);
        assert_eq!(parse_segment_file_name("wal.007", "wal"), None);
        assert_eq!(parse_segment_file_name("other.43", "wal"), None);
        assert_eq!(parse_segment_file_name("wal43", "wal"), None);
    }

    #[test]
    fn any_files_false_on_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let set = LogFileSet::new(dir.path(), "wal");
        assert!(!set.any_files().unwrap());
        assert_eq!(set.highest_version().unwrap(), None);
        assert_eq!(set.lowest_version().unwrap(), None);
        assert_eq!(set.versions_descending().unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn reports_highest_and_lowest_for_non_contiguous_versions() {
        let dir = tempfile::tempdir().unwrap();
        for v in [41u64, 43, 50] {
            File::create(dir.path().join(format!("wal.{v}"))).unwrap();
        }
        // a file that should be ignored entirely
        File::create(dir.path().join("wal.43.tmp")).unwrap();

        let set = LogFileSet::new(dir.path(), "wal");
        assert!(set.any_files().unwrap());
        assert_eq!(set.highest_version().unwrap(), Some(50));
        assert_eq!(set.lowest_version().unwrap(), Some(41));
        assert_eq!(set.versions_descending().unwrap(), vec![50, 43, 41]);
    }

    #[test]
    fn open_and_size_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = File::create(dir.path().join("wal.1")).unwrap();
        f.write_all(b"hello").unwrap();

        let set = LogFileSet::new(dir.path(), "wal");
        assert_eq!(set.size(1).unwrap(), 5);
        let mut opened = set.open(1).unwrap();
        let mut buf = String::new();
        std::io::Read::read_to_string(&mut opened, &mut buf).unwrap();
        assert_eq!(buf, "hello");
    }

    #[test]
    fn truncate_shrinks_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = File::create(dir.path().join("wal.1")).unwrap();
        f.write_all(b"hello world").unwrap();

        let set = LogFileSet::new(dir.path(), "wal");
        set.truncate(1, 5).unwrap();
        assert_eq!(set.size(1).unwrap(), 5);
    }
}
