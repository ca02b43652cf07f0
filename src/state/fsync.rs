//! Low-level fsync operations for durability.
//!
//! Both file and directory fsyncs are required for crash safety. On POSIX
//! systems, creating or renaming a file updates the directory entry, and
//! without an fsync on the directory that entry may not survive a power
//! loss even if the file contents were synced.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Syncs a file's contents and metadata to disk.
pub fn fsync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Syncs a directory to disk, ensuring its entries are durable.
///
/// Without this, a newly renamed state file might revert to its old name
/// after a crash.
pub fn fsync_dir(dir_path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(dir_path)?;
    dir.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn fsync_file_works() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut file = File::create(&path).unwrap();
        file.write_all(b"{}").unwrap();

        fsync_file(&file).unwrap();
    }

    #[test]
    fn fsync_dir_works() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("state.json")).unwrap();

        fsync_dir(dir.path()).unwrap();
    }

    #[test]
    fn fsync_dir_fails_on_nonexistent() {
        assert!(fsync_dir(Path::new("/nonexistent/path/for/fsync")).is_err());
    }
}
