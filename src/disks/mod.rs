use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The backing image files of the array, named `<dir>/<index>.<suffix>`.
///
/// The harness only owns their presence; the engine creates and fills them
/// during its initialize phase.
#[derive(Debug, Clone, PartialEq)]
pub struct DiskSet {
    dir: PathBuf,
    suffix: String,
}

impl DiskSet {
    pub fn new<P: AsRef<Path>>(dir: P, suffix: &str) -> Self {
        DiskSet {
            dir: dir.as_ref().to_path_buf(),
            suffix: suffix.trim_start_matches('.').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn disk_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.{}", index, self.suffix))
    }

    /// Whether `path` names a disk image, i.e. `<stem>.<suffix>` with a
    /// non-empty stem. The suffix itself may contain dots.
    fn is_disk_image(&self, path: &Path) -> bool {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };
        name.strip_suffix(self.suffix.as_str())
            .and_then(|stem| stem.strip_suffix('.'))
            .map(|stem| !stem.is_empty())
            .unwrap_or(false)
    }

    /// Creates the disks directory if it does not exist yet.
    pub fn create(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    /// Deletes every disk image in the directory, returning how many were
    /// removed. Files not named `<stem>.<suffix>` are left alone.
    pub fn reset(&self) -> io::Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && self.is_disk_image(&path) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        debug!("Removed {} disk images from {}", removed, self.dir.display());
        Ok(removed)
    }
}
