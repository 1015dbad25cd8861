use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use filetime::FileTime;

use crate::date;

/// The filesystem operations a run needs.
pub trait FileSystem {
    /// Regular files directly inside `dir`, in no particular order.
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    fn modified(&self, path: &Path) -> io::Result<DateTime<Utc>>;

    fn set_modified(&self, path: &Path, time: DateTime<Utc>) -> io::Result<()>;

    /// Must fail rather than overwrite when `to` exists.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// True for an existing regular file.
    fn exists(&self, path: &Path) -> bool;
}

/// The local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if self.exists(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn modified(&self, path: &Path) -> io::Result<DateTime<Utc>> {
        let meta = fs::metadata(path)?;
        let ft = FileTime::from_last_modification_time(&meta);
        date::from_file_time(ft).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("modification time out of range: {}", path.display()),
            )
        })
    }

    fn set_modified(&self, path: &Path, time: DateTime<Utc>) -> io::Result<()> {
        filetime::set_file_mtime(path, date::to_file_time(time))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if fs::symlink_metadata(to).is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("target exists: {}", to.display()),
            ));
        }
        fs::rename(from, to)
    }

    fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).is_ok_and(|meta| meta.is_file())
    }
}
