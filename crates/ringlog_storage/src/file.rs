//! File-based storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A file-based storage backend.
///
/// Mirrors the resident records into a single file so they can be read
/// back after a restart.
///
/// # Durability
///
/// - `replace()` truncates the file and writes the new image
/// - `flush()` calls `File::flush()` followed by `File::sync_data()`
/// - `destroy()` closes and removes the file
///
/// # Example
///
/// ```no_run
/// use ringlog_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("/var/tmp/ringlogdata")).unwrap();
/// backend.replace(b"hello\n").unwrap();
/// backend.flush().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: RwLock<Option<File>>,
    size: RwLock<u64>,
}

impl FileBackend {
    /// Opens or creates a file backend at the given path.
    ///
    /// An existing file is kept; its contents are what
    /// [`load`](StorageBackend::load) returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(Some(file)),
            size: RwLock::new(size),
        })
    }

    /// Opens or creates a file backend, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or file cannot be opened.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn load(&self) -> StorageResult<Vec<u8>> {
        let mut guard = self.file.write();
        let file = guard.as_mut().ok_or(StorageError::Closed)?;

        file.seek(SeekFrom::Start(0))?;
        let mut buffer = Vec::with_capacity(*self.size.read() as usize);
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn replace(&mut self, contents: &[u8]) -> StorageResult<()> {
        let mut guard = self.file.write();
        let file = guard.as_mut().ok_or(StorageError::Closed)?;
        let mut size = self.size.write();

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(contents)?;
        *size = contents.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        let mut guard = self.file.write();
        let file = guard.as_mut().ok_or(StorageError::Closed)?;
        file.flush()?;
        file.sync_data()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        if self.file.read().is_none() {
            return Err(StorageError::Closed);
        }
        Ok(*self.size.read())
    }

    fn destroy(&mut self) -> StorageResult<()> {
        if self.file.write().take().is_none() {
            return Ok(());
        }
        *self.size.write() = 0;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
