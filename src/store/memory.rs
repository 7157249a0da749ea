// In: src/store/memory.rs

//! An in-memory [`StoreFactory`] for tests and benchmarks. Every created
//! file is a byte buffer shared with the factory, so the output can be read
//! back with [`FileReader`](crate::store::FileReader) after the writer closes it.

use crate::error::OutputError;
use crate::store::file_store::FrameFileStore;
use crate::store::{StoreFactory, TableStore};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

type Files = Arc<Mutex<BTreeMap<PathBuf, Vec<u8>>>>;

#[derive(Debug, Clone, Default)]
pub struct MemoryStoreFactory {
    files: Files,
    /// Buffer size each file was opened with.
    buffer_sizes: Arc<Mutex<BTreeMap<PathBuf, usize>>>,
    /// Total bytes each file may hold before writes fail.
    quota: Option<u64>,
}

impl MemoryStoreFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files created by this factory fail with an I/O error once they grow past `bytes`.
    pub fn with_quota(bytes: u64) -> Self {
        Self { quota: Some(bytes), ..Self::default() }
    }

    /// A copy of the bytes written to `path` so far.
    pub fn read(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.lock().get(path.as_ref()).cloned()
    }

    pub fn reader(&self, path: impl AsRef<Path>) -> Option<Cursor<Vec<u8>>> {
        self.read(path).map(Cursor::new)
    }

    /// The buffer size `path` was created with.
    pub fn buffer_size(&self, path: impl AsRef<Path>) -> Option<usize> {
        self.buffer_sizes.lock().get(path.as_ref()).copied()
    }

    /// Paths of all files created so far, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().keys().cloned().collect()
    }
}

impl StoreFactory for MemoryStoreFactory {
    fn create(&self, path: &Path, buffer_size: usize) -> Result<Box<dyn TableStore>, OutputError> {
        self.files.lock().insert(path.to_path_buf(), Vec::with_capacity(buffer_size));
        self.buffer_sizes.lock().insert(path.to_path_buf(), buffer_size);
        let sink = SharedBuffer {
            files: Arc::clone(&self.files),
            path: path.to_path_buf(),
            quota: self.quota,
        };
        Ok(Box::new(FrameFileStore::new(sink, path)?))
    }
}

#[derive(Debug)]
struct SharedBuffer {
    files: Files,
    path: PathBuf,
    quota: Option<u64>,
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut files = self.files.lock();
        let file = files.entry(self.path.clone()).or_default();
        if let Some(quota) = self.quota {
            if file.len() as u64 + buf.len() as u64 > quota {
                return Err(io::Error::new(io::ErrorKind::Other, "storage quota exceeded"));
            }
        }
        file.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
