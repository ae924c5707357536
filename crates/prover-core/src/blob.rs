use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Flat on-disk store for uploaded file content, addressed by storage name.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!("Blob store rooted at {}", root.display());
        Ok(Self { root })
    }

    pub fn path(&self, storage_name: &str) -> PathBuf {
        self.root.join(storage_name)
    }

    /// Derive a storage name from `upload_name` that is free on disk and not
    /// rejected by `taken`: `max.c`, then `max_1.c`, `max_2.c`, ...
    pub fn unique_storage_name<F>(&self, upload_name: &str, mut taken: F) -> io::Result<String>
    where
        F: FnMut(&str) -> io::Result<bool>,
    {
        let path = Path::new(upload_name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| upload_name.to_string());
        let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

        let mut candidate = upload_name.to_string();
        let mut counter = 0u64;
        while self.path(&candidate).exists() || taken(&candidate)? {
            counter += 1;
            candidate = match &extension {
                Some(ext) => format!("{}_{}.{}", stem, counter, ext),
                None => format!("{}_{}", stem, counter),
            };
        }
        Ok(candidate)
    }

    /// Write a new blob. Fails if `storage_name` is already in use.
    pub fn write(&self, storage_name: &str, bytes: &[u8]) -> io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path(storage_name))?;
        file.write_all(bytes)?;
        file.sync_all()?;
        debug!("Stored {} bytes as '{}'", bytes.len(), storage_name);
        Ok(())
    }

    pub fn read(&self, storage_name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path(storage_name))
    }

    /// Remove a blob. A blob that is already gone is not an error.
    pub fn remove(&self, storage_name: &str) -> io::Result<()> {
        match fs::remove_file(self.path(storage_name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Blob '{}' already missing", storage_name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

pub fn content_digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
