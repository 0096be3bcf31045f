//! Credential store implementations.
//!
//! [`MemoryStore`] is a shared in-memory EEPROM image with fault injection
//! for tests. [`FileStore`] keeps the image in a file so the credential
//! survives restarts of the Control node.

use gatekeep_core::constants::{ERASED_BYTE, STORE_CAPACITY};
use std::{
    collections::HashSet,
    io::SeekFrom,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};
use tokio::{
    fs::OpenOptions,
    io::{AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, info};

use crate::{
    error::{HardwareError, Result},
    traits::CredentialStore,
};

fn check_range(address: u16, capacity: usize) -> Result<usize> {
    let index = usize::from(address);
    if index >= capacity {
        return Err(HardwareError::address_out_of_range(address, capacity));
    }
    Ok(index)
}

#[derive(Debug)]
struct MemoryImage {
    cells: Vec<u8>,
    fail_reads: bool,
    failing_addresses: HashSet<u16>,
    writes_until_failure: Option<usize>,
    write_log: Vec<(u16, u8)>,
}

/// In-memory EEPROM image.
///
/// Clones share the same image, so a test keeps one clone to inspect and
/// sabotage the store while the Control node owns another.
///
/// # Example
///
/// ```
/// use gatekeep_hardware::{CredentialStore, MemoryStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut store = MemoryStore::new();
/// let probe = store.clone();
///
/// store.write(0x000, 7).await.unwrap();
/// assert_eq!(probe.snapshot(0x000, 2), vec![7, 0xFF]);
///
/// probe.fail_writes_at(0x001);
/// assert!(store.write(0x001, 8).await.is_err());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore {
    image: Arc<Mutex<MemoryImage>>,
}

impl MemoryStore {
    /// Erased store of the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(STORE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            image: Arc::new(Mutex::new(MemoryImage {
                cells: vec![ERASED_BYTE; capacity],
                fail_reads: false,
                failing_addresses: HashSet::new(),
                writes_until_failure: None,
                write_log: Vec::new(),
            })),
        }
    }

    /// Erased store with `bytes` preloaded at `base`.
    ///
    /// # Panics
    /// Panics if `bytes` does not fit; this is a test fixture constructor.
    pub fn with_contents(base: u16, bytes: &[u8]) -> Self {
        let store = Self::new();
        {
            let mut image = store.lock();
            let start = usize::from(base);
            image.cells[start..start + bytes.len()].copy_from_slice(bytes);
        }
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryImage> {
        self.image.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy `len` bytes starting at `base`, bypassing fault injection.
    pub fn snapshot(&self, base: u16, len: usize) -> Vec<u8> {
        let image = self.lock();
        let start = usize::from(base);
        image.cells[start..start + len].to_vec()
    }

    /// Every successful write so far, in order.
    pub fn write_log(&self) -> Vec<(u16, u8)> {
        self.lock().write_log.clone()
    }

    /// Make every read fail.
    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Make writes to `address` fail.
    pub fn fail_writes_at(&self, address: u16) {
        self.lock().failing_addresses.insert(address);
    }

    /// Let `count` more writes succeed, then fail every write.
    pub fn fail_writes_after(&self, count: usize) {
        self.lock().writes_until_failure = Some(count);
    }

    pub fn clear_faults(&self) {
        let mut image = self.lock();
        image.fail_reads = false;
        image.failing_addresses.clear();
        image.writes_until_failure = None;
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryStore {
    async fn read(&mut self, address: u16) -> Result<u8> {
        let image = self.lock();
        let index = check_range(address, image.cells.len())?;
        if image.fail_reads {
            return Err(HardwareError::storage(address, "read not acknowledged"));
        }
        Ok(image.cells[index])
    }

    async fn write(&mut self, address: u16, byte: u8) -> Result<()> {
        let mut image = self.lock();
        let index = check_range(address, image.cells.len())?;

        if image.failing_addresses.contains(&address) {
            return Err(HardwareError::storage(address, "write not acknowledged"));
        }
        if let Some(remaining) = image.writes_until_failure.as_mut() {
            if *remaining == 0 {
                return Err(HardwareError::storage(address, "write not acknowledged"));
            }
            *remaining -= 1;
        }

        image.cells[index] = byte;
        image.write_log.push((address, byte));
        Ok(())
    }
}

/// EEPROM image backed by a file.
///
/// The file is exactly [`STORE_CAPACITY`] bytes. A missing file is created
/// erased (`0xFF`). Each write goes to disk before it is acknowledged.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    image: Vec<u8>,
}

impl FileStore {
    /// Open the image at `path`, creating an erased one if it does not exist.
    ///
    /// # Errors
    /// Returns `HardwareError::InvalidData` if the file has the wrong size.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let image = match tokio::fs::read(&path).await {
            Ok(image) => {
                if image.len() != STORE_CAPACITY {
                    return Err(HardwareError::invalid_data(format!(
                        "EEPROM image {} is {} bytes, expected {}",
                        path.display(),
                        image.len(),
                        STORE_CAPACITY
                    )));
                }
                debug!(path = %path.display(), "EEPROM image loaded");
                image
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let image = vec![ERASED_BYTE; STORE_CAPACITY];
                tokio::fs::write(&path, &image).await?;
                info!(path = %path.display(), "Created erased EEPROM image");
                image
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, image })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileStore {
    async fn read(&mut self, address: u16) -> Result<u8> {
        let index = check_range(address, self.image.len())?;
        Ok(self.image[index])
    }

    async fn write(&mut self, address: u16, byte: u8) -> Result<()> {
        let index = check_range(address, self.image.len())?;

        let mut file = OpenOptions::new().write(true).open(&self.path).await?;
        file.seek(SeekFrom::Start(index as u64)).await?;
        file.write_all(&[byte]).await?;
        file.sync_data().await?;

        self.image[index] = byte;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_store_starts_erased() {
        let mut store = MemoryStore::new();
        assert_eq!(store.read(0).await.unwrap(), 0xFF);
        assert_eq!(store.read(1023).await.unwrap(), 0xFF);
    }

    #[tokio::test]
    async fn test_memory_store_rejects_out_of_range() {
        let mut store = MemoryStore::new();
        let err = store.read(1024).await.unwrap_err();
        assert!(matches!(err, HardwareError::AddressOutOfRange { .. }));
    }

    #[tokio::test]
    async fn test_memory_store_fail_writes_after() {
        let mut store = MemoryStore::new();
        store.fail_writes_after(2);

        store.write(0, 1).await.unwrap();
        store.write(1, 2).await.unwrap();
        assert!(store.write(2, 3).await.unwrap_err().is_storage_fault());
        assert_eq!(store.write_log(), vec![(0, 1), (1, 2)]);

        store.clear_faults();
        store.write(2, 3).await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_fail_reads() {
        let mut store = MemoryStore::with_contents(0, &[1, 2, 3, 4, 5]);
        store.fail_reads(true);
        assert!(store.read(0).await.is_err());
        store.fail_reads(false);
        assert_eq!(store.read(4).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_file_store_creates_erased_image() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eeprom.bin");

        let mut store = FileStore::open(&path).await.unwrap();
        assert_eq!(store.read(0).await.unwrap(), 0xFF);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 1024);
    }

    #[tokio::test]
    async fn test_file_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eeprom.bin");

        {
            let mut store = FileStore::open(&path).await.unwrap();
            for (offset, byte) in [1u8, 2, 3, 4, 5].into_iter().enumerate() {
                store.write(offset as u16, byte).await.unwrap();
            }
        }

        let mut reopened = FileStore::open(&path).await.unwrap();
        for (offset, byte) in [1u8, 2, 3, 4, 5].into_iter().enumerate() {
            assert_eq!(reopened.read(offset as u16).await.unwrap(), byte);
        }
        assert_eq!(reopened.read(5).await.unwrap(), 0xFF);
    }

    #[tokio::test]
    async fn test_file_store_rejects_wrong_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eeprom.bin");
        std::fs::write(&path, [0u8; 16]).unwrap();

        let err = FileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, HardwareError::InvalidData { .. }));
    }
}
