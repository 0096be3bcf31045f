//! Credential persistence on top of a [`CredentialStore`].
//!
//! The vault is the only writer of the stored credential. A replacement is
//! written byte by byte; if any write fails, the bytes already written are
//! restored from the previous credential before the fault is reported, so a
//! half-written credential is never left behind as current (as far as the
//! store lets us write at all).

use gatekeep_core::{
    CandidateBuffer, Credential, Verification,
    constants::CREDENTIAL_LENGTH,
};
use gatekeep_hardware::{CredentialStore, HardwareError};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::error::{ControlError, ControlResult};

fn fault(err: HardwareError, address: u16) -> ControlError {
    match err {
        HardwareError::Storage { address, message } => ControlError::storage_fault(address, message),
        other => ControlError::storage_fault(address, other.to_string()),
    }
}

/// Owner of the persisted credential.
#[derive(Debug)]
pub struct CredentialVault<S> {
    store: S,
    base: u16,
    write_delay: Duration,
}

impl<S: CredentialStore> CredentialVault<S> {
    pub fn new(store: S, base: u16, write_delay: Duration) -> Self {
        Self {
            store,
            base,
            write_delay,
        }
    }

    fn address(&self, offset: usize) -> u16 {
        self.base + offset as u16
    }

    /// Read the stored credential.
    ///
    /// # Errors
    /// Returns `ControlError::StorageFault` if any byte cannot be read.
    pub async fn load(&mut self) -> ControlResult<Credential> {
        let mut bytes = [0u8; CREDENTIAL_LENGTH];
        for (offset, byte) in bytes.iter_mut().enumerate() {
            let address = self.address(offset);
            *byte = self
                .store
                .read(address)
                .await
                .map_err(|e| fault(e, address))?;
        }
        Ok(Credential::new(bytes))
    }

    /// Compare `candidate` against the stored credential.
    pub async fn verify(&mut self, candidate: Credential) -> ControlResult<Verification> {
        let reference = self.load().await?;
        let buffer = CandidateBuffer::from_entry_and_reference(candidate, reference);
        Ok(Verification::from(&buffer))
    }

    /// Replace the stored credential.
    ///
    /// Returns only after all bytes are written. On a write failure the
    /// previous bytes are written back, best effort, and the fault is returned.
    pub async fn persist(&mut self, credential: Credential) -> ControlResult<()> {
        let previous = match self.load().await {
            Ok(previous) => Some(previous),
            Err(e) => {
                warn!(error = %e, "Previous credential unreadable, no rollback possible");
                None
            }
        };

        for (offset, &byte) in credential.as_bytes().iter().enumerate() {
            let address = self.address(offset);
            if let Err(e) = self.store.write(address, byte).await {
                error!(address, error = %e, "Credential write failed");
                if let Some(previous) = previous {
                    self.rollback(previous, offset).await;
                }
                return Err(fault(e, address));
            }
            tokio::time::sleep(self.write_delay).await;
        }

        debug!(base = self.base, "Credential persisted");
        Ok(())
    }

    async fn rollback(&mut self, previous: Credential, written: usize) {
        for offset in 0..written {
            let address = self.address(offset);
            if let Err(e) = self.store.write(address, previous.as_bytes()[offset]).await {
                error!(address, error = %e, "Rollback write failed");
                return;
            }
            tokio::time::sleep(self.write_delay).await;
        }
        warn!(bytes = written, "Credential rolled back");
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeep_hardware::MemoryStore;

    const STORED: [u8; 5] = [1, 2, 3, 4, 5];

    fn vault(store: &MemoryStore) -> CredentialVault<MemoryStore> {
        CredentialVault::new(store.clone(), 0x000, Duration::from_millis(10))
    }

    #[tokio::test(start_paused = true)]
    async fn test_persist_then_load() {
        let store = MemoryStore::new();
        let mut vault = vault(&store);

        vault.persist(Credential::new(STORED)).await.unwrap();
        assert_eq!(vault.load().await.unwrap(), Credential::new(STORED));
        assert_eq!(store.snapshot(0, 5), STORED.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persist_respects_base_address() {
        let store = MemoryStore::new();
        let mut vault = CredentialVault::new(store.clone(), 0x100, Duration::ZERO);

        vault.persist(Credential::new(STORED)).await.unwrap();
        assert_eq!(store.snapshot(0x100, 5), STORED.to_vec());
        assert_eq!(store.snapshot(0, 5), vec![0xFF; 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_pacing() {
        let store = MemoryStore::new();
        let mut vault = vault(&store);

        let started = tokio::time::Instant::now();
        vault.persist(Credential::new(STORED)).await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_rolls_back() {
        let store = MemoryStore::with_contents(0, &STORED);
        let mut vault = vault(&store);
        store.fail_writes_at(0x003);

        let err = vault
            .persist(Credential::new([9, 9, 9, 9, 9]))
            .await
            .unwrap_err();

        assert!(matches!(err, ControlError::StorageFault { address: 0x003, .. }));
        assert_eq!(store.snapshot(0, 5), STORED.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_match_and_mismatch() {
        let store = MemoryStore::with_contents(0, &STORED);
        let mut vault = vault(&store);

        assert_eq!(
            vault.verify(Credential::new(STORED)).await.unwrap(),
            Verification::Match
        );
        assert_eq!(
            vault.verify(Credential::new([1, 2, 3, 4, 6])).await.unwrap(),
            Verification::Mismatch
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_store_is_a_fault() {
        let store = MemoryStore::with_contents(0, &STORED);
        store.fail_reads(true);
        let mut vault = vault(&store);

        let err = vault.verify(Credential::new(STORED)).await.unwrap_err();
        assert!(matches!(err, ControlError::StorageFault { .. }));
    }
}
