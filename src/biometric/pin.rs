// SPDX-License-Identifier: GPL-3.0-only

//! Backup PIN for when biometrics are unavailable or declined
//!
//! Only an Argon2 PHC string ever reaches the credential store. Both
//! operations are CPU-bound; async callers should run them on a blocking
//! thread.

use crate::constants::credentials::BACKUP_PIN_KEY;
use crate::errors::CredentialError;
use crate::storage::CredentialStore;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct PinVault {
    store: Arc<dyn CredentialStore>,
}

impl PinVault {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Hash and store `pin`, replacing any previous one
    pub fn save_encrypted_pin(&self, pin: &str) -> Result<(), CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(pin.as_bytes(), &salt)
            .map_err(|e| CredentialError::Hash(e.to_string()))?;

        self.store.put(BACKUP_PIN_KEY, &hash.to_string())?;
        info!("Backup PIN saved");
        Ok(())
    }

    /// Whether `pin` matches the stored one. False when none is stored.
    pub fn verify_pin(&self, pin: &str) -> Result<bool, CredentialError> {
        let Some(stored) = self.store.get(BACKUP_PIN_KEY)? else {
            return Ok(false);
        };

        let parsed = match PasswordHash::new(&stored) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(error = %e, "Stored backup PIN is unreadable");
                return Ok(false);
            }
        };

        Ok(Argon2::default()
            .verify_password(pin.as_bytes(), &parsed)
            .is_ok())
    }

    /// Whether a PIN has been saved
    pub fn has_pin(&self) -> Result<bool, CredentialError> {
        Ok(self.store.get(BACKUP_PIN_KEY)?.is_some())
    }
}

impl std::fmt::Debug for PinVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinVault").finish_non_exhaustive()
    }
}
