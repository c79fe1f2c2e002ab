//! Encryption of captured sessions at rest.
//!
//! # Format
//! `encrypt` produces `<nonce>:<ciphertext>`, both standard base64.
//! The nonce is 12 random bytes, fresh for every call.
//! The ciphertext carries the 16 byte GCM tag, so any change to
//! the blob is caught on decryption.
//!
//! # Key
//! One 32 byte random key per installation, stored in the `.key` file
//! (owner read/write only on Unix). It's read or created on first use
//! and cached for the lifetime of the vault.

use std::{
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use tas_core::{err, info, IntoIoError};
use zeroize::Zeroizing;

use crate::CryptoError;

pub const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

pub struct CredentialVault {
    key_file: PathBuf,
    key: Mutex<Option<Zeroizing<[u8; KEY_LEN]>>>,
}

impl CredentialVault {
    pub fn new(key_file: impl Into<PathBuf>) -> Self {
        Self {
            key_file: key_file.into(),
            key: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn key_file(&self) -> &Path {
        &self.key_file
    }

    /// Returns the key, reading the key file or creating it on first use.
    ///
    /// A key file of the wrong length is replaced with a new key
    /// (sessions sealed with the old one become unreadable).
    ///
    /// # Errors
    /// If no random bytes were available or the key file
    /// couldn't be read or written.
    pub fn get_or_create_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
        let mut cached = self.key.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(key) = cached.as_ref() {
            return Ok(key.clone());
        }

        let key = match std::fs::read(&self.key_file).path(&self.key_file) {
            Ok(bytes) if bytes.len() == KEY_LEN => {
                let bytes = Zeroizing::new(bytes);
                if let Err(e) = restrict_to_owner(&self.key_file) {
                    err!("Couldn't restrict access to {:?}: {e}", self.key_file);
                }
                let mut key = Zeroizing::new([0u8; KEY_LEN]);
                key.copy_from_slice(&bytes);
                key
            }
            Ok(_) => self.create_key()?,
            Err(e) if e.is_not_found() => self.create_key()?,
            Err(e) => return Err(e.into()),
        };

        *cached = Some(key.clone());
        Ok(key)
    }

    fn create_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        OsRng
            .try_fill_bytes(&mut key[..])
            .map_err(|e| CryptoError::Random(e.to_string()))?;

        if let Some(parent) = self.key_file.parent() {
            std::fs::create_dir_all(parent).path(parent)?;
        }
        write_owner_only(&self.key_file, &key[..]).path(&self.key_file)?;

        info!("Created new encryption key at {:?}", self.key_file);
        Ok(key)
    }

    fn cipher(&self) -> Result<Aes256Gcm, CryptoError> {
        let key = self.get_or_create_key()?;
        Aes256Gcm::new_from_slice(&key[..]).map_err(|_| CryptoError::Malformed("key length"))
    }

    /// # Errors
    /// If the key is unavailable or no random nonce could be drawn.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CryptoError> {
        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce_bytes)
            .map_err(|e| CryptoError::Random(e.to_string()))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::Encrypt)?;

        Ok(format!(
            "{}:{}",
            BASE64.encode(nonce_bytes),
            BASE64.encode(ciphertext)
        ))
    }

    /// # Errors
    /// - the blob isn't `<nonce>:<ciphertext>` base64
    /// - the nonce or ciphertext has the wrong length
    /// - authentication failed (wrong key, corruption, tampering)
    pub fn decrypt(&self, blob: &str) -> Result<Vec<u8>, CryptoError> {
        let (nonce_b64, ciphertext_b64) = blob
            .split_once(':')
            .ok_or(CryptoError::Malformed("missing ':' separator"))?;

        let nonce_bytes = BASE64.decode(nonce_b64)?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(CryptoError::Malformed("nonce has the wrong length"));
        }
        let ciphertext = BASE64.decode(ciphertext_b64)?;
        if ciphertext.len() < TAG_LEN {
            return Err(CryptoError::Malformed("payload shorter than its tag"));
        }

        self.cipher()?
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| CryptoError::Tampered)
    }
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        fn write_owner_only(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
            use std::{io::Write, os::unix::fs::{OpenOptionsExt, PermissionsExt}};

            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)?;
            // `mode` only applies to newly created files
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
            file.write_all(bytes)
        }

        /// An older or hand-copied key file may be readable by others.
        fn restrict_to_owner(path: &Path) -> std::io::Result<()> {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        }
    } else {
        fn write_owner_only(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
            std::fs::write(path, bytes)
        }

        fn restrict_to_owner(_path: &Path) -> std::io::Result<()> {
            Ok(())
        }
    }
}
