//! Envelope encryption/decryption using AES-256
//!
//! Two modes are supported. Neither envelope carries a magic number or mode
//! tag, so the decrypting side must be told which mode produced it.
//!
//! CBC (the default) binary format:
//! - iv: 16 bytes
//! - ciphertext: PKCS#7-padded plaintext, a non-zero multiple of 16 bytes
//!
//! GCM (authenticated) binary format:
//! - nonce: 12 bytes
//! - ciphertext: same length as the plaintext
//! - tag: 16 bytes

use std::fmt;

use aes::Aes256;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ErrorCategory, ErrorKind, LockmeError, Result};
use crate::keyfile::Key;
use crate::padding::{self, BLOCK_LEN};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Length of the CBC initialization vector in bytes
pub const IV_LEN: usize = 16;

/// Length of the GCM nonce in bytes
pub const NONCE_LEN: usize = 12;

/// Length of the GCM authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// Block cipher mode used to build an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CipherMode {
    /// AES-256-CBC with PKCS#7 padding. Confidentiality only.
    #[default]
    Cbc,
    /// AES-256-GCM. Detects tampering and wrong keys.
    Gcm,
}

impl fmt::Display for CipherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherMode::Cbc => f.write_str("cbc"),
            CipherMode::Gcm => f.write_str("gcm"),
        }
    }
}

/// Encrypt plaintext under `key`, returning the envelope for `mode`.
pub fn encrypt(key: &Key, plaintext: &[u8], mode: CipherMode) -> Result<Vec<u8>> {
    match mode {
        CipherMode::Cbc => encrypt_cbc(key, plaintext),
        CipherMode::Gcm => encrypt_gcm(key, plaintext),
    }
}

/// Decrypt an envelope produced by [`encrypt`] with the same `mode`.
pub fn decrypt(key: &Key, envelope: &[u8], mode: CipherMode) -> Result<Vec<u8>> {
    match mode {
        CipherMode::Cbc => decrypt_cbc(key, envelope),
        CipherMode::Gcm => decrypt_gcm(key, envelope),
    }
}

/// Encrypt with AES-256-CBC under a fresh random IV
///
/// Returns the binary format: iv(16) + ciphertext(variable)
pub fn encrypt_cbc(key: &Key, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    encrypt_with_iv(key, plaintext, &iv)
}

/// Encrypt with AES-256-CBC using the provided IV
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `encrypt_cbc()` which generates a random IV.
pub fn encrypt_with_iv(key: &Key, plaintext: &[u8], iv: &[u8; IV_LEN]) -> Result<Vec<u8>> {
    let padded = padding::pad(plaintext);
    let ciphertext = Aes256CbcEnc::new(key.as_bytes().into(), iv.into())
        .encrypt_padded_vec_mut::<NoPadding>(&padded);

    let mut output = Vec::with_capacity(IV_LEN + ciphertext.len());
    output.extend_from_slice(iv);
    output.extend_from_slice(&ciphertext);

    debug!(
        plaintext_len = plaintext.len(),
        envelope_len = output.len(),
        "built cbc envelope"
    );
    Ok(output)
}

/// Decrypt an AES-256-CBC envelope
///
/// The envelope shape is validated before any decryption is attempted.
pub fn decrypt_cbc(key: &Key, envelope: &[u8]) -> Result<Vec<u8>> {
    if envelope.len() < IV_LEN {
        debug!(len = envelope.len(), "envelope shorter than iv");
        return Err(LockmeError::integrity(ErrorKind::EnvelopeTooShort));
    }
    let (iv, ciphertext) = envelope.split_at(IV_LEN);

    if ciphertext.len() % BLOCK_LEN != 0 {
        debug!(len = ciphertext.len(), "ciphertext is not a whole number of blocks");
        return Err(LockmeError::integrity(ErrorKind::InvalidCiphertextLength));
    }

    let decrypted = Aes256CbcDec::new(key.as_bytes().into(), iv.into())
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|_| {
            LockmeError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                "block-aligned ciphertext rejected by cbc decryptor",
            )
        })?;

    let plaintext = padding::unpad(&decrypted)?;
    Ok(plaintext.to_vec())
}

/// Encrypt with AES-256-GCM under a fresh random nonce
///
/// Returns the binary format: nonce(12) + ciphertext(variable) + tag(16)
pub fn encrypt_gcm(key: &Key, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| {
            LockmeError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                format!("aes-gcm encryption failed: {}", e),
            )
        })?;

    let mut output = Vec::with_capacity(NONCE_LEN + sealed.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&sealed);

    debug!(
        plaintext_len = plaintext.len(),
        envelope_len = output.len(),
        "built gcm envelope"
    );
    Ok(output)
}

/// Decrypt an AES-256-GCM envelope
pub fn decrypt_gcm(key: &Key, envelope: &[u8]) -> Result<Vec<u8>> {
    if envelope.len() < NONCE_LEN + TAG_LEN {
        debug!(len = envelope.len(), "envelope shorter than nonce and tag");
        return Err(LockmeError::integrity(ErrorKind::EnvelopeTooShort));
    }
    let (nonce, sealed) = envelope.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| LockmeError::integrity(ErrorKind::AuthenticationFailed))
}
