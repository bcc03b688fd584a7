//! Key generation and key file handling
//!
//! The key file holds exactly [`KEY_LEN`] raw bytes with no header. It is not
//! itself encrypted; anyone who can read it can decrypt every envelope made
//! with it.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use rand::RngCore;
use rand::rngs::OsRng;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, LockmeError, Result};

/// Length of the symmetric key in bytes
pub const KEY_LEN: usize = 32;

/// Default file name of the key file
pub const DEFAULT_KEY_FILE: &str = "key.bin";

/// A 256-bit symmetric key. The bytes are wiped when the key is dropped.
#[derive(Clone)]
pub struct Key {
    bytes: Zeroizing<[u8; KEY_LEN]>,
}

impl Key {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
        }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key([redacted])")
    }
}

/// What to do about an existing key file when a key is needed for encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    /// Load the key file if it exists, otherwise generate and persist one.
    #[default]
    ReuseOrCreate,
    /// Always generate a fresh key and replace the key file. Files encrypted
    /// under the previous key can no longer be decrypted with the new file.
    Regenerate,
}

/// Generate a fresh key from the operating system's CSPRNG.
pub fn generate_key() -> Key {
    let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
    OsRng.fill_bytes(&mut bytes[..]);
    Key { bytes }
}

/// Write the raw key bytes to `path`, replacing any existing file.
///
/// The key is written to a temporary file in the same directory, synced and
/// then renamed over `path`, so readers never observe a partially written key.
/// On Unix the file is created with mode 0o600.
pub fn persist_key(key: &Key, path: &Path) -> Result<()> {
    crate::file_ops::write_file_atomic(path, key.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write key file {}", path.display())))?;
    debug!(path = %path.display(), "persisted key file");
    Ok(())
}

/// Load a key from `path`.
///
/// Fails with [`ErrorKind::KeyNotFound`] if the file does not exist and with
/// [`ErrorKind::InvalidKeyLength`] if it does not hold exactly [`KEY_LEN`]
/// bytes.
pub fn load_key(path: &Path) -> Result<Key> {
    let contents = Zeroizing::new(fs::read(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            LockmeError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::KeyNotFound,
                format!(
                    "encryption key not found ({}); locate the key file or encrypt again to create one",
                    path.display()
                ),
                e,
            )
        } else {
            LockmeError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to read key file {}", path.display()),
                e,
            )
        }
    })?);

    let bytes: [u8; KEY_LEN] = contents[..].try_into().map_err(|_| {
        debug!(
            path = %path.display(),
            len = contents.len(),
            "key file has wrong length"
        );
        LockmeError::integrity(ErrorKind::InvalidKeyLength)
    })?;
    debug!(path = %path.display(), "loaded key file");
    Ok(Key::from_bytes(bytes))
}

/// Produce the key to encrypt with, according to `policy`.
///
/// Under [`KeyPolicy::ReuseOrCreate`] an existing key file of the wrong
/// length is reported as an error, naming the file, rather than replaced.
pub fn obtain_key(path: &Path, policy: KeyPolicy) -> Result<Key> {
    if policy == KeyPolicy::ReuseOrCreate {
        match load_key(path) {
            Ok(key) => return Ok(key),
            Err(e) if e.kind == Some(ErrorKind::KeyNotFound) => {}
            Err(e) if e.kind == Some(ErrorKind::InvalidKeyLength) => {
                return Err(LockmeError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::InvalidKeyLength,
                    format!(
                        "key file {} is not {} bytes long; remove it or encrypt with --new-key",
                        path.display(),
                        KEY_LEN
                    ),
                ));
            }
            Err(e) => return Err(e),
        }
    }

    let key = generate_key();
    persist_key(&key, path)?;
    info!(path = %path.display(), "generated new key file");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_generated_keys_differ() {
        let a = generate_key();
        let b = generate_key();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_persist_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("key.bin");

        let key = generate_key();
        persist_key(&key, &path).unwrap();

        assert_eq!(fs::read(&path).unwrap(), key.as_bytes());
        let loaded = load_key(&path).unwrap();
        assert_eq!(loaded.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_persist_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("key.bin");
        fs::write(&path, b"old contents of a different length").unwrap();

        let key = generate_key();
        persist_key(&key, &path).unwrap();
        assert_eq!(fs::read(&path).unwrap().len(), KEY_LEN);
    }

    #[test]
    fn test_load_missing() {
        let temp_dir = TempDir::new().unwrap();
        let err = load_key(&temp_dir.path().join("key.bin")).expect_err("expected missing key");
        assert_eq!(err.kind, Some(ErrorKind::KeyNotFound));
        assert_eq!(err.category, ErrorCategory::User);
    }

    #[test]
    fn test_load_wrong_length() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("key.bin");
        for len in [0, 1, 16, 31, 33, 64] {
            fs::write(&path, vec![0x11u8; len]).unwrap();
            let err = load_key(&path).expect_err("expected invalid key length");
            assert_eq!(err.kind, Some(ErrorKind::InvalidKeyLength), "len {}", len);
        }
    }

    #[test]
    fn test_obtain_reuses_existing_key() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("key.bin");

        let first = obtain_key(&path, KeyPolicy::ReuseOrCreate).unwrap();
        let second = obtain_key(&path, KeyPolicy::ReuseOrCreate).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_obtain_regenerate_replaces_key() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("key.bin");

        let first = obtain_key(&path, KeyPolicy::ReuseOrCreate).unwrap();
        let second = obtain_key(&path, KeyPolicy::Regenerate).unwrap();
        assert_ne!(first.as_bytes(), second.as_bytes());
        assert_eq!(load_key(&path).unwrap().as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_obtain_does_not_replace_bad_key_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("key.bin");
        fs::write(&path, b"short").unwrap();

        let err = obtain_key(&path, KeyPolicy::ReuseOrCreate).expect_err("expected bad key");
        assert_eq!(err.kind, Some(ErrorKind::InvalidKeyLength));
        assert!(err.message().contains("32 bytes"), "got: {}", err);
        assert_eq!(fs::read(&path).unwrap(), b"short");
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = Key::from_bytes([0x41; KEY_LEN]);
        assert_eq!(format!("{:?}", key), "Key([redacted])");
    }

    #[test]
    #[cfg(unix)]
    fn test_key_file_permissions() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("key.bin");
        persist_key(&generate_key(), &path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
