//! File encryption/decryption operations
//!
//! This module reads whole files, runs them through [`blockcrypt`] and writes
//! the result next to the input under a derived name.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::blockcrypt::{self, CipherMode};
use crate::error::{ErrorCategory, ErrorKind, LockmeError, Result};
use crate::keyfile::Key;

/// Suffix appended to the input path when encrypting
pub const ENCRYPTED_SUFFIX: &str = ".enc";

/// Suffix used for the output path when decrypting
pub const DECRYPTED_SUFFIX: &str = ".dec";

/// Output path for encrypting `input`: the input path with `.enc` appended.
pub fn encrypted_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(ENCRYPTED_SUFFIX);
    PathBuf::from(name)
}

/// Output path for decrypting `input`: a trailing `.enc` is replaced by
/// `.dec`, otherwise `.dec` is appended. Works on the raw OS string, so
/// non-UTF-8 names are renamed the same way.
pub fn decrypted_path(input: &Path) -> PathBuf {
    let raw = input.as_os_str().as_encoded_bytes();
    if raw.ends_with(ENCRYPTED_SUFFIX.as_bytes()) {
        match input.file_name() {
            Some(name) if name == ENCRYPTED_SUFFIX => {
                return input.with_file_name(DECRYPTED_SUFFIX);
            }
            Some(_) if input.extension().is_some_and(|ext| ext == "enc") => {
                return input.with_extension("dec");
            }
            _ => {}
        }
    }
    let mut name = OsString::from(input.as_os_str());
    name.push(DECRYPTED_SUFFIX);
    PathBuf::from(name)
}

/// Encrypt a file with a key
///
/// Reads plaintext from `input_path`, encrypts it under `key` and writes the
/// envelope to [`encrypted_path`]. Returns the path written.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn encrypt_file(input_path: &Path, key: &Key, mode: CipherMode) -> Result<PathBuf> {
    let plaintext = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let envelope = blockcrypt::encrypt(key, &plaintext, mode)
        .map_err(|e| e.with_context("encryption failed"))?;

    let output_path = encrypted_path(input_path);
    write_file_atomic(&output_path, &envelope)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        %mode,
        "encrypted file"
    );
    Ok(output_path)
}

/// Decrypt a file with a key
///
/// Reads an envelope from `input_path`, decrypts it under `key` and writes the
/// plaintext to [`decrypted_path`]. Returns the path written. Nothing is
/// written unless the whole envelope decrypts successfully.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn decrypt_file(input_path: &Path, key: &Key, mode: CipherMode) -> Result<PathBuf> {
    let envelope = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let plaintext = blockcrypt::decrypt(key, &envelope, mode)?;

    let output_path = decrypted_path(input_path);
    write_file_atomic(&output_path, &plaintext)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        %mode,
        "decrypted file"
    );
    Ok(output_path)
}

/// Write `contents` to `path` atomically (tempfile + fsync + rename)
///
/// Either the previous file or the complete new file exists at `path`, never
/// a partial one. If anything fails the temporary file is removed.
pub(crate) fn write_file_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        LockmeError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("failed to create tempfile in {}", dir.display()),
            e,
        )
    })?;
    debug!(path = %temp_file.path().display(), "created tempfile");

    temp_file.write_all(contents).map_err(|e| {
        LockmeError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to write to tempfile",
            e,
        )
    })?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush().map_err(|e| {
        LockmeError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to flush tempfile",
            e,
        )
    })?;
    temp_file.as_file().sync_all().map_err(|e| {
        LockmeError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| {
                LockmeError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    "failed to set tempfile permissions",
                    e,
                )
            })?;
    }

    temp_file.persist(path).map_err(|e| {
        LockmeError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    debug!(path = %path.display(), len = contents.len(), "wrote file");
    Ok(())
}

fn read_error(path: &Path, err: io::Error) -> LockmeError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    LockmeError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}
