//! PKCS#7 padding for 16-byte cipher blocks
//!
//! A full block of padding is appended when the input is already aligned,
//! so stripping is never ambiguous.

use subtle::{ConstantTimeEq, ConstantTimeLess};

use crate::error::{ErrorKind, LockmeError, Result};

/// Cipher block size in bytes
pub const BLOCK_LEN: usize = 16;

/// Number of padding bytes appended to a buffer of `len` bytes (1..=16).
pub fn pad_len(len: usize) -> usize {
    BLOCK_LEN - (len % BLOCK_LEN)
}

/// Return a copy of `data` extended with PKCS#7 padding.
pub fn pad(data: &[u8]) -> Vec<u8> {
    let p = pad_len(data.len());
    let mut padded = Vec::with_capacity(data.len() + p);
    padded.extend_from_slice(data);
    padded.resize(data.len() + p, p as u8);
    padded
}

/// Strip PKCS#7 padding from a decrypted buffer.
///
/// The last block is examined in full regardless of where the first bad byte
/// sits, so the running time does not depend on the padding contents.
pub fn unpad(data: &[u8]) -> Result<&[u8]> {
    if data.is_empty() || data.len() % BLOCK_LEN != 0 {
        return Err(LockmeError::integrity(ErrorKind::InvalidPadding));
    }

    let last_block = &data[data.len() - BLOCK_LEN..];
    let p = last_block[BLOCK_LEN - 1];

    let mut valid = !p.ct_eq(&0) & p.ct_lt(&(BLOCK_LEN as u8 + 1));
    for (i, byte) in last_block.iter().enumerate() {
        // Position counted from the end of the block, 1-based.
        let from_end = (BLOCK_LEN - i) as u8;
        let in_padding = !p.ct_lt(&from_end);
        valid &= !in_padding | byte.ct_eq(&p);
    }

    if !bool::from(valid) {
        return Err(LockmeError::integrity(ErrorKind::InvalidPadding));
    }
    Ok(&data[..data.len() - p as usize])
}
