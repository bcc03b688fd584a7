//! Error type shared by every lockme operation

use std::error::Error as StdError;

use thiserror::Error;

/// Who is most likely responsible for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Fallback for failures lockme cannot pin on the user's input or
    /// environment. Not proof that the user is blameless.
    Internal,

    /// Bad input from the user: a missing or malformed file, a wrong key,
    /// or a request lockme cannot carry out.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The key file does not exist.
    KeyNotFound,
    /// The key file exists but does not hold exactly 32 bytes.
    InvalidKeyLength,
    /// The envelope is too short to contain an IV (or nonce and tag).
    EnvelopeTooShort,
    /// The ciphertext region is not a whole number of cipher blocks.
    InvalidCiphertextLength,
    /// The decrypted buffer does not end in well-formed PKCS#7 padding.
    InvalidPadding,
    /// Authentication failed due to a wrong key, tampering or corruption.
    AuthenticationFailed,
    /// The configuration file could not be parsed.
    InvalidConfig,
    /// Unexpected state reached within lockme logic.
    InternalInvariant,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

impl ErrorKind {
    /// True for the kinds that signal a corrupted, truncated or wrong-key
    /// decryption attempt. These share one user-visible message.
    pub fn is_integrity_failure(self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidKeyLength
                | ErrorKind::EnvelopeTooShort
                | ErrorKind::InvalidCiphertextLength
                | ErrorKind::InvalidPadding
                | ErrorKind::AuthenticationFailed
        )
    }
}

/// Message attached to every integrity failure, regardless of which check
/// tripped.
pub const DECRYPTION_FAILED: &str =
    "decryption failed: corrupt input, wrong key, or tampered-with data";

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct LockmeError {
    pub category: ErrorCategory,
    /// Set when the failure matches a known condition; `None` otherwise.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl LockmeError {
    /// Error with a kind tag and no underlying cause.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Error with a kind tag that keeps `source` as its cause.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.msg
    }

    /// The underlying cause, if any.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Creates an integrity failure of the given kind carrying the generic
    /// decryption-failed message.
    pub fn integrity(kind: ErrorKind) -> Self {
        Self::with_kind(ErrorCategory::User, kind, DECRYPTION_FAILED)
    }

    /// Renders the message followed by every message in the source chain,
    /// separated by ": ". This is what the front end shows to the user.
    pub fn report(&self) -> String {
        let mut out = self.msg.clone();
        let mut next = self.source_error().map(|e| e as &(dyn StdError + 'static));
        while let Some(err) = next {
            out.push_str(": ");
            out.push_str(&err.to_string());
            next = err.source();
        }
        out
    }

    /// Puts `msg` in front of this error, which becomes the source. Category
    /// and kind carry over.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LockmeError>;
