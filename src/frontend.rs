//! Interactive front end boundary
//!
//! A front end supplies the file to act on and receives exactly one terminal
//! outcome per action. [`run_action`] is the only place where errors from
//! the key and cipher layers are turned into user-visible messages.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ErrorCategory, ErrorKind, LockmeError, Result};
use crate::file_ops;
use crate::keyfile::{self, KeyPolicy};

/// The two user-triggerable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Encrypt,
    Decrypt,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Encrypt => f.write_str("encrypt"),
            Action::Decrypt => f.write_str("decrypt"),
        }
    }
}

/// Trait for the interactive layer driving lockme
pub trait FrontEnd {
    /// Ask the user for a file. `Ok(None)` means the user cancelled.
    fn request_path(&mut self, action: Action) -> Result<Option<PathBuf>>;

    fn notify_success(&mut self, message: &str);

    fn notify_error(&mut self, message: &str);
}

/// How an action ended.
#[derive(Debug)]
pub enum Outcome {
    /// The user cancelled; nothing was reported.
    Cancelled,
    /// The action succeeded and wrote the given file.
    Completed(PathBuf),
    /// The action failed; the error has been reported to the front end.
    Failed(LockmeError),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// Run one action end to end: request a path, obtain the key, transform the
/// file and report exactly one outcome to `front_end`.
///
/// `key_policy` only applies to [`Action::Encrypt`]; decryption always loads
/// the existing key file.
pub fn run_action(
    action: Action,
    front_end: &mut dyn FrontEnd,
    config: &Config,
    key_policy: KeyPolicy,
) -> Outcome {
    let path = match front_end.request_path(action) {
        Ok(Some(path)) => path,
        Ok(None) => {
            info!(%action, "cancelled by user");
            return Outcome::Cancelled;
        }
        Err(e) => {
            front_end.notify_error(&e.report());
            return Outcome::Failed(e);
        }
    };

    match perform(action, &path, config, key_policy) {
        Ok((output, message)) => {
            front_end.notify_success(&message);
            Outcome::Completed(output)
        }
        Err(e) => {
            debug!(%action, path = %path.display(), kind = ?e.kind, "action failed");
            front_end.notify_error(&e.report());
            Outcome::Failed(e)
        }
    }
}

fn perform(
    action: Action,
    path: &Path,
    config: &Config,
    key_policy: KeyPolicy,
) -> Result<(PathBuf, String)> {
    match action {
        Action::Encrypt => {
            let key = keyfile::obtain_key(&config.key_file, key_policy)?;
            let output = file_ops::encrypt_file(path, &key, config.mode)?;
            let message = format!(
                "Encrypted file saved as:\n{}\nKey saved as {}",
                output.display(),
                config.key_file.display()
            );
            Ok((output, message))
        }
        Action::Decrypt => {
            let key = keyfile::load_key(&config.key_file)?;
            let output = file_ops::decrypt_file(path, &key, config.mode)?;
            let message = format!("Decrypted file saved as:\n{}", output.display());
            Ok((output, message))
        }
    }
}

/// Line-oriented front end for terminals and pipes
///
/// Prompts on `prompt_out` and reads one line from `input` per request; an
/// empty line (or end of input) cancels. When constructed with a preset
/// path, that path is returned instead of prompting.
pub struct TerminalFrontEnd {
    preset: Option<PathBuf>,
    input: Box<dyn BufRead>,
    prompt_out: Box<dyn Write>,
    message_out: Box<dyn Write>,
}

impl TerminalFrontEnd {
    pub fn new(
        input: Box<dyn BufRead>,
        prompt_out: Box<dyn Write>,
        message_out: Box<dyn Write>,
    ) -> Self {
        Self {
            preset: None,
            input,
            prompt_out,
            message_out,
        }
    }

    /// Front end bound to the process's stdin, stderr (prompts and errors)
    /// and stdout (success messages).
    pub fn stdio() -> Self {
        Self::new(
            Box::new(io::BufReader::new(io::stdin())),
            Box::new(io::stderr()),
            Box::new(io::stdout()),
        )
    }

    /// Use `path` for the next request instead of prompting.
    pub fn with_path(mut self, path: Option<PathBuf>) -> Self {
        self.preset = path;
        self
    }
}

impl FrontEnd for TerminalFrontEnd {
    fn request_path(&mut self, action: Action) -> Result<Option<PathBuf>> {
        if let Some(path) = self.preset.take() {
            return Ok(Some(path));
        }

        write!(self.prompt_out, "File to {} (empty to cancel): ", action)
            .and_then(|_| self.prompt_out.flush())
            .map_err(|e| {
                LockmeError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    "failed to write prompt",
                    e,
                )
            })?;

        let mut line = String::new();
        self.input.read_line(&mut line).map_err(|e| {
            LockmeError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "failed to read file path",
                e,
            )
        })?;

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(PathBuf::from(trimmed)))
        }
    }

    fn notify_success(&mut self, message: &str) {
        // Nowhere left to report a failure to print.
        let _ = writeln!(self.message_out, "{}", message);
    }

    fn notify_error(&mut self, message: &str) {
        let _ = writeln!(self.prompt_out, "Error: {}", message);
    }
}
