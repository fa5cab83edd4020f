//! Encryption passphrase handling.
//!
//! The passphrase is resolved once at startup and then handed to each backup
//! engine child through that child's own environment. It is never written
//! into this process's environment, and its memory is wiped on drop.

use crate::constants::{ENV_VAR_PASSPHRASE, REDACTED_PLACEHOLDER};
use crate::errors::{AppError, AppResult};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

/// A passphrase whose backing memory is zeroized when dropped.
#[derive(Clone, Default)]
pub struct Passphrase(Zeroizing<String>);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Passphrase(Zeroizing::new(value.into()))
    }

    /// The passphrase used when none is configured: the engine then relies on
    /// gpg-agent or an unprotected key.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Determines the passphrase for this run.
    ///
    /// `DOUBLEWRAP_PASSPHRASE` wins when set, which keeps scripted and test
    /// runs non-interactive. Otherwise the user is prompted when `prompt` is
    /// true, and the passphrase is empty when it is not.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the terminal cannot be read.
    pub fn resolve(prompt: bool) -> AppResult<Self> {
        if let Ok(value) = std::env::var(ENV_VAR_PASSPHRASE) {
            debug!("Using passphrase from {}", ENV_VAR_PASSPHRASE);
            return Ok(Self::new(value));
        }
        if !prompt {
            return Ok(Self::empty());
        }

        let value = rpassword::prompt_password("Passphrase: ").map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read passphrase: {}", e),
            ))
        })?;
        Ok(Self::new(value))
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Passphrase").field(&REDACTED_PLACEHOLDER).finish()
    }
}
