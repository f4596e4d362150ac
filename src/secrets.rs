//! Login credentials stored on disk.
//!
//! The secrets file is TOML:
//!
//! ```toml
//! email = "listener@example.com"
//! password = "hunter2"
//! ```

use std::{fs, path::Path};

use serde::Deserialize;
use veil::Redact;

use crate::error::{Error, Result};

#[derive(Clone, PartialEq, Eq, Hash, Deserialize, Redact)]
pub struct Credentials {
    pub email: String,

    #[redact]
    pub password: String,
}

impl Credentials {
    /// Secrets files are tiny; anything larger is not one.
    const MAX_FILE_SIZE: u64 = 1024;

    #[must_use]
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_owned(),
            password: password.to_owned(),
        }
    }

    /// Loads credentials from a secrets file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is larger than 1 KiB, is
    /// not valid TOML or lacks either field.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Prevent out-of-memory condition: secrets file should be small.
        let file_size = fs::metadata(path)?.len();
        if file_size > Self::MAX_FILE_SIZE {
            return Err(Error::out_of_range(format!(
                "{} is too large",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        let credentials: Self = toml::from_str(&contents)?;
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(Error::invalid_argument(format!(
                "{} must contain an email and a password",
                path.display()
            )));
        }

        Ok(credentials)
    }
}
