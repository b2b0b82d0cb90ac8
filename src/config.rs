//! Settings shared by every handle a factory opens.
//!
//! With the `config` feature the settings can also be read from
//! `<config dir>/basic-fileio/settings.toml`; every key is optional.

use crate::error::{FileIoError, Result};
#[cfg(feature = "config")]
use serde::Deserialize;
#[cfg(feature = "config")]
use std::path::PathBuf;

/// Largest record length a Random file accepts
pub const MAX_RECORD_LENGTH: i32 = 32_767;

#[cfg(feature = "config")]
const APP_DIR: &str = "basic-fileio";

#[cfg(feature = "config")]
const SETTINGS_FILE: &str = "settings.toml";

/// Defaults applied when a file is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct Settings {
    /// Record length of a Random file opened with length -1
    pub default_record_length: i32,
    /// Print zone width and the stop used by `Tab` without a column
    pub zone_width: usize,
    /// Line break emitted by Print, Write and their line variants
    pub line_terminator: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_record_length: 128,
            zone_width: 14,
            line_terminator: "\r\n".to_string(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_RECORD_LENGTH).contains(&self.default_record_length) {
            return Err(FileIoError::config(format!(
                "default_record_length must be in 1..={MAX_RECORD_LENGTH}, got {}",
                self.default_record_length
            )));
        }
        if self.zone_width == 0 {
            return Err(FileIoError::config("zone_width must be at least 1"));
        }
        if self.line_terminator.is_empty() {
            return Err(FileIoError::config("line_terminator must not be empty"));
        }
        Ok(())
    }

    /// Parse and validate settings from TOML text.
    #[cfg(feature = "config")]
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(text).map_err(|e| FileIoError::config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Location of the user's settings file
    #[cfg(feature = "config")]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Load the user's settings file, falling back to defaults when there is none.
    #[cfg(feature = "config")]
    pub fn load() -> Result<Self> {
        let Some(path) = Self::default_path() else {
            return Ok(Self::default());
        };
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                log::debug!("loading settings from {}", path.display());
                Self::from_toml_str(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(FileIoError::file_error(
                format!("Failed to read settings file: {}", path.display()),
                e,
            )),
        }
    }
}
