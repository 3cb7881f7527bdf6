//! # Settings
//!
//! Explicit configuration threaded through load, save and fitting. Nothing
//! in the crate reads process-wide state except [`Settings::from_env`].
//!
//! Settings can be written as YAML:
//!
//! ```yaml
//! encoding: utf-8          # force one encoding, skipping detection
//! locale-encoding: cp932   # preferred legacy codepage
//! fallback-encoding: shift_jis
//! strict-lookup: false     # timing-table misses fail fitting
//! line-ending: crlf        # or lf
//! ```
//!
//! Encoding labels are WHATWG labels plus the Windows codepage names
//! (`cp932`, `cp936`, `cp949`, `cp950`).

use std::path::Path;

use encoding_rs::{Encoding, SHIFT_JIS};
use serde::Deserialize;

use crate::encoding::{encoding_from_label, locale_encoding_from_env};
use crate::error::UstError;

/// Line terminator written on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Crlf,
    Lf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Crlf => "\r\n",
            LineEnding::Lf => "\n",
        }
    }

    fn from_label(label: &str) -> Option<LineEnding> {
        match label.trim().to_ascii_lowercase().as_str() {
            "crlf" => Some(LineEnding::Crlf),
            "lf" => Some(LineEnding::Lf),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Decode and encode with exactly this encoding.
    pub encoding: Option<&'static Encoding>,
    /// Legacy codepage tried before UTF-8.
    pub locale_encoding: Option<&'static Encoding>,
    /// Tried after UTF-8.
    pub fallback_encoding: &'static Encoding,
    pub strict_lookup: bool,
    pub line_ending: LineEnding,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            encoding: None,
            locale_encoding: None,
            fallback_encoding: SHIFT_JIS,
            strict_lookup: false,
            line_ending: LineEnding::Crlf,
        }
    }
}

/// Settings as written in YAML.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RawSettings {
    pub encoding: Option<String>,
    pub locale_encoding: Option<String>,
    pub fallback_encoding: Option<String>,
    pub strict_lookup: Option<bool>,
    pub line_ending: Option<String>,
}

/// Resolve an encoding label, failing with `ConfigError`.
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding, UstError> {
    encoding_from_label(label)
        .ok_or_else(|| UstError::ConfigError(format!("Unknown encoding label: {}", label)))
}

impl Settings {
    /// Defaults, with the locale codepage taken from `LC_ALL`, `LC_CTYPE`
    /// or `LANG`.
    pub fn from_env() -> Self {
        Settings {
            locale_encoding: Some(locale_encoding_from_env()),
            ..Settings::default()
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self, UstError> {
        let raw: RawSettings =
            serde_yaml::from_str(content).map_err(|e| UstError::ConfigError(e.to_string()))?;
        Settings::from_raw(raw)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, UstError> {
        let content = std::fs::read_to_string(path)?;
        Settings::from_yaml(&content)
    }

    fn from_raw(raw: RawSettings) -> Result<Self, UstError> {
        let defaults = Settings::default();

        let encoding = match &raw.encoding {
            Some(label) => Some(encoding_for_label(label)?),
            None => None,
        };

        let locale_encoding = match &raw.locale_encoding {
            Some(label) => Some(encoding_for_label(label)?),
            None => None,
        };

        let fallback_encoding = if let Some(label) = &raw.fallback_encoding {
            encoding_for_label(label)?
        } else {
            defaults.fallback_encoding
        };

        let line_ending = if let Some(label) = &raw.line_ending {
            LineEnding::from_label(label).ok_or_else(|| {
                UstError::ConfigError(format!("Invalid line ending: {}", label))
            })?
        } else {
            defaults.line_ending
        };

        Ok(Settings {
            encoding,
            locale_encoding,
            fallback_encoding,
            strict_lookup: raw.strict_lookup.unwrap_or(defaults.strict_lookup),
            line_ending,
        })
    }

    /// Same settings with a forced encoding.
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }
}
