//! Logger configuration.
//!
//! ```
//! use querylog_core::{LoggerConfig, SourceCapture};
//!
//! let config = LoggerConfig::new()
//!     .with_source_capture(SourceCapture::Always)
//!     .with_vendor_markers(["vendor", "/generated/"]);
//! assert!(config.vendor_markers().is_vendor("/srv/app/generated/schema.rs"));
//! ```

use crate::debug_stack::SourceCapture;
use crate::error::{QueryLogError, Result};
use crate::source::VendorMarkers;

/// Turns logging on or off (`true`/`false`, `1`/`0`, `on`/`off`, `yes`/`no`).
pub const ENV_ENABLED: &str = "QUERYLOG_ENABLED";
/// Source capture mode, see [`SourceCapture`]'s `FromStr`.
pub const ENV_SOURCE: &str = "QUERYLOG_SOURCE";
/// Comma-separated vendor markers. Empty disables vendor filtering.
pub const ENV_VENDOR_MARKERS: &str = "QUERYLOG_VENDOR_MARKERS";

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoggerConfig {
    pub enabled: bool,
    pub source_capture: SourceCapture,
    /// `None` selects [`VendorMarkers::default`].
    pub vendor_markers: Option<Vec<String>>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_capture: SourceCapture::None,
            vendor_markers: None,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_source_capture(mut self, capture: SourceCapture) -> Self {
        self.source_capture = capture;
        self
    }

    pub fn with_vendor_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vendor_markers = Some(markers.into_iter().map(Into::into).collect());
        self
    }

    pub fn vendor_markers(&self) -> VendorMarkers {
        match &self.vendor_markers {
            Some(markers) => VendorMarkers::new(markers),
            None => VendorMarkers::default(),
        }
    }

    /// Reads the `QUERYLOG_*` environment variables on top of the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_ENABLED) {
            config.enabled = parse_bool(ENV_ENABLED, &value)?;
        }
        if let Some(value) = lookup(ENV_SOURCE) {
            config.source_capture = value.parse()?;
        }
        if let Some(value) = lookup(ENV_VENDOR_MARKERS) {
            config.vendor_markers = Some(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_owned)
                    .collect(),
            );
        }

        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(QueryLogError::InvalidConfig(format!(
            "{key} expects a boolean, got {value:?}"
        ))),
    }
}
