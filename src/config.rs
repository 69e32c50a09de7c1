//! Configuration types for report generation.
//!
//! Every knob that a front end would otherwise keep in ambient UI state
//! (toggles, sliders, a select box) lives in [`RunSettings`], which is passed
//! explicitly into the pipeline for each request. Nothing here is persisted.

use crate::error::RadNoteError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Primary credential variable for the Gemini provider.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Variable read by the provider factory; accepted as a fallback.
pub const PROVIDER_KEY_ENV: &str = "GEMINI_API_KEY";

pub const MIN_RESIZE_WIDTH: u32 = 320;
pub const MAX_RESIZE_WIDTH: u32 = 900;
pub const RESIZE_WIDTH_STEP: u32 = 10;
pub const MAX_RETRIES: u32 = 5;

/// Gemini model offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelId {
    #[default]
    #[serde(rename = "gemini-flash-latest")]
    GeminiFlashLatest,
    #[serde(rename = "gemini-2.0-flash")]
    Gemini20Flash,
    #[serde(rename = "gemini-2.5-flash")]
    Gemini25Flash,
    #[serde(rename = "gemini-2.0-flash-exp")]
    Gemini20FlashExp,
}

impl ModelId {
    /// All selectable models, in menu order.
    pub const ALL: [ModelId; 4] = [
        ModelId::GeminiFlashLatest,
        ModelId::Gemini20Flash,
        ModelId::Gemini25Flash,
        ModelId::Gemini20FlashExp,
    ];

    /// Identifier sent to the provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::GeminiFlashLatest => "gemini-flash-latest",
            ModelId::Gemini20Flash => "gemini-2.0-flash",
            ModelId::Gemini25Flash => "gemini-2.5-flash",
            ModelId::Gemini20FlashExp => "gemini-2.0-flash-exp",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = RadNoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelId::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| {
                RadNoteError::InvalidConfig(format!(
                    "Unknown model '{}'; expected one of: {}",
                    s,
                    ModelId::ALL.map(|m| m.as_str()).join(", ")
                ))
            })
    }
}

/// Lets the CLI take `--model` directly, with the provider names as values.
#[cfg(feature = "cli")]
impl clap::ValueEnum for ModelId {
    fn value_variants<'a>() -> &'a [Self] {
        &Self::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

/// Settings for a single report-generation request.
///
/// Built via [`RunSettings::builder()`] or [`RunSettings::default()`].
///
/// # Example
/// ```rust
/// use radnote::{ModelId, RunSettings};
///
/// let settings = RunSettings::builder()
///     .model(ModelId::Gemini25Flash)
///     .max_retries(2)
///     .resize_width(800)
///     .build()
///     .unwrap();
/// assert_eq!(settings.resize_width, 800);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Model to call. Default: `gemini-flash-latest`.
    pub model: ModelId,

    /// Skip the model and return the fixed demo report. Default: false.
    pub demo_mode: bool,

    /// Let the model add external references. Default: false.
    pub web_enabled: bool,

    /// Extra attempts after a rate-limited call. Range 0–5. Default: 3.
    pub max_retries: u32,

    /// Width the image is resized to before upload. Range 320–900, step 10. Default: 640.
    pub resize_width: u32,

    /// Backoff unit in milliseconds; attempt `i` waits `retry_backoff_ms * 2^i`. Default: 1000.
    pub retry_backoff_ms: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            model: ModelId::default(),
            demo_mode: false,
            web_enabled: false,
            max_retries: 3,
            resize_width: 640,
            retry_backoff_ms: 1000,
        }
    }
}

impl RunSettings {
    /// Create a new builder for `RunSettings`.
    pub fn builder() -> RunSettingsBuilder {
        RunSettingsBuilder {
            settings: Self::default(),
        }
    }

    /// Check the ranges the configuration surface allows.
    pub fn validate(&self) -> Result<(), RadNoteError> {
        if self.max_retries > MAX_RETRIES {
            return Err(RadNoteError::InvalidConfig(format!(
                "Retries must be 0–{}, got {}",
                MAX_RETRIES, self.max_retries
            )));
        }
        let w = self.resize_width;
        if !(MIN_RESIZE_WIDTH..=MAX_RESIZE_WIDTH).contains(&w) {
            return Err(RadNoteError::InvalidConfig(format!(
                "Resize width must be {}–{}, got {}",
                MIN_RESIZE_WIDTH, MAX_RESIZE_WIDTH, w
            )));
        }
        if (w - MIN_RESIZE_WIDTH) % RESIZE_WIDTH_STEP != 0 {
            return Err(RadNoteError::InvalidConfig(format!(
                "Resize width must be a multiple of {}, got {}",
                RESIZE_WIDTH_STEP, w
            )));
        }
        Ok(())
    }
}

/// Builder for [`RunSettings`].
#[derive(Debug)]
pub struct RunSettingsBuilder {
    settings: RunSettings,
}

impl RunSettingsBuilder {
    pub fn model(mut self, model: ModelId) -> Self {
        self.settings.model = model;
        self
    }

    pub fn demo_mode(mut self, v: bool) -> Self {
        self.settings.demo_mode = v;
        self
    }

    pub fn web_enabled(mut self, v: bool) -> Self {
        self.settings.web_enabled = v;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.settings.max_retries = n;
        self
    }

    pub fn resize_width(mut self, px: u32) -> Self {
        self.settings.resize_width = px;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.settings.retry_backoff_ms = ms;
        self
    }

    /// Build the settings, validating constraints.
    pub fn build(self) -> Result<RunSettings, RadNoteError> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

/// Read the provider credential, failing if neither variable is set.
///
/// Call once at startup, before serving anything.
pub fn require_api_key() -> Result<String, RadNoteError> {
    api_key_from(|name| std::env::var(name).ok())
}

/// [`require_api_key`] over an arbitrary variable lookup.
pub fn api_key_from(lookup: impl Fn(&str) -> Option<String>) -> Result<String, RadNoteError> {
    [API_KEY_ENV, PROVIDER_KEY_ENV]
        .into_iter()
        .filter_map(|name| lookup(name))
        .find(|v| !v.trim().is_empty())
        .ok_or_else(|| RadNoteError::MissingCredential {
            var: API_KEY_ENV.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_the_controls() {
        let s = RunSettings::default();
        assert_eq!(s.model, ModelId::GeminiFlashLatest);
        assert!(!s.demo_mode);
        assert!(!s.web_enabled);
        assert_eq!(s.max_retries, 3);
        assert_eq!(s.resize_width, 640);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn width_bounds_and_step() {
        assert!(RunSettings::builder().resize_width(320).build().is_ok());
        assert!(RunSettings::builder().resize_width(900).build().is_ok());
        assert!(RunSettings::builder().resize_width(310).build().is_err());
        assert!(RunSettings::builder().resize_width(910).build().is_err());
        assert!(RunSettings::builder().resize_width(645).build().is_err());
    }

    #[test]
    fn retries_bounded() {
        assert!(RunSettings::builder().max_retries(0).build().is_ok());
        assert!(RunSettings::builder().max_retries(5).build().is_ok());
        assert!(RunSettings::builder().max_retries(6).build().is_err());
    }

    #[test]
    fn model_id_parses_every_menu_entry() {
        for m in ModelId::ALL {
            assert_eq!(m.as_str().parse::<ModelId>().unwrap(), m);
        }
        assert!("gpt-4o".parse::<ModelId>().is_err());
    }

    #[cfg(feature = "cli")]
    #[test]
    fn model_id_is_a_cli_value() {
        use clap::ValueEnum;

        for m in ModelId::ALL {
            assert_eq!(<ModelId as ValueEnum>::from_str(m.as_str(), false).unwrap(), m);
        }
        assert!(<ModelId as ValueEnum>::from_str("gemini-1.5-pro", false).is_err());
        assert_eq!(ModelId::value_variants().len(), 4);
    }

    #[test]
    fn model_id_serialises_as_provider_name() {
        let json = serde_json::to_string(&ModelId::Gemini25Flash).unwrap();
        assert_eq!(json, "\"gemini-2.5-flash\"");
    }

    #[test]
    fn api_key_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([(PROVIDER_KEY_ENV, "k2")]);
        let key = api_key_from(|n| env.get(n).map(|v| v.to_string())).unwrap();
        assert_eq!(key, "k2");

        let env: HashMap<&str, &str> = HashMap::from([(API_KEY_ENV, "k1"), (PROVIDER_KEY_ENV, "k2")]);
        let key = api_key_from(|n| env.get(n).map(|v| v.to_string())).unwrap();
        assert_eq!(key, "k1");
    }

    #[test]
    fn missing_or_blank_key_is_fatal() {
        let err = api_key_from(|_| None).unwrap_err();
        assert!(matches!(err, RadNoteError::MissingCredential { .. }));

        let err = api_key_from(|_| Some("  ".into())).unwrap_err();
        assert!(matches!(err, RadNoteError::MissingCredential { .. }));
    }
}
