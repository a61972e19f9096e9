//! Option validation, applied before any engine is invoked.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::types::RenderOptions;

/// Largest accepted viewport edge, in CSS pixels.
pub const MAX_DIMENSION: u32 = 16_384;
pub const MAX_SCALE_FACTOR: f64 = 8.0;
pub const MAX_SPEED: f32 = 4.0;

// Kokoro voice ids: two-letter language/gender prefix, underscore, name.
static RE_VOICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}_[a-z0-9]+$").unwrap());

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be between 1 and 16384, got {value}")]
    Dimension { field: &'static str, value: f64 },
    #[error("scale_factor must be in (0, 8], got {0}")]
    ScaleFactor(f64),
    #[error("speed must be in (0, 4], got {0}")]
    Speed(f32),
    #[error("unknown voice '{0}'")]
    Voice(String),
}

impl RenderOptions {
    /// Reject malformed options. Called by the orchestrator after the engine
    /// resolves and before it renders.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_dimension("width", self.width)?;
        check_dimension("height", self.height)?;

        if !(self.scale_factor.is_finite()
            && self.scale_factor > 0.0
            && self.scale_factor <= MAX_SCALE_FACTOR)
        {
            return Err(ValidationError::ScaleFactor(self.scale_factor));
        }

        if !(self.speed.is_finite() && self.speed > 0.0 && self.speed <= MAX_SPEED) {
            return Err(ValidationError::Speed(self.speed));
        }

        if !RE_VOICE.is_match(&self.voice) {
            return Err(ValidationError::Voice(self.voice.clone()));
        }

        Ok(())
    }
}

fn check_dimension(field: &'static str, value: u32) -> Result<(), ValidationError> {
    if value == 0 || value > MAX_DIMENSION {
        return Err(ValidationError::Dimension {
            field,
            value: f64::from(value),
        });
    }
    Ok(())
}

/// Options as they arrive on the wire.
///
/// Dimensions are read as plain numbers so that negative, fractional or
/// oversized values surface as [`ValidationError::Dimension`] instead of a
/// deserialization failure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderOptionsInput {
    pub width: f64,
    pub height: f64,
    pub scale_factor: f64,
    pub omit_background: bool,
    pub tight_crop: bool,
    pub voice: String,
    pub speed: f32,
}

impl Default for RenderOptionsInput {
    fn default() -> Self {
        let defaults = RenderOptions::default();
        Self {
            width: f64::from(defaults.width),
            height: f64::from(defaults.height),
            scale_factor: defaults.scale_factor,
            omit_background: defaults.omit_background,
            tight_crop: defaults.tight_crop,
            voice: defaults.voice,
            speed: defaults.speed,
        }
    }
}

impl RenderOptionsInput {
    /// Convert to [`RenderOptions`] and run [`RenderOptions::validate`].
    pub fn into_options(self) -> Result<RenderOptions, ValidationError> {
        let options = RenderOptions {
            width: wire_dimension("width", self.width)?,
            height: wire_dimension("height", self.height)?,
            scale_factor: self.scale_factor,
            omit_background: self.omit_background,
            tight_crop: self.tight_crop,
            voice: self.voice,
            speed: self.speed,
        };
        options.validate()?;
        Ok(options)
    }
}

fn wire_dimension(field: &'static str, value: f64) -> Result<u32, ValidationError> {
    if value.fract() != 0.0 || !(1.0..=f64::from(MAX_DIMENSION)).contains(&value) {
        return Err(ValidationError::Dimension { field, value });
    }
    Ok(value as u32)
}
