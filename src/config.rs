use std::convert::Infallible;
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::GlitchError;
use crate::random::hash_key;
use crate::schedule::{validate_schedule_inputs, DurationRange};

/// Environment variable consulted for a seed override when no CLI seed is given.
pub const SEED_ENV_VAR: &str = "GLITCHLINE_SEED";

/// Root of determinism. Identical seed and config give identical output forever.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seed {
    Int(i64),
    Text(String),
}

impl Seed {
    /// Integer root all burst seeds are derived from.
    ///
    /// Text seeds fold through the same string hash as keyed sampling, so a
    /// text seed and the integer it hashes to (`"a"` and `97`) schedule alike.
    pub fn root(&self) -> i64 {
        match self {
            Self::Int(value) => *value,
            Self::Text(text) => i64::from(hash_key(text)),
        }
    }
}

impl Default for Seed {
    fn default() -> Self {
        Self::Int(42)
    }
}

impl FromStr for Seed {
    type Err = Infallible;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Ok(match trimmed.parse::<i64>() {
            Ok(value) => Self::Int(value),
            Err(_) => Self::Text(trimmed.to_owned()),
        })
    }
}

impl Display for Seed {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(text) => write!(f, "\"{text}\""),
        }
    }
}

/// Effect magnitudes and burst timing for one glitch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlitchConfig {
    /// Channel offset in pixels at full intensity.
    pub split_amount: f64,
    /// Blur radius at full intensity.
    pub blur_amount: f64,
    /// Global shake in pixels at full intensity.
    pub jitter_amount: f64,
    /// Average frames between burst starts.
    pub burst_spacing: f64,
    pub burst_duration: DurationRange,
    pub seed: Seed,
}

impl Default for GlitchConfig {
    fn default() -> Self {
        Self {
            split_amount: 4.0,
            blur_amount: 0.8,
            jitter_amount: 1.5,
            burst_spacing: 25.0,
            burst_duration: DurationRange { min: 2, max: 5 },
            seed: Seed::default(),
        }
    }
}

impl GlitchConfig {
    pub fn validate(&self) -> std::result::Result<(), GlitchError> {
        validate_magnitude("split_amount", self.split_amount)?;
        validate_magnitude("blur_amount", self.blur_amount)?;
        validate_magnitude("jitter_amount", self.jitter_amount)?;
        validate_schedule_inputs(self.burst_spacing, self.burst_duration)
    }
}

fn validate_magnitude(field: &'static str, value: f64) -> std::result::Result<(), GlitchError> {
    if !value.is_finite() {
        return Err(GlitchError::invalid_config(
            field,
            format!("must be finite, got {value}"),
        ));
    }
    if value < 0.0 {
        return Err(GlitchError::invalid_config(
            field,
            format!("must be >= 0, got {value}"),
        ));
    }
    Ok(())
}

/// A glitch document: host timeline plus effect config.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlitchDocument {
    pub timeline: TimelineSpec,
    #[serde(default)]
    pub glitch: GlitchConfig,
}

impl GlitchDocument {
    pub fn validate(&self) -> Result<()> {
        self.timeline
            .validate()
            .context("failed validating timeline section")?;
        self.glitch
            .validate()
            .context("failed validating glitch section")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimelineSpec {
    pub fps: u32,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum Duration {
    Seconds(f64),
    Frames { frames: u32 },
}

impl TimelineSpec {
    pub fn validate(&self) -> std::result::Result<(), GlitchError> {
        if self.fps == 0 {
            return Err(GlitchError::invalid_config("fps", "must be > 0"));
        }

        match self.duration {
            Duration::Seconds(seconds) => {
                if !seconds.is_finite() || seconds <= 0.0 {
                    return Err(GlitchError::invalid_config(
                        "duration",
                        format!("seconds must be finite and > 0, got {seconds}"),
                    ));
                }
            }
            Duration::Frames { frames } => {
                if frames == 0 {
                    return Err(GlitchError::invalid_config(
                        "duration",
                        "frames must be > 0",
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn total_frames(&self) -> u32 {
        match self.duration {
            Duration::Seconds(seconds) => {
                let frames = (seconds * f64::from(self.fps)).ceil();
                frames.clamp(1.0, f64::from(u32::MAX)) as u32
            }
            Duration::Frames { frames } => frames.max(1),
        }
    }
}

pub fn load_document(path: &Path) -> Result<GlitchDocument> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read glitch document {}", path.display()))?;
    parse_document(&contents, &path.display().to_string())
}

pub fn parse_document(contents: &str, origin: &str) -> Result<GlitchDocument> {
    let document: GlitchDocument = serde_yaml::from_str(contents).map_err(|error| {
        let location = error
            .location()
            .map(|location| format!("line {}, column {}", location.line(), location.column()))
            .unwrap_or_else(|| "unknown location".to_owned());
        anyhow!("failed to parse yaml in {origin} at {location}: {error}")
    })?;

    document
        .validate()
        .with_context(|| format!("invalid glitch document {origin}"))?;
    Ok(document)
}

/// Resolve the seed from CLI and env. CLI wins over env.
/// Returns None when neither is set (keep the document seed).
pub fn resolve_seed_override(cli_arg: Option<Seed>, env_var: Option<String>) -> Option<Seed> {
    if cli_arg.is_some() {
        return cli_arg;
    }
    env_var
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| match raw.parse::<Seed>() {
            Ok(seed) => seed,
            Err(never) => match never {},
        })
}
