use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// Failures raised by scheduling, validation and persisted-schedule checks.
#[derive(Debug, Clone, PartialEq)]
pub enum GlitchError {
    InvalidConfig {
        field: &'static str,
        reason: String,
    },
    NonAdvancingSchedule {
        ordinal: u64,
        frame: i64,
        next_frame: i64,
    },
    InvalidSchedule {
        index: usize,
        reason: String,
    },
}

impl GlitchError {
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    pub fn invalid_schedule(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidSchedule {
            index,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "invalid_config",
            Self::NonAdvancingSchedule { .. } => "non_advancing_schedule",
            Self::InvalidSchedule { .. } => "invalid_schedule",
        }
    }
}

impl Display for GlitchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { field, reason } => {
                write!(f, "invalid config field '{field}': {reason}")
            }
            Self::NonAdvancingSchedule {
                ordinal,
                frame,
                next_frame,
            } => write!(
                f,
                "non-advancing schedule at burst #{ordinal}: cursor would move from frame {frame} to {next_frame}"
            ),
            Self::InvalidSchedule { index, reason } => {
                write!(f, "invalid schedule at burst #{index}: {reason}")
            }
        }
    }
}

impl Error for GlitchError {}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: ErrorEnvelopeBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelopeBody {
    pub code: String,
    pub message: String,
}

/// Build the JSON failure envelope for an error chain.
///
/// The code comes from the first [`GlitchError`] in the chain; anything else
/// (I/O, YAML syntax, usage) reports `internal`.
pub fn error_envelope(error: &anyhow::Error) -> ErrorEnvelope {
    let code = find_glitch_error(error).map_or("internal", GlitchError::code);
    ErrorEnvelope {
        ok: false,
        error: ErrorEnvelopeBody {
            code: code.to_owned(),
            message: format!("{error:#}"),
        },
    }
}

pub fn find_glitch_error(error: &anyhow::Error) -> Option<&GlitchError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<GlitchError>())
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn envelope_picks_code_through_context_layers() {
        let error = Err::<(), _>(GlitchError::invalid_config("burst_spacing", "must be > 0"))
            .context("failed validating glitch section")
            .expect_err("should fail");

        let envelope = error_envelope(&error);
        assert!(!envelope.ok);
        assert_eq!(envelope.error.code, "invalid_config");
        assert!(envelope.error.message.contains("burst_spacing"));
        assert!(envelope.error.message.contains("failed validating glitch section"));
    }

    #[test]
    fn envelope_defaults_to_internal() {
        let error = anyhow::anyhow!("disk on fire");
        assert_eq!(error_envelope(&error).error.code, "internal");
    }
}
