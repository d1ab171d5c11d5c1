//! Greedy forward burst scheduling.
//!
//! The schedule for a `(total_frames, spacing, duration_range, seed)` tuple is
//! computed once and never changes; every per-frame query reads it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::GlitchError;
use crate::random::tagged;

/// Burst seeds advance by this stride per ordinal.
pub const BURST_SEED_STRIDE: i64 = 1000;
pub const PEAK_INTENSITY_MIN: f64 = 0.6;
pub const PEAK_INTENSITY_MAX: f64 = 1.0;
const PEAK_INTENSITY_SPAN: f64 = 0.4;

/// Largest accepted spacing. Keeps all cursor math comfortably inside `i64`.
const MAX_SPACING: f64 = u32::MAX as f64;

/// Inclusive `[min, max]` burst length in frames. Serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct DurationRange {
    pub min: u32,
    pub max: u32,
}

impl From<[u32; 2]> for DurationRange {
    fn from([min, max]: [u32; 2]) -> Self {
        Self { min, max }
    }
}

impl From<DurationRange> for [u32; 2] {
    fn from(range: DurationRange) -> Self {
        [range.min, range.max]
    }
}

/// One scheduled glitch interval, active on `[start_frame, start_frame + duration)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Burst {
    pub start_frame: u32,
    pub duration: u32,
    pub peak_intensity: f64,
    pub burst_seed: i64,
}

impl Burst {
    /// First frame after the burst. May lie past the timeline horizon.
    pub fn end_frame(&self) -> u64 {
        u64::from(self.start_frame) + u64::from(self.duration)
    }

    pub fn contains(&self, frame: u32) -> bool {
        frame >= self.start_frame && u64::from(frame) < self.end_frame()
    }
}

pub(crate) fn validate_schedule_inputs(
    spacing: f64,
    duration_range: DurationRange,
) -> Result<(), GlitchError> {
    if !spacing.is_finite() || spacing <= 0.0 {
        return Err(GlitchError::invalid_config(
            "burst_spacing",
            format!("must be finite and > 0, got {spacing}"),
        ));
    }
    if spacing > MAX_SPACING {
        return Err(GlitchError::invalid_config(
            "burst_spacing",
            format!("must be <= {MAX_SPACING}, got {spacing}"),
        ));
    }
    if duration_range.min == 0 {
        return Err(GlitchError::invalid_config(
            "burst_duration",
            "min must be >= 1",
        ));
    }
    if duration_range.min > duration_range.max {
        return Err(GlitchError::invalid_config(
            "burst_duration",
            format!(
                "min must be <= max, got [{}, {}]",
                duration_range.min, duration_range.max
            ),
        ));
    }
    Ok(())
}

/// Walk the timeline forward and emit non-overlapping bursts.
///
/// `total_frames == 0` yields an empty schedule. Bursts that start before the
/// horizon are emitted in full even when they run past it.
pub fn schedule_bursts(
    total_frames: u32,
    spacing: f64,
    duration_range: DurationRange,
    seed: i64,
) -> Result<Vec<Burst>, GlitchError> {
    validate_schedule_inputs(spacing, duration_range)?;

    let total = i64::from(total_frames);
    let half_spacing = (spacing / 2.0).floor() as i64;
    let gap = (spacing * 0.3).floor() as i64;
    let duration_span = f64::from(duration_range.max - duration_range.min);

    let mut bursts = Vec::new();
    let mut frame: i64 = 0;
    let mut previous_end: i64 = 0;
    let mut ordinal: u64 = 0;

    while frame < total {
        let burst_seed = burst_seed_for(seed, ordinal);

        let jitter = ((tagged("burst-jitter", burst_seed) - 0.5) * spacing * 0.6).floor() as i64;
        let candidate = (frame + half_spacing + jitter).max(0);
        let start = if candidate < previous_end {
            warn!(
                ordinal,
                candidate,
                previous_end,
                "burst start clamped to previous burst end"
            );
            previous_end
        } else {
            candidate
        };

        let duration = (f64::from(duration_range.min)
            + tagged("burst-dur", burst_seed) * duration_span)
            .floor() as i64;
        let peak_intensity = PEAK_INTENSITY_MIN
            + tagged("burst-peak", burst_seed) * PEAK_INTENSITY_SPAN;

        if start < total {
            debug!(
                ordinal,
                start,
                duration,
                peak_intensity,
                burst_seed,
                "scheduled burst"
            );
            bursts.push(Burst {
                start_frame: start as u32,
                duration: duration as u32,
                peak_intensity,
                burst_seed,
            });
        }

        let next_frame = start + duration + gap;
        if next_frame <= frame {
            return Err(GlitchError::NonAdvancingSchedule {
                ordinal,
                frame,
                next_frame,
            });
        }

        frame = next_frame;
        previous_end = start + duration;
        ordinal += 1;
    }

    info!(
        total_frames,
        spacing,
        bursts = bursts.len(),
        "burst schedule computed"
    );
    Ok(bursts)
}

fn burst_seed_for(seed: i64, ordinal: u64) -> i64 {
    seed.wrapping_add((ordinal as i64).wrapping_mul(BURST_SEED_STRIDE))
}

/// Check the schedule invariants on a sequence that did not come straight from
/// [`schedule_bursts`] (a persisted cache file, a caller-built list).
pub fn validate_bursts(total_frames: u32, bursts: &[Burst]) -> Result<(), GlitchError> {
    let mut seen_seeds = HashSet::with_capacity(bursts.len());
    let mut previous: Option<&Burst> = None;

    for (index, burst) in bursts.iter().enumerate() {
        if burst.duration == 0 {
            return Err(GlitchError::invalid_schedule(index, "duration must be >= 1"));
        }
        if burst.start_frame >= total_frames {
            return Err(GlitchError::invalid_schedule(
                index,
                format!(
                    "start frame {} is at or beyond the {total_frames}-frame horizon",
                    burst.start_frame
                ),
            ));
        }
        if !(PEAK_INTENSITY_MIN..=PEAK_INTENSITY_MAX).contains(&burst.peak_intensity) {
            return Err(GlitchError::invalid_schedule(
                index,
                format!(
                    "peak intensity {} outside [{PEAK_INTENSITY_MIN}, {PEAK_INTENSITY_MAX}]",
                    burst.peak_intensity
                ),
            ));
        }
        if !seen_seeds.insert(burst.burst_seed) {
            return Err(GlitchError::invalid_schedule(
                index,
                format!("duplicate burst seed {}", burst.burst_seed),
            ));
        }
        if let Some(previous) = previous {
            if previous.end_frame() > u64::from(burst.start_frame) {
                return Err(GlitchError::invalid_schedule(
                    index,
                    format!(
                        "starts at frame {} before the previous burst ends at {}",
                        burst.start_frame,
                        previous.end_frame()
                    ),
                ));
            }
        }
        previous = Some(burst);
    }

    Ok(())
}
