use std::sync::Arc;

use serde::Serialize;

use crate::cache::{ScheduleCache, ScheduleKey};
use crate::composite::CompositePlan;
use crate::config::GlitchConfig;
use crate::deriver::{derive_state, GlitchState};
use crate::error::GlitchError;
use crate::schedule::{validate_bursts, Burst};

/// A glitch config bound to a host timeline length.
///
/// The schedule is computed once at construction; frame queries only read it.
#[derive(Debug, Clone)]
pub struct GlitchTimeline {
    total_frames: u32,
    config: GlitchConfig,
    bursts: Arc<[Burst]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineSummary {
    pub total_frames: u32,
    pub bursts: usize,
    /// Frames inside `[0, total_frames)` with non-zero intensity.
    pub glitch_frames: u32,
    pub coverage: f64,
    pub peak_intensity: f64,
}

impl GlitchTimeline {
    pub fn new(total_frames: u32, config: GlitchConfig) -> Result<Self, GlitchError> {
        config.validate()?;
        let bursts: Arc<[Burst]> = ScheduleKey::from_config(total_frames, &config)
            .compute()?
            .into();
        Ok(Self {
            total_frames,
            config,
            bursts,
        })
    }

    /// Like [`GlitchTimeline::new`], sharing the schedule through `cache`.
    pub fn with_cache(
        total_frames: u32,
        config: GlitchConfig,
        cache: &ScheduleCache,
    ) -> Result<Self, GlitchError> {
        config.validate()?;
        let bursts = cache.get_or_compute(ScheduleKey::from_config(total_frames, &config))?;
        Ok(Self {
            total_frames,
            config,
            bursts,
        })
    }

    /// Rebuild from a schedule computed elsewhere (e.g. a persisted cache file).
    pub fn from_bursts(
        total_frames: u32,
        config: GlitchConfig,
        bursts: impl Into<Arc<[Burst]>>,
    ) -> Result<Self, GlitchError> {
        config.validate()?;
        let bursts = bursts.into();
        validate_bursts(total_frames, &bursts)?;
        Ok(Self {
            total_frames,
            config,
            bursts,
        })
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    pub fn config(&self) -> &GlitchConfig {
        &self.config
    }

    pub fn bursts(&self) -> &[Burst] {
        &self.bursts
    }

    pub fn state_at(&self, frame: u32) -> GlitchState {
        derive_state(frame, &self.bursts, &self.config)
    }

    pub fn plan_at(&self, frame: u32) -> CompositePlan {
        CompositePlan::for_state(&self.state_at(frame))
    }

    /// Every frame of the timeline, in order.
    pub fn states(&self) -> impl Iterator<Item = GlitchState> + '_ {
        (0..self.total_frames).map(move |frame| self.state_at(frame))
    }

    pub fn summary(&self) -> TimelineSummary {
        let (glitch_frames, peak_intensity) =
            self.states()
                .fold((0_u32, 0.0_f64), |(count, peak), state| {
                    if state.is_glitching() {
                        (count + 1, peak.max(state.intensity))
                    } else {
                        (count, peak)
                    }
                });
        let coverage = if self.total_frames == 0 {
            0.0
        } else {
            f64::from(glitch_frames) / f64::from(self.total_frames)
        };

        TimelineSummary {
            total_frames: self.total_frames,
            bursts: self.bursts.len(),
            glitch_frames,
            coverage,
            peak_intensity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Seed;
    use crate::schedule::DurationRange;

    fn doom() -> GlitchConfig {
        GlitchConfig {
            split_amount: 10.0,
            blur_amount: 0.5,
            jitter_amount: 0.5,
            burst_spacing: 10.0,
            burst_duration: DurationRange { min: 10, max: 20 },
            seed: Seed::Int(42),
        }
    }

    #[test]
    fn empty_timeline_is_always_idle() {
        let timeline = GlitchTimeline::new(0, doom()).expect("timeline");
        assert!(timeline.bursts().is_empty());
        assert_eq!(timeline.states().count(), 0);
        assert_eq!(timeline.state_at(5).intensity, 0.0);
        assert_eq!(timeline.summary().coverage, 0.0);
    }

    #[test]
    fn summary_counts_glitching_frames_inside_horizon() {
        let timeline = GlitchTimeline::new(150, doom()).expect("timeline");
        let summary = timeline.summary();

        // 18 + 17 + 15 + 17 + 19 + 10 + (150 - 142)
        assert_eq!(summary.glitch_frames, 104);
        assert_eq!(summary.bursts, 7);
        assert!(summary.peak_intensity <= 1.0);
        assert!(summary.peak_intensity > 0.9);
    }

    #[test]
    fn cached_and_direct_timelines_agree() {
        let cache = ScheduleCache::new();
        let cached = GlitchTimeline::with_cache(150, doom(), &cache).expect("timeline");
        let direct = GlitchTimeline::new(150, doom()).expect("timeline");
        assert_eq!(cached.bursts(), direct.bursts());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn from_bursts_rejects_broken_schedules() {
        let bursts = vec![Burst {
            start_frame: 200,
            duration: 2,
            peak_intensity: 0.7,
            burst_seed: 0,
        }];
        assert!(matches!(
            GlitchTimeline::from_bursts(150, doom(), bursts),
            Err(GlitchError::InvalidSchedule { .. })
        ));
    }

    #[test]
    fn invalid_config_fails_before_scheduling() {
        let config = GlitchConfig {
            blur_amount: f64::INFINITY,
            ..doom()
        };
        assert!(matches!(
            GlitchTimeline::new(150, config),
            Err(GlitchError::InvalidConfig {
                field: "blur_amount",
                ..
            })
        ));
    }

    #[test]
    fn plan_follows_state() {
        let timeline = GlitchTimeline::new(150, doom()).expect("timeline");
        assert!(timeline.plan_at(0).is_passthrough());
        assert!(!timeline.plan_at(4).is_passthrough());
        assert!(timeline.plan_at(22).is_passthrough());
    }

    #[test]
    fn frames_can_be_queried_in_any_order() {
        let timeline = GlitchTimeline::new(150, doom()).expect("timeline");
        let forward: Vec<GlitchState> = timeline.states().collect();
        for frame in (0..150).rev() {
            assert_eq!(timeline.state_at(frame), forward[frame as usize]);
        }
    }
}
