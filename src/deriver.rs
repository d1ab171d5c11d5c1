//! Per-frame intensity and distortion parameters.
//!
//! A pure function of `(frame, bursts, config)`: nothing is retained between
//! calls, frames may be queried in any order, and re-querying a frame gives
//! bit-identical output.

use serde::Serialize;

use crate::config::GlitchConfig;
use crate::random::tagged;
use crate::schedule::Burst;

const ATTACK_ENVELOPE: f64 = 0.7;
const DECAY_ENVELOPE: f64 = 0.5;
const PLATEAU_ENVELOPE: f64 = 1.0;
const SCALE_PULSE: f64 = 0.003;

/// Gaussian sigma per unit of blur radius on the offset channels.
const OFFSET_CHANNEL_BLUR: f64 = 0.5;
/// Gaussian sigma per unit of blur radius on the stable green channel.
const STABLE_CHANNEL_BLUR: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
}

/// Distortion parameters for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedParams {
    pub red_offset: Vec2,
    /// Stable reference layer. Always zero.
    pub green_offset: Vec2,
    pub blue_offset: Vec2,
    pub jitter: Vec2,
    pub scale: f64,
    pub blur: f64,
}

impl DerivedParams {
    /// Identity parameters for frames outside every burst.
    pub const NEUTRAL: Self = Self {
        red_offset: Vec2::ZERO,
        green_offset: Vec2::ZERO,
        blue_offset: Vec2::ZERO,
        jitter: Vec2::ZERO,
        scale: 1.0,
        blur: 0.0,
    };

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }

    pub fn channel_blur(&self) -> ChannelBlur {
        ChannelBlur {
            red: self.blur * OFFSET_CHANNEL_BLUR,
            green: self.blur * STABLE_CHANNEL_BLUR,
            blue: self.blur * OFFSET_CHANNEL_BLUR,
        }
    }
}

/// Per-channel Gaussian sigma split of the blur radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelBlur {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlitchState {
    pub frame: u32,
    pub intensity: f64,
    pub active_burst: Option<Burst>,
    pub params: DerivedParams,
}

impl GlitchState {
    pub fn idle(frame: u32) -> Self {
        Self {
            frame,
            intensity: 0.0,
            active_burst: None,
            params: DerivedParams::NEUTRAL,
        }
    }

    pub fn is_glitching(&self) -> bool {
        self.intensity > 0.0 && self.active_burst.is_some()
    }
}

/// First burst whose half-open interval contains `frame`.
pub fn find_active_burst(frame: u32, bursts: &[Burst]) -> Option<&Burst> {
    bursts
        .iter()
        .take_while(|burst| burst.start_frame <= frame)
        .find(|burst| burst.contains(frame))
}

/// Attack on the first frame, decay on the last (bursts longer than two
/// frames only), plateau in between.
pub fn envelope(local_frame: u32, duration: u32) -> f64 {
    if local_frame == 0 {
        ATTACK_ENVELOPE
    } else if duration > 2 && local_frame == duration - 1 {
        DECAY_ENVELOPE
    } else {
        PLATEAU_ENVELOPE
    }
}

pub fn derive_state(frame: u32, bursts: &[Burst], config: &GlitchConfig) -> GlitchState {
    let Some(burst) = find_active_burst(frame, bursts) else {
        return GlitchState::idle(frame);
    };

    let intensity = burst.peak_intensity * envelope(frame - burst.start_frame, burst.duration);
    if intensity <= 0.0 {
        return GlitchState::idle(frame);
    }

    let frame_seed = burst.burst_seed.wrapping_add(i64::from(frame));
    GlitchState {
        frame,
        intensity,
        active_burst: Some(*burst),
        params: derive_params(intensity, frame_seed, config),
    }
}

fn derive_params(intensity: f64, frame_seed: i64, config: &GlitchConfig) -> DerivedParams {
    let split = config.split_amount;
    let shake = config.jitter_amount;
    let sample = |tag: &str| tagged(tag, frame_seed);

    // Red drifts right and up, blue left and down.
    let red_offset = Vec2 {
        x: intensity * split * (0.8 + sample("r-ox") * 0.4),
        y: intensity * split * 0.3 * (sample("r-oy") - 0.3),
    };
    let blue_offset = Vec2 {
        x: -intensity * split * (0.8 + sample("b-ox") * 0.4),
        y: intensity * split * 0.3 * (sample("b-oy") - 0.7),
    };
    let jitter = Vec2 {
        x: intensity * shake * (sample("jit-x") * 2.0 - 1.0),
        y: intensity * shake * (sample("jit-y") * 2.0 - 1.0),
    };

    DerivedParams {
        red_offset,
        green_offset: Vec2::ZERO,
        blue_offset,
        jitter,
        scale: 1.0 + intensity * SCALE_PULSE * (sample("scale") * 2.0 - 1.0),
        blur: intensity * config.blur_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Seed;
    use crate::schedule::{schedule_bursts, DurationRange};

    fn doom_config() -> GlitchConfig {
        GlitchConfig {
            split_amount: 10.0,
            blur_amount: 0.5,
            jitter_amount: 0.5,
            burst_spacing: 10.0,
            burst_duration: DurationRange { min: 10, max: 20 },
            seed: Seed::Int(42),
        }
    }

    fn single_burst(duration: u32) -> Vec<Burst> {
        vec![Burst {
            start_frame: 10,
            duration,
            peak_intensity: 0.8,
            burst_seed: 5,
        }]
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn idle_frames_are_neutral() {
        let bursts = single_burst(4);
        let state = derive_state(3, &bursts, &doom_config());
        assert_eq!(state.intensity, 0.0);
        assert!(state.active_burst.is_none());
        assert!(state.params.is_neutral());
        assert_eq!(state.params.scale, 1.0);
        assert!(!state.is_glitching());
    }

    #[test]
    fn frame_just_past_burst_is_idle() {
        let bursts = single_burst(4);
        let state = derive_state(14, &bursts, &doom_config());
        assert_eq!(state.intensity, 0.0);
        assert!(state.params.is_neutral());
    }

    #[test]
    fn envelope_attacks_plateaus_and_decays() {
        let bursts = single_burst(5);
        let config = doom_config();
        let intensities: Vec<f64> = (10..15)
            .map(|frame| derive_state(frame, &bursts, &config).intensity)
            .collect();
        assert_eq!(intensities, vec![0.8 * 0.7, 0.8, 0.8, 0.8, 0.8 * 0.5]);
    }

    #[test]
    fn two_frame_burst_has_no_decay() {
        assert_eq!(envelope(0, 2), 0.7);
        assert_eq!(envelope(1, 2), 1.0);
        assert_eq!(envelope(0, 1), 0.7);
        assert_eq!(envelope(2, 3), 0.5);
    }

    #[test]
    fn green_channel_never_moves() {
        let bursts = single_burst(8);
        let config = doom_config();
        for frame in 10..18 {
            let state = derive_state(frame, &bursts, &config);
            assert!(state.is_glitching());
            assert_eq!(state.params.green_offset, Vec2::ZERO);
            assert!(state.params.red_offset.x > 0.0);
            assert!(state.params.blue_offset.x < 0.0);
        }
    }

    #[test]
    fn mid_burst_params_are_locked() {
        let config = doom_config();
        let bursts = schedule_bursts(150, 10.0, config.burst_duration, 42).expect("schedule");
        let state = derive_state(7, &bursts, &config);

        assert_eq!(state.active_burst, Some(bursts[0]));
        assert_eq!(state.intensity, 0.8801831717602908);
        let params = state.params;
        assert_close(params.red_offset.x, 10.039522292877843);
        assert_close(params.red_offset.y, 0.2008059693493231);
        assert_close(params.blue_offset.x, -10.101832073072906);
        assert_close(params.blue_offset.y, 0.435793603027932);
        assert_close(params.jitter.x, 0.01949336778639674);
        assert_close(params.jitter.y, -0.3500003321180308);
        assert_close(params.scale, 1.0008587793775718);
        assert_close(params.blur, 0.4400915858801454);
    }

    #[test]
    fn zero_magnitudes_keep_offsets_flat() {
        let config = GlitchConfig {
            split_amount: 0.0,
            blur_amount: 0.0,
            jitter_amount: 0.0,
            ..doom_config()
        };
        let bursts = single_burst(4);
        let state = derive_state(11, &bursts, &config);
        assert!(state.intensity > 0.0);
        assert_eq!(state.params.red_offset.x, 0.0);
        assert_eq!(state.params.jitter, Vec2::ZERO);
        assert_eq!(state.params.blur, 0.0);
        assert!((state.params.scale - 1.0).abs() <= SCALE_PULSE);
    }

    #[test]
    fn channel_blur_splits_radius() {
        let params = DerivedParams {
            blur: 2.0,
            ..DerivedParams::NEUTRAL
        };
        let blur = params.channel_blur();
        assert_eq!(blur.red, 1.0);
        assert_eq!(blur.blue, 1.0);
        assert_close(blur.green, 0.6);
    }
}
