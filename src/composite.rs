//! Renderer-facing description of one frame's channel-split composite.
//!
//! The crate stops here: a renderer draws three masked copies of the source
//! with these offsets and blurs, screens them together and applies the
//! transform to the result.

use serde::Serialize;

use crate::deriver::{GlitchState, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// RGBA multiplier that isolates this channel and keeps alpha.
    pub fn mask(self) -> [f32; 4] {
        match self {
            Self::Red => [1.0, 0.0, 0.0, 1.0],
            Self::Green => [0.0, 1.0, 0.0, 1.0],
            Self::Blue => [0.0, 0.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    Screen,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelLayer {
    pub channel: Channel,
    pub offset: Vec2,
    pub blur_sigma: f64,
    pub blend: BlendMode,
}

/// Applied to the whole composite after the layers are blended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub translate: Vec2,
    pub scale: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompositePlan {
    /// Draw the source untouched.
    Passthrough,
    Layered {
        transform: Transform,
        layers: [ChannelLayer; 3],
    },
}

impl CompositePlan {
    pub fn for_state(state: &GlitchState) -> Self {
        if !state.is_glitching() {
            return Self::Passthrough;
        }

        let params = &state.params;
        let blur = params.channel_blur();
        let layer = |channel, offset, blur_sigma| ChannelLayer {
            channel,
            offset,
            blur_sigma,
            blend: BlendMode::Screen,
        };

        Self::Layered {
            transform: Transform {
                translate: params.jitter,
                scale: params.scale,
            },
            layers: [
                layer(Channel::Red, params.red_offset, blur.red),
                layer(Channel::Green, params.green_offset, blur.green),
                layer(Channel::Blue, params.blue_offset, blur.blue),
            ],
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self, Self::Passthrough)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GlitchConfig;
    use crate::deriver::derive_state;
    use crate::schedule::Burst;

    fn bursts() -> Vec<Burst> {
        vec![Burst {
            start_frame: 2,
            duration: 3,
            peak_intensity: 0.9,
            burst_seed: 77,
        }]
    }

    #[test]
    fn idle_state_passes_through() {
        let state = derive_state(0, &bursts(), &GlitchConfig::default());
        assert!(CompositePlan::for_state(&state).is_passthrough());
    }

    #[test]
    fn glitching_state_layers_red_green_blue() {
        let state = derive_state(3, &bursts(), &GlitchConfig::default());
        let CompositePlan::Layered { transform, layers } = CompositePlan::for_state(&state) else {
            panic!("expected layered plan");
        };

        assert_eq!(transform.translate, state.params.jitter);
        assert_eq!(transform.scale, state.params.scale);
        assert_eq!(
            layers.map(|layer| layer.channel),
            [Channel::Red, Channel::Green, Channel::Blue]
        );
        assert!(layers.iter().all(|layer| layer.blend == BlendMode::Screen));
        assert_eq!(layers[1].offset, Vec2::ZERO);
        assert_eq!(layers[0].blur_sigma, state.params.blur * 0.5);
        assert_eq!(layers[0].offset, state.params.red_offset);
    }

    #[test]
    fn masks_keep_alpha() {
        for channel in [Channel::Red, Channel::Green, Channel::Blue] {
            let mask = channel.mask();
            assert_eq!(mask[3], 1.0);
            assert_eq!(mask.iter().take(3).sum::<f32>(), 1.0);
        }
    }

    #[test]
    fn plan_serializes_with_kind_tag() {
        let json = serde_json::to_value(CompositePlan::Passthrough).expect("serialize");
        assert_eq!(json, serde_json::json!({ "kind": "passthrough" }));
    }
}
