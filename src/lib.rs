//! Glitchline: deterministic RGB glitch bursts for offline motion graphics.
//!
//! A seed and a handful of magnitudes produce a fixed burst schedule over a
//! frame timeline. Any frame can then be queried for its glitch intensity,
//! channel offsets, jitter, blur and scale, independently of every other frame.

pub mod cache;
pub mod composite;
pub mod config;
pub mod deriver;
pub mod error;
pub mod logging;
pub mod random;
pub mod schedule;
pub mod timeline;

pub use config::{GlitchConfig, Seed};
pub use deriver::{derive_state, DerivedParams, GlitchState};
pub use error::GlitchError;
pub use schedule::{schedule_bursts, Burst, DurationRange};
pub use timeline::GlitchTimeline;
