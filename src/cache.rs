//! Compute-once schedule sharing, in process and across restarts.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::GlitchConfig;
use crate::error::GlitchError;
use crate::schedule::{schedule_bursts, validate_bursts, Burst, DurationRange};

/// Everything a schedule depends on. Spacing is keyed by its bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleKey {
    pub total_frames: u32,
    spacing_bits: u64,
    pub duration_range: DurationRange,
    pub seed: i64,
}

impl ScheduleKey {
    pub fn new(total_frames: u32, spacing: f64, duration_range: DurationRange, seed: i64) -> Self {
        Self {
            total_frames,
            spacing_bits: spacing.to_bits(),
            duration_range,
            seed,
        }
    }

    pub fn from_config(total_frames: u32, config: &GlitchConfig) -> Self {
        Self::new(
            total_frames,
            config.burst_spacing,
            config.burst_duration,
            config.seed.root(),
        )
    }

    pub fn spacing(&self) -> f64 {
        f64::from_bits(self.spacing_bits)
    }

    pub fn compute(&self) -> Result<Vec<Burst>, GlitchError> {
        schedule_bursts(
            self.total_frames,
            self.spacing(),
            self.duration_range,
            self.seed,
        )
    }

    /// SHA-256 hex digest of the canonical key, used as the persisted file stem.
    pub fn fingerprint(&self) -> String {
        let canonical = format!(
            "glitchline-schedule-v1|frames={}|spacing={:016x}|duration={}..={}|seed={}",
            self.total_frames,
            self.spacing_bits,
            self.duration_range.min,
            self.duration_range.max,
            self.seed
        );
        let digest = Sha256::digest(canonical.as_bytes());
        digest.iter().map(|byte| format!("{byte:02x}")).collect()
    }
}

/// Shared memo of computed schedules.
///
/// Schedules are computed outside the lock; concurrent misses on the same key
/// compute identical sequences and the first insert wins.
#[derive(Debug, Default)]
pub struct ScheduleCache {
    entries: Mutex<HashMap<ScheduleKey, Arc<[Burst]>>>,
}

impl ScheduleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ScheduleKey) -> Option<Arc<[Burst]>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn get_or_compute(&self, key: ScheduleKey) -> Result<Arc<[Burst]>, GlitchError> {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }

        let computed: Arc<[Burst]> = key.compute()?.into();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(entries.entry(key).or_insert(computed)))
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn schedule_path(dir: &Path, key: &ScheduleKey) -> PathBuf {
    dir.join(format!("{}.json", key.fingerprint()))
}

/// Persist a schedule as a bare JSON array of burst records.
pub fn save_schedule(dir: &Path, key: &ScheduleKey, bursts: &[Burst]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create schedule cache dir {}", dir.display()))?;
    let path = schedule_path(dir, key);
    let json = serde_json::to_vec_pretty(bursts).context("failed to serialize schedule")?;
    fs::write(&path, json)
        .with_context(|| format!("failed to write schedule {}", path.display()))?;
    debug!(path = %path.display(), bursts = bursts.len(), "schedule persisted");
    Ok(path)
}

/// Load a persisted schedule. `Ok(None)` when nothing was saved for `key`.
pub fn load_schedule(dir: &Path, key: &ScheduleKey) -> Result<Option<Vec<Burst>>> {
    let path = schedule_path(dir, key);
    if !path.is_file() {
        return Ok(None);
    }

    let contents =
        fs::read(&path).with_context(|| format!("failed to read schedule {}", path.display()))?;
    let bursts: Vec<Burst> = serde_json::from_slice(&contents)
        .with_context(|| format!("failed to parse schedule {}", path.display()))?;
    validate_bursts(key.total_frames, &bursts)
        .with_context(|| format!("persisted schedule {} is corrupt", path.display()))?;
    ensure_matches_key(key, &bursts)
        .with_context(|| format!("persisted schedule {} is stale", path.display()))?;
    debug!(path = %path.display(), bursts = bursts.len(), "schedule loaded");
    Ok(Some(bursts))
}

/// A persisted schedule must be exactly what `key` computes; hand edits and
/// files written by an older scheduler are rejected.
fn ensure_matches_key(key: &ScheduleKey, bursts: &[Burst]) -> Result<(), GlitchError> {
    let expected = key.compute()?;
    if let Some(index) = expected
        .iter()
        .zip(bursts)
        .position(|(expected, loaded)| expected != loaded)
    {
        return Err(GlitchError::invalid_schedule(
            index,
            "burst differs from the computed schedule",
        ));
    }
    if expected.len() != bursts.len() {
        return Err(GlitchError::invalid_schedule(
            expected.len().min(bursts.len()),
            format!(
                "expected {} bursts, found {}",
                expected.len(),
                bursts.len()
            ),
        ));
    }
    Ok(())
}

/// Disk-backed lookup: load when present, otherwise compute and persist.
pub fn load_or_compute(dir: &Path, key: &ScheduleKey) -> Result<Vec<Burst>> {
    if let Some(bursts) = load_schedule(dir, key)? {
        return Ok(bursts);
    }
    let bursts = key.compute()?;
    save_schedule(dir, key, &bursts)?;
    Ok(bursts)
}
