use std::env;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::json;
use tracing::info;

use glitchline::cache::{load_or_compute, ScheduleKey};
use glitchline::composite::CompositePlan;
use glitchline::config::{load_document, resolve_seed_override, GlitchConfig, Seed, SEED_ENV_VAR};
use glitchline::error::error_envelope;
use glitchline::{logging, GlitchTimeline};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GLITCHLINE_GIT_HASH"),
    ")"
);

#[derive(Debug, Parser)]
#[command(name = "glitchline", version = VERSION)]
#[command(about = "Deterministic RGB glitch burst schedules and per-frame parameters")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). GLITCHLINE_LOG overrides.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct RunArgs {
    document: PathBuf,
    /// Override the document's timeline length.
    #[arg(long)]
    frames: Option<u32>,
    /// Override the document seed (integer or text). Wins over GLITCHLINE_SEED.
    #[arg(long)]
    seed: Option<Seed>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate a glitch document and summarize its schedule.
    Check {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Print the burst schedule.
    Schedule {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long)]
        json: bool,
        /// Persist and reuse schedules in this directory.
        #[arg(long = "cache-dir")]
        cache_dir: Option<PathBuf>,
    },
    /// Print the glitch state and composite plan for one frame.
    Frame {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long)]
        at: u32,
        #[arg(long)]
        json: bool,
    },
    /// Emit one JSON line per frame.
    Trace {
        #[command(flatten)]
        run: RunArgs,
    },
}

impl Commands {
    fn wants_json(&self) -> bool {
        match self {
            Self::Schedule { json, .. } | Self::Frame { json, .. } => *json,
            Self::Trace { .. } => true,
            Self::Check { .. } => false,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let json = cli.command.wants_json();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if json {
                match serde_json::to_string(&error_envelope(&error)) {
                    Ok(envelope) => println!("{envelope}"),
                    Err(_) => eprintln!("error: {error:#}"),
                }
            } else {
                eprintln!("error: {error:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Check { run } => run_check(&run),
        Commands::Schedule {
            run,
            json,
            cache_dir,
        } => run_schedule(&run, json, cache_dir.as_deref()),
        Commands::Frame { run, at, json } => run_frame(&run, at, json),
        Commands::Trace { run } => run_trace(&run),
    }
}

fn resolve_run(run: &RunArgs) -> Result<(u32, GlitchConfig)> {
    let mut document = load_document(&run.document)?;
    if let Some(seed) = resolve_seed_override(run.seed.clone(), env::var(SEED_ENV_VAR).ok()) {
        document.glitch.seed = seed;
    }
    let total_frames = run
        .frames
        .unwrap_or_else(|| document.timeline.total_frames());
    Ok((total_frames, document.glitch))
}

fn build_timeline(run: &RunArgs) -> Result<GlitchTimeline> {
    let (total_frames, config) = resolve_run(run)?;
    GlitchTimeline::new(total_frames, config)
        .with_context(|| format!("failed to schedule {}", run.document.display()))
}

fn run_check(run: &RunArgs) -> Result<()> {
    let timeline = build_timeline(run)?;
    let summary = timeline.summary();

    println!(
        "OK: {} ({} frames, seed {}, {} bursts, {} glitch frames, {:.1}% coverage)",
        run.document.display(),
        summary.total_frames,
        timeline.config().seed,
        summary.bursts,
        summary.glitch_frames,
        summary.coverage * 100.0
    );
    Ok(())
}

fn run_schedule(run: &RunArgs, json: bool, cache_dir: Option<&Path>) -> Result<()> {
    let timeline = match cache_dir {
        Some(dir) => {
            let (total_frames, config) = resolve_run(run)?;
            config
                .validate()
                .with_context(|| format!("invalid glitch config in {}", run.document.display()))?;
            let key = ScheduleKey::from_config(total_frames, &config);
            let bursts = load_or_compute(dir, &key)?;
            info!(fingerprint = %key.fingerprint(), "schedule resolved through cache dir");
            GlitchTimeline::from_bursts(total_frames, config, bursts)?
        }
        None => build_timeline(run)?,
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if json {
        serde_json::to_writer_pretty(&mut out, timeline.bursts())
            .context("failed to serialize schedule")?;
        writeln!(out)?;
    } else {
        for (index, burst) in timeline.bursts().iter().enumerate() {
            writeln!(
                out,
                "#{index:<3} start={:<6} duration={:<4} end={:<6} peak={:.4} seed={}",
                burst.start_frame,
                burst.duration,
                burst.end_frame(),
                burst.peak_intensity,
                burst.burst_seed
            )?;
        }
        writeln!(
            out,
            "{} bursts over {} frames",
            timeline.bursts().len(),
            timeline.total_frames()
        )?;
    }
    out.flush()?;
    Ok(())
}

fn run_frame(run: &RunArgs, frame: u32, json: bool) -> Result<()> {
    let timeline = build_timeline(run)?;
    let state = timeline.state_at(frame);
    let plan = CompositePlan::for_state(&state);

    if json {
        let value = json!({ "state": state, "plan": plan });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("failed to serialize frame state")?
        );
        return Ok(());
    }

    let Some(burst) = state.active_burst else {
        println!("frame {frame}: idle");
        return Ok(());
    };
    let params = state.params;
    println!(
        "frame {frame}: intensity {:.4} (burst at {} for {} frames)",
        state.intensity, burst.start_frame, burst.duration
    );
    println!(
        "  red   ({:+.3}, {:+.3})",
        params.red_offset.x, params.red_offset.y
    );
    println!(
        "  blue  ({:+.3}, {:+.3})",
        params.blue_offset.x, params.blue_offset.y
    );
    println!("  jitter ({:+.3}, {:+.3})", params.jitter.x, params.jitter.y);
    println!("  scale {:.5}  blur {:.3}", params.scale, params.blur);
    Ok(())
}

fn run_trace(run: &RunArgs) -> Result<()> {
    let timeline = build_timeline(run)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for state in timeline.states() {
        serde_json::to_writer(&mut out, &state).context("failed to serialize frame state")?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
