use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use flock_core::{FlockConfig, FlockStats, FlockStd};
use rand::rngs::StdRng;
use rand::SeedableRng;

mod text_surface;
pub use text_surface::{grid_cells, TextSurface, MAX_CELLS};

/// Moves the cursor home so every frame overwrites the previous one.
const CURSOR_HOME: &str = "\x1b[H";
const CLEAR_SCREEN: &str = "\x1b[2J";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Boids flocking in the terminal", long_about = None)]
pub struct Args {
    /// Width of the simulated world
    #[arg(long, default_value_t = 800.0)]
    pub width: f32,

    /// Height of the simulated world
    #[arg(long, default_value_t = 600.0)]
    pub height: f32,

    /// Stop after this many frames (runs until interrupted when omitted)
    #[arg(short, long)]
    pub frames: Option<u64>,

    /// Target frame rate, 0 runs unthrottled
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Seed for the initial flock
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Terminal columns used for drawing
    #[arg(long, default_value_t = 80)]
    pub columns: usize,

    /// Terminal rows used for drawing
    #[arg(long, default_value_t = 24)]
    pub rows: usize,

    /// Simulate without drawing
    #[arg(long)]
    pub headless: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        if !(self.width.is_finite() && self.width > 0.0) {
            bail!("width must be a positive number, got {}", self.width);
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            bail!("height must be a positive number, got {}", self.height);
        }
        if !self.headless && (self.columns == 0 || self.rows == 0) {
            bail!(
                "terminal grid must be at least 1x1, got {}x{}",
                self.columns,
                self.rows
            );
        }
        if grid_cells(self.columns, self.rows).is_none() {
            bail!(
                "terminal grid {}x{} exceeds {} cells",
                self.columns,
                self.rows,
                MAX_CELLS
            );
        }
        Ok(())
    }

    fn frame_period(&self) -> Option<Duration> {
        (self.fps > 0).then(|| Duration::from_nanos(1_000_000_000 / u64::from(self.fps)))
    }

    /// How many frames pass between two stats log lines.
    fn stats_interval(&self) -> u64 {
        u64::from(self.fps.max(60))
    }
}

/// Outcome of a finished run
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub frames: u64,
    pub stats: FlockStats,
}

pub fn build_flock(args: &Args) -> FlockStd {
    match args.seed {
        Some(seed) => {
            let config = FlockConfig::default();
            FlockStd::from_rng(
                args.width,
                args.height,
                config.boid_count,
                config,
                &mut StdRng::seed_from_u64(seed),
            )
        }
        None => FlockStd::new(args.width, args.height),
    }
}

/// Drives the flock frame by frame, drawing into `out` unless headless.
pub fn run<W: Write>(args: &Args, out: &mut W) -> Result<RunSummary> {
    args.validate()?;

    let mut flock = build_flock(args);
    let mut surface = if args.headless {
        None
    } else {
        Some(TextSurface::new(args.columns, args.rows)?)
    };
    let period = args.frame_period();
    let interval = args.stats_interval();

    log::info!(
        "Starting flock of {} boids in a {}x{} world",
        flock.boids.len(),
        args.width,
        args.height
    );

    if !args.headless {
        write!(out, "{}", CLEAR_SCREEN).context("Failed to clear terminal")?;
    }

    let mut frames = 0;
    while args.frames.map_or(true, |limit| frames < limit) {
        let started = Instant::now();

        match surface.as_mut() {
            Some(surface) => {
                flock.frame(surface);
                write!(out, "{}{}", CURSOR_HOME, surface.render())
                    .context("Failed to draw frame")?;
                out.flush().context("Failed to flush terminal")?;
            }
            None => flock.step(),
        }
        frames += 1;

        if frames % interval == 0 {
            let stats = flock.stats();
            log::debug!(
                "frame {}: mean speed {:.3}, top speed {:.3}",
                frames,
                stats.mean_speed,
                stats.top_speed
            );
            if !stats.all_finite {
                log::warn!("frame {}: flock state is no longer finite", frames);
            }
        }

        if let Some(period) = period {
            if let Some(remaining) = period.checked_sub(started.elapsed()) {
                thread::sleep(remaining);
            }
        }
    }

    let stats = flock.stats();
    log::info!(
        "Finished after {} frames, mean speed {:.3}",
        frames,
        stats.mean_speed
    );

    Ok(RunSummary { frames, stats })
}
