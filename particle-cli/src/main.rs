//! Headless driver for the particle shaper.
//!
//! Parses the command line, sets up logging and delegates the frame loop to
//! [`Runner`] from the `runner` module.

mod runner;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use particle_core::{
    Config, Gesture, JsonFileSource, KeyedSource, RenderConfig, Rgb, ShapeKind, ShapeSource,
};
use serde::Serialize;

use runner::{Runner, Script};

/// Runs the particle simulation without a display and reports frame timing.
#[derive(Parser, Debug)]
#[command(name = "particles", version)]
struct Args {
    /// Shape family: heart, flower, saturn, fireworks, buddha or custom
    #[arg(long, default_value = "saturn")]
    shape: ShapeKind,

    /// Number of particles
    #[arg(short = 'n', long, default_value_t = 5000)]
    count: usize,

    /// Point size handed to the renderer
    #[arg(long, default_value_t = 0.12)]
    size: f32,

    /// Particle colour as #rrggbb
    #[arg(long, default_value = "#a855f7")]
    color: Rgb,

    /// Seed for sampling and scattering; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Number of frames to simulate
    #[arg(short, long, default_value_t = 600)]
    frames: usize,

    /// Frame time in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Scripted hand gesture
    #[arg(long, value_enum, default_value_t = HandArg::None)]
    gesture: HandArg,

    /// Openness of the scripted hand, 0 to 1
    #[arg(long, default_value_t = 1.0)]
    openness: f32,

    /// Rate of the scripted tracker thread, in snapshots per second
    #[arg(long, default_value_t = 30.0)]
    tracker_hz: f32,

    /// Run frames back to back instead of pacing them to `dt`
    #[arg(long)]
    bench: bool,

    /// Generator payload ({"points": [...]}) to use as the custom shape
    #[arg(long)]
    custom: Option<PathBuf>,

    /// Environment variable holding the generator access key; when set, a
    /// `--custom` request without the key is refused
    #[arg(long)]
    key_var: Option<String>,

    /// JSON file overriding simulation tuning constants
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Write the final particle positions here as a generator payload
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Logging verbosity when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: log::LevelFilter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum HandArg {
    None,
    Neutral,
    Open,
    Closed,
}

impl HandArg {
    fn gesture(self) -> Option<Gesture> {
        match self {
            HandArg::None => None,
            HandArg::Neutral => Some(Gesture::Neutral),
            HandArg::Open => Some(Gesture::Open),
            HandArg::Closed => Some(Gesture::Closed),
        }
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    points: &'a [f32],
}

fn load_tuning(path: Option<&PathBuf>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let tuning: Config = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing tuning file {}", path.display()))?;
    tuning
        .validate()
        .with_context(|| format!("invalid tuning in {}", path.display()))?;
    Ok(tuning)
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .parse_default_env()
        .init();

    let config = RenderConfig {
        color: args.color,
        count: args.count,
        size: args.size,
        shape: args.shape,
    };
    config.validate().context("invalid configuration")?;
    if config.count > RenderConfig::MAX_INTERACTIVE_COUNT {
        log::warn!(
            "{} particles is above the interactive range of {}",
            config.count,
            RenderConfig::MAX_INTERACTIVE_COUNT
        );
    }

    let tuning = load_tuning(args.tuning.as_ref())?;
    let script = Script {
        gesture: args.gesture.gesture(),
        openness: args.openness,
    };
    let mut runner = Runner::new(config, tuning, args.seed, script);

    if let Some(path) = &args.custom {
        // A failed request leaves the running configuration untouched.
        let file = JsonFileSource::new(path);
        let source: Box<dyn ShapeSource> = match &args.key_var {
            Some(var) => Box::new(KeyedSource::from_env(var.as_str(), file)),
            None => Box::new(file),
        };
        match source.generate(&path.display().to_string()) {
            Ok(cloud) => runner.orchestrator_mut().adopt_cloud(cloud),
            Err(err) => log::error!("custom shape from {} rejected: {err}", path.display()),
        }
    }

    let report = if args.bench {
        runner.run_unpaced(args.frames, args.dt)
    } else {
        runner.run_paced(args.frames, args.dt, args.tracker_hz)?
    };
    report.log();

    if let Some(path) = &args.dump {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let payload = Payload {
            points: runner.orchestrator().positions(),
        };
        serde_json::to_writer(BufWriter::new(file), &payload)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("wrote {} particles to {}", config.count, path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_tuning(name: &str, json: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("particles-{name}-{}.json", std::process::id()));
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn missing_tuning_file_means_defaults() {
        assert_eq!(load_tuning(None).unwrap(), Config::default());
    }

    #[test]
    fn tuning_file_overrides_selected_fields() {
        let path = write_tuning("ok", r#"{ "idle_rate": 4.0 }"#);
        let tuning = load_tuning(Some(&path));
        fs::remove_file(&path).unwrap();
        assert_eq!(tuning.unwrap().idle_rate, 4.0);
    }

    #[test]
    fn out_of_range_tuning_is_rejected_before_use() {
        let path = write_tuning("bad", r#"{ "seed_spread": -1.0 }"#);
        let err = load_tuning(Some(&path)).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(err.to_string().starts_with("invalid tuning"), "{err:#}");
        assert!(format!("{err:#}").contains("seed_spread"), "{err:#}");
    }
}
