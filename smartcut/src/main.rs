//! `smartcut` — frame-accurate, minimal-re-encode cutting of compressed
//! video containers.
//!
//! Opens the input, resolves `--keep`/`--cut` tokens against its duration
//! and frame rate, computes a splice plan per interval, and drives the
//! Job's single-threaded pull loop to completion.

mod cli;
mod error;

use std::sync::atomic::AtomicBool;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use error::{CliError, Result};
use smartcut_core::ffmpeg_utils::context::InputContext;
use smartcut_core::{config, time, Job};

const APP_NAME: &str = "smartcut";
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(&cli) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(e.exit_code());
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    cli.validate().map_err(CliError::Args)?;

    smartcut_core::ffmpeg_init().map_err(smartcut_core::CutError::Ffmpeg)?;
    smartcut_core::ffmpeg_log_filter();

    tracing::info!("{} v{}", APP_NAME, VERSION);
    tracing::info!("ffmpeg: {}", smartcut_core::ffmpeg_version_info());

    let probe = InputContext::open(&cli.input)?;
    let video_index = probe.best_video_stream();
    let video_stream = video_index.and_then(|i| probe.stream(i));
    let frame_rate = video_stream
        .as_ref()
        .map(|s| s.avg_frame_rate())
        .unwrap_or_else(|| ffmpeg_next::Rational::new(0, 1));
    let timebase = video_stream
        .as_ref()
        .map(|s| s.time_base())
        .unwrap_or_else(|| ffmpeg_next::Rational::new(1, 90_000));
    let duration_secs = probe.duration();
    drop(probe);

    let ctx = time::TimeContext {
        duration_secs,
        frame_rate,
    };

    let intervals = time::resolve_intervals(
        cli.keep.as_deref(),
        cli.cut.as_deref(),
        timebase,
        &ctx,
    )?;

    let mut options = config::load_job_options(cli.config.as_ref());
    options.dry_run = cli.dry_run;
    options.preserve_timestamps = cli.preserve_timestamps || options.preserve_timestamps;

    let job = Job::new(cli.input.clone(), cli.output.clone(), intervals, options);
    let cancel = AtomicBool::new(false);
    job.run(&cancel)?;

    tracing::info!("wrote {}", cli.output.display());
    Ok(())
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log_level.parse().unwrap_or_else(|_| "info".parse().unwrap()));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
