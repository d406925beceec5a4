//! `analyzer`: loads a chain of stage cdylibs, attaches each to the next,
//! and feeds the first stage from stdin one line at a time.
//!
//! See spec §4.7 for the wiring algorithm this binary implements.

mod cli;
mod driver;
mod error;

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use cli::Cli;
use driver::LoadedStage;
use error::DriverError;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("analyzer: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), DriverError> {
    let stage_dir = cli.stage_dir.clone().unwrap_or_else(default_stage_dir);
    log::info!("loading stages from {}", stage_dir.display());

    let stages = load_chain(&cli.stages, &stage_dir)?;

    for index in 0..stages.len() {
        if let Err(err) = stages[index].init(cli.queue_capacity) {
            unload_reverse(stages);
            return Err(err);
        }
        log::info!("initialized stage `{}`", stages[index].reported_name());
    }

    for window in stages.windows(2) {
        let upstream = &window[0];
        let downstream = &window[1];
        upstream.attach(downstream.place_work_ptr(), downstream.free_string_ptr());
    }
    // The last stage's output has nowhere further to go; it is only ever
    // observed through its own `wait_finished`, so it is never attached.

    let head = stages.first().expect("clap requires at least one stage");
    let feed_outcome = std::thread::scope(|scope| scope.spawn(|| feed_stdin(head)).join());
    feed_outcome
        .map_err(|_| DriverError::Config("stdin reader thread panicked".to_string()))??;

    for stage in &stages {
        stage.wait_finished()?;
    }
    for stage in stages.iter().rev() {
        stage.fini()?;
    }
    Ok(())
}

fn load_chain(names: &[String], dir: &Path) -> Result<Vec<LoadedStage>, DriverError> {
    let mut stages = Vec::with_capacity(names.len());
    for name in names {
        match LoadedStage::load(name, dir) {
            Ok(stage) => stages.push(stage),
            Err(err) => {
                unload_reverse(stages);
                return Err(err);
            }
        }
    }
    Ok(stages)
}

/// Drops loaded stages last-loaded-first, matching how a stack of `dlopen`
/// handles would conventionally be unwound on a partial-chain failure.
fn unload_reverse(stages: Vec<LoadedStage>) {
    for stage in stages.into_iter().rev() {
        drop(stage);
    }
}

/// Reads stdin line by line, stripping the trailing newline, feeding each
/// line to `head.place_work`. A line that is itself the literal `"<END>"`
/// sentinel is forwarded like any other item and ends the read loop;
/// otherwise the sentinel is synthesized once stdin reaches end of file.
fn feed_stdin(head: &LoadedStage) -> Result<(), DriverError> {
    let stdin = std::io::stdin();
    let mut sentinel_sent = false;
    for line in stdin.lock().lines() {
        let line = line?;
        let is_sentinel = line == pipeloom_core::SENTINEL;
        head.place_work(&line)?;
        if is_sentinel {
            sentinel_sent = true;
            break;
        }
    }
    if !sentinel_sent {
        head.place_work(pipeloom_core::SENTINEL)?;
    }
    Ok(())
}

/// Defaults to the `target/{debug,release}` directory of the workspace this
/// binary itself was built in, matching whichever profile produced
/// `analyzer`. Overridable with `--stage-dir` / `PIPELOOM_STAGE_DIR`.
fn default_stage_dir() -> PathBuf {
    let profile = if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    };
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("target")
        .join(profile)
}
