//! Observation hooks for fetch and load runs, plus the tracing setup used by
//! the conformance suite.
//!
//! Nothing in the engine logs through global state directly: callers hand an
//! [`Observer`] to the fetcher and to the load harness. [`TracingObserver`]
//! forwards everything to `tracing`; [`RecordingObserver`] keeps events in
//! memory for assertions.

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LogConfig;
use crate::domain::{LoadReport, Unexpected};
use crate::error::{CadError, Result};

pub trait Observer: Send + Sync {
    /// A transient failure on `attempt`; another attempt follows after `delay`.
    fn on_retry(&self, _attempt: u32, _max_attempts: u32, _delay: Duration, _cause: &CadError) {}

    /// The last allowed attempt failed with a transient error.
    fn on_exhausted(&self, _attempts: u32, _cause: &CadError) {}

    fn on_unexpected(&self, _worker: usize, _outcome: &Unexpected) {}

    fn on_load_complete(&self, _report: &LoadReport) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_retry(&self, attempt: u32, max_attempts: u32, delay: Duration, cause: &CadError) {
        tracing::warn!(
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            kind = cause.kind(),
            "Attempt {attempt} failed: {cause}. Retrying in {:.1} seconds...",
            delay.as_secs_f64()
        );
    }

    fn on_exhausted(&self, attempts: u32, cause: &CadError) {
        tracing::error!(attempts, kind = cause.kind(), "Giving up after {attempts} attempt(s): {cause}");
    }

    fn on_unexpected(&self, worker: usize, outcome: &Unexpected) {
        match outcome {
            Unexpected::Status(_) => tracing::warn!(worker, "{outcome}"),
            _ => tracing::error!(worker, "{outcome}"),
        }
    }

    fn on_load_complete(&self, report: &LoadReport) {
        tracing::info!(
            workers = report.workers,
            elapsed_ms = report.elapsed_ms,
            p95_ms = report.latency.p95_ms,
            "[Load] {}",
            report.result
        );
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObservedEvent {
    Retry { attempt: u32, max_attempts: u32, kind: &'static str },
    Exhausted { attempts: u32, kind: &'static str },
    Unexpected { worker: usize, outcome: Unexpected },
    LoadComplete { total: u64 },
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<ObservedEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn retries(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, ObservedEvent::Retry { .. }))
            .count()
    }

    fn push(&self, event: ObservedEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Observer for RecordingObserver {
    fn on_retry(&self, attempt: u32, max_attempts: u32, _delay: Duration, cause: &CadError) {
        self.push(ObservedEvent::Retry {
            attempt,
            max_attempts,
            kind: cause.kind(),
        });
    }

    fn on_exhausted(&self, attempts: u32, cause: &CadError) {
        self.push(ObservedEvent::Exhausted {
            attempts,
            kind: cause.kind(),
        });
    }

    fn on_unexpected(&self, worker: usize, outcome: &Unexpected) {
        self.push(ObservedEvent::Unexpected {
            worker,
            outcome: outcome.clone(),
        });
    }

    fn on_load_complete(&self, report: &LoadReport) {
        self.push(ObservedEvent::LoadComplete {
            total: report.result.total(),
        });
    }
}

/// File name for one run's log, e.g. `2025-01-03T14-27-09.log`.
pub fn log_file_name() -> String {
    format!("{}.log", Local::now().format("%Y-%m-%dT%H-%M-%S"))
}

/// Outcome of the first [`init_tracing`] call in this process.
static RUN_LOG: OnceLock<std::result::Result<Option<PathBuf>, String>> = OnceLock::new();

/// Installs a stderr subscriber and, when `log_dir` is set, a second layer
/// appending to a timestamped file in that directory. Returns the file path.
///
/// Only the first call in a process does any work; later calls return the
/// path chosen by the first one and never touch the filesystem. When some
/// other global subscriber is already installed no log file is created.
pub fn init_tracing(config: &LogConfig) -> Result<Option<PathBuf>> {
    RUN_LOG
        .get_or_init(|| install_subscriber(config).map_err(|err| err.to_string()))
        .clone()
        .map_err(CadError::Config)
}

fn install_subscriber(config: &LogConfig) -> Result<Option<PathBuf>> {
    if tracing::dispatcher::has_been_set() {
        return Ok(None);
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|err| CadError::Config(format!("Invalid log filter `{}`: {err}", config.filter)))?;

    let (file_layer, path) = match &config.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|err| {
                CadError::Config(format!("Failed to create log dir {}: {err}", dir.display()))
            })?;
            let path = dir.join(log_file_name());
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|err| {
                    CadError::Config(format!("Failed to open log file {}: {err}", path.display()))
                })?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|err| CadError::Config(format!("Failed to install tracing subscriber: {err}")))?;

    Ok(path)
}
