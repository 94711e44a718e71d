//! Runtime settings read from the environment
//!
//! | Field | Variable | Default |
//! |-------|----------|---------|
//! | `num_proc` | `PPC_NUM_PROC` | 4 |
//! | `comm_timeout` | `PPC_COMM_TIMEOUT_SECS` | 60 |
//! | `perf_runs` | `PPC_PERF_RUNS` | 5 |
//! | `perf_max_time` | `PPC_PERF_MAX_SECS` | 10 |
//! | `data_dir` | `PPC_DATA_DIR` | `data` in the crate root |
use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Settings shared by the test harness and the in-process backend
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Largest number of ranks used by functional runs
    pub num_proc: usize,
    /// Receive timeout of the in-process backend
    pub comm_timeout: Duration,
    /// Number of repetitions of a performance run
    pub perf_runs: usize,
    /// Time limit of a single performance run
    pub perf_max_time: Duration,
    /// Directory holding fixture files
    pub data_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            num_proc: 4,
            comm_timeout: Duration::from_secs(60),
            perf_runs: 5,
            perf_max_time: Duration::from_secs(10),
            data_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data"),
        }
    }
}

fn parse<T: FromStr>(name: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| Error::Config {
            name: name.to_string(),
            value: v,
        }),
    }
}

fn positive(name: &str, value: usize) -> Result<usize> {
    if value == 0 {
        Err(Error::Config {
            name: name.to_string(),
            value: value.to_string(),
        })
    } else {
        Ok(value)
    }
}

impl Settings {
    /// Read the settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read the settings through `lookup`, falling back to the defaults for missing variables
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let default = Self::default();
        let num_proc = positive(
            "PPC_NUM_PROC",
            parse("PPC_NUM_PROC", lookup("PPC_NUM_PROC"), default.num_proc)?,
        )?;
        let timeout = parse(
            "PPC_COMM_TIMEOUT_SECS",
            lookup("PPC_COMM_TIMEOUT_SECS"),
            default.comm_timeout.as_secs_f64(),
        )?;
        let perf_runs = positive(
            "PPC_PERF_RUNS",
            parse("PPC_PERF_RUNS", lookup("PPC_PERF_RUNS"), default.perf_runs)?,
        )?;
        let perf_max = parse(
            "PPC_PERF_MAX_SECS",
            lookup("PPC_PERF_MAX_SECS"),
            default.perf_max_time.as_secs_f64(),
        )?;
        let data_dir = lookup("PPC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(default.data_dir);

        Ok(Self {
            num_proc,
            comm_timeout: seconds("PPC_COMM_TIMEOUT_SECS", timeout)?,
            perf_runs,
            perf_max_time: seconds("PPC_PERF_MAX_SECS", perf_max)?,
            data_dir,
        })
    }
}

fn seconds(name: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| Error::Config {
            name: name.to_string(),
            value: value.to_string(),
        })
}
