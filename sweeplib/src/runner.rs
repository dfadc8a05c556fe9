use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use crate::config::CacheParams;
use crate::error::{HarnessError, RunFailure};

/// Number of per-core trace files the simulator reads for one trace prefix
pub const TRACE_COUNT: usize = 4;

lazy_static! {
    static ref MAX_EXECUTION_TIME: Regex =
        Regex::new(r"Maximum Execution Time \(cycles\):\s*(\d+)").unwrap();
}

/// Something that can measure one cache configuration
///
/// The harness only talks to the simulator through this trait, which keeps it independent of how
/// the measurement is actually obtained.
pub trait Simulate: Sync {
    /// Checks everything a run needs before the first configuration is attempted
    fn check_ready(&self) -> Result<(), HarnessError> {
        Ok(())
    }

    /// Measures the maximum execution time in cycles for one configuration
    fn simulate(&self, params: &CacheParams) -> Result<u64, RunFailure>;
}

/// The external simulator executable, invoked once per configuration
#[derive(Debug, Clone)]
pub struct SimulatorCommand {
    executable: PathBuf,
    leading_args: Vec<OsString>,
    trace_prefix: String,
}

impl SimulatorCommand {
    pub fn new(executable: impl Into<PathBuf>, trace_prefix: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            leading_args: Vec::new(),
            trace_prefix: trace_prefix.into(),
        }
    }

    /// Arguments passed before the configuration flags, e.g. a script for an interpreter
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn trace_prefix(&self) -> &str {
        &self.trace_prefix
    }

    /// The trace files `P_proc0.trace` to `P_proc3.trace` for prefix `P`
    pub fn trace_files(&self) -> Vec<PathBuf> {
        (0..TRACE_COUNT)
            .map(|core| PathBuf::from(format!("{}_proc{core}.trace", self.trace_prefix)))
            .collect()
    }

    fn command(&self, params: &CacheParams) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .args(&self.leading_args)
            .arg("-t")
            .arg(&self.trace_prefix)
            .arg("-s")
            .arg(params.set_bits.to_string())
            .arg("-E")
            .arg(params.associativity.to_string())
            .arg("-b")
            .arg(params.block_bits.to_string());
        command
    }
}

impl Simulate for SimulatorCommand {
    fn check_ready(&self) -> Result<(), HarnessError> {
        if let Some(missing) = self.trace_files().into_iter().find(|path| !path.is_file()) {
            return Err(HarnessError::MissingTrace(missing));
        }
        if !is_reachable(&self.executable) {
            return Err(HarnessError::MissingExecutable(self.executable.clone()));
        }
        Ok(())
    }

    fn simulate(&self, params: &CacheParams) -> Result<u64, RunFailure> {
        let mut command = self.command(params);
        debug!("Running {command:?}");
        let output = command.output().map_err(RunFailure::Spawn)?;
        if !output.status.success() {
            return Err(RunFailure::ExitStatus {
                status: output.status,
                stderr: stderr_tail(&output.stderr),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let cycles = parse_max_execution_time(&stdout).ok_or(RunFailure::MissingMetric)?;
        debug!("{params}: {cycles} cycles");
        Ok(cycles)
    }
}

/// Extracts the maximum execution time from the simulator's standard output
///
/// The simulator may report the metric more than once, the last report wins. Lines whose value
/// doesn't fit in a `u64` are ignored.
///
/// # Examples
///
/// ```
/// use sweeplib::runner::parse_max_execution_time;
/// let out = "Maximum Execution Time (cycles): 100\nMaximum Execution Time (cycles): 250\n";
/// assert_eq!(parse_max_execution_time(out), Some(250));
/// assert_eq!(parse_max_execution_time("Total simulation cycles: 7"), None);
/// ```
pub fn parse_max_execution_time(stdout: &str) -> Option<u64> {
    MAX_EXECUTION_TIME
        .captures_iter(stdout)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u64>().ok())
        .last()
}

/// Resolves the executable the way `Command` will: bare names only through `PATH`, anything with
/// a directory component as a path
fn is_reachable(executable: &Path) -> bool {
    if executable.components().count() != 1 || executable.is_absolute() {
        return executable.is_file();
    }
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| dir.join(executable).is_file()))
        .unwrap_or(false)
}

/// Keeps failure logs readable when the simulator dumps a lot on stderr
fn stderr_tail(stderr: &[u8]) -> String {
    const MAX_LINES: usize = 5;
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(MAX_LINES);
    let tail = lines[start..].join(" | ");
    if tail.is_empty() {
        "<no stderr>".to_string()
    } else {
        tail
    }
}
