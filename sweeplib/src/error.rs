use std::path::PathBuf;
use thiserror::Error;
use crate::config::{Axis, CacheParams};

/// A sweep plan that cannot be turned into configurations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("sweep '{label}' has no configurations")]
    EmptySweep { label: String },

    #[error("sweep label '{0}' is used by more than one sweep")]
    DuplicateLabel(String),

    #[error("sweep '{label}' lists value {value} more than once")]
    DuplicateValue { label: String, value: u32 },

    #[error("sweep '{label}': associativity must be at least 1 ({params})")]
    ZeroAssociativity { label: String, params: CacheParams },

    #[error("sweep '{label}': s + b must not exceed {max} ({params})")]
    BitsOutOfRange { label: String, params: CacheParams, max: u32 },

    #[error("sweep '{label}': {params} has cache size {actual} bytes, expected {expected} bytes like the first entry")]
    CapacityMismatch { label: String, params: CacheParams, expected: u64, actual: u64 },

    #[error("sweep '{label}': {params} changes the fixed axis {fixed}, expected {expected}")]
    FixedAxisVaries { label: String, params: CacheParams, fixed: Axis, expected: u32 },

    #[error("sweep '{label}': the fixed and varied axis are both {axis}")]
    DegenerateAxes { label: String, axis: Axis },

    #[error("sweep '{label}': exactly one of an explicit config list or a derived capacity must be given")]
    AmbiguousSource { label: String },

    #[error("sweep '{label}': no {axis} gives a capacity of {capacity} bytes with {fixed}={fixed_value} and {vary}={value}")]
    Unsolvable {
        label: String,
        capacity: u64,
        fixed: Axis,
        fixed_value: u32,
        vary: Axis,
        value: u32,
        axis: Axis,
    },
}

/// Why a single configuration produced no result. Never fatal to the run.
#[derive(Debug, Error)]
pub enum RunFailure {
    #[error("couldn't start the simulator: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("simulator exited with {status}: {stderr}")]
    ExitStatus { status: std::process::ExitStatus, stderr: String },

    #[error("no 'Maximum Execution Time (cycles)' line in the simulator output")]
    MissingMetric,
}

/// Errors that end a harness run without writing any results
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("invalid sweep plan: {0}")]
    Plan(#[from] PlanError),

    #[error("couldn't read the sweep plan at {}: {reason}", path.display())]
    PlanFile { path: PathBuf, reason: String },

    #[error("trace file {} not found", .0.display())]
    MissingTrace(PathBuf),

    #[error("simulator executable {} not found", .0.display())]
    MissingExecutable(PathBuf),

    #[error("no results: every configuration failed")]
    NoResults,

    #[error("couldn't write the results to {}: {source}", path.display())]
    Persist { path: PathBuf, #[source] source: csv::Error },
}
