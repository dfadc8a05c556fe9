use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use log::{info, warn};
use crate::config::SweepPlan;
use crate::error::HarnessError;
use crate::results::{ResultTable, SweepResult};
use crate::runner::Simulate;
use crate::sweep::{generate, Sweep, SweepEntry};

/// How a harness run dispatches its configurations
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HarnessOptions {
    /// Maximum number of simulator processes alive at once. 1 runs everything in sequence.
    pub jobs: NonZeroUsize,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self { jobs: NonZeroUsize::MIN }
    }
}

/// A single configuration to measure, tagged with its position in generation order
struct Task<'a> {
    index: usize,
    label: &'a str,
    entry: SweepEntry,
}

/// Generates the plan's sweeps and measures every configuration
///
/// Configurations that fail are logged and skipped. The rows of the returned table are in
/// generation order regardless of `options.jobs`.
///
/// # Arguments
///
/// * `plan`: The sweeps to generate, rejected as a whole if any sweep is invalid
/// * `simulator`: Measures one configuration, its preconditions are checked once before any run
/// * `options`: Dispatch options
///
/// returns: Result<ResultTable, HarnessError>, `NoResults` if every configuration failed
pub fn run<S: Simulate>(plan: &SweepPlan, simulator: &S, options: HarnessOptions) -> Result<ResultTable, HarnessError> {
    let sweeps = generate(plan)?;
    simulator.check_ready()?;

    let tasks = tasks(&sweeps);
    info!("Running {} configurations across {} sweeps", tasks.len(), sweeps.len());
    let measured: Vec<Option<SweepResult>> = if options.jobs.get() == 1 {
        tasks.iter().map(|task| measure(simulator, task)).collect()
    } else {
        measure_parallel(simulator, &tasks, options.jobs)
    };

    let mut table = ResultTable::new();
    for result in measured.into_iter().flatten() {
        table.append(result);
    }
    if table.is_empty() {
        return Err(HarnessError::NoResults);
    }
    info!("{} of {} configurations succeeded", table.len(), tasks.len());
    Ok(table)
}

/// Runs the plan and writes the results to `output`, nothing is written if the run fails
pub fn run_and_persist<S: Simulate>(
    plan: &SweepPlan,
    simulator: &S,
    options: HarnessOptions,
    output: impl AsRef<Path>,
) -> Result<ResultTable, HarnessError> {
    let table = run(plan, simulator, options)?;
    let output = output.as_ref();
    table
        .write_csv(output)
        .map_err(|source| HarnessError::Persist { path: output.to_path_buf(), source })?;
    info!("Results saved to {}", output.display());
    Ok(table)
}

fn tasks(sweeps: &[Sweep]) -> Vec<Task<'_>> {
    sweeps
        .iter()
        .flat_map(|sweep| sweep.entries.iter().map(move |entry| (sweep.label.as_str(), *entry)))
        .enumerate()
        .map(|(index, (label, entry))| Task { index, label, entry })
        .collect()
}

fn measure<S: Simulate>(simulator: &S, task: &Task<'_>) -> Option<SweepResult> {
    let params = task.entry.params;
    info!(
        "Running simulation with {}={} ({params}, CacheSize={} bytes)",
        task.label,
        task.entry.value,
        params.cache_size()
    );
    match simulator.simulate(&params) {
        Ok(cycles) => Some(SweepResult::new(task.label, &task.entry, cycles)),
        Err(failure) => {
            warn!("Skipping {}={} ({params}): {failure}", task.label, task.entry.value);
            None
        }
    }
}

/// Bounded worker pool. Workers pull the next task index, results are reordered on collection.
fn measure_parallel<S: Simulate>(simulator: &S, tasks: &[Task<'_>], jobs: NonZeroUsize) -> Vec<Option<SweepResult>> {
    let next = AtomicUsize::new(0);
    let (snd, rec) = mpsc::channel::<(usize, Option<SweepResult>)>();
    let workers = jobs.get().min(tasks.len());
    thread::scope(|scope| {
        for _ in 0..workers {
            let snd = snd.clone();
            let next = &next;
            scope.spawn(move || {
                while let Some(task) = tasks.get(next.fetch_add(1, Ordering::Relaxed)) {
                    if snd.send((task.index, measure(simulator, task))).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(snd);

    let mut ordered: Vec<Option<SweepResult>> = vec![None; tasks.len()];
    for (index, result) in rec {
        ordered[index] = result;
    }
    ordered
}
