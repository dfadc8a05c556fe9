use std::num::NonZeroUsize;
use std::path::PathBuf;
use clap::Parser;
use log::LevelFilter;
use sweeplib::config::SweepPlan;
use sweeplib::harness::{run_and_persist, HarnessOptions};
use sweeplib::results::ResultTable;
use sweeplib::runner::SimulatorCommand;
use sweeplib::sweep::generate;

#[cfg(debug_assertions)]
const DEBUG_DEFAULT: bool = true;

#[cfg(not(debug_assertions))]
const DEBUG_DEFAULT: bool = false;

#[derive(Parser, Debug)]
#[command(about = String::from("Runs a cache simulator across sweeps of (s, E, b) configurations"))]
struct Args {
    /// The simulator executable, called as `<executable> -t <prefix> -s <s> -E <E> -b <b>`
    #[arg(short = 'x', long, default_value = "./cache_simulator.exe")]
    executable: PathBuf,

    /// Trace prefix P, the traces P_proc0.trace to P_proc3.trace must exist
    #[arg(short, long, default_value = "app1")]
    trace_prefix: String,

    #[arg(short, long, default_value = "cache_sim_results.csv")]
    output: PathBuf,

    /// JSON sweep plan replacing the built-in one, sweep sections it leaves out are not run
    #[arg(short, long)]
    plan: Option<PathBuf>,

    /// Number of simulator processes to run at once
    #[arg(short, long, default_value = "1")]
    jobs: NonZeroUsize,

    /// Print the generated configurations and exit without running anything
    #[arg(long)]
    dry_run: bool,

    #[arg(short, long, default_value_t = DEBUG_DEFAULT)]
    debug: bool,
}

fn main() -> Result<(), String> {
    let args = Args::parse();
    let level = if args.debug { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();

    let plan = match &args.plan {
        Some(path) => SweepPlan::from_json_file(path).map_err(|e| e.to_string())?,
        None => SweepPlan::default(),
    };
    if args.debug {
        #[cfg(debug_assertions)]
        println!("Running the debug binary, debug mode is enabled by default. Re-compile with the --release argument to turn it off");
        println!(
            "Sweep plan: {}",
            serde_json::to_string_pretty(&plan).map_err(|e| format!("Couldn't serialise the plan {e}"))?
        );
    }

    if args.dry_run {
        for sweep in generate(&plan).map_err(|e| format!("Invalid sweep plan: {e}"))? {
            println!("{} ({} configurations)", sweep.label, sweep.len());
            for entry in &sweep.entries {
                println!("  {:<4} {} -> {} bytes", entry.value, entry.params, entry.params.cache_size());
            }
        }
        return Ok(());
    }

    let simulator = SimulatorCommand::new(args.executable.clone(), args.trace_prefix.clone());
    let options = HarnessOptions { jobs: args.jobs };
    let table = run_and_persist(&plan, &simulator, options, &args.output).map_err(|e| e.to_string())?;
    print_summary(&table);
    Ok(())
}

fn print_summary(table: &ResultTable) {
    for label in table.labels() {
        println!("\n== {label} ==");
        for row in table.by_label(label) {
            println!(
                "  {:<4} s={:<2} E={:<4} b={:<2} {:>10} bytes {:>12} cycles",
                row.value, row.s, row.e, row.b, row.cache_size, row.max_execution_time
            );
        }
    }
}
