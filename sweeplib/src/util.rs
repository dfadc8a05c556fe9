use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use crate::config::CacheParams;
use crate::runner::TRACE_COUNT;

/// Produces simulator output in the format of the reference simulator
///
/// `reports` are the maximum execution times printed, in order. An empty slice gives output with
/// no metric line at all.
pub fn sample_simulator_output(params: &CacheParams, reports: &[u64]) -> String {
    let mut out = String::from("\n===== Simulation Results =====\n");
    out.push_str(&format!("Total simulation cycles: {}\n", reports.last().copied().unwrap_or(0)));
    out.push_str(&format!("Set Index Bits: {}\n", params.set_bits));
    out.push_str(&format!("Associativity: {}\n", params.associativity));
    out.push_str(&format!("Block Bits: {}\n", params.block_bits));
    for core in 0..TRACE_COUNT {
        out.push_str(&format!("Core {core} Statistics:\n"));
        out.push_str(&format!("Total Instructions: {}\n", 1000 + core));
        out.push_str(&format!("Total Execution Cycles: {}\n", 5000 + core * 10));
        out.push_str(&format!("Cache Miss Rate: 3.{core}0%\n\n"));
    }
    for cycles in reports {
        out.push_str(&format!("Maximum Execution Time (cycles): {cycles}\n"));
    }
    out
}

/// Creates empty `P_proc0.trace` to `P_proc3.trace` files for `prefix` inside `dir`
///
/// returns: The trace prefix to hand to the simulator
pub fn write_trace_files(dir: &Path, prefix: &str) -> io::Result<String> {
    let full_prefix = dir.join(prefix).to_string_lossy().into_owned();
    for core in 0..TRACE_COUNT {
        fs::write(format!("{full_prefix}_proc{core}.trace"), "R 0x0\n")?;
    }
    Ok(full_prefix)
}

/// Writes a `/bin/sh` script standing in for the simulator
///
/// The script receives the simulator flags as `$@`. It is meant to be run through `sh` rather
/// than executed directly.
pub fn write_fake_simulator(dir: &Path, name: &str, body: &str) -> io::Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    Ok(path)
}
