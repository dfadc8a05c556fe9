//! # SweepLib
//!
//! Sweeplib measures how an external cache simulator performs across a space of `(s, E, b)`
//! configurations
//!
//! It generates labelled sweeps from a plan, either varying one parameter at a time or holding the
//! cache size constant while trading parameters against each other, runs the simulator once per
//! configuration and collects the reported maximum execution time into a table for analysis
//!
//! Individual configurations are allowed to fail, broken plans and missing inputs are not

/// Contains the `(s, E, b)` configuration model and the sweep plan, which can be read from JSON
pub mod config;

/// Contains the error types for plans, single runs, and whole harness runs
pub mod error;

/// Contains the harness which ties generation, simulation and aggregation together
pub mod harness;

/// Contains the result rows and the append-only result table, with CSV persistence
pub mod results;

/// Contains the simulator interface, and its implementation for an external executable
pub mod runner;

/// Contains the sweep generator
pub mod sweep;

#[cfg(test)]
mod test;

/// Contains utilities for running tests and benchmarks.
pub mod util;
