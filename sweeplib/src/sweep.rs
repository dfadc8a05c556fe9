use std::collections::HashSet;
use log::debug;
use crate::config::{Axis, CacheParams, CapacitySweepSpec, DerivedCapacity, IndependentSweepSpec, SweepPlan, MAX_BITS};
use crate::error::PlanError;

/// One configuration of a sweep, with the value it is reported under
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SweepEntry {
    pub value: u32,
    pub params: CacheParams,
}

/// An ordered, labelled set of configurations.
///
/// The label is what downstream analysis selects rows by, so it is unique within a plan.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Sweep {
    pub label: String,
    /// The axis whose value each entry is reported under
    pub axis: Axis,
    pub entries: Vec<SweepEntry>,
}

impl Sweep {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The label used for a capacity-invariant sweep when the plan doesn't name one
pub fn capacity_label(fixed: Axis) -> String {
    format!("ConstantSize_Fixed{}", fixed.symbol())
}

/// Varies `axis` over `values`, holding the other two axes at `defaults`
///
/// # Arguments
///
/// * `label`: The sweep label, usually the axis name
/// * `axis`: The axis to vary
/// * `defaults`: Supplies the values of the two held axes
/// * `values`: Candidate values in the order they should be run
///
/// returns: Result<Sweep, PlanError>
pub fn independent(label: &str, axis: Axis, defaults: CacheParams, values: &[u32]) -> Result<Sweep, PlanError> {
    let entries = values
        .iter()
        .map(|&value| SweepEntry { value, params: defaults.with(axis, value) })
        .collect();
    let sweep = Sweep { label: label.to_string(), axis, entries };
    validate_entries(&sweep)?;
    Ok(sweep)
}

/// Enumerates a caller-provided table of triples that all share one cache size
///
/// The whole table is checked before anything is returned: every entry must have the capacity of
/// the first one, and the `fixed` axis must not change. Each entry is reported under its `vary`
/// value.
///
/// returns: Result<Sweep, PlanError>
pub fn capacity_invariant(label: &str, fixed: Axis, vary: Axis, configs: &[CacheParams]) -> Result<Sweep, PlanError> {
    if fixed == vary {
        return Err(PlanError::DegenerateAxes { label: label.to_string(), axis: fixed });
    }
    let sweep = Sweep {
        label: label.to_string(),
        axis: vary,
        entries: configs
            .iter()
            .map(|&params| SweepEntry { value: params.get(vary), params })
            .collect(),
    };
    // Bounds first, the capacity of an out of range entry would overflow
    validate_entries(&sweep)?;

    let first = sweep.entries[0].params;
    let expected = first.cache_size();
    for entry in &sweep.entries {
        let actual = entry.params.cache_size();
        if actual != expected {
            return Err(PlanError::CapacityMismatch {
                label: sweep.label.clone(),
                params: entry.params,
                expected,
                actual,
            });
        }
        if entry.params.get(fixed) != first.get(fixed) {
            return Err(PlanError::FixedAxisVaries {
                label: sweep.label.clone(),
                params: entry.params,
                fixed,
                expected: first.get(fixed),
            });
        }
    }
    debug_assert!(sweep.entries.iter().all(|e| e.params.cache_size() == expected));
    Ok(sweep)
}

/// Builds capacity-invariant triples from a target size instead of a hand-written table
///
/// For each `vary` value the remaining axis is solved so that the cache holds exactly `capacity`
/// bytes. Set and block bits only take powers of two, so not every combination has a solution.
pub fn solve_capacity_invariant(
    label: &str,
    fixed: Axis,
    vary: Axis,
    derived: &DerivedCapacity,
) -> Result<Vec<CacheParams>, PlanError> {
    if fixed == vary {
        return Err(PlanError::DegenerateAxes { label: label.to_string(), axis: fixed });
    }
    let solve = Axis::ALL
        .into_iter()
        .find(|axis| *axis != fixed && *axis != vary)
        .ok_or_else(|| PlanError::DegenerateAxes { label: label.to_string(), axis: fixed })?;

    derived
        .values
        .iter()
        .map(|&value| {
            let partial = CacheParams::new(0, 1, 0)
                .with(fixed, derived.fixed_value)
                .with(vary, value);
            let unsolvable = || PlanError::Unsolvable {
                label: label.to_string(),
                capacity: derived.capacity,
                fixed,
                fixed_value: derived.fixed_value,
                vary,
                value,
                axis: solve,
            };
            if !partial.in_bounds() {
                return Err(unsolvable());
            }
            // Size with the solved axis at its neutral value (2^0 or E=1)
            let base = partial.cache_size();
            if base == 0 || derived.capacity % base != 0 {
                return Err(unsolvable());
            }
            let factor = derived.capacity / base;
            let solved = match solve {
                Axis::Associativity => u32::try_from(factor).map_err(|_| unsolvable())?,
                Axis::SetIndexBits | Axis::BlockBits => {
                    if !factor.is_power_of_two() {
                        return Err(unsolvable());
                    }
                    factor.trailing_zeros()
                }
            };
            Ok(partial.with(solve, solved))
        })
        .collect()
}

/// Generates every sweep of a plan, independent sweeps first, in plan order
///
/// Nothing is run here, so a broken plan is always rejected before the simulator is touched.
pub fn generate(plan: &SweepPlan) -> Result<Vec<Sweep>, PlanError> {
    let mut sweeps = Vec::with_capacity(plan.independent.len() + plan.capacity_invariant.len());
    for spec in &plan.independent {
        sweeps.push(independent_from_spec(spec, plan.defaults)?);
    }
    for spec in &plan.capacity_invariant {
        sweeps.push(capacity_from_spec(spec)?);
    }

    let mut labels = HashSet::new();
    for sweep in &sweeps {
        if !labels.insert(sweep.label.as_str()) {
            return Err(PlanError::DuplicateLabel(sweep.label.clone()));
        }
        debug!("Generated sweep {} with {} configurations", sweep.label, sweep.len());
    }
    Ok(sweeps)
}

fn independent_from_spec(spec: &IndependentSweepSpec, defaults: CacheParams) -> Result<Sweep, PlanError> {
    let label = spec.label.clone().unwrap_or_else(|| spec.axis.name().to_string());
    independent(&label, spec.axis, defaults, &spec.values)
}

fn capacity_from_spec(spec: &CapacitySweepSpec) -> Result<Sweep, PlanError> {
    let label = spec.label.clone().unwrap_or_else(|| capacity_label(spec.fixed));
    match (&spec.derive, spec.configs.is_empty()) {
        (None, false) => capacity_invariant(&label, spec.fixed, spec.vary, &spec.configs),
        (Some(derived), true) => {
            let configs = solve_capacity_invariant(&label, spec.fixed, spec.vary, derived)?;
            capacity_invariant(&label, spec.fixed, spec.vary, &configs)
        }
        _ => Err(PlanError::AmbiguousSource { label }),
    }
}

/// Checks the per-entry preconditions shared by both sweep families
fn validate_entries(sweep: &Sweep) -> Result<(), PlanError> {
    if sweep.entries.is_empty() {
        return Err(PlanError::EmptySweep { label: sweep.label.clone() });
    }
    let mut seen = HashSet::new();
    for entry in &sweep.entries {
        let params = entry.params;
        if params.associativity == 0 {
            return Err(PlanError::ZeroAssociativity { label: sweep.label.clone(), params });
        }
        if params.address_bits() > u64::from(MAX_BITS) {
            return Err(PlanError::BitsOutOfRange { label: sweep.label.clone(), params, max: MAX_BITS });
        }
        if !seen.insert(entry.value) {
            return Err(PlanError::DuplicateValue { label: sweep.label.clone(), value: entry.value });
        }
    }
    Ok(())
}
