use std::error::Error;
use std::io::Write;
use tempfile::NamedTempFile;
use crate::config::{cache_size, Axis, CacheParams, CapacitySweepSpec, DerivedCapacity, IndependentSweepSpec, SweepPlan, MAX_BITS};
use crate::error::{HarnessError, PlanError};
use crate::sweep::{capacity_invariant, capacity_label, generate, independent, solve_capacity_invariant};

#[test]
fn cache_size_matches_definition() {
    assert_eq!(cache_size(6, 2, 5), 64 * 2 * 32);
    assert_eq!(cache_size(0, 1, 0), 1);
    for s in 0..=20 {
        for b in 0..=20 {
            for e in [1, 3, 7, 1000] {
                assert_eq!(cache_size(s, e, b), 2u64.pow(s) * e as u64 * 2u64.pow(b));
            }
        }
    }
}

#[test]
fn independent_sweeps_hold_defaults() -> Result<(), Box<dyn Error>> {
    let defaults = CacheParams::new(6, 2, 5);
    for axis in Axis::ALL {
        let sweep = independent(axis.name(), axis, defaults, &[8, 1, 4])?;
        assert_eq!(sweep.axis, axis);
        let values: Vec<u32> = sweep.entries.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![8, 1, 4]);
        for entry in &sweep.entries {
            assert_eq!(entry.params.get(axis), entry.value);
            for other in Axis::ALL.into_iter().filter(|a| *a != axis) {
                assert_eq!(entry.params.get(other), defaults.get(other));
            }
        }
    }
    Ok(())
}

#[test]
fn independent_sweep_rejects_bad_values() {
    let defaults = CacheParams::default();
    assert_eq!(
        independent("Associativity", Axis::Associativity, defaults, &[2, 0]),
        Err(PlanError::ZeroAssociativity { label: "Associativity".into(), params: CacheParams::new(6, 0, 5) })
    );
    assert!(matches!(
        independent("BlockBits", Axis::BlockBits, defaults, &[40]),
        Err(PlanError::BitsOutOfRange { .. })
    ));
    assert_eq!(
        independent("SetIndexBits", Axis::SetIndexBits, defaults, &[4, 6, 4]),
        Err(PlanError::DuplicateValue { label: "SetIndexBits".into(), value: 4 })
    );
    assert_eq!(
        independent("SetIndexBits", Axis::SetIndexBits, defaults, &[]),
        Err(PlanError::EmptySweep { label: "SetIndexBits".into() })
    );
}

#[test]
fn capacity_invariant_sweep_keeps_size() -> Result<(), Box<dyn Error>> {
    let configs: Vec<CacheParams> = (1..=10).map(|s| CacheParams::new(s, 2, 11 - s)).collect();
    let sweep = capacity_invariant("ConstantSize_FixedE", Axis::Associativity, Axis::SetIndexBits, &configs)?;
    assert_eq!(sweep.len(), 10);
    assert_eq!(sweep.axis, Axis::SetIndexBits);
    for (entry, params) in sweep.entries.iter().zip(&configs) {
        assert_eq!(entry.params, *params);
        assert_eq!(entry.value, params.set_bits);
        assert_eq!(entry.params.cache_size(), 4096);
    }
    Ok(())
}

#[test]
fn capacity_invariant_sweep_rejects_mismatch() {
    let configs = [CacheParams::new(1, 2, 10), CacheParams::new(2, 2, 9), CacheParams::new(3, 2, 9)];
    let err = capacity_invariant("broken", Axis::Associativity, Axis::SetIndexBits, &configs).unwrap_err();
    assert_eq!(
        err,
        PlanError::CapacityMismatch {
            label: "broken".into(),
            params: CacheParams::new(3, 2, 9),
            expected: 4096,
            actual: 8192,
        }
    );
    assert!(err.to_string().contains("8192"));
}

#[test]
fn capacity_invariant_sweep_rejects_moving_fixed_axis() {
    // Same size, but E is supposed to stay put
    let configs = [CacheParams::new(6, 2, 5), CacheParams::new(6, 4, 4)];
    assert_eq!(
        capacity_invariant("fixedE", Axis::Associativity, Axis::BlockBits, &configs),
        Err(PlanError::FixedAxisVaries {
            label: "fixedE".into(),
            params: CacheParams::new(6, 4, 4),
            fixed: Axis::Associativity,
            expected: 2,
        })
    );
    assert!(matches!(
        capacity_invariant("same", Axis::BlockBits, Axis::BlockBits, &configs),
        Err(PlanError::DegenerateAxes { .. })
    ));
}

#[test]
fn solved_capacity_sweeps_match_hand_written_ones() -> Result<(), Box<dyn Error>> {
    let plan = SweepPlan::default();
    for spec in &plan.capacity_invariant {
        let derived = DerivedCapacity {
            capacity: 4096,
            fixed_value: spec.configs[0].get(spec.fixed),
            values: spec.configs.iter().map(|c| c.get(spec.vary)).collect(),
        };
        let solved = solve_capacity_invariant("solved", spec.fixed, spec.vary, &derived)?;
        assert_eq!(solved, spec.configs);
    }
    Ok(())
}

#[test]
fn solver_rejects_sizes_without_a_power_of_two() {
    // 2^6 * 3 doesn't divide 4096
    let derived = DerivedCapacity { capacity: 4096, fixed_value: 6, values: vec![2, 3] };
    assert!(matches!(
        solve_capacity_invariant("odd", Axis::SetIndexBits, Axis::Associativity, &derived),
        Err(PlanError::Unsolvable { value: 3, axis: Axis::BlockBits, .. })
    ));
}

#[test]
fn default_plan_generates_in_order() -> Result<(), Box<dyn Error>> {
    let sweeps = generate(&SweepPlan::default())?;
    let labels: Vec<&str> = sweeps.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "SetIndexBits",
            "Associativity",
            "BlockBits",
            "ConstantSize_FixedE",
            "ConstantSize_Fixeds",
            "ConstantSize_Fixedb",
        ]
    );
    for sweep in &sweeps[3..] {
        assert!(sweep.entries.iter().all(|e| e.params.cache_size() == 4096));
    }
    assert_eq!(sweeps[0].entries[1].params, CacheParams::new(6, 2, 5));
    Ok(())
}

#[test]
fn plan_rejects_duplicate_labels() {
    let mut plan = SweepPlan::default();
    plan.independent.push(IndependentSweepSpec { axis: Axis::BlockBits, label: None, values: vec![7] });
    assert_eq!(generate(&plan), Err(PlanError::DuplicateLabel("BlockBits".into())));

    let mut plan = SweepPlan::default();
    plan.capacity_invariant[1].label = Some(capacity_label(Axis::Associativity));
    assert_eq!(generate(&plan), Err(PlanError::DuplicateLabel("ConstantSize_FixedE".into())));
}

#[test]
fn plan_requires_one_capacity_source() {
    let mut plan = SweepPlan::default();
    plan.capacity_invariant.push(CapacitySweepSpec {
        fixed: Axis::BlockBits,
        vary: Axis::Associativity,
        label: Some("nothing".into()),
        configs: Vec::new(),
        derive: None,
    });
    assert_eq!(generate(&plan), Err(PlanError::AmbiguousSource { label: "nothing".into() }));
}

#[test]
fn plan_reads_from_json() -> Result<(), Box<dyn Error>> {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"{{
            "defaults": {{"s": 4, "E": 1, "b": 6}},
            "independent": [{{"axis": "E", "values": [1, 2, 4]}}],
            "capacity_invariant": [
                {{"fixed": "b", "vary": "SetIndexBits", "label": "Size1K",
                  "derive": {{"capacity": 1024, "fixed_value": 4, "values": [2, 3, 4]}}}}
            ]
        }}"#
    )?;
    let plan = SweepPlan::from_json_file(file.path())?;
    assert_eq!(plan.defaults, CacheParams::new(4, 1, 6));
    let sweeps = generate(&plan)?;
    assert_eq!(sweeps.len(), 2);
    assert_eq!(sweeps[0].entries[2].params, CacheParams::new(4, 4, 6));
    let sizes: Vec<(u32, u32)> = sweeps[1].entries.iter().map(|e| (e.value, e.params.associativity)).collect();
    assert_eq!(sizes, vec![(2, 16), (3, 8), (4, 4)]);
    Ok(())
}

#[test]
fn plan_file_errors_are_fatal() -> Result<(), Box<dyn Error>> {
    let mut file = NamedTempFile::new()?;
    write!(file, "{{\"defaults\": ")?;
    assert!(matches!(SweepPlan::from_json_file(file.path()), Err(HarnessError::PlanFile { .. })));
    assert!(matches!(
        SweepPlan::from_json_file("/definitely/not/a/plan.json"),
        Err(HarnessError::PlanFile { .. })
    ));
    Ok(())
}

#[test]
fn combined_bits_that_overflow_are_rejected() {
    // 2^31 * 4 * 2^31 is 2^64, and 8 instead of 4 would wrap to the same value
    let huge = CacheParams::new(31, 2, 31);
    assert_eq!(
        independent("Associativity", Axis::Associativity, huge, &[4]),
        Err(PlanError::BitsOutOfRange {
            label: "Associativity".into(),
            params: CacheParams::new(31, 4, 31),
            max: MAX_BITS,
        })
    );
    let configs = [CacheParams::new(31, 4, 31), CacheParams::new(31, 8, 31)];
    assert!(matches!(
        capacity_invariant("wrapped", Axis::SetIndexBits, Axis::Associativity, &configs),
        Err(PlanError::BitsOutOfRange { .. })
    ));
}

#[test]
fn largest_accepted_configuration_fits() -> Result<(), Box<dyn Error>> {
    let sweep = independent("Associativity", Axis::Associativity, CacheParams::new(16, 1, 15), &[u32::MAX])?;
    assert_eq!(sweep.entries[0].params.cache_size(), (1u64 << 31) * u32::MAX as u64);
    assert!(matches!(
        independent("BlockBits", Axis::BlockBits, CacheParams::new(16, 1, 15), &[16]),
        Err(PlanError::BitsOutOfRange { .. })
    ));
    Ok(())
}

#[test]
fn plan_file_sections_left_out_are_empty() -> Result<(), Box<dyn Error>> {
    let mut file = NamedTempFile::new()?;
    write!(file, r#"{{"independent": [{{"axis": "s", "values": [5, 7]}}]}}"#)?;
    let plan = SweepPlan::from_json_file(file.path())?;
    assert_eq!(plan.defaults, CacheParams::default());
    assert!(plan.capacity_invariant.is_empty());
    let sweeps = generate(&plan)?;
    let labels: Vec<&str> = sweeps.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["SetIndexBits"]);
    Ok(())
}
