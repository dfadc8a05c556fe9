use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::HarnessError;

/// Largest accepted value for `s + b`, the set-index and block-offset bits together.
///
/// `2^(s + b) <= 2^31` and `E < 2^32` keep `2^s * E * 2^b` below `2^63`.
pub const MAX_BITS: u32 = 31;

/// Derives the capacity in bytes of a cache with `2^s` sets of `e` lines of `2^b` bytes each
///
/// The caller is responsible for `e >= 1` and `s + b <= MAX_BITS`, the sweep generator checks this
/// before any configuration reaches here.
///
/// # Examples
///
/// ```
/// use sweeplib::config::cache_size;
/// assert_eq!(cache_size(6, 2, 5), 4096);
/// ```
pub fn cache_size(s: u32, e: u32, b: u32) -> u64 {
    (1u64 << s) * e as u64 * (1u64 << b)
}

/// One of the three structural parameters of a cache
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Axis {
    #[serde(alias = "s")]
    SetIndexBits,
    #[serde(alias = "E")]
    Associativity,
    #[serde(alias = "b")]
    BlockBits,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::SetIndexBits, Axis::Associativity, Axis::BlockBits];

    /// The single letter used on the simulator's command line and in the result columns
    pub fn symbol(&self) -> &'static str {
        match self {
            Axis::SetIndexBits => "s",
            Axis::Associativity => "E",
            Axis::BlockBits => "b",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Axis::SetIndexBits => "SetIndexBits",
            Axis::Associativity => "Associativity",
            Axis::BlockBits => "BlockBits",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single `(s, E, b)` cache configuration
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct CacheParams {
    #[serde(rename = "s")]
    pub set_bits: u32,
    #[serde(rename = "E")]
    pub associativity: u32,
    #[serde(rename = "b")]
    pub block_bits: u32,
}

impl CacheParams {
    pub const fn new(set_bits: u32, associativity: u32, block_bits: u32) -> Self {
        Self { set_bits, associativity, block_bits }
    }

    pub fn cache_size(&self) -> u64 {
        cache_size(self.set_bits, self.associativity, self.block_bits)
    }

    /// Set-index plus block-offset bits, widened so the sum itself can't overflow
    pub fn address_bits(&self) -> u64 {
        u64::from(self.set_bits) + u64::from(self.block_bits)
    }

    /// Whether `cache_size` is representable for these params
    pub fn in_bounds(&self) -> bool {
        self.associativity >= 1 && self.address_bits() <= u64::from(MAX_BITS)
    }

    pub fn get(&self, axis: Axis) -> u32 {
        match axis {
            Axis::SetIndexBits => self.set_bits,
            Axis::Associativity => self.associativity,
            Axis::BlockBits => self.block_bits,
        }
    }

    /// Returns a copy with one axis replaced
    pub fn with(mut self, axis: Axis, value: u32) -> Self {
        match axis {
            Axis::SetIndexBits => self.set_bits = value,
            Axis::Associativity => self.associativity = value,
            Axis::BlockBits => self.block_bits = value,
        }
        self
    }
}

impl Default for CacheParams {
    fn default() -> Self {
        CacheParams::new(6, 2, 5)
    }
}

impl fmt::Display for CacheParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s={}, E={}, b={}", self.set_bits, self.associativity, self.block_bits)
    }
}

/// Everything needed to generate the sweeps of one harness run.
///
/// Plans are plain values, several can be built and compared in the same process.
///
/// When read from JSON only `defaults` falls back to its default value. An omitted sweep section
/// means no sweeps of that kind, not the built-in ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPlan {
    /// The values held constant by independent sweeps
    #[serde(default)]
    pub defaults: CacheParams,
    #[serde(default)]
    pub independent: Vec<IndependentSweepSpec>,
    #[serde(default)]
    pub capacity_invariant: Vec<CapacitySweepSpec>,
}

/// Varies one axis over `values`, holding the others at the plan defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndependentSweepSpec {
    pub axis: Axis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub values: Vec<u32>,
}

/// A sweep where every configuration has the same cache size.
///
/// `fixed` is held constant, `vary` is reported as the row value and the third axis absorbs the
/// difference. The triples are either listed in `configs` or solved from `derive`, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacitySweepSpec {
    pub fixed: Axis,
    pub vary: Axis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configs: Vec<CacheParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derive: Option<DerivedCapacity>,
}

/// Solve the third axis from a target size instead of listing triples by hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedCapacity {
    pub capacity: u64,
    pub fixed_value: u32,
    pub values: Vec<u32>,
}

impl SweepPlan {
    /// Loads a plan from a JSON file, missing sweep sections are empty
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| HarnessError::PlanFile {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| HarnessError::PlanFile {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })
    }
}

impl Default for SweepPlan {
    fn default() -> Self {
        let defaults = CacheParams::default();
        let independent = vec![
            IndependentSweepSpec { axis: Axis::SetIndexBits, label: None, values: vec![4, 6, 8] },
            IndependentSweepSpec { axis: Axis::Associativity, label: None, values: vec![2, 4, 6] },
            IndependentSweepSpec { axis: Axis::BlockBits, label: None, values: vec![4, 5, 6] },
        ];
        // All three hold the default 4 KiB capacity
        let capacity_invariant = vec![
            CapacitySweepSpec {
                fixed: Axis::Associativity,
                vary: Axis::SetIndexBits,
                label: None,
                configs: (1..=10).map(|s| CacheParams::new(s, 2, 11 - s)).collect(),
                derive: None,
            },
            CapacitySweepSpec {
                fixed: Axis::SetIndexBits,
                vary: Axis::Associativity,
                label: None,
                configs: (0..=6).map(|i| CacheParams::new(6, 1 << i, 6 - i)).collect(),
                derive: None,
            },
            CapacitySweepSpec {
                fixed: Axis::BlockBits,
                vary: Axis::SetIndexBits,
                label: None,
                configs: (1..=7).map(|s| CacheParams::new(s, 1 << (7 - s), 5)).collect(),
                derive: None,
            },
        ];
        Self { defaults, independent, capacity_invariant }
    }
}
