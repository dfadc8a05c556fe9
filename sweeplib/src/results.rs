use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use crate::config::CacheParams;
use crate::sweep::SweepEntry;

/// Column order of the results file, the contract downstream analysis depends on
pub const COLUMNS: [&str; 7] = ["Parameter", "Value", "MaxExecutionTime", "CacheSize", "s", "E", "b"];

/// One successfully measured configuration. Serialises to one row of the results file.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    #[serde(rename = "Parameter")]
    pub label: String,
    #[serde(rename = "Value")]
    pub value: u32,
    #[serde(rename = "MaxExecutionTime")]
    pub max_execution_time: u64,
    #[serde(rename = "CacheSize")]
    pub cache_size: u64,
    pub s: u32,
    #[serde(rename = "E")]
    pub e: u32,
    pub b: u32,
}

impl SweepResult {
    pub fn new(label: &str, entry: &SweepEntry, max_execution_time: u64) -> Self {
        let params = entry.params;
        Self {
            label: label.to_string(),
            value: entry.value,
            max_execution_time,
            cache_size: params.cache_size(),
            s: params.set_bits,
            e: params.associativity,
            b: params.block_bits,
        }
    }

    pub fn params(&self) -> CacheParams {
        CacheParams::new(self.s, self.e, self.b)
    }
}

/// Results of a harness run, in the order the configurations were generated.
///
/// Rows can only be appended, never changed or removed.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ResultTable {
    rows: Vec<SweepResult>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, result: SweepResult) {
        self.rows.push(result);
    }

    pub fn rows(&self) -> &[SweepResult] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct labels in order of first appearance
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !labels.contains(&row.label.as_str()) {
                labels.push(&row.label);
            }
        }
        labels
    }

    /// The rows of one sweep, selected by exact label match
    pub fn by_label<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a SweepResult> + 'a {
        self.rows.iter().filter(move |row| row.label == label)
    }

    /// Writes the table as CSV, header first, rows in table order
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        // serde only emits the header alongside the first row
        if self.rows.is_empty() {
            writer.write_record(COLUMNS)?;
        }
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes the table to `path` through a temporary file in the same directory
    ///
    /// The file at `path` is only replaced once the whole table has been written, a failed write
    /// leaves no partial results behind.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), csv::Error> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir)?;
        self.write_to(BufWriter::new(staged.as_file_mut()))?;
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|e| csv::Error::from(e.error))?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut reader = csv::Reader::from_reader(reader);
        let rows = reader.deserialize().collect::<Result<Vec<SweepResult>, _>>()?;
        Ok(Self { rows })
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self, csv::Error> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file))
    }
}
