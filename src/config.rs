//! Pipeline configuration.
//!
//! Every value has a default; a TOML file may override any subset of them, and the command line
//! overrides the file.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Seed used for all random draws unless configured otherwise.
pub const DEFAULT_SEED: u64 = 42;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Delimited input file
    pub input_path: PathBuf,
    /// Destination of the JSON document
    pub output_path: PathBuf,
    /// Maximum size of the working set
    pub global_cap: usize,
    /// Maximum amount of tracks sampled per release year (only applied when the input exceeds `global_cap`)
    pub per_group_cap: usize,
    /// Amount of clusters
    pub k: usize,
    /// Amount of projection dimensions
    pub dims: usize,
    /// Seed for sampling and centroid initialization
    pub seed: u64,
    /// Upper bound for k-means iterations
    pub max_iter: usize,
    /// k-means stops once the total squared centroid shift is at or below this value
    pub tolerance: f64,
    /// Amount of k-means runs with different initializations (best one wins)
    pub n_init: usize,
    /// Field delimiter of the input file
    pub delimiter: char,
    /// Indent the JSON output
    pub pretty: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data.csv"),
            output_path: PathBuf::from("galaxy_data.json"),
            global_cap: 20000,
            per_group_cap: 200,
            k: 8,
            dims: 3,
            seed: DEFAULT_SEED,
            max_iter: 300,
            tolerance: 1e-4,
            n_init: 1,
            delimiter: ',',
            pretty: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("global_cap", self.global_cap),
            ("per_group_cap", self.per_group_cap),
            ("k", self.k),
            ("dims", self.dims),
            ("max_iter", self.max_iter),
            ("n_init", self.n_init),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(Error::InvalidConfig(format!("{} must be greater than zero", name)));
        }
        if !(self.tolerance >= 0.0) {
            return Err(Error::InvalidConfig(format!("tolerance must be a non-negative number, got {}", self.tolerance)));
        }
        self.delimiter_byte().map(|_| ())
    }

    /// The delimiter as single byte, as required by the CSV reader.
    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(Error::InvalidConfig(format!("delimiter must be an ASCII character, got {:?}", self.delimiter)))
        }
    }
}
