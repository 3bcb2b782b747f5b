//! Delimited input parsing.

use crate::error::{Error, Result};
use crate::record::{RawRecord, FEATURES, FEATURE_COUNT, META_COLUMNS};
use csv::StringRecord;
use std::{fs::File, io::Read, path::Path};
use tracing::{debug, warn};

/// Parsed input, with the amount of rows that were dropped for missing or unparseable values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadedInput {
    pub records: Vec<RawRecord>,
    pub dropped: usize,
}

/// Column positions of all required fields within the header.
struct Columns {
    features: [usize; FEATURE_COUNT],
    name: usize,
    artists: usize,
    year: usize,
    popularity: usize,
}
impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let position = |column: &str| headers.iter().position(|h| h.trim() == column);

        let missing: Vec<String> = FEATURES.iter().chain(META_COLUMNS.iter())
            .filter(|&&column| position(column).is_none())
            .map(|column| column.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingColumns(missing));
        }

        let mut features = [0usize; FEATURE_COUNT];
        features.iter_mut().zip(FEATURES.iter()).for_each(|(idx, column)| *idx = position(*column).unwrap_or_default());
        Ok(Self {
            features,
            name: position("name").unwrap_or_default(),
            artists: position("artists").unwrap_or_default(),
            year: position("year").unwrap_or_default(),
            popularity: position("popularity").unwrap_or_default(),
        })
    }

    fn parse(&self, row: &StringRecord, ordinal: usize) -> Option<RawRecord> {
        let field = |idx: usize| row.get(idx).map(str::trim).filter(|v| !v.is_empty());

        let mut features = [0.0f64; FEATURE_COUNT];
        for (value, &idx) in features.iter_mut().zip(self.features.iter()) {
            *value = field(idx)?.parse::<f64>().ok().filter(|v| v.is_finite())?;
        }
        Some(RawRecord {
            ordinal,
            features,
            name: field(self.name)?.to_string(),
            artists: field(self.artists)?.to_string(),
            year: parse_integral(field(self.year)?)?,
            popularity: parse_integral(field(self.popularity)?)?,
        })
    }
}

/// Integers may be written as floats (`1999.0`) by spreadsheet exports.
fn parse_integral(value: &str) -> Option<i32> {
    value.parse::<i32>().ok().or_else(|| {
        value.parse::<f64>().ok()
            .filter(|v| v.fract() == 0.0 && *v >= i32::MIN as f64 && *v <= i32::MAX as f64)
            .map(|v| v as i32)
    })
}

/// Parse delimited data with a header row into raw records.
///
/// Fails if the data is malformed or required columns are missing. Rows with missing or unparseable
/// required values are skipped and counted; every record keeps its 0-based row position as ordinal.
pub fn read_records<R: Read>(reader: R, delimiter: u8) -> Result<LoadedInput> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);
    let columns = Columns::locate(reader.headers()?)?;

    let mut loaded = LoadedInput::default();
    for (ordinal, row) in reader.records().enumerate() {
        match columns.parse(&row?, ordinal) {
            Some(record) => loaded.records.push(record),
            None => loaded.dropped += 1,
        }
    }
    if loaded.dropped > 0 {
        warn!(dropped = loaded.dropped, "Skipped rows with missing values");
    }
    debug!(rows = loaded.records.len(), "Parsed input");
    Ok(loaded)
}

/// Open **path** and parse it with [`read_records`].
pub fn load(path: &Path, delimiter: u8) -> Result<LoadedInput> {
    let file = File::open(path)?;
    read_records(file, delimiter)
}
