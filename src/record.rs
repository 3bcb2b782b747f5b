use serde::{Deserialize, Serialize};

/// Number of audio features every track carries.
pub const FEATURE_COUNT: usize = 9;

/// Audio feature columns, in the column order of the feature matrix.
pub const FEATURES: [&str; FEATURE_COUNT] = [
    "acousticness", "danceability", "energy", "instrumentalness",
    "liveness", "loudness", "speechiness", "tempo", "valence",
];
pub(crate) const DANCEABILITY: usize = 1;
pub(crate) const ENERGY: usize = 2;
pub(crate) const VALENCE: usize = 8;

/// Metadata columns that have to be present (and filled) for a row to be used.
pub const META_COLUMNS: [&str; 4] = ["name", "artists", "year", "popularity"];

/// One complete input row.
///
/// ## Fields
/// - **ordinal**: Position of the row within the original input (0-based, header excluded)
/// - **features**: Audio features, ordered like [`FEATURES`]
/// - **artists**: Raw artist field, usually a list literal such as `['A', 'B']`
#[derive(Clone, Debug, PartialEq)]
pub struct RawRecord {
    pub ordinal: usize,
    pub features: [f64; FEATURE_COUNT],
    pub name: String,
    pub artists: String,
    pub year: i32,
    pub popularity: i32,
}

/// Feature subset duplicated into each output record for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayFeatures {
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
}

/// One point of the galaxy, as written to the output document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub id: String,
    pub position: Vec<f64>,
    pub cluster: usize,
    pub name: String,
    pub artist: String,
    pub year: i32,
    pub features: DisplayFeatures,
}

/// Strip list syntax from an artist field: `['Drake', 'Future']` -> `Drake, Future`.
pub fn clean_artist(raw: &str) -> String {
    raw.chars().filter(|c| !matches!(c, '[' | ']' | '\'' | '"')).collect()
}

/// Extract the row-major feature matrix of the given records.
pub fn feature_matrix(records: &[RawRecord]) -> Vec<f64> {
    records.iter().flat_map(|r| r.features.iter().cloned()).collect()
}

/// Join working set rows with their projection and cluster assignment.
///
/// ## Arguments
/// - **projection**: Row-major projection matrix with **dims** columns per record
/// - **assignments**: Cluster id per record
pub fn assemble(records: &[RawRecord], projection: &[f64], dims: usize, assignments: &[usize]) -> Vec<OutputRecord> {
    debug_assert_eq!(projection.len(), records.len() * dims);
    debug_assert_eq!(assignments.len(), records.len());

    records.iter()
        .zip(projection.chunks(dims.max(1)))
        .zip(assignments.iter().cloned())
        .map(|((record, position), cluster)| OutputRecord {
            id: record.ordinal.to_string(),
            position: position.iter().cloned().take(dims).collect(),
            cluster,
            name: record.name.clone(),
            artist: clean_artist(&record.artists),
            year: record.year,
            features: DisplayFeatures {
                danceability: record.features[DANCEABILITY],
                energy: record.features[ENERGY],
                valence: record.features[VALENCE],
            },
        })
        .collect()
}
