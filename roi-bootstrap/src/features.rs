//! Loading precomputed per-image feature files.

use crate::common::*;

/// The on-disk encoding of a feature file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFormat {
    /// `<name>.json`, a list of rows.
    Json,
    /// `<name>.bin`, row-major little-endian `f32` values.
    Raw,
}

impl FeatureFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "json" => Some(Self::Json),
            "raw" => Some(Self::Raw),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Raw => "bin",
        }
    }

    pub fn load(&self, path: &Path, feature_dim: usize) -> Result<Array2<f32>> {
        let features = match self {
            Self::Json => {
                let text = fs::read_to_string(path)?;
                let rows: Vec<Vec<f32>> = serde_json::from_str(&text)?;
                let num_rows = rows.len();
                for (index, row) in rows.iter().enumerate() {
                    ensure!(
                        row.len() == feature_dim,
                        "row {} has {} values, but expect {}",
                        index,
                        row.len(),
                        feature_dim
                    );
                }
                Array2::from_shape_vec((num_rows, feature_dim), rows.concat())?
            }
            Self::Raw => {
                let bytes = fs::read(path)?;
                let row_bytes = feature_dim * 4;
                ensure!(
                    bytes.len() % row_bytes == 0,
                    "file size {} is not a multiple of the row size {}",
                    bytes.len(),
                    row_bytes
                );
                let values: Vec<f32> = bytes
                    .chunks_exact(4)
                    .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                    .collect();
                Array2::from_shape_vec((bytes.len() / row_bytes, feature_dim), values)?
            }
        };
        Ok(features)
    }
}

/// Load the features of `name` stored in `dir` in the format `format_name`.
///
/// Returns `Ok(None)` if the format is not recognized.
pub fn load_features(
    dir: &Path,
    name: &str,
    format_name: &str,
    feature_dim: usize,
) -> Result<Option<Array2<f32>>> {
    let format = match FeatureFormat::parse(format_name) {
        Some(format) => format,
        None => {
            warn!("unrecognized feature format '{}'", format_name);
            return Ok(None);
        }
    };

    let path = dir.join(format!("{}.{}", name, format.extension()));
    let features = format
        .load(&path, feature_dim)
        .with_context(|| format!("failed to load features from {}", path.display()))?;
    Ok(Some(features))
}
