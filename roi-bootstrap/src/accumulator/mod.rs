//! Per-class positive and negative sample accumulation.

mod negative;
mod positive;

pub use negative::*;
pub use positive::*;

use crate::common::*;

fn check_features(features: ArrayView2<'_, f32>, num_boxes: usize, feature_dim: usize) -> Result<()> {
    ensure!(
        features.nrows() == num_boxes,
        "expect {} feature rows, but get {}",
        num_boxes,
        features.nrows()
    );
    ensure!(
        features.ncols() == feature_dim,
        "expect features of dimension {}, but get {}",
        feature_dim,
        features.ncols()
    );
    Ok(())
}
