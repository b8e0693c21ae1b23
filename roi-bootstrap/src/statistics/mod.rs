//! Feature mean, spread and norm estimated from a stratified sample.

mod cache;

pub use cache::*;

use crate::{
    accumulator::{NegativePool, PositivePool},
    common::*,
    config::StatisticsConfig,
};
use ndarray::ArrayViewMut2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStatistics {
    pub mean: Array1<f32>,
    pub std: Array1<f32>,
    pub mean_norm: f32,
}

impl FeatureStatistics {
    /// Estimate the statistics from rows sampled with replacement out of
    /// every non-empty positive pool and negative batch.
    pub fn compute<R>(
        positives: &PositivePool,
        negatives: &NegativePool,
        config: &StatisticsConfig,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let num_classes = positives.num_classes();
        let feature_dim = positives.feature_dim();
        ensure!(
            negatives.num_classes() == num_classes,
            "{} positive classes and {} negative classes",
            num_classes,
            negatives.num_classes()
        );
        ensure!(
            negatives.feature_dim() == feature_dim,
            "positive features of dimension {} and negative features of dimension {}",
            feature_dim,
            negatives.feature_dim()
        );

        let per_class = config.num_samples.get() as f64 / num_classes as f64;
        let take_from_pos = (per_class * config.pos_fraction.raw()).ceil() as usize;
        let take_from_neg =
            (per_class * config.neg_fraction.raw() / negatives.iterations() as f64).ceil() as usize;

        let mut sampled: Vec<f32> = vec![];
        let mut draw = |rows: ArrayView2<'_, f32>, count: usize, rng: &mut R| {
            if rows.nrows() == 0 {
                return;
            }
            (0..count).for_each(|_| {
                let index = rng.gen_range(0..rows.nrows());
                sampled.extend(rows.row(index).iter());
            });
        };

        for class in positives.classes() {
            draw(positives.class_features(class), take_from_pos, rng);
            for batch in negatives.batches(class) {
                draw(batch, take_from_neg, rng);
            }
        }

        let num_sampled = sampled.len() / feature_dim;
        ensure!(num_sampled > 0, "no feature available to compute statistics");
        let samples = Array2::from_shape_vec((num_sampled, feature_dim), sampled)?;
        let stats = Self::from_samples(samples.view())?;

        debug!(
            "feature statistics from {} samples, mean norm {}",
            num_sampled, stats.mean_norm
        );
        Ok(stats)
    }

    /// Statistics of all the given rows.
    pub fn from_samples(samples: ArrayView2<'_, f32>) -> Result<Self> {
        let mean = samples
            .mean_axis(Axis(0))
            .ok_or_else(|| format_err!("no sample to compute statistics"))?;
        let std = samples.std_axis(Axis(0), 0.0);
        let mean_norm = samples
            .outer_iter()
            .map(|row| row.dot(&row).sqrt())
            .sum::<f32>()
            / samples.nrows() as f32;
        ensure!(
            mean_norm.is_finite() && mean_norm > 0.0,
            "mean feature norm must be positive, but get {}",
            mean_norm
        );

        Ok(Self {
            mean,
            std,
            mean_norm,
        })
    }

    pub fn feature_dim(&self) -> usize {
        self.mean.len()
    }

    /// The factor applied to centered features.
    pub fn scale(&self, target_norm: f32) -> f32 {
        target_norm / self.mean_norm
    }

    /// Center the rows and rescale them to `target_norm` on average.
    pub fn z_scores(&self, features: ArrayView2<'_, f32>, target_norm: f32) -> Array2<f32> {
        let mut output = features.to_owned();
        self.normalize_inplace(&mut output.view_mut(), target_norm);
        output
    }

    pub fn normalize_inplace(&self, features: &mut ArrayViewMut2<'_, f32>, target_norm: f32) {
        let scale = self.scale(target_norm);
        features
            .outer_iter_mut()
            .for_each(|mut row| row.zip_mut_with(&self.mean, |value, &mean| {
                *value = (*value - mean) * scale;
            }));
    }

    pub fn validate(&self, feature_dim: usize) -> Result<()> {
        ensure!(
            self.mean.len() == feature_dim && self.std.len() == feature_dim,
            "expect statistics of dimension {}, but get mean of {} and std of {}",
            feature_dim,
            self.mean.len(),
            self.std.len()
        );
        ensure!(
            self.mean_norm.is_finite() && self.mean_norm > 0.0,
            "invalid mean norm {}",
            self.mean_norm
        );
        Ok(())
    }
}
