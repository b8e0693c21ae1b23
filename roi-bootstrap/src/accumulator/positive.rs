use super::check_features;
use crate::{
    common::*,
    config::ThresholdConfig,
    overlap::OverlapMatrix,
    regression::{BoxRegressionCodec, RegressionSet},
    sample::BoxSet,
};

/// Growable per-class buffers of positive feature rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositivePool {
    feature_dim: usize,
    classes: Vec<Vec<f32>>,
}

impl PositivePool {
    pub fn new(num_classes: usize, feature_dim: usize) -> Self {
        Self {
            feature_dim,
            classes: vec![vec![]; num_classes],
        }
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    pub fn push(&mut self, class: ClassId, feature: ArrayView1<'_, f32>) -> Result<()> {
        ensure!(
            feature.len() == self.feature_dim,
            "expect a feature of dimension {}, but get {}",
            self.feature_dim,
            feature.len()
        );
        let num_classes = self.classes.len();
        let buffer = self.classes.get_mut(class.index()).ok_or_else(|| {
            format_err!(
                "class {} exceeds the number of classes {}",
                class,
                num_classes
            )
        })?;
        buffer.extend(feature.iter());
        Ok(())
    }

    /// The number of rows of `class`.
    pub fn len(&self, class: ClassId) -> usize {
        self.classes
            .get(class.index())
            .map(|buffer| buffer.len() / self.feature_dim)
            .unwrap_or(0)
    }

    pub fn total_len(&self) -> usize {
        self.classes
            .iter()
            .map(|buffer| buffer.len() / self.feature_dim)
            .sum()
    }

    /// Rows of `class`, one per positive.
    pub fn class_features(&self, class: ClassId) -> ArrayView2<'_, f32> {
        let buffer: &[f32] = &self.classes[class.index()];
        let len = buffer.len() / self.feature_dim;
        ArrayView2::from_shape((len, self.feature_dim), buffer).unwrap()
    }

    pub fn classes(&self) -> impl Iterator<Item = ClassId> {
        (0..self.classes.len()).map(ClassId::from_index)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.feature_dim > 0, "feature_dim must be positive");
        for (index, buffer) in self.classes.iter().enumerate() {
            ensure!(
                buffer.len() % self.feature_dim == 0,
                "positive buffer of class {} is not a whole number of rows",
                ClassId::from_index(index)
            );
        }
        Ok(())
    }
}

/// What a single image added to the positive side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositiveUpdate {
    pub positives: usize,
    pub regression_examples: usize,
}

/// Collects ground-truth positives and box-regression examples.
#[derive(Debug, Clone)]
pub struct PositiveAccumulator {
    codec: BoxRegressionCodec,
    regression_overlap: f32,
    pool: PositivePool,
    regression: RegressionSet,
}

impl PositiveAccumulator {
    pub fn new(
        num_classes: usize,
        feature_dim: usize,
        thresholds: &ThresholdConfig,
        codec: BoxRegressionCodec,
    ) -> Self {
        Self {
            codec,
            regression_overlap: thresholds.regression_overlap.raw() as f32,
            pool: PositivePool::new(num_classes, feature_dim),
            regression: RegressionSet::new(feature_dim),
        }
    }

    pub fn accumulate(
        &mut self,
        boxes: &BoxSet,
        overlaps: &OverlapMatrix,
        features: ArrayView2<'_, f32>,
    ) -> Result<PositiveUpdate> {
        check_features(features, boxes.len(), self.pool.feature_dim())?;
        ensure!(
            overlaps.num_boxes() == boxes.len(),
            "overlap matrix has {} rows for {} boxes",
            overlaps.num_boxes(),
            boxes.len()
        );

        let mut update = PositiveUpdate::default();

        for (gt_index, (gt, class)) in boxes.gt_boxes().enumerate() {
            self.pool.push(class, features.row(gt_index))?;
            update.positives += 1;

            for (box_index, &overlap) in overlaps.gt_column(gt_index).iter().enumerate() {
                if overlap <= self.regression_overlap {
                    continue;
                }

                let candidate = &boxes.boxes[box_index];
                let target = match self.codec.try_encode(candidate, gt) {
                    Ok(target) => target,
                    Err(err) => {
                        debug!("skip regression example {}: {}", box_index, err);
                        continue;
                    }
                };
                self.regression
                    .push(features.row(box_index), target, class, overlap);
                update.regression_examples += 1;
            }
        }

        Ok(update)
    }

    pub fn pool(&self) -> &PositivePool {
        &self.pool
    }

    pub fn regression(&self) -> &RegressionSet {
        &self.regression
    }

    pub fn into_parts(self) -> (PositivePool, RegressionSet) {
        (self.pool, self.regression)
    }
}
