use crate::{accumulator::PositivePool, common::*, statistics::FeatureStatistics};

/// Box-regression training examples.
///
/// Four parallel sequences: feature rows `X`, encoded targets `Y`, class ids
/// `C` and overlaps `O` against the matched ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionSet {
    feature_dim: usize,
    features: Vec<f32>,
    targets: Vec<[f32; 4]>,
    classes: Vec<ClassId>,
    overlaps: Vec<f32>,
}

impl RegressionSet {
    pub fn new(feature_dim: usize) -> Self {
        Self {
            feature_dim,
            features: vec![],
            targets: vec![],
            classes: vec![],
            overlaps: vec![],
        }
    }

    pub fn push(
        &mut self,
        feature: ArrayView1<'_, f32>,
        target: [f32; 4],
        class: ClassId,
        overlap: f32,
    ) {
        debug_assert_eq!(feature.len(), self.feature_dim);
        self.features.extend(feature.iter());
        self.targets.push(target);
        self.classes.push(class);
        self.overlaps.push(overlap);
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// `X`: one feature row per example.
    pub fn features(&self) -> ArrayView2<'_, f32> {
        ArrayView2::from_shape((self.len(), self.feature_dim), &self.features).unwrap()
    }

    /// `Y`: the `(dx, dy, dw, dh)` target of each example.
    pub fn targets(&self) -> &[[f32; 4]] {
        &self.targets
    }

    /// `C`: the ground-truth class of each example.
    pub fn classes(&self) -> &[ClassId] {
        &self.classes
    }

    /// `O`: the overlap of each example with its ground truth.
    pub fn overlaps(&self) -> &[f32] {
        &self.overlaps
    }

    /// Examples of a single class as `(X, Y, O)` matrices.
    pub fn class_subset(&self, class: ClassId) -> (Array2<f32>, Array2<f32>, Array1<f32>) {
        let indices: Vec<_> = self
            .classes
            .iter()
            .positions(|&other| other == class)
            .collect();

        let features = self.features().select(Axis(0), &indices);
        let targets = Array2::from_shape_fn((indices.len(), 4), |(row, col)| {
            self.targets[indices[row]][col]
        });
        let overlaps = indices.iter().map(|&index| self.overlaps[index]).collect();

        (features, targets, overlaps)
    }

    /// Normalize `X` in place with the statistics.
    pub fn normalize(&mut self, stats: &FeatureStatistics, target_norm: f32) -> Result<()> {
        ensure!(
            stats.feature_dim() == self.feature_dim,
            "statistics of dimension {} do not match features of dimension {}",
            stats.feature_dim(),
            self.feature_dim
        );

        let len = self.len();
        let feature_dim = self.feature_dim;
        let mut features =
            ndarray::ArrayViewMut2::from_shape((len, feature_dim), &mut self.features)?;
        stats.normalize_inplace(&mut features, target_norm);
        Ok(())
    }

    /// Build per-class positive pools out of every regression example.
    pub fn to_positive_pool(&self, num_classes: usize) -> Result<PositivePool> {
        let mut pool = PositivePool::new(num_classes, self.feature_dim);
        for (feature, &class) in self.features().outer_iter().zip(&self.classes) {
            pool.push(class, feature)?;
        }
        Ok(pool)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let len = self.classes.len();
        ensure!(
            self.targets.len() == len
                && self.overlaps.len() == len
                && self.features.len() == len * self.feature_dim,
            "regression set sequences have inconsistent lengths"
        );
        Ok(())
    }
}
