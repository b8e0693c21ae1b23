//! Interfaces to the feature backbone and the external solvers, and the
//! region classifier built on them.

use crate::{
    accumulator::{NegativePool, PositivePool},
    common::*,
    config::Role,
    driver::TestBoxes,
    regression::{RegressionModel, RegressionSet},
    snapshot::SnapshotDir,
    statistics::FeatureStatistics,
};

/// Computes one feature row per box of an image.
pub trait FeatureExtractor {
    type Image;

    fn extract(&mut self, image: &Self::Image, boxes: &[TLBR<f32>]) -> Result<Array2<f32>>;
}

/// A trained one-vs-rest classifier of a single class.
pub trait ClassifierModel {
    fn score(&self, features: ArrayView2<'_, f32>) -> Result<Array1<f32>>;
}

/// The training data handed to a [ClassifierTrainer].
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    pub positives: &'a PositivePool,
    pub negatives: &'a NegativePool,
    pub statistics: &'a FeatureStatistics,
    pub target_norm: f32,
}

impl<'a> ClassifierInput<'a> {
    pub fn num_classes(&self) -> usize {
        self.positives.num_classes()
    }

    /// Normalized positive rows of `class`.
    pub fn positives(&self, class: ClassId) -> Array2<f32> {
        self.statistics
            .z_scores(self.positives.class_features(class), self.target_norm)
    }

    /// Normalized rows of one negative batch of `class`.
    pub fn negative_batch(&self, class: ClassId, batch: usize) -> Array2<f32> {
        self.statistics
            .z_scores(self.negatives.batch(class, batch), self.target_norm)
    }

    /// Normalized negative rows of `class` over all batches.
    pub fn negatives(&self, class: ClassId) -> Array2<f32> {
        self.statistics
            .z_scores(self.negatives.class_features(class).view(), self.target_norm)
    }
}

/// The kernel classifier solver.
pub trait ClassifierTrainer {
    type Model: ClassifierModel;

    /// Train one model per class, in class order.
    fn train(&mut self, input: ClassifierInput<'_>) -> Result<Vec<Self::Model>>;
}

/// The box regressor solver.
pub trait RegressorTrainer {
    fn train(&mut self, role: Role, examples: RegressionSet) -> Result<Vec<RegressionModel>>;
}

/// A per-role region classifier.
pub trait RegionClassifier {
    type Model;

    fn role(&self) -> Role;

    /// Restore a trained classifier from a snapshot.
    fn load(&mut self, snapshot: &SnapshotDir) -> Result<()>;

    fn train(&mut self, positives: &PositivePool, negatives: &NegativePool) -> Result<()>;

    /// Score the boxes of each recorded test image.
    fn test(&self, images: &[TestBoxes]) -> Result<Vec<Array2<f32>>>;

    /// Score feature rows, one column per class.
    fn predict(&self, features: ArrayView2<'_, f32>) -> Result<Array2<f32>>;
}

/// Trains per-class models online from the accumulated pools.
#[derive(Debug)]
pub struct OnlineRegionClassifier<T>
where
    T: ClassifierTrainer,
{
    role: Role,
    trainer: T,
    statistics: FeatureStatistics,
    target_norm: f32,
    models: Vec<T::Model>,
}

impl<T> OnlineRegionClassifier<T>
where
    T: ClassifierTrainer,
{
    pub fn new(role: Role, trainer: T, statistics: FeatureStatistics, target_norm: f32) -> Self {
        Self {
            role,
            trainer,
            statistics,
            target_norm,
            models: vec![],
        }
    }

    pub fn models(&self) -> &[T::Model] {
        &self.models
    }

    pub fn statistics(&self) -> &FeatureStatistics {
        &self.statistics
    }

    pub fn save(&self, snapshot: &SnapshotDir) -> Result<()>
    where
        T::Model: Serialize,
    {
        snapshot.save_classifier(self.role, &self.models)?;
        snapshot.save_stats(self.role, &self.statistics)?;
        Ok(())
    }
}

impl<T> RegionClassifier for OnlineRegionClassifier<T>
where
    T: ClassifierTrainer,
    T::Model: DeserializeOwned,
{
    type Model = T::Model;

    fn role(&self) -> Role {
        self.role
    }

    fn load(&mut self, snapshot: &SnapshotDir) -> Result<()> {
        let statistics = snapshot.load_stats(self.role)?;
        ensure!(
            statistics.feature_dim() == self.statistics.feature_dim(),
            "loaded statistics have dimension {}, but expect {}",
            statistics.feature_dim(),
            self.statistics.feature_dim()
        );
        self.models = snapshot.load_classifier(self.role)?;
        self.statistics = statistics;
        info!("loaded {} {} classifiers", self.models.len(), self.role);
        Ok(())
    }

    fn train(&mut self, positives: &PositivePool, negatives: &NegativePool) -> Result<()> {
        let input = ClassifierInput {
            positives,
            negatives,
            statistics: &self.statistics,
            target_norm: self.target_norm,
        };
        let models = self.trainer.train(input)?;
        ensure!(
            models.len() == positives.num_classes(),
            "the trainer returns {} models for {} classes",
            models.len(),
            positives.num_classes()
        );
        info!("trained {} {} classifiers", models.len(), self.role);
        self.models = models;
        Ok(())
    }

    fn test(&self, images: &[TestBoxes]) -> Result<Vec<Array2<f32>>> {
        images
            .iter()
            .map(|image| self.predict(image.features.view()))
            .collect()
    }

    fn predict(&self, features: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        ensure!(!self.models.is_empty(), "the classifier is not trained yet");
        let features = self.statistics.z_scores(features, self.target_norm);

        let mut scores = Array2::zeros((features.nrows(), self.models.len()));
        for (mut column, model) in scores.axis_iter_mut(Axis(1)).zip(&self.models) {
            let score = model.score(features.view())?;
            ensure!(
                score.len() == features.nrows(),
                "a model returns {} scores for {} rows",
                score.len(),
                features.nrows()
            );
            column.assign(&score);
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Scores rows by their projection on the gap between class means.
    #[derive(Debug, Serialize, Deserialize)]
    struct Centroid {
        direction: Array1<f32>,
    }

    impl ClassifierModel for Centroid {
        fn score(&self, features: ArrayView2<'_, f32>) -> Result<Array1<f32>> {
            Ok(features.dot(&self.direction))
        }
    }

    struct CentroidTrainer;

    impl ClassifierTrainer for CentroidTrainer {
        type Model = Centroid;

        fn train(&mut self, input: ClassifierInput<'_>) -> Result<Vec<Centroid>> {
            (0..input.num_classes())
                .map(|index| {
                    let class = ClassId::from_index(index);
                    let pos = input
                        .positives(class)
                        .mean_axis(Axis(0))
                        .ok_or_else(|| format_err!("no positive"))?;
                    let neg = input
                        .negatives(class)
                        .mean_axis(Axis(0))
                        .ok_or_else(|| format_err!("no negative"))?;
                    Ok(Centroid {
                        direction: pos - neg,
                    })
                })
                .collect()
        }
    }

    fn pools() -> (PositivePool, NegativePool) {
        let mut positives = PositivePool::new(1, 2);
        positives
            .push(ClassId::new(1).unwrap(), array![4.0, 0.0].view())
            .unwrap();
        let mut negatives = NegativePool::new(1, 1, 1, 2);
        negatives.push(ClassId::new(1).unwrap(), 0, array![0.0, 4.0].view());
        (positives, negatives)
    }

    fn statistics() -> FeatureStatistics {
        FeatureStatistics {
            mean: array![2.0, 2.0],
            std: array![2.0, 2.0],
            mean_norm: 4.0,
        }
    }

    #[test]
    fn train_and_score() {
        let (positives, negatives) = pools();
        let mut classifier =
            OnlineRegionClassifier::new(Role::Detector, CentroidTrainer, statistics(), 4.0);
        assert!(classifier.predict(array![[1.0, 1.0]].view()).is_err());

        classifier.train(&positives, &negatives).unwrap();
        let scores = classifier
            .predict(array![[4.0, 0.0], [0.0, 4.0]].view())
            .unwrap();
        assert_eq!(scores.shape(), &[2, 1]);
        assert!(scores[[0, 0]] > 0.0);
        assert!(scores[[1, 0]] < 0.0);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotDir::new(dir.path());
        let (positives, negatives) = pools();

        let mut trained =
            OnlineRegionClassifier::new(Role::Rpn, CentroidTrainer, statistics(), 4.0);
        trained.train(&positives, &negatives).unwrap();
        trained.save(&snapshot).unwrap();

        let mut loaded =
            OnlineRegionClassifier::new(Role::Rpn, CentroidTrainer, statistics(), 4.0);
        loaded.load(&snapshot).unwrap();
        assert_eq!(loaded.models().len(), 1);

        let test = TestBoxes {
            image_size: HW::from_hw([10.0, 10.0]),
            boxes: vec![TLBR::from_xyxy([0.0, 0.0, 5.0, 5.0])],
            features: array![[4.0, 0.0]],
            is_gt: vec![false],
        };
        assert_eq!(
            loaded.test(&[test.clone()]).unwrap(),
            trained.test(&[test]).unwrap()
        );
    }
}
