//! The per-run orchestration of overlap scoring and sample accumulation.

use crate::{
    accumulator::{NegativeMiningAccumulator, NegativePool, PositiveAccumulator, PositivePool},
    classifier::FeatureExtractor,
    common::*,
    config::{MinibootstrapConfig, Role, StatisticsConfig, ThresholdConfig},
    overlap::OverlapMatrix,
    regression::{BoxRegressionCodec, RegressionSet},
    sample::ImageSample,
    statistics::{FeatureStatistics, StatisticsCache},
};

/// What one image contributed to the accumulators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReport {
    pub positives: usize,
    pub regression_examples: usize,
    pub negatives: usize,
    /// Classes whose negative batches became full on this image.
    pub completed: Vec<ClassId>,
    /// True once every class has all of its negative batches.
    pub all_complete: bool,
}

/// The preprocessed boxes and feature rows of one test image.
#[derive(Debug, Clone)]
pub struct TestBoxes {
    pub image_size: HW<f32>,
    pub boxes: Vec<TLBR<f32>>,
    pub features: Array2<f32>,
    pub is_gt: Vec<bool>,
}

impl TestBoxes {
    /// Indices of the boxes that are not ground truths.
    pub fn proposal_indices(&self) -> Vec<usize> {
        self.is_gt.iter().positions(|&is_gt| !is_gt).collect()
    }
}

/// The output of a training pass, moved out of the driver.
#[derive(Debug, Clone)]
pub struct AccumulatedPools {
    pub role: Role,
    pub positives: PositivePool,
    pub negatives: NegativePool,
    pub regression: RegressionSet,
}

impl AccumulatedPools {
    /// Positive pools made of every regression example instead of the
    /// ground truths only.
    pub fn regression_positives(&self) -> Result<PositivePool> {
        self.regression
            .to_positive_pool(self.positives.num_classes())
    }

    pub fn validate(&self) -> Result<()> {
        self.positives.validate()?;
        self.negatives.validate()?;
        self.regression.validate()?;
        ensure!(
            self.positives.num_classes() == self.negatives.num_classes(),
            "positive and negative pools disagree on the number of classes"
        );
        ensure!(
            self.positives.feature_dim() == self.negatives.feature_dim()
                && self.positives.feature_dim() == self.regression.feature_dim(),
            "pools disagree on the feature dimension"
        );
        Ok(())
    }
}

/// Feeds images one by one into the positive and negative accumulators of
/// a role.
#[derive(Debug)]
pub struct TrainingDriver {
    role: Role,
    config: MinibootstrapConfig,
    format: CoordFormat,
    rng: StdRng,
    positives: PositiveAccumulator,
    negatives: NegativeMiningAccumulator,
    num_images: usize,
}

impl TrainingDriver {
    /// Create a driver. Sampling is reproducible when `seed` is set.
    pub fn new(
        role: Role,
        config: MinibootstrapConfig,
        thresholds: &ThresholdConfig,
        format: CoordFormat,
        seed: Option<u64>,
    ) -> Result<Self> {
        thresholds.validate()?;

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let codec = BoxRegressionCodec::new(format);
        let positives = PositiveAccumulator::new(
            config.num_classes.get(),
            config.feature_dim.get(),
            thresholds,
            codec,
        );
        let negatives = NegativeMiningAccumulator::new(&config, thresholds);

        Ok(Self {
            role,
            config,
            format,
            rng,
            positives,
            negatives,
            num_images: 0,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn format(&self) -> CoordFormat {
        self.format
    }

    pub fn num_images(&self) -> usize {
        self.num_images
    }

    pub fn is_complete(&self) -> bool {
        self.negatives.all_complete()
    }

    pub fn positives(&self) -> &PositiveAccumulator {
        &self.positives
    }

    pub fn negatives(&self) -> &NegativeMiningAccumulator {
        &self.negatives
    }

    /// Extract the features of an image and accumulate them.
    pub fn process_image<E>(
        &mut self,
        extractor: &mut E,
        image: &E::Image,
        sample: &ImageSample,
    ) -> Result<ImageReport>
    where
        E: FeatureExtractor,
    {
        let features = extractor.extract(image, &sample.raw_boxes())?;
        self.process_features(sample, features.view())
    }

    /// Accumulate one image whose feature rows are already known.
    ///
    /// `features` has one row per box, ground truths first, in the order of
    /// [ImageSample::raw_boxes].
    pub fn process_features(
        &mut self,
        sample: &ImageSample,
        features: ArrayView2<'_, f32>,
    ) -> Result<ImageReport> {
        self.check_features(sample, features)?;

        let boxes = sample.prepare(self.format);
        let overlaps = OverlapMatrix::compute(self.format, &boxes, self.config.num_classes.get())?;
        let positive = self.positives.accumulate(&boxes, &overlaps, features)?;
        let negative = self
            .negatives
            .accumulate(&boxes, &overlaps, features, &mut self.rng)?;
        self.num_images += 1;

        let all_complete = self.negatives.all_complete();
        if !negative.completed.is_empty() {
            info!(
                "{} image {}: {} of {} classes have complete negatives",
                self.role,
                self.num_images,
                self.config.num_classes.get() - self.negatives.incomplete_classes().count(),
                self.config.num_classes.get()
            );
        }
        debug!(
            "{} image {}: {} positives, {} regression examples, {} negatives",
            self.role,
            self.num_images,
            positive.positives,
            positive.regression_examples,
            negative.added
        );

        Ok(ImageReport {
            positives: positive.positives,
            regression_examples: positive.regression_examples,
            negatives: negative.added,
            completed: negative.completed,
            all_complete,
        })
    }

    /// Extract the features of a test image and record them for prediction.
    pub fn test_image<E>(
        &self,
        extractor: &mut E,
        image: &E::Image,
        sample: &ImageSample,
    ) -> Result<TestBoxes>
    where
        E: FeatureExtractor,
    {
        let features = extractor.extract(image, &sample.raw_boxes())?;
        self.test_features(sample, features)
    }

    pub fn test_features(&self, sample: &ImageSample, features: Array2<f32>) -> Result<TestBoxes> {
        self.check_features(sample, features.view())?;
        let boxes = sample.prepare(self.format);
        let is_gt = boxes.gt_mask();

        Ok(TestBoxes {
            image_size: boxes.image_size,
            boxes: boxes.boxes,
            features,
            is_gt,
        })
    }

    /// Statistics of the pools accumulated so far, drawn with the driver's
    /// random generator.
    pub fn compute_statistics(&mut self, config: &StatisticsConfig) -> Result<FeatureStatistics> {
        FeatureStatistics::compute(
            self.positives.pool(),
            self.negatives.pool(),
            config,
            &mut self.rng,
        )
    }

    /// Like [TrainingDriver::compute_statistics], served from the cache when possible.
    pub fn cached_statistics(
        &mut self,
        cache: &StatisticsCache,
        config: &StatisticsConfig,
    ) -> Result<FeatureStatistics> {
        let feature_dim = self.config.feature_dim.get();
        let Self {
            positives,
            negatives,
            rng,
            ..
        } = self;
        cache.get_or_compute(feature_dim, || {
            FeatureStatistics::compute(positives.pool(), negatives.pool(), config, rng)
        })
    }

    pub fn finish(self) -> AccumulatedPools {
        let (positives, regression) = self.positives.into_parts();
        AccumulatedPools {
            role: self.role,
            positives,
            negatives: self.negatives.into_pool(),
            regression,
        }
    }

    fn check_features(&self, sample: &ImageSample, features: ArrayView2<'_, f32>) -> Result<()> {
        ensure!(
            features.nrows() == sample.num_boxes(),
            "expect {} feature rows, one per box, but get {}",
            sample.num_boxes(),
            features.nrows()
        );
        ensure!(
            features.ncols() == self.config.feature_dim.get(),
            "expect features of dimension {}, but get {}",
            self.config.feature_dim,
            features.ncols()
        );
        Ok(())
    }
}
