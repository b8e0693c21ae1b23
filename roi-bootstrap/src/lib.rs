//! Incremental minibootstrap sample accumulation for region classifiers.
//!
//! Images are processed one at a time. Each image's boxes are scored against
//! its ground truths, then the feature rows are routed into per-class
//! positive pools, bounded negative mini-batches and a box-regression
//! training set. The accumulated pools feed the external classifier and
//! regressor solvers.

mod common;
pub mod accumulator;
pub mod classifier;
pub mod config;
pub mod driver;
pub mod features;
pub mod overlap;
pub mod predictor;
pub mod regression;
pub mod sample;
pub mod snapshot;
pub mod statistics;

pub use accumulator::{
    NegativeMiningAccumulator, NegativePool, PositiveAccumulator, PositivePool,
};
pub use classifier::{
    ClassifierInput, ClassifierModel, ClassifierTrainer, FeatureExtractor,
    OnlineRegionClassifier, RegionClassifier, RegressorTrainer,
};
pub use config::{
    FeatureInfo, MinibootstrapConfig, Role, RunConfig, StatisticsConfig, ThresholdConfig,
};
pub use driver::{AccumulatedPools, ImageReport, TestBoxes, TrainingDriver};
pub use overlap::OverlapMatrix;
pub use predictor::{RefinedBoxes, RegionPredictor};
pub use regression::{BoxRegressionCodec, RegressionModel, RegressionSet};
pub use sample::{BoxSet, ImageSample};
pub use snapshot::SnapshotDir;
pub use statistics::{CacheLookup, FeatureStatistics, StatisticsCache};
