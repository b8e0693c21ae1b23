//! Accumulation and run configuration.

use crate::common::*;

/// The pipeline stage a classifier is trained for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Region proposal network.
    Rpn,
    /// Object detector.
    Detector,
    /// Segmentation head.
    Segmentation,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Rpn, Role::Detector, Role::Segmentation];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Rpn => "rpn",
            Self::Detector => "detector",
            Self::Segmentation => "segmentation",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Minibootstrap options of one role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinibootstrapConfig {
    /// The number of object classes, excluding background.
    pub num_classes: NonZeroUsize,
    /// The number of negative mini-batches per class.
    pub iterations: NonZeroUsize,
    /// The capacity of each negative mini-batch.
    pub batch_size: NonZeroUsize,
    /// The number of negatives drawn per class from each image.
    pub negatives_per_batch: NonZeroUsize,
    /// The length of a feature vector.
    pub feature_dim: NonZeroUsize,
}

impl MinibootstrapConfig {
    /// The number of negatives a class holds once complete.
    pub fn negative_capacity(&self) -> usize {
        self.iterations.get() * self.batch_size.get()
    }
}

/// Overlap thresholds for sample selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Boxes overlapping a ground truth above this value become regression examples.
    #[serde(default = "default_regression_overlap")]
    pub regression_overlap: R64,
    /// Boxes overlapping a present class below this value are hard negatives.
    #[serde(default = "default_negative_overlap")]
    pub negative_overlap: R64,
}

impl ThresholdConfig {
    pub fn validate(&self) -> Result<()> {
        let unit = r64(0.0)..=r64(1.0);
        ensure!(
            unit.contains(&self.regression_overlap),
            "regression_overlap must be within [0, 1]"
        );
        ensure!(
            unit.contains(&self.negative_overlap),
            "negative_overlap must be within [0, 1]"
        );
        Ok(())
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            regression_overlap: default_regression_overlap(),
            negative_overlap: default_negative_overlap(),
        }
    }
}

/// Feature statistics sampling options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// The total sample budget.
    #[serde(default = "default_num_samples")]
    pub num_samples: NonZeroUsize,
    /// The share of the budget drawn from positives.
    #[serde(default = "default_pos_fraction")]
    pub pos_fraction: R64,
    /// The share of the budget drawn from negatives.
    #[serde(default = "default_neg_fraction")]
    pub neg_fraction: R64,
    /// The feature norm after normalization.
    #[serde(default = "default_target_norm")]
    pub target_norm: R64,
}

impl StatisticsConfig {
    pub fn validate(&self) -> Result<()> {
        let unit = r64(0.0)..=r64(1.0);
        ensure!(
            unit.contains(&self.pos_fraction) && unit.contains(&self.neg_fraction),
            "pos_fraction and neg_fraction must be within [0, 1]"
        );
        ensure!(
            self.pos_fraction + self.neg_fraction > 0.0,
            "pos_fraction and neg_fraction must not both be zero"
        );
        ensure!(self.target_norm > 0.0, "target_norm must be positive");
        Ok(())
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            num_samples: default_num_samples(),
            pos_fraction: default_pos_fraction(),
            neg_fraction: default_neg_fraction(),
            target_norm: default_target_norm(),
        }
    }
}

/// Describes where the features come from. It keys the statistics cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureInfo {
    pub backbone: String,
    pub num_epochs: usize,
    pub feat_task_name: String,
    pub target_task_name: String,
    #[serde(default)]
    pub detector_with_online_rpn: bool,
}

impl FeatureInfo {
    pub fn descriptor(&self) -> String {
        let Self {
            backbone,
            num_epochs,
            feat_task_name,
            target_task_name,
            detector_with_online_rpn,
        } = self;

        let mut descriptor = format!(
            "{}_ep{}_FT{}_TT{}",
            backbone, num_epochs, feat_task_name, target_task_name
        );
        if *detector_with_online_rpn {
            descriptor.push_str("_RPN_online");
        }
        descriptor
    }
}

/// Which stages are trained, loaded or saved in a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Run only the online detection stage and keep the RPN as is.
    pub only_online_detection: bool,
    pub load_rpn_models: bool,
    pub save_rpn_models: bool,
    pub load_detector_models: bool,
    pub save_detector_models: bool,
    pub load_segmentation_models: bool,
    pub save_segmentation_models: bool,
    /// Train detector classifiers on ground-truth positives only, instead of
    /// every regression example.
    pub use_only_gt_positives: bool,
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.only_online_detection && self.load_rpn_models {
            bail!(
                "inconsistent run configuration: RPN models cannot be loaded \
                 when only the online object detection is run"
            );
        }
        if self.only_online_detection && self.save_rpn_models {
            bail!(
                "inconsistent run configuration: RPN models cannot be saved \
                 when only the online object detection is run"
            );
        }
        Ok(())
    }

    /// True if the role takes part in this run.
    pub fn is_enabled(&self, role: Role) -> bool {
        !(role == Role::Rpn && self.only_online_detection)
    }

    pub fn load_models(&self, role: Role) -> bool {
        match role {
            Role::Rpn => self.load_rpn_models,
            Role::Detector => self.load_detector_models,
            Role::Segmentation => self.load_segmentation_models,
        }
    }

    pub fn save_models(&self, role: Role) -> bool {
        match role {
            Role::Rpn => self.save_rpn_models,
            Role::Detector => self.save_detector_models,
            Role::Segmentation => self.save_segmentation_models,
        }
    }
}

fn default_regression_overlap() -> R64 {
    r64(0.6)
}

fn default_negative_overlap() -> R64 {
    r64(0.3)
}

fn default_num_samples() -> NonZeroUsize {
    NonZeroUsize::new(4000).unwrap()
}

fn default_pos_fraction() -> R64 {
    r64(0.1)
}

fn default_neg_fraction() -> R64 {
    r64(0.9)
}

fn default_target_norm() -> R64 {
    r64(20.0)
}
