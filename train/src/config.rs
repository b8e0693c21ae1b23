//! Training program configuration format.

use crate::common::*;

pub use roles::*;

/// The main training configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory of per-image record files.
    pub records_dir: PathBuf,
    /// Each run saves its snapshots in a timestamped directory under it.
    pub output_dir: PathBuf,
    /// Root of the feature statistics cache.
    pub cache_dir: PathBuf,
    /// Snapshot directory of a previous run, used by roles whose models are loaded.
    #[serde(default)]
    pub load_dir: Option<PathBuf>,
    pub coord_format: CoordFormat,
    /// Seed of the sampling generator. Sampling is not reproducible if unset.
    #[serde(default)]
    pub seed: Option<u64>,
    pub feature_info: FeatureInfo,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub statistics: StatisticsConfig,
    #[serde(default)]
    pub run: RunConfig,
    pub roles: RolesConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = fs::read_to_string(path)?;
        let config: Self = json5::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        self.statistics.validate()?;
        self.run.validate()?;

        for role in Role::ALL {
            let role_config = match self.roles.get(role) {
                Some(role_config) => role_config,
                None => continue,
            };
            if let Some(statistics) = &role_config.statistics {
                statistics
                    .validate()
                    .with_context(|| format!("invalid statistics options of {}", role))?;
            }
            ensure!(
                !(self.run.load_models(role) && self.load_dir.is_none()),
                "load_dir must be set to load the {} models",
                role
            );
        }

        let enabled = Role::ALL
            .iter()
            .filter(|&&role| self.run.is_enabled(role) && self.roles.get(role).is_some())
            .count();
        ensure!(enabled > 0, "no role is configured for this run");

        Ok(())
    }

    /// The statistics options of a role.
    pub fn statistics(&self, role: Role) -> &StatisticsConfig {
        self.roles
            .get(role)
            .and_then(|role_config| role_config.statistics.as_ref())
            .unwrap_or(&self.statistics)
    }
}

mod roles {
    use super::*;

    /// Per-role options. Roles left unset are skipped.
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct RolesConfig {
        #[serde(default)]
        pub rpn: Option<RoleConfig>,
        #[serde(default)]
        pub detector: Option<RoleConfig>,
        #[serde(default)]
        pub segmentation: Option<RoleConfig>,
    }

    impl RolesConfig {
        pub fn get(&self, role: Role) -> Option<&RoleConfig> {
            match role {
                Role::Rpn => self.rpn.as_ref(),
                Role::Detector => self.detector.as_ref(),
                Role::Segmentation => self.segmentation.as_ref(),
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct RoleConfig {
        /// Directory of the per-image feature files.
        pub features_dir: PathBuf,
        /// The feature file format name, `json` or `raw`.
        pub features_format: String,
        pub minibootstrap: MinibootstrapConfig,
        /// Overrides the global statistics options.
        #[serde(default)]
        pub statistics: Option<StatisticsConfig>,
    }
}
