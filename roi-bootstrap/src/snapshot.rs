//! Per-role model, statistics and pool snapshots on disk.

use crate::{
    accumulator::{NegativePool, PositivePool},
    common::*,
    config::Role,
    driver::AccumulatedPools,
    regression::{RegressionModel, RegressionSet},
    statistics::FeatureStatistics,
};
use getset::Getters;

/// A directory holding the snapshots of a run.
#[derive(Debug, Clone, Getters)]
pub struct SnapshotDir {
    #[get = "pub"]
    dir: PathBuf,
}

impl SnapshotDir {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_owned(),
        }
    }

    pub fn classifier_path(&self, role: Role) -> PathBuf {
        self.dir.join(format!("classifier_{}.json", role))
    }

    pub fn regressor_path(&self, role: Role) -> PathBuf {
        self.dir.join(format!("regressor_{}.json", role))
    }

    pub fn stats_path(&self, role: Role) -> PathBuf {
        self.dir.join(format!("stats_{}.json", role))
    }

    pub fn pools_dir(&self, role: Role) -> PathBuf {
        self.dir.join(format!("features_{}", role))
    }

    pub fn save_classifier<M>(&self, role: Role, models: &[M]) -> Result<()>
    where
        M: Serialize,
    {
        save_json(&self.classifier_path(role), &models)
    }

    pub fn load_classifier<M>(&self, role: Role) -> Result<Vec<M>>
    where
        M: DeserializeOwned,
    {
        load_json(&self.classifier_path(role))
    }

    pub fn save_regressor(&self, role: Role, models: &[RegressionModel]) -> Result<()> {
        save_json(&self.regressor_path(role), &models)
    }

    pub fn load_regressor(&self, role: Role) -> Result<Vec<RegressionModel>> {
        let path = self.regressor_path(role);
        let models: Vec<RegressionModel> = load_json(&path)?;
        for model in &models {
            model
                .validate()
                .with_context(|| format!("invalid regression model in {}", path.display()))?;
        }
        Ok(models)
    }

    pub fn save_stats(&self, role: Role, stats: &FeatureStatistics) -> Result<()> {
        save_json(&self.stats_path(role), stats)
    }

    pub fn load_stats(&self, role: Role) -> Result<FeatureStatistics> {
        let path = self.stats_path(role);
        let stats: FeatureStatistics = load_json(&path)?;
        stats
            .validate(stats.feature_dim())
            .with_context(|| format!("invalid statistics in {}", path.display()))?;
        Ok(stats)
    }

    /// Save the accumulated pools under `features_<role>/`.
    pub fn save_pools(&self, pools: &AccumulatedPools) -> Result<()> {
        let dir = self.pools_dir(pools.role);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
        save_json(&dir.join("positives.json"), &pools.positives)?;
        save_json(&dir.join("negatives.json"), &pools.negatives)?;
        save_json(&dir.join("regression.json"), &pools.regression)?;
        info!("saved {} pools to {}", pools.role, dir.display());
        Ok(())
    }

    pub fn load_pools(&self, role: Role) -> Result<AccumulatedPools> {
        let dir = self.pools_dir(role);
        let positives: PositivePool = load_json(&dir.join("positives.json"))?;
        let negatives: NegativePool = load_json(&dir.join("negatives.json"))?;
        let regression: RegressionSet = load_json(&dir.join("regression.json"))?;

        let pools = AccumulatedPools {
            role,
            positives,
            negatives,
            regression,
        };
        pools
            .validate()
            .with_context(|| format!("invalid pools in {}", dir.display()))?;
        Ok(pools)
    }
}

fn save_json<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let text = serde_json::to_string(value)?;
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn load_json<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regressor_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotDir::new(dir.path());
        let models = vec![RegressionModel::identity(ClassId::new(1).unwrap())];

        snapshot.save_regressor(Role::Detector, &models).unwrap();
        assert!(dir.path().join("regressor_detector.json").is_file());
        assert_eq!(snapshot.load_regressor(Role::Detector).unwrap(), models);
        assert!(snapshot.load_regressor(Role::Rpn).is_err());
    }

    #[test]
    fn pools_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotDir::new(dir.path());

        let mut positives = PositivePool::new(2, 1);
        positives
            .push(ClassId::new(2).unwrap(), Array1::from(vec![3.0]).view())
            .unwrap();
        let pools = AccumulatedPools {
            role: Role::Segmentation,
            positives,
            negatives: NegativePool::new(2, 2, 3, 1),
            regression: RegressionSet::new(1),
        };
        snapshot.save_pools(&pools).unwrap();
        assert!(dir.path().join("features_segmentation").is_dir());

        let loaded = snapshot.load_pools(Role::Segmentation).unwrap();
        assert_eq!(loaded.positives, pools.positives);
        assert_eq!(loaded.negatives, pools.negatives);
        assert_eq!(loaded.regression, pools.regression);
    }

    #[test]
    fn reject_inconsistent_pools() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotDir::new(dir.path());
        let pools = AccumulatedPools {
            role: Role::Rpn,
            positives: PositivePool::new(2, 4),
            negatives: NegativePool::new(3, 1, 1, 4),
            regression: RegressionSet::new(4),
        };
        snapshot.save_pools(&pools).unwrap();
        assert!(snapshot.load_pools(Role::Rpn).is_err());
    }
}
