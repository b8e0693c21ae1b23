use super::FeatureStatistics;
use crate::{common::*, config::Role};
use getset::Getters;
use percent_encoding::NON_ALPHANUMERIC;

/// The outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<T> {
    Hit(T),
    Miss,
}

impl<T> CacheLookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    pub fn hit(self) -> Option<T> {
        match self {
            Self::Hit(value) => Some(value),
            Self::Miss => None,
        }
    }
}

/// Feature statistics stored on disk, keyed by the feature descriptor.
#[derive(Debug, Clone, Getters)]
pub struct StatisticsCache {
    #[get = "pub"]
    path: PathBuf,
}

impl StatisticsCache {
    pub fn new(cache_root: impl AsRef<Path>, descriptor: &str, role: Role) -> Self {
        let (dir_name, file_name) = match role {
            Role::Rpn => ("feat_cache_RPN", "rpn_stats"),
            Role::Detector => ("feat_cache", "stats"),
            Role::Segmentation => ("feat_cache", "segm_stats"),
        };
        let descriptor =
            percent_encoding::utf8_percent_encode(descriptor, NON_ALPHANUMERIC).to_string();
        let path = cache_root
            .as_ref()
            .join(dir_name)
            .join(descriptor)
            .join(file_name);
        Self { path }
    }

    /// Load cached statistics of dimension `feature_dim`.
    ///
    /// Missing, unreadable and mismatched entries are all misses.
    pub fn lookup(&self, feature_dim: usize) -> CacheLookup<FeatureStatistics> {
        if !self.path.is_file() {
            debug!("statistics cache miss at {}", self.path.display());
            return CacheLookup::Miss;
        }

        let load = || -> Result<_> {
            let text = fs::read_to_string(&self.path)?;
            let stats: FeatureStatistics = serde_json::from_str(&text)?;
            stats.validate(feature_dim)?;
            Ok(stats)
        };

        match load() {
            Ok(stats) => {
                info!("loaded feature statistics from {}", self.path.display());
                CacheLookup::Hit(stats)
            }
            Err(err) => {
                warn!(
                    "ignore invalid statistics cache {}: {:#}",
                    self.path.display(),
                    err
                );
                CacheLookup::Miss
            }
        }
    }

    pub fn store(&self, stats: &FeatureStatistics) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory {}", dir.display()))?;
        }
        let text = serde_json::to_string(stats)?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Return the cached statistics, or compute and cache them.
    ///
    /// A failure to write the cache is logged and the computed value is
    /// still returned.
    pub fn get_or_compute<F>(&self, feature_dim: usize, compute: F) -> Result<FeatureStatistics>
    where
        F: FnOnce() -> Result<FeatureStatistics>,
    {
        if let CacheLookup::Hit(stats) = self.lookup(feature_dim) {
            return Ok(stats);
        }

        let stats = compute()?;
        match self.store(&stats) {
            Ok(()) => info!("saved feature statistics to {}", self.path.display()),
            Err(err) => warn!("unable to save the statistics cache: {:#}", err),
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn stats() -> FeatureStatistics {
        FeatureStatistics {
            mean: array![0.5, 1.5],
            std: array![0.1, 0.2],
            mean_norm: 3.0,
        }
    }

    #[test]
    fn role_paths() {
        let rpn = StatisticsCache::new("/cache", "R50_ep1", Role::Rpn);
        assert_eq!(
            rpn.path(),
            Path::new("/cache/feat_cache_RPN/R50%5Fep1/rpn_stats")
        );
        let segm = StatisticsCache::new("/cache", "x", Role::Segmentation);
        assert_eq!(segm.path(), Path::new("/cache/feat_cache/x/segm_stats"));
    }

    #[test]
    fn miss_compute_then_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StatisticsCache::new(dir.path(), "desc", Role::Detector);
        assert_eq!(cache.lookup(2), CacheLookup::Miss);

        let computed = cache.get_or_compute(2, || Ok(stats())).unwrap();
        assert_eq!(computed, stats());
        assert!(cache.path().is_file());

        let cached = cache
            .get_or_compute(2, || bail!("must not recompute"))
            .unwrap();
        assert_eq!(cached, stats());

        // a different dimension does not match
        assert_eq!(cache.lookup(3), CacheLookup::Miss);
    }

    #[test]
    fn corrupt_cache_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StatisticsCache::new(dir.path(), "desc", Role::Rpn);
        fs::create_dir_all(cache.path().parent().unwrap()).unwrap();
        fs::write(cache.path(), "not json").unwrap();

        assert_eq!(cache.lookup(2), CacheLookup::Miss);
        let stats = cache.get_or_compute(2, || Ok(stats())).unwrap();
        assert_eq!(cache.lookup(2).hit(), Some(stats));
    }
}
