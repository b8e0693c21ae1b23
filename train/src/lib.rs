//! The training program of the minibootstrap accumulation pipeline.

pub mod common;
pub mod config;
pub mod record;

use crate::{
    common::*,
    config::{Config, RoleConfig},
    record::ImageRecord,
};
use roi_bootstrap::{AccumulatedPools, FeatureStatistics};

/// The file name format of run directories.
pub const FILE_STRFTIME: &str = "%Y-%m-%d-%H-%M-%S.%3f%z";

/// The entry of training program.
pub fn start(config: &Config) -> Result<PathBuf> {
    config.validate()?;

    let start_time = Local::now();
    let run_dir = config
        .output_dir
        .join(format!("{}", start_time.format(FILE_STRFTIME)));

    // create dirs and save config
    {
        fs::create_dir_all(&run_dir)?;
        let path = run_dir.join("config.json5");
        let text = serde_json::to_string_pretty(config)?;
        fs::write(&path, text)?;
    }
    let snapshot = SnapshotDir::new(&run_dir);

    info!("loading records");
    let records = record::load_records(&config.records_dir)?;
    ensure!(
        !records.is_empty(),
        "no record found in {}",
        config.records_dir.display()
    );

    for role in Role::ALL {
        if !config.run.is_enabled(role) {
            info!("skip {} in this run", role);
            continue;
        }
        let role_config = match config.roles.get(role) {
            Some(role_config) => role_config,
            None => continue,
        };

        let (pools, stats) = if config.run.load_models(role) {
            load_role(config, role)?
        } else {
            let (mut pools, stats) = train_role(config, role, role_config, &records)?;
            if role == Role::Detector && !config.run.use_only_gt_positives {
                pools.positives = pools.regression_positives()?;
            }
            let target_norm = config.statistics(role).target_norm.raw() as f32;
            pools.regression.normalize(&stats, target_norm)?;
            (pools, stats)
        };

        if config.run.save_models(role) {
            snapshot.save_stats(role, &stats)?;
            snapshot.save_pools(&pools)?;
        }
    }

    info!("finished, outputs are saved in {}", run_dir.display());
    Ok(run_dir)
}

fn load_role(config: &Config, role: Role) -> Result<(AccumulatedPools, FeatureStatistics)> {
    let load_dir = config
        .load_dir
        .as_ref()
        .ok_or_else(|| format_err!("load_dir is not set"))?;
    let previous = SnapshotDir::new(load_dir);
    let pools = previous.load_pools(role)?;
    let stats = previous.load_stats(role)?;
    info!("loaded {} pools from {}", role, load_dir.display());
    Ok((pools, stats))
}

fn train_role(
    config: &Config,
    role: Role,
    role_config: &RoleConfig,
    records: &[ImageRecord],
) -> Result<(AccumulatedPools, FeatureStatistics)> {
    let RoleConfig {
        features_dir,
        features_format,
        minibootstrap,
        ..
    } = role_config;
    let num_classes = minibootstrap.num_classes.get();
    let feature_dim = minibootstrap.feature_dim.get();

    let mut driver = TrainingDriver::new(
        role,
        minibootstrap.clone(),
        &config.thresholds,
        config.coord_format,
        config.seed,
    )?;

    info!("accumulating {} samples", role);
    for record in records {
        let sample = record.to_sample(num_classes)?;
        let features = load_features(features_dir, &record.name, features_format, feature_dim)?
            .ok_or_else(|| format_err!("unrecognized feature format '{}'", features_format))?;
        let report = driver
            .process_features(&sample, features.view())
            .with_context(|| format!("failed to process image {}", record.name))?;

        if report.all_complete && !report.completed.is_empty() {
            info!(
                "all {} negative batches are full after {} images",
                role,
                driver.num_images()
            );
        }
    }

    if !driver.is_complete() {
        warn!(
            "{} negative batches are not full after {} images",
            role,
            driver.num_images()
        );
    }

    let cache = StatisticsCache::new(&config.cache_dir, &config.feature_info.descriptor(), role);
    let stats = driver.cached_statistics(&cache, config.statistics(role))?;
    let pools = driver.finish();

    info!(
        "{}: {} positives, {} regression examples",
        role,
        pools.positives.total_len(),
        pools.regression.len()
    );
    Ok((pools, stats))
}
