//! Common imports from external crates.

pub use anyhow::{bail, ensure, format_err, Context, Error, Result};
pub use bbox::{prelude::*, CoordFormat, HW, TLBR};
pub use chrono::Local;
pub use itertools::Itertools;
pub use label::{ClassId, Label};
pub use log::{debug, info, warn};
pub use noisy_float::prelude::*;
pub use roi_bootstrap::{
    features::load_features, FeatureInfo, ImageSample, MinibootstrapConfig, Role, RunConfig,
    SnapshotDir, StatisticsCache, StatisticsConfig, ThresholdConfig, TrainingDriver,
};
pub use serde::{Deserialize, Serialize};
pub use std::{
    fs,
    path::{Path, PathBuf},
};
