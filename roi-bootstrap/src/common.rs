pub use anyhow::{bail, ensure, format_err, Context as _, Result};
pub use bbox::{prelude::*, CoordFormat, Transform, HW, TLBR};
pub use indexmap::IndexSet;
pub use itertools::Itertools as _;
pub use label::{ClassId, Label};
pub use log::{debug, info, warn};
pub use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};
pub use noisy_float::prelude::*;
pub use rand::{prelude::*, rngs::StdRng};
pub use serde::{de::DeserializeOwned, Deserialize, Serialize};
pub use std::{
    fmt, fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};
