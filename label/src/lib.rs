//! Ground-truth labels and class indices.

use anyhow::{ensure, Result};
use bbox::Rect;
use serde::{Deserialize, Serialize};
use std::{fmt, num::NonZeroUsize};

/// The reserved class value of background and non-ground-truth boxes.
pub const BACKGROUND_CLASS: usize = 0;

/// A 1-based object class id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ClassId(NonZeroUsize);

impl ClassId {
    /// Returns `None` for the background class.
    pub fn new(id: usize) -> Option<Self> {
        NonZeroUsize::new(id).map(Self)
    }

    /// Class id of the 0-based column index used in overlap matrices and pools.
    pub fn from_index(index: usize) -> Self {
        Self(NonZeroUsize::new(index + 1).unwrap())
    }

    pub fn try_checked(id: usize, num_classes: usize) -> Result<Self> {
        ensure!(
            id != BACKGROUND_CLASS && id <= num_classes,
            "class id {} is out of range 1..={}",
            id,
            num_classes
        );
        Ok(Self::from_index(id - 1))
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }

    /// The 0-based column index.
    pub fn index(&self) -> usize {
        self.0.get() - 1
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bounding box annotated with its object class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label<R>
where
    R: Rect,
{
    pub rect: R,
    pub class: ClassId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_index_round_trip() {
        let class = ClassId::new(3).unwrap();
        assert_eq!(class.index(), 2);
        assert_eq!(ClassId::from_index(2), class);
        assert!(ClassId::new(BACKGROUND_CLASS).is_none());
    }

    #[test]
    fn checked_class_range() {
        assert!(ClassId::try_checked(0, 5).is_err());
        assert!(ClassId::try_checked(6, 5).is_err());
        assert_eq!(ClassId::try_checked(5, 5).unwrap().index(), 4);
    }
}
