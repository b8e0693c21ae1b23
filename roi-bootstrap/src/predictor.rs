//! Box refinement of recorded test images.

use crate::{
    common::*,
    driver::TestBoxes,
    regression::{BoxRegressionCodec, RegressionModel},
    statistics::FeatureStatistics,
};

/// The refined boxes of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinedBoxes {
    pub image_size: HW<f32>,
    /// `(boxes, 1 + models, 4)` corners in `[x1, y1, x2, y2]` order. Slot 0
    /// holds the candidate box, slot `j + 1` its refinement by model `j`.
    pub boxes: Array3<f32>,
}

/// Refines the proposals of recorded images with per-class regressors.
#[derive(Debug, Clone)]
pub struct RegionPredictor {
    codec: BoxRegressionCodec,
    models: Vec<RegressionModel>,
    normalization: Option<(FeatureStatistics, f32)>,
    images: Option<Vec<TestBoxes>>,
}

impl RegionPredictor {
    pub fn new(codec: BoxRegressionCodec, models: Vec<RegressionModel>) -> Self {
        Self {
            codec,
            models,
            normalization: None,
            images: None,
        }
    }

    /// Normalize features with the statistics before regression.
    pub fn with_normalization(mut self, stats: FeatureStatistics, target_norm: f32) -> Self {
        self.normalization = Some((stats, target_norm));
        self
    }

    pub fn set_features(&mut self, images: Vec<TestBoxes>) {
        self.images = Some(images);
    }

    /// Refine the non-ground-truth boxes of every recorded image.
    ///
    /// Returns `None` if no image was recorded with [RegionPredictor::set_features].
    pub fn predict(&self) -> Result<Option<Vec<RefinedBoxes>>> {
        let images = match &self.images {
            Some(images) => images,
            None => {
                warn!("features are not set, skip the prediction");
                return Ok(None);
            }
        };

        let refined: Vec<_> = images
            .iter()
            .map(|image| self.refine_image(image))
            .collect::<Result<_>>()?;
        Ok(Some(refined))
    }

    fn refine_image(&self, image: &TestBoxes) -> Result<RefinedBoxes> {
        let indices = image.proposal_indices();
        let candidates: Vec<_> = indices
            .iter()
            .map(|&index| image.boxes[index].clone())
            .collect();
        let mut features = image.features.select(Axis(0), &indices);
        if let Some((stats, target_norm)) = &self.normalization {
            stats.normalize_inplace(&mut features.view_mut(), *target_norm);
        }

        let mut boxes = Array3::zeros((candidates.len(), self.models.len() + 1, 4));
        for (mut slot, candidate) in boxes.outer_iter_mut().zip(&candidates) {
            slot.row_mut(0).assign(&Array1::from(candidate.xyxy().to_vec()));
        }

        for (index, model) in self.models.iter().enumerate() {
            let refined = model.refine(&self.codec, features.view(), &candidates, &image.image_size)?;
            for (mut slot, rect) in boxes.outer_iter_mut().zip(&refined) {
                slot.row_mut(index + 1)
                    .assign(&Array1::from(rect.xyxy().to_vec()));
            }
        }

        Ok(RefinedBoxes {
            image_size: image.image_size,
            boxes,
        })
    }
}
