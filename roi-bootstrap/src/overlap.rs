//! Box overlap against ground truths.

use crate::{common::*, sample::BoxSet};

/// The union floor that keeps degenerate boxes from dividing by zero.
pub const OVERLAP_EPSILON: f32 = f32::EPSILON;

/// Overlap of every box against a single ground truth.
pub fn overlap_with(format: CoordFormat, gt: &TLBR<f32>, boxes: &[TLBR<f32>]) -> Array1<f32> {
    boxes
        .iter()
        .map(|rect| format.iou(gt, rect, OVERLAP_EPSILON))
        .collect()
}

/// The overlaps of one image.
///
/// `per_gt` has one column per ground truth, `per_class` one column per class
/// holding the maximum over the ground truths of that class. Classes without
/// a ground truth in the image stay at zero.
#[derive(Debug, Clone)]
pub struct OverlapMatrix {
    per_gt: Array2<f32>,
    per_class: Array2<f32>,
}

impl OverlapMatrix {
    pub fn compute(format: CoordFormat, boxes: &BoxSet, num_classes: usize) -> Result<Self> {
        let num_boxes = boxes.len();
        let mut per_gt: Array2<f32> = Array2::zeros((num_boxes, boxes.num_gt()));
        let mut per_class: Array2<f32> = Array2::zeros((num_boxes, num_classes));

        for (index, (gt, class)) in boxes.gt_boxes().enumerate() {
            ensure!(
                class.get() <= num_classes,
                "ground truth class {} exceeds the number of classes {}",
                class,
                num_classes
            );
            let overlaps = overlap_with(format, gt, &boxes.boxes);

            per_gt.column_mut(index).assign(&overlaps);
            per_class
                .column_mut(class.index())
                .zip_mut_with(&overlaps, |max, &value| *max = max.max(value));
        }

        Ok(Self { per_gt, per_class })
    }

    pub fn num_boxes(&self) -> usize {
        self.per_class.nrows()
    }

    /// Overlaps against the `index`-th ground truth of the image.
    pub fn gt_column(&self, index: usize) -> ArrayView1<'_, f32> {
        self.per_gt.column(index)
    }

    /// Maximum overlaps against the ground truths of `class`.
    pub fn class_column(&self, class: ClassId) -> ArrayView1<'_, f32> {
        self.per_class.column(class.index())
    }

    /// The box-by-class matrix.
    pub fn per_class(&self) -> ArrayView2<'_, f32> {
        self.per_class.view()
    }
}
