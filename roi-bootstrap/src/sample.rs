//! Per-image input and box preprocessing.

use crate::common::*;

/// The annotated boxes of one image as produced upstream.
///
/// Ground truths and proposals are raw, 0-based coordinates in the frame the
/// proposals were generated in, which is `input_size` when set and the image
/// itself otherwise.
#[derive(Debug, Clone)]
pub struct ImageSample {
    pub image_size: HW<f32>,
    pub input_size: Option<HW<f32>>,
    pub labels: Vec<Label<TLBR<f32>>>,
    pub proposals: Vec<TLBR<f32>>,
}

impl ImageSample {
    pub fn num_gt(&self) -> usize {
        self.labels.len()
    }

    /// Total number of boxes, ground truths included.
    pub fn num_boxes(&self) -> usize {
        self.labels.len() + self.proposals.len()
    }

    /// Ground-truth boxes followed by proposals, untouched.
    ///
    /// This is the box order of feature rows.
    pub fn raw_boxes(&self) -> Vec<TLBR<f32>> {
        self.labels
            .iter()
            .map(|label| label.rect.clone())
            .chain(self.proposals.iter().cloned())
            .collect()
    }

    /// Rescale the boxes to the image and convert them to the run convention.
    pub fn prepare(&self, format: CoordFormat) -> BoxSet {
        let transform = self
            .input_size
            .as_ref()
            .map(|input_size| Transform::from_sizes_exact(input_size, &self.image_size));
        let convert = |rect: &TLBR<f32>| {
            let rect = match &transform {
                Some(transform) => transform * rect,
                None => rect.clone(),
            };
            format.from_raw(&rect, &self.image_size)
        };

        let boxes: Vec<_> = self
            .labels
            .iter()
            .map(|label| &label.rect)
            .chain(&self.proposals)
            .map(convert)
            .collect();
        let gt_classes: Vec<_> = self.labels.iter().map(|label| label.class).collect();

        BoxSet {
            image_size: self.image_size,
            boxes,
            gt_classes,
        }
    }
}

/// The preprocessed boxes of one image.
///
/// The first `num_gt()` boxes are the ground truths, reinjected as proposals.
#[derive(Debug, Clone)]
pub struct BoxSet {
    pub image_size: HW<f32>,
    pub boxes: Vec<TLBR<f32>>,
    pub gt_classes: Vec<ClassId>,
}

impl BoxSet {
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn num_gt(&self) -> usize {
        self.gt_classes.len()
    }

    pub fn gt_boxes(&self) -> impl Iterator<Item = (&TLBR<f32>, ClassId)> {
        self.boxes.iter().zip(self.gt_classes.iter().cloned())
    }

    pub fn has_class(&self, class: ClassId) -> bool {
        self.gt_classes.contains(&class)
    }

    /// Marks which boxes are ground truths.
    pub fn gt_mask(&self) -> Vec<bool> {
        let num_gt = self.num_gt();
        (0..self.len()).map(|index| index < num_gt).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ImageSample {
        ImageSample {
            image_size: HW::from_hw([300.0, 400.0]),
            input_size: Some(HW::from_hw([600.0, 800.0])),
            labels: vec![Label {
                rect: TLBR::from_xyxy([100.0, 100.0, 300.0, 200.0]),
                class: ClassId::new(1).unwrap(),
            }],
            proposals: vec![TLBR::from_xyxy([0.0, 0.0, 800.0, 600.0])],
        }
    }

    #[test]
    fn rescale_and_shift_one_based() {
        let boxes = sample().prepare(CoordFormat::OneBased);
        assert_eq!(boxes.num_gt(), 1);
        assert_eq!(boxes.boxes[0].xyxy(), [51.0, 51.0, 151.0, 101.0]);
        assert_eq!(boxes.boxes[1].xyxy(), [1.0, 1.0, 400.0, 300.0]);
        assert_eq!(boxes.gt_mask(), vec![true, false]);
    }

    #[test]
    fn rescale_zero_based() {
        let boxes = sample().prepare(CoordFormat::ZeroBased);
        assert_eq!(boxes.boxes[0].xyxy(), [50.0, 50.0, 150.0, 100.0]);
        assert_eq!(boxes.boxes[1].xyxy(), [0.0, 0.0, 399.0, 299.0]);
    }
}
