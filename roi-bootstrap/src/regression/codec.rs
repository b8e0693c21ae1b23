use crate::common::*;

/// Added to candidate extents when decoding.
pub const BOX_EPSILON: f32 = f32::EPSILON;

/// Encodes ground-truth boxes relative to candidate boxes and decodes
/// regressed offsets back to boxes.
///
/// Targets are `(dx, dy, dw, dh)`: the center shift in units of the
/// candidate's extent followed by the log ratio of extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxRegressionCodec {
    format: CoordFormat,
}

impl BoxRegressionCodec {
    pub fn new(format: CoordFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> CoordFormat {
        self.format
    }

    pub fn try_encode(&self, candidate: &TLBR<f32>, gt: &TLBR<f32>) -> Result<[f32; 4]> {
        ensure!(
            !candidate.is_degenerate(),
            "cannot encode against a degenerate candidate box {:?}",
            candidate.xyxy()
        );
        ensure!(
            !gt.is_degenerate(),
            "cannot encode a degenerate ground truth box {:?}",
            gt.xyxy()
        );

        let [ex_cy, ex_cx, ex_h, ex_w] = candidate.cycxhw();
        let [gt_cy, gt_cx, gt_h, gt_w] = gt.cycxhw();

        let dx = (gt_cx - ex_cx) / ex_w;
        let dy = (gt_cy - ex_cy) / ex_h;
        let dw = (gt_w / ex_w).ln();
        let dh = (gt_h / ex_h).ln();

        Ok([dx, dy, dw, dh])
    }

    /// Panics if either box has zero width or height.
    pub fn encode(&self, candidate: &TLBR<f32>, gt: &TLBR<f32>) -> [f32; 4] {
        self.try_encode(candidate, gt).unwrap()
    }

    /// Apply `(dx, dy, dw, dh)` to the candidate and clamp the result to the image.
    ///
    /// If any coordinate is not finite, the clamped candidate is returned.
    pub fn decode(
        &self,
        candidate: &TLBR<f32>,
        deltas: [f32; 4],
        image_size: &HW<f32>,
    ) -> Result<TLBR<f32>> {
        let [dx, dy, dw, dh] = deltas;
        let src_w = candidate.w() + BOX_EPSILON;
        let src_h = candidate.h() + BOX_EPSILON;
        let src_cx = candidate.l() + 0.5 * src_w;
        let src_cy = candidate.t() + 0.5 * src_h;

        let pred_cx = dx * src_w + src_cx;
        let pred_cy = dy * src_h + src_cy;
        let pred_w = dw.exp() * src_w;
        let pred_h = dh.exp() * src_h;

        let pred = [
            pred_cx - 0.5 * pred_w,
            pred_cy - 0.5 * pred_h,
            pred_cx + 0.5 * pred_w,
            pred_cy + 0.5 * pred_h,
        ];
        let rect = if pred.iter().all(|value| value.is_finite()) {
            TLBR::try_from_xyxy(pred)?
        } else {
            candidate.clone()
        };

        Ok(self.format.clamp(&rect, image_size))
    }
}
