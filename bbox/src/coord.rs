//! Pixel coordinate conventions.

use crate::{common::*, RectFloat, HW, TLBR};
use std::{fmt, str::FromStr};

/// The pixel coordinate convention of a run.
///
/// It decides the shift applied to raw boxes, the clamp bounds and whether
/// box extents count the last pixel. Overlap, target encoding and box
/// decoding of one run must all use the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordFormat {
    /// Pixel indices start at 0. Coordinates are clamped to `[0, dim - 1]`.
    ZeroBased,
    /// Matlab-style inclusive pixel indices starting at 1. Coordinates are
    /// clamped to `[1, dim]`.
    OneBased,
}

impl CoordFormat {
    /// The coordinate of the first pixel.
    pub fn origin<T>(&self) -> T
    where
        T: Float,
    {
        match self {
            Self::ZeroBased => T::zero(),
            Self::OneBased => T::one(),
        }
    }

    /// The valid `[min, max]` ranges of the x and y coordinates.
    ///
    /// Images smaller than one pixel collapse to `min == max`.
    pub fn bounds<T>(&self, size: &HW<T>) -> ([T; 2], [T; 2])
    where
        T: Float,
    {
        let zero = T::zero();
        let one = T::one();
        match self {
            Self::ZeroBased => (
                [zero, (size.w() - one).max(zero)],
                [zero, (size.h() - one).max(zero)],
            ),
            Self::OneBased => ([one, size.w().max(one)], [one, size.h().max(one)]),
        }
    }

    pub fn clamp<T>(&self, rect: &TLBR<T>, size: &HW<T>) -> TLBR<T>
    where
        T: Float,
    {
        let (x_range, y_range) = self.bounds(size);
        rect.clamp(x_range, y_range)
    }

    /// Convert a raw, 0-based box to this convention and clamp it to the image.
    pub fn from_raw<T>(&self, rect: &TLBR<T>, size: &HW<T>) -> TLBR<T>
    where
        T: Float,
    {
        self.clamp(&rect.shift(self.origin()), size)
    }

    /// Overlap ratio of two boxes.
    ///
    /// The 1-based convention treats both corners as inclusive pixels, so
    /// every extent gains one pixel. The union is floored at `epsilon`.
    pub fn iou<T>(&self, lhs: &TLBR<T>, rhs: &TLBR<T>, epsilon: T) -> T
    where
        T: Float,
    {
        match self {
            Self::ZeroBased => lhs.iou_with(rhs, epsilon),
            Self::OneBased => {
                let zero = T::zero();
                let one = T::one();
                let extent = |lo: T, hi: T| (hi - lo + one).max(zero);

                let inter_h = extent(lhs.t.max(rhs.t), lhs.b.min(rhs.b));
                let inter_w = extent(lhs.l.max(rhs.l), lhs.r.min(rhs.r));
                let inter_area = inter_h * inter_w;
                let lhs_area = extent(lhs.t, lhs.b) * extent(lhs.l, lhs.r);
                let rhs_area = extent(rhs.t, rhs.b) * extent(rhs.l, rhs.r);
                let union_area = lhs_area + rhs_area - inter_area;
                inter_area / union_area.max(epsilon)
            }
        }
    }
}

impl FromStr for CoordFormat {
    type Err = anyhow::Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let format = match text {
            "zero_based" => Self::ZeroBased,
            "one_based" | "matlab" => Self::OneBased,
            _ => anyhow::bail!(
                "unknown coordinate format '{}', expect 'zero_based' or 'one_based'",
                text
            ),
        };
        Ok(format)
    }
}

impl fmt::Display for CoordFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroBased => write!(f, "zero_based"),
            Self::OneBased => write!(f, "one_based"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RectNum;
    use approx::assert_abs_diff_eq;

    #[test]
    fn one_based_shift_and_clamp() {
        let size = HW::from_hw([40.0, 100.0]);
        let rect = TLBR::from_xyxy([0.0, 5.0, 100.0, 39.5]);
        let converted = CoordFormat::OneBased.from_raw(&rect, &size);
        assert_eq!(converted.xyxy(), [1.0, 6.0, 100.0, 40.0]);
    }

    #[test]
    fn zero_based_clamp() {
        let size = HW::from_hw([40.0, 100.0]);
        let rect = TLBR::from_xyxy([-2.0, 5.0, 100.0, 39.5]);
        let converted = CoordFormat::ZeroBased.from_raw(&rect, &size);
        assert_eq!(converted.xyxy(), [0.0, 5.0, 99.0, 39.0]);
    }

    #[test]
    fn inclusive_iou() {
        let lhs = TLBR::from_xyxy([1.0, 1.0, 10.0, 10.0]);
        let rhs = TLBR::from_xyxy([6.0, 1.0, 15.0, 10.0]);
        // 5x10 shared pixels out of 150 covered ones
        assert_abs_diff_eq!(CoordFormat::OneBased.iou(&lhs, &rhs, 1e-9), 50.0 / 150.0);
        assert_abs_diff_eq!(CoordFormat::OneBased.iou(&lhs, &lhs, 1e-9), 1.0);
    }

    #[test]
    fn parse_format_names() {
        assert_eq!(
            "matlab".parse::<CoordFormat>().unwrap(),
            CoordFormat::OneBased
        );
        assert_eq!(
            "zero_based".parse::<CoordFormat>().unwrap(),
            CoordFormat::ZeroBased
        );
        assert!(".pkl".parse::<CoordFormat>().is_err());
    }
}
