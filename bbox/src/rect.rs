use super::TLBR;
use crate::common::*;

/// The generic rectangle.
///
/// `t`/`b` run along the image rows (y axis) and `l`/`r` along the columns
/// (x axis), so a box written as `(x1, y1, x2, y2)` has `l = x1`, `t = y1`,
/// `r = x2` and `b = y2`.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;
    fn cy(&self) -> Self::Type;
    fn cx(&self) -> Self::Type;
    fn h(&self) -> Self::Type;
    fn w(&self) -> Self::Type;

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;
}

pub trait RectNum: Rect
where
    Self::Type: Num + PartialOrd,
{
    fn from_tlbr(tlbr: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_tlbr(tlbr).unwrap()
    }

    /// Build from `[x1, y1, x2, y2]` corner coordinates.
    fn try_from_xyxy(xyxy: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized,
    {
        let [x1, y1, x2, y2] = xyxy;
        Self::try_from_tlbr([y1, x1, y2, x2])
    }

    fn from_xyxy(xyxy: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_xyxy(xyxy).unwrap()
    }

    fn tlbr(&self) -> [Self::Type; 4] {
        [self.t(), self.l(), self.b(), self.r()]
    }

    /// Corner coordinates in `[x1, y1, x2, y2]` order.
    fn xyxy(&self) -> [Self::Type; 4] {
        [self.l(), self.t(), self.r(), self.b()]
    }

    fn cycxhw(&self) -> [Self::Type; 4] {
        [self.cy(), self.cx(), self.h(), self.w()]
    }

    fn area(&self) -> <Self::Type as Mul<Self::Type>>::Output
    where
        Self::Type: Mul<Self::Type>,
    {
        self.h() * self.w()
    }

    /// True if the box has zero height or zero width.
    fn is_degenerate(&self) -> bool {
        let zero = Self::Type::zero();
        !(self.h() > zero && self.w() > zero)
    }
}

pub trait RectFloat: RectNum
where
    Self::Type: Float,
{
    fn intersect_with<R>(&self, other: &R) -> Option<TLBR<Self::Type>>
    where
        R: Rect<Type = Self::Type>,
    {
        let t = self.t().max(other.t());
        let l = self.l().max(other.l());
        let b = self.b().min(other.b());
        let r = self.r().min(other.r());
        (b > t && r > l).then(|| TLBR { t, l, b, r })
    }

    fn intersection_area_with<R>(&self, other: &R) -> Self::Type
    where
        R: Rect<Type = Self::Type>,
    {
        self.intersect_with(other)
            .map(|rect| rect.area())
            .unwrap_or_else(Self::Type::zero)
    }

    /// Intersection over union, with the union floored at `epsilon`.
    fn iou_with<R>(&self, other: &R, epsilon: Self::Type) -> Self::Type
    where
        R: Rect<Type = Self::Type>,
    {
        let inter_area = self.intersection_area_with(other);
        let union_area = self.area() + other.area() - inter_area;
        inter_area / union_area.max(epsilon)
    }
}

impl<T> RectNum for T
where
    T: Rect,
    T::Type: Num + PartialOrd,
{
}

impl<T> RectFloat for T
where
    T: Rect,
    T::Type: Float,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn iou_of_self_is_one() {
        let rect = TLBR::from_xyxy([2.0, 3.0, 12.0, 9.0]);
        assert_abs_diff_eq!(rect.iou_with(&rect, 1e-6), 1.0);
    }

    #[test]
    fn iou_of_half_overlap() {
        let lhs = TLBR::from_xyxy([0.0, 0.0, 10.0, 10.0]);
        let rhs = TLBR::from_xyxy([5.0, 0.0, 15.0, 10.0]);
        assert_abs_diff_eq!(lhs.iou_with(&rhs, 1e-6), 50.0 / 150.0);
    }

    #[test]
    fn iou_of_degenerate_boxes_is_zero() {
        let rect = TLBR::from_xyxy([4.0, 4.0, 4.0, 4.0]);
        let iou: f64 = rect.iou_with(&rect, 1e-6);
        assert_eq!(iou, 0.0);
    }
}
