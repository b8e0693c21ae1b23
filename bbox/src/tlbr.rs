use super::Rect;
use crate::{common::*, Transform};

/// Bounding box in TLBR format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TLBR<T> {
    pub(crate) t: T,
    pub(crate) l: T,
    pub(crate) b: T,
    pub(crate) r: T,
}

impl<T> TLBR<T>
where
    T: Copy + Num,
{
    pub fn transform(&self, transform: &Transform<T>) -> Self {
        TLBR {
            t: self.t * transform.sy + transform.ty,
            l: self.l * transform.sx + transform.tx,
            b: self.b * transform.sy + transform.ty,
            r: self.r * transform.sx + transform.tx,
        }
    }

    /// Shift all four coordinates by the same offset.
    pub fn shift(&self, offset: T) -> Self {
        TLBR {
            t: self.t + offset,
            l: self.l + offset,
            b: self.b + offset,
            r: self.r + offset,
        }
    }
}

impl<T> TLBR<T>
where
    T: Copy + PartialOrd,
{
    /// Clamp the columns to `[x_min, x_max]` and the rows to `[y_min, y_max]`.
    pub fn clamp(&self, [x_min, x_max]: [T; 2], [y_min, y_max]: [T; 2]) -> Self {
        let clamp = |value: T, min: T, max: T| {
            if value < min {
                min
            } else if value > max {
                max
            } else {
                value
            }
        };

        TLBR {
            t: clamp(self.t, y_min, y_max),
            l: clamp(self.l, x_min, x_max),
            b: clamp(self.b, y_min, y_max),
            r: clamp(self.r, x_min, x_max),
        }
    }
}

impl<T> Rect for TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        self.t
    }

    fn l(&self) -> Self::Type {
        self.l
    }

    fn b(&self) -> Self::Type {
        self.b
    }

    fn r(&self) -> Self::Type {
        self.r
    }

    fn cy(&self) -> Self::Type {
        let one = T::one();
        let two = one + one;
        self.t + self.h() / two
    }

    fn cx(&self) -> Self::Type {
        let one = T::one();
        let two = one + one;
        self.l + self.w() / two
    }

    fn h(&self) -> Self::Type {
        self.b - self.t
    }

    fn w(&self) -> Self::Type {
        self.r - self.l
    }

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        ensure!(b >= t && r >= l, "b >= t and r >= l must hold");

        Ok(Self { t, l, b, r })
    }
}
