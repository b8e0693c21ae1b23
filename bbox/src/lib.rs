//! Axis-aligned box types, pixel coordinate conventions and overlap measures.

mod common;

pub use coord::*;
pub mod coord;

pub use transform::*;
mod transform;

pub use rect::*;
pub mod rect;

pub use tlbr::*;
pub mod tlbr;

pub use hw::*;
pub mod hw;

pub mod prelude {
    pub use crate::rect::{Rect, RectFloat, RectNum};
}
