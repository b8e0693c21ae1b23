//! Box-regression targets, training examples and models.

mod codec;
mod model;
mod set;

pub use codec::*;
pub use model::*;
pub use set::*;
