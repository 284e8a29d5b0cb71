//! State containers backed by a [`WorkingSet`](crate::WorkingSet).

mod map;
mod value;

pub use map::{StateMap, StateMapError};
pub use value::{StateValue, StateValueError};
