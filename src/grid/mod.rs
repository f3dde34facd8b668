//! The discretised intersection grid.

mod tile;

pub use tile::{DiscretisedIntersection, SafetyBuffer, TileId};
