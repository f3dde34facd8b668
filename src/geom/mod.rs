//! # Geometry module
//!
//! Minimal Euclidean primitives used by the trajectory and tile-sweep code:
//! [`Point`] for positions and vectors, [`Pose`] for a position-plus-heading
//! sample along a trajectory, and [`sat::OrientedRect`] for the
//! separating-axis test the tile sweep uses to decide which tiles a vehicle's
//! footprint overlaps.
//!
//! Unlike the teacher crate's `geom` module, this one does not support
//! geographic (WGS84) coordinates or CRS conversions — every distance in this
//! domain (intersection size, vehicle length, safety buffer) is already in
//! metres in one shared local frame, so that axis never existed in the
//! original design being modelled. See `DESIGN.md` for the full rationale.

mod point;
mod pose;
pub mod sat;

pub use point::Point;
pub use pose::Pose;
