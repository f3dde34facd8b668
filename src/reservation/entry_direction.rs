//! Derives a vehicle's entry direction from trajectory geometry rather than
//! from a string-encoding convention on the lane id (see DESIGN.md's record
//! of the corresponding open question).

use std::f64::consts::PI;

/// One of the eight compass octants a trajectory's entry heading is bucketed
/// into. Used only as the key for `ReservationTable::nearest_stalled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryDirection {
    East,
    NorthEast,
    North,
    NorthWest,
    West,
    SouthWest,
    South,
    SouthEast,
}

impl EntryDirection {
    /// Buckets a heading in radians (CCW from +x, any range) into the
    /// nearest of the eight compass octants.
    pub fn from_heading(heading: f64) -> Self {
        let two_pi = 2.0 * PI;
        let mut normalised = heading % two_pi;
        if normalised < 0.0 {
            normalised += two_pi;
        }
        let octant = ((normalised / (PI / 4.0)) + 0.5).floor() as i64 % 8;
        match octant {
            0 => EntryDirection::East,
            1 => EntryDirection::NorthEast,
            2 => EntryDirection::North,
            3 => EntryDirection::NorthWest,
            4 => EntryDirection::West,
            5 => EntryDirection::SouthWest,
            6 => EntryDirection::South,
            7 => EntryDirection::SouthEast,
            _ => unreachable!("octant is reduced modulo 8"),
        }
    }
}
