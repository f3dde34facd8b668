//! Surfaces the design constants of the request-handling algorithm
//! (§4.7/§9) as explicit configuration, built with the same
//! `new()` → `with_*` → `build()` convention used throughout this crate.

/// Tunables of [`crate::intersection_manager::IntersectionManager`]'s
/// feasibility search. Defaults match the reference values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionManagerConfig {
    /// Simulation-time discretisation step, in seconds.
    pub delta: f64,
    /// Minimum time gap required between reservations sharing an interior
    /// tile.
    pub time_buffer: f64,
    /// Minimum time gap required between reservations sharing a boundary
    /// tile (less certain occlusion at the edge of the discretised region).
    pub edge_tile_time_buffer: f64,
    /// `(lateral, longitudinal)` metres added to a vehicle's footprint
    /// before sweeping it across the grid.
    pub safety_buffer: (f64, f64),
    /// A vehicle arriving faster than this is never excused from the
    /// accelerate-first pass of the profile search.
    pub must_accelerate_threshold: f64,
    /// Side length, in tiles, of the discretised intersection grid.
    pub granularity: i64,
}

impl IntersectionManagerConfig {
    /// Starts a builder seeded with the reference default values
    /// (`Δ = 0.05s`, `TIME_BUFFER = 0.5s`, `EDGE_TILE_TIME_BUFFER = 1.0s`,
    /// `SAFETY_BUFFER = (0.5, 1.0)m`, `MUST_ACCELERATE_THRESHOLD = 4 m/s`).
    pub fn new(granularity: i64) -> IntersectionManagerConfigBuilder {
        IntersectionManagerConfigBuilder {
            config: IntersectionManagerConfig {
                delta: 0.05,
                time_buffer: 0.5,
                edge_tile_time_buffer: 1.0,
                safety_buffer: (0.5, 1.0),
                must_accelerate_threshold: 4.0,
                granularity,
            },
        }
    }
}

/// A `IntersectionManagerConfigBuilder` struct which is used to configure
/// and build the `IntersectionManagerConfig` object.
///
/// # Example
/// ```rust
/// use aim_reservation_core::intersection_manager::IntersectionManagerConfig;
///
/// let config = IntersectionManagerConfig::new(20)
///     .with_delta(0.1)
///     .with_time_buffer(1.0)
///     .build();
/// assert_eq!(config.delta, 0.1);
/// ```
pub struct IntersectionManagerConfigBuilder {
    config: IntersectionManagerConfig,
}

impl IntersectionManagerConfigBuilder {
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.config.delta = delta;
        self
    }

    pub fn with_time_buffer(mut self, time_buffer: f64) -> Self {
        self.config.time_buffer = time_buffer;
        self
    }

    pub fn with_edge_tile_time_buffer(mut self, edge_tile_time_buffer: f64) -> Self {
        self.config.edge_tile_time_buffer = edge_tile_time_buffer;
        self
    }

    pub fn with_safety_buffer(mut self, safety_buffer: (f64, f64)) -> Self {
        self.config.safety_buffer = safety_buffer;
        self
    }

    pub fn with_must_accelerate_threshold(mut self, threshold: f64) -> Self {
        self.config.must_accelerate_threshold = threshold;
        self
    }

    pub fn build(self) -> IntersectionManagerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_values() {
        let config = IntersectionManagerConfig::new(20).build();
        assert_eq!(config.delta, 0.05);
        assert_eq!(config.time_buffer, 0.5);
        assert_eq!(config.edge_tile_time_buffer, 1.0);
        assert_eq!(config.safety_buffer, (0.5, 1.0));
        assert_eq!(config.must_accelerate_threshold, 4.0);
        assert_eq!(config.granularity, 20);
    }

    #[test]
    fn builder_overrides_apply() {
        let config = IntersectionManagerConfig::new(10)
            .with_delta(0.1)
            .with_time_buffer(0.25)
            .build();
        assert_eq!(config.delta, 0.1);
        assert_eq!(config.time_buffer, 0.25);
        assert_eq!(config.granularity, 10);
    }
}
