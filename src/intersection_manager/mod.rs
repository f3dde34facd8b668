//! The query-based reservation algorithm (§4.7): request handling,
//! acceleration-profile search, and its configuration surface.

mod config;
mod manager;

pub use config::{IntersectionManagerConfig, IntersectionManagerConfigBuilder};
pub use manager::{DiscretiseMode, IntersectionManager, IntersectionManagerError};
