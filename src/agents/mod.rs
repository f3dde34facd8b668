//! Vehicle agent kinds (§4.8-§4.10).
//!
//! `VehicleAgent` closes the `{ReservationVehicle, SpaceTimeVehicle,
//! TrafficLightVehicle}` set named in §9's REDESIGN FLAGS as a single
//! exhaustive enum rather than an open class hierarchy with runtime
//! capability checks. Each variant's `step` keeps its own signature — the
//! three protocols exchange different message types over different
//! collaborators — but any operation common to all three vehicle kinds
//! (here, just `id`) dispatches through one `match`.

mod reservation_vehicle;
mod space_time_vehicle;
mod traffic_light_vehicle;

pub use reservation_vehicle::{ReservationVehicle, VehicleState};
pub use space_time_vehicle::{SpaceTimeVehicle, StipState, StipVehicleConfig, StipVehicleConfigBuilder};
pub use traffic_light_vehicle::TrafficLightVehicle;

pub enum VehicleAgent {
    Reservation(ReservationVehicle),
    SpaceTime(SpaceTimeVehicle),
    TrafficLight(TrafficLightVehicle),
}

impl VehicleAgent {
    pub fn id(&self) -> &str {
        match self {
            VehicleAgent::Reservation(vehicle) => vehicle.id(),
            VehicleAgent::SpaceTime(vehicle) => vehicle.id(),
            VehicleAgent::TrafficLight(vehicle) => vehicle.id(),
        }
    }
}
