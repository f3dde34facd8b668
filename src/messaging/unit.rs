//! Messaging unit abstraction shared by intersection managers and vehicle
//! agents. Modelled on a range-limited radio: an address is reachable iff
//! its owner is registered and within communication range.

use std::fmt;

pub type Address = String;

/// Errors raised by a [`MessagingUnit`] implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum MessagingError {
    /// `send` targeted an address that is not currently reachable (not
    /// registered, destroyed, or out of range). A programming error in the
    /// caller: it must `discover` first.
    Unreachable(Address),
}

impl fmt::Display for MessagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessagingError::Unreachable(addr) => write!(f, "address {} is not reachable", addr),
        }
    }
}

impl std::error::Error for MessagingError {}

/// A message envelope: the sender's address plus an opaque payload.
///
/// The payload type is generic so that both the vehicle/IM reservation
/// protocol (`crate::protocol::VehicleMessage` / `IMMessage`) and the STIP
/// broadcast protocol (`crate::protocol::StipMessage`) can share one
/// messaging layer without the payload itself being a dynamically-typed map.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub sender: Address,
    pub contents: T,
}

impl<T> Envelope<T> {
    pub fn new(sender: impl Into<Address>, contents: T) -> Self {
        Envelope {
            sender: sender.into(),
            contents,
        }
    }
}

/// Capability interface for a messaging endpoint. An intersection manager or
/// vehicle agent owns one and uses it to exchange `T`-typed messages with
/// its peers.
pub trait MessagingUnit<T> {
    /// Addresses currently reachable from this unit.
    fn discover(&self) -> Vec<Address>;

    /// Delivers `message` to `address`. Fails loudly if `address` is not
    /// currently reachable — never silently drops.
    fn send(&self, address: &str, message: T) -> Result<(), MessagingError>;

    /// Messages delivered to this unit since the last call; the mailbox is
    /// cleared on read.
    fn receive(&self) -> Vec<Envelope<T>>;

    /// Best-effort delivery to every reachable address except self.
    fn broadcast(&self, message: T)
    where
        T: Clone;

    /// Removes this unit from the reachable set. Idempotent.
    fn destroy(&self);
}
