//! Reference `MessagingUnit` implementation: a range-limited radio whose
//! reachable set is determined purely by Euclidean distance.
//!
//! The registry that backs reachability is shared explicitly between units
//! via a cloneable [`Network`] handle rather than a hidden global — every
//! unit constructed against the same `Network` participates in the same
//! directory, and a single internal `Mutex` serialises access, matching the
//! single-threaded step loop's concurrency model (§5).

use crate::messaging::unit::{Address, Envelope, MessagingError, MessagingUnit};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type PositionFn = Arc<dyn Fn() -> (f64, f64) + Send + Sync>;

struct RegistryEntry<T> {
    position: PositionFn,
    communication_range: f64,
    mailbox: Arc<Mutex<Vec<Envelope<T>>>>,
}

/// A shared, process-wide directory of registered [`DistanceBasedUnit`]s.
/// Construct one per simulation and pass clones to every unit that should
/// share it; cloning is cheap (an `Arc` bump).
pub struct Network<T> {
    units: Arc<Mutex<HashMap<Address, RegistryEntry<T>>>>,
}

impl<T> Clone for Network<T> {
    fn clone(&self) -> Self {
        Network {
            units: Arc::clone(&self.units),
        }
    }
}

impl<T> Default for Network<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Network<T> {
    pub fn new() -> Self {
        Network {
            units: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn register(
        &self,
        address: Address,
        position: PositionFn,
        communication_range: f64,
        mailbox: Arc<Mutex<Vec<Envelope<T>>>>,
    ) {
        let mut units = self.units.lock().unwrap();
        units.insert(
            address,
            RegistryEntry {
                position,
                communication_range,
                mailbox,
            },
        );
    }

    fn unregister(&self, address: &str) {
        let mut units = self.units.lock().unwrap();
        units.remove(address);
    }

    fn within_range(&self, from: (f64, f64), range: f64, to: (f64, f64)) -> bool {
        let dx = from.0 - to.0;
        let dy = from.1 - to.1;
        (dx * dx + dy * dy).sqrt() < range
    }

    fn discover(&self, from_address: &str, from_position: (f64, f64), range: f64) -> Vec<Address> {
        let units = self.units.lock().unwrap();
        units
            .iter()
            .filter(|(address, entry)| {
                address.as_str() != from_address && self.within_range(from_position, range, (entry.position)())
            })
            .map(|(address, _)| address.clone())
            .collect()
    }

    fn deliver(
        &self,
        from_position: (f64, f64),
        range: f64,
        to: &str,
        envelope: Envelope<T>,
    ) -> Result<(), MessagingError> {
        let units = self.units.lock().unwrap();
        let entry = units
            .get(to)
            .filter(|entry| self.within_range(from_position, range, (entry.position)()))
            .ok_or_else(|| MessagingError::Unreachable(to.to_string()))?;
        entry.mailbox.lock().unwrap().push(envelope);
        Ok(())
    }
}

/// A `MessagingUnit` whose reachability is purely distance-based: `other` is
/// reachable from `self` iff `other` is registered on the same [`Network`]
/// and currently within `communication_range` of `self`'s position.
pub struct DistanceBasedUnit<T> {
    address: Address,
    communication_range: f64,
    position: PositionFn,
    mailbox: Arc<Mutex<Vec<Envelope<T>>>>,
    network: Network<T>,
}

impl<T> DistanceBasedUnit<T> {
    /// Registers a new unit on `network`. `position` is polled live on every
    /// `discover`/`send`/`broadcast` call, so it should read through to the
    /// owning agent's current location rather than capture a snapshot.
    pub fn new(
        network: Network<T>,
        address: impl Into<Address>,
        communication_range: f64,
        position: impl Fn() -> (f64, f64) + Send + Sync + 'static,
    ) -> Self {
        let address = address.into();
        let position: PositionFn = Arc::new(position);
        let mailbox = Arc::new(Mutex::new(Vec::new()));
        network.register(
            address.clone(),
            Arc::clone(&position),
            communication_range,
            Arc::clone(&mailbox),
        );
        DistanceBasedUnit {
            address,
            communication_range,
            position,
            mailbox,
            network,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn current_position(&self) -> (f64, f64) {
        (self.position)()
    }
}

impl<T> MessagingUnit<T> for DistanceBasedUnit<T> {
    fn discover(&self) -> Vec<Address> {
        self.network
            .discover(&self.address, self.current_position(), self.communication_range)
    }

    fn send(&self, address: &str, message: T) -> Result<(), MessagingError> {
        let envelope = Envelope::new(self.address.clone(), message);
        self.network
            .deliver(self.current_position(), self.communication_range, address, envelope)
    }

    fn receive(&self) -> Vec<Envelope<T>> {
        let mut mailbox = self.mailbox.lock().unwrap();
        std::mem::take(&mut *mailbox)
    }

    fn broadcast(&self, message: T)
    where
        T: Clone,
    {
        for address in self.discover() {
            // Best-effort: a peer that goes out of range between discover()
            // and send() is dropped silently, by design of broadcast.
            let _ = self.send(&address, message.clone());
        }
    }

    fn destroy(&self) {
        self.network.unregister(&self.address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_position(x: f64, y: f64) -> impl Fn() -> (f64, f64) + Send + Sync + 'static {
        move || (x, y)
    }

    #[test]
    fn discover_returns_units_within_range_excluding_self() {
        let network: Network<String> = Network::new();
        let a = DistanceBasedUnit::new(network.clone(), "A", 10.0, fixed_position(0.0, 0.0));
        let b = DistanceBasedUnit::new(network.clone(), "B", 10.0, fixed_position(5.0, 0.0));
        let _c = DistanceBasedUnit::new(network.clone(), "C", 10.0, fixed_position(100.0, 0.0));

        let reachable = a.discover();
        assert_eq!(reachable, vec!["B".to_string()]);
        assert_eq!(b.discover(), vec!["A".to_string()]);
    }

    #[test]
    fn send_delivers_to_mailbox_and_preserves_order() {
        let network: Network<&'static str> = Network::new();
        let a = DistanceBasedUnit::new(network.clone(), "A", 10.0, fixed_position(0.0, 0.0));
        let b = DistanceBasedUnit::new(network.clone(), "B", 10.0, fixed_position(1.0, 0.0));

        a.send("B", "first").unwrap();
        a.send("B", "second").unwrap();
        let received = b.receive();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].contents, "first");
        assert_eq!(received[1].contents, "second");
        assert_eq!(received[0].sender, "A");

        assert!(b.receive().is_empty());
    }

    #[test]
    fn send_to_unreachable_address_fails_loudly() {
        let network: Network<&'static str> = Network::new();
        let a = DistanceBasedUnit::new(network.clone(), "A", 5.0, fixed_position(0.0, 0.0));
        let _b = DistanceBasedUnit::new(network.clone(), "B", 5.0, fixed_position(100.0, 0.0));

        assert_eq!(
            a.send("B", "hi"),
            Err(MessagingError::Unreachable("B".to_string()))
        );
        assert_eq!(
            a.send("nonexistent", "hi"),
            Err(MessagingError::Unreachable("nonexistent".to_string()))
        );
    }

    #[test]
    fn destroy_removes_unit_from_reachable_set() {
        let network: Network<&'static str> = Network::new();
        let a = DistanceBasedUnit::new(network.clone(), "A", 10.0, fixed_position(0.0, 0.0));
        let b = DistanceBasedUnit::new(network.clone(), "B", 10.0, fixed_position(1.0, 0.0));

        b.destroy();
        assert!(a.discover().is_empty());
        assert_eq!(a.send("B", "hi"), Err(MessagingError::Unreachable("B".to_string())));

        // Idempotent.
        b.destroy();
    }

    #[test]
    fn broadcast_reaches_every_in_range_peer_but_not_self() {
        let network: Network<&'static str> = Network::new();
        let a = DistanceBasedUnit::new(network.clone(), "A", 10.0, fixed_position(0.0, 0.0));
        let b = DistanceBasedUnit::new(network.clone(), "B", 10.0, fixed_position(1.0, 0.0));
        let c = DistanceBasedUnit::new(network.clone(), "C", 10.0, fixed_position(2.0, 0.0));

        a.broadcast("hello");
        assert_eq!(b.receive()[0].contents, "hello");
        assert_eq!(c.receive()[0].contents, "hello");
        assert!(a.receive().is_empty());
    }

    #[test]
    fn position_is_polled_live_not_captured_at_construction() {
        // Position must be re-read on every call, not snapshotted at
        // construction, since a real vehicle keeps moving between steps.
        let x = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let x_clone = Arc::clone(&x);

        let network: Network<&'static str> = Network::new();
        let a = DistanceBasedUnit::new(network.clone(), "A", 5.0, fixed_position(0.0, 0.0));
        let _b = DistanceBasedUnit::new(network.clone(), "B", 5.0, move || {
            (f64::from_bits(x_clone.load(std::sync::atomic::Ordering::SeqCst)), 0.0)
        });

        x.store(100.0f64.to_bits(), std::sync::atomic::Ordering::SeqCst);
        assert!(a.discover().is_empty());
        x.store(1.0f64.to_bits(), std::sync::atomic::Ordering::SeqCst);
        assert_eq!(a.discover(), vec!["B".to_string()]);
    }
}
