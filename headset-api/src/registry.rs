use slotmap::SlotMap;

use crate::controller::{Controller, ControllerHand, ControllerHandle};

/// Owns the set of tracked controllers for one driver instance.
///
/// Entries are added and removed in response to vendor events; the registry is
/// destroyed with its driver and never survives a driver swap. Lookup through
/// a removed (or foreign) handle yields `None`, which accessors translate into
/// neutral values.
#[derive(Default)]
pub struct ControllerRegistry {
    slots: SlotMap<ControllerHandle, Controller>,
    order: Vec<ControllerHandle>,
}

impl ControllerRegistry {
    pub fn new() -> ControllerRegistry {
        ControllerRegistry::default()
    }

    pub fn add(&mut self, device_index: u32, hand: ControllerHand) -> ControllerHandle {
        let handle = self.slots.insert(Controller {
            device_index,
            hand,
            connected: true,
        });
        self.order.push(handle);
        handle
    }

    pub fn remove(&mut self, handle: ControllerHandle) -> bool {
        if self.slots.remove(handle).is_some() {
            self.order.retain(|h| *h != handle);
            true
        } else {
            false
        }
    }

    /// Removes the controller with the given vendor device index, if present.
    pub fn remove_by_device(&mut self, device_index: u32) -> Option<ControllerHandle> {
        let handle = self.find_by_device(device_index)?;
        self.remove(handle);
        Some(handle)
    }

    pub fn find_by_device(&self, device_index: u32) -> Option<ControllerHandle> {
        self.order
            .iter()
            .copied()
            .find(|h| self.slots.get(*h).map(|c| c.device_index) == Some(device_index))
    }

    pub fn get(&self, handle: ControllerHandle) -> Option<&Controller> {
        self.slots.get(handle)
    }

    pub fn get_mut(&mut self, handle: ControllerHandle) -> Option<&mut Controller> {
        self.slots.get_mut(handle)
    }

    /// Handles in connection order.
    pub fn handles(&self) -> Vec<ControllerHandle> {
        self.order.clone()
    }

    pub fn count(&self) -> usize {
        self.order.len()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_handle_stays_dead() {
        let mut registry = ControllerRegistry::new();
        let a = registry.add(3, ControllerHand::Left);
        assert!(registry.remove(a));
        assert!(registry.get(a).is_none());
        assert!(!registry.remove(a));

        // A new controller on the same device index must not be reachable
        // through the old handle.
        let b = registry.add(3, ControllerHand::Left);
        assert!(registry.get(a).is_none());
        assert_ne!(a, b);
        assert_eq!(registry.get(b).unwrap().device_index, 3);
    }

    #[test]
    fn handles_keep_connection_order() {
        let mut registry = ControllerRegistry::new();
        let a = registry.add(7, ControllerHand::Left);
        let b = registry.add(2, ControllerHand::Right);
        let c = registry.add(5, ControllerHand::Unknown);
        assert_eq!(registry.handles(), vec![a, b, c]);

        registry.remove(b);
        assert_eq!(registry.handles(), vec![a, c]);
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn find_by_device_resolves_the_live_entry() {
        let mut registry = ControllerRegistry::new();
        registry.add(1, ControllerHand::Left);
        let b = registry.add(4, ControllerHand::Right);
        assert_eq!(registry.find_by_device(4), Some(b));
        assert_eq!(registry.find_by_device(9), None);

        let removed = registry.remove_by_device(4);
        assert_eq!(removed, Some(b));
        assert_eq!(registry.find_by_device(4), None);
    }
}
