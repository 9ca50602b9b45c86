//! Process-wide table resolving engine callback handles to live controllers.
//!
//! The engine only stores an opaque integer. Each handle names a slot plus the
//! generation the slot had when the controller registered, so a handle that
//! outlives its controller, or whose slot was reused, resolves to nothing.

use std::fmt::{self, Display, Formatter};
use std::sync::{Arc, Weak};

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::bridge::EventBridge;

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::default()));

/// Generation-checked token the engine hands back on every callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerHandle {
    slot: u32,
    generation: u32,
}

impl ControllerHandle {
    /// Pack the handle into the integer stored by the engine.
    #[must_use]
    pub const fn to_raw(self) -> u64 {
        ((self.generation as u64) << 32) | self.slot as u64
    }

    /// Unpack an integer previously produced by [`ControllerHandle::to_raw`].
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self {
            slot: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

impl Display for ControllerHandle {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.slot, self.generation)
    }
}

#[derive(Default)]
struct Registry {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

struct Slot {
    // Generations start at 1, so a raw handle of 0 never resolves.
    generation: u32,
    bridge: Option<Weak<EventBridge>>,
}

/// Register a bridge and return the handle the engine should report back.
pub(crate) fn register(bridge: &Arc<EventBridge>) -> ControllerHandle {
    let mut registry = REGISTRY.write();
    let weak = Arc::downgrade(bridge);
    if let Some(slot) = registry.free.pop() {
        let entry = &mut registry.slots[slot as usize];
        entry.bridge = Some(weak);
        return ControllerHandle {
            slot,
            generation: entry.generation,
        };
    }

    #[allow(clippy::cast_possible_truncation)]
    let slot = registry.slots.len() as u32;
    registry.slots.push(Slot {
        generation: 1,
        bridge: Some(weak),
    });
    ControllerHandle {
        slot,
        generation: 1,
    }
}

/// Invalidate `handle`. Returns `false` if it was already stale.
pub(crate) fn deregister(handle: ControllerHandle) -> bool {
    let mut registry = REGISTRY.write();
    let Some(entry) = registry.slots.get_mut(handle.slot as usize) else {
        return false;
    };
    if entry.generation != handle.generation || entry.bridge.is_none() {
        return false;
    }
    entry.bridge = None;
    entry.generation = entry.generation.wrapping_add(1).max(1);
    registry.free.push(handle.slot);
    true
}

/// Resolve `handle` to its bridge if the controller is still alive.
pub(crate) fn lookup(handle: ControllerHandle) -> Option<Arc<EventBridge>> {
    let registry = REGISTRY.read();
    let entry = registry.slots.get(handle.slot as usize)?;
    if entry.generation != handle.generation {
        return None;
    }
    entry.bridge.as_ref().and_then(Weak::upgrade)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trip_preserves_fields() {
        let handle = ControllerHandle {
            slot: 7,
            generation: 3,
        };
        assert_eq!(ControllerHandle::from_raw(handle.to_raw()), handle);
        assert_eq!(handle.to_string(), "7:3");
    }

    #[test]
    fn registered_bridge_resolves_until_deregistered() {
        let bridge = Arc::new(EventBridge::new(None));
        let handle = register(&bridge);

        let resolved = lookup(handle).expect("live handle");
        assert!(Arc::ptr_eq(&resolved, &bridge));

        assert!(deregister(handle));
        assert!(lookup(handle).is_none());
        assert!(!deregister(handle), "second deregister is stale");
    }

    #[test]
    fn reused_slot_rejects_old_generation() {
        let first = Arc::new(EventBridge::new(None));
        let old = register(&first);
        assert!(deregister(old));

        let second = Arc::new(EventBridge::new(None));
        let fresh = register(&second);
        assert!(lookup(old).is_none());
        let resolved = lookup(fresh).expect("fresh handle");
        assert!(Arc::ptr_eq(&resolved, &second));
        assert!(deregister(fresh));
    }

    #[test]
    fn dropped_bridge_does_not_resolve() {
        let bridge = Arc::new(EventBridge::new(None));
        let handle = register(&bridge);
        drop(bridge);
        assert!(lookup(handle).is_none());
        assert!(deregister(handle));
    }

    #[test]
    fn zero_handle_never_resolves() {
        assert!(lookup(ControllerHandle::from_raw(0)).is_none());
    }
}
