// ── Accessory-layer contract ──
//
// The engine never builds accessories itself. It calls an `AccessoryHost`
// during each reconciliation pass and hands it a `Registrar` scoped to the
// device, through which the host registers attribute observers.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::model::{DeviceId, DeviceRecord};
use crate::store::AttributeIndex;

/// Something that re-reads a device attribute when it changes.
///
/// Called with the state lock held: implementations must not call back
/// into the engine.
pub trait AttributeObserver: Send + Sync {
    fn refresh(&self, device: &DeviceRecord, attribute: &str);
}

/// Non-owning reference to an observer.
#[derive(Clone)]
pub struct ObserverHandle(Weak<dyn AttributeObserver>);

impl ObserverHandle {
    pub fn new<O: AttributeObserver + 'static>(observer: &Arc<O>) -> Self {
        let weak: Weak<O> = Arc::downgrade(observer);
        Self(weak)
    }

    pub fn upgrade(&self) -> Option<Arc<dyn AttributeObserver>> {
        self.0.upgrade()
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Whether both handles point at the same observer allocation.
    pub fn same_observer(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl From<&Arc<dyn AttributeObserver>> for ObserverHandle {
    fn from(observer: &Arc<dyn AttributeObserver>) -> Self {
        Self(Arc::downgrade(observer))
    }
}

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// The create/update/remove contract the reconciliation passes drive.
///
/// All three run synchronously under the engine's state lock.
pub trait AccessoryHost: Send + Sync {
    /// A device appeared. Register observers for its exposed capabilities.
    fn create(&self, device: &Arc<DeviceRecord>, registrar: &mut Registrar<'_>);

    /// A known device was refreshed from the inventory. Its previous
    /// registrations are dropped first, so register observers for the
    /// capabilities it exposes now.
    fn update(&self, device: &Arc<DeviceRecord>, registrar: &mut Registrar<'_>);

    /// A device disappeared. Its observer registrations are purged right
    /// after this returns.
    fn remove(&self, device: &DeviceRecord);
}

/// Observer registration scoped to a single device.
pub struct Registrar<'a> {
    device_id: &'a DeviceId,
    index: &'a mut AttributeIndex,
    registered: usize,
}

impl<'a> Registrar<'a> {
    pub(crate) fn new(device_id: &'a DeviceId, index: &'a mut AttributeIndex) -> Self {
        Self {
            device_id,
            index,
            registered: 0,
        }
    }

    pub fn device_id(&self) -> &DeviceId {
        self.device_id
    }

    /// Register `handle` for one attribute of this device.
    pub fn register(&mut self, attribute: &str, handle: ObserverHandle) -> bool {
        let added = self
            .index
            .register_observer(self.device_id, attribute, handle);
        if added {
            self.registered += 1;
        }
        added
    }

    /// Register `handle` for several attributes at once.
    pub fn register_all<'s>(
        &mut self,
        attributes: impl IntoIterator<Item = &'s str>,
        handle: &ObserverHandle,
    ) -> usize {
        attributes
            .into_iter()
            .filter(|attribute| self.register(attribute, handle.clone()))
            .count()
    }

    /// New registrations made through this registrar.
    pub fn registered(&self) -> usize {
        self.registered
    }
}
