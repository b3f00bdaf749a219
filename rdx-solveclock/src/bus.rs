//! The synchronous publish/subscribe dispatcher every component talks through.

use crate::common::ListenerId;
use crate::events::{EventKind, SystemEvent, TimerEvent};
use parking_lot::RwLock;
use slotmap::SlotMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// A registered callback. Shared so that `emit` can snapshot it and release
/// the registry lock before calling out.
pub type Listener = Arc<dyn Fn(&TimerEvent) + Send + Sync>;

struct Registration {
    kind: EventKind,
    callback: Listener,
}

#[derive(Default)]
struct Registry {
    listeners: SlotMap<ListenerId, Registration>,
    order: HashMap<EventKind, Vec<ListenerId>>,
}

impl Registry {
    fn insert_with_key(
        &mut self,
        kind: EventKind,
        make: impl FnOnce(ListenerId) -> Listener,
    ) -> ListenerId {
        let id = self.listeners.insert_with_key(|id| Registration {
            kind,
            callback: make(id),
        });
        self.order.entry(kind).or_default().push(id);
        id
    }

    fn remove(&mut self, kind: EventKind, id: ListenerId) -> bool {
        match self.listeners.get(id) {
            Some(registration) if registration.kind == kind => {}
            _ => return false,
        }
        self.listeners.remove(id);
        if let Some(ids) = self.order.get_mut(&kind) {
            ids.retain(|registered| *registered != id);
        }
        true
    }
}

/// The event bus.
///
/// An `EventBus` is a cheap, cloneable handle: every clone shares one listener
/// registry. Components are handed a clone at construction and keep it, which
/// is how they both emit and get listened to without owning each other.
///
/// Delivery is synchronous and in registration order. `emit` snapshots the
/// listener list first and never holds the registry lock while a listener
/// runs, so listeners may register, unregister, or emit again from inside a
/// callback.
#[derive(Clone)]
pub struct EventBus {
    registry: Arc<RwLock<Registry>>,
    system_event_sender: broadcast::Sender<SystemEvent>,
}

/// A non-owning handle, held by `once` wrappers so a listener never keeps its
/// own bus alive.
#[derive(Clone)]
struct WeakBus {
    registry: Weak<RwLock<Registry>>,
    system_event_sender: broadcast::Sender<SystemEvent>,
}

impl WeakBus {
    fn upgrade(&self) -> Option<EventBus> {
        self.registry.upgrade().map(|registry| EventBus {
            registry,
            system_event_sender: self.system_event_sender.clone(),
        })
    }
}

impl EventBus {
    /// Creates a bus with an empty registry.
    pub fn new() -> Self {
        let (system_event_sender, _) = broadcast::channel(64);
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            system_event_sender,
        }
    }

    /// Appends `listener` to the listeners of `kind`.
    ///
    /// Registration never deduplicates: the same closure registered twice gets
    /// two ids and fires twice.
    pub fn register(
        &self,
        kind: EventKind,
        listener: impl Fn(&TimerEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let callback: Listener = Arc::new(listener);
        let id = self
            .registry
            .write()
            .insert_with_key(kind, move |_| callback);
        self.announce_added(id, kind);
        id
    }

    /// Registers a listener that fires at most once, then removes itself.
    ///
    /// The wrapper claims its single invocation before calling `listener`, so
    /// a re-entrant emission of the same kind from inside the listener does
    /// not fire it again.
    pub fn once(
        &self,
        kind: EventKind,
        listener: impl Fn(&TimerEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let weak = self.downgrade();
        let id = self.registry.write().insert_with_key(kind, move |id| {
            let fired = AtomicBool::new(false);
            let wrapper: Listener = Arc::new(move |event: &TimerEvent| {
                if fired.swap(true, Ordering::AcqRel) {
                    return;
                }
                if let Some(bus) = weak.upgrade() {
                    bus.unregister(kind, id);
                }
                listener(event);
            });
            wrapper
        });
        self.announce_added(id, kind);
        id
    }

    /// Removes the listener `id` from `kind`.
    ///
    /// Removing a listener that is absent, or registered under another kind, is
    /// a no-op. Returns whether anything was removed.
    pub fn unregister(&self, kind: EventKind, id: ListenerId) -> bool {
        let removed = self.registry.write().remove(kind, id);
        if removed {
            trace!(?id, %kind, "Listener removed.");
            self.system_event_sender
                .send(SystemEvent::ListenerRemoved { id, kind })
                .ok();
        } else {
            debug!(?id, %kind, "Ignoring removal of a listener that is not registered.");
            self.system_event_sender
                .send(SystemEvent::UnknownListener { id, kind })
                .ok();
        }
        removed
    }

    /// Delivers `event` to every listener currently registered for its kind.
    pub fn emit(&self, event: &TimerEvent) {
        let kind = event.kind();
        let snapshot: Vec<Listener> = {
            let registry = self.registry.read();
            registry
                .order
                .get(&kind)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| registry.listeners.get(*id))
                        .map(|registration| Arc::clone(&registration.callback))
                        .collect()
                })
                .unwrap_or_default()
        };
        trace!(%kind, listeners = snapshot.len(), "Emitting event.");
        for listener in snapshot {
            listener(event);
        }
    }

    /// Removes every listener for `kind`, or the whole registry when `kind` is `None`.
    pub fn clear(&self, kind: Option<EventKind>) {
        let removed: Vec<(ListenerId, EventKind)> = {
            let mut registry = self.registry.write();
            let kinds: Vec<EventKind> = match kind {
                Some(kind) => vec![kind],
                None => registry.order.keys().copied().collect(),
            };
            let mut removed = Vec::new();
            for kind in kinds {
                for id in registry.order.remove(&kind).unwrap_or_default() {
                    if registry.listeners.remove(id).is_some() {
                        removed.push((id, kind));
                    }
                }
            }
            removed
        };
        debug!(count = removed.len(), "Cleared listeners.");
        for (id, kind) in removed {
            self.system_event_sender
                .send(SystemEvent::ListenerRemoved { id, kind })
                .ok();
        }
    }

    /// The number of listeners currently registered for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.registry
            .read()
            .order
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Subscribes to the `SystemEvent` diagnostics stream.
    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_event_sender.subscribe()
    }

    pub(crate) fn publish_system_event(&self, event: SystemEvent) {
        self.system_event_sender.send(event).ok();
    }

    fn downgrade(&self) -> WeakBus {
        WeakBus {
            registry: Arc::downgrade(&self.registry),
            system_event_sender: self.system_event_sender.clone(),
        }
    }

    fn announce_added(&self, id: ListenerId, kind: EventKind) {
        trace!(?id, %kind, "Listener added.");
        self.system_event_sender
            .send(SystemEvent::ListenerAdded { id, kind })
            .ok();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
