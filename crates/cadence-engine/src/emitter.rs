//! Per-ugen event listeners.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::context::Context;
use crate::ugen::UGenKey;

/// An event raised by a ugen, e.g. `"end"` when an envelope finishes.
#[derive(Clone, Debug, PartialEq)]
pub struct UGenEvent {
    pub name: String,
    pub playback_time: f64,
    /// Key of the ugen that raised it.
    pub source: UGenKey,
}

/// Listeners are compared by identity, so keep the `Rc` to remove one later.
pub type Listener = Rc<dyn Fn(&mut Context, &UGenEvent)>;

struct Registration {
    listener: Listener,
    once: bool,
}

#[derive(Default)]
pub struct Emitter {
    listeners: BTreeMap<String, Vec<Registration>>,
}

impl Emitter {
    /// Create an emitter with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `listener` on every `event`.
    pub fn on(&mut self, event: &str, listener: Listener) {
        self.add(event, listener, false);
    }

    /// Listen for the next `event` only.
    pub fn once(&mut self, event: &str, listener: Listener) {
        self.add(event, listener, true);
    }

    fn add(&mut self, event: &str, listener: Listener, once: bool) {
        self.listeners
            .entry(event.to_string())
            .or_default()
            .push(Registration { listener, once });
    }

    /// Remove every registration of `listener` for `event`.
    pub fn off(&mut self, event: &str, listener: &Listener) {
        if let Some(list) = self.listeners.get_mut(event) {
            list.retain(|r| !Rc::ptr_eq(&r.listener, listener));
            if list.is_empty() {
                self.listeners.remove(event);
            }
        }
    }

    /// Whether anything listens for `event`.
    pub fn has_listeners(&self, event: &str) -> bool {
        self.listeners.get(event).is_some_and(|l| !l.is_empty())
    }

    /// Listeners for `event`, in registration order.
    pub fn listeners(&self, event: &str) -> Vec<Listener> {
        self.listeners
            .get(event)
            .map(|l| l.iter().map(|r| r.listener.clone()).collect())
            .unwrap_or_default()
    }

    /// Listeners to call for one emission of `event`; once-listeners are
    /// removed as they are handed out.
    pub fn take_for_emit(&mut self, event: &str) -> Vec<Listener> {
        let Some(list) = self.listeners.get_mut(event) else {
            return Vec::new();
        };
        let fire = list.iter().map(|r| r.listener.clone()).collect();
        list.retain(|r| !r.once);
        if list.is_empty() {
            self.listeners.remove(event);
        }
        fire
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.listeners.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}
