use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::Value;

type Callback = Box<dyn Fn(&Value, &Value) + Send>;

/// Handle returned by `subscribe`; pass it back to `unsubscribe` to
/// de-register the callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    property: String,
    id: u64,
}

/// Observer registry keyed by state property name. Every tracked write
/// notifies all subscribers for that property with (new, old). A panicking
/// subscriber is logged and isolated; the remaining subscribers still run.
#[derive(Default)]
pub struct StateBus {
    listeners: HashMap<String, Vec<(u64, Callback)>>,
    next_id: u64,
}

impl StateBus {
    pub fn new() -> Self {
        StateBus::default()
    }

    pub fn subscribe<F>(&mut self, property: &str, callback: F) -> Subscription
    where
        F: Fn(&Value, &Value) + Send + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners
            .entry(property.to_string())
            .or_default()
            .push((id, Box::new(callback)));
        Subscription {
            property: property.to_string(),
            id,
        }
    }

    pub fn unsubscribe(&mut self, subscription: &Subscription) {
        if let Some(callbacks) = self.listeners.get_mut(&subscription.property) {
            callbacks.retain(|(id, _)| *id != subscription.id);
        }
    }

    pub fn notify(&self, property: &str, new_value: &Value, old_value: &Value) {
        let Some(callbacks) = self.listeners.get(property) else {
            return;
        };
        for (_, callback) in callbacks {
            let result = catch_unwind(AssertUnwindSafe(|| callback(new_value, old_value)));
            if result.is_err() {
                log::error!("state listener for '{}' panicked", property);
            }
        }
    }

    #[cfg(test)]
    pub fn listener_count(&self, property: &str) -> usize {
        self.listeners.get(property).map_or(0, |c| c.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn notifies_subscribers_with_new_and_old() {
        let mut bus = StateBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();
        bus.subscribe("plannings", move |new, old| {
            assert_eq!(new, &json!(2));
            assert_eq!(old, &json!(1));
            seen2.fetch_add(1, Ordering::SeqCst);
        });

        bus.notify("plannings", &json!(2), &json!(1));
        bus.notify("other", &json!(0), &json!(0));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = StateBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();
        let sub = bus.subscribe("favorites", move |_, _| {
            seen2.fetch_add(1, Ordering::SeqCst);
        });

        bus.notify("favorites", &json!(null), &json!(null));
        bus.unsubscribe(&sub);
        bus.notify("favorites", &json!(null), &json!(null));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count("favorites"), 0);
    }

    #[test]
    fn panicking_subscriber_does_not_block_others() {
        let mut bus = StateBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();
        bus.subscribe("conflicts", |_, _| panic!("bad listener"));
        bus.subscribe("conflicts", move |_, _| {
            seen2.fetch_add(1, Ordering::SeqCst);
        });

        bus.notify("conflicts", &json!(null), &json!(null));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
