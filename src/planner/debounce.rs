use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::DEBOUNCE_DELAY_MS;

/// Coalesces bursts of repeated triggers: scheduling the same key again
/// pushes its deadline back, so only the last trigger in a burst becomes due.
/// The owner polls `take_due` and dispatches on the returned keys; this keeps
/// the mechanism free of callbacks and safe in single-threaded use.
#[derive(Debug, Default)]
pub struct Debouncer {
    deadlines: HashMap<String, Instant>,
}

impl Debouncer {
    pub fn new() -> Self {
        Debouncer::default()
    }

    pub fn schedule(&mut self, key: &str, delay: Duration) {
        self.deadlines.insert(key.to_string(), Instant::now() + delay);
    }

    pub fn schedule_default(&mut self, key: &str) {
        self.schedule(key, Duration::from_millis(DEBOUNCE_DELAY_MS));
    }

    pub fn cancel(&mut self, key: &str) {
        self.deadlines.remove(key);
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.deadlines.contains_key(key)
    }

    /// Removes and returns all keys whose deadline has passed.
    pub fn take_due(&mut self) -> Vec<String> {
        let now = Instant::now();
        let due: Vec<String> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| now >= **deadline)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &due {
            self.deadlines.remove(key);
        }
        due
    }

    /// Removes and returns every scheduled key regardless of deadline.
    /// Used on shutdown so pending flushes are not lost.
    pub fn drain(&mut self) -> Vec<String> {
        let keys: Vec<String> = self.deadlines.keys().cloned().collect();
        self.deadlines.clear();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescheduling_replaces_the_deadline() {
        let mut debouncer = Debouncer::new();
        debouncer.schedule("save_settings", Duration::from_millis(5));
        debouncer.schedule("save_settings", Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(15));
        // The burst's last trigger wins; nothing is due yet
        assert!(debouncer.take_due().is_empty());
        assert!(debouncer.is_pending("save_settings"));
    }

    #[test]
    fn due_keys_fire_once() {
        let mut debouncer = Debouncer::new();
        debouncer.schedule("save_settings", Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(debouncer.take_due(), vec!["save_settings".to_string()]);
        assert!(debouncer.take_due().is_empty());
    }

    #[test]
    fn cancel_clears_a_pending_key() {
        let mut debouncer = Debouncer::new();
        debouncer.schedule("refresh", Duration::from_millis(1));
        debouncer.cancel("refresh");
        std::thread::sleep(Duration::from_millis(5));
        assert!(debouncer.take_due().is_empty());
    }

    #[test]
    fn drain_returns_everything() {
        let mut debouncer = Debouncer::new();
        debouncer.schedule("a", Duration::from_secs(60));
        debouncer.schedule("b", Duration::from_secs(60));
        let mut drained = debouncer.drain();
        drained.sort();
        assert_eq!(drained, vec!["a".to_string(), "b".to_string()]);
        assert!(!debouncer.is_pending("a"));
    }
}
