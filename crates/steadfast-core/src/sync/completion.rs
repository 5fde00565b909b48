//! One-shot value slot that waiters can block on with a deadline.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// A write-once cell plus a condition variable.
#[derive(Debug)]
pub struct Completion<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T: Clone> Completion<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Publish the value and wake every waiter. The first call wins;
    /// returns false if a value was already set.
    pub fn complete(&self, value: T) -> bool {
        let mut slot = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        self.ready.notify_all();
        true
    }

    /// Block until a value is published or `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(ref value) = *slot {
                return Some(value.clone());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let (guard, _) = self
                .ready
                .wait_timeout(slot, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            slot = guard;
        }
    }
}

impl<T: Clone> Default for Completion<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn wait_times_out_without_value() {
        let c: Completion<u32> = Completion::new();
        assert_eq!(c.wait(Duration::from_millis(10)), None);
    }

    #[test]
    fn first_complete_wins() {
        let c = Completion::new();
        assert!(c.complete(1));
        assert!(!c.complete(2));
        assert_eq!(c.wait(Duration::ZERO), Some(1));
    }

    #[test]
    fn waiter_is_woken_by_another_thread() {
        let c = Arc::new(Completion::new());
        let writer = Arc::clone(&c);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            writer.complete("done".to_string());
        });
        assert_eq!(c.wait(Duration::from_secs(5)), Some("done".to_string()));
        handle.join().unwrap();
    }
}
