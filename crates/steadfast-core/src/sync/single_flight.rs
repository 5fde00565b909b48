//! Single-flight execution keyed by an arbitrary value.
//!
//! The first caller for a key runs the work; concurrent callers for the same
//! key wait (bounded) for its result instead of running it again.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::Completion;

type Call<V> = Arc<Completion<Result<V, String>>>;

/// Why a single-flight call did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlightError<E> {
    /// This caller ran the work and it failed.
    Failed(E),
    /// This caller waited on another caller whose work failed.
    LeaderFailed { reason: String },
    /// This caller waited on another caller past the deadline.
    TimedOut { waited: Duration },
}

/// Coalesces concurrent calls that share a key.
pub struct SingleFlight<K, V> {
    calls: Mutex<HashMap<K, Call<V>>>,
}

impl<K, V> SingleFlight<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Run `work` for `key` unless a call for `key` is already in flight, in
    /// which case wait at most `timeout` for that call's result.
    pub fn run<F, E>(&self, key: K, timeout: Duration, work: F) -> Result<V, FlightError<E>>
    where
        F: FnOnce() -> Result<V, E>,
        E: Display,
    {
        let (call, leader) = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            match calls.get(&key) {
                Some(call) => (Arc::clone(call), false),
                None => {
                    let call: Call<V> = Arc::new(Completion::new());
                    calls.insert(key.clone(), Arc::clone(&call));
                    (call, true)
                }
            }
        };

        if !leader {
            return match call.wait(timeout) {
                Some(Ok(value)) => Ok(value),
                Some(Err(reason)) => Err(FlightError::LeaderFailed { reason }),
                None => Err(FlightError::TimedOut { waited: timeout }),
            };
        }

        let _guard = LeaderGuard {
            flight: self,
            key,
            call: Arc::clone(&call),
        };
        match work() {
            Ok(value) => {
                call.complete(Ok(value.clone()));
                Ok(value)
            }
            Err(e) => {
                call.complete(Err(e.to_string()));
                Err(FlightError::Failed(e))
            }
        }
    }

    /// Number of keys currently being computed.
    pub fn in_flight(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Unregisters the leader's call on every exit path, including unwinding.
struct LeaderGuard<'a, K: Hash + Eq + Clone, V: Clone> {
    flight: &'a SingleFlight<K, V>,
    key: K,
    call: Call<V>,
}

impl<K: Hash + Eq + Clone, V: Clone> Drop for LeaderGuard<'_, K, V> {
    fn drop(&mut self) {
        // No-op when the leader already published a result.
        self.call.complete(Err("leader abandoned the call".to_string()));
        let mut calls = self
            .flight
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if calls
            .get(&self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &self.call))
        {
            calls.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    #[test]
    fn concurrent_callers_share_one_execution() {
        let flight: Arc<SingleFlight<String, u64>> = Arc::new(SingleFlight::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let flight = Arc::clone(&flight);
                let runs = Arc::clone(&runs);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    flight.run("view".to_string(), Duration::from_secs(5), || {
                        runs.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(50));
                        Ok::<_, String>(42)
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(42));
        }
        // Late arrivals after the leader finished run again; with the barrier
        // and a 50ms body that cannot happen for all eight.
        assert!(runs.load(Ordering::SeqCst) < 8);
        assert_eq!(flight.in_flight(), 0);
    }

    #[test]
    fn leader_failure_is_reported_to_the_leader() {
        let flight: SingleFlight<&str, u64> = SingleFlight::new();
        let result = flight.run("k", Duration::from_secs(1), || Err::<u64, _>("boom"));
        assert_eq!(result, Err(FlightError::Failed("boom")));
        assert_eq!(flight.in_flight(), 0);
    }

    #[test]
    fn follower_times_out_on_slow_leader() {
        let flight: Arc<SingleFlight<&'static str, u64>> = Arc::new(SingleFlight::new());
        let leader_flight = Arc::clone(&flight);
        let started = Arc::new(Barrier::new(2));
        let leader_started = Arc::clone(&started);
        let leader = std::thread::spawn(move || {
            leader_flight.run("k", Duration::from_secs(5), || {
                leader_started.wait();
                std::thread::sleep(Duration::from_millis(300));
                Ok::<_, String>(1)
            })
        });
        started.wait();
        let follower = flight.run("k", Duration::from_millis(20), || Ok::<_, String>(2));
        assert!(matches!(follower, Err(FlightError::TimedOut { .. })));
        assert_eq!(leader.join().unwrap(), Ok(1));
    }
}
