//! Collapses concurrent refreshes of the same key into one.
//!
//! The first caller to miss on a key becomes the leader and runs the refresh.
//! Callers arriving while that refresh is running become followers: they
//! never run the refresh themselves and receive a clone of the leader's
//! outcome, success or error. Once the leader publishes, the key is free
//! again and the next miss starts a new flight.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::cache::CacheKey;
use crate::error::{FxError, FxResult};

type Outcome<T> = Option<FxResult<T>>;

struct Flight<T> {
    id: u64,
    outcome: watch::Receiver<Outcome<T>>,
}

enum Role<T> {
    Leader(u64, watch::Sender<Outcome<T>>),
    Follower(watch::Receiver<Outcome<T>>),
}

/// Per-key single-flight coordinator.
pub struct SingleFlight<T> {
    flights: Mutex<HashMap<CacheKey, Flight<T>>>,
    next_id: AtomicU64,
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Run `refresh` for `key` unless a refresh for it is already running,
    /// in which case wait for that one and share its outcome.
    pub async fn run_once<F, Fut>(&self, key: &CacheKey, refresh: F) -> FxResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FxResult<T>>,
    {
        match self.join(key) {
            Role::Follower(mut outcome) => {
                debug!(key = %key, "Joining in-flight refresh");
                let shared = outcome
                    .wait_for(|state| state.is_some())
                    .await
                    .map(|state| (*state).clone());

                match shared {
                    Ok(Some(result)) => result,
                    _ => Err(FxError::RefreshCancelled(key.clone())),
                }
            }
            Role::Leader(id, publisher) => {
                debug!(key = %key, "Leading refresh");
                // Clears the marker even if this future is dropped mid-refresh;
                // followers then see the sender go away.
                let _landing = Landing {
                    flights: self,
                    key,
                    id,
                };

                let result = refresh().await;
                publisher.send_replace(Some(result.clone()));
                result
            }
        }
    }

    /// Check whether a refresh for `key` is running.
    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.flights.lock().contains_key(key)
    }

    /// Number of refreshes currently running.
    pub fn in_flight(&self) -> usize {
        self.flights.lock().len()
    }

    fn join(&self, key: &CacheKey) -> Role<T> {
        let mut flights = self.flights.lock();
        if let Some(flight) = flights.get(key) {
            return Role::Follower(flight.outcome.clone());
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (publisher, outcome) = watch::channel(None);
        flights.insert(key.clone(), Flight { id, outcome });
        Role::Leader(id, publisher)
    }
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes the leader's in-flight marker when dropped.
struct Landing<'a, T> {
    flights: &'a SingleFlight<T>,
    key: &'a CacheKey,
    id: u64,
}

impl<T> Drop for Landing<'_, T> {
    fn drop(&mut self) {
        let mut flights = self.flights.flights.lock();
        if flights.get(self.key).is_some_and(|flight| flight.id == self.id) {
            flights.remove(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use ratecache_common::{AsOf, Currency};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    type Flights = SingleFlight<u32>;

    fn key(base: &str) -> CacheKey {
        CacheKey::new(Currency::new(base), AsOf::Latest)
    }

    #[tokio::test]
    async fn test_leader_runs_refresh() {
        let flights = Flights::new();

        let result = flights.run_once(&key("AUD"), || async { Ok(7) }).await;

        assert_eq!(result, Ok(7));
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_refresh() {
        let flights = Arc::new(Flights::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let flights = flights.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                flights
                    .run_once(&key("AUD"), || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!flights.is_in_flight(&key("AUD")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failure_reaches_every_waiter_and_clears_marker() {
        let flights = Arc::new(Flights::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let failure = FxError::SourceUnavailable(SourceError::Transport("reset".into()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flights = flights.clone();
            let calls = calls.clone();
            let failure = failure.clone();
            handles.push(tokio::spawn(async move {
                flights
                    .run_once(&key("AUD"), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Err(failure)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Err(failure.clone()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The next call is free to retry.
        let retried = flights.run_once(&key("AUD"), || async { Ok(1) }).await;
        assert_eq!(retried, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_different_keys_do_not_block_each_other() {
        let flights = Arc::new(Flights::new());

        let slow = {
            let flights = flights.clone();
            tokio::spawn(async move {
                flights
                    .run_once(&key("AUD"), || async {
                        tokio::time::sleep(Duration::from_millis(500)).await;
                        Ok(1)
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(flights.is_in_flight(&key("AUD")));

        let fast = tokio::time::timeout(
            Duration::from_millis(200),
            flights.run_once(&key("NZD"), || async { Ok(2) }),
        )
        .await
        .expect("refresh for another key must not wait");

        assert_eq!(fast, Ok(2));
        assert_eq!(slow.await.unwrap(), Ok(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancelled_leader_releases_followers() {
        let flights = Arc::new(Flights::new());

        let leader = {
            let flights = flights.clone();
            tokio::spawn(async move {
                flights
                    .run_once(&key("AUD"), || async {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok(1)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let follower = {
            let flights = flights.clone();
            tokio::spawn(async move {
                flights
                    .run_once(&key("AUD"), || async { Ok(2) })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        leader.abort();

        let result = follower.await.unwrap();
        assert_eq!(result, Err(FxError::RefreshCancelled(key("AUD"))));
        assert!(!flights.is_in_flight(&key("AUD")));
    }
}
