//! Fragment Debouncer (§4.6) — per-user quiet-period timer that drains the
//! Fragment Store and submits one turn.
//!
//! Cancel-or-reset is implemented with a per-user generation counter
//! (§9 Design Notes, option b): arming bumps the counter; when a sleeping
//! timer wakes it checks whether its generation is still current before
//! draining and firing the callback. A cancelled timer loses that check
//! and never invokes the callback, even if it was "about to fire".
//!
//! Per-user serialization (turns are strictly serial per user, §5) is a
//! separate concern from cancel-or-reset: a `tokio::sync::Mutex` per user
//! is held across the callback so that a later-armed timer which happens
//! to fire while an earlier callback is still running waits for it rather
//! than racing it.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, Notify};

use relay_domain::fragment::{join_fragments, UserKey};
use relay_domain::trace::TraceEvent;

use crate::store::FragmentStore;

pub type TurnCallback =
    Arc<dyn Fn(UserKey, String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Decrements `in_flight` and wakes `shutdown`'s waiter when a spawned timer
/// task ends, on every return path (superseded, empty drain, or fired).
struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

pub struct Debouncer {
    store: Arc<FragmentStore>,
    quiet_period: Duration,
    generations: Arc<Mutex<HashMap<UserKey, u64>>>,
    turn_locks: Arc<Mutex<HashMap<UserKey, Arc<AsyncMutex<()>>>>>,
    callback: TurnCallback,
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Debouncer {
    pub fn new(store: Arc<FragmentStore>, quiet_period: Duration, callback: TurnCallback) -> Self {
        Self {
            store,
            quiet_period,
            generations: Arc::new(Mutex::new(HashMap::new())),
            turn_locks: Arc::new(Mutex::new(HashMap::new())),
            callback,
            in_flight: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    /// Append `fragment` for `user` and (re-)arm its quiet-period timer.
    pub async fn enqueue(&self, user: UserKey, fragment: impl Into<String>) {
        let ordinal = self.store.append(&user, fragment);
        TraceEvent::FragmentAppended {
            user_key: user.clone(),
            ordinal,
        }
        .emit();

        let my_gen = {
            let mut gens = self.generations.lock();
            let slot = gens.entry(user.clone()).or_insert(0);
            *slot += 1;
            *slot
        };

        let store = self.store.clone();
        let quiet_period = self.quiet_period;
        let generations = self.generations.clone();
        let turn_locks = self.turn_locks.clone();
        let callback = self.callback.clone();

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.in_flight.clone();
        let idle = self.idle.clone();

        tokio::spawn(async move {
            let _guard = InFlightGuard { in_flight, idle };

            tokio::time::sleep(quiet_period).await;

            if !Self::try_claim(&generations, &user, my_gen) {
                return; // superseded by a later fragment; drop this firing.
            }

            let lock = {
                let mut locks = turn_locks.lock();
                locks.entry(user.clone()).or_default().clone()
            };
            let _permit = lock.lock().await;

            let fragments = store.drain(&user);
            if fragments.is_empty() {
                return;
            }
            let utterance = join_fragments(&fragments);
            TraceEvent::TurnDebounced {
                user_key: user.clone(),
                fragment_count: fragments.len(),
            }
            .emit();

            callback(user, utterance).await;
        });
    }

    /// Returns `true` iff `user`'s current generation is still `gen` — i.e.
    /// this timer was not superseded by a later `enqueue`. Clears the entry
    /// on success so the next `enqueue` starts a fresh generation from the
    /// baseline rather than racing a half-consumed one.
    fn try_claim(generations: &Mutex<HashMap<UserKey, u64>>, user: &UserKey, gen: u64) -> bool {
        let mut gens = generations.lock();
        if gens.get(user) == Some(&gen) {
            gens.remove(user);
            true
        } else {
            false
        }
    }

    /// Cancel all pending timers and await in-flight callbacks up to
    /// `grace`, then abandon whatever remains. Timers already sleeping lose
    /// their generation claim and become no-ops when they wake, but still
    /// count as in-flight until then — detached tasks can't be aborted from
    /// here, only waited on.
    pub async fn shutdown(&self, grace: Duration) {
        self.generations.lock().clear();
        let _ = tokio::time::timeout(grace, async {
            loop {
                if self.in_flight.load(Ordering::SeqCst) == 0 {
                    return;
                }
                let notified = self.idle.notified();
                if self.in_flight.load(Ordering::SeqCst) == 0 {
                    return;
                }
                notified.await;
            }
        })
        .await;
    }
}
