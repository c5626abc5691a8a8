//! Subscribe / poll / diff / notify.
//!
//! One [`SyncService`] per subject kind. The polling loop runs only while at
//! least one subscription is alive. Each tick fetches every subscribed key
//! concurrently; each result is diffed and delivered as soon as its own fetch
//! finishes, to that key's subscribers in subscription order. A key whose
//! fetch is still outstanding is skipped by later ticks until it resolves.
//!
//! Every fetch takes a sequence number when it starts. A result older than
//! the stored snapshot for its key is dropped, so a slow fetch can never roll
//! subscribers back to an earlier state.
//!
//! Subscriber list and last-known snapshots sit behind one mutex. The mutex is
//! never held across an await or while a callback runs.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::Notify;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::SyncConfig;
use crate::connectivity::ConnectivityState;
use crate::error::FetchError;
use crate::source::SnapshotSource;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Subscriber<K, T> {
    id: u64,
    key: K,
    active: Arc<AtomicBool>,
    /// Set once this subscriber has been handed any snapshot.
    notified: bool,
    callback: Callback<T>,
}

struct Known<T> {
    seq: u64,
    snapshot: T,
}

struct PollLoop {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

struct State<K, T> {
    subscribers: Vec<Subscriber<K, T>>,
    last_known: HashMap<K, Known<T>>,
    in_flight: HashSet<K>,
    next_id: u64,
    poll_loop: Option<PollLoop>,
    connectivity: ConnectivityState,
}

struct Inner<S: SnapshotSource> {
    source: S,
    config: SyncConfig,
    fetch_seq: AtomicU64,
    state: Mutex<State<S::Key, S::Snapshot>>,
}

/// Polling synchronization service for one kind of subject.
///
/// Must be used from within a tokio runtime: the first `subscribe` spawns the
/// polling task.
pub struct SyncService<S: SnapshotSource> {
    inner: Arc<Inner<S>>,
}

impl<S: SnapshotSource> Clone for SyncService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SnapshotSource> SyncService<S> {
    pub fn new(source: S, config: SyncConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                config,
                fetch_seq: AtomicU64::new(0),
                state: Mutex::new(State {
                    subscribers: Vec::new(),
                    last_known: HashMap::new(),
                    in_flight: HashSet::new(),
                    next_id: 1,
                    poll_loop: None,
                    connectivity: ConnectivityState::Online,
                }),
            }),
        }
    }

    pub fn source(&self) -> &S {
        &self.inner.source
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Register `callback` for `key`.
    ///
    /// Starts the polling loop if this is the first live subscription and
    /// triggers one immediate fetch for `key`. The new subscriber receives
    /// the snapshot from that fetch unless a tick already reached it first;
    /// existing subscribers only if it differs from the last-known one.
    pub fn subscribe<F>(&self, key: S::Key, callback: F) -> Subscription
    where
        F: Fn(&S::Snapshot) + Send + Sync + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        let id = {
            let mut state = self.inner.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.push(Subscriber {
                id,
                key: key.clone(),
                active: Arc::clone(&active),
                notified: false,
                callback: Arc::new(callback),
            });
            tracing::debug!(
                service = %self.inner.config.name,
                key = ?key,
                subscribers = state.subscribers.len(),
                "subscribed"
            );
            if state.poll_loop.is_none() {
                Inner::start_polling(&self.inner, &mut state);
            }
            id
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.initial_fetch(key, id).await });

        let owner: Weak<dyn Detach> = Arc::downgrade(&self.inner) as Weak<dyn Detach>;
        Subscription {
            id,
            active,
            owner: Some(owner),
        }
    }

    /// Out-of-band fetch/diff/notify for one key.
    pub async fn refresh(&self, key: &S::Key) -> Result<(), FetchError> {
        let (seq, result) = self.inner.fetch(key).await;
        let snapshot = result.inspect_err(|e| {
            tracing::warn!(service = %self.inner.config.name, key = ?key, error = %e, "refresh failed");
        })?;
        self.inner.deliver(key, seq, snapshot, None);
        Ok(())
    }

    /// Run one tick now, independent of the timer. Returns once every fetch
    /// the tick started has resolved.
    pub async fn poll_once(&self) {
        self.inner.poll_once().await;
    }

    pub fn last_known(&self, key: &S::Key) -> Option<S::Snapshot> {
        self.inner
            .lock()
            .last_known
            .get(key)
            .map(|known| known.snapshot.clone())
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    pub fn is_polling(&self) -> bool {
        self.inner
            .lock()
            .poll_loop
            .as_ref()
            .is_some_and(|l| !l.handle.is_finished())
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.inner.lock().connectivity
    }
}

impl<S: SnapshotSource> Inner<S> {
    fn lock(&self) -> MutexGuard<'_, State<S::Key, S::Snapshot>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_polling(this: &Arc<Self>, state: &mut State<S::Key, S::Snapshot>) {
        let shutdown = Arc::new(Notify::new());
        let inner = Arc::clone(this);
        let stop = Arc::clone(&shutdown);
        let handle = tokio::spawn(async move { inner.run(stop).await });
        state.poll_loop = Some(PollLoop { shutdown, handle });
    }

    async fn run(self: Arc<Self>, shutdown: Arc<Notify>) {
        let period = self.config.poll_interval;
        tracing::info!(
            service = %self.config.name,
            interval_ms = period.as_millis() as u64,
            "polling started"
        );

        // Subscribing already fetched once; the first tick is one period out.
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                _ = interval.tick() => {
                    // Detached: keys still in flight from this tick are skipped by the next.
                    let inner = Arc::clone(&self);
                    tokio::spawn(async move { inner.poll_once().await });
                }
            }
        }

        tracing::info!(service = %self.config.name, "polling stopped");
    }

    /// Fetch bounded by `fetch_timeout`, stamped with its start order.
    async fn fetch(&self, key: &S::Key) -> (u64, Result<S::Snapshot, FetchError>) {
        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let result =
            match tokio::time::timeout(self.config.fetch_timeout, self.source.fetch(key)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout),
            };
        (seq, result)
    }

    /// Distinct subscribed keys with no tick fetch outstanding, in order of
    /// first subscription. The returned keys are marked in flight.
    fn claim_due_keys(&self) -> Vec<S::Key> {
        let mut state = self.lock();
        let State {
            subscribers,
            in_flight,
            ..
        } = &mut *state;

        let mut keys: Vec<S::Key> = Vec::new();
        for sub in subscribers.iter() {
            if !keys.contains(&sub.key) && !in_flight.contains(&sub.key) {
                keys.push(sub.key.clone());
            }
        }
        in_flight.extend(keys.iter().cloned());
        keys
    }

    async fn poll_once(self: &Arc<Self>) {
        let keys = self.claim_due_keys();
        if keys.is_empty() {
            return;
        }

        let mut fetches = JoinSet::new();
        for key in keys {
            let inner = Arc::clone(self);
            fetches.spawn(async move {
                let (seq, result) = inner.fetch(&key).await;
                let ok = match result {
                    Ok(snapshot) => {
                        inner.deliver(&key, seq, snapshot, None);
                        true
                    }
                    Err(e) => {
                        tracing::warn!(
                            service = %inner.config.name,
                            key = ?key,
                            error = %e,
                            "fetch failed; keeping last-known snapshot"
                        );
                        false
                    }
                };
                inner.lock().in_flight.remove(&key);
                ok
            });
        }

        let mut succeeded = 0;
        let mut failed = 0;
        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok(true) => succeeded += 1,
                Ok(false) => failed += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(service = %self.config.name, error = %e, "fetch task aborted");
                }
            }
        }

        self.record_connectivity(succeeded, failed);
    }

    async fn initial_fetch(&self, key: S::Key, subscriber_id: u64) {
        let (seq, result) = self.fetch(&key).await;
        match result {
            Ok(snapshot) => self.deliver(&key, seq, snapshot, Some(subscriber_id)),
            Err(e) => tracing::warn!(
                service = %self.config.name,
                key = ?key,
                error = %e,
                "initial fetch failed; waiting for next tick"
            ),
        }
    }

    /// Diff against the last-known snapshot, store the new one, then invoke
    /// callbacks outside the lock.
    ///
    /// A result older than the stored one is not stored; a `newcomer` that
    /// has not been handed anything yet still gets the stored snapshot.
    fn deliver(&self, key: &S::Key, seq: u64, snapshot: S::Snapshot, newcomer: Option<u64>) {
        let (current, targets): (S::Snapshot, Vec<(Arc<AtomicBool>, Callback<S::Snapshot>)>) = {
            let mut state = self.lock();
            if !state.subscribers.iter().any(|s| s.key == *key) {
                return;
            }

            let stale = state
                .last_known
                .get(key)
                .filter(|known| known.seq > seq)
                .map(|known| known.snapshot.clone());
            let (current, changed) = match stale {
                Some(current) => {
                    tracing::debug!(service = %self.config.name, key = ?key, "stale snapshot dropped");
                    (current, false)
                }
                None => {
                    let changed =
                        state.last_known.get(key).map(|known| &known.snapshot) != Some(&snapshot);
                    state.last_known.insert(
                        key.clone(),
                        Known {
                            seq,
                            snapshot: snapshot.clone(),
                        },
                    );
                    if changed {
                        tracing::debug!(service = %self.config.name, key = ?key, "snapshot changed");
                    }
                    (snapshot, changed)
                }
            };

            let targets = state
                .subscribers
                .iter_mut()
                .filter(|s| s.key == *key && (changed || (Some(s.id) == newcomer && !s.notified)))
                .map(|s| {
                    s.notified = true;
                    (Arc::clone(&s.active), Arc::clone(&s.callback))
                })
                .collect();
            (current, targets)
        };

        for (active, callback) in targets {
            if active.load(Ordering::SeqCst) {
                callback(&current);
            }
        }
    }

    fn record_connectivity(&self, succeeded: usize, failed: usize) {
        let Some(next) = ConnectivityState::from_tick(succeeded, failed) else {
            return;
        };
        let mut state = self.lock();
        if state.connectivity != next {
            tracing::info!(service = %self.config.name, state = ?next, "connectivity changed");
            state.connectivity = next;
        }
    }
}

trait Detach: Send + Sync {
    fn detach(&self, subscriber_id: u64);
}

impl<S: SnapshotSource> Detach for Inner<S> {
    fn detach(&self, subscriber_id: u64) {
        let mut state = self.lock();
        state.subscribers.retain(|s| s.id != subscriber_id);

        let State {
            subscribers,
            last_known,
            ..
        } = &mut *state;
        last_known.retain(|key, _| subscribers.iter().any(|s| s.key == *key));

        tracing::debug!(
            service = %self.config.name,
            subscribers = state.subscribers.len(),
            "unsubscribed"
        );

        if state.subscribers.is_empty() {
            if let Some(poll_loop) = state.poll_loop.take() {
                poll_loop.shutdown.notify_one();
            }
        }
    }
}

/// Handle for one registered callback.
///
/// Unsubscribing (explicitly or by dropping the handle) takes effect at once:
/// a fetch already in flight is delivered to the remaining subscribers only.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    owner: Option<Weak<dyn Detach>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn detach(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(owner) = self.owner.take().and_then(|w| w.upgrade()) {
            owner.detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
