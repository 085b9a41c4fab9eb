//! The query cache that backs every read made through the coordinator.
//!
//! Each entry moves through `empty -> loading -> fresh -> stale -> loading ->
//! fresh | error`. Entries carry a generation number that is bumped every
//! time a new request is issued for the key (or the key is invalidated), and
//! a response is only written back when its generation is still current, so
//! the most recently issued request always wins.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use serde_json::Value;
use tokio::{sync::watch, time::Instant};

use crate::{
    Error,
    coordinator::key::{Domain, QueryKey},
};

/// The observable state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Nothing has been fetched yet.
    Empty,
    /// A request for the key is in flight.
    Loading,
    /// The data is within its staleness window.
    Fresh,
    /// The data is outdated and the next read will refetch.
    Stale,
    /// The last request failed. Any earlier data is kept in the snapshot.
    Error,
}

/// A read-only view of a cache entry for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot {
    pub state: EntryState,
    /// The last successfully fetched value, kept through failed refetches.
    pub data: Option<Value>,
    /// The error from the last request, cleared by the next success.
    pub error: Option<Error>,
    pub fetched_at: Option<Instant>,
}

/// `None` until the request settles.
pub(crate) type Outcome = Option<Result<Value, Error>>;

/// A pending request that concurrent readers of the same key wait on.
#[derive(Debug, Clone)]
pub(crate) struct InFlight {
    pub generation: u64,
    pub result: watch::Receiver<Outcome>,
}

/// The outcome of looking up a key before a read.
#[derive(Debug)]
pub(crate) enum Lookup {
    /// The entry is fresh, no request is needed.
    Hit(Value),
    /// Wait on the request already in flight.
    Pending(InFlight),
    /// A new request was issued. The caller starts it and publishes its
    /// outcome on the sender.
    Issued(InFlight, watch::Sender<Outcome>),
}

#[derive(Debug)]
struct CacheEntry {
    data: Option<Value>,
    error: Option<Error>,
    fetched_at: Option<Instant>,
    /// When the last request or [QueryCache::set] settled the entry.
    settled_at: Option<Instant>,
    stale_time: Duration,
    invalidated: bool,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl CacheEntry {
    fn new(stale_time: Duration) -> Self {
        Self {
            data: None,
            error: None,
            fetched_at: None,
            settled_at: None,
            stale_time,
            invalidated: false,
            generation: 0,
            in_flight: None,
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        match (self.data.is_some(), self.fetched_at) {
            (true, Some(fetched_at)) => {
                !self.invalidated
                    && self.error.is_none()
                    && now.saturating_duration_since(fetched_at) < self.stale_time
            }
            _ => false,
        }
    }

    fn state(&self, now: Instant) -> EntryState {
        if self.in_flight.is_some() {
            EntryState::Loading
        } else if self.error.is_some() {
            EntryState::Error
        } else if self.is_fresh(now) {
            EntryState::Fresh
        } else if self.data.is_some() {
            EntryState::Stale
        } else {
            EntryState::Empty
        }
    }

    fn snapshot(&self, now: Instant) -> CacheSnapshot {
        CacheSnapshot {
            state: self.state(now),
            data: self.data.clone(),
            error: self.error.clone(),
            fetched_at: self.fetched_at,
        }
    }

    /// Start a new request, superseding any request already in flight.
    fn issue(&mut self) -> Lookup {
        self.generation += 1;

        let (sender, result) = watch::channel(None);
        let in_flight = InFlight {
            generation: self.generation,
            result,
        };
        self.in_flight = Some(in_flight.clone());

        Lookup::Issued(in_flight, sender)
    }

    /// Entries settled more than twice their staleness window ago, or left
    /// empty, with no request in flight.
    fn is_evictable(&self, now: Instant) -> bool {
        if self.in_flight.is_some() {
            return false;
        }

        match self.settled_at {
            Some(settled_at) => now.saturating_duration_since(settled_at) >= self.stale_time * 2,
            None => self.data.is_none() && self.error.is_none(),
        }
    }

    /// Mark the entry outdated and detach any request in flight so that its
    /// response, which may predate a write, is discarded.
    fn invalidate(&mut self) {
        self.invalidated = true;

        if self.in_flight.take().is_some() {
            self.generation += 1;
        }
    }
}

/// Process-wide store of query results keyed by [QueryKey].
///
/// The cache is created with [QueryCache::init] and emptied with
/// [QueryCache::teardown]. All access goes through the key-based accessors;
/// the lock is never held across an `.await`.
#[derive(Debug)]
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
    stale_time: Duration,
}

impl QueryCache {
    /// Create an empty cache whose entries stay fresh for `stale_time`.
    pub fn init(stale_time: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stale_time,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The current view of `key`, `None` if it was never read or set.
    pub fn get(&self, key: &QueryKey) -> Option<CacheSnapshot> {
        let now = Instant::now();

        self.entries().get(key).map(|entry| entry.snapshot(now))
    }

    /// Store `value` for `key` as freshly fetched.
    ///
    /// Any request in flight for the key is superseded and its response will
    /// be discarded.
    pub fn set(&self, key: QueryKey, value: Value) {
        let mut entries = self.entries();
        let entry = entries
            .entry(key)
            .or_insert_with(|| CacheEntry::new(self.stale_time));

        if entry.in_flight.take().is_some() {
            entry.generation += 1;
        }
        let now = Instant::now();
        entry.data = Some(value);
        entry.error = None;
        entry.fetched_at = Some(now);
        entry.settled_at = Some(now);
        entry.invalidated = false;
    }

    /// Mark every entry in one of `domains` as stale.
    ///
    /// Returns the number of entries affected.
    pub fn invalidate(&self, domains: &[Domain]) -> usize {
        let mut count = 0;

        for (key, entry) in self.entries().iter_mut() {
            if key.domain().is_some_and(|domain| domains.contains(&domain)) {
                entry.invalidate();
                count += 1;
            }
        }

        count
    }

    /// Mark a single entry as stale.
    pub fn invalidate_key(&self, key: &QueryKey) {
        if let Some(entry) = self.entries().get_mut(key) {
            entry.invalidate();
        }
    }

    /// Drop every entry in `domain`, e.g. cached identity data after the
    /// session ends.
    pub fn remove_domain(&self, domain: Domain) {
        self.entries()
            .retain(|key, _| key.domain() != Some(domain));
    }

    /// Drop every entry. Responses still in flight are discarded when they
    /// arrive.
    pub fn teardown(&self) {
        self.entries().clear();
    }

    /// The number of entries held.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Decide how a read of `key` is served.
    ///
    /// Fresh entries are returned directly. Otherwise the caller joins the
    /// request already in flight, or a new one is issued. `force` always
    /// issues a new request.
    ///
    /// Stale entries of other keys with nothing in flight are evicted here, so
    /// one-off filters do not accumulate.
    pub(crate) fn lookup(&self, key: &QueryKey, force: bool) -> Lookup {
        let now = Instant::now();
        let mut entries = self.entries();
        entries.retain(|other, entry| other == key || !entry.is_evictable(now));

        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(self.stale_time));

        if !force {
            if entry.is_fresh(now) {
                if let Some(data) = &entry.data {
                    return Lookup::Hit(data.clone());
                }
            }

            if let Some(in_flight) = &entry.in_flight {
                return Lookup::Pending(in_flight.clone());
            }
        }

        entry.issue()
    }

    /// Write the outcome of the request with `generation` back to `key`.
    ///
    /// Returns `false`, leaving the entry untouched, if a newer request has
    /// been issued or the key was invalidated or torn down in the meantime.
    pub(crate) fn complete(
        &self,
        key: &QueryKey,
        generation: u64,
        result: &Result<Value, Error>,
    ) -> bool {
        let mut entries = self.entries();

        let entry = match entries.get_mut(key) {
            Some(entry) if entry.generation == generation => entry,
            _ => return false,
        };

        let now = Instant::now();
        entry.in_flight = None;
        entry.settled_at = Some(now);

        match result {
            Ok(value) => {
                entry.data = Some(value.clone());
                entry.error = None;
                entry.fetched_at = Some(now);
                entry.invalidated = false;
            }
            // Keep whatever good data we had for display.
            Err(error) => entry.error = Some(error.clone()),
        }

        true
    }
}
