use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::domain::{DeviceFilter, DeviceSet, QuotaSnapshot};

/// Single-slot value holder whose readers wait for the first write.
///
/// Once populated the slot is never emptied again, so every later read
/// returns immediately with the most recent value.
pub struct Cache<T> {
    slot: Mutex<Option<T>>,
    populated: Notify,
}

impl<T: Clone> Cache<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            populated: Notify::new(),
        }
    }

    /// Replace the held value and wake every waiting reader
    pub fn set(&self, value: T) {
        *self.lock() = Some(value);
        self.populated.notify_waiters();
    }

    /// Current value, waiting for the first `set` if there has been none
    pub async fn get(&self) -> T {
        loop {
            // Register interest before checking the slot so a concurrent
            // `set` between the check and the await cannot be missed.
            let notified = self.populated.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(value) = self.peek() {
                return value;
            }

            notified.await;
        }
    }

    /// Current value without waiting
    pub fn peek(&self) -> Option<T> {
        self.lock().clone()
    }

    /// Replace the value with whatever `f` returns, if anything, under a single lock.
    ///
    /// Returns whether a new value was stored.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(Option<&T>) -> Option<T>,
    {
        let mut slot = self.lock();
        match f(slot.as_ref()) {
            Some(value) => {
                *slot = Some(value);
                drop(slot);
                self.populated.notify_waiters();
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> Default for Cache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Latest API usage snapshot
pub type QuotaCache = Cache<QuotaSnapshot>;

impl Cache<QuotaSnapshot> {
    /// Whether quota-consuming calls may be made.
    ///
    /// Waits until the first usage snapshot has been stored.
    pub async fn is_quota_available(&self) -> bool {
        self.get().await.is_available()
    }
}

/// Devices the real-time poll asks for
#[derive(Default)]
pub struct DeviceCache {
    inner: Cache<DeviceSet>,
}

impl DeviceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache from the static filter.
    ///
    /// An empty filter leaves the cache unpopulated for discovery to fill.
    pub fn initialise(&self, filter: &DeviceFilter) {
        if filter.is_empty() {
            return;
        }
        self.inner.set(DeviceSet::Filtered(filter.ids()));
    }

    /// Replace the discovered device set.
    ///
    /// Ignored once the cache has been seeded from a filter; returns whether
    /// the ids were stored.
    pub fn set_discovered(&self, ids: Vec<String>) -> bool {
        self.inner.update(|current| match current {
            Some(DeviceSet::Filtered(_)) => None,
            _ => Some(DeviceSet::Discovered(ids)),
        })
    }

    pub async fn get(&self) -> DeviceSet {
        self.inner.get().await
    }
}
