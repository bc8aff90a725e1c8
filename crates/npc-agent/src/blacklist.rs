//! `Blacklist<K>` — keys denied until an expiry tick.
//!
//! Lookups take the current tick and drop expired entries on the way, so the
//! list never needs an explicit purge pass (though [`Blacklist::purge`]
//! exists for callers that want bounded memory).

use std::hash::Hash;

use rustc_hash::FxHashMap;

use npc_core::Tick;

#[derive(Clone, Debug)]
pub struct Blacklist<K> {
    entries: FxHashMap<K, Tick>,
}

impl<K> Default for Blacklist<K> {
    fn default() -> Self {
        Self { entries: FxHashMap::default() }
    }
}

impl<K: Copy + Eq + Hash> Blacklist<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deny `key` for `ticks` ticks from `now`.  Extends, never shortens, an
    /// existing entry.
    pub fn add(&mut self, key: K, now: Tick, ticks: u64) {
        self.add_until(key, now + ticks);
    }

    pub fn add_until(&mut self, key: K, expiry: Tick) {
        let e = self.entries.entry(key).or_insert(expiry);
        if *e < expiry {
            *e = expiry;
        }
    }

    /// `true` while `key` is denied.  An expired entry is removed.
    pub fn contains(&mut self, key: K, now: Tick) -> bool {
        match self.entries.get(&key) {
            Some(&expiry) if now < expiry => true,
            Some(_) => {
                self.entries.remove(&key);
                false
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: K) -> bool {
        self.entries.remove(&key).is_some()
    }

    /// Drop every expired entry.
    pub fn purge(&mut self, now: Tick) {
        self.entries.retain(|_, expiry| now < *expiry);
    }

    /// Entries stored, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
