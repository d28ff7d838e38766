use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use parking_lot::Mutex;

type Timestamp = u64;

/// Access history of one tracked entry.
#[derive(Debug)]
struct AccessInfo {
    /// Access timestamps, most recent at the back, at most k long
    history: VecDeque<Timestamp>,
    is_evictable: bool,
}

impl AccessInfo {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            is_evictable: false,
        }
    }

    fn record_access(&mut self, timestamp: Timestamp, k: usize) {
        self.history.push_back(timestamp);
        while self.history.len() > k {
            self.history.pop_front();
        }
    }

    /// Backward k-distance, or None (+inf) with fewer than k accesses.
    fn k_distance(&self, now: Timestamp, k: usize) -> Option<Timestamp> {
        if self.history.len() < k {
            None
        } else {
            Some(now - self.history[self.history.len() - k])
        }
    }

    fn earliest_timestamp(&self) -> Option<Timestamp> {
        self.history.front().copied()
    }
}

#[derive(Debug)]
struct ReplacerState<K> {
    now: Timestamp,
    entries: HashMap<K, AccessInfo>,
    num_evictable: usize,
}

/// LRU-K replacement policy over arbitrary keys.
///
/// The victim is the evictable entry with the largest backward k-distance:
/// the time between now and its kth most recent access. Entries with fewer
/// than k accesses have +inf distance; among those the one with the earliest
/// recorded access goes first.
///
/// The buffer pool keys this by `PageId` and only marks a page evictable
/// while no transaction holds a lock on it.
#[derive(Debug)]
pub struct LruKReplacer<K> {
    k: usize,
    state: Mutex<ReplacerState<K>>,
}

impl<K: Copy + Eq + Hash> LruKReplacer<K> {
    /// Creates a replacer using the last `k` accesses of each entry.
    pub fn new(k: usize, capacity: usize) -> Self {
        assert!(k > 0, "LRU-K needs k >= 1");
        Self {
            k,
            state: Mutex::new(ReplacerState {
                now: 0,
                entries: HashMap::with_capacity(capacity),
                num_evictable: 0,
            }),
        }
    }

    /// Picks and forgets the entry with the largest backward k-distance.
    /// Returns None if nothing is evictable.
    pub fn evict(&self) -> Option<K> {
        let mut state = self.state.lock();
        if state.num_evictable == 0 {
            return None;
        }

        let now = state.now;
        let mut victim: Option<(K, Option<Timestamp>, Option<Timestamp>)> = None;

        for (key, info) in state.entries.iter() {
            if !info.is_evictable {
                continue;
            }
            let k_dist = info.k_distance(now, self.k);
            let earliest = info.earliest_timestamp();

            let replace = match &victim {
                None => true,
                Some((_, v_dist, v_earliest)) => match (v_dist, k_dist) {
                    (None, Some(_)) => false,
                    (Some(_), None) => true,
                    (None, None) => match (v_earliest, earliest) {
                        (Some(v), Some(c)) => c < *v,
                        (None, Some(_)) => true,
                        _ => false,
                    },
                    (Some(v), Some(c)) => c > *v,
                },
            };

            if replace {
                victim = Some((*key, k_dist, earliest));
            }
        }

        let (key, _, _) = victim?;
        state.entries.remove(&key);
        state.num_evictable -= 1;
        Some(key)
    }

    /// Records an access to `key` at the current timestamp.
    pub fn record_access(&self, key: K) {
        let mut state = self.state.lock();
        let ts = state.now;
        state.now += 1;
        state
            .entries
            .entry(key)
            .or_insert_with(AccessInfo::new)
            .record_access(ts, self.k);
    }

    /// Marks whether `key` may be chosen as a victim.
    pub fn set_evictable(&self, key: K, is_evictable: bool) {
        let mut state = self.state.lock();
        let state = &mut *state;

        if let Some(info) = state.entries.get_mut(&key) {
            if info.is_evictable != is_evictable {
                info.is_evictable = is_evictable;
                if is_evictable {
                    state.num_evictable += 1;
                } else {
                    state.num_evictable -= 1;
                }
            }
        } else if is_evictable {
            let mut info = AccessInfo::new();
            info.is_evictable = true;
            state.entries.insert(key, info);
            state.num_evictable += 1;
        }
    }

    /// Forgets `key` and its access history.
    pub fn remove(&self, key: K) {
        let mut state = self.state.lock();
        if let Some(info) = state.entries.remove(&key) {
            if info.is_evictable {
                state.num_evictable -= 1;
            }
        }
    }

    /// Returns the number of evictable entries.
    pub fn size(&self) -> usize {
        self.state.lock().num_evictable
    }

    pub fn k(&self) -> usize {
        self.k
    }
}
