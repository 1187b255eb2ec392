//! Fairness / anti-repetition key rotation
//!
//! Picks one of a small fixed set of payment identifiers for a requester.
//! Two guarantees, in priority order:
//!
//! 1. **Anti-repetition** — a requester served inside the block window
//!    (default 6 h) never receives the same key again, unless only one
//!    key exists.
//! 2. **Fairness** — among the remaining candidates, the least-used key
//!    wins; ties break uniformly at random.
//!
//! All state is private instance state behind a mutex; no statics.

use std::collections::HashMap;
use std::sync::Mutex;

use rand::Rng;
use shared::models::PaymentKey;
use shared::util::{normalize_phone, now_millis};

const HOUR_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct RotationConfig {
    /// Minimum time before the same key may be reassigned to a requester
    pub block_window_ms: i64,
    /// History entries older than this are purged
    pub retention_ms: i64,
    /// Hard cap on the history map; oldest-by-timestamp evicted beyond it
    pub history_cap: usize,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self { block_window_ms: 6 * HOUR_MS, retention_ms: 24 * HOUR_MS, history_cap: 1000 }
    }
}

#[derive(Debug, Clone, Copy)]
struct SenderHistory {
    selected_index: usize,
    at_millis: i64,
}

struct RotationState {
    /// times_selected per key, indexed like `keys`
    usage: Vec<u64>,
    history: HashMap<String, SenderHistory>,
}

pub struct KeyRotationSelector {
    keys: Vec<PaymentKey>,
    config: RotationConfig,
    state: Mutex<RotationState>,
}

impl KeyRotationSelector {
    pub fn new(keys: Vec<PaymentKey>, config: RotationConfig) -> Self {
        let usage = vec![0; keys.len()];
        Self { keys, config, state: Mutex::new(RotationState { usage, history: HashMap::new() }) }
    }

    /// Select a key for `requester_id`. `None` only when the key list is
    /// empty — with at least one key this always answers.
    pub fn select(&self, requester_id: &str) -> Option<PaymentKey> {
        self.select_at(requester_id, now_millis())
    }

    /// Clock-injectable variant; `select` delegates here.
    pub fn select_at(&self, requester_id: &str, now: i64) -> Option<PaymentKey> {
        if self.keys.is_empty() {
            return None;
        }

        let requester = normalize_phone(requester_id);
        let mut state = self.state.lock().unwrap();

        Self::purge_history(&mut state.history, now, &self.config);

        // Candidate set: every key index, minus the one served to this
        // requester inside the block window.
        let mut candidates: Vec<usize> = (0..self.keys.len()).collect();
        if self.keys.len() > 1
            && let Some(entry) = state.history.get(&requester)
            && now - entry.at_millis < self.config.block_window_ms
            && entry.selected_index < self.keys.len()
        {
            candidates.retain(|&i| i != entry.selected_index);
            if candidates.is_empty() {
                candidates = (0..self.keys.len()).collect();
            }
        }

        // Least-used-first, uniform tie-break.
        let min_usage = candidates.iter().map(|&i| state.usage[i]).min()?;
        let least_used: Vec<usize> =
            candidates.into_iter().filter(|&i| state.usage[i] == min_usage).collect();
        let chosen = least_used[rand::thread_rng().gen_range(0..least_used.len())];

        state.usage[chosen] += 1;
        state
            .history
            .insert(requester, SenderHistory { selected_index: chosen, at_millis: now });

        Some(self.keys[chosen].clone())
    }

    /// Per-key selection counts, indexed like the key list.
    pub fn usage_counts(&self) -> Vec<u64> {
        self.state.lock().unwrap().usage.clone()
    }

    /// Drop all usage counters and history.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.usage = vec![0; self.keys.len()];
        state.history.clear();
    }

    fn purge_history(history: &mut HashMap<String, SenderHistory>, now: i64, config: &RotationConfig) {
        history.retain(|_, entry| now - entry.at_millis <= config.retention_ms);

        while history.len() > config.history_cap {
            let oldest = history
                .iter()
                .min_by_key(|(_, entry)| entry.at_millis)
                .map(|(requester, _)| requester.clone());
            match oldest {
                Some(requester) => {
                    history.remove(&requester);
                }
                None => break,
            }
        }
    }

    #[cfg(test)]
    fn history_len(&self) -> usize {
        self.state.lock().unwrap().history.len()
    }

    #[cfg(test)]
    fn seed_state(&self, usage: Vec<u64>, entries: &[(&str, usize, i64)]) {
        let mut state = self.state.lock().unwrap();
        state.usage = usage;
        state.history = entries
            .iter()
            .map(|&(requester, selected_index, at_millis)| {
                (requester.to_string(), SenderHistory { selected_index, at_millis })
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(label: &str) -> PaymentKey {
        PaymentKey {
            label: label.to_string(),
            value: format!("{label}@bank"),
            owner_name: "Owner".to_string(),
        }
    }

    fn selector(n: usize) -> KeyRotationSelector {
        let keys = (0..n).map(|i| key(&format!("key-{i}"))).collect();
        KeyRotationSelector::new(keys, RotationConfig::default())
    }

    #[test]
    fn empty_key_list_yields_none() {
        assert!(selector(0).select("5511999990000").is_none());
    }

    #[test]
    fn single_key_always_answers_even_inside_block_window() {
        let s = selector(1);
        let now = 1_000_000;
        let first = s.select_at("5511999990000", now).unwrap();
        let second = s.select_at("5511999990000", now + 1000).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn fairness_two_keys_distinct_requesters() {
        let s = selector(2);
        let now = 1_000_000;
        for i in 0..100 {
            // Distinct requesters, so anti-repetition never constrains.
            s.select_at(&format!("55119999{i:05}"), now + i).unwrap();
        }
        let counts = s.usage_counts();
        let diff = counts[0].abs_diff(counts[1]);
        assert!(diff <= 1, "usage counts {counts:?} differ by more than 1");
    }

    #[test]
    fn anti_repetition_inside_block_window() {
        let s = selector(2);
        let now = 1_000_000;
        let first = s.select_at("5511999990000", now).unwrap();
        let second = s.select_at("5511999990000", now + HOUR_MS).unwrap();
        assert_ne!(first, second, "same key twice inside the 6h block window");
    }

    #[test]
    fn block_applies_even_against_fairness() {
        // Key 0 was served 1h ago and is also the least-used key; the
        // block must win and hand out key 1 anyway.
        let s = selector(2);
        let now = 10 * HOUR_MS;
        s.seed_state(vec![0, 5], &[("5511999990000", 0, now - HOUR_MS)]);
        let picked = s.select_at("5511999990000", now).unwrap();
        assert_eq!(picked.label, "key-1");
    }

    #[test]
    fn block_window_expires() {
        // Same setup, but the history entry is 7h old: the block no
        // longer applies and least-used key 0 is repeated.
        let s = selector(2);
        let now = 10 * HOUR_MS;
        s.seed_state(vec![0, 5], &[("5511999990000", 0, now - 7 * HOUR_MS)]);
        let picked = s.select_at("5511999990000", now).unwrap();
        assert_eq!(picked.label, "key-0");
    }

    #[test]
    fn requester_id_is_normalized_before_lookup() {
        let s = selector(2);
        let now = 1_000_000;
        let first = s.select_at("+55 (11) 99999-0000", now).unwrap();
        let second = s.select_at("5511999990000", now + 1000).unwrap();
        assert_ne!(first, second, "formatting variants are the same requester");
    }

    #[test]
    fn history_purged_by_retention_and_cap() {
        let config = RotationConfig { history_cap: 10, ..RotationConfig::default() };
        let s = KeyRotationSelector::new(vec![key("a"), key("b")], config);
        let now = 1_000_000;

        for i in 0..50 {
            s.select_at(&format!("55119999{i:05}"), now + i).unwrap();
        }
        assert!(s.history_len() <= 11, "cap eviction keeps the map bounded");

        // Everything ages out past retention.
        s.select_at("5511988880000", now + 25 * HOUR_MS).unwrap();
        assert_eq!(s.history_len(), 1);
    }

    #[test]
    fn reset_clears_usage_and_history() {
        let s = selector(2);
        s.select_at("5511999990000", 1_000_000).unwrap();
        s.reset();
        assert_eq!(s.usage_counts(), vec![0, 0]);
        assert_eq!(s.history_len(), 0);
    }
}
