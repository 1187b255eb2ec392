use std::collections::{HashSet, VecDeque};

/// Bounded set of already-dispatched order ids.
///
/// Insertion order is kept so eviction always removes the
/// oldest-inserted entry first once the cap is reached. The cap is sized
/// generously relative to traffic — an evicted id that is somehow
/// re-observed would be re-dispatched, which at-least-once delivery
/// tolerates.
pub struct ProcessedSet {
    ids: HashSet<String>,
    insertion_order: VecDeque<String>,
    cap: usize,
}

impl ProcessedSet {
    pub fn new(cap: usize) -> Self {
        Self { ids: HashSet::new(), insertion_order: VecDeque::new(), cap: cap.max(1) }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn insert(&mut self, id: String) {
        if !self.ids.insert(id.clone()) {
            return;
        }
        self.insertion_order.push_back(id);
        while self.ids.len() > self.cap {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_inserted_first() {
        let mut set = ProcessedSet::new(3);
        for id in ["a", "b", "c"] {
            set.insert(id.to_string());
        }
        assert_eq!(set.len(), 3);

        set.insert("d".to_string());
        assert_eq!(set.len(), 3);
        assert!(!set.contains("a"), "oldest entry must go first");
        assert!(set.contains("b"));
        assert!(set.contains("d"));
    }

    #[test]
    fn duplicate_insert_does_not_grow_or_reorder() {
        let mut set = ProcessedSet::new(2);
        set.insert("a".to_string());
        set.insert("a".to_string());
        set.insert("b".to_string());
        assert_eq!(set.len(), 2);

        // "a" keeps its original insertion slot, so it is evicted next.
        set.insert("c".to_string());
        assert!(!set.contains("a"));
    }
}
