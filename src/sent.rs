use std::collections::{HashSet, VecDeque};

/// Ids of listings already notified.
///
/// Unbounded by default, so it grows for as long as the process runs. With a
/// capacity set, the oldest ids are forgotten first.
#[derive(Debug, Default)]
pub struct SentStore {
    ids: HashSet<String>,
    order: VecDeque<String>,
    capacity: Option<usize>,
}

impl SentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_limit(capacity: Option<usize>) -> Self {
        Self {
            capacity: capacity.map(|c| c.max(1)),
            ..Self::default()
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns false if the id was already present
    pub fn insert(&mut self, id: &str) -> bool {
        if !self.ids.insert(id.to_string()) {
            return false;
        }
        self.order.push_back(id.to_string());

        if let Some(capacity) = self.capacity {
            while self.order.len() > capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.ids.remove(&oldest);
                }
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}
