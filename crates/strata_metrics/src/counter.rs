//! Named counters for structural churn

use std::collections::HashMap;

pub struct Counter {
    counters: HashMap<String, usize>,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            counters: HashMap::new(),
        }
    }

    pub fn increment(&mut self, name: &str, value: usize) {
        if value == 0 {
            return;
        }
        *self.counters.entry(name.to_string()).or_insert(0) += value;
    }

    pub fn set(&mut self, name: &str, value: usize) {
        self.counters.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> usize {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn reset(&mut self, name: &str) {
        self.counters.insert(name.to_string(), 0);
    }

    pub fn reset_all(&mut self) {
        self.counters.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &usize)> {
        self.counters.iter()
    }

    /// Every counter, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, usize)> {
        let mut entries: Vec<(String, usize)> = self
            .counters
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}
