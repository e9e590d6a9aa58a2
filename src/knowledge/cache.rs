use std::collections::{HashMap, VecDeque};

/// Bounded map of file name to decoded text, evicting the least recently used entry.
pub struct FileCache {
    capacity: usize,
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl FileCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&mut self, name: &str) -> Option<String> {
        let value = self.entries.get(name).cloned()?;
        self.touch(name);
        Some(value)
    }

    pub fn insert(&mut self, name: String, content: String) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(name.clone(), content).is_some() {
            self.touch(&name);
            return;
        }
        self.order.push_back(name);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn touch(&mut self, name: &str) {
        if let Some(pos) = self.order.iter().position(|n| n == name) {
            if let Some(key) = self.order.remove(pos) {
                self.order.push_back(key);
            }
        }
    }
}
