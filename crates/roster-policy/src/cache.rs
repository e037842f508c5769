//! TTL-bounded cache of access decisions, keyed by the full
//! `(subject, object, action)` triple. Expired entries are dropped lazily
//! on lookup.

use std::{
  collections::HashMap,
  time::{Duration, Instant},
};

pub struct AccessCache {
  ttl:     Duration,
  entries: HashMap<(String, String, String), (bool, Instant)>,
}

impl AccessCache {
  pub fn new(ttl: Duration) -> Self {
    Self { ttl, entries: HashMap::new() }
  }

  pub fn get(&self, sub: &str, obj: &str, act: &str) -> Option<bool> {
    let key = (sub.to_owned(), obj.to_owned(), act.to_owned());
    let (decision, stored_at) = self.entries.get(&key)?;
    (stored_at.elapsed() < self.ttl).then_some(*decision)
  }

  pub fn insert(&mut self, sub: &str, obj: &str, act: &str, decision: bool) {
    self.entries.insert(
      (sub.to_owned(), obj.to_owned(), act.to_owned()),
      (decision, Instant::now()),
    );
  }

  pub fn clear(&mut self) { self.entries.clear(); }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}
