//! Memoized verdicts keyed by exact post text.
//!
//! Identical texts share one verdict regardless of which post they came from.
//! A verdict, including `unknown`, is never re-queried while it is resident.
//! With a non-zero capacity the oldest insertions are dropped first.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::insights::types::Severity;

#[derive(Debug)]
pub struct SeverityCache {
    inner: Mutex<Inner>,
    /// `None` = unbounded.
    cap: Option<usize>,
}

#[derive(Debug, Default)]
struct Inner {
    map: HashMap<String, Severity>,
    /// Insertion order, for eviction.
    order: VecDeque<String>,
}

impl SeverityCache {
    /// `capacity == 0` means unbounded.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            cap: (capacity > 0).then_some(capacity),
        }
    }

    pub fn get(&self, text: &str) -> Option<Severity> {
        let g = self.lock();
        g.map.get(text).copied()
    }

    /// Store a verdict. A racing writer for the same key simply overwrites.
    pub fn insert(&self, text: &str, verdict: Severity) {
        let mut g = self.lock();
        if g.map.insert(text.to_string(), verdict).is_none() {
            g.order.push_back(text.to_string());
        }
        if let Some(cap) = self.cap {
            while g.map.len() > cap {
                match g.order.pop_front() {
                    Some(oldest) => {
                        g.map.remove(&oldest);
                    }
                    None => break,
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}
