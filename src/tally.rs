use std::collections::HashMap;
use std::sync::{ Arc, Mutex, PoisonError, atomic::{ AtomicU64, Ordering } };
use crate::outcome::{ Category, Outcome };

const MAX_REASONS: usize = 10; // distinct Other reasons kept in a snapshot

#[derive(Debug, Default)]
struct Counters {
    success: AtomicU64,
    timeout: AtomicU64,
    connection_error: AtomicU64,
    other: AtomicU64,
    completed: AtomicU64, // completion ordinal, drives progress cadence
}

/// Shared per-category outcome counters. Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    counters: Arc<Counters>,
    reasons: Arc<Mutex<HashMap<String, u64>>>, // histogram of Other reasons
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one completed attempt and return its completion ordinal (1-based).
    pub fn record(&self, outcome: &Outcome) -> u64 {
        self.counter(outcome.category()).fetch_add(1, Ordering::AcqRel);

        if let Outcome::Other(reason) = outcome {
            let mut reasons = self.reasons.lock().unwrap_or_else(PoisonError::into_inner);
            *reasons.entry(reason.clone()).or_insert(0) += 1;
        }

        self.counters.completed.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn snapshot(&self) -> TallySnapshot {
        let load = |category| self.counter(category).load(Ordering::Acquire);

        let mut reasons: Vec<(String, u64)> = self.reasons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(reason, count)| (reason.clone(), *count))
            .collect();
        reasons.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        reasons.truncate(MAX_REASONS);

        TallySnapshot {
            success: load(Category::Success),
            timeout: load(Category::Timeout),
            connection_error: load(Category::ConnectionError),
            other: load(Category::Other),
            other_reasons: reasons,
        }
    }

    fn counter(&self, category: Category) -> &AtomicU64 {
        match category {
            Category::Success => &self.counters.success,
            Category::Timeout => &self.counters.timeout,
            Category::ConnectionError => &self.counters.connection_error,
            Category::Other => &self.counters.other,
        }
    }
}

/// Point-in-time copy of a [`Tally`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TallySnapshot {
    pub success: u64,
    pub timeout: u64,
    pub connection_error: u64,
    pub other: u64,
    pub other_reasons: Vec<(String, u64)>, // most frequent first
}

impl TallySnapshot {
    /// Derived from the category counts so the two can never disagree.
    pub fn completed(&self) -> u64 {
        self.success + self.timeout + self.connection_error + self.other
    }

    pub fn count(&self, category: Category) -> u64 {
        match category {
            Category::Success => self.success,
            Category::Timeout => self.timeout,
            Category::ConnectionError => self.connection_error,
            Category::Other => self.other,
        }
    }
}
