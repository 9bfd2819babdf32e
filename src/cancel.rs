//! A single process-wide cooperative cancellation flag.
//!
//! Grounded in the original's `static bool stop_attack` global, set from a
//! `SIGINT` handler and polled at exactly two points in the search (top of
//! the semi-state loop, and between MSB-bucket rounds) — never inside the
//! deeper recursion of `old_recover`/`extend_table`/`state_loop`, which run
//! to completion once entered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cheaply clonable handle to a shared cancellation flag.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}
