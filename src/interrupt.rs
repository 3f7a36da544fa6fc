//! Cooperative interrupt flag polled by `copy_stream` between iterations
//! (spec.md §5 "Cancellation", the C source's `TEST_INT`/`INT_P` macros).

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct InterruptFlag(AtomicBool);

impl InterruptFlag {
    pub fn new() -> InterruptFlag {
        InterruptFlag(AtomicBool::new(false))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
