//! Single-slot guard serializing shot capture.
//!
//! At most one [`ShotPermit`] exists at a time. A request that finds the
//! slot taken gets `None` and is expected to be dropped, not queued.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const FREE: u64 = 0;

/// Try-acquire/release guard around the capture pipeline.
#[derive(Debug, Clone, Default)]
pub struct ShotGuard {
    inner: Arc<GuardState>,
}

#[derive(Debug, Default)]
struct GuardState {
    /// `FREE`, or the generation of the permit currently holding the slot.
    holder: AtomicU64,
    next_generation: AtomicU64,
}

impl ShotGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the slot if it is free.
    pub fn try_acquire(&self) -> Option<ShotPermit> {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner
            .holder
            .compare_exchange(FREE, generation, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ShotPermit {
                inner: Arc::clone(&self.inner),
                generation,
            })
    }

    pub fn is_held(&self) -> bool {
        self.inner.holder.load(Ordering::Acquire) != FREE
    }

    /// Free the slot regardless of who holds it. A permit released this way
    /// becomes inert: dropping it later does not free a newer holder.
    pub fn force_release(&self) {
        self.inner.holder.store(FREE, Ordering::Release);
    }
}

/// Proof of holding the guard; releases it on drop.
#[derive(Debug)]
pub struct ShotPermit {
    inner: Arc<GuardState>,
    generation: u64,
}

impl ShotPermit {
    /// Whether this permit still owns the slot.
    pub fn is_current(&self) -> bool {
        self.inner.holder.load(Ordering::Acquire) == self.generation
    }
}

impl Drop for ShotPermit {
    fn drop(&mut self) {
        let _ = self.inner.holder.compare_exchange(
            self.generation,
            FREE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}
