// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Boundary to the tick context.
//!
//! The sequencing engine reads the model every tick. Structural changes
//! (switching a track's type, pasting a whole track) must not be observed
//! half done, so they run between `lock` and `unlock` on an [`EngineLock`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tracing::debug;

/// Suspends the tick context while held
pub trait EngineLock {
    fn lock(&self);
    fn unlock(&self);
}

/// Holds an [`EngineLock`] until dropped
pub struct EngineGuard<'a, L: EngineLock + ?Sized> {
    lock: &'a L,
}

impl<'a, L: EngineLock + ?Sized> EngineGuard<'a, L> {
    pub fn new(lock: &'a L) -> Self {
        lock.lock();
        Self { lock }
    }
}

impl<L: EngineLock + ?Sized> Drop for EngineGuard<'_, L> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

/// Run `f` with the tick context suspended
pub fn critical_section<L, F, T>(lock: &L, f: F) -> T
where
    L: EngineLock + ?Sized,
    F: FnOnce() -> T,
{
    let _guard = EngineGuard::new(lock);
    f()
}

/// Atomic suspend flag checked by the tick context before touching the model.
///
/// Locks nest; the gate reopens when the outermost lock is released.
#[derive(Debug, Default)]
pub struct TickGate {
    suspended: AtomicBool,
    depth: AtomicUsize,
}

impl TickGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a critical section is open
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }

    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }
}

impl EngineLock for TickGate {
    fn lock(&self) {
        if self.depth.fetch_add(1, Ordering::AcqRel) == 0 {
            self.suspended.store(true, Ordering::Release);
            debug!("tick context suspended");
        }
    }

    fn unlock(&self) {
        let previous = self
            .depth
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |depth| depth.checked_sub(1))
            .unwrap_or(0);
        if previous == 1 {
            self.suspended.store(false, Ordering::Release);
            debug!("tick context resumed");
        }
    }
}
