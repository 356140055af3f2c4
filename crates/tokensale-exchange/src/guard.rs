//! Non-reentrant guard.
//!
//! At most one guarded call may be in flight per exchange. Entry sets the
//! marker with a compare-exchange; the returned [`InFlight`] token clears it
//! when dropped, so every exit path (success, error, unwind) releases it.
//! A nested entry fails fast with [`SaleError::Reentrancy`] and never waits.

use std::sync::atomic::{AtomicBool, Ordering};

use tokensale_types::{Result, SaleError};

#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    in_flight: AtomicBool,
}

impl ReentrancyGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the in-flight marker.
    ///
    /// # Errors
    /// [`SaleError::Reentrancy`] if a guarded call is already running.
    pub fn enter(&self) -> Result<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight { guard: self })
            .map_err(|_| SaleError::Reentrancy)
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Proof that the guard is held. Releases on drop.
#[derive(Debug)]
pub struct InFlight<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.store(false, Ordering::Release);
    }
}
