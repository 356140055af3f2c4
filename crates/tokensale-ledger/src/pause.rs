//! Two-state pause switch.
//!
//! Gates which exchange operations are callable: purchases only while
//! Active, reserve recovery only while Paused.

use std::sync::atomic::{AtomicBool, Ordering};

use tokensale_types::{Result, SaleError};

/// Capability contract of a pause switch.
pub trait PauseSwitch: Send + Sync {
    fn is_paused(&self) -> bool;

    /// Move to the requested state.
    ///
    /// # Errors
    /// [`SaleError::AlreadyInState`] if the switch is already there.
    fn set_paused(&self, paused: bool) -> Result<()>;

    /// Guard for Active-only operations.
    fn ensure_active(&self) -> Result<()> {
        if self.is_paused() {
            Err(SaleError::Paused)
        } else {
            Ok(())
        }
    }

    /// Guard for Paused-only operations.
    fn ensure_paused(&self) -> Result<()> {
        if self.is_paused() {
            Ok(())
        } else {
            Err(SaleError::NotPaused)
        }
    }
}

/// Atomic pause flag. Starts Active.
#[derive(Debug, Default)]
pub struct PauseFlag {
    paused: AtomicBool,
}

impl PauseFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PauseSwitch for PauseFlag {
    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    fn set_paused(&self, paused: bool) -> Result<()> {
        self.paused
            .compare_exchange(!paused, paused, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| SaleError::AlreadyInState { paused })
    }
}
