//! Supply conservation checker.
//!
//! Mathematical invariants for the sale asset:
//! ```text
//! Σ(holder balances) == Σ(issued)
//! reserve_before - reserve_after == payout      (per purchase)
//! ```
//!
//! Purchases and recovery only move sale-asset units between holders; if
//! either identity breaks, something created or destroyed supply.

use tokensale_ledger::TokenLedger;
use tokensale_types::{Result, SaleError, SettlementRecord};

/// Tracks issued sale-asset supply and validates holder balances against it.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    issued: u128,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record units issued into circulation (e.g. the initial reserve mint).
    ///
    /// # Errors
    /// [`SaleError::SupplyInvariantViolation`] if the issued total would
    /// exceed `u128`; the total is left unchanged.
    pub fn record_issuance(&mut self, amount: u128) -> Result<()> {
        self.issued = self.issued.checked_add(amount).ok_or_else(|| {
            SaleError::SupplyInvariantViolation {
                reason: format!("issuing {amount} overflows issued total {}", self.issued),
            }
        })?;
        Ok(())
    }

    #[must_use]
    pub fn expected_supply(&self) -> u128 {
        self.issued
    }

    /// Verify an externally computed actual supply.
    ///
    /// # Errors
    /// [`SaleError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, actual_supply: u128) -> Result<()> {
        if actual_supply != self.issued {
            tracing::error!(
                actual = actual_supply,
                expected = self.issued,
                "Supply invariant violated"
            );
            return Err(SaleError::SupplyInvariantViolation {
                reason: format!(
                    "actual supply {actual_supply} != expected {} (issued)",
                    self.issued
                ),
            });
        }
        Ok(())
    }

    /// Sum every holder balance on `ledger` and verify it against both the
    /// issued total and the ledger's own supply counter.
    pub fn verify_ledger(&self, ledger: &TokenLedger) -> Result<()> {
        let held = ledger
            .holders()
            .iter()
            .try_fold(0u128, |acc, (_, balance)| acc.checked_add(*balance))
            .ok_or_else(|| SaleError::SupplyInvariantViolation {
                reason: "holder balances overflow u128".into(),
            })?;
        if held != ledger.total_supply() {
            return Err(SaleError::SupplyInvariantViolation {
                reason: format!(
                    "holders sum to {held} but ledger reports supply {}",
                    ledger.total_supply()
                ),
            });
        }
        self.verify(held)
    }

    /// A purchase moves exactly its payout out of the reserve.
    pub fn verify_settlement(
        reserve_before: u128,
        reserve_after: u128,
        record: &SettlementRecord,
    ) -> Result<()> {
        let moved = reserve_before.checked_sub(reserve_after);
        if moved != Some(record.payout_amount) {
            return Err(SaleError::SupplyInvariantViolation {
                reason: format!(
                    "reserve moved {reserve_before} -> {reserve_after}, payout was {}",
                    record.payout_amount
                ),
            });
        }
        Ok(())
    }
}
