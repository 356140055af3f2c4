//! Emitted records for the tokensale audit trail.
//!
//! Every state-changing action produces a record. Records are appended to
//! the exchange's audit log and never mutated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Principal, RecordId, RoleId};

/// A completed purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub buyer: Principal,
    /// Raw deposit amount requested by the buyer.
    pub deposit_amount: u128,
    /// Raw sale-asset amount released to the buyer.
    pub payout_amount: u128,
    /// Raw deposit amount pulled to the treasury recipient.
    pub treasury_amount: u128,
    /// Raw deposit amount pulled to the development recipient.
    pub development_amount: u128,
    pub timestamp: DateTime<Utc>,
}

impl SettlementRecord {
    /// Deposit left with the buyer by independent truncation of the split.
    #[must_use]
    pub fn dust(&self) -> u128 {
        self.deposit_amount - self.treasury_amount - self.development_amount
    }
}

/// A drain of the unsold reserve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryRecord {
    pub destination: Principal,
    pub amount: u128,
    pub timestamp: DateTime<Utc>,
}

/// A pause-switch transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseRecord {
    /// The admin who flipped the switch.
    pub account: Principal,
    /// The new state.
    pub paused: bool,
    pub timestamp: DateTime<Utc>,
}

/// A role membership change made by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub role: RoleId,
    pub account: Principal,
    pub sender: Principal,
    pub granted: bool,
    pub timestamp: DateTime<Utc>,
}

/// Everything the exchange emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleEvent {
    Settlement(SettlementRecord),
    Recovery(RecoveryRecord),
    Pause(PauseRecord),
    Role(RoleRecord),
}

impl SaleEvent {
    /// Short uppercase tag for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Settlement(_) => "SETTLEMENT",
            Self::Recovery(_) => "RECOVERY",
            Self::Pause(_) => "PAUSE",
            Self::Role(_) => "ROLE",
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Settlement(r) => r.timestamp,
            Self::Recovery(r) => r.timestamp,
            Self::Pause(r) => r.timestamp,
            Self::Role(r) => r.timestamp,
        }
    }
}

/// One link in the hash-chained audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Zero-based position in the log.
    pub sequence: u64,
    pub id: RecordId,
    pub event: SaleEvent,
    /// Hash of the previous entry; all zeros for the first.
    pub prev_hash: [u8; 32],
    /// SHA-256 over the domain tag, sequence, `prev_hash` and the event fields.
    pub hash: [u8; 32],
}
