//! Error types for the tokensale settlement core.
//!
//! All errors use the `TS_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Configuration / construction errors
//! - 2xx: Purchase errors
//! - 3xx: State-machine errors
//! - 4xx: Access-control errors
//! - 5xx: Asset ledger errors
//! - 8xx: Safety errors
//! - 9xx: Serialization errors

use thiserror::Error;

use crate::{Principal, RoleId};

/// Central error enum for all tokensale operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SaleError {
    // =================================================================
    // Configuration Errors (1xx)
    // =================================================================
    /// A required identity was the null identity.
    #[error("TS_ERR_100: Invalid address: {field} is the null identity")]
    InvalidAddress { field: &'static str },

    /// An asset reported a decimal count whose scale overflows `u128`.
    #[error("TS_ERR_101: Invalid decimal scale: {decimals} decimals")]
    InvalidScale { decimals: u8 },

    /// Configuration error (malformed config, mismatched collaborators, etc.).
    #[error("TS_ERR_102: Configuration error: {0}")]
    Configuration(String),

    // =================================================================
    // Purchase Errors (2xx)
    // =================================================================
    /// The deposit is too small to produce any rate-adjusted value.
    #[error("TS_ERR_200: Insufficient amount: deposit {deposit} is below the purchase minimum")]
    InsufficientAmount { deposit: u128 },

    /// The reserve cannot cover the computed payout.
    #[error("TS_ERR_201: Token reserve exhausted: need {needed}, have {available}")]
    TokenReserveExhausted { needed: u128, available: u128 },

    /// Intermediate arithmetic exceeded `u128`.
    #[error("TS_ERR_202: Arithmetic overflow computing {context}")]
    ArithmeticOverflow { context: &'static str },

    // =================================================================
    // State Errors (3xx)
    // =================================================================
    /// The operation requires the Active state.
    #[error("TS_ERR_300: Sale is paused")]
    Paused,

    /// The operation requires the Paused state.
    #[error("TS_ERR_301: Sale is not paused")]
    NotPaused,

    /// The pause switch is already in the requested state.
    #[error("TS_ERR_302: Pause switch already in state paused={paused}")]
    AlreadyInState { paused: bool },

    /// A guarded entry point was re-entered while a call was in flight.
    #[error("TS_ERR_303: Reentrant call rejected")]
    Reentrancy,

    // =================================================================
    // Access Errors (4xx)
    // =================================================================
    /// The principal does not hold the required role.
    #[error("TS_ERR_400: Unauthorized: {principal} lacks {role}")]
    Unauthorized { principal: Principal, role: RoleId },

    // =================================================================
    // Asset Ledger Errors (5xx)
    // =================================================================
    /// The sender's balance cannot cover the transfer.
    #[error("TS_ERR_500: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    /// The spender's allowance cannot cover the transfer.
    #[error("TS_ERR_501: Insufficient allowance: need {needed}, have {available}")]
    InsufficientAllowance { needed: u128, available: u128 },

    /// Crediting the recipient would overflow its balance.
    #[error("TS_ERR_502: Balance overflow")]
    BalanceOverflow,

    // =================================================================
    // Safety Errors (8xx)
    // =================================================================
    /// Sale-asset supply was created or destroyed. Critical.
    #[error("TS_ERR_800: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    /// The audit log hash chain does not verify.
    #[error("TS_ERR_801: Audit chain broken at sequence {sequence}")]
    AuditChainBroken { sequence: u64 },

    // =================================================================
    // Serialization (9xx)
    // =================================================================
    /// Serialization / deserialization error.
    #[error("TS_ERR_900: Serialization error: {0}")]
    Serialization(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, SaleError>;

impl From<serde_json::Error> for SaleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
