//! # tokensale-exchange
//!
//! **Settlement core** of a fixed-rate token sale: accepts a deposit asset,
//! releases sale asset at a constant rate, and splits the deposit between
//! the treasury and development recipients.
//!
//! ## Architecture
//!
//! [`ExchangeLedger`] owns only its immutable configuration; balances, roles
//! and the pause flag live in external collaborators (see
//! `tokensale-ledger`). For every purchase it:
//! 1. Checks the pause switch is Active
//! 2. Acquires the reentrancy guard
//! 3. Prices the deposit ([`pricing::quote`])
//! 4. Checks the reserve covers the payout
//! 5. Pulls the treasury and development shares in one atomic batch
//! 6. Releases the payout from the reserve
//! 7. Appends a [`SettlementRecord`](tokensale_types::SettlementRecord) to the hash-chained [`AuditLog`]
//!
//! Recovery mirrors it: Paused only, admin only, one transfer that drains
//! the reserve.

pub mod audit;
pub mod conservation;
pub mod exchange;
pub mod guard;
pub mod pricing;

pub use audit::AuditLog;
pub use conservation::SupplyConservation;
pub use exchange::{Collaborators, ExchangeLedger};
pub use guard::{InFlight, ReentrancyGuard};
pub use pricing::Quote;
