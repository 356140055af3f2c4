//! # tokensale-types
//!
//! Shared types, errors, and configuration for the **tokensale** settlement core.
//!
//! This crate is the leaf dependency of the workspace: every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Principal`], [`AssetId`], [`RoleId`], [`RecordId`]
//! - **Configuration**: [`SaleConfig`], [`AssetScales`]
//! - **Records**: [`SettlementRecord`], [`RecoveryRecord`], [`PauseRecord`], [`RoleRecord`], [`SaleEvent`], [`AuditEntry`]
//! - **Amounts**: [`decimal_scale`], [`to_units`]
//! - **Errors**: [`SaleError`] with `TS_ERR_` prefix codes
//! - **Constants**: the fixed exchange rate and deposit split

pub mod amount;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod record;

pub use amount::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use record::*;

// Constants are accessed via `tokensale_types::constants::FOO`
// (not re-exported to avoid name collisions).
