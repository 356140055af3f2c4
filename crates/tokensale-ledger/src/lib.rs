//! # tokensale-ledger
//!
//! **Collaborators** of the sale core. The exchange owns none of these; it
//! consumes them through capability traits so a production build can plug
//! in any conforming provider:
//!
//! 1. **AssetLedger**: balances, allowances, all-or-nothing transfers
//! 2. **AccessGate**: "does principal P hold role R?"
//! 3. **PauseSwitch**: the Active / Paused flag
//!
//! Each trait ships with an in-memory reference implementation
//! ([`TokenLedger`], [`RoleRegistry`], [`PauseFlag`]).

pub mod access;
pub mod asset;
pub mod pause;

pub use access::{AccessGate, RoleRegistry};
pub use asset::{AssetLedger, TokenLedger, TransferEvent, TransferHook, TransferLeg};
pub use pause::{PauseFlag, PauseSwitch};
