//! Asset ledgers.
//!
//! [`AssetLedger`] is the contract the exchange consumes for both the sale
//! asset and the deposit asset. [`TokenLedger`] is the in-memory reference
//! implementation: balances keyed by principal, allowances keyed by
//! (owner, spender). Every mutation is all-or-nothing: either the full
//! transfer applies or no balance or allowance changes.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokensale_types::{AssetId, Principal, Result, SaleError, decimal_scale};

/// One recipient of a batched transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLeg {
    pub to: Principal,
    pub amount: u128,
}

impl TransferLeg {
    #[must_use]
    pub fn new(to: Principal, amount: u128) -> Self {
        Self { to, amount }
    }
}

/// A transfer that has been committed, as seen by a [`TransferHook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferEvent {
    pub asset: AssetId,
    pub spender: Principal,
    pub from: Principal,
    pub to: Principal,
    pub amount: u128,
}

/// Capability contract of an asset ledger.
///
/// Providers must accept any transfer with a non-null `to` where
/// `spender == from` and the amount is within `from`'s balance. The
/// exchange releases its payout after the deposit legs have committed and
/// has no way to pull them back, so a purchase is atomic only against a
/// ledger that honours this.
pub trait AssetLedger: Send + Sync {
    /// Handle of the asset this ledger holds.
    fn asset_id(&self) -> AssetId;

    /// Number of decimal places the asset reports.
    fn decimals(&self) -> u8;

    /// 10^[`decimals`](AssetLedger::decimals).
    fn decimal_scale(&self) -> Result<u128> {
        decimal_scale(self.decimals())
    }

    fn balance_of(&self, principal: &Principal) -> u128;

    /// Amount `spender` may still pull from `owner`.
    fn allowance(&self, owner: &Principal, spender: &Principal) -> u128;

    /// Set the amount `spender` may pull from `owner`.
    fn approve(&self, owner: &Principal, spender: &Principal, amount: u128) -> Result<()>;

    /// Move `amount` from `from` to `to` on behalf of `spender`.
    ///
    /// When `spender != from` the allowance is consumed.
    fn transfer(
        &self,
        spender: &Principal,
        from: &Principal,
        to: &Principal,
        amount: u128,
    ) -> Result<()>;

    /// Move funds from `from` to several recipients, in leg order, as a
    /// single all-or-nothing operation.
    fn transfer_batch(&self, spender: &Principal, from: &Principal, legs: &[TransferLeg])
    -> Result<()>;
}

/// Observer invoked after each committed transfer, with no ledger lock held.
///
/// Hooks may call back into arbitrary code (including the exchange), which
/// is what makes reentrancy a real hazard.
pub trait TransferHook: Send + Sync {
    fn on_transfer(&self, event: &TransferEvent);
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<Principal, u128>,
    allowances: HashMap<(Principal, Principal), u128>,
    total_supply: u128,
}

impl LedgerState {
    fn balance(&self, principal: &Principal) -> u128 {
        self.balances.get(principal).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Principal, spender: &Principal) -> u128 {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }
}

/// In-memory asset ledger.
pub struct TokenLedger {
    asset_id: AssetId,
    decimals: u8,
    state: RwLock<LedgerState>,
    hook: RwLock<Option<Arc<dyn TransferHook>>>,
}

impl TokenLedger {
    /// Create an empty ledger for `asset_id`.
    #[must_use]
    pub fn new(asset_id: AssetId, decimals: u8) -> Self {
        Self {
            asset_id,
            decimals,
            state: RwLock::new(LedgerState::default()),
            hook: RwLock::new(None),
        }
    }

    /// Create new supply and credit it to `to`.
    ///
    /// # Errors
    /// `InvalidAddress` for a null recipient, `BalanceOverflow` if supply
    /// or the balance would exceed `u128`.
    pub fn mint(&self, to: &Principal, amount: u128) -> Result<()> {
        if to.is_null() {
            return Err(SaleError::InvalidAddress { field: "to" });
        }
        let mut state = self.write();
        let supply = state
            .total_supply
            .checked_add(amount)
            .ok_or(SaleError::BalanceOverflow)?;
        let balance = state
            .balance(to)
            .checked_add(amount)
            .ok_or(SaleError::BalanceOverflow)?;
        state.total_supply = supply;
        state.balances.insert(*to, balance);
        Ok(())
    }

    /// Total amount ever minted.
    #[must_use]
    pub fn total_supply(&self) -> u128 {
        self.read().total_supply
    }

    /// Every principal with a non-zero balance, with that balance.
    #[must_use]
    pub fn holders(&self) -> Vec<(Principal, u128)> {
        let mut holders: Vec<_> = self
            .read()
            .balances
            .iter()
            .filter(|(_, b)| **b > 0)
            .map(|(p, b)| (*p, *b))
            .collect();
        holders.sort_unstable();
        holders
    }

    /// Install (or replace) the post-transfer hook.
    pub fn set_hook(&self, hook: Arc<dyn TransferHook>) {
        *self.hook.write().unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, spender: &Principal, from: &Principal, legs: &[TransferLeg]) {
        let hook = self
            .hook
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(hook) = hook {
            for leg in legs {
                hook.on_transfer(&TransferEvent {
                    asset: self.asset_id,
                    spender: *spender,
                    from: *from,
                    to: leg.to,
                    amount: leg.amount,
                });
            }
        }
    }

    /// Validate and apply `legs` under one write lock. Nothing is written
    /// unless every leg succeeds.
    fn apply(&self, spender: &Principal, from: &Principal, legs: &[TransferLeg]) -> Result<()> {
        if legs.iter().any(|leg| leg.to.is_null()) {
            return Err(SaleError::InvalidAddress { field: "to" });
        }
        let total = legs
            .iter()
            .try_fold(0u128, |acc, leg| acc.checked_add(leg.amount))
            .ok_or(SaleError::BalanceOverflow)?;

        let mut state = self.write();

        let allowance = state.allowance(from, spender);
        if spender != from && allowance < total {
            return Err(SaleError::InsufficientAllowance {
                needed: total,
                available: allowance,
            });
        }

        let available = state.balance(from);
        if available < total {
            return Err(SaleError::InsufficientBalance {
                needed: total,
                available,
            });
        }

        // Stage every touched balance, then commit in one pass.
        let mut staged: HashMap<Principal, u128> = HashMap::new();
        staged.insert(*from, available - total);
        for leg in legs {
            let current = staged
                .get(&leg.to)
                .copied()
                .unwrap_or_else(|| state.balance(&leg.to));
            let credited = current
                .checked_add(leg.amount)
                .ok_or(SaleError::BalanceOverflow)?;
            staged.insert(leg.to, credited);
        }

        if spender != from {
            state.allowances.insert((*from, *spender), allowance - total);
        }
        state.balances.extend(staged);
        Ok(())
    }
}

impl AssetLedger for TokenLedger {
    fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn balance_of(&self, principal: &Principal) -> u128 {
        self.read().balance(principal)
    }

    fn allowance(&self, owner: &Principal, spender: &Principal) -> u128 {
        self.read().allowance(owner, spender)
    }

    fn approve(&self, owner: &Principal, spender: &Principal, amount: u128) -> Result<()> {
        if spender.is_null() {
            return Err(SaleError::InvalidAddress { field: "spender" });
        }
        self.write().allowances.insert((*owner, *spender), amount);
        Ok(())
    }

    fn transfer(
        &self,
        spender: &Principal,
        from: &Principal,
        to: &Principal,
        amount: u128,
    ) -> Result<()> {
        self.transfer_batch(spender, from, &[TransferLeg::new(*to, amount)])
    }

    fn transfer_batch(
        &self,
        spender: &Principal,
        from: &Principal,
        legs: &[TransferLeg],
    ) -> Result<()> {
        self.apply(spender, from, legs)?;
        tracing::trace!(
            asset = %self.asset_id,
            from = %from.short(),
            legs = legs.len(),
            "Transfer committed"
        );
        self.notify(spender, from, legs);
        Ok(())
    }
}
