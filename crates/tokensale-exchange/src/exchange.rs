//! The exchange ledger: fixed-rate purchase, pause control, reserve recovery.
//!
//! Lifecycle:
//! ```text
//! create() → [Active] ──pause──▶ [Paused] ──unpause──▶ [Active]
//!              buy() only          retrieve_remaining() only
//! ```
//!
//! A purchase moves three amounts, in order:
//! 1. treasury share of the deposit, buyer → treasury recipient
//! 2. development share of the deposit, buyer → development recipient
//! 3. payout of sale asset, reserve → buyer
//!
//! Legs 1 and 2 go through one all-or-nothing deposit-ledger batch. Leg 3
//! draws from a reserve that was checked beforehand and that only this
//! exchange can spend, while the reentrancy guard keeps every other
//! spending path closed. Any precondition failure leaves all state as it was.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokensale_ledger::{AccessGate, AssetLedger, PauseSwitch, TransferLeg};
use tokensale_types::constants::{ENGINE_NAME, VERSION};
use tokensale_types::{
    AssetScales, AuditEntry, PauseRecord, Principal, RecoveryRecord, Result, RoleId, RoleRecord,
    SaleConfig, SaleError, SaleEvent, SettlementRecord, to_units,
};

use crate::audit::AuditLog;
use crate::guard::ReentrancyGuard;
use crate::pricing::{self, Quote};

/// External providers the exchange is deployed against.
pub struct Collaborators {
    /// The exchange's own account; the reserve is this principal's balance.
    pub account: Principal,
    pub sale_ledger: Arc<dyn AssetLedger>,
    pub deposit_ledger: Arc<dyn AssetLedger>,
    pub access: Arc<dyn AccessGate>,
    pub pause: Arc<dyn PauseSwitch>,
}

/// Fixed-rate sale settlement core.
pub struct ExchangeLedger {
    config: SaleConfig,
    scales: AssetScales,
    account: Principal,
    sale_ledger: Arc<dyn AssetLedger>,
    deposit_ledger: Arc<dyn AssetLedger>,
    access: Arc<dyn AccessGate>,
    pause: Arc<dyn PauseSwitch>,
    guard: ReentrancyGuard,
    audit: Mutex<AuditLog>,
}

impl std::fmt::Debug for ExchangeLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeLedger")
            .field("config", &self.config)
            .field("scales", &self.scales)
            .field("account", &self.account)
            .field("paused", &self.pause.is_paused())
            .finish_non_exhaustive()
    }
}

impl ExchangeLedger {
    /// Deploy a sale.
    ///
    /// Validates every identity, checks the ledgers match the configured
    /// assets and caches both decimal scales before granting the admin
    /// role. Nothing is granted or recorded if any check fails.
    ///
    /// # Errors
    /// - `InvalidAddress` for a null identity in `config` or a null account
    /// - `Configuration` if a ledger's asset does not match `config`
    /// - `InvalidScale` if an asset reports more than 38 decimals
    pub fn create(config: SaleConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        if collaborators.account.is_null() {
            return Err(SaleError::InvalidAddress { field: "account" });
        }
        if collaborators.sale_ledger.asset_id() != config.sale_asset {
            return Err(SaleError::Configuration(format!(
                "sale ledger holds {} but config names {}",
                collaborators.sale_ledger.asset_id(),
                config.sale_asset
            )));
        }
        if collaborators.deposit_ledger.asset_id() != config.deposit_asset {
            return Err(SaleError::Configuration(format!(
                "deposit ledger holds {} but config names {}",
                collaborators.deposit_ledger.asset_id(),
                config.deposit_asset
            )));
        }

        let scales = AssetScales::from_decimals(
            collaborators.sale_ledger.decimals(),
            collaborators.deposit_ledger.decimals(),
        )?;

        let exchange = Self {
            scales,
            account: collaborators.account,
            sale_ledger: collaborators.sale_ledger,
            deposit_ledger: collaborators.deposit_ledger,
            access: collaborators.access,
            pause: collaborators.pause,
            guard: ReentrancyGuard::new(),
            audit: Mutex::new(AuditLog::new()),
            config,
        };

        exchange
            .access
            .grant_role(&RoleId::DEFAULT_ADMIN, &exchange.config.admin);
        exchange.emit(SaleEvent::Role(RoleRecord {
            role: RoleId::DEFAULT_ADMIN,
            account: exchange.config.admin,
            sender: exchange.account,
            granted: true,
            timestamp: Utc::now(),
        }));

        tracing::info!(
            engine = ENGINE_NAME,
            version = VERSION,
            account = %exchange.account,
            sale_asset = %exchange.config.sale_asset,
            deposit_asset = %exchange.config.deposit_asset,
            sale_decimals = scales.sale_decimals,
            deposit_decimals = scales.deposit_decimals,
            admin = %exchange.config.admin,
            "Sale created"
        );

        Ok(exchange)
    }

    // -----------------------------------------------------------------
    // Purchase
    // -----------------------------------------------------------------

    /// Buy sale asset with `deposit_amount` raw units of the deposit asset.
    ///
    /// The caller must have approved this exchange's account for at least
    /// the pulled amount (treasury + development shares).
    ///
    /// # Errors
    /// In check order: `Paused`, `Reentrancy`, `InsufficientAmount` /
    /// `ArithmeticOverflow`, `TokenReserveExhausted`, then any deposit
    /// ledger rejection (`InsufficientBalance`, `InsufficientAllowance`).
    pub fn buy(&self, deposit_amount: u128, caller: &Principal) -> Result<SettlementRecord> {
        let result = self.settle_purchase(deposit_amount, caller);
        if let Err(err) = &result {
            tracing::warn!(buyer = %caller, deposit = deposit_amount, error = %err, "Purchase rejected");
        }
        result
    }

    fn settle_purchase(&self, deposit_amount: u128, caller: &Principal) -> Result<SettlementRecord> {
        self.pause.ensure_active()?;
        let _in_flight = self.guard.enter()?;

        let quote = pricing::quote(deposit_amount, &self.scales)?;
        let available = self.reserve();
        if available < quote.payout {
            return Err(SaleError::TokenReserveExhausted {
                needed: quote.payout,
                available,
            });
        }

        let legs = [
            TransferLeg::new(self.config.treasury_recipient, quote.treasury_amount),
            TransferLeg::new(self.config.development_recipient, quote.development_amount),
        ];
        self.deposit_ledger
            .transfer_batch(&self.account, caller, &legs)?;

        if let Err(err) = self
            .sale_ledger
            .transfer(&self.account, &self.account, caller, quote.payout)
        {
            // Only a ledger breaking the AssetLedger contract gets here: the
            // reserve was checked and the guard is held. The deposit legs
            // stay committed and no settlement is recorded.
            tracing::error!(
                buyer = %caller,
                payout = quote.payout,
                error = %err,
                "Payout failed after deposit was collected"
            );
            return Err(err);
        }

        let record = SettlementRecord {
            buyer: *caller,
            deposit_amount,
            payout_amount: quote.payout,
            treasury_amount: quote.treasury_amount,
            development_amount: quote.development_amount,
            timestamp: Utc::now(),
        };
        let entry = self.emit(SaleEvent::Settlement(record.clone()));

        tracing::info!(
            buyer = %caller,
            deposit = ?to_units(deposit_amount, self.scales.deposit_decimals),
            payout = ?to_units(quote.payout, self.scales.sale_decimals),
            treasury = quote.treasury_amount,
            development = quote.development_amount,
            dust = quote.dust(),
            sequence = entry.sequence,
            "Purchase settled"
        );

        Ok(record)
    }

    /// Price a deposit without moving anything.
    pub fn quote(&self, deposit_amount: u128) -> Result<Quote> {
        pricing::quote(deposit_amount, &self.scales)
    }

    // -----------------------------------------------------------------
    // Recovery
    // -----------------------------------------------------------------

    /// Drain the whole reserve to `destination`. Admin only, Paused only.
    ///
    /// An empty reserve still succeeds and records a zero amount.
    ///
    /// # Errors
    /// In check order: `NotPaused`, `Unauthorized`, `Reentrancy`, then any
    /// sale-ledger rejection (e.g. `InvalidAddress` for a null destination).
    pub fn retrieve_remaining(
        &self,
        destination: &Principal,
        caller: &Principal,
    ) -> Result<RecoveryRecord> {
        let result = self.drain_reserve(destination, caller);
        if let Err(err) = &result {
            tracing::warn!(caller = %caller, destination = %destination, error = %err, "Recovery rejected");
        }
        result
    }

    fn drain_reserve(&self, destination: &Principal, caller: &Principal) -> Result<RecoveryRecord> {
        self.pause.ensure_paused()?;
        self.access.check_role(&RoleId::DEFAULT_ADMIN, caller)?;
        let _in_flight = self.guard.enter()?;

        let amount = self.reserve();
        self.sale_ledger
            .transfer(&self.account, &self.account, destination, amount)?;

        let record = RecoveryRecord {
            destination: *destination,
            amount,
            timestamp: Utc::now(),
        };
        self.emit(SaleEvent::Recovery(record.clone()));

        tracing::info!(
            destination = %destination,
            amount = ?to_units(amount, self.scales.sale_decimals),
            admin = %caller,
            "Reserve retrieved"
        );

        Ok(record)
    }

    // -----------------------------------------------------------------
    // Pause control
    // -----------------------------------------------------------------

    /// Move the pause switch to `paused`. Admin only.
    ///
    /// # Errors
    /// `Unauthorized`, or `AlreadyInState` from the pause switch.
    pub fn set_paused(&self, paused: bool, caller: &Principal) -> Result<PauseRecord> {
        self.access.check_role(&RoleId::DEFAULT_ADMIN, caller)?;
        self.pause.set_paused(paused)?;

        let record = PauseRecord {
            account: *caller,
            paused,
            timestamp: Utc::now(),
        };
        self.emit(SaleEvent::Pause(record.clone()));
        tracing::info!(paused, admin = %caller, "Pause switch flipped");
        Ok(record)
    }

    pub fn pause(&self, caller: &Principal) -> Result<PauseRecord> {
        self.set_paused(true, caller)
    }

    pub fn unpause(&self, caller: &Principal) -> Result<PauseRecord> {
        self.set_paused(false, caller)
    }

    // -----------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------

    /// Sale-asset balance of the exchange's own account.
    #[must_use]
    pub fn reserve(&self) -> u128 {
        self.sale_ledger.balance_of(&self.account)
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    #[must_use]
    pub fn config(&self) -> &SaleConfig {
        &self.config
    }

    #[must_use]
    pub fn scales(&self) -> AssetScales {
        self.scales
    }

    #[must_use]
    pub fn account(&self) -> Principal {
        self.account
    }

    /// Snapshot of every emitted entry, oldest first.
    #[must_use]
    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.audit().entries().to_vec()
    }

    pub fn verify_audit_chain(&self) -> Result<()> {
        self.audit().verify_chain()
    }

    pub fn export_audit_jsonl(&self) -> Result<String> {
        self.audit().export_jsonl()
    }

    fn audit(&self) -> MutexGuard<'_, AuditLog> {
        self.audit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SaleEvent) -> AuditEntry {
        let entry = self.audit().append(event);
        tracing::debug!(
            kind = entry.event.kind(),
            sequence = entry.sequence,
            hash = hex::encode(entry.hash),
            "Record emitted"
        );
        entry
    }
}
