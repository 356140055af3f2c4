//! End-to-end integration tests across the exchange and its collaborators.
//!
//! These tests drive a sale against in-memory ledgers, a role registry and
//! a pause flag, exactly as a host would wire them: purchases, pause
//! transitions, reserve recovery, supply conservation, and reentrant hooks.

use std::sync::{Arc, Mutex, OnceLock, Weak};

use tokensale_exchange::{Collaborators, ExchangeLedger, SupplyConservation};
use tokensale_ledger::{
    AccessGate, AssetLedger, PauseFlag, RoleRegistry, TokenLedger, TransferEvent, TransferHook,
};
use tokensale_types::*;

const USD: u128 = 1_000_000;
const TOKEN: u128 = 1_000_000_000_000_000_000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("tokensale=debug")
        .with_test_writer()
        .try_init();
}

/// Helper: a deployed sale with its collaborators.
struct Sale {
    exchange: Arc<ExchangeLedger>,
    sale: Arc<TokenLedger>,
    deposit: Arc<TokenLedger>,
    roles: Arc<RoleRegistry>,
    supply: SupplyConservation,
    config: SaleConfig,
}

impl Sale {
    fn deploy(reserve: u128) -> Self {
        Self::deploy_with(reserve, 18, 6)
    }

    fn deploy_with(reserve: u128, sale_decimals: u8, deposit_decimals: u8) -> Self {
        init_tracing();
        let config = SaleConfig {
            sale_asset: AssetId([0x5a; 20]),
            deposit_asset: AssetId([0xd5; 20]),
            treasury_recipient: Principal::random(),
            development_recipient: Principal::random(),
            admin: Principal::random(),
        };
        let sale = Arc::new(TokenLedger::new(config.sale_asset, sale_decimals));
        let deposit = Arc::new(TokenLedger::new(config.deposit_asset, deposit_decimals));
        let roles = Arc::new(RoleRegistry::new());

        let exchange = ExchangeLedger::create(
            config.clone(),
            Collaborators {
                account: Principal::random(),
                sale_ledger: sale.clone(),
                deposit_ledger: deposit.clone(),
                access: roles.clone(),
                pause: Arc::new(PauseFlag::new()),
            },
        )
        .expect("deployment should succeed");

        let mut supply = SupplyConservation::new();
        sale.mint(&exchange.account(), reserve).unwrap();
        supply.record_issuance(reserve).unwrap();

        Self {
            exchange: Arc::new(exchange),
            sale,
            deposit,
            roles,
            supply,
            config,
        }
    }

    fn admin(&self) -> Principal {
        self.config.admin
    }

    /// Fund a fresh buyer and approve the exchange for everything.
    fn funded_buyer(&self, usd: u128) -> Principal {
        let buyer = Principal::random();
        self.deposit.mint(&buyer, usd).unwrap();
        self.deposit
            .approve(&buyer, &self.exchange.account(), u128::MAX)
            .unwrap();
        buyer
    }
}

// =============================================================================
// Scenario A: 1,000 USD buys 100,000 tokens, split 800 / 200
// =============================================================================
#[test]
fn scenario_a_exact_settlement() {
    let s = Sale::deploy(1_000_000 * TOKEN);
    let buyer = s.funded_buyer(1_000 * USD);

    let rec = s.exchange.buy(1_000 * USD, &buyer).unwrap();

    assert_eq!(rec.buyer, buyer);
    assert_eq!(rec.deposit_amount, 1_000 * USD);
    assert_eq!(rec.payout_amount, 100_000 * TOKEN);
    assert_eq!(s.sale.balance_of(&buyer), 100_000 * TOKEN);
    assert_eq!(s.deposit.balance_of(&s.config.treasury_recipient), 800 * USD);
    assert_eq!(s.deposit.balance_of(&s.config.development_recipient), 200 * USD);
    assert_eq!(s.deposit.balance_of(&buyer), 0);
    assert_eq!(s.exchange.reserve(), 900_000 * TOKEN);
    s.supply.verify_ledger(&s.sale).unwrap();
}

#[test]
fn eighteen_decimal_deposit_asset_settles() {
    let s = Sale::deploy_with(1_000_000_000 * TOKEN, 18, 18);
    let buyer = Principal::random();
    s.deposit.mint(&buyer, 5_000 * TOKEN).unwrap();
    s.deposit
        .approve(&buyer, &s.exchange.account(), u128::MAX)
        .unwrap();

    let rec = s.exchange.buy(10 * TOKEN, &buyer).unwrap();
    assert_eq!(rec.payout_amount, 1_000 * TOKEN);
    assert_eq!(rec.treasury_amount, 8 * TOKEN);
    assert_eq!(rec.development_amount, 2 * TOKEN);

    let rec = s.exchange.buy(4_990 * TOKEN, &buyer).unwrap();
    assert_eq!(rec.payout_amount, 499_000 * TOKEN);
    assert_eq!(s.sale.balance_of(&buyer), 500_000 * TOKEN);
    assert_eq!(s.deposit.balance_of(&buyer), 0);
    s.supply.verify_ledger(&s.sale).unwrap();
}

// =============================================================================
// Scenario B: zero deposit
// =============================================================================
#[test]
fn scenario_b_zero_deposit() {
    let s = Sale::deploy(1_000_000 * TOKEN);
    let buyer = s.funded_buyer(1_000 * USD);
    assert_eq!(
        s.exchange.buy(0, &buyer).unwrap_err(),
        SaleError::InsufficientAmount { deposit: 0 }
    );
}

// =============================================================================
// Scenario C: reserve too small for the payout
// =============================================================================
#[test]
fn scenario_c_reserve_exhausted_moves_nothing() {
    let s = Sale::deploy(99_999 * TOKEN);
    let buyer = s.funded_buyer(1_000 * USD);

    let err = s.exchange.buy(1_000 * USD, &buyer).unwrap_err();
    assert_eq!(
        err,
        SaleError::TokenReserveExhausted {
            needed: 100_000 * TOKEN,
            available: 99_999 * TOKEN
        }
    );
    assert_eq!(s.deposit.balance_of(&buyer), 1_000 * USD);
    assert_eq!(s.deposit.balance_of(&s.config.treasury_recipient), 0);
    assert_eq!(s.deposit.balance_of(&s.config.development_recipient), 0);
    assert_eq!(s.exchange.reserve(), 99_999 * TOKEN);
    assert_eq!(s.exchange.audit_log().len(), 1);
}

// =============================================================================
// Scenario D: recovery gating
// =============================================================================
#[test]
fn scenario_d_recovery_gating() {
    let s = Sale::deploy(750_000 * TOKEN);
    let dest = Principal::random();
    let stranger = Principal::random();

    assert_eq!(
        s.exchange.retrieve_remaining(&dest, &s.admin()).unwrap_err(),
        SaleError::NotPaused
    );

    s.exchange.pause(&s.admin()).unwrap();
    assert_eq!(
        s.exchange.retrieve_remaining(&dest, &stranger).unwrap_err(),
        SaleError::Unauthorized {
            principal: stranger,
            role: RoleId::DEFAULT_ADMIN
        }
    );

    let rec = s.exchange.retrieve_remaining(&dest, &s.admin()).unwrap();
    assert_eq!(rec.destination, dest);
    assert_eq!(rec.amount, 750_000 * TOKEN);
    assert_eq!(s.exchange.reserve(), 0);
    assert_eq!(s.sale.balance_of(&dest), 750_000 * TOKEN);
    s.supply.verify_ledger(&s.sale).unwrap();
}

// =============================================================================
// State machine: Active ⇄ Paused
// =============================================================================
#[test]
fn full_lifecycle_buy_pause_recover_unpause() {
    let s = Sale::deploy(1_000 * TOKEN);
    let buyer = s.funded_buyer(100 * USD);

    s.exchange.buy(5 * USD, &buyer).unwrap();
    s.exchange.pause(&s.admin()).unwrap();
    assert_eq!(s.exchange.buy(USD, &buyer).unwrap_err(), SaleError::Paused);

    let treasury = Principal::random();
    let rec = s.exchange.retrieve_remaining(&treasury, &s.admin()).unwrap();
    assert_eq!(rec.amount, 500 * TOKEN);

    s.exchange.unpause(&s.admin()).unwrap();
    assert_eq!(
        s.exchange.retrieve_remaining(&treasury, &s.admin()).unwrap_err(),
        SaleError::NotPaused
    );
    // Active again, but the reserve is gone.
    assert!(matches!(
        s.exchange.buy(USD, &buyer),
        Err(SaleError::TokenReserveExhausted { available: 0, .. })
    ));

    // Restock and trade resumes.
    s.sale.mint(&s.exchange.account(), 100 * TOKEN).unwrap();
    s.exchange.buy(USD, &buyer).unwrap();
    assert_eq!(s.sale.balance_of(&buyer), 600 * TOKEN);
}

#[test]
fn delegated_admin_can_operate() {
    let s = Sale::deploy(10 * TOKEN);
    let ops = Principal::random();

    assert!(s.exchange.pause(&ops).is_err());
    s.roles
        .grant_role_as(&s.admin(), &RoleId::DEFAULT_ADMIN, &ops)
        .unwrap();
    s.exchange.pause(&ops).unwrap();
    s.exchange.retrieve_remaining(&ops, &ops).unwrap();
    assert_eq!(s.sale.balance_of(&ops), 10 * TOKEN);

    s.roles
        .revoke_role_as(&s.admin(), &RoleId::DEFAULT_ADMIN, &ops)
        .unwrap();
    assert!(matches!(
        s.exchange.unpause(&ops),
        Err(SaleError::Unauthorized { .. })
    ));
}

// =============================================================================
// Conservation and rounding
// =============================================================================
#[test]
fn supply_is_invariant_across_many_buys() {
    let s = Sale::deploy(10_000_000 * TOKEN);
    let buyers: Vec<_> = (0..5).map(|_| s.funded_buyer(50_000 * USD)).collect();
    let deposits = [
        10_000u128,
        10_001,
        123_457,
        7 * USD + 3,
        999 * USD,
        33_333_333,
        1_000 * USD,
        4 * USD + 999_999,
    ];

    for (i, amount) in deposits.iter().enumerate() {
        let buyer = &buyers[i % buyers.len()];
        let before = s.exchange.reserve();
        let rec = s.exchange.buy(*amount, buyer).unwrap();

        SupplyConservation::verify_settlement(before, s.exchange.reserve(), &rec).unwrap();
        assert!(rec.treasury_amount + rec.development_amount <= rec.deposit_amount);
        if rec.deposit_amount % 5 == 0 {
            assert_eq!(rec.dust(), 0);
        }
        s.supply.verify_ledger(&s.sale).unwrap();
    }

    let held_by_buyers: u128 = buyers.iter().map(|b| s.sale.balance_of(b)).sum();
    assert_eq!(held_by_buyers + s.exchange.reserve(), 10_000_000 * TOKEN);
}

#[test]
fn split_dust_stays_with_buyer() {
    let s = Sale::deploy(1_000 * TOKEN);
    let buyer = s.funded_buyer(USD);

    // 10_003 * 80 / 100 = 8002, 10_003 * 20 / 100 = 2000, dust = 1.
    let rec = s.exchange.buy(10_003, &buyer).unwrap();
    assert_eq!(rec.treasury_amount, 8_002);
    assert_eq!(rec.development_amount, 2_000);
    assert_eq!(rec.dust(), 1);
    assert_eq!(s.deposit.balance_of(&buyer), USD - 10_002);
    assert_eq!(s.deposit.balance_of(&s.exchange.account()), 0);
}

#[test]
fn deposit_below_floor_rejected() {
    let s = Sale::deploy(1_000 * TOKEN);
    let buyer = s.funded_buyer(USD);
    assert!(matches!(
        s.exchange.buy(9_999, &buyer),
        Err(SaleError::InsufficientAmount { deposit: 9_999 })
    ));
    assert!(s.exchange.buy(10_000, &buyer).is_ok());
}

#[test]
fn underfunded_buyer_moves_nothing() {
    let s = Sale::deploy(1_000_000 * TOKEN);
    let buyer = s.funded_buyer(10 * USD);
    let err = s.exchange.buy(20 * USD, &buyer).unwrap_err();
    assert!(matches!(err, SaleError::InsufficientBalance { .. }));
    assert_eq!(s.deposit.balance_of(&buyer), 10 * USD);
    assert_eq!(s.exchange.reserve(), 1_000_000 * TOKEN);
}

// =============================================================================
// Reentrancy
// =============================================================================

/// Hook that re-enters the exchange on every committed transfer.
struct Reenter {
    exchange: OnceLock<Weak<ExchangeLedger>>,
    caller: Principal,
    outcomes: Mutex<Vec<SaleError>>,
    action: fn(&ExchangeLedger, &Principal) -> Result<()>,
}

impl Reenter {
    fn new(caller: Principal, action: fn(&ExchangeLedger, &Principal) -> Result<()>) -> Arc<Self> {
        Arc::new(Self {
            exchange: OnceLock::new(),
            caller,
            outcomes: Mutex::new(Vec::new()),
            action,
        })
    }
}

impl TransferHook for Reenter {
    fn on_transfer(&self, _event: &TransferEvent) {
        if let Some(exchange) = self.exchange.get().and_then(Weak::upgrade) {
            if let Err(err) = (self.action)(&exchange, &self.caller) {
                self.outcomes.lock().unwrap().push(err);
            }
        }
    }
}

#[test]
fn nested_buy_from_deposit_hook_rejected() {
    let s = Sale::deploy(1_000_000 * TOKEN);
    let buyer = s.funded_buyer(1_000 * USD);

    let hook = Reenter::new(buyer, |ex, caller| ex.buy(USD, caller).map(|_| ()));
    hook.exchange.set(Arc::downgrade(&s.exchange)).unwrap();
    s.deposit.set_hook(hook.clone());

    let rec = s.exchange.buy(100 * USD, &buyer).unwrap();
    assert_eq!(rec.payout_amount, 10_000 * TOKEN);

    // One nested attempt per deposit leg, all rejected.
    let outcomes = hook.outcomes.lock().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|e| *e == SaleError::Reentrancy));

    // Only the outer purchase settled.
    assert_eq!(s.sale.balance_of(&buyer), 10_000 * TOKEN);
    assert_eq!(s.deposit.balance_of(&buyer), 900 * USD);
    let settlements = s
        .exchange
        .audit_log()
        .iter()
        .filter(|e| matches!(e.event, SaleEvent::Settlement(_)))
        .count();
    assert_eq!(settlements, 1);
}

#[test]
fn nested_buy_from_payout_hook_rejected() {
    let s = Sale::deploy(1_000_000 * TOKEN);
    let buyer = s.funded_buyer(1_000 * USD);

    let hook = Reenter::new(buyer, |ex, caller| ex.buy(USD, caller).map(|_| ()));
    hook.exchange.set(Arc::downgrade(&s.exchange)).unwrap();
    s.sale.set_hook(hook.clone());

    s.exchange.buy(10 * USD, &buyer).unwrap();
    assert_eq!(*hook.outcomes.lock().unwrap(), vec![SaleError::Reentrancy]);

    // Guard is released once the outer call returns.
    s.exchange.buy(10 * USD, &buyer).unwrap();
    assert_eq!(s.sale.balance_of(&buyer), 2_000 * TOKEN);
}

#[test]
fn nested_recovery_rejected() {
    let s = Sale::deploy(40 * TOKEN);
    let admin = s.admin();

    let hook = Reenter::new(admin, |ex, caller| {
        ex.retrieve_remaining(caller, caller).map(|_| ())
    });
    hook.exchange.set(Arc::downgrade(&s.exchange)).unwrap();
    s.sale.set_hook(hook.clone());

    s.exchange.pause(&admin).unwrap();
    let dest = Principal::random();
    let rec = s.exchange.retrieve_remaining(&dest, &admin).unwrap();

    assert_eq!(rec.amount, 40 * TOKEN);
    assert_eq!(s.sale.balance_of(&dest), 40 * TOKEN);
    assert_eq!(s.sale.balance_of(&admin), 0);
    assert_eq!(*hook.outcomes.lock().unwrap(), vec![SaleError::Reentrancy]);
}

#[test]
fn nested_recovery_during_buy_rejected_by_state() {
    let s = Sale::deploy(1_000 * TOKEN);
    let buyer = s.funded_buyer(10 * USD);
    let admin = s.admin();

    let hook = Reenter::new(admin, |ex, caller| {
        ex.retrieve_remaining(caller, caller).map(|_| ())
    });
    hook.exchange.set(Arc::downgrade(&s.exchange)).unwrap();
    s.sale.set_hook(hook.clone());

    s.exchange.buy(USD, &buyer).unwrap();
    assert_eq!(*hook.outcomes.lock().unwrap(), vec![SaleError::NotPaused]);
    assert_eq!(s.exchange.reserve(), 900 * TOKEN);
}

// =============================================================================
// Audit trail
// =============================================================================
#[test]
fn audit_log_exports_and_verifies() {
    let s = Sale::deploy(1_000 * TOKEN);
    let buyer = s.funded_buyer(10 * USD);
    s.exchange.buy(USD, &buyer).unwrap();
    s.exchange.buy(2 * USD, &buyer).unwrap();
    s.exchange.pause(&s.admin()).unwrap();

    let exported = s.exchange.export_audit_jsonl().unwrap();
    let entries: Vec<AuditEntry> = exported
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(entries.len(), 4);
    tokensale_exchange::AuditLog::verify_entries(&entries).unwrap();

    let payouts: Vec<u128> = entries
        .iter()
        .filter_map(|e| match &e.event {
            SaleEvent::Settlement(r) => Some(r.payout_amount),
            _ => None,
        })
        .collect();
    assert_eq!(payouts, vec![100 * TOKEN, 200 * TOKEN]);
}

#[test]
fn deployment_from_json_config() {
    init_tracing();
    let json = r#"{
        "sale_asset": "0x5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a",
        "deposit_asset": "0xd5d5d5d5d5d5d5d5d5d5d5d5d5d5d5d5d5d5d5d5",
        "treasury_recipient": "0x7777777777777777777777777777777777777777",
        "development_recipient": "0x0000000000000000000000000000000000000000",
        "admin": "0xadadadadadadadadadadadadadadadadadadadad"
    }"#;
    let config = SaleConfig::from_json(json).unwrap();
    let roles = Arc::new(RoleRegistry::new());

    let err = ExchangeLedger::create(
        config.clone(),
        Collaborators {
            account: Principal::random(),
            sale_ledger: Arc::new(TokenLedger::new(config.sale_asset, 18)),
            deposit_ledger: Arc::new(TokenLedger::new(config.deposit_asset, 6)),
            access: roles.clone(),
            pause: Arc::new(PauseFlag::new()),
        },
    )
    .unwrap_err();

    assert_eq!(err, SaleError::InvalidAddress { field: "development_recipient" });
    assert!(!roles.has_role(&RoleId::DEFAULT_ADMIN, &config.admin));
}
