//! Fixed-rate conversion and deposit split.
//!
//! All arithmetic is integer, multiply first and divide last, in exactly
//! this order:
//!
//! ```text
//! rate_adjusted = deposit * EXCHANGE_RATE / deposit_scale
//! payout        = deposit * EXCHANGE_RATE * sale_scale / deposit_scale
//! treasury      = deposit * 80 / 100
//! development   = deposit * 20 / 100
//! ```
//!
//! Reordering changes rounding. The two split branches truncate
//! independently, so `treasury + development` can fall short of `deposit`;
//! the shortfall stays with the buyer.
//!
//! Intermediate products are taken at 512-bit width: with `u128` deposits
//! and scales up to 10^38 no product can overflow, so the only overflow is
//! a result that does not fit a ledger amount.

use alloy_primitives::U512;
use tokensale_types::constants::{
    DEVELOPMENT_SPLIT_NUMERATOR, EXCHANGE_RATE, SPLIT_DENOMINATOR, TREASURY_SPLIT_NUMERATOR,
};
use tokensale_types::{AssetScales, Result, SaleError};

/// The outcome of a purchase, computed without touching any ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub deposit_amount: u128,
    /// Deposit converted at the fixed rate, in whole sale units.
    pub rate_adjusted: u128,
    /// Raw sale-asset amount released to the buyer.
    pub payout: u128,
    pub treasury_amount: u128,
    pub development_amount: u128,
}

impl Quote {
    /// Total pulled from the buyer.
    #[must_use]
    pub fn deposit_pulled(&self) -> u128 {
        self.treasury_amount + self.development_amount
    }

    /// Deposit left with the buyer by truncation.
    #[must_use]
    pub fn dust(&self) -> u128 {
        self.deposit_amount - self.deposit_pulled()
    }
}

/// `floor(a * b / d)` at full width, checked only on the result.
fn mul_div_floor(a: U512, b: U512, d: u128, context: &'static str) -> Result<u128> {
    let quotient = a * b / U512::from(d);
    u128::try_from(quotient).map_err(|_| SaleError::ArithmeticOverflow { context })
}

/// Price a deposit.
///
/// # Errors
/// - [`SaleError::InsufficientAmount`] if the rate-adjusted value is zero
/// - [`SaleError::ArithmeticOverflow`] if a result exceeds `u128`
pub fn quote(deposit_amount: u128, scales: &AssetScales) -> Result<Quote> {
    let deposit = U512::from(deposit_amount);
    let rated = deposit * U512::from(EXCHANGE_RATE);

    let rate_adjusted = mul_div_floor(
        rated,
        U512::from(1u8),
        scales.deposit_scale,
        "rate conversion",
    )?;
    if rate_adjusted == 0 {
        return Err(SaleError::InsufficientAmount {
            deposit: deposit_amount,
        });
    }

    let payout = mul_div_floor(
        rated,
        U512::from(scales.sale_scale),
        scales.deposit_scale,
        "payout",
    )?;
    let treasury_amount = mul_div_floor(
        deposit,
        U512::from(TREASURY_SPLIT_NUMERATOR),
        SPLIT_DENOMINATOR,
        "treasury split",
    )?;
    let development_amount = mul_div_floor(
        deposit,
        U512::from(DEVELOPMENT_SPLIT_NUMERATOR),
        SPLIT_DENOMINATOR,
        "development split",
    )?;

    Ok(Quote {
        deposit_amount,
        rate_adjusted,
        payout,
        treasury_amount,
        development_amount,
    })
}
