//! Raw-amount helpers.
//!
//! Ledgers move raw integer amounts. `to_units` renders them in whole
//! units for logs and display only; no settlement arithmetic uses it.

use rust_decimal::Decimal;

use crate::{Result, SaleError, constants::MAX_DECIMALS};

/// Scale factor for an asset with `decimals` decimal places (10^decimals).
///
/// # Errors
/// Returns [`SaleError::InvalidScale`] if `decimals` exceeds [`MAX_DECIMALS`].
pub fn decimal_scale(decimals: u8) -> Result<u128> {
    if decimals > MAX_DECIMALS {
        return Err(SaleError::InvalidScale { decimals });
    }
    10u128
        .checked_pow(u32::from(decimals))
        .ok_or(SaleError::InvalidScale { decimals })
}

/// Render a raw amount in whole units, e.g. `1_500_000` at 6 decimals is `1.5`.
///
/// Returns `None` when the amount or scale is beyond `Decimal`'s 96-bit
/// mantissa / 28-digit range.
#[must_use]
pub fn to_units(raw: u128, decimals: u8) -> Option<Decimal> {
    let mantissa = i128::try_from(raw).ok()?;
    Decimal::try_from_i128_with_scale(mantissa, u32::from(decimals))
        .ok()
        .map(|d| d.normalize())
}
