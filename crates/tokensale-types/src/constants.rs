//! Fixed sale parameters and system-wide limits.

/// Sale-asset units issued per deposit-asset unit, before decimal scaling.
pub const EXCHANGE_RATE: u128 = 100;

/// Share of every deposit routed to the treasury recipient.
pub const TREASURY_SPLIT_NUMERATOR: u128 = 80;

/// Share of every deposit routed to the development recipient.
pub const DEVELOPMENT_SPLIT_NUMERATOR: u128 = 20;

/// Denominator of both split numerators.
pub const SPLIT_DENOMINATOR: u128 = 100;

const _: () = assert!(
    TREASURY_SPLIT_NUMERATOR + DEVELOPMENT_SPLIT_NUMERATOR == SPLIT_DENOMINATOR,
    "split numerators must sum to the denominator"
);

/// Largest decimal count whose scale (10^decimals) fits in a `u128`.
pub const MAX_DECIMALS: u8 = 38;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "tokensale";
