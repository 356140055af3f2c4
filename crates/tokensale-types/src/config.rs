//! Deployment configuration for a sale.

use serde::{Deserialize, Serialize};

use crate::{AssetId, Principal, Result, SaleError};

/// The five identities fixed at deployment. Immutable once a sale exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleConfig {
    /// The asset being sold.
    pub sale_asset: AssetId,
    /// The asset accepted as payment.
    pub deposit_asset: AssetId,
    /// Receives the treasury share of every deposit.
    pub treasury_recipient: Principal,
    /// Receives the development share of every deposit.
    pub development_recipient: Principal,
    /// Initial holder of the admin role.
    pub admin: Principal,
}

impl SaleConfig {
    /// Parse a config from JSON. Does not validate; see [`SaleConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject null identities, checked in declaration order.
    ///
    /// # Errors
    /// Returns [`SaleError::InvalidAddress`] naming the first null field.
    pub fn validate(&self) -> Result<()> {
        if self.sale_asset.is_null() {
            return Err(SaleError::InvalidAddress { field: "sale_asset" });
        }
        if self.deposit_asset.is_null() {
            return Err(SaleError::InvalidAddress { field: "deposit_asset" });
        }
        if self.treasury_recipient.is_null() {
            return Err(SaleError::InvalidAddress { field: "treasury_recipient" });
        }
        if self.development_recipient.is_null() {
            return Err(SaleError::InvalidAddress { field: "development_recipient" });
        }
        if self.admin.is_null() {
            return Err(SaleError::InvalidAddress { field: "admin" });
        }
        Ok(())
    }
}

/// Decimal scales captured from each asset at creation and never refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetScales {
    pub sale_decimals: u8,
    pub deposit_decimals: u8,
    /// 10^`sale_decimals`.
    pub sale_scale: u128,
    /// 10^`deposit_decimals`.
    pub deposit_scale: u128,
}

impl AssetScales {
    pub fn from_decimals(sale_decimals: u8, deposit_decimals: u8) -> Result<Self> {
        Ok(Self {
            sale_decimals,
            deposit_decimals,
            sale_scale: crate::decimal_scale(sale_decimals)?,
            deposit_scale: crate::decimal_scale(deposit_decimals)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SaleConfig {
        SaleConfig {
            sale_asset: AssetId([1u8; 20]),
            deposit_asset: AssetId([2u8; 20]),
            treasury_recipient: Principal([3u8; 20]),
            development_recipient: Principal([4u8; 20]),
            admin: Principal([5u8; 20]),
        }
    }

    #[test]
    fn sample_config_is_valid() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn each_null_field_is_named() {
        let mut cfg = sample();
        cfg.deposit_asset = AssetId::NULL;
        assert_eq!(
            cfg.validate().unwrap_err(),
            SaleError::InvalidAddress { field: "deposit_asset" }
        );

        let mut cfg = sample();
        cfg.admin = Principal::NULL;
        assert_eq!(
            cfg.validate().unwrap_err(),
            SaleError::InvalidAddress { field: "admin" }
        );
    }

    #[test]
    fn first_null_field_wins() {
        let mut cfg = sample();
        cfg.treasury_recipient = Principal::NULL;
        cfg.development_recipient = Principal::NULL;
        assert_eq!(
            cfg.validate().unwrap_err(),
            SaleError::InvalidAddress { field: "treasury_recipient" }
        );
    }

    #[test]
    fn json_roundtrip_uses_hex_identities() {
        let cfg = sample();
        let json = cfg.to_json().unwrap();
        assert!(json.contains("\"0x0101010101010101010101010101010101010101\""));
        assert_eq!(SaleConfig::from_json(&json).unwrap(), cfg);
    }

    #[test]
    fn from_json_rejects_bad_identity() {
        let json = r#"{
            "sale_asset": "0x01",
            "deposit_asset": "0x0202020202020202020202020202020202020202",
            "treasury_recipient": "0x0303030303030303030303030303030303030303",
            "development_recipient": "0x0404040404040404040404040404040404040404",
            "admin": "0x0505050505050505050505050505050505050505"
        }"#;
        let err = SaleConfig::from_json(json).unwrap_err();
        assert!(matches!(err, SaleError::Serialization(_)));
    }

    #[test]
    fn scales_from_decimals() {
        let scales = AssetScales::from_decimals(18, 6).unwrap();
        assert_eq!(scales.sale_scale, 1_000_000_000_000_000_000);
        assert_eq!(scales.deposit_scale, 1_000_000);
    }
}
