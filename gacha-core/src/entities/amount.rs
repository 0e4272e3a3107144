use super::ValidationError;
use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of decimal places between ether and wei.
pub const ETHER_DECIMALS: u32 = 18;

/// A non-negative amount in wei.
///
/// Kept as a normalized decimal digit string (no sign, no leading zeros) so
/// that full 256-bit ledger quantities survive persistence unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WeiAmount(String);

impl WeiAmount {
    pub fn zero() -> Self {
        Self("0".to_string())
    }

    /// Parse a decimal ether string such as `"0.1"` into wei.
    ///
    /// Only plain digits with an optional fractional part are accepted. The
    /// value must be strictly positive and carry at most 18 fractional digits.
    pub fn parse_ether(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidAmount(input.to_string());

        let mut dots = 0;
        for b in input.bytes() {
            match b {
                b'0'..=b'9' => {}
                b'.' => dots += 1,
                _ => return Err(invalid()),
            }
        }
        if dots > 1 || !input.bytes().any(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let value = Decimal::from_str(input).map_err(|_| invalid())?.normalize();
        if value.is_zero() || value.is_sign_negative() {
            return Err(invalid());
        }
        if value.scale() > ETHER_DECIMALS {
            return Err(ValidationError::TooPrecise(input.to_string()));
        }

        let mantissa = u128::try_from(value.mantissa()).map_err(|_| invalid())?;
        let factor = 10u128.pow(ETHER_DECIMALS - value.scale());
        let wei = mantissa
            .checked_mul(factor)
            .ok_or_else(|| ValidationError::TooLarge(input.to_string()))?;

        Ok(Self::from_u128(wei))
    }

    pub fn from_u128(value: u128) -> Self {
        Self(value.to_string())
    }

    pub fn from_uint(value: U256) -> Self {
        Self(value.to_string())
    }

    /// The value as a 256-bit integer.
    pub fn to_uint(&self) -> Option<U256> {
        parse_uint(&self.0)
    }

    /// The value as `u128`, or `None` if it does not fit.
    pub fn as_u128(&self) -> Option<u128> {
        self.0.parse().ok()
    }

    pub fn is_zero(&self) -> bool {
        self.0 == "0"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WeiAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for WeiAmount {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let malformed = (value.len() > 1 && value.starts_with('0')) || parse_uint(&value).is_none();
        if malformed {
            return Err(ValidationError::InvalidAmount(value));
        }
        Ok(Self(value))
    }
}

impl From<WeiAmount> for String {
    fn from(value: WeiAmount) -> Self {
        value.0
    }
}

/// Parse an unsigned decimal string, rejecting anything but plain digits.
pub(crate) fn parse_uint(input: &str) -> Option<U256> {
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_str_radix(input, 10).ok()
}
