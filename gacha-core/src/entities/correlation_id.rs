use super::amount::parse_uint;
use alloy_primitives::U256;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Identifier the ledger assigns to a bet when its transaction is accepted.
///
/// On EVM ledgers this is the VRF `requestId`, a `uint256` rendered in
/// decimal. The core treats it as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(CompactString);

impl CorrelationId {
    pub fn new(value: impl Into<CompactString>) -> Self {
        Self(value.into())
    }

    pub fn from_uint(value: U256) -> Self {
        Self(compact_str::format_compact!("{value}"))
    }

    /// The identifier as a `uint256`, if it is a decimal integer.
    pub fn to_uint(&self) -> Option<U256> {
        parse_uint(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for CorrelationId {
    fn from(value: u64) -> Self {
        Self(compact_str::format_compact!("{value}"))
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<CorrelationId> for String {
    fn from(value: CorrelationId) -> Self {
        value.0.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint_round_trip_only_for_decimal_ids() {
        let id = CorrelationId::from_uint(U256::from(42u64));
        assert_eq!(id, CorrelationId::from(42));
        assert_eq!(id.to_uint(), Some(U256::from(42u64)));
        assert_eq!(CorrelationId::from("req-7").to_uint(), None);
        assert_eq!(CorrelationId::from("+7").to_uint(), None);
    }
}
