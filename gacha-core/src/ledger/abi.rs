//! Solidity ABI helpers for the handful of calls and logs the gateway needs:
//! function selectors, event topics and 32-byte words.

use super::GatewayError;
use alloy_primitives::{Address, B256, U256, keccak256};
use alloy_sol_types::SolValue;

/// First four bytes of the keccak hash of a function signature such as
/// `placeBet(uint256)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Topic 0 of an event, as a `0x`-prefixed lowercase hex string.
pub fn event_topic(signature: &str) -> String {
    to_hex(keccak256(signature.as_bytes()))
}

/// Encode a call: selector followed by the ABI-encoded arguments.
pub fn encode_call<T: SolValue>(signature: &str, args: &T) -> String
where
    for<'a> <T::SolType as alloy_sol_types::SolType>::Token<'a>: alloy_sol_types::abi::TokenSeq<'a>,
{
    let mut data = selector(signature).to_vec();
    data.extend(args.abi_encode_params());
    to_hex(data)
}

pub fn parse_address(address: &str) -> Result<Address, GatewayError> {
    address
        .parse()
        .map_err(|e| GatewayError::Malformed(format!("address {address}: {e}")))
}

/// Lowercase `0x`-prefixed rendering, the form the node reports addresses in.
pub fn format_address(address: &Address) -> String {
    to_hex(address)
}

pub fn word_to_address(word: &B256) -> Address {
    Address::from_word(*word)
}

pub fn word_to_uint(word: &B256) -> U256 {
    U256::from_be_bytes(word.0)
}

pub fn word_to_bool(word: &B256) -> bool {
    !word.is_zero()
}

/// Split hex log data into 32-byte words.
pub fn decode_words(data: &str) -> Result<Vec<B256>, GatewayError> {
    let bytes = from_hex(data)?;
    if bytes.len() % 32 != 0 {
        return Err(GatewayError::Malformed(format!(
            "log data length {} is not a multiple of 32",
            bytes.len()
        )));
    }
    Ok(bytes.chunks_exact(32).map(B256::from_slice).collect())
}

pub fn decode_word(hex: &str) -> Result<B256, GatewayError> {
    let mut words = decode_words(hex)?;
    match (words.pop(), words.is_empty()) {
        (Some(word), true) => Ok(word),
        _ => Err(GatewayError::Malformed(format!("{hex} is not a single word"))),
    }
}

/// Parse a JSON-RPC hex quantity such as `0x1b4`.
pub fn parse_quantity(quantity: &str) -> Result<u64, GatewayError> {
    let digits = quantity
        .strip_prefix("0x")
        .ok_or_else(|| GatewayError::Malformed(format!("quantity {quantity} lacks 0x prefix")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| GatewayError::Malformed(format!("quantity {quantity}: {e}")))
}

pub fn format_quantity(value: u128) -> String {
    format!("{value:#x}")
}

pub fn to_hex(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn from_hex(input: &str) -> Result<Vec<u8>, GatewayError> {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    hex::decode(digits).map_err(|e| GatewayError::Malformed(format!("hex {input}: {e}")))
}
