//! Shared wire types for the gacha bet relay, plus an optional HTTP client.
//!
//! Enable the `client` feature to get [`client::BetClient`].

pub mod objects;

#[cfg(feature = "client")]
pub mod client;
