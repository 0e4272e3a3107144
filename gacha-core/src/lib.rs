#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod entities;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod processors;
pub mod store;
