//! Resolution events and the channel that carries them.
//!
//! # Event Flow
//!
//! 1. A `LedgerGateway` observes a `BetResolved` log and pushes a
//!    `ResolutionEvent` onto the resolution channel.
//! 2. The `ResolutionListener` drains the channel and reconciles each event
//!    into the `EventStore`.
//!
//! Delivery is at-least-once: the same event may arrive more than once and
//! events for different bets arrive in no particular order.

pub mod channels;
pub mod types;

pub use channels::{
    resolution_channel, ResolutionReceiver, ResolutionSender, DEFAULT_CHANNEL_BUFFER,
};

pub use types::ResolutionEvent;
