//! Resolution channel factory and handles.

use super::types::ResolutionEvent;
use tokio::sync::mpsc;

/// Default buffer size for the resolution channel.
///
/// A full buffer makes the gateway wait, which gives the listener backpressure
/// over the ledger subscription.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for ResolutionEvent messages.
pub type ResolutionSender = mpsc::Sender<ResolutionEvent>;
/// Receiver handle for ResolutionEvent messages.
pub type ResolutionReceiver = mpsc::Receiver<ResolutionEvent>;

/// Create a new resolution channel.
///
/// The sender is handed to the gateway's subscription; the receiver is
/// owned by the listener.
pub fn resolution_channel() -> (ResolutionSender, ResolutionReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
