//! Trailing-edge debouncing for continuous text input.
//!
//! Search keystrokes must not each produce a URL update and a store
//! query. A [`channel`] accepts every value immediately but only
//! emits the most recent one after a full quiet window has elapsed
//! with no newer submission; intermediate values are discarded, never
//! queued.

use std::time::Duration;

use tokio::sync::mpsc;

/// Sender half of a debounce channel.
#[derive(Debug, Clone)]
pub struct DebounceInput<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> DebounceInput<T> {
    /// Submit a new value, restarting the quiet window. Returns false
    /// if the channel has been torn down.
    pub fn send(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

/// Create a debounce channel with the given quiet window.
///
/// The worker task exits when the input half is dropped; a value
/// still pending at that point is discarded (teardown means the
/// session is gone, so a late commit would be meaningless).
pub fn channel<T: Send + 'static>(window: Duration) -> (DebounceInput<T>, mpsc::UnboundedReceiver<T>) {
    let (in_tx, mut in_rx) = mpsc::unbounded_channel::<T>();
    let (out_tx, out_rx) = mpsc::unbounded_channel::<T>();

    tokio::spawn(async move {
        let mut pending: Option<T> = None;
        loop {
            tokio::select! {
                received = in_rx.recv() => {
                    match received {
                        // Newest value replaces anything pending and
                        // restarts the window.
                        Some(value) => pending = Some(value),
                        None => break,
                    }
                }
                _ = tokio::time::sleep(window), if pending.is_some() => {
                    if let Some(value) = pending.take() {
                        if out_tx.send(value).is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });

    (DebounceInput { tx: in_tx }, out_rx)
}
