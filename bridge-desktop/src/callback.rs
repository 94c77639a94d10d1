//! In-process callback channel backed by a tokio mpsc queue.

use bridge_traits::{
    callback::{CallbackChannel, PluginResult},
    error::{BridgeError, Result},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::trace;

/// Callback channel that queues every result for an in-process consumer.
///
/// Desktop hosts and tests use it in place of a WebView callback context.
#[derive(Debug)]
pub struct QueueChannel {
    callback_id: String,
    sender: mpsc::UnboundedSender<PluginResult>,
}

/// Consumer half of a [`QueueChannel`].
#[derive(Debug)]
pub struct QueueReceiver {
    receiver: mpsc::UnboundedReceiver<PluginResult>,
}

impl QueueChannel {
    /// Create a channel and the receiver that observes its results.
    pub fn new(callback_id: impl Into<String>) -> (Arc<Self>, QueueReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let channel = Arc::new(Self {
            callback_id: callback_id.into(),
            sender,
        });
        (channel, QueueReceiver { receiver })
    }
}

impl CallbackChannel for QueueChannel {
    fn send_plugin_result(&self, result: PluginResult) -> Result<()> {
        trace!(callback_id = %self.callback_id, keep = result.keep_callback, "Queueing plugin result");
        self.sender
            .send(result)
            .map_err(|_| BridgeError::ChannelClosed(self.callback_id.clone()))
    }

    fn callback_id(&self) -> Option<&str> {
        Some(&self.callback_id)
    }
}

impl QueueReceiver {
    /// Wait for the next result. Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<PluginResult> {
        self.receiver.recv().await
    }

    /// Wait for the next result for at most `timeout`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<PluginResult> {
        tokio::time::timeout(timeout, self.receiver.recv())
            .await
            .ok()
            .flatten()
    }

    /// Take the next result if one is already queued.
    pub fn try_recv(&mut self) -> Option<PluginResult> {
        self.receiver.try_recv().ok()
    }

    /// Take every result queued so far.
    pub fn drain(&mut self) -> Vec<PluginResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.receiver.try_recv() {
            results.push(result);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_results_are_queued_in_order() {
        let (channel, mut receiver) = QueueChannel::new("cb-1");

        channel
            .send_plugin_result(PluginResult::ok(json!([1])).with_keep_callback(true))
            .unwrap();
        channel.success(json!([0])).unwrap();

        let results = receiver.drain();
        assert_eq!(results.len(), 2);
        assert!(results[0].keep_callback);
        assert_eq!(results[1].message, json!([0]));
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_send_after_receiver_dropped_fails() {
        let (channel, receiver) = QueueChannel::new("cb-2");
        drop(receiver);

        let err = channel.success(json!([0])).unwrap_err();
        assert!(matches!(err, BridgeError::ChannelClosed(id) if id == "cb-2"));
        assert_eq!(channel.callback_id(), Some("cb-2"));
    }

    #[tokio::test]
    async fn test_recv_timeout_expires_when_empty() {
        let (_channel, mut receiver) = QueueChannel::new("cb-3");
        let result = receiver.recv_timeout(Duration::from_millis(20)).await;
        assert!(result.is_none());
    }
}
