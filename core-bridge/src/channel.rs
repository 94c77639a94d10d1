//! Result channel operations.
//!
//! Every operation tolerates a context without a callback channel: it logs
//! and returns. At most one terminal message leaves a call; later terminal or
//! progress messages on the same context are logged and dropped.

use crate::context::TaskContext;
use crate::message::{ResultCode, ResultMessage};
use serde_json::Value;
use tracing::{debug, error, warn};

impl TaskContext {
    /// Sends a non-terminal notification.
    ///
    /// With `keep_open` the message is coded as progress and the script-side
    /// callback stays registered. Task lifetime and cancelability are
    /// unaffected either way.
    pub fn notify(&self, keep_open: bool, payload: Vec<Value>) {
        let message = ResultMessage::progress(self.owned_task_id(), payload, keep_open);
        self.send(message);
    }

    /// Sends a progress notification and keeps the callback open.
    pub fn progress(&self, payload: Vec<Value>) {
        self.notify(true, payload);
    }

    /// Completes the call successfully.
    pub fn resolve(&self, payload: Vec<Value>) {
        self.send(ResultMessage::success(self.owned_task_id(), payload));
    }

    /// Fails the call with [`ResultCode::ErrorFail`].
    pub fn reject(&self, payload: Vec<Value>) {
        self.reject_with(ResultCode::ErrorFail, None, payload);
    }

    /// Fails the call with an explicit code and message.
    pub fn reject_with(&self, code: ResultCode, message: Option<&str>, payload: Vec<Value>) {
        if !code.is_error() {
            warn!(
                task_id = ?self.task_id(),
                code = code.as_i32(),
                "reject_with() called with a success code"
            );
        }
        self.send(ResultMessage::error(
            code,
            message.map(str::to_string),
            self.owned_task_id(),
            payload,
        ));
    }

    /// Delivers `message` unless the call already ended.
    ///
    /// Returns whether the message reached the channel.
    pub(crate) fn send(&self, message: ResultMessage) -> bool {
        let Some(channel) = self.channel() else {
            error!(
                object_id = %self.object_id(),
                task_id = ?self.task_id(),
                "Invalid context object: no callback channel"
            );
            return false;
        };

        if message.is_terminal() {
            if !self.claim_terminal() {
                warn!(
                    object_id = %self.object_id(),
                    task_id = ?self.task_id(),
                    code = message.code().as_i32(),
                    "Terminal result already sent; dropping"
                );
                return false;
            }
            if let (Some(task_id), Some(registry)) = (self.task_id(), self.registry()) {
                registry.complete(task_id);
            }
        } else if self.is_terminated() {
            warn!(
                object_id = %self.object_id(),
                task_id = ?self.task_id(),
                "Notification after terminal result; dropping"
            );
            return false;
        }

        debug!(
            task_id = ?self.task_id(),
            code = message.code().as_i32(),
            terminal = message.is_terminal(),
            "Sending result"
        );

        match channel.send_plugin_result(message.into_plugin_result()) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    object_id = %self.object_id(),
                    task_id = ?self.task_id(),
                    error = %e,
                    "Callback channel rejected result"
                );
                false
            }
        }
    }

    fn owned_task_id(&self) -> Option<String> {
        self.task_id().map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use crate::cancel::CancellationRegistry;
    use crate::context::TaskContext;
    use crate::message::ResultCode;
    use crate::request::CallRequest;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{CallbackChannel, PluginResult, ResultStatus};
    use mockall::mock;
    use mockall::predicate::*;
    use serde_json::json;
    use std::sync::Arc;

    mock! {
        pub Channel {}

        impl CallbackChannel for Channel {
            fn send_plugin_result(&self, result: PluginResult) -> BridgeResult<()>;
        }
    }

    fn context_with(channel: MockChannel, task_id: Option<&str>) -> TaskContext {
        let mut request = CallRequest::new("m").with_channel(Arc::new(channel));
        if let Some(id) = task_id {
            request = request.with_task_id(id);
        }
        TaskContext::new(request)
    }

    #[test]
    fn test_notify_keep_open_sends_progress() {
        let mut channel = MockChannel::new();
        channel
            .expect_send_plugin_result()
            .with(eq(PluginResult::ok(json!([1, null, "t1", 5])).with_keep_callback(true)))
            .times(1)
            .returning(|_| Ok(()));

        let ctx = context_with(channel, Some("t1"));
        ctx.notify(true, vec![json!(5)]);
        assert!(!ctx.is_terminated());
    }

    #[test]
    fn test_notify_closed_uses_success_code() {
        let mut channel = MockChannel::new();
        channel
            .expect_send_plugin_result()
            .with(eq(PluginResult::ok(json!([0, null, null, "x"]))))
            .times(1)
            .returning(|_| Ok(()));

        let ctx = context_with(channel, None);
        ctx.notify(false, vec![json!("x")]);
        assert!(!ctx.is_terminated());
    }

    #[test]
    fn test_reject_defaults_to_fail_code() {
        let mut channel = MockChannel::new();
        channel
            .expect_send_plugin_result()
            .withf(|result| {
                result.status == ResultStatus::Error
                    && result.message == json!([2, null, "t1", "why"])
            })
            .times(1)
            .returning(|_| Ok(()));

        let ctx = context_with(channel, Some("t1"));
        ctx.reject(vec![json!("why")]);
        assert!(ctx.is_terminated());
    }

    #[test]
    fn test_reject_with_code_and_message() {
        let mut channel = MockChannel::new();
        channel
            .expect_send_plugin_result()
            .with(eq(PluginResult::error(json!([3, "canceled", "t1"]))))
            .times(1)
            .returning(|_| Ok(()));

        let ctx = context_with(channel, Some("t1"));
        ctx.reject_with(ResultCode::ErrorCancel, Some("canceled"), vec![]);
    }

    #[test]
    fn test_second_terminal_is_dropped() {
        let mut channel = MockChannel::new();
        channel
            .expect_send_plugin_result()
            .times(1)
            .returning(|_| Ok(()));

        let ctx = context_with(channel, Some("t1"));
        ctx.resolve(vec![json!("first")]);
        ctx.reject(vec![]);
        ctx.resolve(vec![]);
        ctx.notify(true, vec![json!(1)]);
    }

    #[test]
    fn test_missing_channel_is_ignored() {
        let ctx = TaskContext::new(CallRequest::new("m").with_task_id("t1"));
        ctx.notify(true, vec![json!(0)]);
        ctx.resolve(vec![]);
        ctx.reject(vec![]);
        assert!(!ctx.is_terminated());
    }

    #[test]
    fn test_channel_failure_is_logged() {
        let mut channel = MockChannel::new();
        channel.expect_send_plugin_result().times(1).returning(|_| {
            Err(bridge_traits::BridgeError::ChannelClosed(
                "webview gone".to_string(),
            ))
        });

        let ctx = context_with(channel, None);
        ctx.resolve(vec![]);
        assert!(ctx.is_terminated());
    }

    #[test]
    fn test_terminal_completes_registry_entry() {
        let mut channel = MockChannel::new();
        channel
            .expect_send_plugin_result()
            .times(1)
            .returning(|_| Ok(()));

        let registry = Arc::new(CancellationRegistry::new());
        let ctx = context_with(channel, Some("t1")).attach(Arc::clone(&registry), None);
        assert!(ctx.register_cancelable());
        assert_eq!(registry.len(), 1);

        ctx.resolve(vec![]);
        assert!(registry.is_empty());
    }
}
