//! # Sample Gate
//!
//! A small handler set that exercises every path of the dispatch core:
//!
//! - `coolMethod` returns a value synchronously
//! - `voidMethod` returns nothing and is completed implicitly
//! - `threadMethod` reports progress and resolves from a worker thread
//! - `progressMethod` ticks every 100 ms until canceled
//! - `compatibleCheck` answers through the legacy `execute` path

use anyhow::Context as _;
use bridge_traits::PluginResult;
use core_bridge::prelude::*;
use serde_json::{json, Value};
use std::thread;
use std::time::Duration;
use tracing::{debug, error};

/// Class name the sample gate is registered under.
pub const CLASS_NAME: &str = "com.example.sample.SimpleGate";

const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
pub struct SimpleGate;

impl SimpleGate {
    pub fn new() -> Self {
        Self
    }

    fn cool_method(
        &mut self,
        call: &Invocation<'_>,
        arg1: f64,
        arg2: bool,
        arg3: String,
        arg4: JsonObject,
    ) -> anyhow::Result<()> {
        let message = describe(arg1, arg2, &arg3, &arg4)?;
        call.return_once(Value::String(message));
        Ok(())
    }

    fn void_method(&mut self) -> anyhow::Result<()> {
        debug!("voidMethod() called");
        Ok(())
    }

    fn thread_method(
        &mut self,
        call: &Invocation<'_>,
        arg1: f64,
        arg2: bool,
        arg3: String,
        arg4: JsonObject,
    ) -> anyhow::Result<()> {
        let context = call.try_context(false)?;

        let worker = context.clone();
        context.spawn(Box::new(move || {
            worker.notify(true, vec![json!(arg1 as i32), json!(arg2)]);
            worker.notify(true, vec![json!(arg3.clone()), Value::Object(arg4.clone())]);

            match describe(arg1, arg2, &arg3, &arg4) {
                Ok(message) => worker.resolve(vec![Value::String(message)]),
                Err(e) => {
                    error!(error = %e, "threadMethod() failed");
                    worker.reject_with(ResultCode::ErrorFail, Some("Invalid JSON object"), vec![]);
                }
            }
        }))?;
        Ok(())
    }

    fn progress_method(&mut self, call: &Invocation<'_>) -> anyhow::Result<()> {
        let context = call.try_context(false)?;

        if !context.register_cancelable() {
            context.reject_with(
                ResultCode::ErrorInvalidArg,
                Some("progressMethod() requires a task id"),
                vec![],
            );
            return Ok(());
        }

        let worker = context.clone();
        context.spawn(Box::new(move || {
            let mut progress: u64 = 0;
            loop {
                if worker.is_canceled() {
                    worker.reject_with(
                        ResultCode::ErrorCancel,
                        Some("progressMethod() canceled."),
                        vec![],
                    );
                    break;
                }
                worker.notify(true, vec![json!(progress)]);
                progress += 1;
                thread::sleep(PROGRESS_INTERVAL);
            }
        }))?;
        Ok(())
    }

    fn compatible_check(&self, args: &[Value], context: &TaskContext) -> anyhow::Result<()> {
        let arg1 = arg(args, 0)?
            .as_f64()
            .context("compatibleCheck: arg1 must be a number")? as i64;
        let arg2 = arg(args, 1)?
            .as_bool()
            .context("compatibleCheck: arg2 must be a boolean")?;
        let arg3 = arg(args, 2)?
            .as_str()
            .context("compatibleCheck: arg3 must be a string")?;
        let arg4 = arg(args, 3)?
            .as_object()
            .context("compatibleCheck: arg4 must be an object")?;

        let task_id = context.task_id();
        let message = json!([
            task_id,
            {
                "taskId": task_id,
                "arg1": arg1,
                "arg2": arg2,
                "arg3": arg3,
                "arg4": arg4,
            }
        ]);

        let channel = context
            .channel()
            .context("compatibleCheck: no callback channel")?;
        channel.send_plugin_result(PluginResult::ok(message))?;
        Ok(())
    }
}

impl HandlerSet for SimpleGate {
    fn register(methods: &mut MethodTable<Self>) {
        methods
            .register(
                "coolMethod",
                |gate: &mut SimpleGate, call, (arg1, arg2, arg3, arg4): (f64, bool, String, JsonObject)| {
                    gate.cool_method(call, arg1, arg2, arg3, arg4)
                },
            )
            .register("voidMethod", |gate: &mut SimpleGate, _call, (): ()| {
                gate.void_method()
            })
            .register(
                "threadMethod",
                |gate: &mut SimpleGate, call, (arg1, arg2, arg3, arg4): (f64, bool, String, JsonObject)| {
                    gate.thread_method(call, arg1, arg2, arg3, arg4)
                },
            )
            .register("progressMethod", |gate: &mut SimpleGate, call, (): ()| {
                gate.progress_method(call)
            });
    }

    fn execute(&mut self, action: &str, args: &[Value], context: &TaskContext) -> anyhow::Result<bool> {
        match action {
            "compatibleCheck" => {
                self.compatible_check(args, context)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn on_cancel(&mut self, task_id: Option<&str>) {
        debug!(task_id = ?task_id, "SimpleGate cancel received");
    }
}

fn arg(args: &[Value], index: usize) -> anyhow::Result<&Value> {
    args.get(index)
        .with_context(|| format!("compatibleCheck: missing argument {}", index))
}

fn describe(arg1: f64, arg2: bool, arg3: &str, arg4: &JsonObject) -> anyhow::Result<String> {
    let ok = arg4
        .get("ok")
        .and_then(Value::as_bool)
        .context("Invalid JSON object: missing boolean \"ok\"")?;
    Ok(format!(
        "arg1: {}, arg2: {}, arg3: {}, 日本語でOK: {}",
        arg1 as i32, arg2, arg3, ok
    ))
}
