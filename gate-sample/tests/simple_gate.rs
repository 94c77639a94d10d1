//! End-to-end calls into the sample gate through the bridge service.

use bridge_desktop::{QueueChannel, QueueReceiver, TokioWorkerPool};
use bridge_traits::{CallbackChannel, PluginResult, ResultStatus};
use core_service::prelude::*;
use core_service::{BridgeConfig, BridgeService};
use gate_sample::{SimpleGate, CLASS_NAME};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn service() -> BridgeService {
    let pool = TokioWorkerPool::current().unwrap();
    let config = BridgeConfig::builder()
        .worker_pool(Arc::new(pool))
        .build()
        .unwrap();
    let service = BridgeService::new(config);
    service.register_gate(CLASS_NAME, SimpleGate::new).unwrap();
    service
}

fn exec_info(method: &str, task_id: Option<&str>, compatible: bool) -> ExecInfo {
    ExecInfo::from_value(json!({
        "feature": {
            "android": { "packageInfo": CLASS_NAME },
            "ios": { "className": "SimpleGate" }
        },
        "method": method,
        "objectId": "sample-1",
        "taskId": task_id,
        "compatible": compatible
    }))
    .unwrap()
}

fn channel() -> (Option<Arc<dyn CallbackChannel>>, QueueReceiver) {
    let (channel, receiver) = QueueChannel::new("sample");
    let channel: Arc<dyn CallbackChannel> = channel;
    (Some(channel), receiver)
}

fn sample_args() -> Vec<Value> {
    vec![json!(100), json!(true), json!("test"), json!({ "ok": true })]
}

async fn next(receiver: &mut QueueReceiver) -> PluginResult {
    receiver
        .recv_timeout(WAIT)
        .await
        .expect("no result within timeout")
}

#[tokio::test(flavor = "multi_thread")]
async fn cool_method_returns_description() {
    let service = service();
    let (ch, mut rx) = channel();

    let state = service
        .exec(&exec_info("coolMethod", Some("c1"), false), sample_args(), ch)
        .unwrap();

    assert_eq!(state, DispatchState::Resolved);
    let results = rx.drain();
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].message,
        json!([0, null, "c1", "arg1: 100, arg2: true, arg3: test, 日本語でOK: true"])
    );
    assert!(!results[0].keep_callback);
}

#[tokio::test(flavor = "multi_thread")]
async fn void_method_completes_implicitly() {
    let service = service();
    let (ch, mut rx) = channel();

    service
        .exec(&exec_info("voidMethod", Some("v1"), false), vec![], ch)
        .unwrap();

    let results = rx.drain();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].message, json!([0, null, "v1"]));
}

#[tokio::test(flavor = "multi_thread")]
async fn thread_method_reports_progress_then_resolves() {
    let service = service();
    let (ch, mut rx) = channel();

    let state = service
        .exec(&exec_info("threadMethod", Some("t1"), false), sample_args(), ch)
        .unwrap();
    assert_eq!(state, DispatchState::AwaitingAsync);

    let first = next(&mut rx).await;
    assert_eq!(first.message, json!([1, null, "t1", 100, true]));
    assert!(first.keep_callback);

    let second = next(&mut rx).await;
    assert_eq!(second.message, json!([1, null, "t1", "test", { "ok": true }]));

    let last = next(&mut rx).await;
    assert_eq!(
        last.message,
        json!([0, null, "t1", "arg1: 100, arg2: true, arg3: test, 日本語でOK: true"])
    );
    assert!(!last.keep_callback);
}

#[tokio::test(flavor = "multi_thread")]
async fn thread_method_rejects_invalid_object() {
    let service = service();
    let (ch, mut rx) = channel();

    let args = vec![json!(1), json!(false), json!("x"), json!({})];
    service
        .exec(&exec_info("threadMethod", Some("t2"), false), args, ch)
        .unwrap();

    let mut last = next(&mut rx).await;
    while last.keep_callback {
        last = next(&mut rx).await;
    }
    assert_eq!(last.status, ResultStatus::Error);
    assert_eq!(last.message, json!([2, "Invalid JSON object", "t2"]));
}

#[tokio::test(flavor = "multi_thread")]
async fn progress_method_runs_until_canceled() {
    let service = service();
    let (ch, mut rx) = channel();
    let info = exec_info("progressMethod", Some("p1"), false);

    service.exec(&info, vec![], ch).unwrap();

    let first = next(&mut rx).await;
    assert_eq!(first.message, json!([1, null, "p1", 0]));
    let second = next(&mut rx).await;
    assert_eq!(second.message, json!([1, null, "p1", 1]));

    assert_eq!(service.cancel(&info), 1);

    let mut last = next(&mut rx).await;
    while last.keep_callback {
        last = next(&mut rx).await;
    }
    assert_eq!(last.message, json!([3, "progressMethod() canceled.", "p1"]));

    let gate = service.gate("sample-1").unwrap();
    assert_eq!(gate.cancel(Some("p1")), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn progress_method_without_task_id_is_rejected() {
    let service = service();
    let (ch, mut rx) = channel();

    service
        .exec(&exec_info("progressMethod", None, false), vec![], ch)
        .unwrap();

    let results = rx.drain();
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].message,
        json!([4, "progressMethod() requires a task id", null])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn compatible_check_answers_through_execute() {
    let service = service();
    let (ch, mut rx) = channel();

    service
        .exec(&exec_info("compatibleCheck", Some("k1"), true), sample_args(), ch)
        .unwrap();

    let results = rx.drain();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, ResultStatus::Ok);
    assert_eq!(
        results[0].message,
        json!([
            "k1",
            {
                "taskId": "k1",
                "arg1": 100,
                "arg2": true,
                "arg3": "test",
                "arg4": { "ok": true }
            }
        ])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_argument_types_are_not_dispatched() {
    let service = service();
    let (ch, mut rx) = channel();

    let args = vec![json!("100"), json!(true), json!("test"), json!({ "ok": true })];
    assert!(service
        .exec(&exec_info("coolMethod", Some("w1"), false), args, ch)
        .is_err());

    let results = rx.drain();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].message[0], json!(9));
}
