use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use httpmock::prelude::*;
use mesos_driver::mesos_proto::scheduler::event::{Subscribed, Update};
use mesos_driver::mesos_proto::{FrameworkId, FrameworkInfo, TaskId, TaskState, TaskStatus};
use mesos_driver::{
    encode_record, DriverTuning, ExecutorConfig, ExecutorDriver, HttpTransport,
    HttpTransportConfig, MesosError, RetryPolicy, SchedulerConfig, SchedulerDriver,
    SchedulerHandler,
};
use serde_json::json;

fn recordio(events: &[serde_json::Value]) -> Vec<u8> {
    events
        .iter()
        .flat_map(|event| encode_record(event.to_string().as_bytes()))
        .collect()
}

fn fast_tuning() -> DriverTuning {
    DriverTuning {
        retry: RetryPolicy::fixed(Duration::from_millis(5)).with_max_attempts(3),
        ..DriverTuning::default()
    }
}

#[derive(Default)]
struct Collector {
    subscribed: Mutex<Vec<String>>,
    updates: Mutex<Vec<TaskState>>,
}

#[async_trait]
impl SchedulerHandler for Collector {
    async fn on_subscribed(&self, subscribed: Subscribed) {
        self.subscribed
            .lock()
            .expect("subscribed")
            .push(subscribed.framework_id.to_string());
    }

    async fn on_update(&self, update: Update) {
        self.updates.lock().expect("updates").push(update.status.state);
    }
}

#[tokio::test]
async fn integration_scheduler_subscribe_decodes_recordio_stream() {
    let server = MockServer::start();
    let body = recordio(&[
        json!({
            "type": "SUBSCRIBED",
            "subscribed": {"framework_id": {"value": "fw-123"}, "heartbeat_interval_seconds": 15.0}
        }),
        json!({"type": "HEARTBEAT"}),
        json!({
            "type": "UPDATE",
            "update": {"status": {"task_id": {"value": "t-1"}, "state": "TASK_RUNNING", "uuid": "AQI="}}
        }),
    ]);
    let subscribe = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/scheduler")
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .json_body_includes(
                json!({
                    "type": "SUBSCRIBE",
                    "subscribe": {"framework_info": {"user": "root", "name": "demo"}}
                })
                .to_string(),
            );
        then.status(200)
            .header("Mesos-Stream-Id", "stream-abc")
            .header("content-type", "application/json")
            .body(body);
    });

    let mut config = SchedulerConfig::new(server.base_url());
    config.tuning = fast_tuning();
    let driver = SchedulerDriver::new(&config, FrameworkInfo::new("root", "demo"))
        .expect("scheduler driver");
    let handler = Arc::new(Collector::default());

    let report = driver.run(handler.clone()).await.expect("run");

    subscribe.assert_calls(1);
    assert_eq!(report.dispatched, 3);
    assert_eq!(driver.framework_id(), Some(FrameworkId::new("fw-123")));
    assert_eq!(driver.stream_id().as_deref(), Some("stream-abc"));
    assert_eq!(
        handler.subscribed.lock().expect("subscribed").as_slice(),
        ["fw-123"]
    );
    assert_eq!(
        handler.updates.lock().expect("updates").as_slice(),
        [TaskState::TaskRunning]
    );
}

#[tokio::test]
async fn integration_scheduler_calls_carry_stream_id_and_framework_id() {
    let server = MockServer::start();
    let subscribe = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/scheduler")
            .json_body_includes(json!({"type": "SUBSCRIBE"}).to_string());
        then.status(200)
            .header("Mesos-Stream-Id", "stream-xyz")
            .body(recordio(&[json!({
                "type": "SUBSCRIBED",
                "subscribed": {"framework_id": {"value": "fw-9"}}
            })]));
    });
    let teardown = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/scheduler")
            .header("mesos-stream-id", "stream-xyz")
            .json_body_includes(
                json!({"type": "TEARDOWN", "framework_id": {"value": "fw-9"}}).to_string(),
            );
        then.status(202);
    });

    let mut config = SchedulerConfig::new(server.base_url());
    config.tuning = fast_tuning();
    let driver = SchedulerDriver::new(&config, FrameworkInfo::new("root", "demo"))
        .expect("scheduler driver");
    driver
        .run(Arc::new(Collector::default()))
        .await
        .expect("run");

    let response = driver.teardown().await.expect("teardown");
    assert_eq!(response.status, 202);
    subscribe.assert_calls(1);
    teardown.assert_calls(1);
}

#[tokio::test]
async fn integration_non_success_status_surfaces_body() {
    let server = MockServer::start();
    let subscribe = server.mock(|when, then| {
        when.method(POST).path("/api/v1/scheduler");
        then.status(400).body("Failed to validate scheduler::Call");
    });

    let mut config = SchedulerConfig::new(server.base_url());
    config.tuning = fast_tuning();
    let driver = SchedulerDriver::new(&config, FrameworkInfo::new("root", "demo"))
        .expect("scheduler driver");

    let error = driver
        .subscribe()
        .await
        .expect_err("bounded retries exhaust");
    match error {
        MesosError::SubscribeExhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("Failed to validate"));
        }
        other => panic!("unexpected error: {other}"),
    }
    subscribe.assert_calls(3);
}

#[tokio::test]
async fn integration_executor_update_posts_to_agent_endpoint() {
    let server = MockServer::start();
    let update = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/executor")
            .json_body_includes(
                json!({
                    "type": "UPDATE",
                    "framework_id": {"value": "fw-1"},
                    "executor_id": {"value": "ex-1"},
                    "update": {"status": {"task_id": {"value": "t-1"}, "state": "TASK_FINISHED"}}
                })
                .to_string(),
            );
        then.status(202);
    });

    let mut config = ExecutorConfig::new(
        server.base_url(),
        FrameworkId::new("fw-1"),
        "ex-1".into(),
    );
    config.tuning = fast_tuning();
    let driver = ExecutorDriver::new(&config).expect("executor driver");

    let response = driver
        .update(TaskStatus::new(TaskId::new("t-1"), TaskState::TaskFinished))
        .await
        .expect("update");
    assert_eq!(response.status, 202);
    update.assert_calls(1);
    assert_eq!(driver.unacknowledged_updates().len(), 1);
}

#[tokio::test]
async fn regression_request_timeout_applies_to_plain_calls() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/executor");
        then.status(202).delay(Duration::from_millis(500));
    });

    let transport = HttpTransport::new(HttpTransportConfig {
        endpoint: server.base_url(),
        connect_timeout_ms: 1_000,
        request_timeout_ms: 50,
    })
    .expect("transport");
    let driver = ExecutorDriver::with_transport(
        Arc::new(transport),
        FrameworkId::new("fw-1"),
        "ex-1".into(),
        fast_tuning(),
    );

    let error = driver
        .message(b"ping".to_vec())
        .await
        .expect_err("request should time out");
    assert!(matches!(error, MesosError::Http(ref inner) if inner.is_timeout()));
}
