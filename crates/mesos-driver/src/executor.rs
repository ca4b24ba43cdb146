use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use mesos_proto::{
    executor, ExecutorId, FrameworkId, TaskId, TaskInfo, TaskStatus, TaskStatusSource,
};
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::builder::ExecutorCalls;
use crate::config::{DriverTuning, ExecutorConfig};
use crate::decoder::EventObserver;
use crate::dispatcher::{dispatch_events, DispatchReport};
use crate::handler::ExecutorHandler;
use crate::subscription::{subscribe_with_retry, Subscription};
use crate::transport::{CallResponse, HttpTransport, OutboundCall, Transport};
use crate::MesosError;

static UPDATE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates the 16 byte RFC 4122 style id the agent uses to acknowledge an
/// update.
fn new_update_uuid(executor_id: &ExecutorId, task_id: &TaskId) -> Vec<u8> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let count = UPDATE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut hasher = Sha256::new();
    hasher.update(executor_id.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(task_id.as_str().as_bytes());
    hasher.update(nanos.to_le_bytes());
    hasher.update(count.to_le_bytes());
    let mut uuid = hasher.finalize()[..16].to_vec();
    uuid[6] = (uuid[6] & 0x0f) | 0x40;
    uuid[8] = (uuid[8] & 0x3f) | 0x80;
    uuid
}

#[derive(Debug, Default)]
/// Work the agent has not confirmed yet. Resent on every subscribe.
///
/// Updates keep the order they were sent in; the agent expects a task's
/// statuses in that order.
struct Ledger {
    updates: Vec<(Vec<u8>, TaskStatus)>,
    tasks: BTreeMap<TaskId, TaskInfo>,
}

impl Ledger {
    fn record_update(&mut self, uuid: Vec<u8>, status: TaskStatus) {
        self.tasks.remove(&status.task_id);
        match self.updates.iter_mut().find(|(pending, _)| *pending == uuid) {
            Some(entry) => entry.1 = status,
            None => self.updates.push((uuid, status)),
        }
    }

    fn acknowledge(&mut self, uuid: &[u8]) -> bool {
        let before = self.updates.len();
        self.updates.retain(|(pending, _)| pending.as_slice() != uuid);
        self.updates.len() != before
    }
}

#[derive(Debug, Default)]
struct SharedLedger(Mutex<Ledger>);

impl SharedLedger {
    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> (Vec<TaskInfo>, Vec<TaskStatus>) {
        let ledger = self.lock();
        (
            ledger.tasks.values().cloned().collect(),
            ledger
                .updates
                .iter()
                .map(|(_, status)| status.clone())
                .collect(),
        )
    }

    fn observe(&self, event: &executor::Event) {
        match event {
            executor::Event::Acknowledged(acknowledged) => {
                if !self.lock().acknowledge(&acknowledged.uuid) {
                    debug!(
                        task_id = %acknowledged.task_id,
                        "acknowledgement for an unknown update"
                    );
                }
            }
            executor::Event::Launch(launch) => {
                let task = launch.task.clone();
                self.lock().tasks.insert(task.task_id.clone(), task);
            }
            executor::Event::LaunchGroup(launch_group) => {
                let mut ledger = self.lock();
                for task in &launch_group.task_group.tasks {
                    ledger.tasks.insert(task.task_id.clone(), task.clone());
                }
            }
            _ => {}
        }
    }
}

/// Executor side of the v1 HTTP API. Identity comes from the agent and never
/// changes.
pub struct ExecutorDriver {
    transport: Arc<dyn Transport>,
    framework_id: FrameworkId,
    executor_id: ExecutorId,
    ledger: Arc<SharedLedger>,
    tuning: DriverTuning,
    shutdown: watch::Sender<bool>,
}

impl ExecutorDriver {
    pub fn new(config: &ExecutorConfig) -> Result<Self, MesosError> {
        let transport = HttpTransport::new(config.http()?)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            config.framework_id.clone(),
            config.executor_id.clone(),
            config.tuning,
        ))
    }

    /// Builds a driver from the environment the agent exports.
    pub fn from_env() -> Result<Self, MesosError> {
        Self::new(&ExecutorConfig::from_env()?)
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        framework_id: FrameworkId,
        executor_id: ExecutorId,
        tuning: DriverTuning,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            transport,
            framework_id,
            executor_id,
            ledger: Arc::new(SharedLedger::default()),
            tuning,
            shutdown,
        }
    }

    pub fn framework_id(&self) -> &FrameworkId {
        &self.framework_id
    }

    pub fn executor_id(&self) -> &ExecutorId {
        &self.executor_id
    }

    /// Updates sent but not yet acknowledged, in the order they were sent.
    pub fn unacknowledged_updates(&self) -> Vec<TaskStatus> {
        self.ledger.snapshot().1
    }

    /// Launched tasks that have not reported any status yet.
    pub fn unacknowledged_tasks(&self) -> Vec<TaskInfo> {
        self.ledger.snapshot().0
    }

    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn calls(&self) -> ExecutorCalls<'_> {
        ExecutorCalls::new(&self.framework_id, &self.executor_id)
    }

    /// Opens the event stream. Each attempt resends everything the agent has
    /// not acknowledged.
    pub async fn subscribe(&self) -> Result<Subscription<executor::Event>, MesosError> {
        let ledger = Arc::clone(&self.ledger);
        let observer: EventObserver<executor::Event> =
            Arc::new(move |event: &executor::Event| ledger.observe(event));
        subscribe_with_retry(
            self.transport.as_ref(),
            || {
                let (tasks, updates) = self.ledger.snapshot();
                OutboundCall::Executor {
                    call: self.calls().subscribe(tasks, updates),
                }
            },
            &self.tuning,
            Some(observer),
            self.shutdown.subscribe(),
        )
        .await
    }

    pub async fn run(
        &self,
        handler: Arc<dyn ExecutorHandler>,
    ) -> Result<DispatchReport, MesosError> {
        let subscription = self.subscribe().await?;
        info!(executor_id = %self.executor_id, "executor subscribed to agent");
        let report =
            dispatch_events(subscription.events, handler, self.tuning.handler_concurrency).await;
        if let Ok(summary) = subscription.decoder.await {
            debug!(
                events = summary.events,
                decode_errors = summary.decode_errors,
                stream_failed = summary.stream_failed,
                "mesos executor stream finished"
            );
        }
        Ok(report)
    }

    /// Sends a status update. A missing uuid, executor id or source is filled
    /// in; the update stays in the ledger until the agent acknowledges it.
    pub async fn update(&self, status: TaskStatus) -> Result<CallResponse, MesosError> {
        let mut status = status;
        let uuid = match status.uuid.clone() {
            Some(uuid) => uuid,
            None => {
                let uuid = new_update_uuid(&self.executor_id, &status.task_id);
                status.uuid = Some(uuid.clone());
                uuid
            }
        };
        if status.executor_id.is_none() {
            status.executor_id = Some(self.executor_id.clone());
        }
        if status.source.is_none() {
            status.source = Some(TaskStatusSource::SourceExecutor);
        }

        self.ledger.lock().record_update(uuid, status.clone());
        self.submit(self.calls().update(status)).await
    }

    pub async fn message(&self, data: Vec<u8>) -> Result<CallResponse, MesosError> {
        self.submit(self.calls().message(data)).await
    }

    async fn submit(&self, call: executor::Call) -> Result<CallResponse, MesosError> {
        let call_type = call.call_type().as_str();
        match self.transport.submit(OutboundCall::Executor { call }).await {
            Ok(response) => {
                debug!(call = call_type, status = response.status, "mesos executor call accepted");
                Ok(response)
            }
            Err(error) => {
                warn!(call = call_type, error = %error, "mesos executor call failed");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use mesos_proto::executor::event::{Kill, Launch};
    use mesos_proto::executor::{CallKind, Event};
    use mesos_proto::{ExecutorId, FrameworkId, TaskId, TaskState, TaskStatus, TaskStatusSource};
    use serde_json::json;

    use super::{new_update_uuid, ExecutorDriver};
    use crate::config::DriverTuning;
    use crate::handler::ExecutorHandler;
    use crate::retry::RetryPolicy;
    use crate::test_support::{event_stream_response, live_stream_response, ScriptedTransport};
    use crate::transport::OutboundCall;
    use crate::MesosError;

    fn driver(transport: Arc<ScriptedTransport>) -> ExecutorDriver {
        ExecutorDriver::with_transport(
            transport,
            FrameworkId::new("fw-1"),
            ExecutorId::new("ex-1"),
            DriverTuning {
                retry: RetryPolicy::fixed(Duration::from_millis(1)),
                ..DriverTuning::default()
            },
        )
    }

    fn subscribe_payloads(calls: &[OutboundCall]) -> Vec<(usize, usize)> {
        calls
            .iter()
            .filter_map(|call| match call {
                OutboundCall::Executor { call } => match &call.kind {
                    CallKind::Subscribe(subscribe) => Some((
                        subscribe.unacknowledged_tasks.len(),
                        subscribe.unacknowledged_updates.len(),
                    )),
                    _ => None,
                },
                OutboundCall::Scheduler { .. } => None,
            })
            .collect()
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ExecutorHandler for Recorder {
        async fn on_launch(&self, launch: Launch) {
            self.events
                .lock()
                .expect("events")
                .push(format!("launch:{}", launch.task.task_id));
        }

        async fn on_kill(&self, kill: Kill) {
            self.events
                .lock()
                .expect("events")
                .push(format!("kill:{}", kill.task_id));
        }

        async fn on_shutdown(&self) {
            self.events.lock().expect("events").push("shutdown".to_string());
        }
    }

    #[test]
    fn unit_update_uuids_are_unique_version_four_ids() {
        let executor_id = ExecutorId::new("ex-1");
        let task_id = TaskId::new("t-1");
        let first = new_update_uuid(&executor_id, &task_id);
        let second = new_update_uuid(&executor_id, &task_id);
        assert_eq!(first.len(), 16);
        assert_ne!(first, second);
        assert_eq!(first[6] >> 4, 4);
        assert_eq!(first[8] & 0xc0, 0x80);
    }

    #[tokio::test]
    async fn functional_update_fills_missing_fields_and_enters_ledger() {
        let transport = Arc::new(ScriptedTransport::new(Vec::new()));
        let driver = driver(transport.clone());

        let response = driver
            .update(TaskStatus::new(TaskId::new("t-1"), TaskState::TaskRunning))
            .await
            .expect("update");
        assert_eq!(response.status, 202);

        let pending = driver.unacknowledged_updates();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].uuid.as_ref().map(Vec::len), Some(16));
        assert_eq!(pending[0].executor_id, Some(ExecutorId::new("ex-1")));
        assert_eq!(pending[0].source, Some(TaskStatusSource::SourceExecutor));

        let calls = transport.calls().await;
        let OutboundCall::Executor { call } = &calls[0] else {
            panic!("expected executor call");
        };
        assert_eq!(call.framework_id, FrameworkId::new("fw-1"));
        assert_eq!(call.executor_id, ExecutorId::new("ex-1"));
    }

    #[tokio::test]
    async fn integration_unacknowledged_updates_are_resent_and_cleared() {
        let transport = Arc::new(ScriptedTransport::new(Vec::new()));
        let driver = driver(transport.clone());

        driver
            .update(
                TaskStatus::new(TaskId::new("t-1"), TaskState::TaskRunning).with_uuid(vec![1, 1]),
            )
            .await
            .expect("first update");
        driver
            .update(
                TaskStatus::new(TaskId::new("t-2"), TaskState::TaskRunning).with_uuid(vec![2, 2]),
            )
            .await
            .expect("second update");

        transport
            .push(Ok(event_stream_response(
                None,
                &[json!({
                    "type": "ACKNOWLEDGED",
                    "acknowledged": {"task_id": {"value": "t-1"}, "uuid": "AQE="}
                })],
            )))
            .await;
        let mut subscription = driver.subscribe().await.expect("subscribe");
        while subscription.events.recv().await.is_some() {}

        assert_eq!(subscribe_payloads(&transport.calls().await), vec![(0, 2)]);
        let remaining = driver.unacknowledged_updates();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].task_id, TaskId::new("t-2"));
    }

    #[tokio::test]
    async fn regression_resent_updates_keep_send_order_for_a_task() {
        let transport = Arc::new(ScriptedTransport::new(Vec::new()));
        let driver = driver(transport.clone());

        driver
            .update(
                TaskStatus::new(TaskId::new("t-1"), TaskState::TaskRunning).with_uuid(vec![9, 9]),
            )
            .await
            .expect("running update");
        driver
            .update(
                TaskStatus::new(TaskId::new("t-1"), TaskState::TaskFinished).with_uuid(vec![1, 1]),
            )
            .await
            .expect("finished update");

        transport.push(Ok(event_stream_response(None, &[]))).await;
        let mut subscription = driver.subscribe().await.expect("subscribe");
        while subscription.events.recv().await.is_some() {}

        let calls = transport.calls().await;
        let resent = calls
            .iter()
            .find_map(|call| match call {
                OutboundCall::Executor { call } => match &call.kind {
                    CallKind::Subscribe(subscribe) => Some(
                        subscribe
                            .unacknowledged_updates
                            .iter()
                            .map(|update| update.status.state)
                            .collect::<Vec<_>>(),
                    ),
                    _ => None,
                },
                OutboundCall::Scheduler { .. } => None,
            })
            .expect("subscribe call");
        assert_eq!(resent, vec![TaskState::TaskRunning, TaskState::TaskFinished]);
        assert_eq!(
            driver
                .unacknowledged_updates()
                .iter()
                .map(|status| status.state)
                .collect::<Vec<_>>(),
            vec![TaskState::TaskRunning, TaskState::TaskFinished]
        );
    }

    #[tokio::test]
    async fn functional_launched_tasks_stay_unacknowledged_until_first_update() {
        let (events, response) = live_stream_response(None);
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(response)]));
        let driver = driver(transport.clone());

        let mut subscription = driver.subscribe().await.expect("subscribe");
        events
            .send(json!({
                "type": "LAUNCH",
                "launch": {"task": {
                    "name": "sleep",
                    "task_id": {"value": "t-5"},
                    "agent_id": {"value": "a-1"}
                }}
            }))
            .expect("push launch");
        assert!(matches!(subscription.events.recv().await, Some(Event::Launch(_))));
        assert_eq!(driver.unacknowledged_tasks().len(), 1);

        driver
            .update(TaskStatus::new(TaskId::new("t-5"), TaskState::TaskStarting))
            .await
            .expect("update");
        assert!(driver.unacknowledged_tasks().is_empty());
        assert_eq!(driver.unacknowledged_updates().len(), 1);

        driver.stop();
        assert!(subscription.events.recv().await.is_none());
    }

    #[tokio::test]
    async fn integration_run_routes_agent_events_to_handler() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(event_stream_response(
            None,
            &[
                json!({"type": "LAUNCH", "launch": {"task": {
                    "name": "sleep", "task_id": {"value": "t-1"}, "agent_id": {"value": "a-1"}
                }}}),
                json!({"type": "KILL", "kill": {"task_id": {"value": "t-1"}}}),
                json!({"type": "HEARTBEAT"}),
                json!({"type": "SHUTDOWN"}),
            ],
        ))]));
        let driver = driver(transport);
        let handler = Arc::new(Recorder::default());

        let report = driver
            .run(handler.clone() as Arc<dyn ExecutorHandler>)
            .await
            .expect("run");

        assert_eq!(report.dispatched, 4);
        assert_eq!(report.unknown, 0);
        assert_eq!(
            handler.events.lock().expect("events").as_slice(),
            ["launch:t-1", "kill:t-1", "shutdown"]
        );
    }

    #[tokio::test]
    async fn regression_failed_update_stays_in_ledger() {
        let transport = Arc::new(ScriptedTransport::new(vec![Err(MesosError::HttpStatus {
            status: 503,
            body: "agent restarting".to_string(),
        })]));
        let driver = driver(transport);

        let error = driver
            .update(TaskStatus::new(TaskId::new("t-1"), TaskState::TaskFailed))
            .await
            .expect_err("agent unavailable");
        assert!(matches!(error, MesosError::HttpStatus { status: 503, .. }));
        assert_eq!(driver.unacknowledged_updates().len(), 1);
    }
}
