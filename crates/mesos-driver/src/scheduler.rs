use std::sync::Arc;

use mesos_proto::scheduler::call::ReconcileTask;
use mesos_proto::{
    scheduler, AgentId, ExecutorId, Filters, FrameworkId, FrameworkInfo, OfferId, OfferOperation,
    Request, TaskId,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::builder::SchedulerCalls;
use crate::config::{DriverTuning, SchedulerConfig};
use crate::decoder::EventObserver;
use crate::dispatcher::{dispatch_events, DispatchReport};
use crate::handler::SchedulerHandler;
use crate::identity::{IdentityUpdate, SessionIdentity};
use crate::subscription::{subscribe_with_retry, Subscription};
use crate::transport::{CallResponse, HttpTransport, OutboundCall, Transport};
use crate::MesosError;

/// Records the framework id carried by SUBSCRIBED before the event is
/// published, so handlers and later calls observe the assigned identity.
fn framework_id_observer(identity: Arc<SessionIdentity>) -> EventObserver<scheduler::Event> {
    Arc::new(move |event: &scheduler::Event| {
        let scheduler::Event::Subscribed(subscribed) = event else {
            return;
        };
        if subscribed.framework_id.is_empty() {
            warn!("ignoring SUBSCRIBED event without a framework id");
            return;
        }
        match identity.assign_framework_id(&subscribed.framework_id) {
            IdentityUpdate::Assigned => {
                info!(
                    framework_id = %subscribed.framework_id,
                    "framework registered with mesos master"
                );
            }
            IdentityUpdate::Unchanged => {
                debug!(framework_id = %subscribed.framework_id, "framework re-registered");
            }
            IdentityUpdate::Conflict { current } => {
                warn!(
                    current = %current,
                    received = %subscribed.framework_id,
                    "ignoring SUBSCRIBED event for a different framework id"
                );
            }
        }
    })
}

/// Scheduler side of the v1 HTTP API.
///
/// Every call method reads the framework id at call time. Only `subscribe`
/// changes identity.
pub struct SchedulerDriver {
    transport: Arc<dyn Transport>,
    framework_info: FrameworkInfo,
    suppressed_roles: Vec<String>,
    identity: Arc<SessionIdentity>,
    tuning: DriverTuning,
    shutdown: watch::Sender<bool>,
}

impl SchedulerDriver {
    pub fn new(
        config: &SchedulerConfig,
        framework_info: FrameworkInfo,
    ) -> Result<Self, MesosError> {
        let transport = HttpTransport::new(config.http()?)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            framework_info,
            config.tuning,
        ))
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        framework_info: FrameworkInfo,
        tuning: DriverTuning,
    ) -> Self {
        let identity = SessionIdentity::with_framework_id(framework_info.assigned_id().cloned());
        let (shutdown, _) = watch::channel(false);
        Self {
            transport,
            framework_info,
            suppressed_roles: Vec::new(),
            identity: Arc::new(identity),
            tuning,
            shutdown,
        }
    }

    /// Roles to subscribe in the suppressed state.
    pub fn with_suppressed_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suppressed_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn framework_info(&self) -> &FrameworkInfo {
        &self.framework_info
    }

    pub fn framework_id(&self) -> Option<FrameworkId> {
        self.identity.framework_id()
    }

    pub fn stream_id(&self) -> Option<String> {
        self.identity.stream_id()
    }

    /// Cancels a pending subscribe and ends the event stream. Terminal.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Opens the event stream, retrying per the configured policy.
    pub async fn subscribe(&self) -> Result<Subscription<scheduler::Event>, MesosError> {
        let subscription = subscribe_with_retry(
            self.transport.as_ref(),
            || OutboundCall::Scheduler {
                call: self.build(|calls| {
                    calls.subscribe(self.framework_info.clone(), self.suppressed_roles.clone())
                }),
                stream_id: None,
            },
            &self.tuning,
            Some(framework_id_observer(Arc::clone(&self.identity))),
            self.shutdown.subscribe(),
        )
        .await?;
        self.identity.set_stream_id(subscription.stream_id.clone());
        Ok(subscription)
    }

    /// Subscribes and dispatches events to `handler` until the stream ends
    /// or [`SchedulerDriver::stop`] is called. Does not resubscribe.
    pub async fn run(
        &self,
        handler: Arc<dyn SchedulerHandler>,
    ) -> Result<DispatchReport, MesosError> {
        let subscription = self.subscribe().await?;
        let report =
            dispatch_events(subscription.events, handler, self.tuning.handler_concurrency).await;
        if let Ok(summary) = subscription.decoder.await {
            debug!(
                events = summary.events,
                decode_errors = summary.decode_errors,
                stream_failed = summary.stream_failed,
                "mesos scheduler stream finished"
            );
        }
        Ok(report)
    }

    pub async fn teardown(&self) -> Result<CallResponse, MesosError> {
        self.submit(self.build(|calls| calls.teardown())).await
    }

    pub async fn accept(
        &self,
        offer_ids: Vec<OfferId>,
        operations: Vec<OfferOperation>,
        filters: Option<Filters>,
    ) -> Result<CallResponse, MesosError> {
        self.submit(self.build(|calls| calls.accept(offer_ids, operations, filters)))
            .await
    }

    pub async fn decline(
        &self,
        offer_ids: Vec<OfferId>,
        filters: Option<Filters>,
    ) -> Result<CallResponse, MesosError> {
        self.submit(self.build(|calls| calls.decline(offer_ids, filters)))
            .await
    }

    pub async fn revive(&self, roles: Vec<String>) -> Result<CallResponse, MesosError> {
        self.submit(self.build(|calls| calls.revive(roles))).await
    }

    pub async fn suppress(&self, roles: Vec<String>) -> Result<CallResponse, MesosError> {
        self.submit(self.build(|calls| calls.suppress(roles))).await
    }

    pub async fn kill(
        &self,
        task_id: TaskId,
        agent_id: Option<AgentId>,
    ) -> Result<CallResponse, MesosError> {
        self.submit(self.build(|calls| calls.kill(task_id, agent_id)))
            .await
    }

    pub async fn shutdown(
        &self,
        executor_id: ExecutorId,
        agent_id: AgentId,
    ) -> Result<CallResponse, MesosError> {
        self.submit(self.build(|calls| calls.shutdown(executor_id, agent_id)))
            .await
    }

    pub async fn acknowledge(
        &self,
        agent_id: AgentId,
        task_id: TaskId,
        uuid: Vec<u8>,
    ) -> Result<CallResponse, MesosError> {
        self.submit(self.build(|calls| calls.acknowledge(agent_id, task_id, uuid)))
            .await
    }

    pub async fn reconcile(&self, tasks: Vec<ReconcileTask>) -> Result<CallResponse, MesosError> {
        self.submit(self.build(|calls| calls.reconcile(tasks))).await
    }

    pub async fn message(
        &self,
        agent_id: AgentId,
        executor_id: ExecutorId,
        data: Vec<u8>,
    ) -> Result<CallResponse, MesosError> {
        self.submit(self.build(|calls| calls.message(agent_id, executor_id, data)))
            .await
    }

    pub async fn request(&self, requests: Vec<Request>) -> Result<CallResponse, MesosError> {
        self.submit(self.build(|calls| calls.request(requests))).await
    }

    fn build<F>(&self, build: F) -> scheduler::Call
    where
        F: FnOnce(SchedulerCalls<'_>) -> scheduler::Call,
    {
        let framework_id = self.identity.framework_id();
        build(SchedulerCalls::new(framework_id.as_ref()))
    }

    async fn submit(&self, call: scheduler::Call) -> Result<CallResponse, MesosError> {
        let call_type = call.call_type().as_str();
        if call.framework_id.is_none() {
            return Err(MesosError::NotSubscribed { call: call_type });
        }
        let outbound = OutboundCall::Scheduler {
            call,
            stream_id: self.identity.stream_id(),
        };
        match self.transport.submit(outbound).await {
            Ok(response) => {
                debug!(call = call_type, status = response.status, "mesos call accepted");
                Ok(response)
            }
            Err(error) => {
                warn!(call = call_type, error = %error, "mesos call failed");
                Err(error)
            }
        }
    }
}
