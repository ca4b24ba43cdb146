//! Pure constructors for call envelopes. Identity is passed in by the caller
//! at call time so every envelope reflects the driver's current state.
use mesos_proto::executor::call as executor_call;
use mesos_proto::scheduler::call as scheduler_call;
use mesos_proto::{
    executor, scheduler, AgentId, ExecutorId, Filters, FrameworkId, FrameworkInfo, OfferId,
    OfferOperation, Request, TaskId, TaskInfo, TaskStatus,
};

#[derive(Debug, Clone, Copy)]
pub struct SchedulerCalls<'a> {
    framework_id: Option<&'a FrameworkId>,
}

impl<'a> SchedulerCalls<'a> {
    pub fn new(framework_id: Option<&'a FrameworkId>) -> Self {
        Self { framework_id }
    }

    fn call(&self, kind: scheduler::CallKind) -> scheduler::Call {
        scheduler::Call::new(self.framework_id.cloned(), kind)
    }

    /// Re-subscription carries the assigned id both in the envelope and in
    /// `framework_info.id`.
    pub fn subscribe(
        &self,
        framework_info: FrameworkInfo,
        suppressed_roles: Vec<String>,
    ) -> scheduler::Call {
        let framework_info = match self.framework_id {
            Some(framework_id) => framework_info.with_id(framework_id.clone()),
            None => framework_info,
        };
        self.call(scheduler::CallKind::Subscribe(scheduler_call::Subscribe {
            framework_info,
            suppressed_roles,
        }))
    }

    pub fn teardown(&self) -> scheduler::Call {
        self.call(scheduler::CallKind::Teardown)
    }

    pub fn accept(
        &self,
        offer_ids: Vec<OfferId>,
        operations: Vec<OfferOperation>,
        filters: Option<Filters>,
    ) -> scheduler::Call {
        self.call(scheduler::CallKind::Accept(scheduler_call::Accept {
            offer_ids,
            operations,
            filters,
        }))
    }

    pub fn decline(&self, offer_ids: Vec<OfferId>, filters: Option<Filters>) -> scheduler::Call {
        self.call(scheduler::CallKind::Decline(scheduler_call::Decline {
            offer_ids,
            filters,
        }))
    }

    pub fn revive(&self, roles: Vec<String>) -> scheduler::Call {
        self.call(scheduler::CallKind::Revive(scheduler_call::Roles { roles }))
    }

    pub fn suppress(&self, roles: Vec<String>) -> scheduler::Call {
        self.call(scheduler::CallKind::Suppress(scheduler_call::Roles { roles }))
    }

    pub fn kill(&self, task_id: TaskId, agent_id: Option<AgentId>) -> scheduler::Call {
        self.call(scheduler::CallKind::Kill(scheduler_call::Kill {
            task_id,
            agent_id,
        }))
    }

    pub fn shutdown(&self, executor_id: ExecutorId, agent_id: AgentId) -> scheduler::Call {
        self.call(scheduler::CallKind::Shutdown(scheduler_call::Shutdown {
            executor_id,
            agent_id,
        }))
    }

    pub fn acknowledge(
        &self,
        agent_id: AgentId,
        task_id: TaskId,
        uuid: Vec<u8>,
    ) -> scheduler::Call {
        self.call(scheduler::CallKind::Acknowledge(scheduler_call::Acknowledge {
            agent_id,
            task_id,
            uuid,
        }))
    }

    /// An empty task list requests implicit reconciliation of every task.
    pub fn reconcile(&self, tasks: Vec<scheduler_call::ReconcileTask>) -> scheduler::Call {
        self.call(scheduler::CallKind::Reconcile(scheduler_call::Reconcile {
            tasks,
        }))
    }

    pub fn message(
        &self,
        agent_id: AgentId,
        executor_id: ExecutorId,
        data: Vec<u8>,
    ) -> scheduler::Call {
        self.call(scheduler::CallKind::Message(scheduler_call::Message {
            agent_id,
            executor_id,
            data,
        }))
    }

    pub fn request(&self, requests: Vec<Request>) -> scheduler::Call {
        self.call(scheduler::CallKind::Request(scheduler_call::Requests {
            requests,
        }))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutorCalls<'a> {
    framework_id: &'a FrameworkId,
    executor_id: &'a ExecutorId,
}

impl<'a> ExecutorCalls<'a> {
    pub fn new(framework_id: &'a FrameworkId, executor_id: &'a ExecutorId) -> Self {
        Self {
            framework_id,
            executor_id,
        }
    }

    fn call(&self, kind: executor::CallKind) -> executor::Call {
        executor::Call::new(self.framework_id.clone(), self.executor_id.clone(), kind)
    }

    pub fn subscribe(
        &self,
        unacknowledged_tasks: Vec<TaskInfo>,
        unacknowledged_updates: Vec<TaskStatus>,
    ) -> executor::Call {
        self.call(executor::CallKind::Subscribe(executor_call::Subscribe {
            unacknowledged_tasks,
            unacknowledged_updates: unacknowledged_updates
                .into_iter()
                .map(|status| executor_call::Update { status })
                .collect(),
        }))
    }

    pub fn update(&self, status: TaskStatus) -> executor::Call {
        self.call(executor::CallKind::Update(executor_call::Update { status }))
    }

    pub fn message(&self, data: Vec<u8>) -> executor::Call {
        self.call(executor::CallKind::Message(executor_call::Message { data }))
    }
}
