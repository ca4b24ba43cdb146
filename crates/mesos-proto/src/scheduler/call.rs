use serde::{Deserialize, Serialize};

use crate::{
    AgentId, ExecutorId, Filters, FrameworkId, FrameworkInfo, OfferId, OfferOperation, TaskId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Wire discriminant of a scheduler call.
pub enum CallType {
    Subscribe,
    Teardown,
    Accept,
    Decline,
    Revive,
    Suppress,
    Kill,
    Shutdown,
    Acknowledge,
    Reconcile,
    Message,
    Request,
    #[serde(other)]
    Unknown,
}

impl CallType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "SUBSCRIBE",
            Self::Teardown => "TEARDOWN",
            Self::Accept => "ACCEPT",
            Self::Decline => "DECLINE",
            Self::Revive => "REVIVE",
            Self::Suppress => "SUPPRESS",
            Self::Kill => "KILL",
            Self::Shutdown => "SHUTDOWN",
            Self::Acknowledge => "ACKNOWLEDGE",
            Self::Reconcile => "RECONCILE",
            Self::Message => "MESSAGE",
            Self::Request => "REQUEST",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscribe {
    pub framework_info: FrameworkInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppressed_roles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Accept {
    pub offer_ids: Vec<OfferId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<OfferOperation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Filters>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decline {
    pub offer_ids: Vec<OfferId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Filters>,
}

/// Role list shared by REVIVE and SUPPRESS; empty means every role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kill {
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shutdown {
    pub executor_id: ExecutorId,
    pub agent_id: AgentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledge {
    pub agent_id: AgentId,
    pub task_id: TaskId,
    #[serde(with = "crate::encoding::base64_bytes")]
    pub uuid: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileTask {
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
}

/// Empty task list asks the master for implicit reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconcile {
    #[serde(default)]
    pub tasks: Vec<ReconcileTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub agent_id: AgentId,
    pub executor_id: ExecutorId,
    #[serde(with = "crate::encoding::base64_bytes")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requests {
    #[serde(default)]
    pub requests: Vec<crate::Request>,
}

#[derive(Debug, Clone, PartialEq)]
/// Payload of a scheduler call, one variant per call kind.
pub enum CallKind {
    Subscribe(Subscribe),
    Teardown,
    Accept(Accept),
    Decline(Decline),
    Revive(Roles),
    Suppress(Roles),
    Kill(Kill),
    Shutdown(Shutdown),
    Acknowledge(Acknowledge),
    Reconcile(Reconcile),
    Message(Message),
    Request(Requests),
}

impl CallKind {
    pub fn call_type(&self) -> CallType {
        match self {
            Self::Subscribe(_) => CallType::Subscribe,
            Self::Teardown => CallType::Teardown,
            Self::Accept(_) => CallType::Accept,
            Self::Decline(_) => CallType::Decline,
            Self::Revive(_) => CallType::Revive,
            Self::Suppress(_) => CallType::Suppress,
            Self::Kill(_) => CallType::Kill,
            Self::Shutdown(_) => CallType::Shutdown,
            Self::Acknowledge(_) => CallType::Acknowledge,
            Self::Reconcile(_) => CallType::Reconcile,
            Self::Message(_) => CallType::Message,
            Self::Request(_) => CallType::Request,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawCall", try_from = "RawCall")]
/// Scheduler call envelope sent to `/api/v1/scheduler`.
pub struct Call {
    pub framework_id: Option<FrameworkId>,
    pub kind: CallKind,
}

impl Call {
    pub fn new(framework_id: Option<FrameworkId>, kind: CallKind) -> Self {
        Self { framework_id, kind }
    }

    pub fn call_type(&self) -> CallType {
        self.kind.call_type()
    }

    pub fn is_subscribe(&self) -> bool {
        matches!(self.kind, CallKind::Subscribe(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    framework_id: Option<FrameworkId>,
    #[serde(rename = "type")]
    call_type: CallType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subscribe: Option<Subscribe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    accept: Option<Accept>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    decline: Option<Decline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    revive: Option<Roles>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    suppress: Option<Roles>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kill: Option<Kill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shutdown: Option<Shutdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    acknowledge: Option<Acknowledge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reconcile: Option<Reconcile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request: Option<Requests>,
}

impl RawCall {
    fn bare(framework_id: Option<FrameworkId>, call_type: CallType) -> Self {
        Self {
            framework_id,
            call_type,
            subscribe: None,
            accept: None,
            decline: None,
            revive: None,
            suppress: None,
            kill: None,
            shutdown: None,
            acknowledge: None,
            reconcile: None,
            message: None,
            request: None,
        }
    }
}

fn roles_payload(roles: Roles) -> Option<Roles> {
    if roles.roles.is_empty() {
        None
    } else {
        Some(roles)
    }
}

impl From<Call> for RawCall {
    fn from(call: Call) -> Self {
        let mut raw = RawCall::bare(call.framework_id, call.kind.call_type());
        match call.kind {
            CallKind::Subscribe(payload) => raw.subscribe = Some(payload),
            CallKind::Teardown => {}
            CallKind::Accept(payload) => raw.accept = Some(payload),
            CallKind::Decline(payload) => raw.decline = Some(payload),
            CallKind::Revive(payload) => raw.revive = roles_payload(payload),
            CallKind::Suppress(payload) => raw.suppress = roles_payload(payload),
            CallKind::Kill(payload) => raw.kill = Some(payload),
            CallKind::Shutdown(payload) => raw.shutdown = Some(payload),
            CallKind::Acknowledge(payload) => raw.acknowledge = Some(payload),
            CallKind::Reconcile(payload) => raw.reconcile = Some(payload),
            CallKind::Message(payload) => raw.message = Some(payload),
            CallKind::Request(payload) => raw.request = Some(payload),
        }
        raw
    }
}

fn require<T>(payload: Option<T>, call_type: CallType, field: &str) -> Result<T, String> {
    payload.ok_or_else(|| format!("{} call is missing its `{field}` payload", call_type.as_str()))
}

impl TryFrom<RawCall> for Call {
    type Error = String;

    fn try_from(raw: RawCall) -> Result<Self, Self::Error> {
        let call_type = raw.call_type;
        let kind = match call_type {
            CallType::Subscribe => {
                CallKind::Subscribe(require(raw.subscribe, call_type, "subscribe")?)
            }
            CallType::Teardown => CallKind::Teardown,
            CallType::Accept => CallKind::Accept(require(raw.accept, call_type, "accept")?),
            CallType::Decline => CallKind::Decline(require(raw.decline, call_type, "decline")?),
            CallType::Revive => CallKind::Revive(raw.revive.unwrap_or_default()),
            CallType::Suppress => CallKind::Suppress(raw.suppress.unwrap_or_default()),
            CallType::Kill => CallKind::Kill(require(raw.kill, call_type, "kill")?),
            CallType::Shutdown => {
                CallKind::Shutdown(require(raw.shutdown, call_type, "shutdown")?)
            }
            CallType::Acknowledge => {
                CallKind::Acknowledge(require(raw.acknowledge, call_type, "acknowledge")?)
            }
            CallType::Reconcile => CallKind::Reconcile(raw.reconcile.unwrap_or_default()),
            CallType::Message => CallKind::Message(require(raw.message, call_type, "message")?),
            CallType::Request => CallKind::Request(require(raw.request, call_type, "request")?),
            CallType::Unknown => return Err("unsupported scheduler call type".to_string()),
        };
        Ok(Self {
            framework_id: raw.framework_id,
            kind,
        })
    }
}
