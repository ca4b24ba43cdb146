use serde::{Deserialize, Serialize};

use crate::{ExecutorId, FrameworkId, TaskInfo, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallType {
    Subscribe,
    Update,
    Message,
    #[serde(other)]
    Unknown,
}

impl CallType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "SUBSCRIBE",
            Self::Update => "UPDATE",
            Self::Message => "MESSAGE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub status: TaskStatus,
}

/// Work the agent may not have seen yet; resent on every (re)subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscribe {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unacknowledged_tasks: Vec<TaskInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unacknowledged_updates: Vec<Update>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(with = "crate::encoding::base64_bytes")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallKind {
    Subscribe(Subscribe),
    Update(Update),
    Message(Message),
}

impl CallKind {
    pub fn call_type(&self) -> CallType {
        match self {
            Self::Subscribe(_) => CallType::Subscribe,
            Self::Update(_) => CallType::Update,
            Self::Message(_) => CallType::Message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawCall", try_from = "RawCall")]
/// Executor call envelope sent to `/api/v1/executor`. Both ids are mandatory.
pub struct Call {
    pub framework_id: FrameworkId,
    pub executor_id: ExecutorId,
    pub kind: CallKind,
}

impl Call {
    pub fn new(framework_id: FrameworkId, executor_id: ExecutorId, kind: CallKind) -> Self {
        Self {
            framework_id,
            executor_id,
            kind,
        }
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
    executor_id: ExecutorId,
    framework_id: FrameworkId,
    #[serde(rename = "type")]
    call_type: CallType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subscribe: Option<Subscribe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    update: Option<Update>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<Message>,
}

impl From<Call> for RawCall {
    fn from(call: Call) -> Self {
        let call_type = call.kind.call_type();
        let (subscribe, update, message) = match call.kind {
            CallKind::Subscribe(payload) => (Some(payload), None, None),
            CallKind::Update(payload) => (None, Some(payload), None),
            CallKind::Message(payload) => (None, None, Some(payload)),
        };
        Self {
            executor_id: call.executor_id,
            framework_id: call.framework_id,
            call_type,
            subscribe,
            update,
            message,
        }
    }
}

impl TryFrom<RawCall> for Call {
    type Error = String;

    fn try_from(raw: RawCall) -> Result<Self, Self::Error> {
        let kind = match raw.call_type {
            CallType::Subscribe => CallKind::Subscribe(raw.subscribe.unwrap_or_default()),
            CallType::Update => CallKind::Update(
                raw.update
                    .ok_or_else(|| "UPDATE call is missing its `update` payload".to_string())?,
            ),
            CallType::Message => CallKind::Message(
                raw.message
                    .ok_or_else(|| "MESSAGE call is missing its `message` payload".to_string())?,
            ),
            CallType::Unknown => return Err("unsupported executor call type".to_string()),
        };
        Ok(Self {
            framework_id: raw.framework_id,
            executor_id: raw.executor_id,
            kind,
        })
    }
}
