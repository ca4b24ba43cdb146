use serde::{Deserialize, Serialize};

use crate::{AgentInfo, ExecutorInfo, FrameworkInfo, TaskGroupInfo, TaskId, TaskInfo};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscribed {
    pub executor_info: ExecutorInfo,
    pub framework_info: FrameworkInfo,
    pub agent_info: AgentInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledged {
    pub task_id: TaskId,
    #[serde(with = "crate::encoding::base64_bytes")]
    pub uuid: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(with = "crate::encoding::base64_bytes")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kill {
    pub task_id: TaskId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Launch {
    pub task: TaskInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchGroup {
    pub task_group: TaskGroupInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawEvent", try_from = "RawEvent")]
/// Executor event delivered by the agent on the subscription stream.
pub enum Event {
    Subscribed(Box<Subscribed>),
    Acknowledged(Acknowledged),
    Message(Message),
    Kill(Kill),
    Launch(Box<Launch>),
    LaunchGroup(LaunchGroup),
    Shutdown,
    Error(Error),
    Heartbeat,
    Unknown { event_type: String },
}

impl Event {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(Error {
            message: message.into(),
        })
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Subscribed(_) => "SUBSCRIBED",
            Self::Acknowledged(_) => "ACKNOWLEDGED",
            Self::Message(_) => "MESSAGE",
            Self::Kill(_) => "KILL",
            Self::Launch(_) => "LAUNCH",
            Self::LaunchGroup(_) => "LAUNCH_GROUP",
            Self::Shutdown => "SHUTDOWN",
            Self::Error(_) => "ERROR",
            Self::Heartbeat => "HEARTBEAT",
            Self::Unknown { event_type } => event_type.as_str(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawEvent {
    #[serde(rename = "type", default)]
    event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subscribed: Option<Box<Subscribed>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    acknowledged: Option<Acknowledged>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kill: Option<Kill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    launch: Option<Box<Launch>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    launch_group: Option<LaunchGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<Error>,
}

impl From<Event> for RawEvent {
    fn from(event: Event) -> Self {
        let mut raw = RawEvent {
            event_type: event.kind().to_string(),
            ..RawEvent::default()
        };
        match event {
            Event::Subscribed(payload) => raw.subscribed = Some(payload),
            Event::Acknowledged(payload) => raw.acknowledged = Some(payload),
            Event::Message(payload) => raw.message = Some(payload),
            Event::Kill(payload) => raw.kill = Some(payload),
            Event::Launch(payload) => raw.launch = Some(payload),
            Event::LaunchGroup(payload) => raw.launch_group = Some(payload),
            Event::Error(payload) => raw.error = Some(payload),
            Event::Shutdown | Event::Heartbeat | Event::Unknown { .. } => {}
        }
        raw
    }
}

fn require<T>(payload: Option<T>, event_type: &str, field: &str) -> Result<T, String> {
    payload.ok_or_else(|| format!("{event_type} event is missing its `{field}` payload"))
}

impl TryFrom<RawEvent> for Event {
    type Error = String;

    fn try_from(raw: RawEvent) -> Result<Self, String> {
        let event_type = raw.event_type.trim().to_string();
        let event = match event_type.as_str() {
            "SUBSCRIBED" => Self::Subscribed(require(raw.subscribed, &event_type, "subscribed")?),
            "ACKNOWLEDGED" => {
                Self::Acknowledged(require(raw.acknowledged, &event_type, "acknowledged")?)
            }
            "MESSAGE" => Self::Message(require(raw.message, &event_type, "message")?),
            "KILL" => Self::Kill(require(raw.kill, &event_type, "kill")?),
            "LAUNCH" => Self::Launch(require(raw.launch, &event_type, "launch")?),
            "LAUNCH_GROUP" => {
                Self::LaunchGroup(require(raw.launch_group, &event_type, "launch_group")?)
            }
            "SHUTDOWN" => Self::Shutdown,
            "ERROR" => Self::Error(require(raw.error, &event_type, "error")?),
            "HEARTBEAT" => Self::Heartbeat,
            "" => return Err("event is missing its `type` field".to_string()),
            _ => Self::Unknown { event_type },
        };
        Ok(event)
    }
}
