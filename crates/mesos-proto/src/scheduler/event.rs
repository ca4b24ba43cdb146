use serde::{Deserialize, Serialize};

use crate::{AgentId, ExecutorId, FrameworkId, MasterInfo, Offer, OfferId, TaskStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscribed {
    pub framework_id: FrameworkId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_info: Option<MasterInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Offers {
    #[serde(default)]
    pub offers: Vec<Offer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rescind {
    pub offer_id: OfferId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub agent_id: AgentId,
    pub executor_id: ExecutorId,
    #[serde(with = "crate::encoding::base64_bytes")]
    pub data: Vec<u8>,
}

/// Agent or executor loss. `executor_id` is absent when the whole agent failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_id: Option<ExecutorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawEvent", try_from = "RawEvent")]
/// Scheduler event delivered on the subscription stream.
pub enum Event {
    Subscribed(Subscribed),
    Offers(Offers),
    Rescind(Rescind),
    Update(Update),
    Message(Message),
    Failure(Failure),
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
            Self::Offers(_) => "OFFERS",
            Self::Rescind(_) => "RESCIND",
            Self::Update(_) => "UPDATE",
            Self::Message(_) => "MESSAGE",
            Self::Failure(_) => "FAILURE",
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
    subscribed: Option<Subscribed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offers: Option<Offers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rescind: Option<Rescind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    update: Option<Update>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure: Option<Failure>,
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
            Event::Offers(payload) => raw.offers = Some(payload),
            Event::Rescind(payload) => raw.rescind = Some(payload),
            Event::Update(payload) => raw.update = Some(payload),
            Event::Message(payload) => raw.message = Some(payload),
            Event::Failure(payload) => raw.failure = Some(payload),
            Event::Error(payload) => raw.error = Some(payload),
            Event::Heartbeat | Event::Unknown { .. } => {}
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
            // OFFERS may legitimately carry only inverse offers, which this model does not keep.
            "OFFERS" => Self::Offers(raw.offers.unwrap_or_default()),
            "RESCIND" => Self::Rescind(require(raw.rescind, &event_type, "rescind")?),
            "UPDATE" => Self::Update(require(raw.update, &event_type, "update")?),
            "MESSAGE" => Self::Message(require(raw.message, &event_type, "message")?),
            "FAILURE" => Self::Failure(raw.failure.unwrap_or_default()),
            "ERROR" => Self::Error(require(raw.error, &event_type, "error")?),
            "HEARTBEAT" => Self::Heartbeat,
            "" => return Err("event is missing its `type` field".to_string()),
            _ => Self::Unknown { event_type },
        };
        Ok(event)
    }
}
