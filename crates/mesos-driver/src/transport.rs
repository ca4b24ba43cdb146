use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::{StreamExt, TryStreamExt};
use mesos_proto::{executor, scheduler};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::debug;

use crate::MesosError;

pub const SCHEDULER_API_PATH: &str = "/api/v1/scheduler";
pub const EXECUTOR_API_PATH: &str = "/api/v1/executor";
pub const STREAM_ID_HEADER: &str = "Mesos-Stream-Id";

pub type ByteStream = BoxStream<'static, Result<Vec<u8>, MesosError>>;

#[derive(Debug, Clone, PartialEq)]
/// A call envelope plus the per-session metadata the transport must attach.
pub enum OutboundCall {
    Scheduler {
        call: scheduler::Call,
        stream_id: Option<String>,
    },
    Executor {
        call: executor::Call,
    },
}

impl OutboundCall {
    pub fn api_path(&self) -> &'static str {
        match self {
            Self::Scheduler { .. } => SCHEDULER_API_PATH,
            Self::Executor { .. } => EXECUTOR_API_PATH,
        }
    }

    pub fn call_type(&self) -> &'static str {
        match self {
            Self::Scheduler { call, .. } => call.call_type().as_str(),
            Self::Executor { call } => call.call_type().as_str(),
        }
    }

    pub fn is_subscribe(&self) -> bool {
        match self {
            Self::Scheduler { call, .. } => call.is_subscribe(),
            Self::Executor { call } => call.is_subscribe(),
        }
    }

    pub fn stream_id(&self) -> Option<&str> {
        match self {
            Self::Scheduler { stream_id, .. } => stream_id.as_deref(),
            Self::Executor { .. } => None,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, MesosError> {
        let body = match self {
            Self::Scheduler { call, .. } => serde_json::to_vec(call)?,
            Self::Executor { call } => serde_json::to_vec(call)?,
        };
        Ok(body)
    }
}

/// Response to a submitted call. Subscribe responses keep `body` open for the
/// lifetime of the session.
pub struct CallResponse {
    pub status: u16,
    pub stream_id: Option<String>,
    pub body: ByteStream,
}

impl fmt::Debug for CallResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallResponse")
            .field("status", &self.status)
            .field("stream_id", &self.stream_id)
            .finish_non_exhaustive()
    }
}

impl CallResponse {
    pub fn accepted() -> Self {
        Self::from_chunks(202, None, Vec::new())
    }

    pub fn from_chunks(status: u16, stream_id: Option<String>, chunks: Vec<Vec<u8>>) -> Self {
        Self {
            status,
            stream_id,
            body: stream::iter(chunks.into_iter().map(Ok)).boxed(),
        }
    }

    pub fn from_stream(status: u16, stream_id: Option<String>, body: ByteStream) -> Self {
        Self {
            status,
            stream_id,
            body,
        }
    }

    /// Collects the full body. Only meaningful for non-subscribe calls.
    pub async fn into_bytes(self) -> Result<Vec<u8>, MesosError> {
        self.body
            .try_fold(Vec::new(), |mut collected, chunk| async move {
                collected.extend_from_slice(&chunk);
                Ok(collected)
            })
            .await
    }
}

#[async_trait]
/// Port between the driver and the master/agent.
pub trait Transport: Send + Sync {
    async fn submit(&self, call: OutboundCall) -> Result<CallResponse, MesosError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTransportConfig {
    pub endpoint: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone)]
/// `reqwest` transport posting JSON calls to the v1 operator endpoints.
pub struct HttpTransport {
    client: reqwest::Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, MesosError> {
        if config.endpoint.trim().is_empty() {
            return Err(MesosError::Config("transport endpoint is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms.max(1)))
            .build()?;
        Ok(Self { client, config })
    }

    fn url_for(&self, call: &OutboundCall) -> String {
        format!(
            "{}{}",
            self.config.endpoint.trim().trim_end_matches('/'),
            call.api_path()
        )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn submit(&self, call: OutboundCall) -> Result<CallResponse, MesosError> {
        let url = self.url_for(&call);
        let mut request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(call.to_json()?);
        if let Some(stream_id) = call.stream_id() {
            request = request.header(STREAM_ID_HEADER, stream_id);
        }
        if !call.is_subscribe() {
            request = request.timeout(Duration::from_millis(
                self.config.request_timeout_ms.max(1),
            ));
        }

        debug!(call = call.call_type(), url = %url, "submitting mesos call");
        let response = request.send().await?;
        let status = response.status();
        let stream_id = response
            .headers()
            .get(STREAM_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        if !status.is_success() {
            let body = response.text().await?;
            return Err(MesosError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        let scheduler_subscribe =
            call.is_subscribe() && matches!(call, OutboundCall::Scheduler { .. });
        if scheduler_subscribe && stream_id.is_none() {
            return Err(MesosError::InvalidResponse(format!(
                "subscribe response is missing the {STREAM_ID_HEADER} header"
            )));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(MesosError::from))
            .boxed();
        Ok(CallResponse::from_stream(status.as_u16(), stream_id, body))
    }
}
