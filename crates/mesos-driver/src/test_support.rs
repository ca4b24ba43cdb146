use std::collections::VecDeque;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};

use crate::recordio::encode_record;
use crate::transport::{CallResponse, OutboundCall, Transport};
use crate::MesosError;

/// Replays queued responses in order and records every submitted call.
/// Once the script runs dry each call is answered with `202 Accepted`.
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<CallResponse, MesosError>>>,
    calls: Mutex<Vec<OutboundCall>>,
}

impl ScriptedTransport {
    pub(crate) fn new(responses: Vec<Result<CallResponse, MesosError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) async fn push(&self, response: Result<CallResponse, MesosError>) {
        self.responses.lock().await.push_back(response);
    }

    pub(crate) async fn calls(&self) -> Vec<OutboundCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn submit(&self, call: OutboundCall) -> Result<CallResponse, MesosError> {
        self.calls.lock().await.push(call);
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(CallResponse::accepted()))
    }
}

pub(crate) fn recordio_body(events: &[Value]) -> Vec<u8> {
    events
        .iter()
        .flat_map(|event| encode_record(event.to_string().as_bytes()))
        .collect()
}

/// A finished subscribe response carrying `events`.
pub(crate) fn event_stream_response(stream_id: Option<&str>, events: &[Value]) -> CallResponse {
    CallResponse::from_chunks(200, stream_id.map(str::to_string), vec![recordio_body(events)])
}

/// A subscribe response whose body stays open until the returned sender is
/// dropped; each sent value becomes one record.
pub(crate) fn live_stream_response(
    stream_id: Option<&str>,
) -> (mpsc::UnboundedSender<Value>, CallResponse) {
    let (sender, receiver) = mpsc::unbounded_channel::<Value>();
    let body = stream::unfold(receiver, |mut receiver| async move {
        let event = receiver.recv().await?;
        Some((Ok(encode_record(event.to_string().as_bytes())), receiver))
    })
    .boxed();
    (
        sender,
        CallResponse::from_stream(200, stream_id.map(str::to_string), body),
    )
}
