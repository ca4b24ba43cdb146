use std::sync::Arc;

use futures_util::StreamExt;
use mesos_proto::{executor, scheduler};
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::recordio::RecordIoDecoder;
use crate::transport::ByteStream;

/// Event envelope that can travel over a subscription stream.
pub trait StreamEvent: DeserializeOwned + Send + 'static {
    /// Builds the ERROR event used to surface local decode failures.
    fn decode_error(message: String) -> Self;

    fn kind(&self) -> &str;
}

impl StreamEvent for scheduler::Event {
    fn decode_error(message: String) -> Self {
        Self::error(message)
    }

    fn kind(&self) -> &str {
        scheduler::Event::kind(self)
    }
}

impl StreamEvent for executor::Event {
    fn decode_error(message: String) -> Self {
        Self::error(message)
    }

    fn kind(&self) -> &str {
        executor::Event::kind(self)
    }
}

/// Sees every decoded event before it is published to the channel.
pub type EventObserver<E> = Arc<dyn Fn(&E) + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    pub events: usize,
    /// Records that framed correctly but did not parse as an event.
    pub decode_errors: usize,
    pub stream_failed: bool,
    pub cancelled: bool,
}

/// Resolves once the shutdown flag is raised. A dropped sender never fires.
pub(crate) async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

struct Publisher<E> {
    sender: mpsc::Sender<E>,
    observer: Option<EventObserver<E>>,
    summary: DecodeSummary,
}

impl<E: StreamEvent> Publisher<E> {
    /// Returns false once nobody is listening or shutdown was requested.
    async fn publish(&mut self, event: E, shutdown: &mut watch::Receiver<bool>) -> bool {
        if let Some(observer) = &self.observer {
            observer(&event);
        }
        tokio::select! {
            biased;
            _ = shutdown_requested(shutdown) => {
                self.summary.cancelled = true;
                false
            }
            sent = self.sender.send(event) => {
                if sent.is_err() {
                    debug!("event receiver dropped; stopping decoder");
                    return false;
                }
                self.summary.events += 1;
                true
            }
        }
    }

    async fn fail(&mut self, message: String, shutdown: &mut watch::Receiver<bool>) -> bool {
        warn!(error = %message, "mesos event stream failed");
        self.publish(E::decode_error(message), shutdown).await
    }
}

/// Decodes RecordIO framed JSON events from `body` into `sender` until the
/// stream ends, fails or shutdown is requested. Dropping `sender` on return
/// closes the channel.
pub async fn decode_stream<E: StreamEvent>(
    mut body: ByteStream,
    sender: mpsc::Sender<E>,
    max_record_bytes: usize,
    observer: Option<EventObserver<E>>,
    mut shutdown: watch::Receiver<bool>,
) -> DecodeSummary {
    let mut framing = RecordIoDecoder::new(max_record_bytes);
    let mut publisher = Publisher {
        sender,
        observer,
        summary: DecodeSummary::default(),
    };

    loop {
        let chunk = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => {
                publisher.summary.cancelled = true;
                break;
            }
            chunk = body.next() => chunk,
        };

        let bytes = match chunk {
            Some(Ok(bytes)) => bytes,
            Some(Err(error)) => {
                publisher.summary.stream_failed = true;
                publisher
                    .fail(format!("event stream read failed: {error}"), &mut shutdown)
                    .await;
                break;
            }
            None => {
                if let Err(error) = framing.finish() {
                    publisher.summary.stream_failed = true;
                    publisher
                        .fail(format!("event stream closed early: {error}"), &mut shutdown)
                        .await;
                }
                debug!("mesos event stream closed");
                break;
            }
        };

        framing.push(&bytes);
        loop {
            let record = match framing.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(error) => {
                    publisher.summary.stream_failed = true;
                    publisher
                        .fail(format!("event stream framing lost: {error}"), &mut shutdown)
                        .await;
                    return publisher.summary;
                }
            };

            let event = match serde_json::from_slice::<E>(&record) {
                Ok(event) => event,
                Err(error) => {
                    warn!(
                        error = %error,
                        bytes = record.len(),
                        "skipping undecodable event record"
                    );
                    publisher.summary.decode_errors += 1;
                    E::decode_error(format!("failed to decode event: {error}"))
                }
            };
            if !publisher.publish(event, &mut shutdown).await {
                return publisher.summary;
            }
        }
    }

    publisher.summary
}

#[cfg(test)]
mod tests {
    use futures_util::stream::{self, StreamExt};
    use mesos_proto::scheduler::Event;
    use std::sync::{Arc, Mutex};
    use tokio::sync::{mpsc, watch};

    use super::{decode_stream, DecodeSummary, EventObserver};
    use crate::recordio::{encode_record, DEFAULT_MAX_RECORD_BYTES};
    use crate::transport::ByteStream;
    use crate::MesosError;

    fn body_from(chunks: Vec<Result<Vec<u8>, MesosError>>) -> ByteStream {
        stream::iter(chunks).boxed()
    }

    async fn collect(body: ByteStream) -> (Vec<Event>, DecodeSummary) {
        let (sender, mut receiver) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let summary = decode_stream::<Event>(
            body,
            sender,
            DEFAULT_MAX_RECORD_BYTES,
            None,
            shutdown_rx,
        )
        .await;
        let mut events = Vec::new();
        while let Some(event) = receiver.recv().await {
            events.push(event);
        }
        (events, summary)
    }

    #[tokio::test]
    async fn functional_malformed_record_becomes_error_event_in_place() {
        let mut stream = encode_record(br#"{"type":"HEARTBEAT"}"#);
        stream.extend(encode_record(b"{not json"));
        stream.extend(encode_record(
            br#"{"type":"RESCIND","rescind":{"offer_id":{"value":"o-1"}}}"#,
        ));

        let (events, summary) = collect(body_from(vec![Ok(stream)])).await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], Event::Heartbeat);
        assert!(matches!(
            &events[1],
            Event::Error(error) if error.message.contains("failed to decode")
        ));
        assert_eq!(events[2].kind(), "RESCIND");
        assert_eq!(summary.decode_errors, 1);
        assert!(!summary.stream_failed);
    }

    #[tokio::test]
    async fn unit_read_error_ends_stream_with_error_event() {
        let (events, summary) = collect(body_from(vec![
            Ok(encode_record(br#"{"type":"HEARTBEAT"}"#)),
            Err(MesosError::InvalidResponse("connection reset".to_string())),
            Ok(encode_record(br#"{"type":"HEARTBEAT"}"#)),
        ]))
        .await;
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[1],
            Event::Error(error) if error.message.contains("connection reset")
        ));
        assert!(summary.stream_failed);
        assert_eq!(summary.decode_errors, 0);
    }

    #[tokio::test]
    async fn regression_corrupt_header_stops_decoding() {
        let (events, summary) =
            collect(body_from(vec![Ok(b"xx\n{}".to_vec()), Ok(encode_record(b"{}"))])).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            Event::Error(error) if error.message.contains("framing lost")
        ));
        assert!(summary.stream_failed);
        assert_eq!(summary.decode_errors, 0);
    }

    #[tokio::test]
    async fn unit_truncated_tail_is_reported() {
        let mut stream = encode_record(br#"{"type":"HEARTBEAT"}"#);
        stream.extend_from_slice(b"40\n{\"type\"");
        let (events, _) = collect(body_from(vec![Ok(stream)])).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[1],
            Event::Error(error) if error.message.contains("closed early")
        ));
    }

    #[tokio::test]
    async fn functional_observer_runs_before_publication() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observer: EventObserver<Event> = {
            let seen = Arc::clone(&seen);
            Arc::new(move |event: &Event| {
                seen.lock().expect("seen").push(event.kind().to_string());
            })
        };
        let (sender, mut receiver) = mpsc::channel(1);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let body = body_from(vec![Ok(encode_record(br#"{"type":"HEARTBEAT"}"#))]);
        let task = tokio::spawn(decode_stream(
            body,
            sender,
            DEFAULT_MAX_RECORD_BYTES,
            Some(observer),
            shutdown_rx,
        ));

        let event = receiver.recv().await.expect("event");
        assert_eq!(event, Event::Heartbeat);
        assert_eq!(seen.lock().expect("seen").as_slice(), ["HEARTBEAT".to_string()]);
        assert_eq!(task.await.expect("decoder").events, 1);
    }

    #[tokio::test]
    async fn functional_shutdown_stops_a_silent_stream() {
        let (sender, mut receiver) = mpsc::channel::<Event>(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let body: ByteStream = stream::pending().boxed();
        let task = tokio::spawn(decode_stream(
            body,
            sender,
            DEFAULT_MAX_RECORD_BYTES,
            None,
            shutdown_rx,
        ));

        shutdown_tx.send(true).expect("shutdown");
        let summary = task.await.expect("decoder");
        assert!(summary.cancelled);
        assert!(receiver.recv().await.is_none());
    }
}
