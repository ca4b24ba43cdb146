use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::DriverTuning;
use crate::decoder::{decode_stream, shutdown_requested, DecodeSummary, EventObserver, StreamEvent};
use crate::retry::duration_millis;
use crate::transport::{OutboundCall, Transport};
use crate::MesosError;

#[derive(Debug)]
/// An established event stream.
pub struct Subscription<E> {
    pub events: mpsc::Receiver<E>,
    pub stream_id: Option<String>,
    pub attempts: usize,
    pub decoder: JoinHandle<DecodeSummary>,
}

/// Submits the subscribe call produced by `build_call` until the transport
/// accepts it, then spawns the event decoder and returns immediately.
///
/// `build_call` runs once per attempt so identity is read fresh each time.
#[tracing::instrument(
    name = "mesos_driver.subscribe",
    skip_all,
    fields(max_attempts = ?tuning.retry.max_attempts)
)]
pub async fn subscribe_with_retry<E, F>(
    transport: &dyn Transport,
    mut build_call: F,
    tuning: &DriverTuning,
    observer: Option<EventObserver<E>>,
    shutdown: watch::Receiver<bool>,
) -> Result<Subscription<E>, MesosError>
where
    E: StreamEvent,
    F: FnMut() -> OutboundCall,
{
    let mut cancel = shutdown.clone();
    let mut attempt = 0usize;

    loop {
        if *cancel.borrow() {
            return Err(MesosError::Cancelled);
        }
        attempt += 1;
        let call = build_call();
        let api_path = call.api_path();

        let submitted = tokio::select! {
            biased;
            _ = shutdown_requested(&mut cancel) => return Err(MesosError::Cancelled),
            submitted = transport.submit(call) => submitted,
        };

        let error = match submitted {
            Ok(response) => {
                info!(
                    attempt,
                    api = api_path,
                    stream_id = ?response.stream_id,
                    "mesos subscription established"
                );
                let (sender, events) = mpsc::channel(tuning.event_channel_capacity.max(1));
                let decoder = tokio::spawn(decode_stream(
                    response.body,
                    sender,
                    tuning.max_record_bytes,
                    observer,
                    shutdown,
                ));
                return Ok(Subscription {
                    events,
                    stream_id: response.stream_id,
                    attempts: attempt,
                    decoder,
                });
            }
            Err(error) if !error.is_retryable() => return Err(error),
            Err(error) => error,
        };

        if !tuning.retry.allows_attempt(attempt + 1) {
            warn!(attempt, error = %error, "mesos subscribe attempts exhausted");
            return Err(MesosError::SubscribeExhausted {
                attempts: attempt,
                last_error: error.to_string(),
            });
        }

        let delay = tuning.retry.delay_after(attempt);
        warn!(
            attempt,
            delay_ms = duration_millis(delay),
            error = %error,
            "mesos subscribe failed; retrying"
        );
        tokio::select! {
            biased;
            _ = shutdown_requested(&mut cancel) => return Err(MesosError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
