use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, warn};

use crate::decoder::StreamEvent;

/// Maps an event onto the handler method that consumes it. `None` marks an
/// event kind the handler has no method for.
pub trait EventRoute<H: ?Sized>: StreamEvent {
    fn route(self, handler: Arc<H>) -> Option<BoxFuture<'static, ()>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub dispatched: usize,
    pub unknown: usize,
    pub panicked: usize,
}

impl DispatchReport {
    fn record(&mut self, joined: Result<(), JoinError>) {
        if let Err(error) = joined {
            if error.is_panic() {
                self.panicked += 1;
                warn!(error = %error, "mesos event handler panicked");
            }
        }
    }
}

/// Reads `events` until the channel closes, running each handler invocation
/// on its own task with at most `concurrency` in flight.
///
/// The next event is taken only once the previous invocation's task is
/// running, so handlers start in stream order. The handshake completes before
/// the handler is first polled, so a handler that blocks before its first
/// `.await` does not hold up the stream. Completion order is unspecified.
pub async fn dispatch_events<E, H>(
    mut events: mpsc::Receiver<E>,
    handler: Arc<H>,
    concurrency: usize,
) -> DispatchReport
where
    E: EventRoute<H>,
    H: ?Sized + Send + Sync + 'static,
{
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handlers = JoinSet::new();
    let mut report = DispatchReport::default();

    while let Some(event) = events.recv().await {
        while let Some(joined) = handlers.try_join_next() {
            report.record(joined);
        }

        let kind = event.kind().to_string();
        let Some(invocation) = event.route(Arc::clone(&handler)) else {
            report.unknown += 1;
            warn!(event = %kind, "dropping mesos event of unknown kind");
            continue;
        };

        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let (started_tx, started_rx) = oneshot::channel::<()>();
        handlers.spawn(async move {
            let _permit = permit;
            let _ = started_tx.send(());
            invocation.await;
        });
        // Err means the task was cancelled before it ran; the join supervisor
        // records it.
        let _ = started_rx.await;
        report.dispatched += 1;
        debug!(event = %kind, "dispatched mesos event");
    }

    while let Some(joined) = handlers.join_next().await {
        report.record(joined);
    }
    debug!(
        dispatched = report.dispatched,
        unknown = report.unknown,
        panicked = report.panicked,
        "mesos event dispatcher drained"
    );
    report
}
