//! Client driver for the Mesos v1 scheduler and executor HTTP APIs.
//!
//! A driver subscribes over a [`Transport`], decodes the RecordIO event
//! stream and dispatches each event to a [`SchedulerHandler`] or
//! [`ExecutorHandler`], while its call methods send framework or executor
//! calls stamped with the current identity.
pub mod builder;
pub mod config;
pub mod decoder;
pub mod dispatcher;
mod error;
pub mod executor;
pub mod handler;
pub mod identity;
pub mod logging;
pub mod recordio;
pub mod retry;
pub mod scheduler;
pub mod subscription;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use builder::{ExecutorCalls, SchedulerCalls};
pub use config::{DriverTuning, ExecutorConfig, SchedulerConfig};
pub use decoder::{decode_stream, DecodeSummary, EventObserver, StreamEvent};
pub use dispatcher::{dispatch_events, DispatchReport, EventRoute};
pub use error::MesosError;
pub use executor::ExecutorDriver;
pub use handler::{ExecutorHandler, SchedulerHandler};
pub use identity::{IdentityUpdate, SessionIdentity};
pub use recordio::{encode_record, RecordIoDecoder, RecordIoError};
pub use retry::RetryPolicy;
pub use scheduler::SchedulerDriver;
pub use subscription::{subscribe_with_retry, Subscription};
pub use transport::{
    ByteStream, CallResponse, HttpTransport, HttpTransportConfig, OutboundCall, Transport,
    STREAM_ID_HEADER,
};

pub use mesos_proto;
