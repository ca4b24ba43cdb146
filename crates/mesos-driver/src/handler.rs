//! Callback surfaces invoked by the dispatcher, one method per event kind.
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use mesos_proto::executor::event as executor_event;
use mesos_proto::scheduler::event as scheduler_event;
use mesos_proto::{executor, scheduler};

use crate::dispatcher::EventRoute;

#[async_trait]
/// Framework callbacks. Every method defaults to a no-op.
pub trait SchedulerHandler: Send + Sync {
    async fn on_subscribed(&self, _subscribed: scheduler_event::Subscribed) {}

    async fn on_offers(&self, _offers: scheduler_event::Offers) {}

    async fn on_rescind(&self, _rescind: scheduler_event::Rescind) {}

    async fn on_update(&self, _update: scheduler_event::Update) {}

    async fn on_message(&self, _message: scheduler_event::Message) {}

    async fn on_failure(&self, _failure: scheduler_event::Failure) {}

    /// Also receives locally generated stream and decode errors.
    async fn on_error(&self, _error: scheduler_event::Error) {}

    async fn on_heartbeat(&self) {}
}

#[async_trait]
/// Executor callbacks. Every method defaults to a no-op.
pub trait ExecutorHandler: Send + Sync {
    async fn on_subscribed(&self, _subscribed: executor_event::Subscribed) {}

    async fn on_acknowledged(&self, _acknowledged: executor_event::Acknowledged) {}

    async fn on_message(&self, _message: executor_event::Message) {}

    async fn on_kill(&self, _kill: executor_event::Kill) {}

    async fn on_launch(&self, _launch: executor_event::Launch) {}

    async fn on_launch_group(&self, _launch_group: executor_event::LaunchGroup) {}

    async fn on_shutdown(&self) {}

    async fn on_error(&self, _error: executor_event::Error) {}

    async fn on_heartbeat(&self) {}
}

impl EventRoute<dyn SchedulerHandler> for scheduler::Event {
    fn route(self, handler: Arc<dyn SchedulerHandler>) -> Option<BoxFuture<'static, ()>> {
        let invocation: BoxFuture<'static, ()> = match self {
            Self::Subscribed(subscribed) => {
                Box::pin(async move { handler.on_subscribed(subscribed).await })
            }
            Self::Offers(offers) => Box::pin(async move { handler.on_offers(offers).await }),
            Self::Rescind(rescind) => Box::pin(async move { handler.on_rescind(rescind).await }),
            Self::Update(update) => Box::pin(async move { handler.on_update(update).await }),
            Self::Message(message) => Box::pin(async move { handler.on_message(message).await }),
            Self::Failure(failure) => Box::pin(async move { handler.on_failure(failure).await }),
            Self::Error(error) => Box::pin(async move { handler.on_error(error).await }),
            Self::Heartbeat => Box::pin(async move { handler.on_heartbeat().await }),
            Self::Unknown { .. } => return None,
        };
        Some(invocation)
    }
}

impl EventRoute<dyn ExecutorHandler> for executor::Event {
    fn route(self, handler: Arc<dyn ExecutorHandler>) -> Option<BoxFuture<'static, ()>> {
        let invocation: BoxFuture<'static, ()> = match self {
            Self::Subscribed(subscribed) => {
                Box::pin(async move { handler.on_subscribed(*subscribed).await })
            }
            Self::Acknowledged(acknowledged) => {
                Box::pin(async move { handler.on_acknowledged(acknowledged).await })
            }
            Self::Message(message) => Box::pin(async move { handler.on_message(message).await }),
            Self::Kill(kill) => Box::pin(async move { handler.on_kill(kill).await }),
            Self::Launch(launch) => Box::pin(async move { handler.on_launch(*launch).await }),
            Self::LaunchGroup(launch_group) => {
                Box::pin(async move { handler.on_launch_group(launch_group).await })
            }
            Self::Shutdown => Box::pin(async move { handler.on_shutdown().await }),
            Self::Error(error) => Box::pin(async move { handler.on_error(error).await }),
            Self::Heartbeat => Box::pin(async move { handler.on_heartbeat().await }),
            Self::Unknown { .. } => return None,
        };
        Some(invocation)
    }
}
