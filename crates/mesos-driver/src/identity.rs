use std::sync::Arc;

use arc_swap::ArcSwapOption;
use mesos_proto::FrameworkId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityUpdate {
    Assigned,
    Unchanged,
    Conflict { current: FrameworkId },
}

#[derive(Debug, Default)]
/// Scheduler session identity shared between the driver and its decoder task.
///
/// The framework id is write-once. The stream id is replaced on every
/// successful subscribe.
pub struct SessionIdentity {
    framework_id: ArcSwapOption<FrameworkId>,
    stream_id: ArcSwapOption<String>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the id used when re-registering after failover.
    pub fn with_framework_id(framework_id: Option<FrameworkId>) -> Self {
        let identity = Self::default();
        if let Some(framework_id) = framework_id.filter(|id| !id.is_empty()) {
            identity.framework_id.store(Some(Arc::new(framework_id)));
        }
        identity
    }

    pub fn framework_id(&self) -> Option<FrameworkId> {
        self.framework_id
            .load_full()
            .map(|framework_id| framework_id.as_ref().clone())
    }

    pub fn assign_framework_id(&self, framework_id: &FrameworkId) -> IdentityUpdate {
        let previous = self.framework_id.compare_and_swap(
            &None::<Arc<FrameworkId>>,
            Some(Arc::new(framework_id.clone())),
        );
        match &*previous {
            None => IdentityUpdate::Assigned,
            Some(current) if current.as_ref() == framework_id => IdentityUpdate::Unchanged,
            Some(current) => IdentityUpdate::Conflict {
                current: current.as_ref().clone(),
            },
        }
    }

    pub fn stream_id(&self) -> Option<String> {
        self.stream_id
            .load_full()
            .map(|stream_id| stream_id.as_ref().clone())
    }

    pub fn set_stream_id(&self, stream_id: Option<String>) {
        self.stream_id.store(stream_id.map(Arc::new));
    }
}
