//! Mesos v1 HTTP API data model.
//!
//! Field names and enum spellings follow the JSON mapping of the Mesos v1
//! protobuf schema so that envelopes produced here are accepted verbatim by a
//! master or agent.
pub mod encoding;
pub mod executor;
mod mesos;
pub mod scheduler;

pub use mesos::{
    AgentId, AgentInfo, Attribute, CommandInfo, CommandUri, Environment, EnvironmentVariable,
    ExecutorId, ExecutorInfo, ExecutorKind, Filters, FrameworkCapability, FrameworkCapabilityKind,
    FrameworkId, FrameworkInfo, Launch, LaunchGroup, MasterInfo, Offer, OfferId, OfferOperation,
    OperationKind, Range, Ranges, Request, Reservation, Resource, ResourceList, Scalar,
    TaskGroupInfo, TaskId, TaskInfo, TaskState, TaskStatus, TaskStatusSource, Text, ValueSet,
    ValueType, VolumeList,
};
