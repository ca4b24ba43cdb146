use std::time::Duration;

use mesos_proto::{ExecutorId, FrameworkId};

use crate::recordio::DEFAULT_MAX_RECORD_BYTES;
use crate::retry::RetryPolicy;
use crate::transport::HttpTransportConfig;
use crate::MesosError;

pub const DEFAULT_MASTER_ENDPOINT: &str = "http://127.0.0.1:5050";
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_HANDLER_CONCURRENCY: usize = 64;

pub const MASTER_ENV: &str = "MESOS_MASTER";
pub const REQUEST_TIMEOUT_ENV: &str = "MESOS_REQUEST_TIMEOUT_MS";
pub const SUBSCRIBE_RETRY_ENV: &str = "MESOS_SUBSCRIBE_RETRY_MS";
pub const AGENT_ENDPOINT_ENV: &str = "MESOS_AGENT_ENDPOINT";
pub const FRAMEWORK_ID_ENV: &str = "MESOS_FRAMEWORK_ID";
pub const EXECUTOR_ID_ENV: &str = "MESOS_EXECUTOR_ID";

fn non_empty_env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_millis(name: &str, raw: Option<String>) -> Result<Option<u64>, MesosError> {
    raw.map(|value| {
        value
            .parse::<u64>()
            .map_err(|error| {
                MesosError::Config(format!("{name}={value:?} is not a number: {error}"))
            })
    })
    .transpose()
}

/// Accepts `host:port` as Mesos hands it out and adds the missing scheme.
pub fn normalize_endpoint(raw: &str) -> Result<String, MesosError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(MesosError::Config("endpoint is empty".to_string()));
    }
    if trimmed.starts_with("zk://") {
        return Err(MesosError::Config(format!(
            "ZooKeeper master detection is not supported: {trimmed}"
        )));
    }
    if trimmed.contains("://") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("http://{trimmed}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Knobs shared by the scheduler and executor drivers.
pub struct DriverTuning {
    pub event_channel_capacity: usize,
    pub handler_concurrency: usize,
    pub max_record_bytes: usize,
    pub retry: RetryPolicy,
}

impl Default for DriverTuning {
    fn default() -> Self {
        Self {
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            handler_concurrency: DEFAULT_HANDLER_CONCURRENCY,
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub master: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub tuning: DriverTuning,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            master: DEFAULT_MASTER_ENDPOINT.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            tuning: DriverTuning::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn new(master: impl Into<String>) -> Self {
        Self {
            master: master.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self, MesosError> {
        Self::from_lookup(non_empty_env_var)
    }

    /// Same as [`SchedulerConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MesosError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(master) = lookup(MASTER_ENV) {
            config.master = normalize_endpoint(&master)?;
        }
        if let Some(timeout_ms) = parse_millis(REQUEST_TIMEOUT_ENV, lookup(REQUEST_TIMEOUT_ENV))? {
            config.request_timeout_ms = timeout_ms.max(1);
        }
        if let Some(retry_ms) = parse_millis(SUBSCRIBE_RETRY_ENV, lookup(SUBSCRIBE_RETRY_ENV))? {
            config.tuning.retry = RetryPolicy::fixed(Duration::from_millis(retry_ms));
        }
        Ok(config)
    }

    pub fn http(&self) -> Result<HttpTransportConfig, MesosError> {
        Ok(HttpTransportConfig {
            endpoint: normalize_endpoint(&self.master)?,
            connect_timeout_ms: self.connect_timeout_ms,
            request_timeout_ms: self.request_timeout_ms,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Executor settings; the agent exports the identity variables when it
/// launches the executor process.
pub struct ExecutorConfig {
    pub agent_endpoint: String,
    pub framework_id: FrameworkId,
    pub executor_id: ExecutorId,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub tuning: DriverTuning,
}

impl ExecutorConfig {
    pub fn new(
        agent_endpoint: impl Into<String>,
        framework_id: FrameworkId,
        executor_id: ExecutorId,
    ) -> Self {
        Self {
            agent_endpoint: agent_endpoint.into(),
            framework_id,
            executor_id,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            tuning: DriverTuning::default(),
        }
    }

    pub fn from_env() -> Result<Self, MesosError> {
        Self::from_lookup(non_empty_env_var)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, MesosError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &'static str| {
            lookup(name).ok_or_else(|| MesosError::Config(format!("{name} is not set")))
        };
        let agent_endpoint = normalize_endpoint(&require(AGENT_ENDPOINT_ENV)?)?;
        let framework_id = FrameworkId::new(require(FRAMEWORK_ID_ENV)?);
        let executor_id = ExecutorId::new(require(EXECUTOR_ID_ENV)?);

        let mut config = Self::new(agent_endpoint, framework_id, executor_id);
        if let Some(timeout_ms) = parse_millis(REQUEST_TIMEOUT_ENV, lookup(REQUEST_TIMEOUT_ENV))? {
            config.request_timeout_ms = timeout_ms.max(1);
        }
        if let Some(retry_ms) = parse_millis(SUBSCRIBE_RETRY_ENV, lookup(SUBSCRIBE_RETRY_ENV))? {
            config.tuning.retry = RetryPolicy::fixed(Duration::from_millis(retry_ms));
        }
        Ok(config)
    }

    pub fn http(&self) -> Result<HttpTransportConfig, MesosError> {
        Ok(HttpTransportConfig {
            endpoint: normalize_endpoint(&self.agent_endpoint)?,
            connect_timeout_ms: self.connect_timeout_ms,
            request_timeout_ms: self.request_timeout_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{
        normalize_endpoint, ExecutorConfig, SchedulerConfig, DEFAULT_MASTER_ENDPOINT,
        DEFAULT_REQUEST_TIMEOUT_MS,
    };
    use crate::retry::RetryPolicy;
    use crate::MesosError;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn unit_scheduler_config_defaults_without_environment() {
        let config = SchedulerConfig::from_lookup(lookup_from(&[])).expect("defaults");
        assert_eq!(config.master, DEFAULT_MASTER_ENDPOINT);
        assert_eq!(config.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
        assert_eq!(config.tuning.retry, RetryPolicy::default());
    }

    #[test]
    fn functional_scheduler_config_reads_overrides() {
        let config = SchedulerConfig::from_lookup(lookup_from(&[
            ("MESOS_MASTER", "10.0.0.5:5050"),
            ("MESOS_REQUEST_TIMEOUT_MS", "2500"),
            ("MESOS_SUBSCRIBE_RETRY_MS", "50"),
        ]))
        .expect("overrides");
        assert_eq!(config.master, "http://10.0.0.5:5050");
        assert_eq!(config.request_timeout_ms, 2_500);
        assert_eq!(
            config.tuning.retry,
            RetryPolicy::fixed(Duration::from_millis(50))
        );
    }

    #[test]
    fn regression_invalid_timeout_is_a_config_error() {
        let error = SchedulerConfig::from_lookup(lookup_from(&[(
            "MESOS_REQUEST_TIMEOUT_MS",
            "soon",
        )]))
        .expect_err("non-numeric timeout");
        assert!(matches!(
            error,
            MesosError::Config(message) if message.contains("MESOS_REQUEST_TIMEOUT_MS")
        ));
    }

    #[test]
    fn functional_executor_config_requires_agent_identity() {
        let error = ExecutorConfig::from_lookup(lookup_from(&[
            ("MESOS_AGENT_ENDPOINT", "127.0.0.1:5051"),
            ("MESOS_FRAMEWORK_ID", "fw-1"),
        ]))
        .expect_err("missing executor id");
        assert!(error.to_string().contains("MESOS_EXECUTOR_ID is not set"));

        let config = ExecutorConfig::from_lookup(lookup_from(&[
            ("MESOS_AGENT_ENDPOINT", "127.0.0.1:5051"),
            ("MESOS_FRAMEWORK_ID", "fw-1"),
            ("MESOS_EXECUTOR_ID", "ex-1"),
        ]))
        .expect("complete executor environment");
        assert_eq!(config.agent_endpoint, "http://127.0.0.1:5051");
        assert_eq!(config.framework_id.as_str(), "fw-1");
        assert_eq!(config.executor_id.as_str(), "ex-1");
    }

    #[test]
    fn unit_normalize_endpoint_rejects_zookeeper_urls() {
        assert_eq!(
            normalize_endpoint("https://master.local/").expect("https"),
            "https://master.local"
        );
        assert!(normalize_endpoint("zk://zk1:2181/mesos").is_err());
        assert!(normalize_endpoint("   ").is_err());
    }
}
