use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn stderr_subscriber() -> impl Subscriber + Send + Sync + 'static {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish()
}

/// Installs a compact stderr subscriber filtered by `RUST_LOG`.
///
/// Meant for framework and executor binaries; the agent captures executor
/// stderr into the task sandbox. A second call is a no-op.
pub fn init_tracing() {
    let _ = stderr_subscriber().try_init();
}
