use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use eyre::Result;
use tokio::task::JoinHandle;
use tracing::instrument::Instrumented;

use crate::{metrics::CoreMetrics, settings::Settings};

/// Settings of an agent, loadable from config files and environment.
pub trait LoadableFromSettings: AsRef<Settings> + Sized {
    /// Read the agent's settings from its config sources.
    fn load() -> Result<Self>;
}

/// A long-running gatehouse service.
#[async_trait]
pub trait BaseAgent: Send + Sync + Debug {
    /// The agent's name.
    const AGENT_NAME: &'static str;

    /// The settings object for this agent.
    type Settings: LoadableFromSettings;

    /// Instantiate the agent from the standard settings object.
    async fn from_settings(settings: Self::Settings, metrics: Arc<CoreMetrics>) -> Result<Self>
    where
        Self: Sized;

    /// Start running this agent.
    #[allow(clippy::async_yields_async)]
    async fn run(&self) -> Instrumented<JoinHandle<Result<()>>>;
}

/// Call this from `main` to fully initialize and run the agent for its entire
/// lifecycle. This assumes only a single agent is being run, and will
/// initialize the tracing subscriber and the metrics server as well.
pub async fn agent_main<A: BaseAgent>() -> Result<()> {
    color_eyre::install()?;

    let settings = A::Settings::load()?;
    let core_settings: &Settings = settings.as_ref();

    let metrics = Arc::new(CoreMetrics::new(A::AGENT_NAME, core_settings.metrics.port)?);
    core_settings.tracing.start_tracing()?;
    let agent = A::from_settings(settings, metrics.clone()).await?;
    let _metrics_server = metrics.run_http_server();

    agent.run().await.await?
}
