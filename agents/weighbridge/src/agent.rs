use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use eyre::Result;
use migration::{Migrator, MigratorTrait};
use tokio::task::JoinHandle;
use tracing::instrument::Instrumented;
use tracing::info;

use gatehouse_base::{server, BaseAgent, CoreMetrics};

use crate::api;
use crate::db::WeighDb;
use crate::settings::WeighbridgeSettings;

/// The weighbridge agent: one process owning the transaction log and the
/// container registry, serving the station's weight API.
#[derive(Debug)]
pub struct Weighbridge {
    db: WeighDb,
    metrics: Arc<CoreMetrics>,
    api_port: u16,
    staging_dir: PathBuf,
}

#[async_trait]
impl BaseAgent for Weighbridge {
    const AGENT_NAME: &'static str = "weighbridge";
    type Settings = WeighbridgeSettings;

    async fn from_settings(settings: Self::Settings, metrics: Arc<CoreMetrics>) -> Result<Self>
    where
        Self: Sized,
    {
        let conn = gatehouse_base::db::connect(&settings.db).await?;
        Migrator::up(&conn, None).await?;
        info!(staging = %settings.staging.display(), "weighbridge ready");

        Ok(Self {
            db: WeighDb::new(conn, metrics.clone()),
            metrics,
            api_port: settings.api.port,
            staging_dir: settings.staging.clone(),
        })
    }

    #[allow(clippy::async_yields_async)]
    async fn run(&self) -> Instrumented<JoinHandle<Result<()>>> {
        let routes = api::routes(self.db.clone(), self.staging_dir.clone());
        server::serve(self.api_port, routes, self.metrics.clone())
    }
}
