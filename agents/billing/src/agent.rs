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
use crate::db::BillingDb;
use crate::settings::BillingSettings;
use crate::weigh_client::WeighClient;

/// The billing agent: providers, trucks, rates and bill assembly.
#[derive(Debug)]
pub struct Billing {
    db: BillingDb,
    weigh: WeighClient,
    metrics: Arc<CoreMetrics>,
    api_port: u16,
    staging_dir: PathBuf,
    data_dir: PathBuf,
}

#[async_trait]
impl BaseAgent for Billing {
    const AGENT_NAME: &'static str = "billing";
    type Settings = BillingSettings;

    async fn from_settings(settings: Self::Settings, metrics: Arc<CoreMetrics>) -> Result<Self>
    where
        Self: Sized,
    {
        let conn = gatehouse_base::db::connect(&settings.db).await?;
        Migrator::up(&conn, None).await?;

        let weigh = WeighClient::new(
            &settings.weighbridge.url,
            settings.weighbridge.timeout(),
            metrics.clone(),
        )?;
        info!(weighbridge = %settings.weighbridge.url, "billing ready");

        Ok(Self {
            db: BillingDb::new(conn, metrics.clone()),
            weigh,
            metrics,
            api_port: settings.api.port,
            staging_dir: settings.staging.clone(),
            data_dir: settings.data.clone(),
        })
    }

    #[allow(clippy::async_yields_async)]
    async fn run(&self) -> Instrumented<JoinHandle<Result<()>>> {
        let routes = api::routes(
            self.db.clone(),
            self.weigh.clone(),
            self.staging_dir.clone(),
            self.data_dir.clone(),
        );
        server::serve(self.api_port, routes, self.metrics.clone())
    }
}
