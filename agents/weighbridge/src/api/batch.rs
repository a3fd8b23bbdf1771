use std::path::PathBuf;

use axum::extract::{Query, State};
use axum::{routing, Json, Router};
use derive_new::new;
use serde::Deserialize;

use gatehouse_base::ApiError;
use gatehouse_core::api::BatchSummary;

use crate::db::WeighDb;
use crate::tare_ingest;

const BATCH_WEIGHT_API_BASE: &str = "/batch-weight";

#[derive(new, Clone)]
pub struct BatchWeightApi {
    db: WeighDb,
    staging_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct BatchQuery {
    file: String,
}

/// `POST /batch-weight?file=NAME` — ingest a pre-staged tare file.
async fn ingest_batch(
    State(api): State<BatchWeightApi>,
    Query(query): Query<BatchQuery>,
) -> Result<Json<BatchSummary>, ApiError> {
    let summary = tare_ingest::ingest_file(&api.db, &api.staging_dir, &query.file).await?;
    Ok(Json(summary))
}

impl BatchWeightApi {
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", routing::post(ingest_batch))
            .with_state(self.clone())
    }

    pub fn get_route(&self) -> (&'static str, Router) {
        (BATCH_WEIGHT_API_BASE, self.router())
    }
}
