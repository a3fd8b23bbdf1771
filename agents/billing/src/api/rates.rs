use std::path::PathBuf;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{routing, Json, Router};
use derive_new::new;
use serde::Deserialize;
use serde_json::json;

use gatehouse_base::ApiError;

use crate::db::BillingDb;
use crate::rates;

const RATES_API_BASE: &str = "/rates";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(new, Clone)]
pub struct RatesApi {
    db: BillingDb,
    staging_dir: PathBuf,
    data_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RatesQuery {
    file: String,
}

/// `POST /rates?file=NAME` — replace the rate table from a staged workbook.
async fn upload_rates(
    State(api): State<RatesApi>,
    Query(query): Query<RatesQuery>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let written = rates::upload(&api.db, &api.staging_dir, &api.data_dir, &query.file).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "rates updated", "rates": written })),
    ))
}

/// `GET /rates` — the last uploaded workbook, verbatim.
async fn download_rates(State(api): State<RatesApi>) -> Result<impl IntoResponse, ApiError> {
    let bytes = rates::download(&api.data_dir).await?;
    Ok(([(header::CONTENT_TYPE, XLSX_MIME)], bytes))
}

impl RatesApi {
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", routing::post(upload_rates).get(download_rates))
            .with_state(self.clone())
    }

    pub fn get_route(&self) -> (&'static str, Router) {
        (RATES_API_BASE, self.router())
    }
}
