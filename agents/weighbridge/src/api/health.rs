use axum::extract::State;
use axum::{routing, Json, Router};
use derive_new::new;

use gatehouse_base::ApiError;
use gatehouse_core::api::HealthStatus;

use crate::db::WeighDb;

const HEALTH_API_BASE: &str = "/health";

#[derive(new, Clone)]
pub struct HealthApi {
    db: WeighDb,
}

/// `GET /health` — 200 iff storage answers a ping.
async fn health(State(db): State<WeighDb>) -> Result<Json<HealthStatus>, ApiError> {
    db.ping().await?;
    Ok(Json(HealthStatus::ok()))
}

impl HealthApi {
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", routing::get(health))
            .with_state(self.db.clone())
    }

    pub fn get_route(&self) -> (&'static str, Router) {
        (HEALTH_API_BASE, self.router())
    }
}
