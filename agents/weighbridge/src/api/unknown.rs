use axum::extract::State;
use axum::{routing, Json, Router};
use derive_new::new;

use gatehouse_base::ApiError;

use crate::db::WeighDb;

const UNKNOWN_API_BASE: &str = "/unknown";

#[derive(new, Clone)]
pub struct UnknownApi {
    db: WeighDb,
}

/// `GET /unknown` — container ids seen on the bridge but never calibrated,
/// sorted.
async fn unknown_containers(State(db): State<WeighDb>) -> Result<Json<Vec<String>>, ApiError> {
    let referenced = db.referenced_container_ids().await?;
    let registered = db.registered_container_ids().await?;
    let unknown = referenced
        .into_iter()
        .filter(|id| !registered.contains(id))
        .collect();
    Ok(Json(unknown))
}

impl UnknownApi {
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", routing::get(unknown_containers))
            .with_state(self.db.clone())
    }

    pub fn get_route(&self) -> (&'static str, Router) {
        (UNKNOWN_API_BASE, self.router())
    }
}
