use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{routing, Json, Router};
use derive_new::new;
use serde::Deserialize;
use serde_json::json;

use gatehouse_base::ApiError;

use crate::db::{self, BillingDb};

const PROVIDER_API_BASE: &str = "/provider";

#[derive(new, Clone)]
pub struct ProviderApi {
    db: BillingDb,
}

#[derive(Debug, Deserialize)]
struct ProviderBody {
    name: Option<String>,
}

/// `POST /provider` — create a provider with a unique name.
async fn create_provider(
    State(db): State<BillingDb>,
    Json(body): Json<ProviderBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let name = body
        .name
        .ok_or_else(|| ApiError::validation("no name provided"))?;
    let _in_flight = db.track("create_provider");
    let provider = db::create_provider(db.conn(), &name).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": provider.id, "name": provider.name })),
    ))
}

/// `PUT /provider/{id}` — rename.
async fn rename_provider(
    State(db): State<BillingDb>,
    Path(id): Path<String>,
    Json(body): Json<ProviderBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id: i32 = id
        .parse()
        .map_err(|_| ApiError::not_found(format!("no provider with id '{id}'")))?;
    let name = body
        .name
        .ok_or_else(|| ApiError::validation("no name provided"))?;
    let _in_flight = db.track("rename_provider");
    let provider = db::rename_provider(db.conn(), id, &name).await?;
    Ok(Json(json!({ "id": provider.id, "name": provider.name })))
}

impl ProviderApi {
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", routing::post(create_provider))
            .route("/:id", routing::put(rename_provider))
            .with_state(self.db.clone())
    }

    pub fn get_route(&self) -> (&'static str, Router) {
        (PROVIDER_API_BASE, self.router())
    }
}
