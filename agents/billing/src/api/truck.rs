use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{routing, Json, Router};
use derive_new::new;
use serde::Deserialize;
use serde_json::json;

use gatehouse_base::ApiError;
use gatehouse_core::api::ItemHistory;

use crate::api::{parse_window, WindowQuery};
use crate::db::{self, BillingDb};
use crate::weigh_client::{Fetched, WeighClient};

const TRUCK_API_BASE: &str = "/truck";

#[derive(new, Clone)]
pub struct TruckApi {
    db: BillingDb,
    weigh: WeighClient,
}

#[derive(Debug, Deserialize)]
struct RegisterTruckBody {
    id: Option<String>,
    #[serde(alias = "provider_id")]
    provider: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ReassignTruckBody {
    #[serde(alias = "provider_id")]
    provider: Option<i32>,
}

/// `POST /truck` — register a truck under an existing provider.
async fn register_truck(
    State(api): State<TruckApi>,
    Json(body): Json<RegisterTruckBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let id = body
        .id
        .ok_or_else(|| ApiError::validation("no truck id provided"))?;
    let provider = body
        .provider
        .ok_or_else(|| ApiError::validation("no provider provided"))?;
    let _in_flight = api.db.track("register_truck");
    let truck = db::register_truck(api.db.conn(), &id, provider).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": truck.id, "provider": truck.provider_id })),
    ))
}

/// `PUT /truck/{id}` — reassign to a different provider.
async fn reassign_truck(
    State(api): State<TruckApi>,
    Path(id): Path<String>,
    Json(body): Json<ReassignTruckBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let provider = body
        .provider
        .ok_or_else(|| ApiError::validation("no provider provided"))?;
    let _in_flight = api.db.track("reassign_truck");
    let truck = db::reassign_truck(api.db.conn(), &id, provider).await?;
    Ok(Json(json!({ "id": truck.id, "provider": truck.provider_id })))
}

/// `GET /truck/{id}?from&to` — the weighbridge view of a registered truck.
async fn truck_history(
    State(api): State<TruckApi>,
    Path(id): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<ItemHistory>, ApiError> {
    api.db
        .truck_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no truck with id '{id}'")))?;
    let window = parse_window(&query)?;

    match api.weigh.item(&id, &window).await {
        Fetched::Hit(history) => Ok(Json(history)),
        // Registered with us but never seen on the bridge.
        Fetched::Missing => Ok(Json(ItemHistory {
            id,
            tara: Default::default(),
            sessions: Vec::new(),
        })),
        Fetched::Unreachable => Err(ApiError::upstream("weighbridge unreachable")),
    }
}

impl TruckApi {
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", routing::post(register_truck))
            .route("/:id", routing::put(reassign_truck).get(truck_history))
            .with_state(self.clone())
    }

    pub fn get_route(&self) -> (&'static str, Router) {
        (TRUCK_API_BASE, self.router())
    }
}
