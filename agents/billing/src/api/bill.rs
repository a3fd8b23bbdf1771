use axum::extract::{Path, Query, State};
use axum::{routing, Json, Router};
use derive_new::new;

use gatehouse_base::ApiError;
use gatehouse_core::api::BillReport;

use crate::api::{parse_window, WindowQuery};
use crate::bill;
use crate::db::BillingDb;
use crate::weigh_client::WeighClient;

const BILL_API_BASE: &str = "/bill";

#[derive(new, Clone)]
pub struct BillApi {
    db: BillingDb,
    weigh: WeighClient,
}

/// `GET /bill/{providerId}?from&to` — the aggregated bill.
async fn provider_bill(
    State(api): State<BillApi>,
    Path(provider_id): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<BillReport>, ApiError> {
    let provider_id: i32 = provider_id
        .parse()
        .map_err(|_| ApiError::not_found(format!("no provider with id '{provider_id}'")))?;
    let window = parse_window(&query)?;
    let report = bill::assemble(&api.db, &api.weigh, provider_id, window).await?;
    Ok(Json(report))
}

impl BillApi {
    pub fn router(&self) -> Router {
        Router::new()
            .route("/:provider_id", routing::get(provider_bill))
            .with_state(self.clone())
    }

    pub fn get_route(&self) -> (&'static str, Router) {
        (BILL_API_BASE, self.router())
    }
}
