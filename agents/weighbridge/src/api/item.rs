use axum::extract::{Path, Query, State};
use axum::{routing, Json, Router};
use derive_new::new;

use gatehouse_base::ApiError;
use gatehouse_core::api::ItemHistory;
use gatehouse_core::{canonical_container_id, parse_container_list, timefmt, MaybeKg};

use crate::api::{parse_window, WindowQuery};
use crate::db::WeighDb;

const ITEM_API_BASE: &str = "/item";

#[derive(new, Clone)]
pub struct ItemApi {
    db: WeighDb,
}

/// `GET /item/{id}?from&to` — history of a truck or a container. Trucks are
/// checked first; an id that never appears anywhere is a 404.
async fn item_history(
    State(db): State<WeighDb>,
    Path(id): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<ItemHistory>, ApiError> {
    let (from, to) = parse_window(&query, timefmt::start_of_month())?;

    if db.truck_appears(&id).await? {
        let sessions = db.in_sessions_for_truck(&id, from, to).await?;
        let tara = db.last_known_truck_tara(&id).await?;
        return Ok(Json(ItemHistory {
            id,
            tara: tara.into(),
            sessions,
        }));
    }

    let canonical = canonical_container_id(&id);
    let registered_tare = db.container_tare_kg(&canonical).await?;
    let rows = db.container_rows_in_window(from, to).await?;
    let sessions: Vec<i64> = rows
        .into_iter()
        .filter(|row| parse_container_list(&row.containers).contains(&canonical))
        .map(|row| row.id)
        .collect();

    // A container counts as known if it was ever weighed or calibrated.
    if registered_tare.is_none()
        && sessions.is_empty()
        && !db.referenced_container_ids().await?.contains(&canonical)
    {
        return Err(ApiError::not_found(format!("no item with id '{id}'")));
    }

    Ok(Json(ItemHistory {
        id: canonical,
        tara: MaybeKg(registered_tare),
        sessions,
    }))
}

impl ItemApi {
    pub fn router(&self) -> Router {
        Router::new()
            .route("/:id", routing::get(item_history))
            .with_state(self.db.clone())
    }

    pub fn get_route(&self) -> (&'static str, Router) {
        (ITEM_API_BASE, self.router())
    }
}
