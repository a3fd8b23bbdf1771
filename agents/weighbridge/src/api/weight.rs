use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{routing, Json, Router};
use derive_new::new;

use gatehouse_base::ApiError;
use gatehouse_core::api::{TransactionRow, WeighReceipt, WeighRequest};
use gatehouse_core::{parse_container_list, timefmt, Direction};

use crate::api::{parse_window, WindowQuery};
use crate::db::{Transaction, WeighDb};
use crate::weighing;

const WEIGHT_API_BASE: &str = "/weight";

#[derive(new, Clone)]
pub struct WeightApi {
    db: WeighDb,
}

/// `GET /weight?from&to&filter=` — the log inside a window, row per record.
async fn list_weighings(
    State(db): State<WeighDb>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<TransactionRow>>, ApiError> {
    let (from, to) = parse_window(&query, timefmt::start_of_today())?;
    let directions = parse_filter(query.filter.as_deref())?;
    let rows = db.rows_in_window(from, to, &directions).await?;
    let rows = rows
        .into_iter()
        .map(row_to_wire)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(rows))
}

/// `POST /weight` — record a weighing.
async fn record_weighing(
    State(db): State<WeighDb>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<WeighReceipt>), ApiError> {
    // Deserialize by hand so a missing field is a 400, not a 422.
    let request: WeighRequest = serde_json::from_value(body)
        .map_err(|err| ApiError::validation(format!("invalid weight request: {err}")))?;
    let receipt = weighing::record(&db, request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

fn parse_filter(filter: Option<&str>) -> Result<Vec<Direction>, ApiError> {
    let Some(filter) = filter else {
        return Ok(vec![Direction::In, Direction::Out, Direction::None]);
    };
    let directions = filter
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse()
                .map_err(|_| ApiError::validation(format!("unknown direction '{part}' in filter")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if directions.is_empty() {
        return Err(ApiError::validation(
            "filter must name at least one direction",
        ));
    }
    Ok(directions)
}

fn row_to_wire(row: Transaction) -> Result<TransactionRow, ApiError> {
    let direction: Direction = row
        .direction
        .parse()
        .map_err(|_| ApiError::validation(format!("row {} has a corrupt direction", row.id)))?;
    Ok(TransactionRow {
        id: row.id,
        direction,
        bruto: row.bruto,
        neto: row.neto.into(),
        produce: row.produce,
        containers: parse_container_list(&row.containers),
    })
}

impl WeightApi {
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", routing::get(list_weighings).post(record_weighing))
            .with_state(self.db.clone())
    }

    pub fn get_route(&self) -> (&'static str, Router) {
        (WEIGHT_API_BASE, self.router())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_defaults_to_all_directions() {
        assert_eq!(
            parse_filter(None).unwrap(),
            vec![Direction::In, Direction::Out, Direction::None]
        );
        assert_eq!(
            parse_filter(Some("in,none")).unwrap(),
            vec![Direction::In, Direction::None]
        );
        assert!(parse_filter(Some("in,sideways")).is_err());
        assert!(parse_filter(Some("")).is_err());
    }
}
