use axum::extract::{Path, State};
use axum::{routing, Json, Router};
use derive_new::new;

use gatehouse_base::ApiError;
use gatehouse_core::api::{SessionDetail, StandaloneSession, TruckSession};
use gatehouse_core::{Direction, MaybeKg};

use crate::db::{self, Transaction, WeighDb};

const SESSION_API_BASE: &str = "/session";

#[derive(new, Clone)]
pub struct SessionApi {
    db: WeighDb,
}

/// `GET /session/{id}` — resolve a stored row to its session view. An `out`
/// id resolves to the session of its paired `in` row.
async fn session_detail(
    State(db): State<WeighDb>,
    Path(id): Path<String>,
) -> Result<Json<SessionDetail>, ApiError> {
    let id: i64 = id
        .parse()
        .map_err(|_| ApiError::not_found(format!("no session with id '{id}'")))?;
    let row = db
        .find_row(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no session with id '{id}'")))?;

    let direction = row.direction.clone();
    let detail = if direction == Direction::In.as_str() {
        SessionDetail::Truck(truck_session(row))
    } else if direction == Direction::Out.as_str() {
        let truck = row.truck.clone().unwrap_or_default();
        match db::paired_in_before(db.conn(), &truck, row.id).await? {
            Some(pair) => SessionDetail::Truck(truck_session(pair)),
            // The paired row was force-overwritten away; the out row still
            // carries the session data.
            None => SessionDetail::Truck(truck_session(row)),
        }
    } else {
        SessionDetail::Standalone(standalone_session(row))
    };
    Ok(Json(detail))
}

fn truck_session(row: Transaction) -> TruckSession {
    TruckSession {
        id: row.id,
        truck: row.truck.unwrap_or_default(),
        bruto: row.bruto,
        truck_tara: row.truck_tara,
        // The cycle has closed iff the tara is recorded; only then is neto
        // part of the reply (possibly still "na").
        neto: row.truck_tara.map(|_| MaybeKg(row.neto)),
    }
}

fn standalone_session(row: Transaction) -> StandaloneSession {
    // For a resolved row the container tare is recoverable from the
    // arithmetic; unresolved rows report "na".
    let container_tara = row.neto.map(|neto| row.bruto - neto);
    StandaloneSession {
        id: row.id,
        container: row.containers,
        bruto: row.bruto,
        container_tara: MaybeKg(container_tara),
        neto: MaybeKg(row.neto),
    }
}

impl SessionApi {
    pub fn router(&self) -> Router {
        Router::new()
            .route("/:id", routing::get(session_detail))
            .with_state(self.db.clone())
    }

    pub fn get_route(&self) -> (&'static str, Router) {
        (SESSION_API_BASE, self.router())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn in_row(neto: Option<i64>, tara: Option<i64>) -> Transaction {
        Transaction {
            id: 4,
            recorded_at: datetime!(2025-01-21 09:30:00),
            direction: Direction::In.as_str().to_owned(),
            truck: Some("T-7".to_owned()),
            containers: "C-1".to_owned(),
            bruto: 20000,
            truck_tara: tara,
            neto,
            produce: "orange".to_owned(),
        }
    }

    #[test]
    fn open_sessions_omit_tara_and_neto() {
        let session = truck_session(in_row(None, None));
        assert_eq!(session.truck_tara, None);
        assert!(session.neto.is_none());
        assert_eq!(
            serde_json::to_string(&session).unwrap(),
            r#"{"id":4,"truck":"T-7","bruto":20000}"#
        );
    }

    #[test]
    fn closed_but_unresolved_sessions_report_na() {
        let session = truck_session(in_row(None, Some(10000)));
        assert_eq!(session.truck_tara, Some(10000));
        assert_eq!(session.neto, Some(MaybeKg::na()));
        assert_eq!(
            serde_json::to_string(&session).unwrap(),
            r#"{"id":4,"truck":"T-7","bruto":20000,"truckTara":10000,"neto":"na"}"#
        );
    }

    #[test]
    fn standalone_tara_is_recovered_from_the_arithmetic() {
        let row = Transaction {
            id: 9,
            recorded_at: datetime!(2025-01-21 10:00:00),
            direction: Direction::None.as_str().to_owned(),
            truck: None,
            containers: "C-3".to_owned(),
            bruto: 500,
            truck_tara: None,
            neto: Some(400),
            produce: "na".to_owned(),
        };
        let session = standalone_session(row);
        assert_eq!(session.container_tara, MaybeKg::known(100));
        assert_eq!(session.neto, MaybeKg::known(400));
    }
}
