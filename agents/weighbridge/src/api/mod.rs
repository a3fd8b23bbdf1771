//! The weighbridge's public API, one module per surface. Each module exposes
//! an `*Api` struct carrying its state and a `get_route` returning the
//! `(path, Router)` pair the server nests.

use std::path::PathBuf;

use axum::Router;
use time::PrimitiveDateTime;

use gatehouse_base::ApiError;
use gatehouse_core::timefmt;

use crate::db::WeighDb;

mod batch;
mod health;
mod item;
mod session;
mod unknown;
mod weight;

/// Assemble every route pair of the weighbridge API.
pub fn routes(db: WeighDb, staging_dir: PathBuf) -> Vec<(&'static str, Router)> {
    vec![
        weight::WeightApi::new(db.clone()).get_route(),
        batch::BatchWeightApi::new(db.clone(), staging_dir).get_route(),
        item::ItemApi::new(db.clone()).get_route(),
        session::SessionApi::new(db.clone()).get_route(),
        unknown::UnknownApi::new(db.clone()).get_route(),
        health::HealthApi::new(db).get_route(),
    ]
}

/// Shared `?from&to` query shape.
#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct WindowQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub filter: Option<String>,
}

/// Resolve a request window: explicit stamps win, otherwise `default_from`
/// up to now. Malformed stamps are validation errors.
pub(crate) fn parse_window(
    query: &WindowQuery,
    default_from: PrimitiveDateTime,
) -> Result<(PrimitiveDateTime, PrimitiveDateTime), ApiError> {
    let from = match query.from.as_deref() {
        Some(raw) => timefmt::parse(raw).map_err(|err| ApiError::validation(err.to_string()))?,
        None => default_from,
    };
    let to = match query.to.as_deref() {
        Some(raw) => timefmt::parse(raw).map_err(|err| ApiError::validation(err.to_string()))?,
        None => timefmt::now(),
    };
    Ok((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_window_stamps_win_over_defaults() {
        let query = WindowQuery {
            from: Some("20250101000000".into()),
            to: Some("20250120000000".into()),
            filter: None,
        };
        let (from, to) = parse_window(&query, timefmt::start_of_today()).unwrap();
        assert_eq!(timefmt::format(from), "20250101000000");
        assert_eq!(timefmt::format(to), "20250120000000");
    }

    #[test]
    fn malformed_stamps_are_validation_errors() {
        let query = WindowQuery {
            from: Some("yesterday".into()),
            to: None,
            filter: None,
        };
        assert!(matches!(
            parse_window(&query, timefmt::start_of_today()),
            Err(ApiError::Validation(_))
        ));
    }
}
