//! The billing service's public API, one module per surface.

use std::path::PathBuf;

use axum::Router;
use time::PrimitiveDateTime;

use gatehouse_base::ApiError;
use gatehouse_core::timefmt;

use crate::db::BillingDb;
use crate::weigh_client::{WeighClient, Window};

mod bill;
mod health;
mod provider;
mod rates;
mod truck;

/// Assemble every route pair of the billing API.
pub fn routes(
    db: BillingDb,
    weigh: WeighClient,
    staging_dir: PathBuf,
    data_dir: PathBuf,
) -> Vec<(&'static str, Router)> {
    vec![
        provider::ProviderApi::new(db.clone()).get_route(),
        truck::TruckApi::new(db.clone(), weigh.clone()).get_route(),
        rates::RatesApi::new(db.clone(), staging_dir, data_dir).get_route(),
        bill::BillApi::new(db.clone(), weigh).get_route(),
        health::HealthApi::new(db).get_route(),
    ]
}

/// Shared `?from&to` query shape.
#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct WindowQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Billing windows default to the current month, matching what a provider
/// expects a bill to cover.
pub(crate) fn parse_window(query: &WindowQuery) -> Result<Window, ApiError> {
    let from = parse_stamp(query.from.as_deref(), timefmt::start_of_month())?;
    let to = parse_stamp(query.to.as_deref(), timefmt::now())?;
    Ok(Window { from, to })
}

fn parse_stamp(
    raw: Option<&str>,
    default: PrimitiveDateTime,
) -> Result<PrimitiveDateTime, ApiError> {
    match raw {
        Some(raw) => timefmt::parse(raw).map_err(|err| ApiError::validation(err.to_string())),
        None => Ok(default),
    }
}
