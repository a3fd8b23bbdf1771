//! The per-truck weighing state machine.
//!
//! Every truck alternates `in` → `out`; a repeated direction is a conflict
//! the client can override with `force`. Standalone (`none`) weighings are
//! refused while the globally latest record is a dangling `in`. All decisions
//! and writes for one request happen inside a single serializable database
//! transaction, so concurrent requests for the same truck are ordered by the
//! store, not by wall-clock luck.

use sea_orm::DatabaseTransaction;
use tracing::{info, instrument};

use gatehouse_base::ApiError;
use gatehouse_core::api::{
    InReceipt, OutReceipt, StandaloneReceipt, WeighReceipt, WeighRequest,
};
use gatehouse_core::{join_container_list, parse_container_list, timefmt, Direction, MaybeKg};

use crate::db::{self, NewTransaction, Transaction, WeighDb};

/// A validated, unit-normalized weighing request.
#[derive(Debug, Clone)]
pub struct WeighingInput {
    pub direction: Direction,
    /// Scale reading in kg.
    pub kg: i64,
    pub truck: Option<String>,
    /// Canonical ids; `None` when the request did not carry the field at all.
    pub containers: Option<Vec<String>>,
    pub force: bool,
    pub produce: String,
}

impl WeighingInput {
    /// Validate and normalize a raw request.
    pub fn from_request(request: WeighRequest) -> Result<Self, ApiError> {
        if request.weight <= 0 {
            return Err(ApiError::validation("weight must be a positive integer"));
        }
        let kg = request.unit.to_kg(request.weight);

        let truck = request
            .truck
            .as_deref()
            .map(str::trim)
            .filter(|truck| !truck.is_empty() && *truck != "na")
            .map(str::to_owned);
        match request.direction {
            Direction::In | Direction::Out if truck.is_none() => {
                return Err(ApiError::validation("truck is required for 'in' and 'out'"));
            }
            _ => {}
        }

        let containers = request
            .containers
            .as_deref()
            .map(parse_container_list);
        let produce = request
            .produce
            .as_deref()
            .map(str::trim)
            .filter(|produce| !produce.is_empty())
            .unwrap_or("na")
            .to_owned();

        Ok(Self {
            direction: request.direction,
            kg,
            truck,
            containers,
            force: request.force,
            produce,
        })
    }

    fn truck(&self) -> &str {
        // from_request rejects in/out without a truck
        self.truck.as_deref().unwrap_or_default()
    }
}

/// What to do with an incoming `in` given the truck's latest record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InPlan {
    /// No open cycle; insert a fresh row.
    Insert,
    /// An open `in` exists and the client forced; drop it first.
    ReplacePrior(i64),
}

pub(crate) fn plan_in(prior: Option<&Transaction>, force: bool) -> Result<InPlan, ApiError> {
    match prior {
        Some(row) if row.direction == Direction::In.as_str() => {
            if force {
                Ok(InPlan::ReplacePrior(row.id))
            } else {
                Err(ApiError::conflict(format!(
                    "truck already has an open 'in' session (id {})",
                    row.id
                )))
            }
        }
        _ => Ok(InPlan::Insert),
    }
}

/// Whether a supplied container list matches the stored canonical form of
/// the open session. Byte comparison of the joined forms.
pub(crate) fn containers_match(supplied: Option<&[String]>, stored: &str) -> bool {
    match supplied {
        None => true,
        Some(ids) => join_container_list(ids) == stored,
    }
}

pub(crate) fn neto_for_out(bruto: i64, truck_tara: i64, tare_sum: Option<i64>) -> Option<i64> {
    tare_sum.map(|sum| bruto - truck_tara - sum)
}

/// A standalone weighing may not interrupt a dangling `in`.
pub(crate) fn standalone_blocked(latest: Option<&Transaction>) -> bool {
    latest.map_or(false, |row| row.direction == Direction::In.as_str())
}

/// Record one weighing. The returned receipt is what goes back to the
/// station terminal.
#[instrument(skip(db, request), fields(direction = %request.direction))]
pub async fn record(db: &WeighDb, request: WeighRequest) -> Result<WeighReceipt, ApiError> {
    let input = WeighingInput::from_request(request)?;
    let _in_flight = db.track("record_weighing");
    let txn = db.begin_serializable().await?;
    let receipt = match input.direction {
        Direction::In => record_in(&txn, &input).await,
        Direction::Out => record_out(&txn, &input).await,
        Direction::None => record_standalone(&txn, &input).await,
    }?;
    // An error above drops the transaction and rolls everything back.
    txn.commit().await?;
    Ok(receipt)
}

async fn record_in(txn: &DatabaseTransaction, input: &WeighingInput) -> Result<WeighReceipt, ApiError> {
    let truck = input.truck();
    let prior = db::latest_for_truck(txn, truck).await?;
    if let InPlan::ReplacePrior(prior_id) = plan_in(prior.as_ref(), input.force)? {
        info!(prior_id, truck, "Forced overwrite of open 'in' session");
        db::delete_row(txn, prior_id).await?;
    }

    let containers = input.containers.clone().unwrap_or_default();
    let id = db::insert(
        txn,
        NewTransaction {
            recorded_at: timefmt::now(),
            direction: Direction::In,
            truck: Some(truck.to_owned()),
            containers: join_container_list(&containers),
            bruto: input.kg,
            truck_tara: None,
            neto: None,
            produce: input.produce.clone(),
        },
    )
    .await?;

    Ok(WeighReceipt::In(InReceipt {
        id,
        truck: truck.to_owned(),
        bruto: input.kg,
    }))
}

async fn record_out(txn: &DatabaseTransaction, input: &WeighingInput) -> Result<WeighReceipt, ApiError> {
    let truck = input.truck();
    let prior = db::latest_for_truck(txn, truck).await?;
    let Some(prior) = prior else {
        return Err(ApiError::not_found(format!(
            "no 'in' transaction found for truck '{truck}'"
        )));
    };

    // Resolve the session (the paired `in` row) this weigh-out closes.
    let session = if prior.direction == Direction::Out.as_str() {
        if !input.force {
            return Err(ApiError::conflict(format!(
                "truck already has an 'out' session (id {})",
                prior.id
            )));
        }
        let session = db::paired_in_before(txn, truck, prior.id)
            .await?
            .ok_or_else(|| {
                ApiError::not_found(format!("no 'in' transaction found for truck '{truck}'"))
            })?;
        info!(prior_id = prior.id, truck, "Forced overwrite of 'out' record");
        db::delete_row(txn, prior.id).await?;
        session
    } else {
        prior
    };

    if !containers_match(input.containers.as_deref(), &session.containers) {
        return Err(ApiError::validation(format!(
            "containers do not match the open session (expected '{}')",
            session.containers
        )));
    }

    let truck_tara = input.kg;
    let container_ids = parse_container_list(&session.containers);
    let tare_sum = db::tare_sum(txn, &container_ids).await?;
    let neto = neto_for_out(session.bruto, truck_tara, tare_sum);

    // Back-fill the paired in row and insert the out row atomically; the
    // surrounding transaction commits both or neither.
    db::close_session(txn, session.id, truck_tara, neto).await?;
    db::insert(
        txn,
        NewTransaction {
            recorded_at: timefmt::now(),
            direction: Direction::Out,
            truck: Some(truck.to_owned()),
            containers: session.containers.clone(),
            bruto: session.bruto,
            truck_tara: Some(truck_tara),
            neto,
            produce: session.produce.clone(),
        },
    )
    .await?;

    Ok(WeighReceipt::Out(OutReceipt {
        id: session.id,
        truck: truck.to_owned(),
        bruto: session.bruto,
        truck_tara,
        neto: MaybeKg(neto),
    }))
}

async fn record_standalone(
    txn: &DatabaseTransaction,
    input: &WeighingInput,
) -> Result<WeighReceipt, ApiError> {
    let latest = db::latest_any(txn).await?;
    if standalone_blocked(latest.as_ref()) {
        return Err(ApiError::validation(
            "cannot record 'none' direction after 'in': a truck is still on site",
        ));
    }

    let containers = input.containers.clone().unwrap_or_default();
    let tare_sum = if containers.is_empty() {
        None
    } else {
        db::tare_sum(txn, &containers).await?
    };
    let neto = tare_sum.map(|sum| input.kg - sum);

    let id = db::insert(
        txn,
        NewTransaction {
            recorded_at: timefmt::now(),
            direction: Direction::None,
            truck: None,
            containers: join_container_list(&containers),
            bruto: input.kg,
            truck_tara: None,
            neto,
            produce: input.produce.clone(),
        },
    )
    .await?;

    Ok(WeighReceipt::Standalone(StandaloneReceipt {
        id,
        container: join_container_list(&containers),
        bruto: input.kg,
        container_tara: MaybeKg(tare_sum),
        neto: MaybeKg(neto),
    }))
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use gatehouse_core::WeightUnit;

    use super::*;

    fn row(id: i64, direction: Direction, truck: Option<&str>) -> Transaction {
        Transaction {
            id,
            recorded_at: datetime!(2025-01-21 08:00:00),
            direction: direction.as_str().to_owned(),
            truck: truck.map(str::to_owned),
            containers: String::new(),
            bruto: 15000,
            truck_tara: None,
            neto: None,
            produce: "na".to_owned(),
        }
    }

    fn request(direction: Direction) -> WeighRequest {
        WeighRequest {
            direction,
            weight: 15000,
            unit: WeightUnit::Kg,
            truck: Some("T-1".to_owned()),
            containers: None,
            force: false,
            produce: None,
        }
    }

    #[test]
    fn double_in_conflicts_unless_forced() {
        let open = row(7, Direction::In, Some("T-1"));
        let err = plan_in(Some(&open), false).unwrap_err();
        assert!(err.to_string().contains("7"), "conflict names the prior row");
        assert_eq!(plan_in(Some(&open), true).unwrap(), InPlan::ReplacePrior(7));
    }

    #[test]
    fn in_after_out_is_a_fresh_cycle() {
        let closed = row(9, Direction::Out, Some("T-1"));
        assert_eq!(plan_in(Some(&closed), false).unwrap(), InPlan::Insert);
        assert_eq!(plan_in(None, false).unwrap(), InPlan::Insert);
    }

    #[test]
    fn container_lists_compare_by_canonical_bytes() {
        let stored = "C-1,C-2";
        assert!(containers_match(None, stored));
        assert!(containers_match(
            Some(&["C-1".to_owned(), "C-2".to_owned()]),
            stored
        ));
        assert!(!containers_match(Some(&["C-1".to_owned()]), stored));
        assert!(!containers_match(Some(&[]), stored));
    }

    #[test]
    fn neto_is_indeterminate_while_tares_are_missing() {
        assert_eq!(neto_for_out(15000, 9000, Some(0)), Some(6000));
        assert_eq!(neto_for_out(20000, 10000, Some(320)), Some(9680));
        assert_eq!(neto_for_out(20000, 10000, None), None);
    }

    #[test]
    fn standalone_is_blocked_by_a_dangling_in() {
        assert!(standalone_blocked(Some(&row(1, Direction::In, Some("T-1")))));
        assert!(!standalone_blocked(Some(&row(2, Direction::Out, Some("T-1")))));
        assert!(!standalone_blocked(Some(&row(3, Direction::None, None))));
        assert!(!standalone_blocked(None));
    }

    #[test]
    fn requests_are_normalized_before_planning() {
        let mut raw = request(Direction::In);
        raw.unit = WeightUnit::Lbs;
        raw.weight = 1000;
        raw.containers = Some(" c-1 ,c-2".to_owned());
        let input = WeighingInput::from_request(raw).unwrap();
        assert_eq!(input.kg, 454);
        assert_eq!(
            input.containers.as_deref(),
            Some(&["C-1".to_owned(), "C-2".to_owned()][..])
        );
        assert_eq!(input.produce, "na");
    }

    #[test]
    fn missing_truck_and_bad_weight_are_validation_errors() {
        let mut no_truck = request(Direction::Out);
        no_truck.truck = Some("na".to_owned());
        assert!(matches!(
            WeighingInput::from_request(no_truck),
            Err(ApiError::Validation(_))
        ));

        let mut zero = request(Direction::In);
        zero.weight = 0;
        assert!(matches!(
            WeighingInput::from_request(zero),
            Err(ApiError::Validation(_))
        ));

        let mut standalone = request(Direction::None);
        standalone.truck = None;
        assert!(WeighingInput::from_request(standalone).is_ok());
    }
}
