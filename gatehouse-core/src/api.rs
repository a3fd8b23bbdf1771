//! Request and response payloads shared between the weighbridge handlers and
//! the billing-side client. One definition per wire shape keeps the two
//! services from drifting apart.

use serde::de::Deserializer;
use serde::{de, Deserialize, Serialize};

use crate::{Direction, MaybeKg, WeightUnit};

/// Body of `POST /weight`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeighRequest {
    /// Which side of the cycle this weighing is.
    pub direction: Direction,
    /// Scale reading in `unit`.
    pub weight: i64,
    /// Unit of `weight`.
    pub unit: WeightUnit,
    /// Truck id; required for `in`/`out`, absent or `"na"` for `none`.
    #[serde(default)]
    pub truck: Option<String>,
    /// Comma-joined container list, canonicalized on ingest.
    #[serde(default)]
    pub containers: Option<String>,
    /// Overwrite an otherwise-conflicting prior record.
    #[serde(default, deserialize_with = "bool_or_string")]
    pub force: bool,
    /// Produce tag; defaults to `"na"`.
    #[serde(default)]
    pub produce: Option<String>,
}

// Station terminals predate the JSON boolean here and send "true"/"false".
fn bool_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Flag(flag) => Ok(flag),
        Raw::Text(text) => match text.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(de::Error::custom(format!(
                "force must be a boolean, got '{other}'"
            ))),
        },
    }
}

/// Reply to a recorded `in` weighing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InReceipt {
    /// Session id of the new `in` row.
    pub id: i64,
    /// Truck that entered.
    pub truck: String,
    /// Gross weight in kg.
    pub bruto: i64,
}

/// Reply to a recorded `out` weighing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutReceipt {
    /// Session id (the paired `in` row's id).
    pub id: i64,
    /// Truck that left.
    pub truck: String,
    /// Gross weight of the session in kg.
    pub bruto: i64,
    /// Empty-truck weight in kg.
    pub truck_tara: i64,
    /// Net produce weight, `"na"` while container tares are missing.
    pub neto: MaybeKg,
}

/// Reply to a standalone (`none`) weighing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandaloneReceipt {
    /// Id of the new row.
    pub id: i64,
    /// Canonical comma-joined container list that was weighed.
    pub container: String,
    /// Scale reading in kg.
    pub bruto: i64,
    /// Total registered tare of the weighed containers, `"na"` if unknown.
    pub container_tara: MaybeKg,
    /// `bruto` minus the known container tare, `"na"` otherwise.
    pub neto: MaybeKg,
}

/// Any `POST /weight` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeighReceipt {
    /// Cycle closed.
    Out(OutReceipt),
    /// Standalone weighing.
    Standalone(StandaloneReceipt),
    /// Cycle opened.
    In(InReceipt),
}

/// One row of `GET /weight`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRow {
    /// Row id.
    pub id: i64,
    /// Direction of the row.
    pub direction: Direction,
    /// Gross weight in kg.
    pub bruto: i64,
    /// Net weight or `"na"`.
    pub neto: MaybeKg,
    /// Produce tag.
    pub produce: String,
    /// Canonical container ids.
    pub containers: Vec<String>,
}

/// Reply of `GET /item/{id}`: the history of a truck or container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemHistory {
    /// The id as queried (canonicalized for containers).
    pub id: String,
    /// Last known truck tara, or registered container tare in kg; `"na"` when
    /// never observed.
    pub tara: MaybeKg,
    /// Session ids touching this item inside the window.
    pub sessions: Vec<i64>,
}

/// `GET /session/{id}` for a truck session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruckSession {
    /// Session id.
    pub id: i64,
    /// Truck of the session.
    pub truck: String,
    /// Gross weight in kg.
    pub bruto: i64,
    /// Present once the truck has weighed out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truck_tara: Option<i64>,
    /// Present once the truck has weighed out; `"na"` while tares are missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neto: Option<MaybeKg>,
}

/// `GET /session/{id}` for a standalone weighing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandaloneSession {
    /// Row id.
    pub id: i64,
    /// Canonical comma-joined container list.
    pub container: String,
    /// Scale reading in kg.
    pub bruto: i64,
    /// Registered tare total or `"na"`.
    pub container_tara: MaybeKg,
    /// Net weight or `"na"`.
    pub neto: MaybeKg,
}

/// Any `GET /session/{id}` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionDetail {
    /// A standalone weighing (has a `container` field).
    Standalone(StandaloneSession),
    /// A truck session.
    Truck(TruckSession),
}

impl SessionDetail {
    /// The billable net amount of this session, if determinate.
    pub fn amount(&self) -> Option<i64> {
        match self {
            SessionDetail::Truck(session) => session.neto.and_then(|neto| neto.0),
            SessionDetail::Standalone(session) => session.neto.0,
        }
    }
}

/// Reply of `POST /batch-weight`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Human-readable outcome.
    pub message: String,
    /// Counters of what the batch changed.
    pub data: BatchData,
}

/// Counters reported by a tare batch ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchData {
    /// Container registrations written (including overwrites).
    pub registered: usize,
    /// Previously indeterminate rows whose neto was resolved.
    pub reconciled: usize,
}

/// One product bucket of a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLine {
    /// Produce tag ("unknown" when the weighbridge had no mapping).
    pub product: String,
    /// Number of sessions in the bucket.
    pub count: u64,
    /// Total net kilograms.
    pub amount: i64,
    /// Rate applied (agorot per kg; 0 when unlisted).
    pub rate: i64,
    /// `amount · rate`.
    pub pay: i64,
}

/// Reply of `GET /bill/{providerId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillReport {
    /// Provider id.
    pub id: i32,
    /// Provider display name.
    pub name: String,
    /// Window start, `YYYYMMDDhhmmss`.
    pub from: String,
    /// Window end, `YYYYMMDDhhmmss`.
    pub to: String,
    /// Trucks registered to the provider (not only active ones).
    pub truck_count: usize,
    /// Billable sessions found in the window.
    pub session_count: usize,
    /// Per-product aggregation, sorted by product.
    pub products: Vec<ProductLine>,
    /// Σ pay over all products.
    pub total: i64,
}

/// Reply of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `"200 OK"` when storage is reachable.
    pub status: String,
}

impl HealthStatus {
    /// The healthy reply.
    pub fn ok() -> Self {
        HealthStatus {
            status: "200 OK".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weigh_request_accepts_legacy_string_force() {
        let req: WeighRequest = serde_json::from_str(
            r#"{"direction":"in","truck":"T-1","weight":15000,"unit":"kg","force":"true"}"#,
        )
        .unwrap();
        assert!(req.force);
        assert_eq!(req.truck.as_deref(), Some("T-1"));

        let req: WeighRequest =
            serde_json::from_str(r#"{"direction":"none","weight":500,"unit":"kg"}"#).unwrap();
        assert!(!req.force);
        assert!(req.truck.is_none());

        assert!(serde_json::from_str::<WeighRequest>(
            r#"{"direction":"in","truck":"T-1","weight":1,"unit":"kg","force":"maybe"}"#
        )
        .is_err());
    }

    #[test]
    fn session_detail_discriminates_on_field_names() {
        let truck: SessionDetail = serde_json::from_str(
            r#"{"id":7,"truck":"T-1","bruto":15000,"truckTara":9000,"neto":6000}"#,
        )
        .unwrap();
        assert_eq!(truck.amount(), Some(6000));

        let open: SessionDetail =
            serde_json::from_str(r#"{"id":8,"truck":"T-2","bruto":20000}"#).unwrap();
        assert_eq!(open.amount(), None);

        let standalone: SessionDetail = serde_json::from_str(
            r#"{"id":9,"container":"C-1","bruto":500,"containerTara":100,"neto":400}"#,
        )
        .unwrap();
        assert_eq!(standalone.amount(), Some(400));

        let unresolved: SessionDetail = serde_json::from_str(
            r#"{"id":10,"truck":"T-3","bruto":20000,"truckTara":10000,"neto":"na"}"#,
        )
        .unwrap();
        assert_eq!(unresolved.amount(), None);
    }

    #[test]
    fn out_receipt_serializes_in_station_dialect() {
        let receipt = WeighReceipt::Out(OutReceipt {
            id: 3,
            truck: "T-1".into(),
            bruto: 15000,
            truck_tara: 9000,
            neto: MaybeKg::na(),
        });
        assert_eq!(
            serde_json::to_string(&receipt).unwrap(),
            r#"{"id":3,"truck":"T-1","bruto":15000,"truckTara":9000,"neto":"na"}"#
        );
    }
}
