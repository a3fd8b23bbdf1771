//! Container tare batches and the deferred neto reconciliation.
//!
//! Calibration legitimately trails the weighing events, so `neto` is nullable
//! in the log. When a batch lands, every previously indeterminate `out`/`none`
//! row whose container set became fully known gets its neto computed in
//! place, together with its paired `in` row. A batch either applies wholly or
//! not at all.

use std::collections::HashSet;
use std::path::Path;

use sea_orm::ConnectionTrait;
use serde::Deserialize;
use tracing::{info, instrument};

use gatehouse_base::ApiError;
use gatehouse_core::api::{BatchData, BatchSummary};
use gatehouse_core::{canonical_container_id, parse_container_list, Direction, WeightUnit};

use crate::db::{self, TareRecord, WeighDb};

/// Ingest the staged batch file `file` and reconcile pending rows.
#[instrument(skip(db, staging_dir))]
pub async fn ingest_file(
    db: &WeighDb,
    staging_dir: &Path,
    file: &str,
) -> Result<BatchSummary, ApiError> {
    if file.is_empty() || file.contains('/') || file.contains('\\') || file.contains("..") {
        return Err(ApiError::validation("file must be a bare file name"));
    }
    let path = staging_dir.join(file);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::validation(format!("file '{file}' not found in staging area")))?;
    let records = parse_batch(file, &bytes)?;

    let _in_flight = db.track("batch_ingest");
    let txn = db.begin().await?;
    db::upsert_tares(&txn, &records).await?;
    let reconciled = reconcile_pending(&txn).await?;
    txn.commit().await?;

    info!(
        registered = records.len(),
        reconciled, "Applied container tare batch"
    );
    Ok(BatchSummary {
        message: "batch applied".to_owned(),
        data: BatchData {
            registered: records.len(),
            reconciled,
        },
    })
}

/// Parse a staged batch by file extension. Any structural violation rejects
/// the whole batch.
pub(crate) fn parse_batch(file: &str, bytes: &[u8]) -> Result<Vec<TareRecord>, ApiError> {
    if file.ends_with(".csv") {
        parse_csv(bytes)
    } else if file.ends_with(".json") {
        parse_json(bytes)
    } else {
        Err(ApiError::validation(
            "batch file must be a .csv or .json file",
        ))
    }
}

// The header row names the unit: `id,kg` or `id,lbs` applies to every record.
fn parse_csv(bytes: &[u8]) -> Result<Vec<TareRecord>, ApiError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|err| ApiError::validation(format!("unreadable csv header: {err}")))?;
    if headers.len() != 2 || headers.get(0).map(str::trim) != Some("id") {
        return Err(ApiError::validation(
            "csv header must be 'id,kg' or 'id,lbs'",
        ));
    }
    let unit: WeightUnit = headers
        .get(1)
        .unwrap_or_default()
        .trim()
        .parse()
        .map_err(|_| ApiError::validation("csv header must name the unit, 'kg' or 'lbs'"))?;

    let mut records = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record =
            record.map_err(|err| ApiError::validation(format!("bad csv record: {err}")))?;
        let id = canonical_container_id(record.get(0).unwrap_or_default());
        let weight = parse_weight(record.get(1).unwrap_or_default().trim(), index)?;
        if id.is_empty() {
            return Err(ApiError::validation(format!(
                "csv record {} has an empty container id",
                index + 1
            )));
        }
        records.push(TareRecord { id, weight, unit });
    }
    Ok(records)
}

fn parse_weight(raw: &str, index: usize) -> Result<i64, ApiError> {
    let weight: i64 = raw.parse().map_err(|_| {
        ApiError::validation(format!(
            "csv record {} has a non-integer weight '{raw}'",
            index + 1
        ))
    })?;
    if weight <= 0 {
        return Err(ApiError::validation(format!(
            "csv record {} has a non-positive weight",
            index + 1
        )));
    }
    Ok(weight)
}

fn parse_json(bytes: &[u8]) -> Result<Vec<TareRecord>, ApiError> {
    #[derive(Debug, Deserialize)]
    struct RawTare {
        id: String,
        weight: i64,
        unit: String,
    }

    let raw: Vec<RawTare> = serde_json::from_slice(bytes)
        .map_err(|err| ApiError::validation(format!("bad json batch: {err}")))?;
    raw.into_iter()
        .map(|record| {
            let id = canonical_container_id(&record.id);
            if id.is_empty() {
                return Err(ApiError::validation("json record has an empty container id"));
            }
            if record.weight <= 0 {
                return Err(ApiError::validation(format!(
                    "container '{id}' has a non-positive weight"
                )));
            }
            let unit: WeightUnit = record.unit.parse().map_err(|_| {
                ApiError::validation(format!("container '{id}' has an unknown unit"))
            })?;
            Ok(TareRecord {
                id,
                weight: record.weight,
                unit,
            })
        })
        .collect()
}

/// Recompute neto for rows the registry can now resolve. Returns how many
/// `out`/`none` rows were updated (paired `in` rows ride along).
pub(crate) async fn reconcile_pending<C: ConnectionTrait>(conn: &C) -> Result<usize, ApiError> {
    let pending = db::unresolved_rows(conn).await?;
    if pending.is_empty() {
        return Ok(0);
    }

    let referenced: HashSet<String> = pending
        .iter()
        .flat_map(|row| parse_container_list(&row.containers))
        .collect();
    let tares = db::tares_for(conn, referenced.iter().map(String::as_str)).await?;

    let mut reconciled = 0;
    for row in pending {
        let ids = parse_container_list(&row.containers);
        let Some(sum) = ids.iter().map(|id| tares.get(id).copied()).sum::<Option<i64>>() else {
            // Still only partially known; stays indeterminate.
            continue;
        };

        let neto = if row.direction == Direction::Out.as_str() {
            row.bruto - row.truck_tara.unwrap_or(0) - sum
        } else {
            row.bruto - sum
        };
        db::set_neto(conn, row.id, neto).await?;

        if row.direction == Direction::Out.as_str() {
            if let Some(truck) = row.truck.as_deref() {
                if let Some(pair) = db::paired_in_before(conn, truck, row.id).await? {
                    db::set_neto(conn, pair.id, neto).await?;
                }
            }
        }
        reconciled += 1;
    }
    Ok(reconciled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_batches_carry_the_unit_in_the_header() {
        let records = parse_batch("tares.csv", b"id,kg\nC-1,100\nc-2,220\n").unwrap();
        assert_eq!(
            records,
            vec![
                TareRecord {
                    id: "C-1".into(),
                    weight: 100,
                    unit: WeightUnit::Kg
                },
                TareRecord {
                    id: "C-2".into(),
                    weight: 220,
                    unit: WeightUnit::Kg
                }
            ]
        );
    }

    #[test]
    fn csv_structural_violations_reject_the_batch() {
        assert!(parse_batch("t.csv", b"id,stone\nC-1,100\n").is_err());
        assert!(parse_batch("t.csv", b"container,kg\nC-1,100\n").is_err());
        assert!(parse_batch("t.csv", b"id,kg\nC-1,heavy\n").is_err());
        assert!(parse_batch("t.csv", b"id,kg\nC-1,-3\n").is_err());
        assert!(parse_batch("t.csv", b"id,kg\n,100\n").is_err());
    }

    #[test]
    fn json_batches_carry_per_record_units() {
        let records = parse_batch(
            "tares.json",
            br#"[{"id":"c-1","weight":100,"unit":"kg"},{"id":"C-2","weight":485,"unit":"lbs"}]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].unit, WeightUnit::Lbs);
        assert_eq!(records[0].id, "C-1");

        assert!(parse_batch("t.json", br#"[{"id":"C-1","weight":100,"unit":"g"}]"#).is_err());
        assert!(parse_batch("t.json", br#"{"id":"C-1"}"#).is_err());
    }

    #[test]
    fn unsupported_extensions_are_rejected() {
        assert!(parse_batch("tares.xlsx", b"").is_err());
        assert!(parse_batch("tares", b"").is_err());
    }
}
