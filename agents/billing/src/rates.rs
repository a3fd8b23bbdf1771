//! Rate workbook handling: parse the staged XLSX, validate it against the
//! provider registry, replace the table wholesale, and keep the uploaded
//! artifact on disk so `GET /rates` can serve back exactly what was sent.

use std::io::Cursor;
use std::path::Path;

use calamine::{DataType, Reader, Xlsx};
use tracing::{info, instrument};

use gatehouse_base::ApiError;

use crate::db::{self, BillingDb, RateRow};

/// File name the current workbook artifact is kept under.
pub const RATES_ARTIFACT: &str = "rates.xlsx";

const EXPECTED_HEADER: [&str; 3] = ["Product", "Rate", "Scope"];

/// Ingest the staged workbook `file`: parse, validate, replace the rate
/// table in one transaction, then retain the artifact. Returns how many
/// rates were written.
#[instrument(skip(db, staging_dir, data_dir))]
pub async fn upload(
    db: &BillingDb,
    staging_dir: &Path,
    data_dir: &Path,
    file: &str,
) -> Result<usize, ApiError> {
    if file.is_empty() || file.contains('/') || file.contains('\\') || file.contains("..") {
        return Err(ApiError::validation("file must be a bare file name"));
    }
    if !file.ends_with(".xlsx") {
        return Err(ApiError::validation("rates file must be an .xlsx workbook"));
    }

    let path = staging_dir.join(file);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::validation(format!("file '{file}' not found in staging area")))?;
    let rows = parse_workbook(&bytes)?;

    // Every provider-scoped rate must point at a known provider.
    for row in &rows {
        if let Some(scope) = row.scope {
            if db.provider_by_id(scope).await?.is_none() {
                return Err(ApiError::validation(format!(
                    "rate for '{}' is scoped to unknown provider {scope}",
                    row.product
                )));
            }
        }
    }

    let _in_flight = db.track("replace_rates");
    let txn = db.begin().await?;
    db::replace_rates(&txn, &rows).await?;
    txn.commit().await?;

    tokio::fs::create_dir_all(data_dir).await.map_err(io_error)?;
    tokio::fs::write(data_dir.join(RATES_ARTIFACT), &bytes)
        .await
        .map_err(io_error)?;
    info!(rates = rows.len(), "Stored rate workbook");
    Ok(rows.len())
}

/// The last uploaded workbook, verbatim.
pub async fn download(data_dir: &Path) -> Result<Vec<u8>, ApiError> {
    tokio::fs::read(data_dir.join(RATES_ARTIFACT))
        .await
        .map_err(|_| ApiError::not_found("no rates have been uploaded yet"))
}

fn io_error(err: std::io::Error) -> ApiError {
    ApiError::Storage(sea_orm::DbErr::Custom(format!(
        "rates artifact not writable: {err}"
    )))
}

/// Parse workbook bytes: first sheet, header `Product, Rate, Scope`.
pub(crate) fn parse_workbook(bytes: &[u8]) -> Result<Vec<RateRow>, ApiError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|err| ApiError::validation(format!("unreadable workbook: {err}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ApiError::validation("workbook has no sheets"))?
        .map_err(|err| ApiError::validation(format!("unreadable sheet: {err}")))?;
    let rows: Vec<Vec<DataType>> = range.rows().map(|row| row.to_vec()).collect();
    rows_to_rates(&rows)
}

/// Turn sheet rows into rate rows. Split from the workbook reader so the
/// sheet grammar is testable without crafting zip containers.
pub(crate) fn rows_to_rates(rows: &[Vec<DataType>]) -> Result<Vec<RateRow>, ApiError> {
    let Some((header, records)) = rows.split_first() else {
        return Err(ApiError::validation("workbook sheet is empty"));
    };
    let header_names: Vec<String> = header
        .iter()
        .map(|cell| cell.to_string().trim().to_owned())
        .collect();
    if header_names.len() < EXPECTED_HEADER.len()
        || !EXPECTED_HEADER
            .iter()
            .zip(&header_names)
            .all(|(expected, got)| expected.eq_ignore_ascii_case(got))
    {
        return Err(ApiError::validation(
            "sheet header must be 'Product, Rate, Scope'",
        ));
    }

    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let row = index + 2; // 1-based, after the header
            let product = match record.first() {
                Some(DataType::String(name)) if !name.trim().is_empty() => {
                    name.trim().to_owned()
                }
                _ => {
                    return Err(ApiError::validation(format!(
                        "row {row}: product must be a non-empty string"
                    )))
                }
            };
            let rate = cell_as_int(record.get(1))
                .ok_or_else(|| ApiError::validation(format!("row {row}: rate must be an integer")))?;
            if rate < 0 {
                return Err(ApiError::validation(format!(
                    "row {row}: rate must not be negative"
                )));
            }
            let scope = parse_scope(record.get(2)).ok_or_else(|| {
                ApiError::validation(format!("row {row}: scope must be 'ALL' or a provider id"))
            })?;
            Ok(RateRow {
                product,
                rate,
                scope,
            })
        })
        .collect()
}

fn cell_as_int(cell: Option<&DataType>) -> Option<i64> {
    match cell {
        Some(DataType::Int(value)) => Some(*value),
        // Spreadsheet tools routinely store integers as floats.
        Some(DataType::Float(value)) if value.fract() == 0.0 => Some(*value as i64),
        Some(DataType::String(value)) => value.trim().parse().ok(),
        _ => None,
    }
}

// `None` inside `Some` is a real scope value (applies to all providers);
// the outer Option is parse success.
fn parse_scope(cell: Option<&DataType>) -> Option<Option<i32>> {
    match cell {
        Some(DataType::String(value)) if value.trim().eq_ignore_ascii_case("ALL") => Some(None),
        other => cell_as_int(other).and_then(|id| i32::try_from(id).ok()).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<DataType> {
        vec![
            DataType::String("Product".into()),
            DataType::String("Rate".into()),
            DataType::String("Scope".into()),
        ]
    }

    fn record(product: &str, rate: DataType, scope: DataType) -> Vec<DataType> {
        vec![DataType::String(product.into()), rate, scope]
    }

    #[test]
    fn all_scope_means_every_provider() {
        let rows = vec![
            header(),
            record("Apple", DataType::Float(100.0), DataType::String("ALL".into())),
            record("Tomato", DataType::Int(5), DataType::Int(3)),
        ];
        let rates = rows_to_rates(&rows).unwrap();
        assert_eq!(
            rates,
            vec![
                RateRow {
                    product: "Apple".into(),
                    rate: 100,
                    scope: None
                },
                RateRow {
                    product: "Tomato".into(),
                    rate: 5,
                    scope: Some(3)
                },
            ]
        );
    }

    #[test]
    fn malformed_sheets_are_rejected_wholesale() {
        // wrong header
        let rows = vec![record("Produce", DataType::String("Rate".into()), DataType::String("Scope".into()))];
        assert!(rows_to_rates(&rows).is_err());

        // non-integer rate
        let rows = vec![
            header(),
            record("Apple", DataType::Float(1.5), DataType::String("ALL".into())),
        ];
        assert!(rows_to_rates(&rows).is_err());

        // negative rate
        let rows = vec![
            header(),
            record("Apple", DataType::Int(-1), DataType::String("ALL".into())),
        ];
        assert!(rows_to_rates(&rows).is_err());

        // unusable scope
        let rows = vec![
            header(),
            record("Apple", DataType::Int(1), DataType::String("SOME".into())),
        ];
        assert!(rows_to_rates(&rows).is_err());

        // empty sheet
        assert!(rows_to_rates(&[]).is_err());
    }
}
