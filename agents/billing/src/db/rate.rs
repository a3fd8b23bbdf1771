use sea_orm::{ActiveValue::*, ConnectionTrait, EntityTrait, Insert, QueryOrder};
use tracing::info;

use gatehouse_base::ApiError;

use super::generated::rate;
use super::BillingDb;

/// One parsed row of a rate workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateRow {
    /// Produce tag.
    pub product: String,
    /// Agorot per kg.
    pub rate: i64,
    /// Provider the rate is scoped to; `None` applies to all.
    pub scope: Option<i32>,
}

/// Atomically replace the whole rate table with a new upload. Runs inside
/// the caller's transaction so a failure leaves the previous table intact.
pub async fn replace_rates<C: ConnectionTrait>(
    conn: &C,
    rows: &[RateRow],
) -> Result<(), ApiError> {
    rate::Entity::delete_many().exec(conn).await?;
    if !rows.is_empty() {
        let models = rows
            .iter()
            .map(|row| rate::ActiveModel {
                id: NotSet,
                product: Set(row.product.clone()),
                rate: Set(row.rate),
                scope: Set(row.scope),
            })
            .collect::<Vec<_>>();
        Insert::many(models).exec(conn).await?;
    }
    info!(rates = rows.len(), "Replaced rate table");
    Ok(())
}

impl BillingDb {
    /// The whole current rate table.
    pub async fn all_rates(&self) -> Result<Vec<rate::Model>, ApiError> {
        let _in_flight = self.track("all_rates");
        Ok(rate::Entity::find()
            .order_by_asc(rate::Column::Id)
            .all(self.conn())
            .await?)
    }
}
