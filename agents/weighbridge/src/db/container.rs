use std::collections::{HashMap, HashSet};

use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::*, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, Insert, QueryFilter,
};
use tracing::debug;

use gatehouse_core::WeightUnit;

use super::generated::container;
use super::WeighDb;

/// A calibrated container tare as delivered by a batch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TareRecord {
    /// Canonical container id.
    pub id: String,
    /// Weight in `unit`.
    pub weight: i64,
    /// Unit the calibration was taken in.
    pub unit: WeightUnit,
}

fn tare_kg(model: &container::Model) -> Result<i64, DbErr> {
    let unit: WeightUnit = model
        .unit
        .parse()
        .map_err(|_| DbErr::Custom(format!("container {} has corrupt unit", model.container_id)))?;
    Ok(unit.to_kg(model.weight))
}

/// Registered tares for `ids`, converted to kg. Unregistered ids are simply
/// absent from the map.
pub async fn tares_for<C: ConnectionTrait>(
    conn: &C,
    ids: impl IntoIterator<Item = &str>,
) -> Result<HashMap<String, i64>, DbErr> {
    let models = container::Entity::find()
        .filter(container::Column::ContainerId.is_in(ids.into_iter().map(str::to_owned)))
        .all(conn)
        .await?;
    models
        .into_iter()
        .map(|model| Ok((model.container_id.clone(), tare_kg(&model)?)))
        .collect()
}

/// Total registered tare of `ids` in kg, or `None` when any id is missing
/// from the registry. An empty list weighs nothing.
pub async fn tare_sum<C: ConnectionTrait>(
    conn: &C,
    ids: &[String],
) -> Result<Option<i64>, DbErr> {
    if ids.is_empty() {
        return Ok(Some(0));
    }
    let tares = tares_for(conn, ids.iter().map(String::as_str)).await?;
    Ok(ids.iter().map(|id| tares.get(id).copied()).sum())
}

/// Register a batch of tares. Re-ingesting an id overwrites it: the newest
/// calibration wins.
pub async fn upsert_tares<C: ConnectionTrait>(
    conn: &C,
    records: &[TareRecord],
) -> Result<(), DbErr> {
    if records.is_empty() {
        return Ok(());
    }
    let models = records
        .iter()
        .map(|record| container::ActiveModel {
            container_id: Set(record.id.clone()),
            weight: Set(record.weight),
            unit: Set(record.unit.to_string()),
        })
        .collect::<Vec<_>>();

    debug!(containers = models.len(), "Writing container tares to database");
    Insert::many(models)
        .on_conflict(
            OnConflict::column(container::Column::ContainerId)
                .update_columns([container::Column::Weight, container::Column::Unit])
                .to_owned(),
        )
        .exec(conn)
        .await?;
    Ok(())
}

impl WeighDb {
    /// Registered tare of one container in kg, if known.
    pub async fn container_tare_kg(&self, id: &str) -> Result<Option<i64>, DbErr> {
        let _in_flight = self.track("container_tare_kg");
        container::Entity::find_by_id(id)
            .one(self.conn())
            .await?
            .map(|model| tare_kg(&model))
            .transpose()
    }

    /// Every id present in the registry.
    pub async fn registered_container_ids(&self) -> Result<HashSet<String>, DbErr> {
        let _in_flight = self.track("registered_container_ids");
        Ok(container::Entity::find()
            .all(self.conn())
            .await?
            .into_iter()
            .map(|model| model.container_id)
            .collect())
    }
}
