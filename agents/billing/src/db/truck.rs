use sea_orm::{ActiveValue::*, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::info;

use gatehouse_base::ApiError;

use super::generated::{provider, truck};
use super::BillingDb;

/// Register a truck under an existing provider.
pub async fn register_truck<C: ConnectionTrait>(
    conn: &C,
    id: &str,
    provider_id: i32,
) -> Result<truck::Model, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::validation("truck id must not be empty"));
    }
    require_provider(conn, provider_id).await?;
    if truck::Entity::find_by_id(id).one(conn).await?.is_some() {
        return Err(ApiError::validation(format!(
            "truck '{id}' is already registered"
        )));
    }

    let model = truck::Model {
        id: id.to_owned(),
        provider_id,
    };
    truck::Entity::insert(truck::ActiveModel {
        id: Set(model.id.clone()),
        provider_id: Set(provider_id),
    })
    .exec(conn)
    .await?;
    info!(truck = id, provider_id, "Registered truck");
    Ok(model)
}

/// Move a truck to a different provider. The only mutation trucks have.
pub async fn reassign_truck<C: ConnectionTrait>(
    conn: &C,
    id: &str,
    provider_id: i32,
) -> Result<truck::Model, ApiError> {
    require_provider(conn, provider_id).await?;
    let existing = truck::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no truck with id '{id}'")))?;

    let mut active: truck::ActiveModel = existing.into();
    active.provider_id = Set(provider_id);
    let updated = truck::Entity::update(active).exec(conn).await?;
    Ok(updated)
}

async fn require_provider<C: ConnectionTrait>(conn: &C, id: i32) -> Result<(), ApiError> {
    provider::Entity::find_by_id(id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found(format!("no provider with id {id}")))
}

impl BillingDb {
    /// Fetch a truck by id.
    pub async fn truck_by_id(&self, id: &str) -> Result<Option<truck::Model>, ApiError> {
        let _in_flight = self.track("truck_by_id");
        Ok(truck::Entity::find_by_id(id).one(self.conn()).await?)
    }

    /// Every truck a provider owns, stable order.
    pub async fn trucks_for_provider(
        &self,
        provider_id: i32,
    ) -> Result<Vec<truck::Model>, ApiError> {
        let _in_flight = self.track("trucks_for_provider");
        Ok(truck::Entity::find()
            .filter(truck::Column::ProviderId.eq(provider_id))
            .order_by_asc(truck::Column::Id)
            .all(self.conn())
            .await?)
    }
}
