use sea_orm::{
    ActiveValue::*, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};
use tracing::info;

use gatehouse_base::ApiError;

use super::generated::provider;
use super::BillingDb;

/// Create a provider with a globally unique, non-empty name.
pub async fn create_provider<C: ConnectionTrait>(
    conn: &C,
    name: &str,
) -> Result<provider::Model, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("provider name must not be empty"));
    }
    if find_by_name(conn, name).await?.is_some() {
        return Err(ApiError::conflict(format!(
            "provider '{name}' already exists"
        )));
    }

    let res = provider::Entity::insert(provider::ActiveModel {
        id: NotSet,
        name: Set(name.to_owned()),
    })
    .exec(conn)
    .await?;
    info!(id = res.last_insert_id, name, "Created provider");
    Ok(provider::Model {
        id: res.last_insert_id,
        name: name.to_owned(),
    })
}

/// Rename a provider. The new name must not collide.
pub async fn rename_provider<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    name: &str,
) -> Result<provider::Model, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("provider name must not be empty"));
    }
    let existing = provider::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no provider with id {id}")))?;
    if let Some(collision) = find_by_name(conn, name).await? {
        if collision.id != id {
            return Err(ApiError::validation(format!(
                "provider '{name}' already exists"
            )));
        }
    }

    let mut active: provider::ActiveModel = existing.into();
    active.name = Set(name.to_owned());
    let updated = provider::Entity::update(active).exec(conn).await?;
    Ok(updated)
}

async fn find_by_name<C: ConnectionTrait>(
    conn: &C,
    name: &str,
) -> Result<Option<provider::Model>, ApiError> {
    Ok(provider::Entity::find()
        .filter(provider::Column::Name.eq(name))
        .one(conn)
        .await?)
}

impl BillingDb {
    /// Fetch a provider by id.
    pub async fn provider_by_id(&self, id: i32) -> Result<Option<provider::Model>, ApiError> {
        let _in_flight = self.track("provider_by_id");
        Ok(provider::Entity::find_by_id(id).one(self.conn()).await?)
    }
}
