use std::collections::BTreeSet;

use sea_orm::{
    ActiveValue::*, ColumnTrait, ConnectionTrait, DbErr, DeriveColumn, EntityTrait, EnumIter,
    Order, QueryFilter, QueryOrder, QuerySelect,
};
use sea_orm::prelude::TimeDateTime;
use sea_orm::sea_query::Expr;
use tracing::{debug, trace};

use gatehouse_core::{parse_container_list, Direction};

use super::generated::transaction;
use super::WeighDb;

/// A transaction row ready for insertion.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub recorded_at: TimeDateTime,
    pub direction: Direction,
    pub truck: Option<String>,
    /// Canonical comma-joined list.
    pub containers: String,
    pub bruto: i64,
    pub truck_tara: Option<i64>,
    pub neto: Option<i64>,
    pub produce: String,
}

/// The most recent transaction recorded for `truck`, any direction.
pub async fn latest_for_truck<C: ConnectionTrait>(
    conn: &C,
    truck: &str,
) -> Result<Option<transaction::Model>, DbErr> {
    transaction::Entity::find()
        .filter(transaction::Column::Truck.eq(truck))
        .order_by_desc(transaction::Column::Id)
        .one(conn)
        .await
}

/// The globally latest transaction, any truck, any direction.
pub async fn latest_any<C: ConnectionTrait>(
    conn: &C,
) -> Result<Option<transaction::Model>, DbErr> {
    transaction::Entity::find()
        .order_by_desc(transaction::Column::Id)
        .one(conn)
        .await
}

/// The `in` row a transaction with `before_id` pairs with.
pub async fn paired_in_before<C: ConnectionTrait>(
    conn: &C,
    truck: &str,
    before_id: i64,
) -> Result<Option<transaction::Model>, DbErr> {
    transaction::Entity::find()
        .filter(transaction::Column::Truck.eq(truck))
        .filter(transaction::Column::Direction.eq(Direction::In.as_str()))
        .filter(transaction::Column::Id.lt(before_id))
        .order_by_desc(transaction::Column::Id)
        .one(conn)
        .await
}

/// Delete a row outright. Only forced overwrites do this.
pub async fn delete_row<C: ConnectionTrait>(conn: &C, id: i64) -> Result<(), DbErr> {
    let res = transaction::Entity::delete_by_id(id).exec(conn).await?;
    debug!(id, rows = res.rows_affected, "Deleted overridden transaction");
    Ok(())
}

/// Insert a new transaction row, returning its id.
pub async fn insert<C: ConnectionTrait>(conn: &C, row: NewTransaction) -> Result<i64, DbErr> {
    let model = transaction::ActiveModel {
        id: NotSet,
        recorded_at: Set(row.recorded_at),
        direction: Set(row.direction.to_string()),
        truck: Set(row.truck),
        containers: Set(row.containers),
        bruto: Set(row.bruto),
        truck_tara: Set(row.truck_tara),
        neto: Set(row.neto),
        produce: Set(row.produce),
    };
    trace!(?model, "Writing transaction to database");
    let res = transaction::Entity::insert(model).exec(conn).await?;
    Ok(res.last_insert_id)
}

/// Back-fill the paired `in` row when its cycle closes.
pub async fn close_session<C: ConnectionTrait>(
    conn: &C,
    session_id: i64,
    truck_tara: i64,
    neto: Option<i64>,
) -> Result<(), DbErr> {
    transaction::Entity::update_many()
        .col_expr(transaction::Column::TruckTara, Expr::value(truck_tara))
        .col_expr(transaction::Column::Neto, Expr::value(neto))
        .filter(transaction::Column::Id.eq(session_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Set the neto of a previously indeterminate row.
pub async fn set_neto<C: ConnectionTrait>(conn: &C, id: i64, neto: i64) -> Result<(), DbErr> {
    transaction::Entity::update_many()
        .col_expr(transaction::Column::Neto, Expr::value(neto))
        .filter(transaction::Column::Id.eq(id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Rows whose neto is still indeterminate and could be resolved by a tare
/// batch: `out` and `none` rows referencing at least one container.
pub async fn unresolved_rows<C: ConnectionTrait>(
    conn: &C,
) -> Result<Vec<transaction::Model>, DbErr> {
    transaction::Entity::find()
        .filter(transaction::Column::Neto.is_null())
        .filter(
            transaction::Column::Direction
                .is_in([Direction::Out.as_str(), Direction::None.as_str()]),
        )
        .filter(transaction::Column::Containers.ne(""))
        .order_by_asc(transaction::Column::Id)
        .all(conn)
        .await
}

impl WeighDb {
    /// All rows inside the window whose direction is in `directions`.
    pub async fn rows_in_window(
        &self,
        from: TimeDateTime,
        to: TimeDateTime,
        directions: &[Direction],
    ) -> Result<Vec<transaction::Model>, DbErr> {
        let _in_flight = self.track("rows_in_window");
        transaction::Entity::find()
            .filter(transaction::Column::RecordedAt.between(from, to))
            .filter(
                transaction::Column::Direction
                    .is_in(directions.iter().map(Direction::as_str)),
            )
            .order_by_asc(transaction::Column::Id)
            .all(self.conn())
            .await
    }

    /// Fetch one row by id.
    pub async fn find_row(&self, id: i64) -> Result<Option<transaction::Model>, DbErr> {
        let _in_flight = self.track("find_row");
        transaction::Entity::find_by_id(id).one(self.conn()).await
    }

    /// Whether `truck` has ever been weighed.
    pub async fn truck_appears(&self, truck: &str) -> Result<bool, DbErr> {
        let _in_flight = self.track("truck_appears");
        Ok(transaction::Entity::find()
            .filter(transaction::Column::Truck.eq(truck))
            .limit(1)
            .one(self.conn())
            .await?
            .is_some())
    }

    /// Ids of `in` rows for `truck` inside the window.
    pub async fn in_sessions_for_truck(
        &self,
        truck: &str,
        from: TimeDateTime,
        to: TimeDateTime,
    ) -> Result<Vec<i64>, DbErr> {
        let _in_flight = self.track("in_sessions_for_truck");
        #[derive(Copy, Clone, Debug, EnumIter, DeriveColumn)]
        enum QueryAs {
            Id,
        }

        transaction::Entity::find()
            .filter(transaction::Column::Truck.eq(truck))
            .filter(transaction::Column::Direction.eq(Direction::In.as_str()))
            .filter(transaction::Column::RecordedAt.between(from, to))
            .order_by(transaction::Column::Id, Order::Asc)
            .select_only()
            .column_as(transaction::Column::Id, QueryAs::Id)
            .into_values::<i64, QueryAs>()
            .all(self.conn())
            .await
    }

    /// The last observed empty weight of `truck`, if any cycle ever closed.
    pub async fn last_known_truck_tara(&self, truck: &str) -> Result<Option<i64>, DbErr> {
        let _in_flight = self.track("last_known_truck_tara");
        Ok(transaction::Entity::find()
            .filter(transaction::Column::Truck.eq(truck))
            .filter(transaction::Column::TruckTara.is_not_null())
            .order_by_desc(transaction::Column::Id)
            .one(self.conn())
            .await?
            .and_then(|model| model.truck_tara))
    }

    /// Rows inside the window that can reference containers (`in` and `none`).
    /// Membership of a specific container is decided by the caller after
    /// splitting the stored list.
    pub async fn container_rows_in_window(
        &self,
        from: TimeDateTime,
        to: TimeDateTime,
    ) -> Result<Vec<transaction::Model>, DbErr> {
        let _in_flight = self.track("container_rows_in_window");
        transaction::Entity::find()
            .filter(
                transaction::Column::Direction
                    .is_in([Direction::In.as_str(), Direction::None.as_str()]),
            )
            .filter(transaction::Column::RecordedAt.between(from, to))
            .order_by_asc(transaction::Column::Id)
            .all(self.conn())
            .await
    }

    /// Every container id referenced by any transaction, sorted.
    pub async fn referenced_container_ids(&self) -> Result<BTreeSet<String>, DbErr> {
        let _in_flight = self.track("referenced_container_ids");
        #[derive(Copy, Clone, Debug, EnumIter, DeriveColumn)]
        enum QueryAs {
            Containers,
        }

        let lists = transaction::Entity::find()
            .filter(transaction::Column::Containers.ne(""))
            .select_only()
            .column_as(transaction::Column::Containers, QueryAs::Containers)
            .into_values::<String, QueryAs>()
            .all(self.conn())
            .await?;

        Ok(lists
            .iter()
            .flat_map(|list| parse_container_list(list))
            .collect())
    }
}
