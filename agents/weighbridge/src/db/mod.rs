use std::sync::Arc;

pub use container::*;
use sea_orm::{DatabaseTransaction, DbConn, DbErr, IsolationLevel, TransactionTrait};
pub use transaction::*;

use gatehouse_base::{CoreMetrics, InFlightGuard};

#[allow(clippy::all)]
mod generated;

// Row shape of the transaction log, shared with the state machine.
pub(crate) use generated::transaction::Model as Transaction;

// These modules implement the queries of the WeighDb
mod container;
mod transaction;

/// Database interface of the weighbridge. The transaction log and the
/// container registry live here and nowhere else.
#[derive(Clone, Debug)]
pub struct WeighDb {
    conn: DbConn,
    metrics: Arc<CoreMetrics>,
}

impl WeighDb {
    /// Wrap an established connection.
    pub fn new(conn: DbConn, metrics: Arc<CoreMetrics>) -> Self {
        Self { conn, metrics }
    }

    /// Check that the database is reachable.
    pub async fn ping(&self) -> Result<(), DbErr> {
        let _in_flight = self.track("ping");
        self.conn.ping().await
    }

    /// Open a plain transaction.
    pub async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        self.conn.begin().await
    }

    /// Open a serializable transaction. Weight ingest races with itself on
    /// the same truck; the conflict check, optional delete, insert and
    /// back-fill must observe a single consistent snapshot.
    pub async fn begin_serializable(&self) -> Result<DatabaseTransaction, DbErr> {
        self.conn
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await
    }

    // Gauge one operation as holding a connection until the guard drops.
    pub(crate) fn track(&self, operation: &str) -> InFlightGuard {
        self.metrics.track_db_operation(operation)
    }

    pub(crate) fn conn(&self) -> &DbConn {
        &self.conn
    }
}
