use std::sync::Arc;

pub use provider::*;
pub use rate::*;
use sea_orm::{DatabaseTransaction, DbConn, DbErr, TransactionTrait};
pub use truck::*;

use gatehouse_base::{CoreMetrics, InFlightGuard};

#[allow(clippy::all)]
mod generated;

// Row shape shared with the aggregation code.
pub(crate) use generated::rate::Model as Rate;

// These modules implement the queries of the BillingDb
mod provider;
mod rate;
mod truck;

/// Database interface of the billing service: providers, trucks and the rate
/// table. The weighbridge's tables are never touched from here.
#[derive(Clone, Debug)]
pub struct BillingDb {
    conn: DbConn,
    metrics: Arc<CoreMetrics>,
}

impl BillingDb {
    /// Wrap an established connection.
    pub fn new(conn: DbConn, metrics: Arc<CoreMetrics>) -> Self {
        Self { conn, metrics }
    }

    /// Check that the database is reachable.
    pub async fn ping(&self) -> Result<(), DbErr> {
        let _in_flight = self.track("ping");
        self.conn.ping().await
    }

    /// Open a transaction; write surfaces are check-then-write.
    pub async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        self.conn.begin().await
    }

    // Gauge one operation as holding a connection until the guard drops.
    pub(crate) fn track(&self, operation: &str) -> InFlightGuard {
        self.metrics.track_db_operation(operation)
    }

    pub(crate) fn conn(&self) -> &DbConn {
        &self.conn
    }
}
