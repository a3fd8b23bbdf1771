use std::time::Duration;

use eyre::{eyre, Result};
use sea_orm::{Database, DbConn};
use tracing::{info, instrument, warn};

use crate::settings::DbSettings;

/// How many times to probe the database before giving up on startup.
pub const STARTUP_ATTEMPTS: u32 = 30;
/// Pause between startup probes.
pub const STARTUP_BACKOFF: Duration = Duration::from_secs(2);

/// Connect to the agent's database, waiting for it to become reachable.
///
/// Services regularly come up before their database container does, so the
/// connection is probed with a bounded retry before the agent is allowed to
/// accept traffic.
#[instrument(skip_all, fields(host = %settings.host, db = %settings.name))]
pub async fn connect(settings: &DbSettings) -> Result<DbConn> {
    let url = settings.url();
    for attempt in 1..=STARTUP_ATTEMPTS {
        match try_connect(&url).await {
            Ok(conn) => {
                info!(attempt, "database reachable");
                return Ok(conn);
            }
            Err(err) => {
                warn!(attempt, error = %err, "database not reachable yet");
            }
        }
        tokio::time::sleep(STARTUP_BACKOFF).await;
    }
    Err(eyre!(
        "database at {}:{} not reachable after {} attempts",
        settings.host,
        settings.port,
        STARTUP_ATTEMPTS
    ))
}

async fn try_connect(url: &str) -> Result<DbConn, sea_orm::DbErr> {
    let conn = Database::connect(url).await?;
    conn.ping().await?;
    Ok(conn)
}
