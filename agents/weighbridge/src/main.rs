//! The weighbridge service is the authoritative log of weighings at the
//! produce station. Trucks weigh in loaded, weigh out empty, and the service
//! pairs the two into a session, computing the net produce weight once every
//! referenced container has a calibrated tare. Container calibrations arrive
//! later through batch ingest, at which point previously indeterminate
//! sessions are reconciled in place.

#![forbid(unsafe_code)]
#![warn(unused_extern_crates)]

use eyre::Result;

use gatehouse_base::agent_main;

use crate::agent::Weighbridge;

mod agent;
mod api;
mod db;
mod settings;
mod tare_ingest;
mod weighing;

#[tokio::main]
async fn main() -> Result<()> {
    agent_main::<Weighbridge>().await
}
