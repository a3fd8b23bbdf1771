//! The billing service prices what the weighbridge weighs. It owns the
//! provider registry, the truck→provider mapping and the produce rate table,
//! and assembles per-provider bills for a time window by fanning out to the
//! weighbridge. A weighbridge hiccup never fails a whole bill; whatever could
//! be gathered is billed.

#![forbid(unsafe_code)]
#![warn(unused_extern_crates)]

use eyre::Result;

use gatehouse_base::agent_main;

use crate::agent::Billing;

mod agent;
mod api;
mod bill;
mod db;
mod rates;
mod settings;
mod weigh_client;

#[tokio::main]
async fn main() -> Result<()> {
    agent_main::<Billing>().await
}
