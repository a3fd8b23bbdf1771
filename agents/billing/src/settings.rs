//! Billing configuration.

use std::path::PathBuf;
use std::time::Duration;

use derive_more::{AsRef, Deref};
use serde::Deserialize;

use gatehouse_base::settings::{load_settings, DefaultPorts, Settings};
use gatehouse_base::LoadableFromSettings;

/// Settings for `Billing`
#[derive(Debug, AsRef, Deref, Deserialize)]
#[serde(default)]
pub struct BillingSettings {
    #[as_ref]
    #[deref]
    #[serde(flatten)]
    base: Settings,

    /// Base URL of the weighbridge service.
    pub weighbridge: WeighbridgeEndpoint,
    /// Directory rate workbooks are staged in before upload.
    pub staging: PathBuf,
    /// Directory the current rate workbook artifact is kept in.
    pub data: PathBuf,
}

/// Where and how to reach the weighbridge.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeighbridgeEndpoint {
    /// Base URL, scheme and authority only.
    pub url: String,
    /// Per-request timeout in seconds.
    pub timeout: u64,
}

impl WeighbridgeEndpoint {
    /// The bounded timeout every outbound call uses.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for WeighbridgeEndpoint {
    fn default() -> Self {
        Self {
            url: "http://localhost:8081".into(),
            timeout: 5,
        }
    }
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            base: Settings::default(),
            weighbridge: WeighbridgeEndpoint::default(),
            staging: PathBuf::from("./in"),
            data: PathBuf::from("./data"),
        }
    }
}

impl LoadableFromSettings for BillingSettings {
    fn load() -> eyre::Result<Self> {
        load_settings(
            "billing",
            DefaultPorts {
                api: 8082,
                metrics: 9092,
            },
        )
    }
}
