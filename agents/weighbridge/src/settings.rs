//! Weighbridge configuration.

use std::path::PathBuf;

use derive_more::{AsRef, Deref};
use serde::Deserialize;

use gatehouse_base::settings::{load_settings, DefaultPorts, Settings};
use gatehouse_base::LoadableFromSettings;

/// Settings for `Weighbridge`
#[derive(Debug, AsRef, Deref, Deserialize)]
#[serde(default)]
pub struct WeighbridgeSettings {
    #[as_ref]
    #[deref]
    #[serde(flatten)]
    base: Settings,

    /// Directory batch tare files are staged in before ingest.
    pub staging: PathBuf,
}

impl Default for WeighbridgeSettings {
    fn default() -> Self {
        Self {
            base: Settings::default(),
            staging: PathBuf::from("./in"),
        }
    }
}

impl LoadableFromSettings for WeighbridgeSettings {
    fn load() -> eyre::Result<Self> {
        load_settings(
            "weighbridge",
            DefaultPorts {
                api: 8081,
                metrics: 9091,
            },
        )
    }
}
