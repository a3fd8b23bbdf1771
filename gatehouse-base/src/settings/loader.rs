//! Load a settings object from the config locations.

use std::env;

use config::{Config, Environment, File};
use serde::de::DeserializeOwned;

/// Ports an agent binds by default, overridable like any other setting.
#[derive(Debug, Clone, Copy)]
pub struct DefaultPorts {
    /// Default public API port.
    pub api: u16,
    /// Default metrics port.
    pub metrics: u16,
}

/// Read settings for `agent` from the config file and/or env.
///
/// The optional config file is located at `./config/<RUN_ENV>/<agent>.json`
/// (`RUN_ENV` defaults to `default`). Env vars prefixed `GH_BASE_` apply to
/// all agents; vars prefixed `GH_<AGENT>_` apply to this one and win. Env var
/// names map onto the settings hierarchy with `_` as the separator, e.g.
/// `GH_BASE_DB_PASSWORD` overrides `db.password`.
pub fn load_settings<T: DeserializeOwned>(agent: &str, ports: DefaultPorts) -> eyre::Result<T> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "default".into());
    let prefix = format!("GH_{}", agent).to_ascii_uppercase();

    let config_deserializer = Config::builder()
        // Baked-in defaults that depend on which agent is loading.
        .set_default("db.name", agent)?
        .set_default("api.port", i64::from(ports.api))?
        .set_default("metrics.port", i64::from(ports.metrics))?
        .add_source(File::with_name(&format!("./config/{run_env}/{agent}")).required(false))
        // Use a base configuration env variable prefix
        .add_source(
            Environment::with_prefix("GH_BASE")
                .separator("_")
                .try_parsing(true),
        )
        .add_source(Environment::with_prefix(&prefix).separator("_").try_parsing(true))
        .build()?;

    Ok(serde_path_to_error::deserialize(config_deserializer)?)
}
