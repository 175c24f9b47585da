//! Relay configuration.
//!
//! Sources, later ones winning: built-in defaults, an optional
//! `config/default.{toml,yaml,json}` file, then `RELAY__SECTION__KEY`
//! environment variables (a `.env` file is read first).

mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{
    BrokerSettings, LogSettings, PersistenceSettings, ServerSettings, Settings, StoreBackend,
};

/// Loads the configuration from the default file and environment variables
/// and merges it over the defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    let _ = dotenvy::dotenv();
    load_config_from("config/default")
}

/// Same as [`load_config`] but reads the file source from `file_stem`.
pub fn load_config_from(file_stem: &str) -> Result<Settings, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name(file_stem).required(false))
        .add_source(
            Environment::with_prefix("RELAY")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let partial: PartialSettings = config.try_deserialize()?;
    Ok(Settings::merged(partial))
}

#[cfg(test)]
mod tests;
