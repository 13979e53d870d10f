//! Layered configuration: an optional `config/default.*` file under
//! `PUBTRIE__`-prefixed environment variables, merged over defaults.

mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{BrokerSettings, LogSettings, ServerSettings, Settings};

/// Prefix of environment overrides, e.g. `PUBTRIE__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "PUBTRIE";

/// Loads the configuration from the default file and environment variables
/// and merges it with `Settings::default()`.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let default = Settings::default();

    Ok(Settings {
        server: ServerSettings {
            host: partial
                .server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: partial
                .server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
        },
        broker: BrokerSettings {
            prune_on_disconnect: partial
                .broker
                .as_ref()
                .and_then(|b| b.prune_on_disconnect)
                .unwrap_or(default.broker.prune_on_disconnect),
        },
        log: LogSettings {
            level: partial
                .log
                .as_ref()
                .and_then(|l| l.level.clone())
                .unwrap_or(default.log.level),
        },
    })
}
