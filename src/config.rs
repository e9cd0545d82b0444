//! Runtime settings.
//!
//! Values are layered: built-in defaults, then an optional `university.toml`, then
//! `UNIVERSITY__*` environment variables (for example `UNIVERSITY__DATABASE__URL`). A
//! `DATABASE_URL` variable, possibly loaded from `.env`, overrides the database URL last.

use config::{Config, Environment, File};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Path of the sqlite database file.
    pub url: String,

    /// How long a connection waits for the write lock before giving up.
    pub busy_timeout_ms: u32,

    /// Whether `setup` should write the fixed seed rows.
    pub seed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Settings {
    /// Loads settings from `university.toml` in the working directory and the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("university")
    }

    /// Loads settings from the given config file stem, which does not need to exist.
    pub fn load_from(file_stem: &str) -> Result<Self, config::ConfigError> {
        dotenv().ok();

        let mut builder = Config::builder()
            .set_default("database.url", "university.db")?
            .set_default("database.busy_timeout_ms", 5000)?
            .set_default("database.seed", false)?
            .set_default("logging.level", "info")?
            .add_source(File::with_name(file_stem).required(false))
            .add_source(Environment::with_prefix("UNIVERSITY").separator("__"));

        if let Ok(url) = env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }

        builder.build()?.try_deserialize()
    }
}
