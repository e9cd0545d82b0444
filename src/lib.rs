use anyhow::Result;

pub mod cli;
pub mod config;
pub mod db;
pub mod display;
pub mod error;
pub mod fetch;
pub mod library;
pub mod logging;
pub mod manager;
pub mod models;
pub mod schema;

pub use crate::error::{ErrorKind, StoreError};
pub use crate::library::LibraryManager;
pub use crate::manager::UniversityManager;

use crate::config::Settings;

/// Opens a manager from `university.toml`, the `UNIVERSITY__*` environment, and `DATABASE_URL`.
///
/// The schema is created if it is missing, and the demonstration rows are written when
/// `database.seed` is set.
pub fn create_default_manager() -> Result<UniversityManager> {
    let settings = Settings::load()?;
    manager_from_settings(&settings)
}

pub fn manager_from_settings(settings: &Settings) -> Result<UniversityManager> {
    let mut manager = UniversityManager::connect(&settings.database)?;
    manager.create_schema()?;

    if settings.database.seed {
        manager.seed()?;
    }

    Ok(manager)
}

/// Opens the book catalog in the configured database, creating missing tables.
pub fn library_from_settings(settings: &Settings) -> Result<LibraryManager> {
    let mut connection = db::establish(&settings.database.url, settings.database.busy_timeout_ms)?;
    db::create_schema(&mut connection)?;
    Ok(LibraryManager::from_connection(connection))
}
