//! Creates the schema and, when `database.seed` is set or `--seed` is given, writes the
//! demonstration rows.

use anyhow::Result;
use university::config::Settings;
use university::{UniversityManager, display, logging};

pub fn main() -> Result<()> {
    let settings = Settings::load()?;
    logging::init(&settings.logging.level);

    let seed = settings.database.seed || std::env::args().any(|arg| arg == "--seed");

    let mut manager = UniversityManager::connect(&settings.database)?;
    manager.create_schema()?;

    if seed {
        let inserted = manager.seed()?;
        println!("Seeded {inserted} new row(s) into {}.", settings.database.url);
    }

    display::show_students(&manager.students()?);
    display::show_courses(&manager.courses()?);

    Ok(())
}
