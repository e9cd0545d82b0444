//! Imports students from a CSV file.
//!
//! The file needs `name` and `email` columns and may have a `birth_date` column in
//! `YYYY-MM-DD` form. Every row is validated first, and the whole file is inserted in one
//! transaction.

use anyhow::{Context, Result, bail};
use university::config::Settings;
use university::display;
use university::logging;
use university::models::NewStudent;

/// The file read when no path is given.
const DEFAULT_CSV_PATH: &str = "students.csv";

fn read_students(path: &str) -> Result<Vec<NewStudent>> {
    let mut reader = csv::Reader::from_path(path).with_context(|| format!("opening {path}"))?;

    let mut students = Vec::new();
    for (line, record) in reader.deserialize::<NewStudent>().enumerate() {
        let student = record.with_context(|| format!("reading row {} of {path}", line + 1))?;
        students.push(student);
    }

    Ok(students)
}

pub fn main() -> Result<()> {
    let settings = Settings::load()?;
    logging::init(&settings.logging.level);

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CSV_PATH.to_string());

    let students = read_students(&path)?;
    if students.is_empty() {
        bail!("{path} has no students");
    }

    let mut manager = university::manager_from_settings(&settings)?;
    let inserted = manager.insert_students(&students)?;
    println!("Imported {} student(s):", inserted.len());
    display::show_students(&inserted);

    Ok(())
}
