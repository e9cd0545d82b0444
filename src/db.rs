//! Connection management, schema creation, and seed data.

use crate::error::Result;
use crate::models::{Enrollment, NewCourse, NewStudent};
use crate::schema;
use chrono::NaiveDate;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

/// The DDL for every table, safe to run against an existing database.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Opens the sqlite database at `database_url` and applies the per-connection settings.
pub fn establish(database_url: &str, busy_timeout_ms: u32) -> Result<SqliteConnection> {
    let mut connection = SqliteConnection::establish(database_url)?;
    configure(&mut connection, busy_timeout_ms)?;

    tracing::debug!(database_url, "opened database connection");
    Ok(connection)
}

/// Enables foreign keys (cascades depend on it), WAL journaling, and a bounded lock wait.
pub fn configure(connection: &mut SqliteConnection, busy_timeout_ms: u32) -> Result<()> {
    connection.batch_execute(&format!(
        "PRAGMA foreign_keys = ON; \
         PRAGMA journal_mode = WAL; \
         PRAGMA busy_timeout = {busy_timeout_ms};"
    ))?;
    Ok(())
}

/// Creates any missing tables and indexes.
pub fn create_schema(connection: &mut SqliteConnection) -> Result<()> {
    connection.batch_execute(SCHEMA_SQL)?;
    tracing::info!("schema ready");
    Ok(())
}

/// Writes the fixed demonstration rows into an empty database.
///
/// The seed uses fixed ids, so it is skipped entirely when any student, course, or
/// enrollment already exists. Returns the number of rows inserted.
pub fn seed(connection: &mut SqliteConnection) -> Result<usize> {
    let alice_birth = NaiveDate::from_ymd_opt(2000, 4, 12);
    let bob_birth = NaiveDate::from_ymd_opt(1999, 10, 3);

    let students = [
        (1, NewStudent {
            name: "Alice Ivanova".to_string(),
            email: "alice@example.com".to_string(),
            birth_date: alice_birth,
        }),
        (2, NewStudent {
            name: "Bob Petrov".to_string(),
            email: "bob@example.com".to_string(),
            birth_date: bob_birth,
        }),
    ];
    let courses = [
        (1, NewCourse::new("Algorithms", 3)),
        (2, NewCourse::new("Databases", 4)),
    ];
    let enrollments = [
        Enrollment {
            student_id: 1,
            course_id: 1,
        },
        Enrollment {
            student_id: 1,
            course_id: 2,
        },
        Enrollment {
            student_id: 2,
            course_id: 2,
        },
    ];

    connection.immediate_transaction(|conn| {
        let existing: i64 = schema::students::table.count().get_result::<i64>(conn)?
            + schema::courses::table.count().get_result::<i64>(conn)?
            + schema::enrollments::table.count().get_result::<i64>(conn)?;
        if existing > 0 {
            tracing::warn!(existing, "database already has rows, seed skipped");
            return Ok(0);
        }

        let mut inserted = 0;

        for (id, student) in &students {
            inserted += diesel::insert_into(schema::students::table)
                .values((schema::students::id.eq(id), student))
                .execute(conn)?;
        }

        for (id, course) in &courses {
            inserted += diesel::insert_into(schema::courses::table)
                .values((schema::courses::id.eq(id), course))
                .execute(conn)?;
        }

        inserted += diesel::insert_into(schema::enrollments::table)
            .values(&enrollments[..])
            .execute(conn)?;

        tracing::info!(inserted, "seed data written");
        Ok(inserted)
    })
}
