//! Event log migrations for `logs.duckdb`
//!
//! Kept apart from the record migrations so the log database can be deleted
//! or rotated without touching user data.

/// Log migrations in application order: (filename, sql_content)
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
