//! Log database migrations, embedded at compile time with include_str!
//!
//! Each entry is (filename, sql). Entries are applied in order.

/// Add new migrations as NNN_description.sql and list them here in order.
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];
