//! Ledger schema and its versioned upgrades.
//!
//! Applied versions are recorded in `schema_migrations`; opening a store runs
//! every step above the recorded version inside one transaction.
//!
//! The tables emulate nested key-value namespaces:
//!
//! ```text
//! instances      instance                      (top-level namespace)
//! instance_keys  instance / key       -> value (reserved credential keys)
//! accounts       instance / account            (nested namespace)
//! entries        instance / account / post -> value
//! ```
//!
//! Account and post keys are varints, see [`vbc_core::varint`].

use rusqlite::Connection;

use crate::error::{LedgerError, Result};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Bring the schema up to [`CURRENT_VERSION`].
///
/// A no-op on an up-to-date store. Refuses stores written by a newer release.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(LedgerError::Migration(format!(
            "store schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, chrono::Utc::now().timestamp_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(version = CURRENT_VERSION, "ledger schema migrated");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(LedgerError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// v1: instances, reserved keys, accounts, entries.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Top-level namespace: one row per canonical source instance
        CREATE TABLE instances (
            instance TEXT PRIMARY KEY,          -- canonical https URL
            created_at INTEGER NOT NULL
        );

        -- Reserved keys directly under an instance (application credentials)
        CREATE TABLE instance_keys (
            instance TEXT NOT NULL,
            key BLOB NOT NULL,                  -- e.g. '`appId'
            value BLOB NOT NULL,
            PRIMARY KEY (instance, key)
        );

        -- Nested namespace: one row per bootstrapped account
        CREATE TABLE accounts (
            instance TEXT NOT NULL,
            account_key BLOB NOT NULL,          -- account ID varint
            bootstrapped_at INTEGER NOT NULL,
            PRIMARY KEY (instance, account_key)
        );

        -- Dedupe entries
        CREATE TABLE entries (
            instance TEXT NOT NULL,
            account_key BLOB NOT NULL,
            post_key BLOB NOT NULL,             -- post ID varint
            value BLOB NOT NULL,                -- empty = sentinel, else record JSON
            recorded_at INTEGER NOT NULL,
            PRIMARY KEY (instance, account_key, post_key)
        );
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"instances".to_string()));
        assert!(tables.contains(&"instance_keys".to_string()));
        assert!(tables.contains(&"accounts".to_string()));
        assert!(tables.contains(&"entries".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (99, 0)",
            [],
        )
        .unwrap();

        assert!(matches!(migrate(&mut conn), Err(LedgerError::Migration(_))));
    }
}
