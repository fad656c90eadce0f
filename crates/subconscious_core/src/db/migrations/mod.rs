//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Hold schema migrations in strictly increasing version order.
//! - Apply each pending migration in its own transaction.
//!
//! # Invariants
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - A failed step rolls back alone; earlier steps stay committed.
//! - A database newer than the latest known version is never touched.

use log::{error, info};
use rusqlite::{Connection, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SchemaVersion = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub version: SchemaVersion,
    pub name: &'static str,
    pub sql: &'static str,
}

const DEFAULT_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "entries",
        sql: include_str!("0001_entries.sql"),
    },
    Migration {
        version: 2,
        name: "entry_search",
        sql: include_str!("0002_entry_search.sql"),
    },
    Migration {
        version: 3,
        name: "entry_links",
        sql: include_str!("0003_entry_links.sql"),
    },
    Migration {
        version: 4,
        name: "sync_info",
        sql: include_str!("0004_sync_info.sql"),
    },
    Migration {
        version: 5,
        name: "entry_origin",
        sql: include_str!("0005_entry_origin.sql"),
    },
];

#[derive(Debug)]
pub enum MigrationError {
    Sqlite(rusqlite::Error),
    StepFailed {
        version: SchemaVersion,
        name: &'static str,
        source: rusqlite::Error,
    },
    UnsupportedSchemaVersion {
        db_version: SchemaVersion,
        latest_supported: SchemaVersion,
    },
    InvalidMigrationOrder {
        previous: SchemaVersion,
        next: SchemaVersion,
    },
}

impl Display for MigrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::StepFailed {
                version,
                name,
                source,
            } => write!(f, "migration {version} ({name}) failed: {source}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InvalidMigrationOrder { previous, next } => write!(
                f,
                "migration {next} must have a version greater than {previous}"
            ),
        }
    }
}

impl Error for MigrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::StepFailed { source, .. } => Some(source),
            Self::UnsupportedSchemaVersion { .. } | Self::InvalidMigrationOrder { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for MigrationError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Ordered list of migrations.
#[derive(Debug, Clone)]
pub struct Migrations {
    steps: Vec<Migration>,
}

impl Migrations {
    /// Validates that versions start above zero and strictly increase.
    pub fn new(steps: Vec<Migration>) -> Result<Self, MigrationError> {
        let mut previous = 0;
        for step in &steps {
            if step.version <= previous {
                return Err(MigrationError::InvalidMigrationOrder {
                    previous,
                    next: step.version,
                });
            }
            previous = step.version;
        }
        Ok(Self { steps })
    }

    /// Index schema shipped with this crate.
    pub fn default_set() -> Self {
        Self {
            steps: DEFAULT_MIGRATIONS.to_vec(),
        }
    }

    pub fn steps(&self) -> &[Migration] {
        &self.steps
    }

    pub fn latest_version(&self) -> SchemaVersion {
        self.steps.last().map_or(0, |step| step.version)
    }
}

/// Latest schema version of the default migration set.
pub fn latest_version() -> SchemaVersion {
    DEFAULT_MIGRATIONS.last().map_or(0, |migration| migration.version)
}

pub fn current_version(conn: &Connection) -> Result<SchemaVersion, rusqlite::Error> {
    conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))
}

/// Applies the default migration set.
pub fn apply_migrations(conn: &mut Connection) -> Result<SchemaVersion, MigrationError> {
    migrate(conn, &Migrations::default_set())
}

/// Applies every step of `migrations` newer than the database version.
///
/// Returns the resulting schema version. Re-running is a no-op.
pub fn migrate(
    conn: &mut Connection,
    migrations: &Migrations,
) -> Result<SchemaVersion, MigrationError> {
    let current = current_version(conn)?;
    let latest = migrations.latest_version();

    if current > latest {
        error!(
            "event=db_migrate module=db status=error error_code=unsupported_schema db_version={} latest_supported={}",
            current, latest
        );
        return Err(MigrationError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }

    for step in migrations.steps().iter().filter(|step| step.version > current) {
        apply_step(conn, step)?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            step.version, step.name
        );
    }

    Ok(current.max(latest))
}

fn apply_step(conn: &mut Connection, step: &Migration) -> Result<(), MigrationError> {
    let step_failed = |source: rusqlite::Error| {
        error!(
            "event=db_migrate module=db status=error version={} name={} error={}",
            step.version, step.name, source
        );
        MigrationError::StepFailed {
            version: step.version,
            name: step.name,
            source,
        }
    };

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(step_failed)?;
    tx.execute_batch(step.sql).map_err(step_failed)?;
    tx.execute_batch(&format!("PRAGMA user_version = {};", step.version))
        .map_err(step_failed)?;
    tx.commit().map_err(step_failed)
}

#[cfg(test)]
mod tests {
    use super::{latest_version, Migration, MigrationError, Migrations};

    #[test]
    fn default_set_is_strictly_increasing() {
        let steps = Migrations::default_set().steps().to_vec();
        assert!(Migrations::new(steps).is_ok());
        assert_eq!(Migrations::default_set().latest_version(), latest_version());
    }

    #[test]
    fn rejects_out_of_order_versions() {
        let steps = vec![
            Migration {
                version: 2,
                name: "b",
                sql: "",
            },
            Migration {
                version: 2,
                name: "c",
                sql: "",
            },
        ];
        match Migrations::new(steps) {
            Err(MigrationError::InvalidMigrationOrder { previous, next }) => {
                assert_eq!((previous, next), (2, 2));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
