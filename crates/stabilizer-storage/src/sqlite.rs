//! SQLite implementation of [`GraphStore`].
//!
//! [`SqliteStore`] keeps one row per real package. Sentinels never get a row:
//! a dependency on a sentinel stores the sentinel's atom in `sentinel_cpv`,
//! and loading materializes a fresh sentinel record for each such row. Row
//! ids are only used for edge references. Every save rewrites all tables in
//! one transaction.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StorageError;
use crate::snapshot::{PackageRecord, PriorityRecord, Snapshot};
use crate::traits::GraphStore;

const SENTINEL_STATE: i64 = 2;

/// SQLite-backed implementation of [`GraphStore`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteStore { conn })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore { conn })
    }

    /// Number of saves recorded in the database.
    pub fn save_count(&self) -> Result<u64, StorageError> {
        let count: Option<i64> = self
            .conn
            .query_row("SELECT save_count FROM snapshot_meta WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(count.unwrap_or(0).max(0) as u64)
    }
}

fn to_i64(value: u64, what: &str) -> Result<i64, StorageError> {
    i64::try_from(value).map_err(|_| StorageError::Integrity {
        reason: format!("{what} {value} does not fit in an INTEGER column"),
    })
}

impl GraphStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn load(&self) -> Result<Option<Snapshot>, StorageError> {
        if self.save_count()? == 0 {
            return Ok(None);
        }

        // Real packages, in row order.
        let mut stmt = self.conn.prepare(
            "SELECT id, atom, state, use_flags, num_stable FROM packages ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut packages = Vec::new();
        let mut positions: HashMap<i64, usize> = HashMap::new();
        for row in rows {
            let (id, cpv, state, use_flags, num_stable) = row?;
            positions.insert(id, packages.len());
            packages.push(PackageRecord {
                cpv,
                indices: Vec::new(),
                use_flags: serde_json::from_str(&use_flags)?,
                num_stable: usize::try_from(num_stable).map_err(|_| StorageError::Integrity {
                    reason: format!("package row {id} has negative num_stable {num_stable}"),
                })?,
                state,
            });
        }

        // Dependencies; each sentinel reference becomes its own record.
        let mut stmt = self.conn.prepare(
            "SELECT package_id, target_id, sentinel_cpv FROM dependencies
             ORDER BY package_id, ordinal",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<i64>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;
        for row in rows {
            let (package_id, target_id, sentinel_cpv) = row?;
            let parent = *positions.get(&package_id).ok_or_else(|| StorageError::Integrity {
                reason: format!("dependency row references missing package {package_id}"),
            })?;
            let target = match (target_id, sentinel_cpv) {
                (Some(target), None) => {
                    *positions.get(&target).ok_or_else(|| StorageError::Integrity {
                        reason: format!("dependency row references missing package {target}"),
                    })?
                }
                (None, Some(cpv)) => {
                    packages.push(PackageRecord {
                        cpv,
                        indices: Vec::new(),
                        use_flags: Vec::new(),
                        num_stable: 0,
                        state: SENTINEL_STATE,
                    });
                    packages.len() - 1
                }
                _ => {
                    return Err(StorageError::Integrity {
                        reason: format!(
                            "dependency row of package {package_id} must name exactly one target"
                        ),
                    })
                }
            };
            packages[parent].indices.push(target);
        }

        let mut snapshot = Snapshot {
            packages,
            ..Snapshot::default()
        };

        let mut stmt = self
            .conn
            .prepare("SELECT atom, stable, unstable FROM votes ORDER BY atom")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u32>(2)?,
            ))
        })?;
        for row in rows {
            let (atom, stable, unstable) = row?;
            if stable > 0 {
                snapshot.stable.insert(atom.clone(), stable);
            }
            if unstable > 0 {
                snapshot.unstable.insert(atom, unstable);
            }
        }

        let mut stmt = self
            .conn
            .prepare("SELECT atom, ticket FROM priority ORDER BY position")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (cpv, ticket) = row?;
            let ticket = u64::try_from(ticket).map_err(|_| StorageError::Integrity {
                reason: format!("negative ticket id {ticket} for '{cpv}'"),
            })?;
            snapshot.priority.push(PriorityRecord { cpv, ticket });
        }

        Ok(Some(snapshot))
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;

        tx.execute_batch(
            "DELETE FROM dependencies;
             DELETE FROM packages;
             DELETE FROM votes;
             DELETE FROM priority;",
        )?;

        let count = snapshot.packages.len();
        {
            let mut insert_package = tx.prepare(
                "INSERT INTO packages (id, atom, state, use_flags, num_stable)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (pos, record) in snapshot.packages.iter().enumerate() {
                if record.state == SENTINEL_STATE {
                    if !record.indices.is_empty() {
                        return Err(StorageError::Integrity {
                            reason: format!("sentinel '{}' has dependencies", record.cpv),
                        });
                    }
                    continue;
                }
                insert_package.execute(params![
                    pos as i64,
                    record.cpv,
                    record.state,
                    serde_json::to_string(&record.use_flags)?,
                    record.num_stable as i64,
                ])?;
            }
        }

        {
            let mut insert_dep = tx.prepare(
                "INSERT INTO dependencies (package_id, ordinal, target_id, sentinel_cpv)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (pos, record) in snapshot.packages.iter().enumerate() {
                for (ordinal, &dep) in record.indices.iter().enumerate() {
                    let target = snapshot.packages.get(dep).ok_or_else(|| {
                        StorageError::Integrity {
                            reason: format!(
                                "'{}' references index {dep}, snapshot has {count} records",
                                record.cpv
                            ),
                        }
                    })?;
                    let (target_id, sentinel_cpv) = if target.state == SENTINEL_STATE {
                        (None, Some(target.cpv.as_str()))
                    } else {
                        (Some(dep as i64), None)
                    };
                    insert_dep.execute(params![pos as i64, ordinal as i64, target_id, sentinel_cpv])?;
                }
            }
        }

        {
            let mut insert_vote = tx.prepare(
                "INSERT INTO votes (atom, stable, unstable) VALUES (?1, ?2, ?3)",
            )?;
            let atoms: BTreeSet<&String> =
                snapshot.stable.keys().chain(snapshot.unstable.keys()).collect();
            for atom in atoms {
                let stable = snapshot.stable.get(atom).copied().unwrap_or(0);
                let unstable = snapshot.unstable.get(atom).copied().unwrap_or(0);
                insert_vote.execute(params![atom, stable, unstable])?;
            }
        }

        {
            let mut insert_priority =
                tx.prepare("INSERT INTO priority (position, atom, ticket) VALUES (?1, ?2, ?3)")?;
            for (pos, entry) in snapshot.priority.iter().enumerate() {
                insert_priority.execute(params![
                    pos as i64,
                    entry.cpv,
                    to_i64(entry.ticket, "ticket id")?
                ])?;
            }
        }

        tx.execute(
            "INSERT INTO snapshot_meta (id, save_count) VALUES (1, 1)
             ON CONFLICT(id) DO UPDATE SET save_count = save_count + 1",
            [],
        )?;

        tx.commit()?;
        Ok(())
    }
}
