//! Cache generation management.
//!
//! A generation is one versioned set of cached assets. Installing writes a
//! whole generation in a single transaction so a failed install never leaves
//! a partial generation behind.

use super::connection::CacheDb;
use super::entries::{ResponseSnapshot, upsert_entry};
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Summary of a stored generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationInfo {
    pub version: String,
    pub created_at: String,
    pub entries: u64,
}

impl CacheDb {
    /// Create a generation if it doesn't exist yet.
    pub async fn open_generation(&self, version: &str) -> Result<(), Error> {
        let version = version.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (version, created_at) VALUES (?1, ?2)",
                    params![version, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Create a generation and store every snapshot, all in one transaction.
    ///
    /// Existing entries of the same generation are kept unless a snapshot
    /// replaces them. Returns the number of snapshots written.
    pub async fn install_generation(&self, version: &str, snapshots: Vec<ResponseSnapshot>) -> Result<u64, Error> {
        let version = version.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (version, created_at) VALUES (?1, ?2)",
                    params![&version, created_at],
                )?;
                for snapshot in &snapshots {
                    upsert_entry(&tx, &version, snapshot)?;
                }
                tx.commit()?;
                Ok(snapshots.len() as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Versions of all stored generations, oldest first.
    pub async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT version FROM generations ORDER BY created_at, version")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

                let mut versions = Vec::new();
                for row in rows {
                    versions.push(row?);
                }
                Ok(versions)
            })
            .await
            .map_err(Error::from)
    }

    /// Stored generations with their entry counts, oldest first.
    pub async fn generation_info(&self) -> Result<Vec<GenerationInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.version, g.created_at, COUNT(e.key)
                    FROM generations g LEFT JOIN entries e ON e.generation = g.version
                    GROUP BY g.version, g.created_at
                    ORDER BY g.created_at, g.version",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(GenerationInfo {
                        version: row.get(0)?,
                        created_at: row.get(1)?,
                        entries: row.get::<_, i64>(2)? as u64,
                    })
                })?;

                let mut infos = Vec::new();
                for row in rows {
                    infos.push(row?);
                }
                Ok(infos)
            })
            .await
            .map_err(Error::from)
    }

    /// Check if a generation exists.
    pub async fn has_generation(&self, version: &str) -> Result<bool, Error> {
        let version = version.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE version = ?1)",
                    params![version],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and, by cascade, all of its entries.
    ///
    /// Returns false if the generation didn't exist.
    pub async fn delete_generation(&self, version: &str) -> Result<bool, Error> {
        let version = version.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE version = ?1", params![version])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
