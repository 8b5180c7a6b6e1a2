//! Generation bookkeeping.
//!
//! A generation is a named, versioned set of entries. At most one generation
//! carries an `activated_at` marker; that one is current.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// A cache generation and its entry count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Generation {
    pub name: String,
    pub created_at: String,
    pub activated_at: Option<String>,
    pub entries: u64,
}

impl Generation {
    pub fn is_activated(&self) -> bool {
        self.activated_at.is_some()
    }
}

impl CacheDb {
    /// Create the named generation if it does not exist yet.
    pub async fn open_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a generation with this name exists.
    pub async fn has_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all generations, oldest first.
    pub async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// All generations with their entry counts, oldest first.
    pub async fn list_generations(&self) -> Result<Vec<Generation>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<Generation>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.name, g.created_at, g.activated_at, COUNT(e.key_hash)
                     FROM generations g
                     LEFT JOIN entries e ON e.generation = g.name
                     GROUP BY g.name
                     ORDER BY g.created_at ASC, g.name ASC",
                )?;
                let generations = stmt
                    .query_map([], |row| {
                        Ok(Generation {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            activated_at: row.get(2)?,
                            entries: row.get::<_, i64>(3)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(generations)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and, by cascade, every entry it owns.
    ///
    /// Returns false if no generation had that name.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Mark a generation as the current one and clear the marker on all others.
    ///
    /// Returns an error if the generation does not exist.
    pub async fn mark_activated(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute("UPDATE generations SET activated_at = NULL WHERE name <> ?1", params![name])?;
                let updated = tx.execute(
                    "UPDATE generations SET activated_at = COALESCE(activated_at, ?2) WHERE name = ?1",
                    params![name, now],
                )?;
                if updated == 0 {
                    return Err(Error::UnknownGeneration(name));
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Name of the activated generation, if any.
    pub async fn activated_generation(&self) -> Result<Option<String>, Error> {
        self.conn
            .call(|conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT name FROM generations WHERE activated_at IS NOT NULL
                     ORDER BY activated_at DESC LIMIT 1",
                    [],
                    |row| row.get(0),
                );
                match result {
                    Ok(name) => Ok(Some(name)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }
}
