//! Background sync registrations.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;

impl CacheDb {
    /// Register a sync tag. Registering an existing tag keeps its original timestamp.
    pub async fn register_sync(&self, tag: &str) -> Result<(), Error> {
        let tag = tag.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO sync_registrations (tag, registered_at) VALUES (?1, ?2)",
                    params![tag, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// All registered tags, sorted.
    pub async fn sync_tags(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT tag FROM sync_registrations ORDER BY tag ASC")?;
                let tags = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(tags)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_sync_registered(&self, tag: &str) -> Result<bool, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sync_registrations WHERE tag = ?1)",
                    params![tag],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_sync_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.register_sync("sync-forms").await.unwrap();
        db.register_sync("sync-forms").await.unwrap();

        assert_eq!(db.sync_tags().await.unwrap(), vec!["sync-forms".to_string()]);
        assert!(db.is_sync_registered("sync-forms").await.unwrap());
        assert!(!db.is_sync_registered("sync-drafts").await.unwrap());
    }
}
