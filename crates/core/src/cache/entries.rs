//! Entry storage and lookup.
//!
//! Entries belong to exactly one generation and are replaced wholesale when
//! the same request identity is stored again. The identity is the method plus
//! the URL without its fragment.

use super::connection::CacheDb;
use super::hash::compute_entry_key;
use crate::http::{Request, Response, ResponseKind};
use crate::Error;
use tokio_rusqlite::{params, rusqlite};
use url::Url;

/// A stored response together with its request identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    pub generation: String,
    pub method: String,
    pub url: String,
    pub response: Response,
    pub stored_at: String,
}

/// Owned row ready to be written inside a connection closure.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
    kind: &'static str,
}

/// Request URL as stored and matched: fragments never reach the network.
fn entry_url(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

impl EntryRow {
    fn new(request: &Request, response: &Response) -> Result<Self, Error> {
        let method = request.method.to_ascii_uppercase();
        let url = entry_url(&request.url).to_string();
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::InvalidInput(format!("unserializable headers: {e}")))?;
        Ok(Self {
            key_hash: compute_entry_key(&method, &url),
            method,
            url,
            status: response.status,
            status_text: response.status_text.clone(),
            headers_json,
            body: response.body.clone(),
            kind: response.kind.as_str(),
        })
    }

    fn insert(&self, conn: &rusqlite::Connection, generation: &str, stored_at: &str) -> Result<(), Error> {
        conn.execute(
            "INSERT INTO entries (
                generation, key_hash, method, url, status, status_text,
                headers_json, body, kind, stored_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(generation, key_hash) DO UPDATE SET
                method = excluded.method,
                url = excluded.url,
                status = excluded.status,
                status_text = excluded.status_text,
                headers_json = excluded.headers_json,
                body = excluded.body,
                kind = excluded.kind,
                stored_at = excluded.stored_at",
            params![
                generation,
                &self.key_hash,
                &self.method,
                &self.url,
                self.status,
                &self.status_text,
                &self.headers_json,
                &self.body,
                self.kind,
                stored_at,
            ],
        )?;
        Ok(())
    }
}

impl CacheDb {
    /// Store one response in an existing generation.
    ///
    /// Fails with `UnknownGeneration` once the generation has been deleted, so
    /// a late write from a superseded worker cannot bring it back.
    pub async fn put_entry(&self, generation: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let row = EntryRow::new(request, response)?;
        let generation = generation.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![generation],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(Error::UnknownGeneration(generation));
                }
                row.insert(&tx, &generation, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Create the generation and store every response in one transaction.
    ///
    /// Either all entries are written or none are. Returns the number of
    /// entries written.
    pub async fn put_entries(&self, generation: &str, batch: &[(Request, Response)]) -> Result<usize, Error> {
        let rows = batch
            .iter()
            .map(|(request, response)| EntryRow::new(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        let generation = generation.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![generation, now],
                )?;
                for row in &rows {
                    row.insert(&tx, &generation, &now)?;
                }
                tx.commit()?;
                Ok(rows.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Exact-match lookup by method and URL within one generation.
    ///
    /// Returns None if the generation or the entry does not exist.
    pub async fn match_entry(&self, generation: &str, method: &str, url: &Url) -> Result<Option<CachedEntry>, Error> {
        let key_hash = compute_entry_key(method, entry_url(url).as_str());
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, status_text, headers_json, body, kind, stored_at
                     FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![generation, key_hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u16>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                });

                let (method, url, status, status_text, headers_json, body, kind, stored_at) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let response_url = Url::parse(&url).map_err(|e| Error::CorruptEntry(format!("{url}: {e}")))?;
                let headers: Vec<(String, String)> =
                    serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(format!("{url}: {e}")))?;
                let kind =
                    ResponseKind::parse(&kind).ok_or_else(|| Error::CorruptEntry(format!("{url}: kind {kind}")))?;

                Ok(Some(CachedEntry {
                    generation,
                    method,
                    url,
                    response: Response { url: response_url, status, status_text, headers, body, kind },
                    stored_at,
                }))
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in a generation, in insertion order.
    pub async fn entry_urls(&self, generation: &str) -> Result<Vec<String>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE generation = ?1 ORDER BY rowid ASC")?;
                let urls = stmt
                    .query_map(params![generation], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries stored in a generation.
    pub async fn count_entries(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![generation], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
