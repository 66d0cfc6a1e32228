//! Per-generation store of cached responses.
//!
//! Entries are keyed by request identity (method + canonical URL). A `put`
//! replaces any previous response for the same request.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::{Error, ProxyRequest, ProxyResponse};
use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Summary of a stored entry, without its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EntryMeta {
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub size: usize,
    pub stored_at: String,
}

/// Handle to one generation's store.
#[derive(Clone, Debug)]
pub struct CacheStore {
    db: CacheDb,
    generation: String,
}

type EntryRow = (u16, String, String, Vec<u8>, String);

/// Decode the first row of a `(status_code, status_text, headers_json, body, url)` query.
pub(crate) fn read_entry<P: rusqlite::Params>(
    stmt: &mut rusqlite::Statement<'_>, params: P,
) -> Result<Option<ProxyResponse>, Error> {
    let result = stmt.query_row(params, |row| -> rusqlite::Result<EntryRow> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
    });

    let (status, status_text, headers_json, body, url) = match result {
        Ok(row) => row,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let headers: Vec<(String, String)> =
        serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(format!("{url}: {e}")))?;

    Ok(Some(ProxyResponse { status, status_text, headers, body: Bytes::from(body), url: Some(url) }))
}

impl CacheStore {
    pub(crate) fn new(db: CacheDb, generation: &str) -> Self {
        Self { db, generation: generation.to_string() }
    }

    pub fn generation(&self) -> &str {
        &self.generation
    }

    /// Look up the stored response for a request.
    pub async fn match_request(&self, request: &ProxyRequest) -> Result<Option<ProxyResponse>, Error> {
        let key = compute_request_key(&request.method, request.url.as_str());
        let generation = self.generation.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Option<ProxyResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status_code, status_text, headers_json, body, url
                     FROM entries WHERE key_hash = ?1 AND generation = ?2",
                )?;
                read_entry(&mut stmt, params![key, generation])
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response for a request, replacing any previous entry.
    ///
    /// Recreates the generation if it has been deleted in the meantime.
    pub async fn put(&self, request: &ProxyRequest, response: &ProxyResponse) -> Result<(), Error> {
        let key = compute_request_key(&request.method, request.url.as_str());
        let generation = self.generation.clone();
        let method = request.method.clone();
        let url = request.url.to_string();
        let status = response.status;
        let status_text = response.status_text.clone();
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let body = response.body.to_vec();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (id, created_at) VALUES (?1, ?2)",
                    params![&generation, &now],
                )?;
                conn.execute(
                    "INSERT INTO entries (
                        generation, key_hash, method, url, status_code, status_text,
                        headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(generation, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status_code = excluded.status_code,
                        status_text = excluded.status_text,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![generation, key, method, url, status, status_text, headers_json, body, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// List stored entries, oldest first.
    pub async fn keys(&self) -> Result<Vec<EntryMeta>, Error> {
        let generation = self.generation.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<EntryMeta>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status_code, headers_json, length(body), stored_at
                     FROM entries WHERE generation = ?1
                     ORDER BY stored_at ASC, rowid ASC",
                )?;
                let rows = stmt
                    .query_map(params![generation], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, u16>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, i64>(4)?,
                            row.get::<_, String>(5)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;

                rows.into_iter()
                    .map(|(method, url, status_code, headers_json, size, stored_at)| {
                        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::CorruptEntry(format!("{url}: {e}")))?;
                        let content_type = headers
                            .into_iter()
                            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
                            .map(|(_, v)| v);
                        Ok(EntryMeta { method, url, status_code, content_type, size: size as usize, stored_at })
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    pub async fn len(&self) -> Result<usize, Error> {
        let generation = self.generation.clone();
        self.db
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![generation], |row| {
                        row.get(0)
                    })?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}
