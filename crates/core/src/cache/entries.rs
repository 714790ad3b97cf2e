//! Cache entry operations: match, put and atomic bulk insert.
//!
//! Entries are keyed by request identity within a store. A put onto an
//! existing key overwrites it; concurrent writers race and the last write wins.

use std::collections::HashSet;

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Request identity used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self { method: method.into().to_ascii_uppercase(), url: url.into() }
    }

    /// Shorthand for a GET key.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Hex SHA-256 of the identity.
    pub fn hash(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }
}

/// A stored response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// URL the response was served from (after redirects).
    pub url: String,
    pub status: u16,
    /// Response type as reported by the fetcher (`basic`, `cors`, `opaque`, ...).
    pub response_type: String,
    /// Header names with their raw value bytes.
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

fn insert_entry(
    conn: &rusqlite::Connection, store: &str, key: &RequestKey, response: &CachedResponse,
) -> Result<(), Error> {
    let headers_json =
        serde_json::to_string(&response.headers).map_err(|e| Error::CacheWrite(format!("headers: {e}")))?;

    conn.execute(
        "INSERT INTO cache_entries (
            store, key_hash, method, url, status, response_type,
            response_url, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(store, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            response_type = excluded.response_type,
            response_url = excluded.response_url,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            store,
            key.hash(),
            &key.method,
            &key.url,
            response.status as i64,
            &response.response_type,
            &response.url,
            headers_json,
            &response.body,
            &response.stored_at,
        ],
    )?;
    Ok(())
}

fn ensure_store(conn: &rusqlite::Connection, store: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
        params![store, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

impl CacheDb {
    /// Insert or overwrite one entry, opening the store if needed.
    pub async fn put(&self, store: &str, key: &RequestKey, response: &CachedResponse) -> Result<(), Error> {
        let store = store.to_string();
        let key = key.clone();
        let response = response.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_store(conn, &store)?;
                insert_entry(conn, &store, &key, &response)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert a batch of entries in one transaction.
    ///
    /// Either every entry is stored or none is. Returns the number of distinct
    /// keys written; repeated keys collapse into one entry.
    pub async fn put_all(&self, store: &str, entries: Vec<(RequestKey, CachedResponse)>) -> Result<usize, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                ensure_store(&tx, &store)?;
                for (key, response) in &entries {
                    insert_entry(&tx, &store, key, response)?;
                }
                tx.commit()?;
                let distinct: HashSet<String> = entries.iter().map(|(key, _)| key.hash()).collect();
                Ok(distinct.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the response stored for a request in one store.
    ///
    /// Returns None if the store or the entry doesn't exist.
    pub async fn match_request(&self, store: &str, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        let store = store.to_string();
        let key_hash = key.hash();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT response_url, status, response_type, headers_json, body, stored_at
                     FROM cache_entries WHERE store = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![store, key_hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                });

                match result {
                    Ok((url, status, response_type, headers_json, body, stored_at)) => {
                        let headers = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::InvalidInput(format!("corrupt headers for {url}: {e}")))?;
                        Ok(Some(CachedResponse {
                            url,
                            status: status as u16,
                            response_type,
                            headers,
                            body,
                            stored_at,
                        }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// List the request keys held by a store, in insertion order.
    pub async fn keys(&self, store: &str) -> Result<Vec<RequestKey>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt =
                    conn.prepare("SELECT method, url FROM cache_entries WHERE store = ?1 ORDER BY rowid ASC")?;
                let keys = stmt
                    .query_map(params![store], |row| Ok(RequestKey { method: row.get(0)?, url: row.get(1)? }))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }
}
