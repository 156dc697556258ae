//! Entry operations within a named store.
//!
//! Entries are written whole and never updated in place; a second write for
//! the same request key replaces the first (last write wins).

use super::connection::CacheDb;
use super::hash::request_key;
use crate::Error;
use crate::model::{Request, Response, ResponseKind};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

/// A stored (request, response) pair as it sits in the database.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub response_url: String,
    pub headers_json: String,
    pub body: Vec<u8>,
    pub stored_at: String,
}

/// Listing view of an entry, without the body.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntrySummary {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub size: u64,
    pub stored_at: String,
}

impl CachedEntry {
    fn from_response(request: &Request, response: Response) -> Result<Self, Error> {
        let headers: Vec<(String, String)> = response
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();
        let headers_json = serde_json::to_string(&headers).map_err(|e| Error::CorruptEntry(e.to_string()))?;

        Ok(Self {
            key_hash: request_key(request),
            method: request.method.as_str().to_string(),
            url: request.url.as_str().to_string(),
            status: response.status.as_u16(),
            response_url: response.url.as_str().to_string(),
            headers_json,
            body: response.into_body().to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Rebuild the stored response snapshot.
    pub fn into_response(self) -> Result<Response, Error> {
        let status = StatusCode::from_u16(self.status).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let url = Url::parse(&self.response_url).map_err(|e| Error::CorruptEntry(e.to_string()))?;

        let pairs: Vec<(String, String)> =
            serde_json::from_str(&self.headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::CorruptEntry(e.to_string()))?;
            let value = HeaderValue::from_str(&value).map_err(|e| Error::CorruptEntry(e.to_string()))?;
            headers.append(name, value);
        }

        Ok(Response::new(status, ResponseKind::Basic, url, headers, Bytes::from(self.body)))
    }
}

impl CacheDb {
    /// Write a response into the named store under the request's key.
    ///
    /// Creates the store if this is its first entry.
    pub async fn put(&self, cache_name: &str, request: &Request, response: Response) -> Result<(), Error> {
        let entry = CachedEntry::from_response(request, response)?;
        let cache_name = cache_name.to_string();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
                    params![&cache_name, &entry.stored_at],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (
                        cache_name, key_hash, method, url, status, response_url,
                        headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(cache_name, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        response_url = excluded.response_url,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        &cache_name,
                        &entry.key_hash,
                        &entry.method,
                        &entry.url,
                        entry.status,
                        &entry.response_url,
                        &entry.headers_json,
                        &entry.body,
                        &entry.stored_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request in the named store.
    ///
    /// Returns None on a miss, including when the store doesn't exist.
    pub async fn get_entry(&self, cache_name: &str, request: &Request) -> Result<Option<CachedEntry>, Error> {
        let cache_name = cache_name.to_string();
        let key_hash = request_key(request);

        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key_hash, method, url, status, response_url, headers_json, body, stored_at
                    FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![cache_name, key_hash], |row| {
                    Ok(CachedEntry {
                        key_hash: row.get(0)?,
                        method: row.get(1)?,
                        url: row.get(2)?,
                        status: row.get(3)?,
                        response_url: row.get(4)?,
                        headers_json: row.get(5)?,
                        body: row.get(6)?,
                        stored_at: row.get(7)?,
                    })
                });

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request and rebuild the stored response.
    pub async fn match_request(&self, cache_name: &str, request: &Request) -> Result<Option<Response>, Error> {
        match self.get_entry(cache_name, request).await? {
            Some(entry) => entry.into_response().map(Some),
            None => Ok(None),
        }
    }

    /// Number of entries in the named store.
    pub async fn entry_count(&self, cache_name: &str) -> Result<u64, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?1",
                    params![cache_name],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// List the entries of the named store, ordered by URL.
    pub async fn entries(&self, cache_name: &str) -> Result<Vec<EntrySummary>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntrySummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, LENGTH(body), stored_at
                    FROM cache_entries WHERE cache_name = ?1 ORDER BY url, method",
                )?;
                let entries = stmt
                    .query_map(params![cache_name], |row| {
                        Ok(EntrySummary {
                            method: row.get(0)?,
                            url: row.get(1)?,
                            status: row.get(2)?,
                            size: row.get::<_, i64>(3)? as u64,
                            stored_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }
}
