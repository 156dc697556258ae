//! Named store operations.
//!
//! The worker sees Cache Storage as a set of stores identified by name. A
//! store comes into existence on its first write and disappears as a whole
//! when deleted; its entries go with it through the foreign-key cascade.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;

impl CacheDb {
    /// List the names of all stores, oldest first.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY created_at, name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a store with this name exists.
    pub async fn has(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and every entry in it.
    ///
    /// Returns false if no store had that name.
    pub async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::CacheDb;
    use crate::model::{Request, Response, ResponseKind};
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};
    use url::Url;

    async fn populate(db: &CacheDb, name: &str, url: &str) {
        let request = Request::get(Url::parse(url).unwrap());
        let response = Response::new(
            StatusCode::OK,
            ResponseKind::Basic,
            request.url.clone(),
            HeaderMap::new(),
            Bytes::from_static(b"body"),
        );
        db.put(name, &request, response).await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_empty() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.keys().await.unwrap().is_empty());
        assert!(!db.has("swcache-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_store_created_on_first_write() {
        let db = CacheDb::open_in_memory().await.unwrap();
        populate(&db, "swcache-1", "https://example.com/web/assets/a.js").await;
        populate(&db, "swcache-1", "https://example.com/web/assets/b.js").await;

        assert_eq!(db.keys().await.unwrap(), vec!["swcache-1".to_string()]);
        assert!(db.has("swcache-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_cascades_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        populate(&db, "swcache-1", "https://example.com/web/assets/a.js").await;
        populate(&db, "swcache-2", "https://example.com/web/assets/a.js").await;

        assert!(db.delete("swcache-1").await.unwrap());
        assert!(!db.delete("swcache-1").await.unwrap());

        assert_eq!(db.keys().await.unwrap(), vec!["swcache-2".to_string()]);
        assert_eq!(db.entry_count("swcache-1").await.unwrap(), 0);
        assert_eq!(db.entry_count("swcache-2").await.unwrap(), 1);
    }
}
