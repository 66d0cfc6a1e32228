//! Cache generation management.
//!
//! A generation is a named store tied to one deployed build of the
//! application shell. Deleting a generation cascades to its entries.

use super::connection::CacheDb;
use super::entries::{CacheStore, read_entry};
use super::hash::compute_request_key;
use crate::{Error, ProxyRequest, ProxyResponse};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl CacheDb {
    /// Handle for a generation's store without touching the database.
    ///
    /// The generation row is created on the first write.
    pub fn store(&self, generation: &str) -> CacheStore {
        CacheStore::new(self.clone(), generation)
    }

    /// Open the store for a generation, creating it if absent.
    pub async fn open_generation(&self, generation: &str) -> Result<CacheStore, Error> {
        if generation.is_empty() {
            return Err(Error::InvalidInput("generation id cannot be empty".into()));
        }
        let id = generation.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (id, created_at) VALUES (?1, ?2)",
                    params![id, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(self.store(generation))
    }

    /// All generation ids in creation order.
    pub async fn generation_ids(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT id FROM generations ORDER BY rowid ASC")?;
                let ids = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, rusqlite::Error>>()?;
                Ok(ids)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has_generation(&self, generation: &str) -> Result<bool, Error> {
        let id = generation.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE id = ?1)",
                    params![id],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and every entry stored under it.
    ///
    /// Returns false if the generation did not exist.
    pub async fn delete_generation(&self, generation: &str) -> Result<bool, Error> {
        let id = generation.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE id = ?1", params![id])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Look a request up across every generation, oldest first.
    pub async fn match_any(&self, request: &ProxyRequest) -> Result<Option<ProxyResponse>, Error> {
        let key = compute_request_key(&request.method, request.url.as_str());
        self.conn
            .call(move |conn| -> Result<Option<ProxyResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.status_code, e.status_text, e.headers_json, e.body, e.url
                     FROM entries e JOIN generations g ON g.id = e.generation
                     WHERE e.key_hash = ?1
                     ORDER BY g.rowid ASC
                     LIMIT 1",
                )?;
                read_entry(&mut stmt, params![key])
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn request(path: &str) -> ProxyRequest {
        ProxyRequest::get(Url::parse("https://example.com").unwrap().join(path).unwrap())
    }

    #[tokio::test]
    async fn test_open_generation_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("da360-admin-v1").await.unwrap();
        db.open_generation("da360-admin-v1").await.unwrap();

        assert_eq!(db.generation_ids().await.unwrap(), vec!["da360-admin-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_open_generation_rejects_empty_id() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(matches!(db.open_generation("").await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_generation_ids_in_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("v2").await.unwrap();
        db.open_generation("v1").await.unwrap();
        db.open_generation("v3").await.unwrap();

        assert_eq!(db.generation_ids().await.unwrap(), vec!["v2", "v1", "v3"]);
    }

    #[tokio::test]
    async fn test_delete_generation_cascades_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let old = db.open_generation("v1").await.unwrap();
        let new = db.open_generation("v2").await.unwrap();
        old.put(&request("/admin/"), &ProxyResponse::new(200, "old")).await.unwrap();
        new.put(&request("/admin/"), &ProxyResponse::new(200, "new")).await.unwrap();

        assert!(db.delete_generation("v1").await.unwrap());
        assert!(!db.delete_generation("v1").await.unwrap());
        assert!(!db.has_generation("v1").await.unwrap());

        assert_eq!(old.len().await.unwrap(), 0);
        assert_eq!(new.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_match_any_prefers_oldest_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let first = db.open_generation("v1").await.unwrap();
        let second = db.open_generation("v2").await.unwrap();
        second.put(&request("/admin/"), &ProxyResponse::new(200, "v2")).await.unwrap();
        first.put(&request("/admin/"), &ProxyResponse::new(200, "v1")).await.unwrap();

        let hit = db.match_any(&request("/admin/")).await.unwrap().unwrap();
        assert_eq!(hit.text(), "v1");
        assert!(db.match_any(&request("/missing")).await.unwrap().is_none());
    }
}
