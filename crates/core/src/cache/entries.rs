//! Cached response entries.
//!
//! An entry is a snapshot of a response stored under a request identity in
//! one generation. Writes always overwrite: the last writer for a key wins,
//! and writes to distinct keys never interfere with each other.

use super::connection::CacheDb;
use super::hash::RequestIdentity;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored copy of a response, taken when the network answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl ResponseSnapshot {
    /// Create a snapshot stamped with the current time.
    pub fn new(identity: &RequestIdentity, status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            method: identity.method().to_string(),
            url: identity.url().to_string(),
            status,
            headers,
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn identity(&self) -> RequestIdentity {
        RequestIdentity::new(&self.method, self.url.clone())
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Which network responses the controller copies into the cache.
///
/// `Always` stores every response the network returned, including error
/// statuses. `SuccessOnly` stores 2xx responses and passes the rest through
/// without touching the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorePolicy {
    #[default]
    SuccessOnly,
    Always,
}

impl StorePolicy {
    pub fn allows(self, snapshot: &ResponseSnapshot) -> bool {
        match self {
            StorePolicy::Always => true,
            StorePolicy::SuccessOnly => snapshot.is_success(),
        }
    }
}

/// Upsert one entry on an open connection or transaction.
pub(crate) fn upsert_entry(conn: &rusqlite::Connection, version: &str, snapshot: &ResponseSnapshot) -> Result<(), Error> {
    let key = snapshot.identity().key();
    let headers_json = serde_json::to_string(&snapshot.headers)?;
    conn.execute(
        "INSERT INTO entries (generation, key, method, url, status, headers_json, body, stored_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(generation, key) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            version,
            key,
            &snapshot.method,
            &snapshot.url,
            snapshot.status as i64,
            headers_json,
            &snapshot.body,
            &snapshot.stored_at,
        ],
    )?;
    Ok(())
}

fn read_snapshot(row: &rusqlite::Row<'_>) -> rusqlite::Result<(ResponseSnapshot, String)> {
    let status: i64 = row.get(2)?;
    let snapshot = ResponseSnapshot {
        method: row.get(0)?,
        url: row.get(1)?,
        status: u16::try_from(status).unwrap_or(0),
        headers: Vec::new(),
        body: row.get(4)?,
        stored_at: row.get(5)?,
    };
    Ok((snapshot, row.get(3)?))
}

fn decode(row: (ResponseSnapshot, String)) -> Result<ResponseSnapshot, Error> {
    let (mut snapshot, headers_json) = row;
    snapshot.headers = serde_json::from_str(&headers_json)?;
    Ok(snapshot)
}

impl CacheDb {
    /// Store a snapshot in a generation, creating the generation if needed.
    ///
    /// Any previous entry for the same request identity is replaced.
    pub async fn put_entry(&self, version: &str, snapshot: &ResponseSnapshot) -> Result<(), Error> {
        let version = version.to_string();
        let snapshot = snapshot.clone();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (version, created_at) VALUES (?1, ?2)",
                    params![&version, created_at],
                )?;
                upsert_entry(conn, &version, &snapshot)
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry for a request identity in a generation.
    ///
    /// Returns None if the generation or the entry doesn't exist.
    pub async fn match_entry(&self, version: &str, identity: &RequestIdentity) -> Result<Option<ResponseSnapshot>, Error> {
        let version = version.to_string();
        let key = identity.key();
        self.conn
            .call(move |conn| -> Result<Option<ResponseSnapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, headers_json, body, stored_at
                    FROM entries WHERE generation = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![version, key], read_snapshot);

                match result {
                    Ok(row) => decode(row).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// All entries of a generation, ordered by URL.
    pub async fn list_entries(&self, version: &str) -> Result<Vec<ResponseSnapshot>, Error> {
        let version = version.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<ResponseSnapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, headers_json, body, stored_at
                    FROM entries WHERE generation = ?1 ORDER BY url, method",
                )?;
                let rows = stmt.query_map(params![version], read_snapshot)?;

                let mut snapshots = Vec::new();
                for row in rows {
                    snapshots.push(decode(row?)?);
                }
                Ok(snapshots)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a generation.
    pub async fn count_entries(&self, version: &str) -> Result<u64, Error> {
        let version = version.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![version], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_snapshot(url: &str, body: &str) -> ResponseSnapshot {
        ResponseSnapshot::new(
            &RequestIdentity::get(url),
            200,
            vec![("Content-Type".to_string(), "application/json".to_string())],
            body.as_bytes().to_vec(),
        )
    }

    #[test]
    fn test_store_policy() {
        let ok = make_test_snapshot("http://o/a", "");
        let mut missing = ok.clone();
        missing.status = 404;

        assert!(StorePolicy::SuccessOnly.allows(&ok));
        assert!(!StorePolicy::SuccessOnly.allows(&missing));
        assert!(StorePolicy::Always.allows(&missing));
        assert_eq!(StorePolicy::default(), StorePolicy::SuccessOnly);
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let snapshot = make_test_snapshot("http://localhost:8080/data/rutas.json", "[]");

        db.put_entry("rutasdr-v2", &snapshot).await.unwrap();

        let found = db
            .match_entry("rutasdr-v2", &snapshot.identity())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, snapshot);
        assert_eq!(found.header("content-type"), Some("application/json"));
        assert!(db.has_generation("rutasdr-v2").await.unwrap());
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let identity = RequestIdentity::get("http://localhost:8080/nope");
        assert!(db.match_entry("rutasdr-v2", &identity).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_same_identity() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "http://localhost:8080/data/alerts.json";

        db.put_entry("v1", &make_test_snapshot(url, "old")).await.unwrap();
        db.put_entry("v1", &make_test_snapshot(url, "new")).await.unwrap();

        let found = db.match_entry("v1", &RequestIdentity::get(url)).await.unwrap().unwrap();
        assert_eq!(found.body, b"new");
        assert_eq!(db.count_entries("v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_entries_are_scoped_to_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "http://localhost:8080/index.html";
        db.put_entry("v1", &make_test_snapshot(url, "one")).await.unwrap();

        assert!(db.match_entry("v2", &RequestIdentity::get(url)).await.unwrap().is_none());
        assert_eq!(db.count_entries("v2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_method_is_part_of_identity() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "http://localhost:8080/manifest.json";
        db.put_entry("v1", &make_test_snapshot(url, "{}")).await.unwrap();

        let head = RequestIdentity::new("HEAD", url);
        assert!(db.match_entry("v1", &head).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_writes_to_distinct_keys() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut handles = Vec::new();
        for i in 0..8 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                let url = format!("http://localhost:8080/asset/{i}");
                db.put_entry("v1", &make_test_snapshot(&url, "x")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let entries = db.list_entries("v1").await.unwrap();
        assert_eq!(entries.len(), 8);
    }
}
