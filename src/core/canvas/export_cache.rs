use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::clock::Clock;
use crate::core::store::{KeyValueStore, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub struct CachedExport {
    pub course_id: u64,
    pub zip_bytes: Vec<u8>,
    pub retrieved_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExportMeta {
    timestamp: String,
    course_id: u64,
}

fn zip_key(course_id: u64) -> String {
    format!("course_{}_export.zip", course_id)
}

fn meta_key(course_id: u64) -> String {
    format!("course_{}_meta.json", course_id)
}

/// Course export archives kept in the key-value store, invalidated by age.
pub struct ExportCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    max_age: Duration,
}

impl ExportCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, max_age: Duration) -> Self {
        Self {
            store,
            clock,
            max_age,
        }
    }

    /// Returns the cached archive if it is younger than `max_age`.
    /// Unreadable entries count as a miss.
    pub async fn get(&self, course_id: u64) -> Option<CachedExport> {
        match self.load(course_id).await {
            Ok(Some(cached)) => {
                if self.clock.now() - cached.retrieved_at < self.max_age {
                    tracing::info!(course_id, retrieved_at = %cached.retrieved_at, "Using cached course export");
                    Some(cached)
                } else {
                    tracing::debug!(course_id, "Cached course export is stale");
                    None
                }
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(course_id, error = %e, "Failed to read cached course export");
                None
            }
        }
    }

    async fn load(&self, course_id: u64) -> Result<Option<CachedExport>, StoreError> {
        let Some(meta_bytes) = self.store.get(&meta_key(course_id)).await? else {
            return Ok(None);
        };
        let Some(zip_bytes) = self.store.get(&zip_key(course_id)).await? else {
            return Ok(None);
        };

        let meta: ExportMeta = serde_json::from_slice(&meta_bytes)?;
        let retrieved_at = DateTime::parse_from_rfc3339(&meta.timestamp)
            .map_err(|e| StoreError::Database(format!("bad cache timestamp: {}", e)))?
            .with_timezone(&Utc);

        Ok(Some(CachedExport {
            course_id,
            zip_bytes,
            retrieved_at,
        }))
    }

    pub async fn put(&self, course_id: u64, zip_bytes: &[u8]) -> Result<(), StoreError> {
        let meta = ExportMeta {
            timestamp: self.clock.now().to_rfc3339(),
            course_id,
        };
        // Archive first: a meta entry without its archive reads as a miss.
        self.store.put(&zip_key(course_id), zip_bytes).await?;
        self.store
            .put(&meta_key(course_id), &serde_json::to_vec(&meta)?)
            .await?;
        tracing::info!(course_id, bytes = zip_bytes.len(), "Cached course export");
        Ok(())
    }
}
