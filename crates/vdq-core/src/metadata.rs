//! Job metadata service: one record per job id, every call serialized.
//!
//! The scheduler and the transfer tasks all funnel through here, so two
//! writers never interleave on the whole-file store.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::job::{decode_record, encode_record, Job};
use crate::store::{MetadataStore, StoreError};

pub struct JobMetadataService {
    store: Arc<dyn MetadataStore>,
    lock: Mutex<()>,
}

impl JobMetadataService {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Persist the full record for `id`, replacing any previous one.
    pub async fn save(&self, id: &str, job: &Job) -> Result<()> {
        let raw = encode_record(job).map_err(StoreError::from)?;
        let _guard = self.lock.lock().await;
        self.store.set(id, &raw).await?;
        tracing::trace!(job_id = %id, offset = job.offset, "job record saved");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Job>> {
        let raw = {
            let _guard = self.lock.lock().await;
            self.store.get(id).await?
        };
        match raw {
            Some(raw) => Ok(Some(decode_record(&raw).map_err(StoreError::from)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.store.delete(id).await?;
        tracing::trace!(job_id = %id, "job record deleted");
        Ok(())
    }

    pub async fn list_keys(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.store.list_keys().await?)
    }

    /// Every decodable record. Undecodable ones are logged and skipped.
    pub async fn load_all(&self) -> Result<Vec<Job>> {
        let keys = self.list_keys().await?;
        let mut jobs = Vec::with_capacity(keys.len());
        for key in keys {
            match self.get(&key).await {
                Ok(Some(job)) => jobs.push(job),
                Ok(None) => {}
                Err(e) => tracing::warn!(key = %key, error = %e, "skipping unreadable job record"),
            }
        }
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VdqError;
    use crate::job::fixtures;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn save_get_delete() {
        let svc = JobMetadataService::new(Arc::new(MemoryStore::new()));
        let mut job = fixtures::job("abc123", 1_000_000);
        job.offset = 400_000;
        job.queue_position = Some(3);
        svc.save(&job.id, &job).await.unwrap();

        let back = svc.get("abc123").await.unwrap().unwrap();
        assert_eq!(back.offset, 400_000);
        assert_eq!(back.queue_position, Some(3));
        assert_eq!(svc.list_keys().await.unwrap(), vec!["abc123"]);

        svc.delete("abc123").await.unwrap();
        assert!(svc.get("abc123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_failures_surface_as_persistence_errors() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_writes(true);
        let svc = JobMetadataService::new(store);
        let err = svc.save("x", &fixtures::job("x", 1)).await.unwrap_err();
        assert!(matches!(err, VdqError::Persistence(_)));
    }

    #[tokio::test]
    async fn load_all_skips_garbage() {
        let store = Arc::new(MemoryStore::new());
        store.set("broken", "not json").await.unwrap();
        let svc = JobMetadataService::new(store);
        svc.save("ok1", &fixtures::job("ok1", 5)).await.unwrap();
        let jobs = svc.load_all().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "ok1");
    }
}
