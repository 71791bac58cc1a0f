use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::app::ports::IdentityStorePort;
use crate::error::Result;
use crate::types::{IdentityPayload, RelationshipRow};

/// In-memory identity store for dry runs and tests
#[derive(Clone, Default)]
pub struct InMemoryStore {
    identities: Arc<Mutex<BTreeMap<String, IdentityPayload>>>,
    relationships: Arc<Mutex<Vec<RelationshipRow>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicked writer leaves plain data behind; keep serving it.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self, fpid: &str) -> Option<IdentityPayload> {
        lock(&self.identities).get(fpid).cloned()
    }

    pub fn identity_count(&self) -> usize {
        lock(&self.identities).len()
    }

    pub fn relationships_for(&self, source_fpid: &str) -> Vec<RelationshipRow> {
        lock(&self.relationships)
            .iter()
            .filter(|r| r.source_fpid == source_fpid)
            .cloned()
            .collect()
    }

    pub fn relationship_count(&self) -> usize {
        lock(&self.relationships).len()
    }
}

#[async_trait]
impl IdentityStorePort for InMemoryStore {
    async fn upsert_identities(&self, identities: &[IdentityPayload]) -> Result<()> {
        let mut map = lock(&self.identities);
        for identity in identities {
            map.insert(identity.fpid.clone(), identity.clone());
        }
        debug!("Upserted {} identities in memory", identities.len());
        Ok(())
    }

    async fn delete_relationships(&self, source_fpids: &[String]) -> Result<()> {
        let sources: HashSet<&str> = source_fpids.iter().map(String::as_str).collect();
        let mut rows = lock(&self.relationships);
        let before = rows.len();
        rows.retain(|r| !sources.contains(r.source_fpid.as_str()));
        debug!("Deleted {} relationships in memory", before - rows.len());
        Ok(())
    }

    async fn insert_relationships(&self, rows: &[RelationshipRow]) -> Result<()> {
        lock(&self.relationships).extend_from_slice(rows);
        debug!("Inserted {} relationships in memory", rows.len());
        Ok(())
    }
}
