use async_trait::async_trait;

use crate::error::Result;
use crate::types::{IdentityPayload, RelationshipRow};

/// Remote store the exporter syncs into.
///
/// Each call is a single attempt; callers decide how a failure is counted.
#[async_trait]
pub trait IdentityStorePort: Send + Sync {
    /// Insert or fully replace identities keyed by `fpid`, as one request.
    async fn upsert_identities(&self, identities: &[IdentityPayload]) -> Result<()>;

    /// Remove every relationship owned by any of `source_fpids`.
    async fn delete_relationships(&self, source_fpids: &[String]) -> Result<()>;

    async fn insert_relationships(&self, rows: &[RelationshipRow]) -> Result<()>;
}
