//! Context store trait: where user snapshots come from.
//!
//! The persistence engine itself is out of scope; the pipeline only needs a
//! keyed read.

use async_trait::async_trait;

use crate::context::UserSnapshot;
use crate::error::StoreError;

/// Read access to persisted user data.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// A human-readable name for this store (e.g., "in_memory", "json_dir").
    fn name(&self) -> &str;

    /// Load everything known about a user.
    ///
    /// Unknown users yield an empty snapshot, not an error.
    async fn load(&self, user_id: &str) -> Result<UserSnapshot, StoreError>;
}
