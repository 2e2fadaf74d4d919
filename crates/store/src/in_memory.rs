//! In-memory store: useful for testing and demos.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use stride_core::{ContextStore, StoreError, UserSnapshot};
use tokio::sync::RwLock;

/// A store that keeps snapshots in a map.
#[derive(Clone, Default)]
pub struct InMemoryContextStore {
    users: Arc<RwLock<HashMap<String, UserSnapshot>>>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user's snapshot.
    pub async fn put(&self, user_id: impl Into<String>, snapshot: UserSnapshot) {
        self.users.write().await.insert(user_id.into(), snapshot);
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self, user_id: &str) -> Result<UserSnapshot, StoreError> {
        crate::check_user_id(user_id)?;
        Ok(self
            .users
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}
