//! Context stores for the Stride tip pipeline.
//!
//! Provides implementations of the `ContextStore` trait:
//! - [`InMemoryContextStore`]: ephemeral, for tests and demos
//! - [`JsonDirContextStore`]: one `<user_id>.json` file per user
//!
//! An unknown user is not an error: both stores return an empty snapshot.

pub mod in_memory;
pub mod json_dir;

pub use in_memory::InMemoryContextStore;
pub use json_dir::JsonDirContextStore;

use stride_core::StoreError;

/// Reject user ids that could escape a storage namespace.
pub(crate) fn check_user_id(user_id: &str) -> Result<(), StoreError> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidKey("user id is empty".into()));
    }
    if user_id.contains(['/', '\\', '\0']) || user_id.starts_with('.') {
        return Err(StoreError::InvalidKey(format!(
            "user id '{user_id}' contains path characters"
        )));
    }
    Ok(())
}
