//! State store trait definition.
//!
//! This module defines the common interface for identity storage backends.

use async_trait::async_trait;

use super::types::IdentityState;
use crate::error::Result;

/// Trait for identity storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the identity state.
    ///
    /// Returns `None` if no state exists yet.
    async fn load(&self) -> Result<Option<IdentityState>>;

    /// Saves the identity state.
    async fn save(&self, state: &IdentityState) -> Result<()>;

    /// Deletes the identity state.
    async fn delete(&self) -> Result<()>;

    /// Checks if state exists.
    async fn exists(&self) -> Result<bool>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl StateStore for Box<dyn StateStore> {
    async fn load(&self) -> Result<Option<IdentityState>> {
        (**self).load().await
    }

    async fn save(&self, state: &IdentityState) -> Result<()> {
        (**self).save(state).await
    }

    async fn delete(&self) -> Result<()> {
        (**self).delete().await
    }

    async fn exists(&self) -> Result<bool> {
        (**self).exists().await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}
