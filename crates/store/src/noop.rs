//! No-op persistence gateway — disables persistence entirely.

use async_trait::async_trait;
use labeler_core::error::PersistenceError;
use labeler_core::persistence::{PersistedState, PersistenceGateway};

/// A gateway that stores nothing and always loads nothing.
pub struct NoopGateway;

#[async_trait]
impl PersistenceGateway for NoopGateway {
    fn name(&self) -> &str {
        "none"
    }

    async fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        Ok(None)
    }

    async fn save(&self, _state: &PersistedState) -> Result<(), PersistenceError> {
        Ok(())
    }
}
