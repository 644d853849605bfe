use crate::domain::ports::StateStore;
use crate::domain::state::DiamondState;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory snapshot store.
///
/// Clones share the same slot, so a test can keep a handle and inspect what
/// the engine last saved. Nothing survives the process.
#[derive(Default, Clone)]
pub struct InMemoryStateStore {
    snapshot: Arc<RwLock<Option<DiamondState>>>,
}

impl InMemoryStateStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self) -> Result<Option<DiamondState>> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot.clone())
    }

    async fn save(&self, state: &DiamondState) -> Result<()> {
        let mut snapshot = self.snapshot.write().await;
        *snapshot = Some(state.clone());
        Ok(())
    }
}
