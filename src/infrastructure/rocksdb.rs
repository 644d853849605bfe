use crate::domain::ports::StateStore;
use crate::domain::registry::RegistryStorage;
use crate::domain::state::{DiamondState, SharedState};
use crate::error::{RegistryError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;

/// Column Family for the routing tables.
pub const CF_REGISTRY: &str = "registry";
/// Column Family for the state shared by handler modules.
pub const CF_SHARED: &str = "shared";

const SNAPSHOT_KEY: &[u8] = b"current";

/// A persistent snapshot store backed by RocksDB.
///
/// Routing tables and shared state live in separate Column Families and are
/// written in one `WriteBatch`, so a crash never leaves one without the other.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("registry" and "shared") exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_registry = ColumnFamilyDescriptor::new(CF_REGISTRY, Options::default());
        let cf_shared = ColumnFamilyDescriptor::new(CF_SHARED, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_registry, cf_shared])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn missing_cf(name: &str) -> RegistryError {
        RegistryError::InternalError(Box::new(std::io::Error::other(format!(
            "{name} column family not found"
        ))))
    }
}

#[async_trait]
impl StateStore for RocksDBStore {
    async fn load(&self) -> Result<Option<DiamondState>> {
        let cf_registry = self
            .db
            .cf_handle(CF_REGISTRY)
            .ok_or_else(|| Self::missing_cf(CF_REGISTRY))?;
        let cf_shared = self
            .db
            .cf_handle(CF_SHARED)
            .ok_or_else(|| Self::missing_cf(CF_SHARED))?;

        let Some(registry_bytes) = self.db.get_cf(&cf_registry, SNAPSHOT_KEY)? else {
            return Ok(None);
        };
        let registry: RegistryStorage = serde_json::from_slice(&registry_bytes)?;

        let shared = match self.db.get_cf(&cf_shared, SNAPSHOT_KEY)? {
            Some(bytes) => serde_json::from_slice::<SharedState>(&bytes)?,
            None => SharedState::new(),
        };

        Ok(Some(DiamondState { registry, shared }))
    }

    async fn save(&self, state: &DiamondState) -> Result<()> {
        let cf_registry = self
            .db
            .cf_handle(CF_REGISTRY)
            .ok_or_else(|| Self::missing_cf(CF_REGISTRY))?;
        let cf_shared = self
            .db
            .cf_handle(CF_SHARED)
            .ok_or_else(|| Self::missing_cf(CF_SHARED))?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_registry, SNAPSHOT_KEY, serde_json::to_vec(&state.registry)?);
        batch.put_cf(&cf_shared, SNAPSHOT_KEY, serde_json::to_vec(&state.shared)?);
        self.db.write(batch)?;

        Ok(())
    }
}
