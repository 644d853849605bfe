use crate::domain::identity::{Identity, Selector};
use crate::domain::ports::HandlerFault;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("caller {caller} is not the registry owner")]
    UnauthorizedMutation { caller: Identity },
    #[error("no handler is bound to selector {0}")]
    UnknownSelector(Selector),
    #[error("cannot add selector {selector}: already bound to handler {handler}")]
    DuplicateSelectorOnAdd { selector: Selector, handler: Identity },
    #[error("cannot replace selector {selector}: {reason}")]
    InvalidReplaceTarget {
        selector: Selector,
        reason: &'static str,
    },
    #[error("invalid removal: {reason}")]
    InvalidRemovalTarget { reason: String },
    #[error("handler {0} has no deployed code")]
    HandlerHasNoCode(Identity),
    #[error("cut for handler {handler} supplies no selectors")]
    EmptySelectorBatch { handler: Identity },
    #[error("initializer {initializer} failed: {fault}")]
    InitializerFailure {
        initializer: Identity,
        fault: HandlerFault,
    },
    #[error("handler {handler} failed: {fault}")]
    HandlerFailed {
        handler: Identity,
        fault: HandlerFault,
    },
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("registry storage is corrupted: {0}")]
    CorruptedStorage(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDB(#[from] rocksdb::Error),
    #[error("internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl RegistryError {
    /// The raw failure payload of a module fault, if this error carries one.
    pub fn fault_data(&self) -> Option<&[u8]> {
        match self {
            Self::InitializerFailure { fault, .. } | Self::HandlerFailed { fault, .. } => {
                Some(&fault.data)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
