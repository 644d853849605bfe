use super::identity::Identity;
use super::state::{DiamondState, ExecutionContext};
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Raw failure payload raised by a module. The registry never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct HandlerFault {
    pub data: Vec<u8>,
}

impl HandlerFault {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            data: message.into().into_bytes(),
        }
    }
}

impl fmt::Display for HandlerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.data) {
            Ok(text) if !text.is_empty() => write!(f, "{text}"),
            _ => write!(f, "{} bytes of failure data", self.data.len()),
        }
    }
}

/// An independently deployed code unit reachable through the dispatcher or
/// run once as a cut initializer.
pub trait HandlerModule: Send + Sync {
    /// Runs the module. Dispatched calls receive the full calldata, selector
    /// included; initializers receive their payload as-is.
    fn invoke(
        &self,
        ctx: &mut ExecutionContext<'_>,
        input: &[u8],
    ) -> std::result::Result<Vec<u8>, HandlerFault>;
}

pub type HandlerModuleRef = Arc<dyn HandlerModule>;

/// Answers whether an identity names executable code.
pub trait CodeRegistry {
    fn has_code(&self, identity: &Identity) -> bool;
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self) -> Result<Option<DiamondState>>;
    async fn save(&self, state: &DiamondState) -> Result<()>;
}

pub type StateStoreBox = Box<dyn StateStore>;
pub type StateStoreFactory = Box<dyn Fn() -> StateStoreBox + Send + Sync>;
