//! Reference handler modules.
//!
//! Production business logic is deployed separately; these exist so the
//! dispatcher, shared state and initializers can be exercised end to end.

pub mod capabilities;
pub mod echo;
pub mod failing;
pub mod payments;

use crate::domain::ports::HandlerModuleRef;
use crate::error::RegistryError;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Echo,
    Payments,
    Capabilities,
    Failing,
}

impl ModuleKind {
    pub fn instantiate(self) -> HandlerModuleRef {
        match self {
            ModuleKind::Echo => Arc::new(echo::EchoModule),
            ModuleKind::Payments => Arc::new(payments::PaymentsModule),
            ModuleKind::Capabilities => Arc::new(capabilities::CapabilitiesModule),
            ModuleKind::Failing => Arc::new(failing::FailingModule::new("module failed")),
        }
    }
}

impl FromStr for ModuleKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "echo" => Ok(ModuleKind::Echo),
            "payments" => Ok(ModuleKind::Payments),
            "capabilities" => Ok(ModuleKind::Capabilities),
            "failing" => Ok(ModuleKind::Failing),
            other => Err(RegistryError::MalformedInput(format!(
                "unknown module kind {other:?}"
            ))),
        }
    }
}
