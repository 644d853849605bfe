use super::identity::{CapabilityId, Identity};
use super::registry::RegistryStorage;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The key/value state space every handler invocation reads and writes.
///
/// Values are stored as JSON so independently built modules can agree on a
/// layout without sharing Rust types.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SharedState {
    slots: BTreeMap<String, serde_json::Value>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> serde_json::Result<Option<T>> {
        self.slots
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }

    pub fn put<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> serde_json::Result<()> {
        let value = serde_json::to_value(value)?;
        self.slots.insert(key.into(), value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.slots.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Everything the deployed system persists: routing tables plus the state
/// space shared by all handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiamondState {
    pub registry: RegistryStorage,
    pub shared: SharedState,
}

impl DiamondState {
    pub fn new(registry: RegistryStorage) -> Self {
        Self {
            registry,
            shared: SharedState::new(),
        }
    }

    /// Lends the parts of the state a module may touch. Routing tables stay
    /// out of reach.
    pub fn context(&mut self, caller: Identity) -> ExecutionContext<'_> {
        ExecutionContext {
            caller,
            shared: &mut self.shared,
            capabilities: self.registry.capabilities_mut(),
        }
    }
}

/// What a module sees while it runs.
pub struct ExecutionContext<'a> {
    caller: Identity,
    shared: &'a mut SharedState,
    capabilities: &'a mut BTreeSet<CapabilityId>,
}

impl ExecutionContext<'_> {
    /// The identity that issued the call or cut.
    pub fn caller(&self) -> Identity {
        self.caller
    }

    pub fn shared(&self) -> &SharedState {
        &*self.shared
    }

    pub fn shared_mut(&mut self) -> &mut SharedState {
        &mut *self.shared
    }

    pub fn supports_capability(&self, id: CapabilityId) -> bool {
        self.capabilities.contains(&id)
    }

    pub fn set_capability(&mut self, id: CapabilityId, supported: bool) {
        if supported {
            self.capabilities.insert(id);
        } else {
            self.capabilities.remove(&id);
        }
    }
}
