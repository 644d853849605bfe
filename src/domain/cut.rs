use super::identity::{Identity, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CutAction {
    Add,
    Replace,
    Remove,
}

impl fmt::Display for CutAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CutAction::Add => "add",
            CutAction::Replace => "replace",
            CutAction::Remove => "remove",
        };
        f.write_str(name)
    }
}

/// One operation of a cut batch.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct HandlerCut {
    pub handler: Identity,
    pub action: CutAction,
    pub selectors: Vec<Selector>,
}

impl HandlerCut {
    pub fn add(handler: Identity, selectors: Vec<Selector>) -> Self {
        Self {
            handler,
            action: CutAction::Add,
            selectors,
        }
    }

    pub fn replace(handler: Identity, selectors: Vec<Selector>) -> Self {
        Self {
            handler,
            action: CutAction::Replace,
            selectors,
        }
    }

    /// Removal is keyed by selector alone, so the handler is always the
    /// sentinel.
    pub fn remove(selectors: Vec<Selector>) -> Self {
        Self {
            handler: Identity::NONE,
            action: CutAction::Remove,
            selectors,
        }
    }
}

/// Module run once against the mutated state after a batch applies.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct Initializer {
    pub handler: Identity,
    #[serde(default)]
    pub payload: Vec<u8>,
}

impl Initializer {
    pub fn new(handler: Identity, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            handler,
            payload: payload.into(),
        }
    }
}

/// Wire form of a cut submitted through the bootstrap selector.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Default)]
pub struct CutRequest {
    pub cuts: Vec<HandlerCut>,
    #[serde(default)]
    pub initializer: Option<Initializer>,
}

/// Descriptive record of a committed batch, published for observers.
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct CutRecord {
    pub cuts: Vec<HandlerCut>,
    pub initializer: Option<Identity>,
    pub init_payload_len: usize,
}

impl CutRecord {
    pub fn new(cuts: Vec<HandlerCut>, initializer: Option<&Initializer>) -> Self {
        Self {
            cuts,
            initializer: initializer.map(|init| init.handler),
            init_payload_len: initializer.map_or(0, |init| init.payload.len()),
        }
    }

    pub fn selector_count(&self) -> usize {
        self.cuts.iter().map(|cut| cut.selectors.len()).sum()
    }
}
