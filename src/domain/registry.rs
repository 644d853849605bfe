//! Selector routing tables and the primitives that keep them consistent.
//!
//! Three structures cross-reference each other by plain integer positions:
//! the selector index points into each handler's selector list, and each
//! handler entry points into the global handler list. Every structural move
//! (swap-and-truncate) rewrites the stored position of the element it moved.

use super::cut::{CutAction, HandlerCut};
use super::identity::{CapabilityId, Identity, Selector};
use super::ports::CodeRegistry;
use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Where a selector lives: its handler and its index in that handler's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorBinding {
    pub handler: Identity,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerEntry {
    pub selectors: Vec<Selector>,
    /// Index of the handler in the global handler list.
    pub position: usize,
}

/// A handler together with the selectors bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Facet {
    pub handler: Identity,
    pub selectors: Vec<Selector>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStorage {
    selector_index: BTreeMap<Selector, SelectorBinding>,
    handler_selectors: BTreeMap<Identity, HandlerEntry>,
    handlers: Vec<Identity>,
    owner: Identity,
    capabilities: BTreeSet<CapabilityId>,
    bootstrap: Selector,
}

impl RegistryStorage {
    /// Creates the initial routing table: `owner` set and the bootstrap
    /// selector bound to `bootstrap_handler`.
    pub fn bootstrap(owner: Identity, bootstrap: Selector, bootstrap_handler: Identity) -> Self {
        let mut storage = Self {
            selector_index: BTreeMap::new(),
            handler_selectors: BTreeMap::new(),
            handlers: Vec::new(),
            owner,
            capabilities: BTreeSet::new(),
            bootstrap,
        };
        storage.bind(bootstrap, bootstrap_handler);
        storage
    }

    pub fn owner(&self) -> Identity {
        self.owner
    }

    pub fn bootstrap_selector(&self) -> Selector {
        self.bootstrap
    }

    /// Handler the bootstrap selector is bound to.
    pub fn bootstrap_handler(&self) -> Option<Identity> {
        self.handler_of(self.bootstrap)
    }

    pub fn ensure_owner(&self, caller: Identity) -> Result<()> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(RegistryError::UnauthorizedMutation { caller })
        }
    }

    pub fn transfer_ownership(&mut self, caller: Identity, new_owner: Identity) -> Result<Identity> {
        self.ensure_owner(caller)?;
        let previous = self.owner;
        self.owner = new_owner;
        Ok(previous)
    }

    pub fn handlers(&self) -> &[Identity] {
        &self.handlers
    }

    pub fn selectors(&self, handler: Identity) -> &[Selector] {
        self.handler_selectors
            .get(&handler)
            .map(|entry| entry.selectors.as_slice())
            .unwrap_or(&[])
    }

    pub fn handler_of(&self, selector: Selector) -> Option<Identity> {
        self.selector_index.get(&selector).map(|binding| binding.handler)
    }

    pub fn binding(&self, selector: Selector) -> Option<SelectorBinding> {
        self.selector_index.get(&selector).copied()
    }

    pub fn facets(&self) -> Vec<Facet> {
        self.handlers
            .iter()
            .map(|handler| Facet {
                handler: *handler,
                selectors: self.selectors(*handler).to_vec(),
            })
            .collect()
    }

    pub fn supports_capability(&self, id: CapabilityId) -> bool {
        self.capabilities.contains(&id)
    }

    pub(crate) fn capabilities_mut(&mut self) -> &mut BTreeSet<CapabilityId> {
        &mut self.capabilities
    }

    /// Applies one cut operation in place. Callers stage a copy first: a
    /// failure part-way leaves this storage half-mutated.
    pub fn apply(&mut self, cut: &HandlerCut, code: &dyn CodeRegistry) -> Result<()> {
        if cut.selectors.is_empty() {
            return Err(RegistryError::EmptySelectorBatch {
                handler: cut.handler,
            });
        }

        match cut.action {
            CutAction::Add => self.add_selectors(cut.handler, &cut.selectors, code),
            CutAction::Replace => self.replace_selectors(cut.handler, &cut.selectors, code),
            CutAction::Remove => self.remove_selectors(cut.handler, &cut.selectors),
        }
    }

    fn ensure_code(handler: Identity, code: &dyn CodeRegistry) -> Result<()> {
        if handler.is_none() || !code.has_code(&handler) {
            return Err(RegistryError::HandlerHasNoCode(handler));
        }
        Ok(())
    }

    fn add_selectors(
        &mut self,
        handler: Identity,
        selectors: &[Selector],
        code: &dyn CodeRegistry,
    ) -> Result<()> {
        Self::ensure_code(handler, code)?;
        for &selector in selectors {
            if let Some(existing) = self.handler_of(selector) {
                return Err(RegistryError::DuplicateSelectorOnAdd {
                    selector,
                    handler: existing,
                });
            }
            self.bind(selector, handler);
        }
        Ok(())
    }

    fn replace_selectors(
        &mut self,
        handler: Identity,
        selectors: &[Selector],
        code: &dyn CodeRegistry,
    ) -> Result<()> {
        Self::ensure_code(handler, code)?;
        for &selector in selectors {
            if selector == self.bootstrap {
                return Err(RegistryError::InvalidReplaceTarget {
                    selector,
                    reason: "the bootstrap entry point is immutable",
                });
            }
            match self.handler_of(selector) {
                None => {
                    return Err(RegistryError::InvalidReplaceTarget {
                        selector,
                        reason: "selector is not bound",
                    });
                }
                Some(current) if current == handler => {
                    return Err(RegistryError::InvalidReplaceTarget {
                        selector,
                        reason: "selector is already bound to this handler",
                    });
                }
                Some(_) => {
                    self.unbind(selector)?;
                    self.bind(selector, handler);
                }
            }
        }
        Ok(())
    }

    fn remove_selectors(&mut self, handler: Identity, selectors: &[Selector]) -> Result<()> {
        if !handler.is_none() {
            return Err(RegistryError::InvalidRemovalTarget {
                reason: format!("remove must name the none handler, got {handler}"),
            });
        }
        for &selector in selectors {
            if selector == self.bootstrap {
                return Err(RegistryError::InvalidRemovalTarget {
                    reason: format!("bootstrap selector {selector} cannot be removed"),
                });
            }
            if self.unbind(selector)?.is_none() {
                return Err(RegistryError::InvalidRemovalTarget {
                    reason: format!("selector {selector} is not bound"),
                });
            }
        }
        Ok(())
    }

    /// Binds an unbound selector, appending `handler` to the global list if
    /// this is its first selector.
    fn bind(&mut self, selector: Selector, handler: Identity) {
        let next_handler_position = self.handlers.len();
        let entry = self
            .handler_selectors
            .entry(handler)
            .or_insert_with(|| HandlerEntry {
                selectors: Vec::new(),
                position: next_handler_position,
            });
        if entry.selectors.is_empty() {
            self.handlers.push(handler);
        }

        let position = entry.selectors.len();
        entry.selectors.push(selector);
        self.selector_index
            .insert(selector, SelectorBinding { handler, position });
    }

    /// Unbinds a selector by swap-and-truncate. Returns the handler it was
    /// bound to, or `None` if it was unbound.
    fn unbind(&mut self, selector: Selector) -> Result<Option<Identity>> {
        let Some(binding) = self.selector_index.remove(&selector) else {
            return Ok(None);
        };

        let entry = self.handler_selectors.get_mut(&binding.handler).ok_or_else(|| {
            RegistryError::CorruptedStorage(format!(
                "selector {selector} points at unknown handler {}",
                binding.handler
            ))
        })?;
        if entry.selectors.get(binding.position) != Some(&selector) {
            return Err(RegistryError::CorruptedStorage(format!(
                "selector {selector} is not at its recorded position {}",
                binding.position
            )));
        }

        entry.selectors.swap_remove(binding.position);
        if let Some(&moved) = entry.selectors.get(binding.position) {
            let moved_binding = self.selector_index.get_mut(&moved).ok_or_else(|| {
                RegistryError::CorruptedStorage(format!("selector {moved} missing from index"))
            })?;
            moved_binding.position = binding.position;
        }

        if entry.selectors.is_empty() {
            let handler_position = entry.position;
            self.handler_selectors.remove(&binding.handler);
            self.remove_handler_at(binding.handler, handler_position)?;
        }

        Ok(Some(binding.handler))
    }

    fn remove_handler_at(&mut self, handler: Identity, position: usize) -> Result<()> {
        if self.handlers.get(position) != Some(&handler) {
            return Err(RegistryError::CorruptedStorage(format!(
                "handler {handler} is not at its recorded position {position}"
            )));
        }

        self.handlers.swap_remove(position);
        if let Some(&moved) = self.handlers.get(position) {
            let moved_entry = self.handler_selectors.get_mut(&moved).ok_or_else(|| {
                RegistryError::CorruptedStorage(format!("handler {moved} has no selector entry"))
            })?;
            moved_entry.position = position;
        }
        Ok(())
    }

    /// Verifies every cross-reference between the three routing structures.
    pub fn check_invariants(&self) -> Result<()> {
        let corrupted = |msg: String| Err(RegistryError::CorruptedStorage(msg));

        for (selector, binding) in &self.selector_index {
            let Some(entry) = self.handler_selectors.get(&binding.handler) else {
                return corrupted(format!(
                    "selector {selector} bound to unlisted handler {}",
                    binding.handler
                ));
            };
            if entry.selectors.get(binding.position) != Some(selector) {
                return corrupted(format!(
                    "selector {selector} not found at position {} of handler {}",
                    binding.position, binding.handler
                ));
            }
        }

        let mut seen = BTreeSet::new();
        for (position, handler) in self.handlers.iter().enumerate() {
            if !seen.insert(*handler) {
                return corrupted(format!("handler {handler} listed twice"));
            }
            let Some(entry) = self.handler_selectors.get(handler) else {
                return corrupted(format!("handler {handler} has no selector entry"));
            };
            if entry.position != position {
                return corrupted(format!(
                    "handler {handler} records position {} but sits at {position}",
                    entry.position
                ));
            }
        }

        let mut total = 0;
        for (handler, entry) in &self.handler_selectors {
            if entry.selectors.is_empty() {
                return corrupted(format!("handler {handler} has no selectors"));
            }
            if self.handlers.get(entry.position) != Some(handler) {
                return corrupted(format!("handler {handler} missing from handler list"));
            }
            for (position, selector) in entry.selectors.iter().enumerate() {
                let expected = SelectorBinding {
                    handler: *handler,
                    position,
                };
                if self.selector_index.get(selector) != Some(&expected) {
                    return corrupted(format!(
                        "selector {selector} of handler {handler} has a stale index entry"
                    ));
                }
            }
            total += entry.selectors.len();
        }

        if total != self.selector_index.len() {
            return corrupted(format!(
                "{} indexed selectors but {total} listed",
                self.selector_index.len()
            ));
        }
        if self.handler_selectors.len() != self.handlers.len() {
            return corrupted("handler entries and handler list disagree".to_string());
        }
        Ok(())
    }
}
