use crate::domain::identity::Identity;
use crate::domain::ports::{CodeRegistry, HandlerModule, HandlerModuleRef};
use std::collections::HashMap;
use std::sync::Arc;

/// The set of deployed modules, keyed by identity.
///
/// An identity with no entry here "has no code": it can be neither bound by a
/// cut nor run as an initializer.
#[derive(Default, Clone)]
pub struct ModuleCatalog {
    modules: HashMap<Identity, HandlerModuleRef>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploys `module` under `identity`, replacing any previous code there.
    /// The sentinel identity is refused.
    pub fn deploy(&mut self, identity: Identity, module: impl HandlerModule + 'static) -> bool {
        self.deploy_shared(identity, Arc::new(module))
    }

    pub fn deploy_shared(&mut self, identity: Identity, module: HandlerModuleRef) -> bool {
        if identity.is_none() {
            return false;
        }
        self.modules.insert(identity, module);
        true
    }

    pub fn get(&self, identity: &Identity) -> Option<HandlerModuleRef> {
        self.modules.get(identity).cloned()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl CodeRegistry for ModuleCatalog {
    fn has_code(&self, identity: &Identity) -> bool {
        self.modules.contains_key(identity)
    }
}
