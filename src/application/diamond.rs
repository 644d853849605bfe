use super::catalog::ModuleCatalog;
use crate::domain::cut::{CutRecord, CutRequest, HandlerCut, Initializer};
use crate::domain::identity::{CapabilityId, Identity, Selector};
use crate::domain::ports::{HandlerModule, HandlerModuleRef, StateStore, StateStoreBox};
use crate::domain::registry::{Facet, RegistryStorage};
use crate::domain::state::DiamondState;
use crate::error::{RegistryError, Result};
use tracing::{debug, info, warn};

/// Signature of the bootstrap entry point. Its selector is bound at creation
/// and can never be replaced or removed.
pub const CUT_SIGNATURE: &str = "diamondCut((address,uint8,bytes4[])[],address,bytes)";

/// The deployed dispatch registry.
///
/// `Diamond` owns the one live [`DiamondState`]. Every mutating entry point
/// takes `&mut self`, so calls are processed one at a time in a total order.
/// Each of them works on a staged copy and commits it (persisting through the
/// [`StateStore`]) only once every step has succeeded; any failure leaves the
/// live state untouched.
pub struct Diamond {
    state: DiamondState,
    catalog: ModuleCatalog,
    store: StateStoreBox,
    cut_log: Vec<CutRecord>,
}

impl Diamond {
    /// Opens the registry held by `store`, or creates and persists a fresh one
    /// owned by `owner` with the bootstrap selector bound to
    /// `bootstrap_handler`.
    ///
    /// When the store already holds a snapshot, its owner wins over `owner`.
    pub async fn open(
        owner: Identity,
        bootstrap_handler: Identity,
        catalog: ModuleCatalog,
        store: StateStoreBox,
    ) -> Result<Self> {
        let state = match store.load().await? {
            Some(state) => {
                state.registry.check_invariants()?;
                info!(
                    owner = %state.registry.owner(),
                    handlers = state.registry.handlers().len(),
                    "loaded registry snapshot"
                );
                state
            }
            None => {
                let registry = RegistryStorage::bootstrap(
                    owner,
                    Selector::from_signature(CUT_SIGNATURE),
                    bootstrap_handler,
                );
                let state = DiamondState::new(registry);
                store.save(&state).await?;
                info!(%owner, %bootstrap_handler, "bootstrapped new registry");
                state
            }
        };

        Ok(Self {
            state,
            catalog,
            store,
            cut_log: Vec::new(),
        })
    }

    /// Makes `module` executable under `identity`. Returns `false` for the
    /// sentinel identity.
    pub fn deploy(&mut self, identity: Identity, module: impl HandlerModule + 'static) -> bool {
        self.catalog.deploy(identity, module)
    }

    pub fn deploy_shared(&mut self, identity: Identity, module: HandlerModuleRef) -> bool {
        self.catalog.deploy_shared(identity, module)
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    pub fn state(&self) -> &DiamondState {
        &self.state
    }

    /// Every committed cut, oldest first.
    pub fn cut_log(&self) -> &[CutRecord] {
        &self.cut_log
    }

    /// Applies a batch of cuts and runs the optional initializer, all or
    /// nothing.
    pub async fn cut(
        &mut self,
        caller: Identity,
        cuts: Vec<HandlerCut>,
        initializer: Option<Initializer>,
    ) -> Result<CutRecord> {
        if let Err(err) = self.state.registry.ensure_owner(caller) {
            warn!(%caller, "unauthorized cut rejected");
            return Err(err);
        }

        let mut stage = self.state.clone();
        if let Err(err) = self.apply_staged(&mut stage, caller, &cuts, initializer.as_ref()) {
            warn!(%caller, operations = cuts.len(), error = %err, "cut rejected");
            return Err(err);
        }
        self.commit(stage).await?;

        let record = CutRecord::new(cuts, initializer.as_ref());
        info!(
            %caller,
            operations = record.cuts.len(),
            selectors = record.selector_count(),
            initializer = ?record.initializer,
            ?record,
            "cut applied"
        );
        self.cut_log.push(record.clone());
        Ok(record)
    }

    fn apply_staged(
        &self,
        stage: &mut DiamondState,
        caller: Identity,
        cuts: &[HandlerCut],
        initializer: Option<&Initializer>,
    ) -> Result<()> {
        for cut in cuts {
            stage.registry.apply(cut, &self.catalog)?;
        }

        if let Some(init) = initializer {
            let module = self
                .catalog
                .get(&init.handler)
                .ok_or(RegistryError::HandlerHasNoCode(init.handler))?;
            let mut ctx = stage.context(caller);
            module
                .invoke(&mut ctx, &init.payload)
                .map_err(|fault| RegistryError::InitializerFailure {
                    initializer: init.handler,
                    fault,
                })?;
        }

        stage.registry.check_invariants()
    }

    /// Routes `calldata` by its leading selector.
    ///
    /// The bootstrap selector runs [`Diamond::cut`] with a JSON
    /// [`CutRequest`] payload; any other bound selector runs its module with
    /// the full calldata. Module output and faults pass through unmodified.
    pub async fn call(&mut self, caller: Identity, calldata: &[u8]) -> Result<Vec<u8>> {
        let selector = Selector::from_calldata(calldata).ok_or_else(|| {
            RegistryError::MalformedInput(format!(
                "calldata must start with a 4-byte selector, got {} bytes",
                calldata.len()
            ))
        })?;

        let Some(handler) = self.state.registry.handler_of(selector) else {
            debug!(%caller, %selector, "unknown selector");
            return Err(RegistryError::UnknownSelector(selector));
        };

        if selector == self.state.registry.bootstrap_selector() {
            let request: CutRequest = serde_json::from_slice(&calldata[4..])
                .map_err(|e| RegistryError::MalformedInput(format!("cut payload: {e}")))?;
            self.cut(caller, request.cuts, request.initializer).await?;
            return Ok(Vec::new());
        }

        let module = self
            .catalog
            .get(&handler)
            .ok_or(RegistryError::HandlerHasNoCode(handler))?;

        let mut stage = self.state.clone();
        let outcome = {
            let mut ctx = stage.context(caller);
            module.invoke(&mut ctx, calldata)
        };

        match outcome {
            Ok(output) => {
                if stage != self.state {
                    self.commit(stage).await?;
                }
                debug!(%caller, %selector, %handler, output_len = output.len(), "call dispatched");
                Ok(output)
            }
            Err(fault) => {
                debug!(%caller, %selector, %handler, %fault, "handler failed");
                Err(RegistryError::HandlerFailed { handler, fault })
            }
        }
    }

    pub fn owner(&self) -> Identity {
        self.state.registry.owner()
    }

    pub async fn transfer_ownership(&mut self, caller: Identity, new_owner: Identity) -> Result<()> {
        let mut stage = self.state.clone();
        let previous = match stage.registry.transfer_ownership(caller, new_owner) {
            Ok(previous) => previous,
            Err(err) => {
                warn!(%caller, "unauthorized ownership transfer rejected");
                return Err(err);
            }
        };
        self.commit(stage).await?;
        info!(previous_owner = %previous, %new_owner, "ownership transferred");
        Ok(())
    }

    pub fn handlers(&self) -> &[Identity] {
        self.state.registry.handlers()
    }

    pub fn selectors(&self, handler: Identity) -> &[Selector] {
        self.state.registry.selectors(handler)
    }

    pub fn handler_of(&self, selector: Selector) -> Option<Identity> {
        self.state.registry.handler_of(selector)
    }

    pub fn supports_capability(&self, id: CapabilityId) -> bool {
        self.state.registry.supports_capability(id)
    }

    pub fn facets(&self) -> Vec<Facet> {
        self.state.registry.facets()
    }

    async fn commit(&mut self, stage: DiamondState) -> Result<()> {
        self.store.save(&stage).await?;
        self.state = stage;
        Ok(())
    }
}
