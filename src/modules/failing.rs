use crate::domain::ports::{HandlerFault, HandlerModule};
use crate::domain::state::ExecutionContext;

/// Always fails with a fixed payload, after scribbling on shared state so
/// rollback is observable.
#[derive(Debug, Clone)]
pub struct FailingModule {
    payload: Vec<u8>,
}

impl FailingModule {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            payload: message.into().into_bytes(),
        }
    }

    pub fn with_payload(payload: Vec<u8>) -> Self {
        Self { payload }
    }
}

impl HandlerModule for FailingModule {
    fn invoke(
        &self,
        ctx: &mut ExecutionContext<'_>,
        _input: &[u8],
    ) -> Result<Vec<u8>, HandlerFault> {
        ctx.shared_mut()
            .put("failing/attempted", &true)
            .map_err(|e| HandlerFault::message(e.to_string()))?;
        Err(HandlerFault::new(self.payload.clone()))
    }
}
