use crate::domain::ports::{HandlerFault, HandlerModule};
use crate::domain::state::ExecutionContext;

/// Returns whatever follows the selector. Useful for wiring checks.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoModule;

impl HandlerModule for EchoModule {
    fn invoke(
        &self,
        _ctx: &mut ExecutionContext<'_>,
        input: &[u8],
    ) -> Result<Vec<u8>, HandlerFault> {
        Ok(input.get(4..).unwrap_or_default().to_vec())
    }
}
