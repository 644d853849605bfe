use crate::domain::identity::CapabilityId;
use crate::domain::ports::{HandlerFault, HandlerModule};
use crate::domain::state::ExecutionContext;

/// Initializer that marks capabilities as supported.
///
/// The payload is UTF-8 text holding whitespace-separated `0x` capability
/// ids. A `-` prefix withdraws support instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct CapabilitiesModule;

impl CapabilitiesModule {
    /// Builds the payload that marks every id in `ids` as supported.
    pub fn payload(ids: &[CapabilityId]) -> Vec<u8> {
        ids.iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(" ")
            .into_bytes()
    }
}

impl HandlerModule for CapabilitiesModule {
    fn invoke(
        &self,
        ctx: &mut ExecutionContext<'_>,
        input: &[u8],
    ) -> Result<Vec<u8>, HandlerFault> {
        let text = std::str::from_utf8(input)
            .map_err(|_| HandlerFault::message("capability list is not UTF-8"))?;

        let mut changes = Vec::new();
        for token in text.split_whitespace() {
            let (supported, raw) = match token.strip_prefix('-') {
                Some(rest) => (false, rest),
                None => (true, token),
            };
            let id: CapabilityId = raw
                .parse()
                .map_err(|e| HandlerFault::message(format!("bad capability {token:?}: {e}")))?;
            changes.push((id, supported));
        }

        if changes.is_empty() {
            return Err(HandlerFault::message("no capabilities given"));
        }
        for (id, supported) in changes {
            ctx.set_capability(id, supported);
        }
        Ok(Vec::new())
    }
}
