use crate::domain::ports::{Handler, RemainingTime};
use crate::utils::error::{EtlError, Result};
use serde_json::Value;

/// Decodes a raw invocation payload into the handler's event type.
pub fn decode_event<H: Handler>(payload: Value) -> Result<H::Event> {
    serde_json::from_value(payload).map_err(|e| EtlError::InvalidEventError {
        handler: H::NAME.to_string(),
        message: e.to_string(),
    })
}

/// Runs one invocation end to end on JSON: decode, handle, encode.
pub async fn invoke_json<H: Handler>(
    handler: &H,
    payload: Value,
    budget: &dyn RemainingTime,
) -> Result<Value> {
    let event = decode_event::<H>(payload)?;
    let output = handler.handle(event, budget).await?;
    Ok(serde_json::to_value(output)?)
}
