use crate::core::errors::ExchangeError;
use crate::core::types::{HubInvocation, SessionEvent};
use serde_json::Value;

/// Parse one raw inbound frame and route its contents to `emit`.
///
/// A frame shaped `{"M": [...]}` produces one event per element, in the
/// element order of the frame; multiple logical updates inside one physical
/// frame are never merged or reordered, and an empty sequence (the
/// keep-alive shape) produces none. Any other shape produces a single
/// `Unhandled` event wrapping the parsed value. A JSON parse failure is
/// returned as `ParseError` and is isolated to this call: the next
/// well-formed frame dispatches normally.
pub fn dispatch<F>(raw: &str, mut emit: F) -> Result<(), ExchangeError>
where
    F: FnMut(SessionEvent),
{
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ExchangeError::ParseError(format!("Failed to parse hub frame: {}", e)))?;

    match value.get("M").and_then(Value::as_array) {
        Some(invocations) => {
            for invocation in invocations {
                match serde_json::from_value::<HubInvocation>(invocation.clone()) {
                    Ok(parsed) => emit(SessionEvent::Delta(parsed)),
                    // An element that is not a method invocation is still
                    // forwarded rather than dropped.
                    Err(_) => emit(SessionEvent::Unhandled(invocation.clone())),
                }
            }
        }
        None => emit(SessionEvent::Unhandled(value)),
    }

    Ok(())
}
