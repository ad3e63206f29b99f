use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response envelope wrapped around every REST payload.
///
/// The exchange always answers HTTP 200 for well-formed requests and signals
/// failure through the `success` flag; `result` carries the endpoint-specific
/// payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
}

/// A single method invocation delivered inside a hub frame.
///
/// Server-to-client frames are shaped `{"M": [{...}, ...]}` where each
/// element names a hub (`H`), a method (`M`, e.g. `updateExchangeState`) and
/// its arguments (`A`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubInvocation {
    #[serde(rename = "H", default, skip_serializing_if = "Option::is_none")]
    pub hub: Option<String>,
    #[serde(rename = "M")]
    pub method: String,
    #[serde(rename = "A", default)]
    pub args: Vec<Value>,
}

/// A single event fanned out to streaming listeners.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// One method invocation out of a frame's `M` sequence, in frame order.
    Delta(HubInvocation),
    /// A frame (or frame element) whose shape was not recognized; the parsed
    /// value is forwarded rather than dropped silently.
    Unhandled(Value),
}
