//! The shape a verb dispatch hands back to the transport layer, before it is
//! folded into the request envelope.

use mash_core::ActionId;
use serde_json::Value as Json;

#[derive(Debug, Clone)]
pub enum ActionOutcome {
    /// Instant/free verbs resolve immediately; `Json` is the `result` payload.
    Immediate(Json),
    /// Queued verbs only confirm enqueuing; the real result arrives later as
    /// an `action_result` event.
    Queued { action_id: ActionId, tick_number: u64, ap_remaining: i32 },
}
