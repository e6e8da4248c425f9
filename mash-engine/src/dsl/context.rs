//! Evaluation context for one `fire(self, verb, actor, subject)` invocation.

use mash_core::{AgentId, InstanceId};

/// An entity a reference can resolve to. Either an agent (inventory /
/// carrier) or an instance (node / link / thing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Agent(AgentId),
    Instance(InstanceId),
}

impl EntityRef {
    /// String form used when a reference resolves to a bare id, or when
    /// comparing against a container's raw id for `has`.
    pub fn id_string(&self) -> String {
        match self {
            EntityRef::Agent(id) => id.to_string(),
            EntityRef::Instance(id) => id.to_string(),
        }
    }
}

/// Everything an interaction rule's references may dereference, bound once
/// per `fire` call. `self`/`subject` are re-read from the store on every
/// dereference: this context only fixes *which ids* are bound, not a
/// snapshot of their fields.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext {
    pub self_id: InstanceId,
    pub actor: Option<AgentId>,
    pub subject: Option<EntityRef>,
}

impl EvalContext {
    pub fn new(self_id: InstanceId, actor: Option<AgentId>, subject: Option<EntityRef>) -> Self {
        Self { self_id, actor, subject }
    }
}

/// Per-invocation evaluation state: the `deny` flag every effect in the
/// call shares, including across nested conditional blocks.
#[derive(Debug, Default)]
pub struct EvalState {
    pub denied: bool,
}
