//! Enum types for MASH world entities.

use serde::{Deserialize, Serialize};

/// Discriminates the three entity kinds that templates/instances carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Node,
    Link,
    Thing,
}

/// Wired-in behaviour for instances that have no template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SystemType {
    #[default]
    None,
    RandomLink,
    LinkIndex,
}

/// Event category, as carried in the request envelope's `events[]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ActionResult,
    Chat,
    Broadcast,
    System,
}

/// Where a link/thing instance is currently contained.
///
/// Nodes always carry `container: None` on the owning `Instance` (top-level).
/// Links and things carry `Some(ContainerRef)`. The container graph excluding
/// the inventory edge is a forest rooted at nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContainerRef {
    /// Inside an agent's inventory.
    Agent { agent_id: crate::AgentId },
    /// Inside another instance (a node, or a thing nested in a thing, etc.)
    Instance { instance_id: crate::InstanceId },
}

impl ContainerRef {
    pub fn as_instance(&self) -> Option<crate::InstanceId> {
        match self {
            ContainerRef::Instance { instance_id } => Some(*instance_id),
            _ => None,
        }
    }

    pub fn as_agent(&self) -> Option<crate::AgentId> {
        match self {
            ContainerRef::Agent { agent_id } => Some(*agent_id),
            _ => None,
        }
    }
}
