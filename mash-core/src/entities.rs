//! Core entity structures: Agent, Template, Instance, and the supporting
//! queue/event/link-usage/world-state rows.

use crate::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

// ============================================================================
// PERMISSIONS
// ============================================================================

/// The fixed set of capability keys a permission rule can gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKey {
    Interact,
    Edit,
    Contain,
    Perms,
    Delete,
    Inspect,
}

impl FromStr for PermissionKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interact" => Ok(PermissionKey::Interact),
            "edit" => Ok(PermissionKey::Edit),
            "contain" => Ok(PermissionKey::Contain),
            "perms" => Ok(PermissionKey::Perms),
            "delete" => Ok(PermissionKey::Delete),
            "inspect" => Ok(PermissionKey::Inspect),
            _ => Err(()),
        }
    }
}

/// A permission rule: `"any" | "none" | "owner" | "node" |
/// ["list", [username, ...]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionRule {
    Any,
    None,
    Owner,
    Node,
    List(Vec<String>),
}

pub type PermissionMap = BTreeMap<PermissionKey, PermissionRule>;

/// The stock default permissions assigned to a freshly-created template when
/// the creator did not specify any.
pub fn stock_default_permissions() -> PermissionMap {
    let mut m = PermissionMap::new();
    m.insert(PermissionKey::Interact, PermissionRule::Any);
    m.insert(PermissionKey::Edit, PermissionRule::Owner);
    m.insert(PermissionKey::Contain, PermissionRule::Owner);
    m.insert(PermissionKey::Perms, PermissionRule::Owner);
    m.insert(PermissionKey::Delete, PermissionRule::Owner);
    m.insert(PermissionKey::Inspect, PermissionRule::Any);
    m
}

// ============================================================================
// AGENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerceptionCaps {
    pub agents: u32,
    pub links: u32,
    pub things: u32,
}

impl Default for PerceptionCaps {
    fn default() -> Self {
        Self { agents: 20, links: 20, things: 20 }
    }
}

impl PerceptionCaps {
    pub fn clamp(&mut self) {
        self.agents = self.agents.clamp(1, 100);
        self.links = self.links.clamp(1, 100);
        self.things = self.things.clamp(1, 100);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub username: String,
    /// Opaque, rotatable bearer token. `None` once rotated away (old tokens
    /// are looked up by value, not stored per-token history).
    pub token: String,
    pub current_node_id: Option<InstanceId>,
    pub home_node_id: InstanceId,
    pub ap: i32,
    pub purchased_ap_this_tick: u32,
    pub short_description: String,
    pub long_description: String,
    pub perception_caps: PerceptionCaps,
    pub see_broadcasts: bool,
    pub last_active_at: Timestamp,
}

// ============================================================================
// TEMPLATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub owner_id: AgentId,
    pub name: String,
    pub kind: EntityKind,
    pub short_description: String,
    pub long_description: String,
    pub default_fields: FieldMap,
    pub default_permissions: PermissionMap,
    pub interactions: Vec<InteractionRule>,
}

// ============================================================================
// INSTANCE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    /// `None` means voided: the owning template was deleted.
    pub template_id: Option<TemplateId>,
    pub kind: EntityKind,
    pub short_description: String,
    pub long_description: String,
    pub fields: FieldMap,
    /// Sparse overrides; absent keys fall back to the template default.
    pub permissions: PermissionMap,
    /// `None` only for nodes (always top-level).
    pub container: Option<ContainerRef>,
    pub is_void: bool,
    pub is_destroyed: bool,
    pub system_type: SystemType,
    pub interactions_used_this_tick: u32,
}

impl Instance {
    pub fn is_live(&self) -> bool {
        !self.is_void && !self.is_destroyed
    }
}

// ============================================================================
// ACTION QUEUE ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionQueueEntry {
    pub ordinal: ActionId,
    pub agent_id: AgentId,
    pub verb: String,
    pub params: serde_json::Value,
    pub target_tick: u64,
    pub created_at: Timestamp,
}

// ============================================================================
// EVENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub ordinal: EventId,
    pub agent_id: AgentId,
    pub event_type: EventType,
    pub data: serde_json::Value,
    pub created_at: Timestamp,
}

// ============================================================================
// LINK USAGE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkUsageRecord {
    pub agent_id: AgentId,
    pub link_id: InstanceId,
    pub destination_node_id: InstanceId,
    pub destination_name: String,
    pub used_at: Timestamp,
}

// ============================================================================
// WORLD STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub tick_number: u64,
    pub last_tick_at: Timestamp,
}
