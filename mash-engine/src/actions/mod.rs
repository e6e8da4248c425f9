//! Per-verb action handlers and the entry-point dispatcher that classifies
//! a verb, charges AP, and either runs it immediately or enqueues it for
//! the next tick.

mod free;
mod instant;
mod params;
mod queued;
mod result;

pub use queued::run_queued;
pub use result::ActionOutcome;

use mash_core::{AgentId, Instance, PerceptionCaps, WorldConfig};
use mash_store::WorldData;
use serde_json::Value as Json;

use crate::error::{ActionError, ActionResult};

/// Which AP bucket a verb draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbClass {
    Instant,
    Queued,
    Free,
}

/// `look`/`survey`/`inspect`/`say`/`list` run synchronously and cost 1 AP;
/// `configure`/`buy_ap` are free; everything else (including every
/// unrecognised custom verb) is queued for the tick.
pub fn classify_verb(verb: &str) -> VerbClass {
    match verb {
        "look" | "survey" | "inspect" | "say" | "list" => VerbClass::Instant,
        "configure" | "buy_ap" => VerbClass::Free,
        _ => VerbClass::Queued,
    }
}

/// Run `verb` for `agent_id`. Instant/free verbs execute inline and return
/// their result; queued verbs enqueue for `current_tick + 1` and return a
/// confirmation shape the caller can poll against once it lands.
pub fn dispatch(
    world: &mut WorldData,
    config: &WorldConfig,
    agent_id: AgentId,
    verb: &str,
    params: Json,
    current_tick: u64,
) -> ActionResult<ActionOutcome> {
    if !world.agents.contains_key(&agent_id) {
        return Err(ActionError::not_found(agent_id));
    }

    let class = classify_verb(verb);
    let cost: i32 = match class {
        VerbClass::Free => 0,
        VerbClass::Instant => 1,
        VerbClass::Queued if verb == "travel" => params::via_hops(&params)?.len() as i32,
        VerbClass::Queued => 1,
    };

    let ap = world.agents.get(&agent_id).map(|a| a.ap).unwrap_or(0);
    if ap < cost {
        return Err(mash_core::PolicyError::NoApRemaining.into());
    }
    if let Some(agent) = world.agents.get_mut(&agent_id) {
        agent.ap -= cost;
    }

    match class {
        VerbClass::Free => {
            let value = free::dispatch(world, config, agent_id, verb, &params)?;
            Ok(ActionOutcome::Immediate(value))
        }
        VerbClass::Instant => {
            let value = instant::dispatch(world, config, agent_id, verb, &params)?;
            Ok(ActionOutcome::Immediate(value))
        }
        VerbClass::Queued => {
            let target_tick = current_tick + 1;
            let action_id = world.enqueue(agent_id, verb.to_string(), params, target_tick);
            let ap_remaining = world.agents.get(&agent_id).map(|a| a.ap).unwrap_or(0);
            Ok(ActionOutcome::Queued { action_id, tick_number: target_tick, ap_remaining })
        }
    }
}

// -- shared perception/visibility helpers, used by `instant` and `queued` --

/// Is `instance_id` reachable by walking up `self`'s container chain to
/// `agent_id`'s inventory (directly, or nested inside something the agent
/// carries)?
pub(crate) fn in_agent_inventory(world: &WorldData, agent_id: AgentId, instance_id: mash_core::InstanceId) -> bool {
    const WALK_GUARD: u32 = 64;
    let Some(mut current) = world.instances.get(&instance_id) else { return false };
    for _ in 0..WALK_GUARD {
        match current.container {
            Some(mash_core::ContainerRef::Agent { agent_id: holder }) => return holder == agent_id,
            Some(mash_core::ContainerRef::Instance { instance_id: parent_id }) => {
                let Some(parent) = world.instances.get(&parent_id) else { return false };
                current = parent;
            }
            None => return false,
        }
    }
    false
}

/// True if `instance_id` is visible to `agent_id`: in the agent's current
/// node, or anywhere in the agent's inventory chain.
pub(crate) fn is_visible(world: &WorldData, agent_id: AgentId, instance_id: mash_core::InstanceId) -> bool {
    if in_agent_inventory(world, agent_id, instance_id) {
        return true;
    }
    let Some(agent_node) = world.agents.get(&agent_id).and_then(|a| a.current_node_id) else { return false };
    mash_permission::containing_node(world, instance_id) == Some(agent_node)
}

fn short_card(inst: &Instance) -> Json {
    serde_json::json!({
        "id": inst.id.to_string(),
        "kind": inst.kind,
        "short_description": inst.short_description,
    })
}

/// A perception-capped listing of a node's immediate contents, split by
/// kind. `caps = None` bypasses the limits (`survey`).
pub(crate) fn node_snapshot(world: &WorldData, node_id: mash_core::InstanceId, caps: Option<&PerceptionCaps>) -> Json {
    let node = world.instances.get(&node_id);
    let contents = world.live_contents_sorted(mash_store::ContainerKey::Instance(node_id));

    let mut agents: Vec<Json> = world
        .agents_in_node(node_id)
        .into_iter()
        .filter_map(|id| world.agents.get(&id))
        .map(|a| serde_json::json!({"id": a.id.to_string(), "username": a.username, "short_description": a.short_description}))
        .collect();
    agents.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));

    let mut links: Vec<Json> = Vec::new();
    let mut things: Vec<Json> = Vec::new();
    for id in contents {
        let Some(inst) = world.instances.get(&id) else { continue };
        match inst.kind {
            mash_core::EntityKind::Link => links.push(short_card(inst)),
            mash_core::EntityKind::Thing => things.push(short_card(inst)),
            mash_core::EntityKind::Node => {}
        }
    }

    if let Some(caps) = caps {
        agents.truncate(caps.agents as usize);
        links.truncate(caps.links as usize);
        things.truncate(caps.things as usize);
    }

    serde_json::json!({
        "type": "node",
        "id": node_id.to_string(),
        "short_description": node.map(|n| n.short_description.clone()).unwrap_or_default(),
        "long_description": node.map(|n| n.long_description.clone()).unwrap_or_default(),
        "agents": agents,
        "links": links,
        "things": things,
    })
}
