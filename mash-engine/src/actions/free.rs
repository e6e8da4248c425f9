//! Free verbs: cost nothing, never queued.

use mash_core::{AgentId, WorldConfig};
use mash_store::WorldData;
use serde_json::Value as Json;

use super::params::{opt_bool_field, opt_str_field, u32_field};
use crate::error::{ActionError, ActionResult};

pub fn dispatch(world: &mut WorldData, config: &WorldConfig, agent_id: AgentId, verb: &str, params: &Json) -> ActionResult<Json> {
    match verb {
        "configure" => configure(world, agent_id, params),
        "buy_ap" => buy_ap(world, config, agent_id, params),
        other => Err(ActionError::validation(format!("unknown free verb '{other}'"))),
    }
}

fn configure(world: &mut WorldData, agent_id: AgentId, params: &Json) -> ActionResult<Json> {
    let agent = world.agents.get_mut(&agent_id).ok_or_else(|| ActionError::not_found(agent_id))?;

    if let Some(s) = opt_str_field(params, "short_description") {
        agent.short_description = s.to_string();
    }
    if let Some(s) = opt_str_field(params, "long_description") {
        agent.long_description = s.to_string();
    }
    if let Some(see_broadcasts) = opt_bool_field(params, "see_broadcasts") {
        agent.see_broadcasts = see_broadcasts;
    }
    if let Some(caps) = params.get("perception_caps") {
        if let Some(n) = caps.get("agents").and_then(serde_json::Value::as_u64) {
            agent.perception_caps.agents = n as u32;
        }
        if let Some(n) = caps.get("links").and_then(serde_json::Value::as_u64) {
            agent.perception_caps.links = n as u32;
        }
        if let Some(n) = caps.get("things").and_then(serde_json::Value::as_u64) {
            agent.perception_caps.things = n as u32;
        }
        agent.perception_caps.clamp();
    }

    Ok(serde_json::json!({
        "short_description": agent.short_description,
        "long_description": agent.long_description,
        "see_broadcasts": agent.see_broadcasts,
        "perception_caps": agent.perception_caps,
    }))
}

fn buy_ap(world: &mut WorldData, config: &WorldConfig, agent_id: AgentId, params: &Json) -> ActionResult<Json> {
    let count = u32_field(params, "count")?;
    if count < 1 || count > config.max_buy_ap_per_call {
        return Err(ActionError::validation(format!(
            "count must be between 1 and {} per call",
            config.max_buy_ap_per_call
        )));
    }

    let agent = world.agents.get_mut(&agent_id).ok_or_else(|| ActionError::not_found(agent_id))?;
    let new_total = agent.purchased_ap_this_tick + count;
    if new_total > config.max_buy_ap {
        return Err(mash_core::PolicyError::BuyApCapExceeded.into());
    }

    agent.purchased_ap_this_tick = new_total;
    agent.ap += count as i32;
    Ok(serde_json::json!({"ap": agent.ap, "purchased_ap_this_tick": agent.purchased_ap_this_tick}))
}
