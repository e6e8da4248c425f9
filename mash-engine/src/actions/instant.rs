//! Instant verbs: read or chat, executed synchronously, 1 AP.

use std::str::FromStr;

use mash_core::{AgentId, EntityKind, EventType, InstanceId, PermissionKey, TemplateId, WorldConfig};
use mash_store::WorldData;
use serde_json::Value as Json;

use super::params::{opt_str_field, str_field};
use super::{is_visible, node_snapshot};
use crate::error::{ActionError, ActionResult};

pub fn dispatch(world: &mut WorldData, config: &WorldConfig, agent_id: AgentId, verb: &str, params: &Json) -> ActionResult<Json> {
    match verb {
        "look" => look(world, config, agent_id, opt_str_field(params, "target")),
        "survey" => survey(world, agent_id, opt_str_field(params, "category")),
        "inspect" => inspect(world, agent_id, str_field(params, "target_id")?),
        "say" => say(world, agent_id, str_field(params, "message")?),
        "list" => list(world, agent_id, str_field(params, "template_id")?),
        other => Err(ActionError::validation(format!("unknown instant verb '{other}'"))),
    }
}

fn current_node(world: &WorldData, agent_id: AgentId) -> ActionResult<InstanceId> {
    world
        .agents
        .get(&agent_id)
        .and_then(|a| a.current_node_id)
        .ok_or_else(|| ActionError::validation("agent is not currently in a node"))
}

fn look(world: &WorldData, config: &WorldConfig, agent_id: AgentId, target: Option<&str>) -> ActionResult<Json> {
    let node_id = current_node(world, agent_id)?;
    let Some(target) = target else {
        let caps = world.agents.get(&agent_id).map(|a| a.perception_caps.clone());
        return Ok(node_snapshot(world, node_id, caps.as_ref()));
    };

    if let Ok(instance_id) = InstanceId::from_str(target) {
        if let Some(inst) = world.instances.get(&instance_id) {
            if inst.kind == EntityKind::Node {
                if instance_id == node_id {
                    let caps = world.agents.get(&agent_id).map(|a| a.perception_caps.clone());
                    return Ok(node_snapshot(world, instance_id, caps.as_ref()));
                }
                return Err(ActionError::not_found(target));
            }
            if !is_visible(world, agent_id, instance_id) {
                return Err(ActionError::not_found(target));
            }
            if inst.system_type == mash_core::SystemType::LinkIndex {
                let records = world.recent_link_usage(agent_id, config.link_index_history);
                let history: Vec<Json> = records
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "link_id": r.link_id.to_string(),
                            "destination_node_id": r.destination_node_id.to_string(),
                            "destination_name": r.destination_name,
                            "used_at": r.used_at,
                        })
                    })
                    .collect();
                return Ok(serde_json::json!({
                    "type": "link_index",
                    "id": inst.id.to_string(),
                    "short_description": inst.short_description,
                    "history": history,
                }));
            }
            return Ok(serde_json::json!({
                "type": inst.kind,
                "id": inst.id.to_string(),
                "short_description": inst.short_description,
                "long_description": inst.long_description,
            }));
        }
    }

    if let Ok(target_agent_id) = AgentId::from_str(target) {
        if let Some(agent) = world.agents.get(&target_agent_id) {
            if agent.current_node_id == Some(node_id) {
                return Ok(serde_json::json!({
                    "type": "agent",
                    "id": agent.id.to_string(),
                    "username": agent.username,
                    "short_description": agent.short_description,
                    "long_description": agent.long_description,
                }));
            }
        }
    }

    Err(ActionError::not_found(target))
}

fn survey(world: &WorldData, agent_id: AgentId, category: Option<&str>) -> ActionResult<Json> {
    let node_id = current_node(world, agent_id)?;
    let mut snapshot = node_snapshot(world, node_id, None);
    if let Some(category) = category {
        let selected = snapshot.get(category).cloned().unwrap_or(Json::Array(vec![]));
        snapshot = serde_json::json!({ "type": "node", "id": node_id.to_string(), category: selected });
    }
    Ok(snapshot)
}

fn inspect(world: &WorldData, agent_id: AgentId, target_id: &str) -> ActionResult<Json> {
    let instance_id = InstanceId::from_str(target_id).map_err(|_| ActionError::validation("target_id is not a valid id"))?;
    let inst = world.instances.get(&instance_id).ok_or_else(|| ActionError::not_found(target_id))?;
    if !mash_permission::check(world, agent_id, inst, PermissionKey::Inspect) {
        return Err(ActionError::denied("inspect", target_id));
    }

    let template = inst.template_id.and_then(|tid| world.templates.get(&tid));
    let owner_username = template.and_then(|t| world.agents.get(&t.owner_id)).map(|a| a.username.clone());
    let mut result = serde_json::json!({
        "id": inst.id.to_string(),
        "template_id": inst.template_id.map(|t| t.to_string()),
        "kind": inst.kind,
        "owner": owner_username,
        "short_description": inst.short_description,
        "long_description": inst.long_description,
        "fields": mash_core::field_map_to_json(&inst.fields),
        "is_void": inst.is_void,
        "is_destroyed": inst.is_destroyed,
    });

    if mash_permission::check(world, agent_id, inst, PermissionKey::Perms) {
        let obj = result.as_object_mut().expect("object literal");
        obj.insert(
            "permissions".to_string(),
            serde_json::to_value(&inst.permissions).unwrap_or(Json::Null),
        );
        if let Some(t) = template {
            obj.insert(
                "default_permissions".to_string(),
                serde_json::to_value(&t.default_permissions).unwrap_or(Json::Null),
            );
            obj.insert(
                "interactions".to_string(),
                mash_dsl::interactions_to_json(&t.interactions),
            );
        }
    }

    Ok(result)
}

fn say(world: &mut WorldData, agent_id: AgentId, message: &str) -> ActionResult<Json> {
    let node_id = current_node(world, agent_id)?;
    let (username, agent_id_str) = {
        let agent = world.agents.get(&agent_id).ok_or_else(|| ActionError::not_found(agent_id))?;
        (agent.username.clone(), agent.id.to_string())
    };

    let mut delivered = 0;
    for recipient in world.agents_in_node(node_id) {
        if recipient == agent_id {
            continue;
        }
        let Some(recipient_agent) = world.agents.get(&recipient) else { continue };
        if !recipient_agent.see_broadcasts {
            continue;
        }
        world.push_event(
            recipient,
            EventType::Chat,
            serde_json::json!({"from": username, "from_id": agent_id_str, "message": message}),
        );
        delivered += 1;
    }

    Ok(serde_json::json!({"delivered": delivered}))
}

fn list(world: &WorldData, agent_id: AgentId, template_id: &str) -> ActionResult<Json> {
    let tid = TemplateId::from_str(template_id).map_err(|_| ActionError::validation("template_id is not a valid id"))?;
    let template = world.templates.get(&tid).ok_or_else(|| ActionError::not_found(template_id))?;
    if template.owner_id != agent_id {
        return Err(ActionError::denied("owner", template_id));
    }
    let instances: Vec<Json> = world
        .instances_of_template(tid)
        .into_iter()
        .filter_map(|id| world.instances.get(&id))
        .map(|inst| {
            serde_json::json!({
                "id": inst.id.to_string(),
                "short_description": inst.short_description,
                "is_void": inst.is_void,
                "is_destroyed": inst.is_destroyed,
            })
        })
        .collect();
    Ok(serde_json::json!({"instances": instances}))
}
