//! Queued verbs: mutating actions deferred to the tick, executed inside a
//! single transaction per entry, in queue order.

use std::str::FromStr;

use mash_core::{
    ActionQueueEntry, AgentId, ContainerRef, EntityIdType, EntityKind, EventType, Instance, InstanceId, PermissionKey,
    SystemType, Template, TemplateId, WorldConfig,
};
use mash_store::{ContainerKey, WorldData};
use serde_json::Value as Json;

use super::params::{opt_str_field, str_field, via_hops};
use super::node_snapshot;
use crate::dsl::EntityRef;
use crate::error::{ActionError, ActionResult};

/// Dispatch one due queue entry. Never lets an error escape past this call —
/// `tick::run_tick` wraps it and folds any `Err` into the resulting
/// `action_result`'s `{error}` payload.
pub fn run_queued(world: &mut WorldData, config: &WorldConfig, tick_number: u64, entry: &ActionQueueEntry) -> ActionResult<Json> {
    match entry.verb.as_str() {
        "create" => handle_create(world, config, entry.agent_id, &entry.params),
        "edit" => handle_edit(world, entry.agent_id, &entry.params),
        "delete" => handle_delete(world, config, entry.agent_id, &entry.params),
        "travel" => handle_travel(world, config, entry.agent_id, &entry.params),
        "home" => handle_home(world, entry.agent_id),
        "take" => handle_take(world, config, entry.agent_id, &entry.params),
        "drop" => handle_drop(world, config, entry.agent_id, &entry.params),
        verb => handle_custom(world, config, tick_number, entry.agent_id, verb, &entry.params),
    }
}

fn agent_node(world: &WorldData, agent_id: AgentId) -> ActionResult<InstanceId> {
    world
        .agents
        .get(&agent_id)
        .and_then(|a| a.current_node_id)
        .ok_or_else(|| ActionError::validation("agent is not currently in a node"))
}

// -- create ------------------------------------------------------------

fn handle_create(world: &mut WorldData, config: &WorldConfig, agent_id: AgentId, params: &Json) -> ActionResult<Json> {
    match str_field(params, "type")? {
        "template" => create_template(world, agent_id, params),
        "instance" => create_instance(world, config, agent_id, params),
        other => Err(ActionError::validation(format!("unknown create type '{other}'"))),
    }
}

fn create_template(world: &mut WorldData, agent_id: AgentId, params: &Json) -> ActionResult<Json> {
    let name = str_field(params, "name")?.to_string();
    let kind = parse_kind(str_field(params, "template_type")?)?;
    let short_description = opt_str_field(params, "short_description").unwrap_or("").to_string();
    let long_description = opt_str_field(params, "long_description").unwrap_or("").to_string();
    let default_fields = params.get("fields").map(mash_core::field_map_from_json).unwrap_or_default();
    let default_permissions = match params.get("default_permissions") {
        Some(v) => parse_permission_map(v)?,
        None => mash_core::stock_default_permissions(),
    };
    let interactions = match params.get("interactions") {
        Some(v) => mash_dsl::parse_interactions(v).map_err(|e| ActionError::validation(e.to_string()))?,
        None => Vec::new(),
    };

    let id = TemplateId::new_v4();
    world.insert_template(Template {
        id,
        owner_id: agent_id,
        name,
        kind,
        short_description,
        long_description,
        default_fields,
        default_permissions,
        interactions,
    });
    Ok(serde_json::json!({"template_id": id.to_string()}))
}

fn create_instance(world: &mut WorldData, config: &WorldConfig, agent_id: AgentId, params: &Json) -> ActionResult<Json> {
    let template_id = TemplateId::from_str(str_field(params, "template_id")?)
        .map_err(|_| ActionError::validation("template_id is not a valid id"))?;
    let template = world.templates.get(&template_id).ok_or_else(|| ActionError::not_found(template_id))?;
    if template.owner_id != agent_id {
        return Err(ActionError::denied("owner", template_id));
    }
    let kind = template.kind;
    let mut fields = template.default_fields.clone();
    if let Some(overrides) = params.get("fields") {
        for (k, v) in mash_core::field_map_from_json(overrides) {
            fields.insert(k, v);
        }
    }
    let short_description = template.short_description.clone();
    let long_description = template.long_description.clone();

    let container = if kind == EntityKind::Node {
        None
    } else {
        let node_id = agent_node(world, agent_id)?;
        let key = ContainerKey::Instance(node_id);
        if mash_permission::would_exceed_depth(world, key, config.max_containment_depth) {
            return Err(mash_core::PolicyError::ContainmentDepthExceeded.into());
        }
        Some(ContainerRef::Instance { instance_id: node_id })
    };

    let id = InstanceId::new_v7();
    world.insert_instance(Instance {
        id,
        template_id: Some(template_id),
        kind,
        short_description,
        long_description,
        fields,
        permissions: Default::default(),
        container,
        is_void: false,
        is_destroyed: false,
        system_type: SystemType::None,
        interactions_used_this_tick: 0,
    });
    Ok(serde_json::json!({"instance_id": id.to_string()}))
}

fn parse_kind(s: &str) -> ActionResult<EntityKind> {
    match s {
        "node" => Ok(EntityKind::Node),
        "link" => Ok(EntityKind::Link),
        "thing" => Ok(EntityKind::Thing),
        other => Err(ActionError::validation(format!("unknown template_type '{other}'"))),
    }
}

fn parse_permission_map(v: &Json) -> ActionResult<mash_core::PermissionMap> {
    let obj = v.as_object().ok_or_else(|| ActionError::validation("default_permissions must be an object"))?;
    let mut map = mash_core::PermissionMap::new();
    for (k, rule) in obj {
        let key = PermissionKey::from_str(k).map_err(|_| ActionError::validation(format!("unknown permission key '{k}'")))?;
        let rule = mash_dsl::parse_permission_rule(rule).map_err(|e| ActionError::validation(e.to_string()))?;
        map.insert(key, rule);
    }
    Ok(map)
}

// -- edit ----------------------------------------------------------------

fn handle_edit(world: &mut WorldData, agent_id: AgentId, params: &Json) -> ActionResult<Json> {
    match str_field(params, "type")? {
        "template" => edit_template(world, agent_id, params),
        "instance" => edit_instance(world, agent_id, params),
        other => Err(ActionError::validation(format!("unknown edit type '{other}'"))),
    }
}

fn edit_template(world: &mut WorldData, agent_id: AgentId, params: &Json) -> ActionResult<Json> {
    let id = TemplateId::from_str(str_field(params, "id")?).map_err(|_| ActionError::validation("id is not a valid id"))?;
    let template = world.templates.get_mut(&id).ok_or_else(|| ActionError::not_found(id))?;
    if template.owner_id != agent_id {
        return Err(ActionError::denied("owner", id));
    }
    if let Some(name) = opt_str_field(params, "name") {
        template.name = name.to_string();
    }
    if let Some(s) = opt_str_field(params, "short_description") {
        template.short_description = s.to_string();
    }
    if let Some(s) = opt_str_field(params, "long_description") {
        template.long_description = s.to_string();
    }
    if let Some(fields) = params.get("fields") {
        for (k, v) in mash_core::field_map_from_json(fields) {
            template.default_fields.insert(k, v);
        }
    }
    if let Some(perms) = params.get("default_permissions") {
        for (k, rule) in parse_permission_map(perms)? {
            template.default_permissions.insert(k, rule);
        }
    }
    if let Some(interactions) = params.get("interactions") {
        template.interactions = mash_dsl::parse_interactions(interactions).map_err(|e| ActionError::validation(e.to_string()))?;
    }
    Ok(serde_json::json!({"template_id": id.to_string()}))
}

fn edit_instance(world: &mut WorldData, agent_id: AgentId, params: &Json) -> ActionResult<Json> {
    let id = InstanceId::from_str(str_field(params, "id")?).map_err(|_| ActionError::validation("id is not a valid id"))?;
    {
        let inst = world.instances.get(&id).ok_or_else(|| ActionError::not_found(id))?;
        if !mash_permission::check(world, agent_id, inst, PermissionKey::Edit) {
            return Err(ActionError::denied("edit", id));
        }
    }
    let wants_perms = params.get("permissions").is_some();
    if wants_perms {
        let inst = world.instances.get(&id).ok_or_else(|| ActionError::not_found(id))?;
        if !mash_permission::check(world, agent_id, inst, PermissionKey::Perms) {
            return Err(ActionError::denied("perms", id));
        }
    }

    let inst = world.instances.get_mut(&id).ok_or_else(|| ActionError::not_found(id))?;
    if let Some(s) = opt_str_field(params, "short_description") {
        inst.short_description = s.to_string();
    }
    if let Some(s) = opt_str_field(params, "long_description") {
        inst.long_description = s.to_string();
    }
    if let Some(fields) = params.get("fields") {
        for (k, v) in mash_core::field_map_from_json(fields) {
            inst.fields.insert(k, v);
        }
    }
    if let Some(perms) = params.get("permissions") {
        for (k, rule) in parse_permission_map(perms)? {
            inst.permissions.insert(k, rule);
        }
    }
    Ok(serde_json::json!({"instance_id": id.to_string()}))
}

// -- delete --------------------------------------------------------------

fn handle_delete(world: &mut WorldData, config: &WorldConfig, agent_id: AgentId, params: &Json) -> ActionResult<Json> {
    match str_field(params, "type")? {
        "template" => {
            let id = TemplateId::from_str(str_field(params, "id")?).map_err(|_| ActionError::validation("id is not a valid id"))?;
            let template = world.templates.get(&id).ok_or_else(|| ActionError::not_found(id))?;
            if template.owner_id != agent_id {
                return Err(ActionError::denied("owner", id));
            }
            crate::cascade::void_template(world, config, id);
            Ok(serde_json::json!({"voided_template_id": id.to_string()}))
        }
        "instance" => {
            let id = InstanceId::from_str(str_field(params, "id")?).map_err(|_| ActionError::validation("id is not a valid id"))?;
            let inst = world.instances.get(&id).ok_or_else(|| ActionError::not_found(id))?;
            if !mash_permission::check(world, agent_id, inst, PermissionKey::Delete) {
                return Err(ActionError::denied("delete", id));
            }
            crate::cascade::destroy_instance(world, config, id);
            Ok(serde_json::json!({"destroyed_instance_id": id.to_string()}))
        }
        other => Err(ActionError::validation(format!("unknown delete type '{other}'"))),
    }
}

// -- travel ----------------------------------------------------------------

fn handle_travel(world: &mut WorldData, config: &WorldConfig, agent_id: AgentId, params: &Json) -> ActionResult<Json> {
    let hops = via_hops(params)?;
    let total = hops.len() as i32;
    let mut current_node = agent_node(world, agent_id)?;

    for (index, hop) in hops.iter().enumerate() {
        let Ok(link_id) = InstanceId::from_str(hop) else {
            return Ok(stop(world, agent_id, index, total, "via entry is not a valid id"));
        };
        let Some(link) = world.instances.get(&link_id).cloned() else {
            return Ok(stop(world, agent_id, index, total, "link not found"));
        };
        if !link.is_live() || link.kind != EntityKind::Link {
            return Ok(stop(world, agent_id, index, total, "link is void or destroyed"));
        }
        if link.container != Some(ContainerRef::Instance { instance_id: current_node }) {
            return Ok(stop(world, agent_id, index, total, "link is not in the current node"));
        }

        let destination = match link.system_type {
            SystemType::RandomLink => match pick_random_destination(world, agent_id, current_node) {
                Some(id) => id,
                None => return Ok(stop(world, agent_id, index, total, "no eligible destination")),
            },
            _ => {
                let Some(dest_str) = link.fields.get("destination").and_then(|v| v.as_str()) else {
                    return Ok(stop(world, agent_id, index, total, "link has no destination"));
                };
                let Ok(dest_id) = InstanceId::from_str(dest_str) else {
                    return Ok(stop(world, agent_id, index, total, "destination is not a valid id"));
                };
                dest_id
            }
        };
        let Some(dest_node) = world.instances.get(&destination) else {
            return Ok(stop(world, agent_id, index, total, "destination not found"));
        };
        if !dest_node.is_live() || dest_node.kind != EntityKind::Node {
            return Ok(stop(world, agent_id, index, total, "destination is void or destroyed"));
        }

        let denied = crate::dsl::fire(world, config, link_id, "travel", Some(agent_id), None);
        if denied {
            return Ok(stop(world, agent_id, index, total, "travel denied"));
        }
        let denied = crate::dsl::fire(world, config, current_node, "exit", Some(agent_id), Some(EntityRef::Instance(link_id)));
        if denied {
            return Ok(stop(world, agent_id, index, total, "exit denied"));
        }
        let denied = crate::dsl::fire(world, config, destination, "enter", Some(agent_id), Some(EntityRef::Instance(link_id)));
        if denied {
            return Ok(stop(world, agent_id, index, total, "enter denied"));
        }

        let dest_name = world.instances.get(&destination).map(|n| n.short_description.clone()).unwrap_or_default();
        world.record_link_usage(mash_core::LinkUsageRecord {
            agent_id,
            link_id,
            destination_node_id: destination,
            destination_name: dest_name,
            used_at: chrono::Utc::now(),
        });
        crate::envelope::broadcast_to_node(world, current_node, EventType::System, serde_json::json!({"message": "An agent has left."}), None);
        world.set_agent_node(agent_id, Some(destination));
        crate::envelope::broadcast_to_node(world, destination, EventType::System, serde_json::json!({"message": "An agent has arrived."}), Some(agent_id));
        current_node = destination;
    }

    let caps = world.agents.get(&agent_id).map(|a| a.perception_caps.clone());
    Ok(node_snapshot(world, current_node, caps.as_ref()))
}

fn stop(world: &mut WorldData, agent_id: AgentId, failed_index: usize, total: i32, reason: &str) -> Json {
    let unused = total - failed_index as i32;
    if let Some(agent) = world.agents.get_mut(&agent_id) {
        agent.ap += unused;
    }
    serde_json::json!({"stopped_at": failed_index, "reason": reason})
}

fn pick_random_destination(world: &WorldData, agent_id: AgentId, current_node: InstanceId) -> Option<InstanceId> {
    let agent = world.agents.get(&agent_id)?;
    let home_nodes: std::collections::HashSet<InstanceId> = world.agents.values().map(|a| a.home_node_id).collect();
    let candidates: Vec<InstanceId> = world
        .instances
        .values()
        .filter(|i| i.kind == EntityKind::Node && i.is_live())
        .filter(|i| i.id != current_node)
        .filter(|i| !home_nodes.contains(&i.id))
        .filter(|i| mash_permission::check(world, agent.id, i, PermissionKey::Interact))
        .map(|i| i.id)
        .collect();
    if candidates.is_empty() {
        return None;
    }
    let idx = (rand::random::<u32>() as usize) % candidates.len();
    Some(candidates[idx])
}

// -- home ------------------------------------------------------------------

fn handle_home(world: &mut WorldData, agent_id: AgentId) -> ActionResult<Json> {
    let (current, home) = {
        let agent = world.agents.get(&agent_id).ok_or_else(|| ActionError::not_found(agent_id))?;
        (agent.current_node_id, agent.home_node_id)
    };
    if current == Some(home) {
        return Err(mash_core::StateError::Conflict("already home".to_string()).into());
    }
    world.set_agent_node(agent_id, Some(home));
    Ok(serde_json::json!({"node_id": home.to_string()}))
}

// -- take / drop -------------------------------------------------------------

fn handle_take(world: &mut WorldData, config: &WorldConfig, agent_id: AgentId, params: &Json) -> ActionResult<Json> {
    let target_id = InstanceId::from_str(str_field(params, "target_id")?).map_err(|_| ActionError::validation("target_id is not a valid id"))?;
    let node_id = agent_node(world, agent_id)?;

    let thing = world.instances.get(&target_id).cloned().ok_or_else(|| ActionError::not_found(target_id))?;
    if mash_permission::containing_node(world, target_id) != Some(node_id) {
        return Err(ActionError::validation("target is not in your current node"));
    }
    if !mash_permission::check(world, agent_id, &thing, PermissionKey::Contain) {
        return Err(ActionError::denied("contain", target_id));
    }
    if let Some(ContainerRef::Instance { instance_id: container_id }) = thing.container {
        if let Some(container_inst) = world.instances.get(&container_id).cloned() {
            if !mash_permission::check(world, agent_id, &container_inst, PermissionKey::Contain) {
                return Err(ActionError::denied("contain", container_id));
            }
        }
    }

    let denied = crate::dsl::fire(world, config, target_id, "take", Some(agent_id), None);
    if denied {
        return Ok(serde_json::json!({"denied": true}));
    }

    let destination = match opt_str_field(params, "into") {
        Some(raw) => {
            let into_id = InstanceId::from_str(raw).map_err(|_| ActionError::validation("into is not a valid id"))?;
            if !super::in_agent_inventory(world, agent_id, into_id) {
                return Err(ActionError::validation("into must be an instance already in your inventory"));
            }
            let into_inst = world.instances.get(&into_id).cloned().ok_or_else(|| ActionError::not_found(into_id))?;
            if !mash_permission::check(world, agent_id, &into_inst, PermissionKey::Contain) {
                return Err(ActionError::denied("contain", into_id));
            }
            ContainerRef::Instance { instance_id: into_id }
        }
        None => ContainerRef::Agent { agent_id },
    };
    let key: ContainerKey = destination.into();
    if mash_permission::would_exceed_depth(world, key, config.max_containment_depth) {
        return Err(mash_core::PolicyError::ContainmentDepthExceeded.into());
    }
    world.set_instance_container(target_id, Some(destination));
    Ok(serde_json::json!({"instance_id": target_id.to_string()}))
}

fn handle_drop(world: &mut WorldData, config: &WorldConfig, agent_id: AgentId, params: &Json) -> ActionResult<Json> {
    let target_id = InstanceId::from_str(str_field(params, "target_id")?).map_err(|_| ActionError::validation("target_id is not a valid id"))?;
    if !super::in_agent_inventory(world, agent_id, target_id) {
        return Err(ActionError::validation("target is not in your inventory"));
    }
    let thing = world.instances.get(&target_id).cloned().ok_or_else(|| ActionError::not_found(target_id))?;
    if !mash_permission::check(world, agent_id, &thing, PermissionKey::Contain) {
        return Err(ActionError::denied("contain", target_id));
    }

    let denied = crate::dsl::fire(world, config, target_id, "drop", Some(agent_id), None);
    if denied {
        return Ok(serde_json::json!({"denied": true}));
    }

    let node_id = agent_node(world, agent_id)?;
    let destination = match opt_str_field(params, "into") {
        Some(raw) => {
            let into_id = InstanceId::from_str(raw).map_err(|_| ActionError::validation("into is not a valid id"))?;
            if mash_permission::containing_node(world, into_id) != Some(node_id) {
                return Err(ActionError::validation("into must be in your current node"));
            }
            let into_inst = world.instances.get(&into_id).cloned().ok_or_else(|| ActionError::not_found(into_id))?;
            if !mash_permission::check(world, agent_id, &into_inst, PermissionKey::Contain) {
                return Err(ActionError::denied("contain", into_id));
            }
            ContainerRef::Instance { instance_id: into_id }
        }
        None => ContainerRef::Instance { instance_id: node_id },
    };
    let key: ContainerKey = destination.into();
    if mash_permission::would_exceed_depth(world, key, config.max_containment_depth) {
        return Err(mash_core::PolicyError::ContainmentDepthExceeded.into());
    }
    world.set_instance_container(target_id, Some(destination));
    Ok(serde_json::json!({"instance_id": target_id.to_string()}))
}

// -- custom verbs ------------------------------------------------------------

fn handle_custom(world: &mut WorldData, config: &WorldConfig, _tick_number: u64, agent_id: AgentId, verb: &str, params: &Json) -> ActionResult<Json> {
    let target_id = InstanceId::from_str(str_field(params, "target_id")?).map_err(|_| ActionError::validation("target_id is not a valid id"))?;

    let home_node_id = world.agents.get(&agent_id).map(|a| a.home_node_id);
    if verb == "reset" && home_node_id == Some(target_id) {
        let username = world.agents.get(&agent_id).map(|a| a.username.clone()).unwrap_or_default();
        crate::signup::reset_home_node(world, config, &username, target_id)?;
        return Ok(serde_json::json!({"reset": true}));
    }

    let target = world.instances.get(&target_id).cloned().ok_or_else(|| ActionError::not_found(target_id))?;
    if !mash_permission::check(world, agent_id, &target, PermissionKey::Interact) {
        return Err(ActionError::denied("interact", target_id));
    }

    let subject = opt_str_field(params, "subject_id")
        .and_then(|raw| InstanceId::from_str(raw).ok())
        .map(EntityRef::Instance);

    let denied = crate::dsl::fire(world, config, target_id, verb, Some(agent_id), subject);
    Ok(serde_json::json!({"denied": denied}))
}
