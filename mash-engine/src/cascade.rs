//! Cascade semantics shared by the DSL `destroy` effect, the `delete`
//! action, and template deletion's voiding pass.

use mash_core::{ContainerRef, EntityKind, InstanceId, TemplateId, WorldConfig};
use mash_store::{ContainerKey, WorldData};

/// Evict every agent currently in `node_id` to their home node, emitting a
/// `system` event to each.
fn evict_agents_from_node(world: &mut WorldData, node_id: InstanceId) {
    for agent_id in world.agents_in_node(node_id) {
        let Some(home) = world.agents.get(&agent_id).map(|a| a.home_node_id) else { continue };
        world.set_agent_node(agent_id, Some(home));
        world.push_event(
            agent_id,
            mash_core::EventType::System,
            serde_json::json!({"message": "Your location was destroyed; you have been returned home."}),
        );
    }
}

/// Mark `instance_id` destroyed and recursively destroy everything it
/// contains. If it is a node, evict any agents standing in it to home
/// first. Idempotent: already-destroyed instances are left alone.
pub fn destroy_instance(world: &mut WorldData, _config: &WorldConfig, instance_id: InstanceId) {
    let Some(inst) = world.instances.get(&instance_id) else { return };
    if inst.is_destroyed {
        return;
    }
    let kind = inst.kind;

    if kind == EntityKind::Node {
        evict_agents_from_node(world, instance_id);
    }

    let contents = world.contents_of(ContainerKey::Instance(instance_id));
    for child in contents {
        destroy_instance(world, _config, child);
    }

    if let Some(inst) = world.instances.get_mut(&instance_id) {
        inst.is_destroyed = true;
    }
}

/// Void every live instance of `template_id` (template deletion): null
/// `template_id`, cascade-destroy contained items, evict agents from voided
/// nodes.
pub fn void_template(world: &mut WorldData, config: &WorldConfig, template_id: TemplateId) {
    let instance_ids = world.instances_of_template(template_id);
    for instance_id in instance_ids {
        let Some(inst) = world.instances.get(&instance_id) else { continue };
        if !inst.is_live() {
            continue;
        }
        let kind = inst.kind;

        if kind == EntityKind::Node {
            evict_agents_from_node(world, instance_id);
        }

        let contents = world.contents_of(ContainerKey::Instance(instance_id));
        for child in contents {
            destroy_instance(world, config, child);
        }

        if let Some(inst) = world.instances.get_mut(&instance_id) {
            inst.template_id = None;
            inst.is_void = true;
        }
    }
}

pub fn container_key_of(entity: super::dsl::context::EntityRef) -> ContainerKey {
    match entity {
        super::dsl::context::EntityRef::Agent(id) => ContainerKey::Agent(id),
        super::dsl::context::EntityRef::Instance(id) => ContainerKey::Instance(id),
    }
}

pub fn container_ref_of(entity: super::dsl::context::EntityRef) -> ContainerRef {
    match entity {
        super::dsl::context::EntityRef::Agent(agent_id) => ContainerRef::Agent { agent_id },
        super::dsl::context::EntityRef::Instance(instance_id) => ContainerRef::Instance { instance_id },
    }
}
