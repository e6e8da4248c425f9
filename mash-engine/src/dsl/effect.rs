//! Effect application and the escalation rule in effect authorisation.
//! Unauthorised or depth-violating effects are swallowed silently and the
//! rule continues — a half-evaluated rule must not leak partial state.

use std::str::FromStr;

use mash_core::{AmountOperand, Effect, EntityIdType, EntityKind, PermissionKey, Value, WorldConfig};
use mash_store::WorldData;

use crate::cascade::{container_key_of, container_ref_of, destroy_instance};
use crate::envelope::broadcast_to_node;

use super::condition::eval_conditions;
use super::context::{EntityRef, EvalContext, EvalState};
use super::reference::{resolve_entity, resolve_scalar, resolve_write_target};

/// Does the invoking template's owner hold `key` on `target`? `target ==
/// self` always bypasses the check — editing permissions via DSL `perm` on
/// self is intentionally unchecked. Agent targets have no permission
/// system; only the acting agent may be
/// targeted this way.
fn authorize(world: &WorldData, ctx: &EvalContext, target: EntityRef, key: PermissionKey) -> bool {
    if target == EntityRef::Instance(ctx.self_id) {
        return true;
    }
    let Some(self_template_id) = world.instances.get(&ctx.self_id).and_then(|i| i.template_id) else {
        return false;
    };
    let Some(owner_id) = world.templates.get(&self_template_id).map(|t| t.owner_id) else {
        return false;
    };
    match target {
        EntityRef::Agent(agent_id) => Some(agent_id) == ctx.actor,
        EntityRef::Instance(instance_id) => {
            let Some(inst) = world.instances.get(&instance_id) else { return false };
            mash_permission::check(world, owner_id, inst, key)
        }
    }
}

fn owner_of_self(world: &WorldData, ctx: &EvalContext) -> Option<mash_core::AgentId> {
    let template_id = world.instances.get(&ctx.self_id)?.template_id?;
    world.templates.get(&template_id).map(|t| t.owner_id)
}

/// Interpolate `{ref}` tokens in `text`. A token that fails to parse as a
/// reference, or resolves to nothing, is left blank.
fn interpolate(world: &WorldData, ctx: &EvalContext, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = text[i..].find('}') {
                let inner = &text[i + 1..i + end];
                let rendered = mash_dsl::parse_reference(inner)
                    .ok()
                    .and_then(|r| resolve_scalar(world, ctx, &r))
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                out.push_str(&rendered);
                i += end + 1;
                continue;
            }
        }
        let ch = text[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

fn write_field(world: &mut WorldData, entity: EntityRef, field: &str, value: Value) {
    match entity {
        EntityRef::Agent(agent_id) => {
            let Some(agent) = world.agents.get_mut(&agent_id) else { return };
            match field {
                "short_description" => agent.short_description = value.to_string(),
                "long_description" => agent.long_description = value.to_string(),
                _ => {}
            }
        }
        EntityRef::Instance(instance_id) => {
            let Some(inst) = world.instances.get_mut(&instance_id) else { return };
            match field {
                "short_description" => inst.short_description = value.to_string(),
                "long_description" => inst.long_description = value.to_string(),
                other => {
                    inst.fields.insert(other.to_string(), value);
                }
            }
        }
    }
}

fn read_numeric_field(world: &WorldData, entity: EntityRef, field: &str) -> f64 {
    match entity {
        EntityRef::Instance(instance_id) => world
            .instances
            .get(&instance_id)
            .and_then(|i| i.fields.get(field))
            .map(|v| v.numeric_or_zero())
            .unwrap_or(0.0),
        EntityRef::Agent(_) => 0.0,
    }
}

pub fn apply_effect(world: &mut WorldData, config: &WorldConfig, ctx: &EvalContext, state: &mut EvalState, effect: &Effect) {
    if state.denied {
        return;
    }
    match effect {
        Effect::Set { reference, value } => apply_set(world, ctx, reference, value),
        Effect::Add { reference, amount } => apply_add(world, ctx, reference, amount),
        Effect::Say { text } => apply_say(world, ctx, text),
        Effect::Take { template_id, from } => apply_take(world, config, ctx, template_id, from),
        Effect::Give { template_id, to } => apply_give(world, config, ctx, template_id, to),
        Effect::Move { reference, node_id } => apply_move(world, config, ctx, reference, node_id),
        Effect::Create { template_id, at } => apply_create(world, config, ctx, template_id, at),
        Effect::Destroy { reference } => apply_destroy(world, config, ctx, reference),
        Effect::Perm { reference, key, rule } => apply_perm(world, ctx, reference, key, rule),
        Effect::Deny => state.denied = true,
        Effect::If { conditions, do_effects, else_effects } => {
            let branch = if eval_conditions(world, ctx, conditions) { do_effects } else { else_effects };
            for e in branch {
                if state.denied {
                    break;
                }
                apply_effect(world, config, ctx, state, e);
            }
        }
    }
}

fn apply_set(world: &mut WorldData, ctx: &EvalContext, reference: &mash_core::Reference, value: &serde_json::Value) {
    let Some((entity, field)) = resolve_write_target(world, ctx, reference) else { return };
    if !authorize(world, ctx, entity, PermissionKey::Edit) {
        return;
    }
    write_field(world, entity, field, Value::from(value));
}

fn apply_add(world: &mut WorldData, ctx: &EvalContext, reference: &mash_core::Reference, amount: &AmountOperand) {
    let Some((entity, field)) = resolve_write_target(world, ctx, reference) else { return };
    if !authorize(world, ctx, entity, PermissionKey::Edit) {
        return;
    }
    let delta = match amount {
        AmountOperand::Literal(n) => *n,
        AmountOperand::Reference(r) => resolve_scalar(world, ctx, r).map(|v| v.numeric_or_zero()).unwrap_or(0.0),
    };
    let current = read_numeric_field(world, entity, field);
    write_field(world, entity, field, Value::Num(current + delta));
}

fn apply_say(world: &mut WorldData, ctx: &EvalContext, text: &str) {
    let rendered = interpolate(world, ctx, text);
    let Some(node_id) = mash_permission::containing_node(world, ctx.self_id) else { return };
    broadcast_to_node(world, node_id, mash_core::EventType::Broadcast, serde_json::json!({"message": rendered}), None);
}

fn apply_take(world: &mut WorldData, config: &WorldConfig, ctx: &EvalContext, template_id: &str, from: &mash_core::Reference) {
    let Some(from_entity) = resolve_entity(world, ctx, from) else { return };
    if !authorize(world, ctx, from_entity, PermissionKey::Contain) {
        return;
    }
    let Some(item_id) = first_matching_live(world, from_entity, template_id) else { return };
    reparent_checked(world, config, item_id, EntityRef::Instance(ctx.self_id));
}

fn apply_give(world: &mut WorldData, config: &WorldConfig, ctx: &EvalContext, template_id: &str, to: &mash_core::Reference) {
    let Some(to_entity) = resolve_entity(world, ctx, to) else { return };
    if !authorize(world, ctx, to_entity, PermissionKey::Contain) {
        return;
    }
    let Some(item_id) = first_matching_live(world, EntityRef::Instance(ctx.self_id), template_id) else { return };
    reparent_checked(world, config, item_id, to_entity);
}

fn first_matching_live(world: &WorldData, parent: EntityRef, template_id: &str) -> Option<mash_core::InstanceId> {
    world
        .contents_of(container_key_of(parent))
        .into_iter()
        .filter_map(|id| world.instances.get(&id))
        .filter(|inst| inst.is_live() && inst.template_id.map(|t| t.to_string()).as_deref() == Some(template_id))
        .min_by_key(|inst| inst.id.as_uuid())
        .map(|inst| inst.id)
}

fn reparent_checked(world: &mut WorldData, config: &WorldConfig, instance_id: mash_core::InstanceId, new_parent: EntityRef) {
    let key = container_key_of(new_parent);
    if mash_permission::would_exceed_depth(world, key, config.max_containment_depth) {
        return;
    }
    world.set_instance_container(instance_id, Some(container_ref_of(new_parent)));
}

fn apply_move(world: &mut WorldData, config: &WorldConfig, ctx: &EvalContext, reference: &mash_core::Reference, node_id: &str) {
    let Some(target) = resolve_entity(world, ctx, reference) else { return };
    if !authorize(world, ctx, target, PermissionKey::Edit) {
        return;
    }
    let Ok(node_id) = mash_core::InstanceId::from_str(node_id) else { return };
    let Some(node) = world.instances.get(&node_id) else { return };
    if node.kind != EntityKind::Node || !node.is_live() {
        return;
    }
    match target {
        EntityRef::Agent(agent_id) => {
            world.set_agent_node(agent_id, Some(node_id));
            world.push_event(agent_id, mash_core::EventType::System, serde_json::json!({"message": "You have been moved."}));
        }
        EntityRef::Instance(instance_id) => {
            reparent_checked(world, config, instance_id, EntityRef::Instance(node_id));
        }
    }
}

fn apply_create(world: &mut WorldData, config: &WorldConfig, ctx: &EvalContext, template_id: &str, at: &mash_core::Reference) {
    let Some(container) = resolve_entity(world, ctx, at) else { return };
    if !authorize(world, ctx, container, PermissionKey::Contain) {
        return;
    }
    let Ok(tid) = mash_core::TemplateId::from_str(template_id) else { return };
    let Some(template) = world.templates.get(&tid).cloned() else { return };
    if template.kind == EntityKind::Node {
        return;
    }
    let key = container_key_of(container);
    if mash_permission::would_exceed_depth(world, key, config.max_containment_depth) {
        return;
    }
    let new_id = mash_core::InstanceId::new_v7();
    world.insert_instance(mash_core::Instance {
        id: new_id,
        template_id: Some(tid),
        kind: template.kind,
        short_description: template.short_description.clone(),
        long_description: template.long_description.clone(),
        fields: template.default_fields.clone(),
        permissions: Default::default(),
        container: Some(container_ref_of(container)),
        is_void: false,
        is_destroyed: false,
        system_type: mash_core::SystemType::None,
        interactions_used_this_tick: 0,
    });
}

fn apply_destroy(world: &mut WorldData, config: &WorldConfig, ctx: &EvalContext, reference: &mash_core::Reference) {
    let Some(EntityRef::Instance(instance_id)) = resolve_entity(world, ctx, reference) else { return };
    let target = EntityRef::Instance(instance_id);
    if !authorize(world, ctx, target, PermissionKey::Delete) {
        return;
    }
    destroy_instance(world, config, instance_id);
}

fn apply_perm(world: &mut WorldData, ctx: &EvalContext, reference: &mash_core::Reference, key: &str, rule: &serde_json::Value) {
    let Some(EntityRef::Instance(instance_id)) = resolve_entity(world, ctx, reference) else { return };
    let target = EntityRef::Instance(instance_id);
    let Ok(key) = PermissionKey::from_str(key) else { return };
    let Ok(new_rule) = mash_dsl::parse_permission_rule(rule) else { return };

    if target != EntityRef::Instance(ctx.self_id) {
        if !authorize(world, ctx, target, PermissionKey::Perms) {
            return;
        }
        let Some(owner_id) = owner_of_self(world, ctx) else { return };
        let Some(target_inst) = world.instances.get(&instance_id) else { return };
        if !mash_permission::evaluate_rule(world, &new_rule, owner_id, target_inst) {
            return;
        }
    }

    if let Some(inst) = world.instances.get_mut(&instance_id) {
        inst.permissions.insert(key, new_rule);
    }
}
