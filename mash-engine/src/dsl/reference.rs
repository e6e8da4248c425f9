//! Reference resolution, re-reading `self`/`subject` from the store on
//! every dereference so intra-rule mutations are visible.

use mash_core::{EntityKind, Reference, Value};
use mash_store::WorldData;

use super::context::{EntityRef, EvalContext};

/// Resolve a bare reference head (`self`, `actor`, `subject`, `container`,
/// `carrier`) to the entity it names. `tick` has no entity and always
/// resolves to `None` here (callers match it before reaching this
/// function).
pub fn resolve_bare(world: &WorldData, ctx: &EvalContext, reference: &Reference) -> Option<EntityRef> {
    match reference {
        Reference::SelfEntity => Some(EntityRef::Instance(ctx.self_id)),
        Reference::Actor => ctx.actor.map(EntityRef::Agent),
        Reference::Subject => ctx.subject,
        Reference::Container => {
            let inst = world.instances.get(&ctx.self_id)?;
            inst.container.map(|c| match c {
                mash_core::ContainerRef::Agent { agent_id } => EntityRef::Agent(agent_id),
                mash_core::ContainerRef::Instance { instance_id } => EntityRef::Instance(instance_id),
            })
        }
        Reference::Carrier => carrier_of(world, ctx.self_id),
        Reference::Tick => None,
        Reference::Field { head, .. } | Reference::ContentsField { head, .. } => resolve_bare(world, ctx, head),
    }
}

/// The agent at the top of `self`'s container chain that is an agent, if
/// any.
fn carrier_of(world: &WorldData, self_id: mash_core::InstanceId) -> Option<EntityRef> {
    const WALK_GUARD: u32 = 64;
    let mut current = world.instances.get(&self_id)?;
    for _ in 0..WALK_GUARD {
        match current.container? {
            mash_core::ContainerRef::Agent { agent_id } => return Some(EntityRef::Agent(agent_id)),
            mash_core::ContainerRef::Instance { instance_id } => {
                current = world.instances.get(&instance_id)?;
            }
        }
    }
    None
}

fn entity_field(world: &WorldData, entity: EntityRef, field: &str) -> Option<Value> {
    match entity {
        EntityRef::Agent(agent_id) => {
            let agent = world.agents.get(&agent_id)?;
            match field {
                "id" => Some(Value::Str(agent.id.to_string())),
                "username" => Some(Value::Str(agent.username.clone())),
                "short_description" => Some(Value::Str(agent.short_description.clone())),
                "long_description" => Some(Value::Str(agent.long_description.clone())),
                _ => None,
            }
        }
        EntityRef::Instance(instance_id) => {
            let inst = world.instances.get(&instance_id)?;
            match field {
                "id" => Some(Value::Str(inst.id.to_string())),
                "username" => None,
                "short_description" => Some(Value::Str(inst.short_description.clone())),
                "long_description" => Some(Value::Str(inst.long_description.clone())),
                _ => None,
            }
        }
    }
}

/// Custom field lookup, valid only on `self` and `container`. Agents have
/// no custom field map, so `container` resolving to an
/// agent (self sitting in an inventory) yields `None` for any non-fixed
/// field name.
fn custom_field(world: &WorldData, entity: EntityRef, field: &str) -> Option<Value> {
    match entity {
        EntityRef::Instance(instance_id) => {
            let inst = world.instances.get(&instance_id)?;
            inst.fields.get(field).cloned()
        }
        EntityRef::Agent(_) => None,
    }
}

fn is_self_or_container(reference: &Reference) -> bool {
    matches!(reference, Reference::SelfEntity | Reference::Container)
}

/// Find the first non-void, non-destroyed instance directly contained in
/// `parent` whose `template_id` matches `template_id`, per creation order:
/// ascending instance id, which is time-sortable for UUIDv7, matches the
/// store's other "creation order" guarantees.
fn first_matching_content(
    world: &WorldData,
    parent: EntityRef,
    template_id: &str,
) -> Option<&mash_core::Instance> {
    let container_key: mash_store::ContainerKey = match parent {
        EntityRef::Agent(agent_id) => mash_store::ContainerKey::Agent(agent_id),
        EntityRef::Instance(instance_id) => mash_store::ContainerKey::Instance(instance_id),
    };
    let mut candidates: Vec<&mash_core::Instance> = world
        .contents_of(container_key)
        .into_iter()
        .filter_map(|id| world.instances.get(&id))
        .filter(|inst| inst.is_live())
        .filter(|inst| inst.template_id.map(|t| t.to_string()) == Some(template_id.to_string()))
        .collect();
    candidates.sort_by_key(|inst| inst.id.as_uuid());
    candidates.into_iter().next()
}

/// `tick.count` — seconds-since-UTC-midnight at evaluation time.
fn tick_count() -> Value {
    let now = chrono::Utc::now();
    let midnight = now.date_naive().and_hms_opt(0, 0, 0).unwrap();
    let secs = (now.naive_utc() - midnight).num_seconds();
    Value::Num(secs as f64)
}

/// Resolve any reference to a scalar `Value`. Bare heads resolve to the
/// entity's id; `tick` resolves to `tick.count`-shaped scalar only via the
/// `Field` form (a bare `tick` head alone is undefined, matching the
/// grammar's "`tick.count`" example).
pub fn resolve_scalar(world: &WorldData, ctx: &EvalContext, reference: &Reference) -> Option<Value> {
    match reference {
        Reference::SelfEntity | Reference::Actor | Reference::Subject | Reference::Container | Reference::Carrier => {
            resolve_bare(world, ctx, reference).map(|e| Value::Str(e.id_string()))
        }
        Reference::Tick => None,
        Reference::Field { head, field } => {
            if matches!(**head, Reference::Tick) {
                return if field == "count" { Some(tick_count()) } else { None };
            }
            let entity = resolve_bare(world, ctx, head)?;
            match field.as_str() {
                "id" | "username" | "short_description" | "long_description" => entity_field(world, entity, field),
                _ if is_self_or_container(head) => custom_field(world, entity, field),
                _ => None,
            }
        }
        Reference::ContentsField { head, template_id, field } => {
            let parent = resolve_bare(world, ctx, head)?;
            let inst = first_matching_content(world, parent, template_id)?;
            match field.as_str() {
                "id" => Some(Value::Str(inst.id.to_string())),
                "short_description" => Some(Value::Str(inst.short_description.clone())),
                "long_description" => Some(Value::Str(inst.long_description.clone())),
                other => inst.fields.get(other).cloned(),
            }
        }
    }
}

/// Resolve a reference naming an entity kind directly (used by effects like
/// `take ... from ref`, `destroy ref`, `perm ref ...`). Returns `None` for
/// `tick` or an unbound head.
pub fn resolve_entity(world: &WorldData, ctx: &EvalContext, reference: &Reference) -> Option<EntityRef> {
    resolve_bare(world, ctx, reference)
}

/// Decompose a `set`/`add` reference into the entity it targets and the
/// field being written. Only `self`, `subject`, and `container` may be
/// write targets.
pub fn resolve_write_target<'a>(
    world: &WorldData,
    ctx: &EvalContext,
    reference: &'a Reference,
) -> Option<(EntityRef, &'a str)> {
    let Reference::Field { head, field } = reference else { return None };
    if !matches!(**head, Reference::SelfEntity | Reference::Subject | Reference::Container) {
        return None;
    }
    let entity = resolve_bare(world, ctx, head)?;
    Some((entity, field.as_str()))
}

pub fn kind_of(world: &WorldData, entity: EntityRef) -> Option<EntityKind> {
    match entity {
        EntityRef::Agent(_) => None,
        EntityRef::Instance(id) => world.instances.get(&id).map(|i| i.kind),
    }
}
