//! MASH Permission & Containment
//!
//! Pure, synchronous resolution of effective permissions and containment
//! depth. Every function here takes a `&WorldData` snapshot
//! and a reference or id; none of them mutate, none of them fail — a missing
//! or inconsistent reference degrades to the least-privileged answer rather
//! than an error, matching the "never throws, every operation returns a
//! boolean" failure semantics the permission model commits to.

use mash_core::{AgentId, Instance, InstanceId, PermissionKey, PermissionRule, Template};
use mash_store::{ContainerKey, WorldData};

/// Upward walk bound used purely to survive malformed/cyclic containment
/// data; legitimate chains never get close to it since
/// `mash_core::MAX_CONTAINMENT_DEPTH` is 5.
const WALK_GUARD: u32 = 64;

/// Resolve the rule that governs `key` on `instance`: instance override,
/// else template default, else `owner`.
pub fn effective_permission(
    instance: &Instance,
    template: Option<&Template>,
    key: PermissionKey,
) -> PermissionRule {
    if let Some(rule) = instance.permissions.get(&key) {
        return rule.clone();
    }
    if let Some(t) = template {
        if let Some(rule) = t.default_permissions.get(&key) {
            return rule.clone();
        }
    }
    PermissionRule::Owner
}

/// The owning agent of an instance, or `None` if it is voided (a voided
/// instance has no template and therefore no owner — `owner` rules always
/// fail on it).
pub fn owner_of(world: &WorldData, instance: &Instance) -> Option<AgentId> {
    let template_id = instance.template_id?;
    world.templates.get(&template_id).map(|t| t.owner_id)
}

/// The node an instance is ultimately contained by: itself if it is a node,
/// otherwise the node reached by walking container edges upward. Instances
/// in an agent's inventory resolve to that agent's current node (`None` if
/// the agent is in limbo). Returns `None` if the walk cannot reach a node
/// within `WALK_GUARD` steps (orphaned or cyclic data).
pub fn containing_node(world: &WorldData, instance_id: InstanceId) -> Option<InstanceId> {
    let mut current = world.instances.get(&instance_id)?;
    if current.kind == mash_core::EntityKind::Node {
        return Some(instance_id);
    }
    for _ in 0..WALK_GUARD {
        match current.container {
            None => return None,
            Some(mash_core::ContainerRef::Agent { agent_id }) => {
                return world.agents.get(&agent_id).and_then(|a| a.current_node_id);
            }
            Some(mash_core::ContainerRef::Instance { instance_id: parent_id }) => {
                let parent = world.instances.get(&parent_id)?;
                if parent.kind == mash_core::EntityKind::Node {
                    return Some(parent_id);
                }
                current = parent;
            }
        }
    }
    None
}

/// Number of containment hops from `container` up to a root node (0 if
/// `container` already is a node or an agent's inventory). Saturates at
/// `WALK_GUARD` for cyclic/orphaned data rather than looping forever.
pub fn depth_of_container(world: &WorldData, container: ContainerKey) -> u32 {
    let mut depth = 0u32;
    let mut current = container;
    loop {
        match current {
            ContainerKey::Agent(_) => return depth,
            ContainerKey::Instance(id) => {
                let Some(inst) = world.instances.get(&id) else { return depth };
                if inst.kind == mash_core::EntityKind::Node {
                    return depth;
                }
                match inst.container {
                    Some(parent) => {
                        if depth >= WALK_GUARD {
                            return WALK_GUARD;
                        }
                        depth += 1;
                        current = parent.into();
                    }
                    None => return depth,
                }
            }
        }
    }
}

/// True iff re-parenting a child into `container` would push it past
/// `max_depth`.
pub fn would_exceed_depth(world: &WorldData, container: ContainerKey, max_depth: u32) -> bool {
    depth_of_container(world, container) + 1 > max_depth
}

/// Evaluate `rule` for `(agent_id, instance)`. Never fails: an unresolvable
/// reference (missing agent, voided instance, dangling container) is
/// treated as the rule not being satisfied.
pub fn evaluate_rule(
    world: &WorldData,
    rule: &PermissionRule,
    agent_id: AgentId,
    instance: &Instance,
) -> bool {
    match rule {
        PermissionRule::Any => true,
        PermissionRule::None => false,
        PermissionRule::Owner => owner_of(world, instance) == Some(agent_id),
        PermissionRule::Node => {
            let Some(agent) = world.agents.get(&agent_id) else { return false };
            let Some(agent_node) = agent.current_node_id else { return false };
            containing_node(world, instance.id) == Some(agent_node)
        }
        PermissionRule::List(usernames) => {
            let Some(agent) = world.agents.get(&agent_id) else { return false };
            usernames.iter().any(|u| u == &agent.username)
        }
    }
}

/// Resolve and evaluate in one call: does `agent_id` have `key` on
/// `instance`?
pub fn check(world: &WorldData, agent_id: AgentId, instance: &Instance, key: PermissionKey) -> bool {
    let template = instance.template_id.and_then(|tid| world.templates.get(&tid));
    let rule = effective_permission(instance, template, key);
    evaluate_rule(world, &rule, agent_id, instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mash_core::*;
    use mash_store::WorldStore;

    fn node(id: InstanceId) -> Instance {
        Instance {
            id,
            template_id: None,
            kind: EntityKind::Node,
            short_description: "a room".into(),
            long_description: "a room".into(),
            fields: Default::default(),
            permissions: Default::default(),
            container: None,
            is_void: false,
            is_destroyed: false,
            system_type: SystemType::None,
            interactions_used_this_tick: 0,
        }
    }

    fn thing(id: InstanceId, template_id: TemplateId, container: ContainerRef) -> Instance {
        Instance {
            id,
            template_id: Some(template_id),
            kind: EntityKind::Thing,
            short_description: "a box".into(),
            long_description: "a box".into(),
            fields: Default::default(),
            permissions: Default::default(),
            container: Some(container),
            is_void: false,
            is_destroyed: false,
            system_type: SystemType::None,
            interactions_used_this_tick: 0,
        }
    }

    #[test]
    fn owner_rule_is_false_for_voided_instance() {
        let store = WorldStore::new();
        let owner = AgentId::new_v4();
        let node_id = InstanceId::new_v4();
        store.transaction(|w| {
            w.insert_instance(node(node_id));
            let mut voided = thing(InstanceId::new_v4(), TemplateId::new_v4(), ContainerRef::Instance { instance_id: node_id });
            voided.template_id = None;
            voided.is_void = true;
            assert_eq!(owner_of(w, &voided), None);
            assert!(!evaluate_rule(w, &PermissionRule::Owner, owner, &voided));
            Ok(())
        }).unwrap();
    }

    #[test]
    fn node_rule_requires_same_containing_node() {
        let store = WorldStore::new();
        let owner = AgentId::new_v4();
        let viewer = AgentId::new_v4();
        let node_id = InstanceId::new_v4();
        let template_id = TemplateId::new_v4();
        let thing_id = InstanceId::new_v4();

        store.transaction(|w| {
            w.insert_instance(node(node_id));
            w.insert_template(Template {
                id: template_id,
                owner_id: owner,
                name: "box".into(),
                kind: EntityKind::Thing,
                short_description: "a box".into(),
                long_description: "a box".into(),
                default_fields: Default::default(),
                default_permissions: Default::default(),
                interactions: Vec::new(),
            });
            w.insert_instance(thing(thing_id, template_id, ContainerRef::Instance { instance_id: node_id }));
            w.insert_agent(Agent {
                id: viewer,
                username: "viewer".into(),
                token: "tok".into(),
                current_node_id: Some(node_id),
                home_node_id: node_id,
                ap: 4,
                purchased_ap_this_tick: 0,
                short_description: "a traveler".into(),
                long_description: "a traveler".into(),
                perception_caps: PerceptionCaps::default(),
                see_broadcasts: true,
                last_active_at: chrono::Utc::now(),
            });
            Ok(())
        }).unwrap();

        store.read(|w| {
            let inst = w.instances.get(&thing_id).unwrap();
            assert!(evaluate_rule(w, &PermissionRule::Node, viewer, inst));
        });
    }

    #[test]
    fn depth_increases_through_nested_containers() {
        let store = WorldStore::new();
        let node_id = InstanceId::new_v4();
        let outer_id = InstanceId::new_v4();
        let template_id = TemplateId::new_v4();
        let owner = AgentId::new_v4();

        store.transaction(|w| {
            w.insert_instance(node(node_id));
            w.insert_instance(thing(outer_id, template_id, ContainerRef::Instance { instance_id: node_id }));
            Ok(())
        }).unwrap();

        store.read(|w| {
            assert_eq!(depth_of_container(w, ContainerKey::Instance(node_id)), 0);
            assert_eq!(depth_of_container(w, ContainerKey::Instance(outer_id)), 1);
            assert!(!would_exceed_depth(w, ContainerKey::Instance(outer_id), MAX_CONTAINMENT_DEPTH));
        });
        let _ = owner;
    }

    #[test]
    fn list_rule_matches_on_username() {
        let store = WorldStore::new();
        let owner = AgentId::new_v4();
        let listed = AgentId::new_v4();
        let node_id = InstanceId::new_v4();
        let template_id = TemplateId::new_v4();
        let thing_id = InstanceId::new_v4();

        store.transaction(|w| {
            w.insert_instance(node(node_id));
            w.insert_template(Template {
                id: template_id,
                owner_id: owner,
                name: "box".into(),
                kind: EntityKind::Thing,
                short_description: "a box".into(),
                long_description: "a box".into(),
                default_fields: Default::default(),
                default_permissions: Default::default(),
                interactions: Vec::new(),
            });
            w.insert_instance(thing(thing_id, template_id, ContainerRef::Instance { instance_id: node_id }));
            w.insert_agent(Agent {
                id: listed,
                username: "alice".into(),
                token: "tok".into(),
                current_node_id: Some(node_id),
                home_node_id: node_id,
                ap: 4,
                purchased_ap_this_tick: 0,
                short_description: "a traveler".into(),
                long_description: "a traveler".into(),
                perception_caps: PerceptionCaps::default(),
                see_broadcasts: true,
                last_active_at: chrono::Utc::now(),
            });
            Ok(())
        }).unwrap();

        store.read(|w| {
            let rule = PermissionRule::List(vec!["alice".into()]);
            assert!(evaluate_rule(w, &rule, listed, w.instances.get(&thing_id).unwrap()));
            assert!(!evaluate_rule(w, &rule, owner, w.instances.get(&thing_id).unwrap()));
        });
    }
}
