//! Agent signup bootstrap: a fresh agent gets a home node and the two
//! wired-in system instances (`random_link`, `link_index`).
//! Account auth mechanics (password hashing, token minting) are the
//! transport layer's concern — this module only builds the world-side
//! state once an agent id, username, and bearer token have been decided.

use std::collections::BTreeMap;

use mash_core::{
    Agent, ContainerRef, EntityIdType, EntityKind, Instance, InstanceId, PerceptionCaps, PermissionKey,
    PermissionRule, SystemType,
};
use mash_store::WorldData;

use crate::error::{ActionError, ActionResult};

/// Create an agent's home node plus its two system instances, and the agent
/// row itself. Fails if the username is already taken.
pub fn signup(world: &mut WorldData, username: String, token: String) -> ActionResult<Agent> {
    if world.agent_by_username(&username).is_some() {
        return Err(mash_core::StateError::Conflict(format!("username '{username}' is taken")).into());
    }

    let home_node_id = InstanceId::new_v7();
    let mut home_permissions = BTreeMap::new();
    home_permissions.insert(PermissionKey::Interact, PermissionRule::List(vec![username.clone()]));
    home_permissions.insert(PermissionKey::Edit, PermissionRule::List(vec![username.clone()]));
    home_permissions.insert(PermissionKey::Contain, PermissionRule::List(vec![username.clone()]));
    home_permissions.insert(PermissionKey::Perms, PermissionRule::List(vec![username.clone()]));
    home_permissions.insert(PermissionKey::Delete, PermissionRule::None);
    home_permissions.insert(PermissionKey::Inspect, PermissionRule::Any);

    world.insert_instance(Instance {
        id: home_node_id,
        template_id: None,
        kind: EntityKind::Node,
        short_description: format!("{username}'s home"),
        long_description: format!("A cozy home node belonging to {username}."),
        fields: Default::default(),
        permissions: home_permissions,
        container: None,
        is_void: false,
        is_destroyed: false,
        system_type: SystemType::None,
        interactions_used_this_tick: 0,
    });

    insert_system_instances(world, home_node_id);

    let agent_id = mash_core::AgentId::new_v4();
    let agent = Agent {
        id: agent_id,
        username: username.clone(),
        token,
        current_node_id: Some(home_node_id),
        home_node_id,
        ap: mash_core::MAX_AP,
        purchased_ap_this_tick: 0,
        short_description: format!("{username}, an agent"),
        long_description: format!("{username} has not set a description yet."),
        perception_caps: PerceptionCaps::default(),
        see_broadcasts: true,
        last_active_at: chrono::Utc::now(),
    };
    world.insert_agent(agent.clone());
    Ok(agent)
}

/// Insert the `random_link` / `link_index` system instances every home node
/// carries. Used at signup and by the `reset` custom verb on a home node.
pub fn insert_system_instances(world: &mut WorldData, home_node_id: InstanceId) {
    world.insert_instance(Instance {
        id: InstanceId::new_v7(),
        template_id: None,
        kind: EntityKind::Link,
        short_description: "a shimmering portal".to_string(),
        long_description: "A shimmering portal that leads somewhere new each time.".to_string(),
        fields: Default::default(),
        permissions: Default::default(),
        container: Some(ContainerRef::Instance { instance_id: home_node_id }),
        is_void: false,
        is_destroyed: false,
        system_type: SystemType::RandomLink,
        interactions_used_this_tick: 0,
    });

    world.insert_instance(Instance {
        id: InstanceId::new_v7(),
        template_id: None,
        kind: EntityKind::Thing,
        short_description: "a glowing directory".to_string(),
        long_description: "A glowing directory recording your recent travels.".to_string(),
        fields: Default::default(),
        permissions: Default::default(),
        container: Some(ContainerRef::Instance { instance_id: home_node_id }),
        is_void: false,
        is_destroyed: false,
        system_type: SystemType::LinkIndex,
        interactions_used_this_tick: 0,
    });
}

/// `reset` on the caller's own home node: restore default descriptions and
/// fields, and destroy any non-system contents.
pub fn reset_home_node(world: &mut WorldData, config: &mash_core::WorldConfig, agent_username: &str, node_id: InstanceId) -> ActionResult<()> {
    let contents = world.contents_of(mash_store::ContainerKey::Instance(node_id));
    for child_id in contents {
        let Some(child) = world.instances.get(&child_id) else { continue };
        if child.system_type != SystemType::None {
            continue;
        }
        crate::cascade::destroy_instance(world, config, child_id);
    }
    let Some(node) = world.instances.get_mut(&node_id) else {
        return Err(ActionError::not_found(node_id));
    };
    node.short_description = format!("{agent_username}'s home");
    node.long_description = format!("A cozy home node belonging to {agent_username}.");
    node.fields.clear();
    Ok(())
}
