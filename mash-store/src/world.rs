use mash_core::*;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

/// Hashable key mirroring `ContainerRef`, used to index instances by
/// container without requiring `ContainerRef` itself to own a `HashSet` key
/// for the `TopLevel`/absent case (nodes are never indexed here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKey {
    Agent(AgentId),
    Instance(InstanceId),
}

impl From<ContainerRef> for ContainerKey {
    fn from(c: ContainerRef) -> Self {
        match c {
            ContainerRef::Agent { agent_id } => ContainerKey::Agent(agent_id),
            ContainerRef::Instance { instance_id } => ContainerKey::Instance(instance_id),
        }
    }
}

/// All world state, guarded by `WorldStore`'s single mutex.
#[derive(Debug, Default)]
pub struct WorldData {
    pub agents: HashMap<AgentId, Agent>,
    agents_by_token: HashMap<String, AgentId>,
    agents_by_username: HashMap<String, AgentId>,
    agents_by_node: HashMap<InstanceId, HashSet<AgentId>>,

    pub templates: HashMap<TemplateId, Template>,
    templates_by_owner: HashMap<AgentId, HashSet<TemplateId>>,

    pub instances: HashMap<InstanceId, Instance>,
    instances_by_template: HashMap<TemplateId, HashSet<InstanceId>>,
    instances_by_container: HashMap<ContainerKey, HashSet<InstanceId>>,

    pub queue: BTreeMap<ActionId, ActionQueueEntry>,

    events: BTreeMap<EventId, Event>,
    events_by_agent: HashMap<AgentId, BTreeSet<EventId>>,

    link_usage: HashMap<AgentId, Vec<LinkUsageRecord>>,

    pub world_state: WorldState,

    next_action_ordinal: u64,
    next_event_ordinal: u64,
}

impl WorldData {
    fn new() -> Self {
        Self {
            world_state: WorldState { tick_number: 0, last_tick_at: chrono::Utc::now() },
            ..Default::default()
        }
    }

    // -- ordinals ------------------------------------------------------

    pub fn next_action_id(&mut self) -> ActionId {
        let id = ActionId(self.next_action_ordinal);
        self.next_action_ordinal += 1;
        id
    }

    pub fn next_event_id(&mut self) -> EventId {
        let id = EventId(self.next_event_ordinal);
        self.next_event_ordinal += 1;
        id
    }

    // -- agents ----------------------------------------------------------

    pub fn insert_agent(&mut self, agent: Agent) {
        self.agents_by_token.insert(agent.token.clone(), agent.id);
        self.agents_by_username.insert(agent.username.clone(), agent.id);
        if let Some(node) = agent.current_node_id {
            self.agents_by_node.entry(node).or_default().insert(agent.id);
        }
        self.agents.insert(agent.id, agent);
    }

    pub fn agent_by_token(&self, token: &str) -> Option<&Agent> {
        self.agents_by_token.get(token).and_then(|id| self.agents.get(id))
    }

    /// Rotate an agent's bearer token, keeping the by-token index in sync.
    pub fn set_agent_token(&mut self, agent_id: AgentId, new_token: String) {
        if let Some(agent) = self.agents.get(&agent_id) {
            self.agents_by_token.remove(&agent.token);
        }
        self.agents_by_token.insert(new_token.clone(), agent_id);
        if let Some(agent) = self.agents.get_mut(&agent_id) {
            agent.token = new_token;
        }
    }

    pub fn agent_by_username(&self, username: &str) -> Option<&Agent> {
        self.agents_by_username.get(username).and_then(|id| self.agents.get(id))
    }

    pub fn agents_in_node(&self, node_id: InstanceId) -> Vec<AgentId> {
        self.agents_by_node.get(&node_id).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    /// Stamp an agent's `last_active_at` and, if it is in limbo (idle-reaped
    /// by a prior tick's phase 2), restore it to its home node. Called once
    /// per authenticated HTTP request.
    pub fn mark_active(&mut self, agent_id: AgentId) {
        let (was_limbo, home) = match self.agents.get(&agent_id) {
            Some(agent) => (agent.current_node_id.is_none(), agent.home_node_id),
            None => return,
        };
        if was_limbo {
            self.set_agent_node(agent_id, Some(home));
        }
        if let Some(agent) = self.agents.get_mut(&agent_id) {
            agent.last_active_at = chrono::Utc::now();
        }
    }

    /// Move an agent's `current_node_id`, keeping the by-node index in sync.
    pub fn set_agent_node(&mut self, agent_id: AgentId, node_id: Option<InstanceId>) {
        if let Some(agent) = self.agents.get(&agent_id) {
            if let Some(old_node) = agent.current_node_id {
                if let Some(set) = self.agents_by_node.get_mut(&old_node) {
                    set.remove(&agent_id);
                }
            }
        }
        if let Some(agent) = self.agents.get_mut(&agent_id) {
            agent.current_node_id = node_id;
        }
        if let Some(node) = node_id {
            self.agents_by_node.entry(node).or_default().insert(agent_id);
        }
    }

    /// Distinct node ids with at least one agent currently present.
    pub fn occupied_nodes(&self) -> Vec<InstanceId> {
        self.agents_by_node.iter().filter(|(_, set)| !set.is_empty()).map(|(k, _)| *k).collect()
    }

    // -- templates ---------------------------------------------------------

    pub fn insert_template(&mut self, template: Template) {
        self.templates_by_owner.entry(template.owner_id).or_default().insert(template.id);
        self.templates.insert(template.id, template);
    }

    pub fn templates_owned_by(&self, owner: AgentId) -> Vec<TemplateId> {
        self.templates_by_owner.get(&owner).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    // -- instances -----------------------------------------------------

    pub fn insert_instance(&mut self, instance: Instance) {
        if let Some(tid) = instance.template_id {
            self.instances_by_template.entry(tid).or_default().insert(instance.id);
        }
        if let Some(container) = instance.container {
            self.instances_by_container.entry(container.into()).or_default().insert(instance.id);
        }
        self.instances.insert(instance.id, instance);
    }

    pub fn instances_of_template(&self, template_id: TemplateId) -> Vec<InstanceId> {
        self.instances_by_template.get(&template_id).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    /// Re-parent an instance, keeping the container index in sync. Passing
    /// `None` detaches it (only valid transiently, e.g. mid-cascade).
    pub fn set_instance_container(&mut self, instance_id: InstanceId, container: Option<ContainerRef>) {
        if let Some(inst) = self.instances.get(&instance_id) {
            if let Some(old) = inst.container {
                if let Some(set) = self.instances_by_container.get_mut(&old.into()) {
                    set.remove(&instance_id);
                }
            }
        }
        if let Some(inst) = self.instances.get_mut(&instance_id) {
            inst.container = container;
        }
        if let Some(c) = container {
            self.instances_by_container.entry(c.into()).or_default().insert(instance_id);
        }
    }

    pub fn contents_of(&self, container: ContainerKey) -> Vec<InstanceId> {
        self.instances_by_container.get(&container).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    /// Immediately-contained non-void, non-destroyed instances of a node, in
    /// a stable creation order (ascending `InstanceId`'s underlying UUIDv7,
    /// which is time-sortable).
    pub fn live_contents_sorted(&self, container: ContainerKey) -> Vec<InstanceId> {
        let mut ids: Vec<InstanceId> = self
            .contents_of(container)
            .into_iter()
            .filter(|id| self.instances.get(id).map(|i| i.is_live()).unwrap_or(false))
            .collect();
        ids.sort_by_key(|id| id.as_uuid());
        ids
    }

    // -- queue -----------------------------------------------------------

    pub fn enqueue(&mut self, agent_id: AgentId, verb: String, params: serde_json::Value, target_tick: u64) -> ActionId {
        let ordinal = self.next_action_id();
        self.queue.insert(
            ordinal,
            ActionQueueEntry {
                ordinal,
                agent_id,
                verb,
                params,
                target_tick,
                created_at: chrono::Utc::now(),
            },
        );
        ordinal
    }

    /// Remove and return every queue entry due at or before `tick`, in
    /// ordinal order.
    pub fn drain_due(&mut self, tick: u64) -> Vec<ActionQueueEntry> {
        let due: Vec<ActionId> = self
            .queue
            .iter()
            .filter(|(_, e)| e.target_tick <= tick)
            .map(|(id, _)| *id)
            .collect();
        due.into_iter().filter_map(|id| self.queue.remove(&id)).collect()
    }

    // -- events ------------------------------------------------------------

    pub fn push_event(&mut self, agent_id: AgentId, event_type: EventType, data: serde_json::Value) -> EventId {
        let ordinal = self.next_event_id();
        self.events.insert(
            ordinal,
            Event { ordinal, agent_id, event_type, data, created_at: chrono::Utc::now() },
        );
        self.events_by_agent.entry(agent_id).or_default().insert(ordinal);
        ordinal
    }

    /// Destructively read up to `limit` events addressed to `agent_id`, in
    /// ordinal order. Reading deletes them.
    pub fn drain_events_for(&mut self, agent_id: AgentId, limit: usize) -> Vec<Event> {
        let Some(ordinals) = self.events_by_agent.get_mut(&agent_id) else {
            return Vec::new();
        };
        let take: Vec<EventId> = ordinals.iter().take(limit).copied().collect();
        for id in &take {
            ordinals.remove(id);
        }
        take.into_iter().filter_map(|id| self.events.remove(&id)).collect()
    }

    /// Garbage-collect events older than `ttl_ms`, regardless of whether
    /// they were ever delivered.
    pub fn gc_events_older_than(&mut self, ttl_ms: i64) -> usize {
        let cutoff = chrono::Utc::now() - chrono::Duration::milliseconds(ttl_ms);
        let stale: Vec<EventId> = self
            .events
            .iter()
            .filter(|(_, e)| e.created_at < cutoff)
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            if let Some(event) = self.events.remove(id) {
                if let Some(set) = self.events_by_agent.get_mut(&event.agent_id) {
                    set.remove(id);
                }
            }
        }
        stale.len()
    }

    // -- link usage --------------------------------------------------------

    pub fn record_link_usage(&mut self, record: LinkUsageRecord) {
        self.link_usage.entry(record.agent_id).or_default().push(record);
    }

    pub fn recent_link_usage(&self, agent_id: AgentId, limit: usize) -> Vec<LinkUsageRecord> {
        let Some(records) = self.link_usage.get(&agent_id) else { return Vec::new() };
        records.iter().rev().take(limit).cloned().collect()
    }
}

/// The world's entity store: one mutex around `WorldData`. All mutation,
/// whether from an instant handler, a queued handler inside the tick, or a
/// DSL effect, goes through `transaction`.
#[derive(Debug)]
pub struct WorldStore {
    data: Mutex<WorldData>,
}

impl Default for WorldStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldStore {
    pub fn new() -> Self {
        Self { data: Mutex::new(WorldData::new()) }
    }

    /// Run `f` against the world under the single store lock. This is the
    /// only way to get mutable access; readers needing a consistent
    /// multi-field snapshot should also go through here.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut WorldData) -> MashResult<R>) -> MashResult<R> {
        let mut guard = self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Convenience read-only variant for call sites that never fail.
    pub fn read<R>(&self, f: impl FnOnce(&WorldData) -> R) -> R {
        let guard = self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_agent(id: AgentId, node: InstanceId) -> Agent {
        Agent {
            id,
            username: format!("user-{id}"),
            token: format!("token-{id}"),
            current_node_id: Some(node),
            home_node_id: node,
            ap: 4,
            purchased_ap_this_tick: 0,
            short_description: "a traveler".into(),
            long_description: "a traveler".into(),
            perception_caps: PerceptionCaps::default(),
            see_broadcasts: true,
            last_active_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn token_and_username_indices_resolve_agents() {
        let store = WorldStore::new();
        let node = InstanceId::new_v4();
        let agent_id = AgentId::new_v4();
        let agent = sample_agent(agent_id, node);
        let token = agent.token.clone();
        let username = agent.username.clone();
        store.transaction(|w| { w.insert_agent(agent); Ok(()) }).unwrap();

        store.read(|w| {
            assert_eq!(w.agent_by_token(&token).unwrap().id, agent_id);
            assert_eq!(w.agent_by_username(&username).unwrap().id, agent_id);
        });
    }

    #[test]
    fn token_rotation_updates_index() {
        let store = WorldStore::new();
        let node = InstanceId::new_v4();
        let agent_id = AgentId::new_v4();
        let old_token = "old-token".to_string();
        let mut agent = sample_agent(agent_id, node);
        agent.token = old_token.clone();

        store
            .transaction(|w| {
                w.insert_agent(agent);
                w.set_agent_token(agent_id, "new-token".to_string());
                Ok(())
            })
            .unwrap();

        store.read(|w| {
            assert!(w.agent_by_token(&old_token).is_none());
            assert_eq!(w.agent_by_token("new-token").unwrap().id, agent_id);
        });
    }

    #[test]
    fn node_index_tracks_agent_movement() {
        let store = WorldStore::new();
        let node_a = InstanceId::new_v4();
        let node_b = InstanceId::new_v4();
        let agent_id = AgentId::new_v4();
        let agent = sample_agent(agent_id, node_a);

        store.transaction(|w| {
            w.insert_agent(agent);
            assert_eq!(w.agents_in_node(node_a), vec![agent_id]);
            w.set_agent_node(agent_id, Some(node_b));
            assert!(w.agents_in_node(node_a).is_empty());
            assert_eq!(w.agents_in_node(node_b), vec![agent_id]);
            Ok(())
        }).unwrap();
    }

    #[test]
    fn mark_active_restores_a_limbo_agent_to_home() {
        let store = WorldStore::new();
        let home = InstanceId::new_v4();
        let agent_id = AgentId::new_v4();
        let mut agent = sample_agent(agent_id, home);
        agent.current_node_id = None;
        let stale = agent.last_active_at;

        store.transaction(|w| {
            w.insert_agent(agent);
            w.mark_active(agent_id);
            Ok(())
        }).unwrap();

        store.read(|w| {
            let agent = w.agents.get(&agent_id).unwrap();
            assert_eq!(agent.current_node_id, Some(home));
            assert!(agent.last_active_at >= stale);
            assert_eq!(w.agents_in_node(home), vec![agent_id]);
        });
    }

    #[test]
    fn queue_drains_only_due_entries_in_ordinal_order() {
        let store = WorldStore::new();
        let agent_id = AgentId::new_v4();
        store.transaction(|w| {
            w.enqueue(agent_id, "look".into(), serde_json::json!({}), 2);
            w.enqueue(agent_id, "say".into(), serde_json::json!({}), 1);
            w.enqueue(agent_id, "home".into(), serde_json::json!({}), 5);
            let due = w.drain_due(2);
            assert_eq!(due.len(), 2);
            assert_eq!(due[0].verb, "look");
            assert_eq!(due[1].verb, "say");
            assert_eq!(w.queue.len(), 1);
            Ok(())
        }).unwrap();
    }

    #[test]
    fn event_read_is_destructive() {
        let store = WorldStore::new();
        let agent_id = AgentId::new_v4();
        store.transaction(|w| {
            w.push_event(agent_id, EventType::System, serde_json::json!({"m": "hi"}));
            let first = w.drain_events_for(agent_id, 10);
            assert_eq!(first.len(), 1);
            let second = w.drain_events_for(agent_id, 10);
            assert!(second.is_empty());
            Ok(())
        }).unwrap();
    }

    #[test]
    fn container_index_tracks_reparenting() {
        let store = WorldStore::new();
        let node = InstanceId::new_v4();
        let thing = InstanceId::new_v4();
        store.transaction(|w| {
            w.insert_instance(Instance {
                id: thing,
                template_id: Some(TemplateId::new_v4()),
                kind: EntityKind::Thing,
                short_description: "a rock".into(),
                long_description: "a rock".into(),
                fields: Default::default(),
                permissions: Default::default(),
                container: Some(ContainerRef::Instance { instance_id: node }),
                is_void: false,
                is_destroyed: false,
                system_type: SystemType::None,
                interactions_used_this_tick: 0,
            });
            assert_eq!(
                w.contents_of(ContainerKey::Instance(node)),
                vec![thing]
            );
            let agent_id = AgentId::new_v4();
            w.set_instance_container(thing, Some(ContainerRef::Agent { agent_id }));
            assert!(w.contents_of(ContainerKey::Instance(node)).is_empty());
            assert_eq!(w.contents_of(ContainerKey::Agent(agent_id)), vec![thing]);
            Ok(())
        }).unwrap();
    }
}
