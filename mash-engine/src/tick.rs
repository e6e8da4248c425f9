//! The tick engine: one fixed-period critical section that advances the
//! whole world. `run_tick` runs all six phases under a single
//! `WorldStore::transaction`, so nothing else can observe a half-applied
//! tick.

use mash_core::{EventType, WorldConfig};
use mash_store::{ContainerKey, WorldData, WorldStore};

use crate::waiter::WaiterSet;

/// Counts surfaced purely for a `tracing::info!` span at the end of a tick;
/// nothing in the protocol depends on them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick_number: u64,
    pub agents_reaped: u32,
    pub instances_fired: u32,
    pub queue_entries_drained: u32,
    pub events_gced: usize,
}

/// Run one tick to completion: advance counters, reap idle agents, fire
/// `tick` on every occupied node's contents, drain the due action queue,
/// garbage-collect stale events, and release every long-poll waiter, in
/// that order.
pub fn run_tick(store: &WorldStore, config: &WorldConfig, waiters: &WaiterSet) -> TickReport {
    let report = store
        .transaction(|world| {
            let report = run_tick_inner(world, config);
            // Phase 6: release every registered `/wait` waiter while the
            // store lock is still held, so no mutation can slip in between
            // the world settling and waiters being told about it.
            waiters.release_all();
            Ok(report)
        })
        .expect("tick transaction never fails");

    tracing::info!(
        tick = report.tick_number,
        agents_reaped = report.agents_reaped,
        instances_fired = report.instances_fired,
        queue_entries_drained = report.queue_entries_drained,
        events_gced = report.events_gced,
        "tick complete"
    );
    report
}

fn run_tick_inner(world: &mut WorldData, config: &WorldConfig) -> TickReport {
    let tick_number = advance_counters(world, config);
    let agents_reaped = reap_idle_agents(world, config);
    let instances_fired = run_world_tick(world, config);
    let queue_entries_drained = drain_queue(world, config, tick_number);
    let events_gced = world.gc_events_older_than(config.event_undelivered_ttl_ms);

    TickReport { tick_number, agents_reaped, instances_fired, queue_entries_drained, events_gced }
}

/// Phase 1: increment `tick_number`, stamp `last_tick_at`, reset every
/// agent's AP and `purchased_ap_this_tick`, reset every instance's
/// per-tick interaction counter.
fn advance_counters(world: &mut WorldData, config: &WorldConfig) -> u64 {
    world.world_state.tick_number += 1;
    world.world_state.last_tick_at = chrono::Utc::now();

    for agent in world.agents.values_mut() {
        agent.ap = config.max_ap;
        agent.purchased_ap_this_tick = 0;
    }
    for inst in world.instances.values_mut() {
        inst.interactions_used_this_tick = 0;
    }
    world.world_state.tick_number
}

/// Phase 2: any agent idle longer than `IDLE_TIMEOUT_MS` is sent to limbo
/// (`current_node_id = None`) and told so; they re-enter at home on their
/// next authenticated request.
fn reap_idle_agents(world: &mut WorldData, config: &WorldConfig) -> u32 {
    let now = chrono::Utc::now();
    let cutoff = now - chrono::Duration::milliseconds(config.idle_timeout_ms);
    let stale: Vec<mash_core::AgentId> = world
        .agents
        .values()
        .filter(|a| a.current_node_id.is_some() && a.last_active_at < cutoff)
        .map(|a| a.id)
        .collect();
    for agent_id in &stale {
        world.set_agent_node(*agent_id, None);
        world.push_event(
            *agent_id,
            EventType::System,
            serde_json::json!({"message": "You have been idle too long and drift into limbo."}),
        );
    }
    stale.len() as u32
}

/// Phase 3: for each occupied node, fire `tick` (actor=null, subject=null)
/// on each of its immediately-contained, non-void instances, in creation
/// order. A single rule's error is logged and does not abort the phase —
/// `fire` itself never returns an error type, only the `denied` flag, which
/// has no caller to reject here: a world tick has no actor to roll back.
fn run_world_tick(world: &mut WorldData, config: &WorldConfig) -> u32 {
    let mut fired = 0u32;
    for node_id in world.occupied_nodes() {
        let contents = world.live_contents_sorted(ContainerKey::Instance(node_id));
        for instance_id in contents {
            crate::dsl::fire(world, config, instance_id, "tick", None, None);
            fired += 1;
        }
    }
    fired
}

/// Phase 4: dispatch every action-queue entry due at or before `tick`, in
/// ordinal order, each inside its own fold — a failing entry yields an
/// `action_result` event carrying `{error}` rather than aborting the drain.
/// Entries whose agent has vanished or is in limbo are dropped silently —
/// there is nowhere to deliver the result.
fn drain_queue(world: &mut WorldData, config: &WorldConfig, tick: u64) -> u32 {
    let due = world.drain_due(tick);
    let mut drained = 0u32;
    for entry in due {
        let in_world = world
            .agents
            .get(&entry.agent_id)
            .map(|a| a.current_node_id.is_some())
            .unwrap_or(false);
        if !in_world {
            tracing::debug!(agent = %entry.agent_id, verb = %entry.verb, "dropping queued action for missing/limbo agent");
            continue;
        }

        let result = match crate::actions::run_queued(world, config, tick, &entry) {
            Ok(json) => json,
            Err(err) => {
                tracing::debug!(agent = %entry.agent_id, verb = %entry.verb, error = %err, "queued action failed");
                serde_json::json!({"error": err.reason()})
            }
        };
        world.push_event(
            entry.agent_id,
            EventType::ActionResult,
            serde_json::json!({"action": entry.verb, "action_id": entry.ordinal.0, "result": result}),
        );
        drained += 1;
    }
    drained
}

#[cfg(test)]
mod tests {
    use super::*;
    use mash_core::*;
    use mash_store::WorldStore;

    fn default_config() -> WorldConfig {
        WorldConfig::default()
    }

    #[test]
    fn tick_increments_and_resets_ap() {
        let store = WorldStore::new();
        let waiters = WaiterSet::new();
        let config = default_config();
        let agent_id = AgentId::new_v4();
        let node_id = InstanceId::new_v7();

        store
            .transaction(|w| {
                w.insert_instance(Instance {
                    id: node_id,
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
                });
                w.insert_agent(Agent {
                    id: agent_id,
                    username: "alice".into(),
                    token: "tok".into(),
                    current_node_id: Some(node_id),
                    home_node_id: node_id,
                    ap: 0,
                    purchased_ap_this_tick: 7,
                    short_description: "alice".into(),
                    long_description: "alice".into(),
                    perception_caps: PerceptionCaps::default(),
                    see_broadcasts: true,
                    last_active_at: chrono::Utc::now(),
                });
                Ok(())
            })
            .unwrap();

        let report = run_tick(&store, &config, &waiters);
        assert_eq!(report.tick_number, 1);

        store.read(|w| {
            assert_eq!(w.world_state.tick_number, 1);
            let agent = w.agents.get(&agent_id).unwrap();
            assert_eq!(agent.ap, config.max_ap);
            assert_eq!(agent.purchased_ap_this_tick, 0);
        });
    }

    #[test]
    fn idle_agent_is_reaped_to_limbo() {
        let store = WorldStore::new();
        let waiters = WaiterSet::new();
        let mut config = default_config();
        config.idle_timeout_ms = 1000;
        let agent_id = AgentId::new_v4();
        let node_id = InstanceId::new_v7();

        store
            .transaction(|w| {
                w.insert_instance(Instance {
                    id: node_id,
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
                });
                w.insert_agent(Agent {
                    id: agent_id,
                    username: "alice".into(),
                    token: "tok".into(),
                    current_node_id: Some(node_id),
                    home_node_id: node_id,
                    ap: 4,
                    purchased_ap_this_tick: 0,
                    short_description: "alice".into(),
                    long_description: "alice".into(),
                    perception_caps: PerceptionCaps::default(),
                    see_broadcasts: true,
                    last_active_at: chrono::Utc::now() - chrono::Duration::milliseconds(5000),
                });
                Ok(())
            })
            .unwrap();

        let report = run_tick(&store, &config, &waiters);
        assert_eq!(report.agents_reaped, 1);
        store.read(|w| {
            assert_eq!(w.agents.get(&agent_id).unwrap().current_node_id, None);
            assert_eq!(w.drain_events_for(agent_id, 10).len(), 0);
        });
    }

    #[test]
    fn queue_drains_due_entries_and_emits_action_result() {
        let store = WorldStore::new();
        let waiters = WaiterSet::new();
        let config = default_config();
        let agent_id = AgentId::new_v4();
        let node_id = InstanceId::new_v7();

        store
            .transaction(|w| {
                w.insert_instance(Instance {
                    id: node_id,
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
                });
                w.insert_agent(Agent {
                    id: agent_id,
                    username: "alice".into(),
                    token: "tok".into(),
                    current_node_id: Some(node_id),
                    home_node_id: node_id,
                    ap: 4,
                    purchased_ap_this_tick: 0,
                    short_description: "alice".into(),
                    long_description: "alice".into(),
                    perception_caps: PerceptionCaps::default(),
                    see_broadcasts: true,
                    last_active_at: chrono::Utc::now(),
                });
                w.enqueue(agent_id, "home".to_string(), serde_json::json!({}), 1);
                Ok(())
            })
            .unwrap();

        let report = run_tick(&store, &config, &waiters);
        assert_eq!(report.queue_entries_drained, 1);
        store
            .transaction(|w| {
                let events = w.drain_events_for(agent_id, 10);
                assert_eq!(events.len(), 1);
                assert_eq!(events[0].event_type, EventType::ActionResult);
                assert_eq!(events[0].data["action"], "home");
                Ok(())
            })
            .unwrap();
    }
}
