//! Request envelope and event bus.

use mash_core::{AgentId, EventType, InstanceId, WorldConfig};
use mash_store::WorldData;
use serde::Serialize;
use serde_json::Value as Json;

/// `info = { tick, next_tick_in_ms, ap, purchased_ap_this_tick, events[] }`.
#[derive(Debug, Clone, Serialize)]
pub struct EnvelopeInfo {
    pub tick: u64,
    pub next_tick_in_ms: i64,
    pub ap: i32,
    pub purchased_ap_this_tick: u32,
    pub events: Vec<EventPayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventPayload {
    pub ordinal: u64,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub data: Json,
}

/// `next_tick_in_ms = max(0, last_tick_at + TICK_INTERVAL_MS − now)`.
pub fn next_tick_in_ms(world: &WorldData, config: &WorldConfig) -> i64 {
    let deadline = world.world_state.last_tick_at + chrono::Duration::milliseconds(config.tick_interval_ms as i64);
    let remaining = (deadline - chrono::Utc::now()).num_milliseconds();
    remaining.max(0)
}

/// The full wire shape every authenticated response carries:
/// `{ info: {...}, result: <handler-specific payload> }`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub info: EnvelopeInfo,
    pub result: Json,
}

/// Build the envelope for `agent_id`, destructively draining its event
/// backlog (up to `config.max_events_per_envelope`) — event consumption is
/// destructive, so a client that drops a response loses those events.
pub fn build_envelope(world: &mut WorldData, config: &WorldConfig, agent_id: AgentId) -> EnvelopeInfo {
    let tick = world.world_state.tick_number;
    let next_in = next_tick_in_ms(world, config);
    let (ap, purchased) = world
        .agents
        .get(&agent_id)
        .map(|a| (a.ap, a.purchased_ap_this_tick))
        .unwrap_or((0, 0));
    let events = world
        .drain_events_for(agent_id, config.max_events_per_envelope)
        .into_iter()
        .map(|e| EventPayload { ordinal: e.ordinal.0, event_type: e.event_type, data: e.data })
        .collect();
    EnvelopeInfo { tick, next_tick_in_ms: next_in, ap, purchased_ap_this_tick: purchased, events }
}

/// Build the full `{info, result}` envelope for `agent_id` — every
/// authenticated endpoint's response shape.
pub fn build_response(world: &mut WorldData, config: &WorldConfig, agent_id: AgentId, result: Json) -> Envelope {
    Envelope { info: build_envelope(world, config, agent_id), result }
}

/// Write an event row for every agent currently in `node_id` with
/// `see_broadcasts` true, excluding `exclude` if given. Broadcasts are only
/// ever enqueued, never synchronously delivered.
pub fn broadcast_to_node(
    world: &mut WorldData,
    node_id: InstanceId,
    event_type: EventType,
    data: Json,
    exclude: Option<AgentId>,
) -> usize {
    let mut delivered = 0;
    for agent_id in world.agents_in_node(node_id) {
        if Some(agent_id) == exclude {
            continue;
        }
        let Some(agent) = world.agents.get(&agent_id) else { continue };
        if !agent.see_broadcasts {
            continue;
        }
        world.push_event(agent_id, event_type, data.clone());
        delivered += 1;
    }
    delivered
}
