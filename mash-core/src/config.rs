//! World-tunable constants and runtime configuration.
//!
//! Where a constant's value isn't pinned by contract (`IDLE_TIMEOUT_MS`,
//! `EVENT_UNDELIVERED_TTL_MS`), the default here is the value this
//! implementation picked — see DESIGN.md "Open Questions".

/// Wall-clock length of one tick.
pub const TICK_INTERVAL_MS: u64 = 10_000;

/// AP an agent is reset to at the start of each tick.
pub const MAX_AP: i32 = 4;

/// Maximum AP purchasable via `buy_ap` in a single tick.
pub const MAX_BUY_AP: u32 = 20;

/// Maximum `count` accepted by a single `buy_ap` call.
pub const MAX_BUY_AP_PER_CALL: u32 = 10;

/// Maximum upward containment walk depth from any instance to its root node.
pub const MAX_CONTAINMENT_DEPTH: u32 = 5;

/// Maximum interaction-rule firings a single instance accumulates per tick.
pub const MAX_INTERACTIONS_PER_TICK: u32 = 4;

/// Runtime, environment-tunable configuration for the world.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldConfig {
    pub tick_interval_ms: u64,
    pub max_ap: i32,
    pub max_buy_ap: u32,
    pub max_buy_ap_per_call: u32,
    pub max_containment_depth: u32,
    pub max_interactions_per_tick: u32,
    /// An agent idle longer than this is reaped to limbo at the next tick.
    pub idle_timeout_ms: i64,
    /// Events older than this are garbage-collected during tick phase 5.
    pub event_undelivered_ttl_ms: i64,
    /// Maximum events drained into one envelope's `events[]`.
    pub max_events_per_envelope: usize,
    /// Maximum entries `link_index` returns for `look` on itself.
    pub link_index_history: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: TICK_INTERVAL_MS,
            max_ap: MAX_AP,
            max_buy_ap: MAX_BUY_AP,
            max_buy_ap_per_call: MAX_BUY_AP_PER_CALL,
            max_containment_depth: MAX_CONTAINMENT_DEPTH,
            max_interactions_per_tick: MAX_INTERACTIONS_PER_TICK,
            idle_timeout_ms: 15 * 60 * 1000,
            event_undelivered_ttl_ms: 60 * 60 * 1000,
            max_events_per_envelope: 200,
            link_index_history: 20,
        }
    }
}

impl WorldConfig {
    /// Load from environment variables, falling back to defaults for any
    /// that are unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tick_interval_ms: env_u64("MASH_TICK_INTERVAL_MS", defaults.tick_interval_ms),
            max_ap: env_i32("MASH_MAX_AP", defaults.max_ap),
            max_buy_ap: env_u32("MASH_MAX_BUY_AP", defaults.max_buy_ap),
            max_buy_ap_per_call: env_u32(
                "MASH_MAX_BUY_AP_PER_CALL",
                defaults.max_buy_ap_per_call,
            ),
            max_containment_depth: env_u32(
                "MASH_MAX_CONTAINMENT_DEPTH",
                defaults.max_containment_depth,
            ),
            max_interactions_per_tick: env_u32(
                "MASH_MAX_INTERACTIONS_PER_TICK",
                defaults.max_interactions_per_tick,
            ),
            idle_timeout_ms: env_i64("MASH_IDLE_TIMEOUT_MS", defaults.idle_timeout_ms),
            event_undelivered_ttl_ms: env_i64(
                "MASH_EVENT_UNDELIVERED_TTL_MS",
                defaults.event_undelivered_ttl_ms,
            ),
            max_events_per_envelope: env_usize(
                "MASH_MAX_EVENTS_PER_ENVELOPE",
                defaults.max_events_per_envelope,
            ),
            link_index_history: env_usize(
                "MASH_LINK_INDEX_HISTORY",
                defaults.link_index_history,
            ),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_i32(key: &str, default: i32) -> i32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let c = WorldConfig::default();
        assert_eq!(c.tick_interval_ms, 10_000);
        assert_eq!(c.max_ap, 4);
        assert_eq!(c.max_buy_ap, 20);
        assert_eq!(c.max_containment_depth, 5);
        assert_eq!(c.max_interactions_per_tick, 4);
    }
}
