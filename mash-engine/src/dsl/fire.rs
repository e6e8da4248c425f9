//! `fire(instance, verb, actor, subject)` — the top-level DSL entry point.

use mash_core::{AgentId, InstanceId, WorldConfig};
use mash_store::WorldData;

use super::condition::eval_conditions;
use super::context::{EntityRef, EvalContext, EvalState};
use super::effect::apply_effect;

/// Run every interaction rule whose `on` matches `verb` against `self`, in
/// template order, up to `MAX_INTERACTIONS_PER_TICK` matching rules.
/// Returns `true` if any executed rule hit `deny` (the caller should roll
/// back / reject the triggering verb).
pub fn fire(
    world: &mut WorldData,
    config: &WorldConfig,
    self_id: InstanceId,
    verb: &str,
    actor: Option<AgentId>,
    subject: Option<EntityRef>,
) -> bool {
    let Some(inst) = world.instances.get(&self_id) else { return false };
    if !inst.is_live() {
        return false;
    }
    let Some(template_id) = inst.template_id else { return false };
    let Some(template) = world.templates.get(&template_id).cloned() else { return false };

    let ctx = EvalContext::new(self_id, actor, subject);
    let mut state = EvalState::default();

    for rule in template.interactions.iter().filter(|r| r.on == verb) {
        let used = world.instances.get(&self_id).map(|i| i.interactions_used_this_tick).unwrap_or(0);
        if used >= config.max_interactions_per_tick {
            tracing::debug!(instance = %self_id, verb, "interaction budget exhausted, dropping remaining rules");
            break;
        }
        if let Some(i) = world.instances.get_mut(&self_id) {
            i.interactions_used_this_tick += 1;
        }

        let matched = eval_conditions(world, &ctx, &rule.if_conditions);
        let branch = if matched { &rule.do_effects } else { &rule.else_effects };
        for effect in branch {
            if state.denied {
                break;
            }
            apply_effect(world, config, &ctx, &mut state, effect);
        }
        if state.denied {
            tracing::debug!(instance = %self_id, verb, "interaction rule denied, aborting remaining rules");
            break;
        }
    }

    state.denied
}
