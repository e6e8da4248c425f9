//! Condition evaluation.

use mash_core::{Condition, Value};
use mash_store::WorldData;

use super::context::EvalContext;
use super::reference::resolve_scalar;

fn literal_value(v: &serde_json::Value) -> Value {
    Value::from(v)
}

fn values_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Num(x), Value::Num(y)) => (x - y).abs() < f64::EPSILON,
        _ => a == b,
    }
}

pub fn eval_condition(world: &WorldData, ctx: &EvalContext, condition: &Condition) -> bool {
    match condition {
        Condition::Eq { reference, value } => {
            let resolved = resolve_scalar(world, ctx, reference).unwrap_or(Value::Null);
            values_eq(&resolved, &literal_value(value))
        }
        Condition::Neq { reference, value } => {
            let resolved = resolve_scalar(world, ctx, reference).unwrap_or(Value::Null);
            !values_eq(&resolved, &literal_value(value))
        }
        Condition::Gt { reference, value } => {
            let Some(resolved) = resolve_scalar(world, ctx, reference).and_then(|v| v.as_num()) else {
                return false;
            };
            let Some(literal) = value.as_f64() else { return false };
            resolved > literal
        }
        Condition::Lt { reference, value } => {
            let Some(resolved) = resolve_scalar(world, ctx, reference).and_then(|v| v.as_num()) else {
                return false;
            };
            let Some(literal) = value.as_f64() else { return false };
            resolved < literal
        }
        Condition::Has { reference, template_id } => eval_has(world, ctx, reference, template_id),
        Condition::Not(inner) => !eval_condition(world, ctx, inner),
    }
}

/// `has ref TID`: true iff some non-void, non-destroyed instance whose
/// template id is TID has a container id equal to the resolved id.
/// Container type is not constrained: any entity whose container id matches
/// is counted, agent or instance alike.
fn eval_has(world: &WorldData, ctx: &EvalContext, reference: &mash_core::Reference, template_id: &str) -> bool {
    let Some(target_id) = resolve_scalar(world, ctx, reference).and_then(|v| v.as_str().map(str::to_string)) else {
        return false;
    };
    world.instances.values().any(|inst| {
        inst.is_live()
            && inst.template_id.map(|t| t.to_string()).as_deref() == Some(template_id)
            && inst
                .container
                .map(|c| match c {
                    mash_core::ContainerRef::Agent { agent_id } => agent_id.to_string() == target_id,
                    mash_core::ContainerRef::Instance { instance_id } => instance_id.to_string() == target_id,
                })
                .unwrap_or(false)
    })
}

pub fn eval_conditions(world: &WorldData, ctx: &EvalContext, conditions: &[Condition]) -> bool {
    conditions.iter().all(|c| eval_condition(world, ctx, c))
}
