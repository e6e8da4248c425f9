//! Renders the AST back into the same JSON tuple encoding `parser` accepts,
//! so `inspect`/`edit` can hand a template's interactions back to a caller
//! exactly as they'd re-submit them.

use mash_core::{AmountOperand, Condition, Effect, InteractionRule, PermissionRule, Reference};
use serde_json::{json, Value};

pub fn reference_to_string(r: &Reference) -> String {
    match r {
        Reference::SelfEntity => "self".to_string(),
        Reference::Actor => "actor".to_string(),
        Reference::Subject => "subject".to_string(),
        Reference::Container => "container".to_string(),
        Reference::Carrier => "carrier".to_string(),
        Reference::Tick => "tick".to_string(),
        Reference::Field { head, field } => format!("{}.{}", reference_to_string(head), field),
        Reference::ContentsField { head, template_id, field } => {
            format!("{}.contents.t:{}.{}", reference_to_string(head), template_id, field)
        }
    }
}

pub fn permission_rule_to_json(rule: &PermissionRule) -> Value {
    match rule {
        PermissionRule::Any => json!("any"),
        PermissionRule::None => json!("none"),
        PermissionRule::Owner => json!("owner"),
        PermissionRule::Node => json!("node"),
        PermissionRule::List(members) => json!(["list", members]),
    }
}

fn amount_to_json(amount: &AmountOperand) -> Value {
    match amount {
        AmountOperand::Literal(n) => json!(n),
        AmountOperand::Reference(r) => json!(reference_to_string(r)),
    }
}

pub fn condition_to_json(cond: &Condition) -> Value {
    match cond {
        Condition::Eq { reference, value } => json!(["eq", reference_to_string(reference), value]),
        Condition::Neq { reference, value } => json!(["neq", reference_to_string(reference), value]),
        Condition::Gt { reference, value } => json!(["gt", reference_to_string(reference), value]),
        Condition::Lt { reference, value } => json!(["lt", reference_to_string(reference), value]),
        Condition::Has { reference, template_id } => json!(["has", reference_to_string(reference), template_id]),
        Condition::Not(inner) => json!(["not", condition_to_json(inner)]),
    }
}

pub fn effect_to_json(effect: &Effect) -> Value {
    match effect {
        Effect::Set { reference, value } => json!(["set", reference_to_string(reference), value]),
        Effect::Add { reference, amount } => json!(["add", reference_to_string(reference), amount_to_json(amount)]),
        Effect::Say { text } => json!(["say", text]),
        Effect::Take { template_id, from } => json!(["take", template_id, reference_to_string(from)]),
        Effect::Give { template_id, to } => json!(["give", template_id, reference_to_string(to)]),
        Effect::Move { reference, node_id } => json!(["move", reference_to_string(reference), node_id]),
        Effect::Create { template_id, at } => json!(["create", template_id, reference_to_string(at)]),
        Effect::Destroy { reference } => json!(["destroy", reference_to_string(reference)]),
        Effect::Perm { reference, key, rule } => json!(["perm", reference_to_string(reference), key, rule]),
        Effect::Deny => json!(["deny"]),
        Effect::If { conditions, do_effects, else_effects } => json!([
            "if",
            conditions.iter().map(condition_to_json).collect::<Vec<_>>(),
            do_effects.iter().map(effect_to_json).collect::<Vec<_>>(),
            else_effects.iter().map(effect_to_json).collect::<Vec<_>>(),
        ]),
    }
}

pub fn interaction_rule_to_json(rule: &InteractionRule) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("on".to_string(), json!(rule.on));
    if !rule.if_conditions.is_empty() {
        obj.insert(
            "if".to_string(),
            json!(rule.if_conditions.iter().map(condition_to_json).collect::<Vec<_>>()),
        );
    }
    obj.insert("do".to_string(), json!(rule.do_effects.iter().map(effect_to_json).collect::<Vec<_>>()));
    if !rule.else_effects.is_empty() {
        obj.insert(
            "else".to_string(),
            json!(rule.else_effects.iter().map(effect_to_json).collect::<Vec<_>>()),
        );
    }
    Value::Object(obj)
}

pub fn interactions_to_json(rules: &[InteractionRule]) -> Value {
    json!(rules.iter().map(interaction_rule_to_json).collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_interaction_rule;

    #[test]
    fn round_trips_lock_rule_through_parse_and_print() {
        let original = serde_json::json!({
            "on": "travel",
            "if": [["eq", "self.locked", true]],
            "do": [["say", "locked"], ["deny"]],
        });
        let rule = parse_interaction_rule(&original).unwrap();
        let printed = interaction_rule_to_json(&rule);
        let reparsed = parse_interaction_rule(&printed).unwrap();
        assert_eq!(rule, reparsed);
    }

    #[test]
    fn contents_reference_round_trips() {
        let r = Reference::ContentsField {
            head: Box::new(Reference::Carrier),
            template_id: "abc-123".into(),
            field: "quantity".into(),
        };
        let s = reference_to_string(&r);
        assert_eq!(s, "carrier.contents.t:abc-123.quantity");
        assert_eq!(crate::parser::parse_reference(&s).unwrap(), r);
    }
}
