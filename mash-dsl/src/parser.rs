//! Parses the Interaction DSL's untyped JSON encoding into
//! `mash_core`'s AST: references are dotted strings, conditions and effects
//! are tagged tuples (`["op", ...]`), and an interaction rule is a JSON
//! object with `on`/`if`/`do`/`else` keys.

use crate::error::{DslError, DslResult};
use mash_core::{AmountOperand, Condition, Effect, InteractionRule, PermissionRule, Reference};
use serde_json::Value;

/// Parse a dotted reference string, e.g. `self.fields.locked`,
/// `carrier.contents.t:abc-123.quantity`, or the bare head `tick`.
pub fn parse_reference(s: &str) -> DslResult<Reference> {
    let parts: Vec<&str> = s.split('.').collect();
    let Some(&head_tok) = parts.first() else {
        return Err(DslError::EmptyReference(s.to_string()));
    };
    let head = match head_tok {
        "self" => Reference::SelfEntity,
        "actor" => Reference::Actor,
        "subject" => Reference::Subject,
        "container" => Reference::Container,
        "carrier" => Reference::Carrier,
        "tick" => Reference::Tick,
        other => return Err(DslError::UnknownHead(other.to_string(), s.to_string())),
    };

    if parts.len() == 1 {
        return Ok(head);
    }

    if parts.len() >= 3 && parts[1] == "contents" {
        let Some(template_id) = parts[2].strip_prefix("t:") else {
            return Err(DslError::MalformedReference(
                s.to_string(),
                "contents reference must name a template as 't:TEMPLATE_ID'",
            ));
        };
        let field = parts[3..].join(".");
        if field.is_empty() {
            return Err(DslError::MalformedReference(
                s.to_string(),
                "contents reference is missing its field",
            ));
        }
        return Ok(Reference::ContentsField {
            head: Box::new(head),
            template_id: template_id.to_string(),
            field,
        });
    }

    Ok(Reference::Field { head: Box::new(head), field: parts[1..].join(".") })
}

fn as_ref_str<'a>(v: &'a Value, what: &str) -> DslResult<&'a str> {
    v.as_str().ok_or_else(|| DslError::TypeMismatch { what: what.to_string(), expected: "string" })
}

fn tuple_parts<'a>(v: &'a Value) -> DslResult<&'a Vec<Value>> {
    v.as_array().ok_or_else(|| DslError::TypeMismatch {
        what: "tuple".to_string(),
        expected: "array",
    })
}

/// Parse `"any" | "none" | "owner" | "node" | ["list", [username, ...]]`.
pub fn parse_permission_rule(v: &Value) -> DslResult<PermissionRule> {
    if let Some(s) = v.as_str() {
        return match s {
            "any" => Ok(PermissionRule::Any),
            "none" => Ok(PermissionRule::None),
            "owner" => Ok(PermissionRule::Owner),
            "node" => Ok(PermissionRule::Node),
            other => Err(DslError::UnknownOp(other.to_string())),
        };
    }
    let parts = tuple_parts(v)?;
    let op = parts.first().map(|v| as_ref_str(v, "permission rule op")).transpose()?.ok_or(DslError::EmptyTuple)?;
    if op != "list" {
        return Err(DslError::UnknownOp(op.to_string()));
    }
    let members = parts.get(1).and_then(|v| v.as_array()).ok_or(DslError::MissingField("list members"))?;
    let usernames = members
        .iter()
        .map(|m| as_ref_str(m, "list member").map(str::to_string))
        .collect::<DslResult<Vec<String>>>()?;
    Ok(PermissionRule::List(usernames))
}

/// Parse `n` as either a numeric literal or a reference string, per the
/// `add` effect's "n may itself be a reference" clause.
pub fn parse_amount_operand(v: &Value) -> DslResult<AmountOperand> {
    if let Some(n) = v.as_f64() {
        return Ok(AmountOperand::Literal(n));
    }
    if let Some(s) = v.as_str() {
        return Ok(AmountOperand::Reference(parse_reference(s)?));
    }
    Err(DslError::TypeMismatch { what: "amount".to_string(), expected: "number or reference string" })
}

pub fn parse_condition(v: &Value) -> DslResult<Condition> {
    let parts = tuple_parts(v)?;
    let op = parts.first().map(|v| as_ref_str(v, "condition op")).transpose()?.ok_or(DslError::EmptyTuple)?;
    match op {
        "eq" | "neq" | "gt" | "lt" => {
            let reference = parse_reference(as_ref_str(
                parts.get(1).ok_or(DslError::MissingField("reference"))?,
                "condition reference",
            )?)?;
            let value = parts.get(2).ok_or(DslError::MissingField("value"))?.clone();
            Ok(match op {
                "eq" => Condition::Eq { reference, value },
                "neq" => Condition::Neq { reference, value },
                "gt" => Condition::Gt { reference, value },
                "lt" => Condition::Lt { reference, value },
                _ => unreachable!(),
            })
        }
        "has" => {
            let reference = parse_reference(as_ref_str(
                parts.get(1).ok_or(DslError::MissingField("reference"))?,
                "has reference",
            )?)?;
            let template_id = as_ref_str(
                parts.get(2).ok_or(DslError::MissingField("template_id"))?,
                "has template_id",
            )?
            .to_string();
            Ok(Condition::Has { reference, template_id })
        }
        "not" => {
            let inner = parts.get(1).ok_or(DslError::MissingField("condition"))?;
            Ok(Condition::Not(Box::new(parse_condition(inner)?)))
        }
        other => Err(DslError::UnknownOp(other.to_string())),
    }
}

pub fn parse_conditions(v: &Value) -> DslResult<Vec<Condition>> {
    let Some(arr) = v.as_array() else {
        return Err(DslError::TypeMismatch { what: "condition list".to_string(), expected: "array" });
    };
    arr.iter().map(parse_condition).collect()
}

pub fn parse_effect(v: &Value) -> DslResult<Effect> {
    let parts = tuple_parts(v)?;
    let op = parts.first().map(|v| as_ref_str(v, "effect op")).transpose()?.ok_or(DslError::EmptyTuple)?;
    match op {
        "set" => {
            let reference = parse_reference(as_ref_str(
                parts.get(1).ok_or(DslError::MissingField("reference"))?,
                "set reference",
            )?)?;
            let value = parts.get(2).ok_or(DslError::MissingField("value"))?.clone();
            Ok(Effect::Set { reference, value })
        }
        "add" => {
            let reference = parse_reference(as_ref_str(
                parts.get(1).ok_or(DslError::MissingField("reference"))?,
                "add reference",
            )?)?;
            let amount = parse_amount_operand(parts.get(2).ok_or(DslError::MissingField("amount"))?)?;
            Ok(Effect::Add { reference, amount })
        }
        "say" => {
            let text = as_ref_str(parts.get(1).ok_or(DslError::MissingField("text"))?, "say text")?.to_string();
            Ok(Effect::Say { text })
        }
        "take" => {
            let template_id =
                as_ref_str(parts.get(1).ok_or(DslError::MissingField("template_id"))?, "take template_id")?
                    .to_string();
            let from = parse_reference(as_ref_str(
                parts.get(2).ok_or(DslError::MissingField("from"))?,
                "take from",
            )?)?;
            Ok(Effect::Take { template_id, from })
        }
        "give" => {
            let template_id =
                as_ref_str(parts.get(1).ok_or(DslError::MissingField("template_id"))?, "give template_id")?
                    .to_string();
            let to = parse_reference(as_ref_str(
                parts.get(2).ok_or(DslError::MissingField("to"))?,
                "give to",
            )?)?;
            Ok(Effect::Give { template_id, to })
        }
        "move" => {
            let reference = parse_reference(as_ref_str(
                parts.get(1).ok_or(DslError::MissingField("reference"))?,
                "move reference",
            )?)?;
            let node_id =
                as_ref_str(parts.get(2).ok_or(DslError::MissingField("node_id"))?, "move node_id")?.to_string();
            Ok(Effect::Move { reference, node_id })
        }
        "create" => {
            let template_id = as_ref_str(
                parts.get(1).ok_or(DslError::MissingField("template_id"))?,
                "create template_id",
            )?
            .to_string();
            let at = parse_reference(as_ref_str(parts.get(2).ok_or(DslError::MissingField("at"))?, "create at")?)?;
            Ok(Effect::Create { template_id, at })
        }
        "destroy" => {
            let reference = parse_reference(as_ref_str(
                parts.get(1).ok_or(DslError::MissingField("reference"))?,
                "destroy reference",
            )?)?;
            Ok(Effect::Destroy { reference })
        }
        "perm" => {
            let reference = parse_reference(as_ref_str(
                parts.get(1).ok_or(DslError::MissingField("reference"))?,
                "perm reference",
            )?)?;
            let key =
                as_ref_str(parts.get(2).ok_or(DslError::MissingField("key"))?, "perm key")?.to_string();
            let rule = parts.get(3).ok_or(DslError::MissingField("rule"))?.clone();
            Ok(Effect::Perm { reference, key, rule })
        }
        "deny" => Ok(Effect::Deny),
        "if" => {
            let conditions = parse_conditions(parts.get(1).ok_or(DslError::MissingField("conditions"))?)?;
            let do_effects = parse_effects(parts.get(2).ok_or(DslError::MissingField("do"))?)?;
            let else_effects = match parts.get(3) {
                Some(v) => parse_effects(v)?,
                None => Vec::new(),
            };
            Ok(Effect::If { conditions, do_effects, else_effects })
        }
        other => Err(DslError::UnknownOp(other.to_string())),
    }
}

pub fn parse_effects(v: &Value) -> DslResult<Vec<Effect>> {
    let Some(arr) = v.as_array() else {
        return Err(DslError::TypeMismatch { what: "effect list".to_string(), expected: "array" });
    };
    arr.iter().map(parse_effect).collect()
}

/// Parse one `{"on": ..., "if": [...], "do": [...], "else": [...]}` rule.
pub fn parse_interaction_rule(v: &Value) -> DslResult<InteractionRule> {
    let obj = v.as_object().ok_or_else(|| DslError::TypeMismatch {
        what: "interaction rule".to_string(),
        expected: "object",
    })?;
    let on = obj
        .get("on")
        .and_then(|v| v.as_str())
        .ok_or(DslError::MissingField("on"))?
        .to_string();
    let if_conditions = match obj.get("if") {
        Some(v) => parse_conditions(v)?,
        None => Vec::new(),
    };
    let do_effects = parse_effects(obj.get("do").ok_or(DslError::MissingField("do"))?)?;
    let else_effects = match obj.get("else") {
        Some(v) => parse_effects(v)?,
        None => Vec::new(),
    };
    Ok(InteractionRule { on, if_conditions, do_effects, else_effects })
}

/// Parse an entire template's `interactions` array.
pub fn parse_interactions(v: &Value) -> DslResult<Vec<InteractionRule>> {
    let Some(arr) = v.as_array() else {
        return Err(DslError::TypeMismatch { what: "interactions".to_string(), expected: "array" });
    };
    arr.iter().map(parse_interaction_rule).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_and_field_references() {
        assert_eq!(parse_reference("self").unwrap(), Reference::SelfEntity);
        assert_eq!(
            parse_reference("self.locked").unwrap(),
            Reference::Field { head: Box::new(Reference::SelfEntity), field: "locked".into() }
        );
        assert_eq!(
            parse_reference("tick.count").unwrap(),
            Reference::Field { head: Box::new(Reference::Tick), field: "count".into() }
        );
    }

    #[test]
    fn parses_contents_reference() {
        let r = parse_reference("carrier.contents.t:abc-123.quantity").unwrap();
        assert_eq!(
            r,
            Reference::ContentsField {
                head: Box::new(Reference::Carrier),
                template_id: "abc-123".into(),
                field: "quantity".into(),
            }
        );
    }

    #[test]
    fn rejects_unknown_head() {
        assert!(matches!(parse_reference("ghost.field"), Err(DslError::UnknownHead(_, _))));
    }

    #[test]
    fn parses_deny_effect_tuple() {
        let v = serde_json::json!(["deny"]);
        assert_eq!(parse_effect(&v).unwrap(), Effect::Deny);
    }

    #[test]
    fn parses_full_lock_rule() {
        let v = serde_json::json!({
            "on": "travel",
            "if": [["eq", "self.locked", true]],
            "do": [["say", "locked"], ["deny"]],
        });
        let rule = parse_interaction_rule(&v).unwrap();
        assert_eq!(rule.on, "travel");
        assert_eq!(rule.if_conditions.len(), 1);
        assert_eq!(rule.do_effects.len(), 2);
        assert!(rule.else_effects.is_empty());
        assert_eq!(rule.do_effects[1], Effect::Deny);
    }

    #[test]
    fn parses_list_permission_rule() {
        let v = serde_json::json!(["list", ["alice", "bob"]]);
        assert_eq!(
            parse_permission_rule(&v).unwrap(),
            PermissionRule::List(vec!["alice".into(), "bob".into()])
        );
    }

    #[test]
    fn amount_operand_accepts_literal_or_reference() {
        assert_eq!(parse_amount_operand(&serde_json::json!(3.0)).unwrap(), AmountOperand::Literal(3.0));
        assert!(matches!(
            parse_amount_operand(&serde_json::json!("self.count")).unwrap(),
            AmountOperand::Reference(_)
        ));
    }
}
