//! Abstract syntax for the Interaction DSL.
//!
//! These are pure data shapes — parsing raw JSON tuples into them lives in
//! `mash-dsl`; evaluating them against live world state lives in
//! `mash-engine::dsl`. Kept here because a `Template` (a core entity) embeds
//! an ordered list of `InteractionRule`.

use serde::{Deserialize, Serialize};

/// A dotted reference into world state, e.g. `self.fields.locked` or
/// `self.contents.t:TID.count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reference {
    /// `self` — the instance this interaction fired on.
    SelfEntity,
    /// `actor` — the agent invoking the verb (absent for `tick`).
    Actor,
    /// `subject` — the secondary entity of the verb, if any.
    Subject,
    /// `container` — `self`'s direct container.
    Container,
    /// `carrier` — the agent at the top of `self`'s container chain.
    Carrier,
    /// `tick` — seconds-since-UTC-midnight scalar.
    Tick,
    /// `<head>.id` / `.username` / `.short_description` / `.long_description`.
    Field { head: Box<Reference>, field: String },
    /// `self.contents.t:TID.FIELD` or `carrier.contents.t:TID.FIELD`.
    ContentsField { head: Box<Reference>, template_id: String, field: String },
}

/// A boolean condition evaluated against resolved references and literals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Eq { reference: Reference, value: serde_json::Value },
    Neq { reference: Reference, value: serde_json::Value },
    Gt { reference: Reference, value: serde_json::Value },
    Lt { reference: Reference, value: serde_json::Value },
    Has { reference: Reference, template_id: String },
    Not(Box<Condition>),
}

/// A single effect, as one of the DSL's primitive ops, or a nested
/// conditional block mirroring a rule's `if`/`do`/`else` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    Set { reference: Reference, value: serde_json::Value },
    Add { reference: Reference, amount: AmountOperand },
    Say { text: String },
    Take { template_id: String, from: Reference },
    Give { template_id: String, to: Reference },
    Move { reference: Reference, node_id: String },
    Create { template_id: String, at: Reference },
    Destroy { reference: Reference },
    Perm { reference: Reference, key: String, rule: serde_json::Value },
    Deny,
    If { conditions: Vec<Condition>, do_effects: Vec<Effect>, else_effects: Vec<Effect> },
}

/// The right-hand operand of `add`: a literal number, or a reference whose
/// resolved scalar is itself added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AmountOperand {
    Literal(f64),
    Reference(Reference),
}

/// `{on, if?, do, else?}` — one interaction rule in a template's ordered list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRule {
    pub on: String,
    pub if_conditions: Vec<Condition>,
    pub do_effects: Vec<Effect>,
    pub else_effects: Vec<Effect>,
}
