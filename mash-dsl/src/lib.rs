//! MASH Interaction DSL - JSON Encoding
//!
//! Parses the untyped JSON tuples the Interaction DSL is authored in
//! (references as dotted strings, conditions/effects as tagged arrays) into
//! `mash_core`'s AST, rejecting unknown ops and keys at the boundary rather
//! than deferring to evaluation time, and prints that AST back to the same
//! shape. Evaluating the AST against
//! live world state is `mash-engine::dsl`'s job, not this crate's — this
//! crate never touches a store.

mod error;
mod parser;
mod pretty_printer;

pub use error::{DslError, DslResult};
pub use parser::{
    parse_amount_operand, parse_condition, parse_conditions, parse_effect, parse_effects,
    parse_interaction_rule, parse_interactions, parse_permission_rule, parse_reference,
};
pub use pretty_printer::{
    condition_to_json, effect_to_json, interaction_rule_to_json, interactions_to_json,
    permission_rule_to_json, reference_to_string,
};
