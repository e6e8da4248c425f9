//! Evaluation of the Interaction DSL against live world state. `mash-dsl`
//! owns the syntax (parsing the JSON tuples); this module owns semantics —
//! reference resolution, condition/effect evaluation, and `fire`.

pub mod condition;
pub mod context;
pub mod effect;
pub mod fire;
pub mod reference;

pub use context::{EntityRef, EvalContext, EvalState};
pub use fire::fire;
