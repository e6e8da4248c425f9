//! MASH Core - World Entity Types
//!
//! Pure data structures with no behavior. Every other crate in the workspace
//! depends on this one. This crate contains ONLY data types - no storage, no
//! permission resolution, no DSL evaluation, no HTTP.

mod config;
mod dsl_types;
mod entities;
mod enums;
mod error;
mod identity;
mod value;

pub use config::*;
pub use dsl_types::*;
pub use entities::*;
pub use enums::*;
pub use error::*;
pub use identity::*;
pub use value::*;
