//! MASH Store - Entity Store
//!
//! Typed access to agents, templates, instances, the action queue, events,
//! link-usage records, and world state. The store serialises writes
//! behind a single mutex so the tick engine observes one globally ordered
//! mutation stream; reads outside the tick see the state as of the last
//! committed transaction.
//!
//! Modelled as a concrete type rather than a trait object: the durable
//! store is conceptually an opaque transactional table store, not
//! something that needs to be swapped out at runtime.
//! `WorldStore::transaction` is the one choke point every mutation —
//! queued action handlers, DSL effects, the tick engine — goes through.

mod world;

pub use world::{ContainerKey, WorldData, WorldStore};
