/*
    core_store - Hierarchical node store

    The persisted-entity store the membership core runs against:
    - NodeStore trait: the capability the rest of the crate consumes
    - MemoryNodeStore: in-process implementation with pending/saved views
    - RevertScope: scoped revert of a subtree on failure
*/

pub mod errors;
pub mod memory_store;
pub mod node;
pub mod scope;
pub mod store;

pub use errors::{StoreError, StoreResult};
pub use memory_store::MemoryNodeStore;
pub use node::{NodeData, NodeId, PropertyValue, Timestamp, Value, P_CREATED, P_CREATED_BY};
pub use scope::RevertScope;
pub use store::{NodeStore, SubtreeSnapshot};
