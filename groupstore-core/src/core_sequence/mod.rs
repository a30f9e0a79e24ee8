/*
    core_sequence - Ordered sequence store

    A sorted string-keyed map persisted as a balanced subtree of nodes,
    with configurable minimum and maximum fan-out.
*/

pub mod btree;

pub use btree::BTreeSequence;
