/*
    node.rs - Data types of the node store

    Defines:
    - Node identifiers and timestamps
    - Property values (single and multi-valued)
    - The plain node record kept by store implementations
*/

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Bookkeeping property stamped on every node at creation: creation time
///
/// Namespaced with `:`, which escaped member ids never contain.
pub const P_CREATED: &str = "gs:created";

/// Bookkeeping property stamped on every node at creation: creating user
pub const P_CREATED_BY: &str = "gs:createdBy";

/// Type tag of unstructured container nodes
pub const NT_UNSTRUCTURED: &str = "nt:unstructured";

/// Unix timestamp in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Create a timestamp representing the current time
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_millis() as u64)
    }

    /// Get milliseconds since epoch
    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of a node
///
/// Weak references store this identifier and nothing else, so a reference
/// survives neither a rename nor a move of the target, only its deletion.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn generate() -> Self {
        use uuid::Uuid;
        NodeId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single property value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Long(i64),
    Date(Timestamp),
    /// Non-owning pointer to a node by identifier; may dangle
    WeakReference(NodeId),
}

impl Value {
    /// The referenced node, if this is a weak reference
    pub fn as_weak_reference(&self) -> Option<&NodeId> {
        match self {
            Value::WeakReference(id) => Some(id),
            _ => None,
        }
    }
}

/// Value of a property: one value or an ordered list of values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyValue {
    Single(Value),
    Multiple(Vec<Value>),
}

impl PropertyValue {
    /// All values of the property, in order
    pub fn values(&self) -> Vec<Value> {
        match self {
            PropertyValue::Single(v) => vec![v.clone()],
            PropertyValue::Multiple(vs) => vs.clone(),
        }
    }

    /// The value of a single-valued property
    pub fn single(&self) -> Option<&Value> {
        match self {
            PropertyValue::Single(v) => Some(v),
            PropertyValue::Multiple(_) => None,
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, PropertyValue::Multiple(_))
    }

    /// True if any value is a weak reference to `target`
    pub fn references(&self, target: &NodeId) -> bool {
        match self {
            PropertyValue::Single(v) => v.as_weak_reference() == Some(target),
            PropertyValue::Multiple(vs) => vs.iter().any(|v| v.as_weak_reference() == Some(target)),
        }
    }
}

/// Plain record of one node as held by a store implementation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    pub id: NodeId,
    pub name: String,
    pub node_type: String,
    pub parent: Option<NodeId>,
    pub properties: BTreeMap<String, PropertyValue>,
    pub children: BTreeMap<String, NodeId>,
}

impl NodeData {
    pub fn new(id: NodeId, name: String, node_type: String, parent: Option<NodeId>) -> Self {
        NodeData {
            id,
            name,
            node_type,
            parent,
            properties: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }
}

/// Check that `name` can be used as a node or property name
///
/// Names must be non-empty and free of the path separator and of control
/// characters. Callers that build names from arbitrary input escape them
/// first.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.chars().any(|c| c == '/' || c.is_control())
}
