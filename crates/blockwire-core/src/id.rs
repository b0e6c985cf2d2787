use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use uuid::Uuid;

new_key_type! {
    /// Identifies a live block node inside a circuit.
    pub struct NodeId;

    /// Identifies a reactive value cell.
    pub struct CellId;

    /// Identifies a single subscription on a cell.
    pub struct SubscriptionId;
}

/// Stable identity of a placed block. Survives save/load, unlike [`NodeId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockUuid(pub Uuid);

impl BlockUuid {
    /// Generate a fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BlockUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BlockUuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Handle to the game object owned by the world collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectRef(pub u64);

/// Names one output connector on one block.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    pub block: BlockUuid,
    pub name: String,
}

impl OutputRef {
    pub fn new(block: BlockUuid, name: impl Into<String>) -> Self {
        Self {
            block,
            name: name.into(),
        }
    }
}

/// Names one input connector on one block.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InputRef {
    pub block: BlockUuid,
    pub name: String,
}

impl InputRef {
    pub fn new(block: BlockUuid, name: impl Into<String>) -> Self {
        Self {
            block,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for OutputRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.block, self.name)
    }
}

impl std::fmt::Display for InputRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.block, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_uuids_are_unique() {
        let a = BlockUuid::new();
        let b = BlockUuid::new();
        assert_ne!(a, b);
    }

    #[test]
    fn block_uuid_serializes_as_plain_string() {
        let id = BlockUuid(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }

    #[test]
    fn connector_refs_order_by_block_then_name() {
        let block = BlockUuid(Uuid::nil());
        let a = InputRef::new(block, "value1");
        let b = InputRef::new(block, "value2");
        assert!(a < b);
        assert_eq!(a.to_string(), format!("{block}.value1"));
    }
}
