//! Node identifiers for circuit graphs.

use std::fmt;

/// Unique identifier for a circuit node.
///
/// Before topology analysis a `NodeId` names an editor-assigned junction
/// (pins sharing a junction are directly joined). The node registry
/// merges junctions connected by wire-equivalent elements and renumbers
/// the survivors into a dense `0..N` range with ground at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The ground node (node 0).
    pub const GROUND: NodeId = NodeId(0);

    /// Create a new NodeId from a raw value.
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Get the raw node ID value.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Check if this is the ground node.
    pub fn is_ground(self) -> bool {
        self.0 == 0
    }

    /// Matrix row/column index for this node.
    ///
    /// Ground carries no unknown and maps to `None`; node `n` maps to
    /// row `n - 1`.
    pub fn index(self) -> Option<usize> {
        if self.is_ground() {
            None
        } else {
            Some((self.0 - 1) as usize)
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ground() {
            write!(f, "GND")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
