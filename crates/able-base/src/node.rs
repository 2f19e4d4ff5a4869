use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(1);

/// Stable identity of a program-tree node.
///
/// Ids are unique for the lifetime of the process, so they can key diagnostics, origin maps
/// and inference side tables across modules that are checked by different checker instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Placeholder for synthesized nodes that have no source counterpart.
    pub const DUMMY: NodeId = NodeId(0);

    pub fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u32) -> Self {
        NodeId(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn is_dummy(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::NodeId;

    #[test]
    fn fresh_ids_are_distinct_and_never_dummy() {
        let a = NodeId::fresh();
        let b = NodeId::fresh();
        assert_ne!(a, b);
        assert!(!a.is_dummy());
        assert!(NodeId::DUMMY.is_dummy());
    }
}
