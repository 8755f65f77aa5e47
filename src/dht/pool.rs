use super::node::NodeId;
use std::collections::HashSet;

/// Node ids that have already been sent a `find_node`.
#[derive(Debug, Default)]
pub struct NodePool {
    seen: HashSet<NodeId>,
}

impl NodePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `id` as contacted. Returns `false` if it already was.
    pub fn insert(&mut self, id: NodeId) -> bool {
        self.seen.insert(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
