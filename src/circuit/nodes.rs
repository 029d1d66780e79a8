//! Node table: interning of node names.

use std::collections::HashMap;

use super::types::NodeId;

/// Interns node names into dense [`NodeId`]s.
///
/// Ground is pinned at [`NodeId::GROUND`]; `0` and `gnd` (any letter case)
/// are synonyms for it. All other names are case-sensitive and receive
/// ids in first-seen order, stable for the lifetime of the table.
#[derive(Debug, Clone)]
pub struct NodeTable {
    map: HashMap<String, NodeId>,
    names: Vec<String>,
}

impl NodeTable {
    /// Create a table containing only ground.
    pub fn new() -> Self {
        let mut map = HashMap::new();
        map.insert("0".to_string(), NodeId::GROUND);
        Self {
            map,
            names: vec!["gnd".to_string()],
        }
    }

    /// Normalize ground aliases to the canonical key.
    fn canonical(name: &str) -> &str {
        if name == "0" || name.eq_ignore_ascii_case("gnd") {
            "0"
        } else {
            name
        }
    }

    /// Return the id for `name`, allocating a fresh one if unseen.
    pub fn intern(&mut self, name: &str) -> NodeId {
        let key = Self::canonical(name);
        if let Some(&id) = self.map.get(key) {
            return id;
        }
        let id = NodeId(self.names.len());
        self.map.insert(key.to_string(), id);
        self.names.push(key.to_string());
        id
    }

    /// Look up an existing node by name.
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.map.get(Self::canonical(name)).copied()
    }

    /// Total number of nodes, including ground.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table holds only ground.
    pub fn is_empty(&self) -> bool {
        self.names.len() == 1
    }

    /// The name of a node.
    pub fn name(&self, id: NodeId) -> &str {
        &self.names[id.0]
    }
}

impl Default for NodeTable {
    fn default() -> Self {
        Self::new()
    }
}
