//! Node arena.
//!
//! Nodes are stored flat, keyed by `Uuid`. Element attributes reference
//! other nodes by id, so a graph can contain shared children and cycles
//! (a child pointing back at its parent) without any ownership loops.
//! [`NodeRef`] is the borrowed view the serializer walks.

use std::collections::HashMap;

use serde::Deserialize;
use uuid::Uuid;

use super::attrs::Attrs;
use super::keys::A_NAME;

/// Graph node: identity + attributes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Node {
    #[serde(rename = "id", default = "Uuid::new_v4")]
    uuid: Uuid,
    #[serde(rename = "attributes", default)]
    pub attrs: Attrs,
}

impl Node {
    /// Empty node with a fresh id.
    pub fn new() -> Self {
        Self::with_uuid(Uuid::new_v4())
    }

    pub fn with_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            attrs: Attrs::new(),
        }
    }

    pub fn from_attrs(attrs: Attrs) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            attrs,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

/// Flat node storage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Vec<Node>")]
pub struct Graph {
    nodes: HashMap<Uuid, Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, replacing any node with the same id. Returns the id.
    pub fn insert(&mut self, node: Node) -> Uuid {
        let uuid = node.uuid;
        self.nodes.insert(uuid, node);
        uuid
    }

    /// Insert a new node built from `attrs`. Returns its fresh id.
    pub fn add(&mut self, attrs: Attrs) -> Uuid {
        self.insert(Node::from_attrs(attrs))
    }

    pub fn get(&self, uuid: Uuid) -> Option<&Node> {
        self.nodes.get(&uuid)
    }

    pub fn get_mut(&mut self, uuid: Uuid) -> Option<&mut Node> {
        self.nodes.get_mut(&uuid)
    }

    /// Borrowed view of a node, for traversal.
    pub fn node_ref(&self, uuid: Uuid) -> Option<NodeRef<'_>> {
        self.nodes.get(&uuid).map(|node| NodeRef { graph: self, node })
    }

    pub fn contains(&self, uuid: Uuid) -> bool {
        self.nodes.contains_key(&uuid)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl TryFrom<Vec<Node>> for Graph {
    type Error = String;

    fn try_from(nodes: Vec<Node>) -> Result<Self, Self::Error> {
        let mut graph = Graph::new();
        for node in nodes {
            if graph.contains(node.uuid) {
                return Err(format!("duplicate node id {}", node.uuid));
            }
            graph.insert(node);
        }
        Ok(graph)
    }
}

/// A node together with the graph it lives in.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    graph: &'a Graph,
    node: &'a Node,
}

impl<'a> NodeRef<'a> {
    pub fn uuid(&self) -> Uuid {
        self.node.uuid
    }

    pub fn attrs(&self) -> &'a Attrs {
        &self.node.attrs
    }

    pub fn graph(&self) -> &'a Graph {
        self.graph
    }

    /// `name` attribute, if the node has one
    pub fn name(&self) -> Option<&'a str> {
        self.node.attrs.get_str(A_NAME)
    }

    /// Look up another node of the same graph.
    pub fn resolve(&self, uuid: Uuid) -> Option<NodeRef<'a>> {
        self.graph.node_ref(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::attrs::AttrValue;

    #[test]
    fn test_insert_and_resolve() {
        let mut graph = Graph::new();
        let child = graph.add(Attrs::new().with(A_NAME, AttrValue::Str("child".into())));
        let root = graph.add(
            Attrs::new()
                .with(A_NAME, AttrValue::Str("root".into()))
                .with("child", AttrValue::Element(Some(child))),
        );

        let root_ref = graph.node_ref(root).unwrap();
        assert_eq!(root_ref.name(), Some("root"));
        let target = root_ref.attrs().get_element("child").unwrap();
        assert_eq!(root_ref.resolve(target).unwrap().name(), Some("child"));
        assert!(root_ref.resolve(Uuid::new_v4()).is_none());
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_cycles_are_representable() {
        let mut graph = Graph::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut na = Node::with_uuid(a);
        na.attrs.set("next", AttrValue::Element(Some(b)));
        let mut nb = Node::with_uuid(b);
        nb.attrs.set("next", AttrValue::Element(Some(a)));
        graph.insert(na);
        graph.insert(nb);

        let start = graph.node_ref(a).unwrap();
        let hop = start.resolve(start.attrs().get_element("next").unwrap()).unwrap();
        let back = hop.resolve(hop.attrs().get_element("next").unwrap()).unwrap();
        assert_eq!(back.uuid(), a);
    }

    #[test]
    fn test_graph_from_json() {
        let raw = r#"[
            {"id": "6f1c2a4e-0000-4000-8000-000000000001",
             "attributes": [{"name": "name", "type": "string", "value": "shot"}]},
            {"attributes": []}
        ]"#;
        let graph: Graph = serde_json::from_str(raw).unwrap();
        assert_eq!(graph.len(), 2);
        let id = Uuid::parse_str("6f1c2a4e-0000-4000-8000-000000000001").unwrap();
        assert_eq!(graph.node_ref(id).unwrap().name(), Some("shot"));
    }

    #[test]
    fn test_graph_rejects_duplicate_ids() {
        let raw = r#"[
            {"id": "6f1c2a4e-0000-4000-8000-000000000001", "attributes": []},
            {"id": "6f1c2a4e-0000-4000-8000-000000000001", "attributes": []}
        ]"#;
        let err = serde_json::from_str::<Graph>(raw).unwrap_err();
        assert!(err.to_string().contains("duplicate node id"));
    }
}
