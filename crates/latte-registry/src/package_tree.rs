//! Package tree - hierarchical index of registered classes.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: `PackageData` (simple class names declared directly in the package)
//! - Edges: `Contains(name)` from a package to each sub-package

use latte_core::ClassHash;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;

/// Edge types in the package graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageEdge {
    /// Parent package contains child package. The String is the child's
    /// simple name.
    Contains(String),
}

#[derive(Debug, Default, Clone)]
pub struct PackageData {
    /// Classes declared directly in this package, by simple name.
    pub classes: FxHashMap<String, ClassHash>,
}

#[derive(Clone)]
pub struct PackageTree {
    graph: DiGraph<PackageData, PackageEdge>,
    /// The default (unnamed) package.
    root: NodeIndex,
}

impl Default for PackageTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageTree {
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(PackageData::default());
        Self { graph, root }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn find_child(&self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        self.graph
            .edges(parent)
            .find(|edge| matches!(edge.weight(), PackageEdge::Contains(child) if child == name))
            .map(|edge| edge.target())
    }

    pub fn get_or_create_child(&mut self, parent: NodeIndex, name: &str) -> NodeIndex {
        if let Some(child) = self.find_child(parent, name) {
            return child;
        }
        let child = self.graph.add_node(PackageData::default());
        self.graph.add_edge(parent, child, PackageEdge::Contains(name.to_string()));
        child
    }

    pub fn get_or_create_path<S: AsRef<str>>(&mut self, path: &[S]) -> NodeIndex {
        path.iter()
            .fold(self.root, |node, segment| self.get_or_create_child(node, segment.as_ref()))
    }

    /// An existing package, or `None`.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeIndex> {
        let mut current = self.root;
        for segment in path {
            current = self.find_child(current, segment.as_ref())?;
        }
        Some(current)
    }

    pub fn find_parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .next()
            .map(|edge| edge.source())
    }

    /// Segments of a package from the root, e.g. `["java", "util"]`.
    pub fn package_path(&self, node: NodeIndex) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = node;
        while let Some(edge) = self.graph.edges_directed(current, Direction::Incoming).next() {
            let PackageEdge::Contains(name) = edge.weight();
            path.push(name.clone());
            current = edge.source();
        }
        path.reverse();
        path
    }

    /// Record `simple` in `package`. Returns `false` if it was already there.
    pub fn insert_class<S: AsRef<str>>(&mut self, package: &[S], simple: &str, hash: ClassHash) -> bool {
        let node = self.get_or_create_path(package);
        let classes = &mut self.graph[node].classes;
        if classes.contains_key(simple) {
            return false;
        }
        classes.insert(simple.to_string(), hash);
        true
    }

    pub fn class_in<S: AsRef<str>>(&self, package: &[S], simple: &str) -> Option<ClassHash> {
        let node = self.get_path(package)?;
        self.graph[node].classes.get(simple).copied()
    }

    pub fn has_package<S: AsRef<str>>(&self, path: &[S]) -> bool {
        self.get_path(path).is_some()
    }

    /// Simple names of the classes declared directly in `package`.
    pub fn classes_in<S: AsRef<str>>(&self, package: &[S]) -> Vec<&str> {
        let Some(node) = self.get_path(package) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = self.graph[node].classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn package_count(&self) -> usize {
        self.graph.node_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latte_core::QualifiedName;

    fn hash(name: &str) -> ClassHash {
        QualifiedName::parse(name).class_hash()
    }

    #[test]
    fn nested_packages() {
        let mut tree = PackageTree::new();
        assert!(tree.insert_class(&["java", "util"], "List", hash("java.util.List")));
        assert!(tree.insert_class(&["java", "util", "function"], "Supplier", hash("java.util.function.Supplier")));

        let util = tree.get_path(&["java", "util"]).unwrap();
        assert_eq!(tree.package_path(util), vec!["java", "util"]);
        assert_eq!(tree.find_parent(util), tree.get_path(&["java"]));
        assert!(tree.has_package(&["java"]));
        assert!(!tree.has_package(&["javax"]));
        assert_eq!(tree.classes_in(&["java", "util"]), vec!["List"]);
        assert_eq!(tree.package_count(), 4);
    }

    #[test]
    fn duplicate_class_is_rejected() {
        let mut tree = PackageTree::new();
        let empty: [&str; 0] = [];
        assert!(tree.insert_class(&empty, "Main", hash("Main")));
        assert!(!tree.insert_class(&empty, "Main", hash("Main")));
        assert_eq!(tree.class_in(&empty, "Main"), Some(hash("Main")));
        assert_eq!(tree.package_path(tree.root()), Vec::<String>::new());
    }
}
