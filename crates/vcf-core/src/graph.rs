//! LogicalForm: the parsed-utterance graph consumed by the template matcher.
//!
//! [`LogicalForm`] wraps a `StableGraph` of [`LfNode`]s connected by
//! [`RoleEdge`]s, plus the id of the root speech-act node. It is built once
//! by an input adapter (see [`crate::rdf`]) and read-only afterwards.
//!
//! # Traversal order
//!
//! Outgoing role edges are always reported in insertion order, which is the
//! order the parser emitted them. Subtree walks are pre-order and visit each
//! node at most once, so coreference cycles terminate.

use std::collections::HashSet;
use std::fmt;

use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::edge::RoleEdge;
use crate::error::CoreError;
use crate::id::{EdgeId, NodeId};
use crate::node::LfNode;

/// An immutable semantic analysis of one utterance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogicalForm {
    graph: StableGraph<LfNode, RoleEdge, Directed, u32>,
    root: Option<NodeId>,
}

impl LogicalForm {
    /// Creates an empty logical form with no root.
    pub fn new() -> Self {
        LogicalForm::default()
    }

    // -----------------------------------------------------------------------
    // Builder methods
    // -----------------------------------------------------------------------

    /// Adds a node and returns its id. The first node added becomes the root
    /// unless [`set_root`](Self::set_root) says otherwise.
    pub fn add_node(&mut self, node: LfNode) -> NodeId {
        let id = NodeId::from(self.graph.add_node(node));
        if self.root.is_none() {
            self.root = Some(id);
        }
        id
    }

    /// Connects `from` to `to` under `role`.
    pub fn add_role(
        &mut self,
        from: NodeId,
        role: impl Into<String>,
        to: NodeId,
    ) -> Result<EdgeId, CoreError> {
        let role = role.into();
        if role.trim().is_empty() {
            return Err(CoreError::EmptyRoleName { from });
        }
        self.require(from)?;
        self.require(to)?;
        let idx = self
            .graph
            .add_edge(from.into(), to.into(), RoleEdge::new(role));
        Ok(EdgeId::from(idx))
    }

    /// Adds a literal-valued role (`:TENSE PRES`) under `parent`.
    pub fn add_literal(
        &mut self,
        parent: NodeId,
        role: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<NodeId, CoreError> {
        self.require(parent)?;
        let literal = NodeId::from(self.graph.add_node(LfNode::literal(value)));
        self.add_role(parent, role, literal)?;
        Ok(literal)
    }

    /// Marks `id` as the root speech-act node.
    pub fn set_root(&mut self, id: NodeId) -> Result<(), CoreError> {
        self.require(id)?;
        self.root = Some(id);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// The root speech-act node, if any node was ever added.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&LfNode> {
        self.graph.node_weight(NodeIndex::from(id))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All outgoing roles of `id` as `(role, child)` pairs, in insertion
    /// order. Unknown nodes have no roles.
    pub fn roles(&self, id: NodeId) -> Vec<(&str, NodeId)> {
        let idx = NodeIndex::from(id);
        if !self.graph.contains_node(idx) {
            return Vec::new();
        }
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .collect();
        // petgraph walks adjacency lists newest-first.
        edges.sort_by_key(|edge| edge.id());
        edges
            .into_iter()
            .map(|edge| (edge.weight().role.as_str(), NodeId::from(edge.target())))
            .collect()
    }

    /// Children of `id` reached through `role`, in insertion order.
    pub fn role_targets(&self, id: NodeId, role: &str) -> SmallVec<[NodeId; 2]> {
        let idx = NodeIndex::from(id);
        if !self.graph.contains_node(idx) {
            return SmallVec::new();
        }
        let mut edges: SmallVec<[_; 4]> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|edge| edge.weight().is(role))
            .map(|edge| (edge.id(), NodeId::from(edge.target())))
            .collect();
        edges.sort_by_key(|(edge, _)| *edge);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// Pre-order walk of the subtree rooted at `id`. Every reachable node is
    /// listed exactly once.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        self.subtree_within(id, &[])
    }

    /// Like [`subtree`](Self::subtree), but never enters `outside`. Callers
    /// pass the path that led to `id` so coreference edges back to an
    /// ancestor do not pull the ancestor's words in. `id` itself is always
    /// listed first.
    pub fn subtree_within(&self, id: NodeId, outside: &[NodeId]) -> Vec<NodeId> {
        let mut order = Vec::new();
        if self.node(id).is_none() {
            return order;
        }
        let mut seen: HashSet<NodeId> = outside.iter().copied().filter(|n| *n != id).collect();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            order.push(next);
            // Reverse so the first role is visited first.
            for (_, child) in self.roles(next).into_iter().rev() {
                if !seen.contains(&child) {
                    stack.push(child);
                }
            }
        }
        order
    }

    /// Joins the surface words of `nodes` with single spaces.
    ///
    /// Nodes without a word are skipped and repeated nodes contribute once.
    /// When every contributing node carries a span, words come out in
    /// utterance order; otherwise the order of `nodes` is kept.
    pub fn surface_text(&self, nodes: &[NodeId]) -> String {
        let mut seen = HashSet::new();
        let mut words: Vec<&LfNode> = nodes
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| self.node(*id))
            .filter(|node| node.word.is_some())
            .collect();
        if words.iter().all(|node| node.span.is_some()) {
            words.sort_by_key(|node| node.span.map(|span| span.start));
        }
        words
            .iter()
            .filter_map(|node| node.word.as_deref())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Surface text of the whole subtree rooted at `id`.
    pub fn subtree_text(&self, id: NodeId) -> String {
        self.surface_text(&self.subtree(id))
    }

    fn require(&self, id: NodeId) -> Result<(), CoreError> {
        if self.graph.contains_node(id.into()) {
            Ok(())
        } else {
            Err(CoreError::NodeNotFound { id })
        }
    }

    fn fmt_node(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: NodeId,
        depth: usize,
        seen: &mut HashSet<NodeId>,
    ) -> fmt::Result {
        let Some(node) = self.node(id) else {
            return write!(f, "<missing {}>", id);
        };
        if !seen.insert(id) {
            // Already printed: coreference back-edge.
            return match &node.var {
                Some(var) => write!(f, "#{}", var),
                None => write!(f, "#{}", id),
            };
        }
        write!(f, "{}", node)?;
        for (role, child) in self.roles(id) {
            write!(f, "\n{:indent$}:{} ", "", role, indent = (depth + 1) * 2)?;
            self.fmt_node(f, child, depth + 1, seen)?;
        }
        Ok(())
    }
}

/// Indented tree rendering, one role per line.
impl fmt::Display for LogicalForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            Some(root) => self.fmt_node(f, root, 0, &mut HashSet::new()),
            None => write!(f, "(empty)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// "show me puppies": SA_REQUEST -CONTENT-> SHOW -AGENT-> you, -NEUTRAL-> puppies
    fn show_puppies() -> (LogicalForm, NodeId, NodeId, NodeId) {
        let mut lf = LogicalForm::new();
        let sa = lf.add_node(LfNode::new("SPEECHACT", "SA_REQUEST"));
        let show = lf.add_node(LfNode::new("F", "SHOW").with_word("show"));
        let you = lf.add_node(LfNode::new("PRO", "PERSON").with_word("you"));
        let pups = lf.add_node(LfNode::new("BARE", "DOG").with_word("puppies"));
        lf.add_role(sa, "CONTENT", show).unwrap();
        lf.add_role(show, "AGENT", you).unwrap();
        lf.add_role(show, "NEUTRAL", pups).unwrap();
        (lf, sa, show, pups)
    }

    #[test]
    fn first_node_becomes_root() {
        let (lf, sa, _, _) = show_puppies();
        assert_eq!(lf.root(), Some(sa));
        assert_eq!(lf.node_count(), 4);
    }

    #[test]
    fn set_root_overrides_default() {
        let (mut lf, _, show, _) = show_puppies();
        lf.set_root(show).unwrap();
        assert_eq!(lf.root(), Some(show));
    }

    #[test]
    fn set_root_rejects_unknown_node() {
        let mut lf = LogicalForm::new();
        match lf.set_root(NodeId(3)) {
            Err(CoreError::NodeNotFound { id }) => assert_eq!(id, NodeId(3)),
            other => panic!("expected NodeNotFound, got {:?}", other),
        }
    }

    #[test]
    fn add_role_rejects_empty_name() {
        let mut lf = LogicalForm::new();
        let a = lf.add_node(LfNode::new("F", "A"));
        let b = lf.add_node(LfNode::new("F", "B"));
        assert!(matches!(
            lf.add_role(a, "  ", b),
            Err(CoreError::EmptyRoleName { .. })
        ));
    }

    #[test]
    fn roles_are_reported_in_insertion_order() {
        let (lf, _, show, _) = show_puppies();
        let roles: Vec<&str> = lf.roles(show).into_iter().map(|(r, _)| r).collect();
        assert_eq!(roles, vec!["AGENT", "NEUTRAL"]);
    }

    #[test]
    fn role_targets_fan_out_in_order() {
        let mut lf = LogicalForm::new();
        let and = lf.add_node(LfNode::new("F", "AND"));
        let cats = lf.add_node(LfNode::new("BARE", "CAT").with_word("cats"));
        let dogs = lf.add_node(LfNode::new("BARE", "DOG").with_word("dogs"));
        lf.add_role(and, "SEQUENCE", cats).unwrap();
        lf.add_role(and, "sequence", dogs).unwrap();

        let targets = lf.role_targets(and, "SEQUENCE");
        assert_eq!(targets.as_slice(), &[cats, dogs]);
        assert!(lf.role_targets(and, "MOD").is_empty());
        assert!(lf.role_targets(NodeId(77), "SEQUENCE").is_empty());
    }

    #[test]
    fn literal_roles_are_child_nodes() {
        let (mut lf, _, show, _) = show_puppies();
        let tense = lf.add_literal(show, "TENSE", "PRES").unwrap();
        assert!(lf.node(tense).unwrap().is_literal());
        assert_eq!(lf.role_targets(show, "TENSE").as_slice(), &[tense]);
    }

    #[test]
    fn subtree_is_preorder() {
        let (lf, sa, show, pups) = show_puppies();
        let order = lf.subtree(sa);
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], sa);
        assert_eq!(order[1], show);
        assert_eq!(order[3], pups);
    }

    #[test]
    fn subtree_terminates_on_coreference_cycle() {
        let (mut lf, sa, show, pups) = show_puppies();
        lf.add_role(pups, "COREF", show).unwrap();
        lf.add_role(pups, "BACK", sa).unwrap();
        assert_eq!(lf.subtree(sa).len(), 4);
        assert_eq!(lf.subtree_text(show), "show you puppies");
    }

    #[test]
    fn subtree_within_stops_at_the_ancestor_path() {
        let (mut lf, sa, show, pups) = show_puppies();
        lf.add_role(pups, "COREF", show).unwrap();
        assert_eq!(lf.subtree(pups), vec![pups, show, lf.role_targets(show, "AGENT")[0]]);
        assert_eq!(lf.subtree_within(pups, &[sa, show]), vec![pups]);
        assert_eq!(lf.surface_text(&lf.subtree_within(pups, &[sa, show])), "puppies");
        // The start node is listed even when it sits on the path.
        assert_eq!(lf.subtree_within(show, &[sa, show]).first(), Some(&show));
    }

    #[test]
    fn surface_text_uses_spans_when_complete() {
        let mut lf = LogicalForm::new();
        let park = lf.add_node(LfNode::new("THE", "PARK").with_word("park").with_span(10, 14));
        let the = lf.add_node(LfNode::new("DET", "THE").with_word("the").with_span(6, 9));
        lf.add_role(park, "SPEC", the).unwrap();
        assert_eq!(lf.subtree_text(park), "the park");
    }

    #[test]
    fn surface_text_falls_back_to_traversal_order() {
        let mut lf = LogicalForm::new();
        let park = lf.add_node(LfNode::new("THE", "PARK").with_word("park").with_span(10, 14));
        let the = lf.add_node(LfNode::new("DET", "THE").with_word("the"));
        lf.add_role(park, "SPEC", the).unwrap();
        assert_eq!(lf.subtree_text(park), "park the");
    }

    #[test]
    fn surface_text_skips_wordless_and_repeated_nodes() {
        let (mut lf, sa, _, pups) = show_puppies();
        lf.add_literal(pups, "TENSE", "PRES").unwrap();
        assert_eq!(lf.surface_text(&[sa, pups, pups]), "puppies");
    }

    #[test]
    fn display_renders_indented_tree() {
        let (lf, _, _, _) = show_puppies();
        let text = lf.to_string();
        let expected = "(SPEECHACT SA_REQUEST)\n  :CONTENT (F SHOW show)\n    :AGENT (PRO PERSON you)\n    :NEUTRAL (BARE DOG puppies)";
        assert_eq!(text, expected);
    }

    #[test]
    fn display_marks_back_references() {
        let (mut lf, sa, _, pups) = show_puppies();
        lf.add_role(pups, "COREF", sa).unwrap();
        assert!(lf.to_string().ends_with(":COREF #0"));
    }

    #[test]
    fn serde_roundtrip_logical_form() {
        let (lf, sa, show, _) = show_puppies();
        let json = serde_json::to_string(&lf).unwrap();
        let back: LogicalForm = serde_json::from_str(&json).unwrap();
        assert_eq!(back.root(), Some(sa));
        assert_eq!(back.node_count(), lf.node_count());
        assert_eq!(back.roles(show), lf.roles(show));
        assert_eq!(back.subtree_text(sa), lf.subtree_text(sa));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn subtree_visits_each_reachable_node_once(
                n in 1usize..12,
                edges in prop::collection::vec((0usize..12, 0usize..12), 0..30),
            ) {
                let mut lf = LogicalForm::new();
                let ids: Vec<NodeId> = (0..n)
                    .map(|i| lf.add_node(LfNode::new("F", format!("T{}", i)).with_word(format!("w{}", i))))
                    .collect();
                for (a, b) in edges {
                    lf.add_role(ids[a % n], "ARG", ids[b % n]).unwrap();
                }

                let order = lf.subtree(ids[0]);
                let unique: HashSet<NodeId> = order.iter().copied().collect();
                prop_assert_eq!(unique.len(), order.len());
                prop_assert_eq!(order[0], ids[0]);
                prop_assert_eq!(lf.subtree_text(ids[0]).split(' ').count(), order.len());
            }
        }
    }
}
