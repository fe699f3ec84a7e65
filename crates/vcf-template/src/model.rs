//! The compiled template model.
//!
//! A [`TemplateLibrary`] owns an arena of [`PatternNode`]s addressed by
//! [`PatternId`]. `from_id` references are resolved by the compiler into
//! plain arena indices, so a subtree reused by several commands is a single
//! shared entry and the library is an immutable DAG that can be matched from
//! any number of threads.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Index of a pattern node in its library's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternId(pub u32);

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// An ordered, duplicate-free list of alternatives parsed from a
/// comma-separated attribute (`word="top, upper"`).
///
/// Membership tests ignore case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSet {
    words: Vec<String>,
}

impl WordSet {
    /// Parses a comma-separated list. Every token must be non-empty after
    /// trimming; the returned error is a human-readable reason.
    pub fn parse(list: &str) -> Result<WordSet, String> {
        parse_list(list).map(|words| WordSet { words })
    }

    pub fn contains(&self, word: &str) -> bool {
        let word = word.to_lowercase();
        self.words.iter().any(|w| w.to_lowercase() == word)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl fmt::Display for WordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.words.join(","))
    }
}

/// Splits a comma-separated attribute value into trimmed tokens, dropping
/// exact duplicates and keeping first-seen order.
pub(crate) fn parse_list(list: &str) -> Result<Vec<String>, String> {
    if list.trim().is_empty() {
        return Err("empty list".into());
    }
    let mut tokens: Vec<String> = Vec::new();
    for (position, token) in list.split(',').enumerate() {
        let token = token.trim();
        if token.is_empty() {
            return Err(format!("empty alternative at position {}", position + 1));
        }
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    Ok(tokens)
}

/// Attribute filters of a structural pattern node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub indicator: Option<String>,
    pub lf_type: Option<String>,
    pub words: Option<WordSet>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.indicator.is_none() && self.lf_type.is_none() && self.words.is_none()
    }
}

/// One node of a command's pattern tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternNode {
    /// The `id` this node was declared with, if any.
    pub id: Option<String>,
    /// Output parameters the matched value is bound to.
    pub map_params: Vec<String>,
    /// Capture group the matched text is recorded under.
    pub group: Option<String>,
    pub kind: PatternKind,
}

impl PatternNode {
    /// A node that matches any graph node and binds nothing.
    pub fn wildcard() -> Self {
        PatternNode {
            id: None,
            map_params: Vec::new(),
            group: None,
            kind: PatternKind::Structural(Structure::default()),
        }
    }

    pub fn is_fuzzy(&self) -> bool {
        matches!(self.kind, PatternKind::Fuzzy)
    }

    /// `true` for a structural node with no filters and no roles.
    pub fn is_wildcard(&self) -> bool {
        match &self.kind {
            PatternKind::Fuzzy => false,
            PatternKind::Structural(s) => {
                s.filters.is_empty() && s.roles.is_empty() && s.alternatives.is_empty()
            }
        }
    }
}

/// How a pattern node constrains the graph below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternKind {
    /// Accepts any subtree and captures its full surface text.
    Fuzzy,
    /// Filters this node and recurses through its roles.
    Structural(Structure),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Structure {
    pub filters: Filters,
    /// Roles that must all match.
    pub roles: Vec<Role>,
    /// Rolegroups declared directly under the node; exactly one must match,
    /// tried in document order.
    pub alternatives: Vec<RoleGroup>,
}

/// A named edge constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    pub content: RoleContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleContent {
    /// A nested component matched against the role's target.
    Component(PatternId),
    /// A closed-class value the role's target must carry.
    Literal(String),
    /// Rolegroups matched against the role's target, first success wins.
    Alternatives(Vec<RoleGroup>),
}

/// A set of roles that must all match; one alternative of an alternation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGroup {
    pub roles: Vec<Role>,
}

/// A named command with one or more candidate root patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    /// Candidate roots, tried in document order.
    pub roots: Vec<PatternId>,
}

/// A compiled, immutable set of commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateLibrary {
    nodes: Vec<PatternNode>,
    definitions: IndexMap<String, PatternId>,
    commands: Vec<Command>,
}

impl TemplateLibrary {
    pub(crate) fn from_parts(
        nodes: Vec<PatternNode>,
        definitions: IndexMap<String, PatternId>,
        commands: Vec<Command>,
    ) -> Self {
        TemplateLibrary {
            nodes,
            definitions,
            commands,
        }
    }

    /// Returns the node behind `id`.
    ///
    /// Panics if `id` was not produced by this library.
    pub fn node(&self, id: PatternId) -> &PatternNode {
        &self.nodes[id.0 as usize]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Commands in document order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn command(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|command| command.name == name)
    }

    /// Free-standing named components, keyed by id.
    pub fn definitions(&self) -> &IndexMap<String, PatternId> {
        &self.definitions
    }

    /// Every pattern node reachable from `roots`, each listed once, in
    /// depth-first order.
    pub fn reachable(&self, roots: &[PatternId]) -> Vec<PatternId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<PatternId> = roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            let mut children = Vec::new();
            if let PatternKind::Structural(structure) = &self.node(id).kind {
                collect_children(&structure.roles, &mut children);
                for group in &structure.alternatives {
                    collect_children(&group.roles, &mut children);
                }
            }
            stack.extend(children.into_iter().rev());
        }
        order
    }

    /// Parameter names a command can bind, across all of its roots.
    pub fn signature(&self, command: &Command) -> BTreeSet<String> {
        self.reachable(&command.roots)
            .into_iter()
            .flat_map(|id| self.node(id).map_params.iter().cloned())
            .collect()
    }

    /// `command name -> parameter names`, in command order.
    pub fn signatures(&self) -> IndexMap<String, BTreeSet<String>> {
        self.commands
            .iter()
            .map(|command| (command.name.clone(), self.signature(command)))
            .collect()
    }
}

fn collect_children(roles: &[Role], out: &mut Vec<PatternId>) {
    for role in roles {
        match &role.content {
            RoleContent::Component(id) => out.push(*id),
            RoleContent::Literal(_) => {}
            RoleContent::Alternatives(groups) => {
                for group in groups {
                    collect_children(&group.roles, out);
                }
            }
        }
    }
}
