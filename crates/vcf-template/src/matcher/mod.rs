//! Matches a logical form against a compiled [`TemplateLibrary`].
//!
//! Commands are tried in document order, each of a command's roots in order,
//! and the first full success wins. Inside a pattern, roles are conjunctive,
//! rolegroups are ordered alternatives with early exit, and a role that leads
//! to several graph edges is satisfied by the first edge that matches.
//!
//! Matching is a depth-first search with a binding [`Trail`]: every branch
//! takes a mark before it starts and truncates back to it on failure. The
//! library and the graph are only read, so a [`Matcher`] can be shared
//! between threads.

mod report;
mod trail;

pub use report::{CommandTrial, Mismatch, MismatchReason};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, trace};

use vcf_core::graph::LogicalForm;
use vcf_core::id::NodeId;
use vcf_core::node::LfNode;

use crate::error::MatchError;
use crate::model::{
    Filters, PatternId, PatternKind, Role, RoleContent, RoleGroup, TemplateLibrary,
};
use trail::Trail;

/// Resource bounds for one match call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherConfig {
    /// Maximum pattern nesting depth. Default: 64.
    pub max_depth: usize,
    /// Maximum pattern/node trials per utterance. Default: 100 000.
    pub max_steps: usize,
    /// Maximum rolegroup alternatives tried per alternation. Default: no cap.
    pub max_alternatives: Option<usize>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        MatcherConfig {
            max_depth: 64,
            max_steps: 100_000,
            max_alternatives: None,
        }
    }
}

/// A successful match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandMatch {
    pub command: String,
    pub params: IndexMap<String, String>,
    pub groups: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched(CommandMatch),
    NoMatch,
}

impl MatchOutcome {
    pub fn command(&self) -> Option<&CommandMatch> {
        match self {
            MatchOutcome::Matched(command) => Some(command),
            MatchOutcome::NoMatch => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched(_))
    }
}

/// Per-command trace produced by [`Matcher::explain`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    /// Commands in the order they were tried. Trying stops at the first
    /// match.
    pub trials: Vec<CommandTrial>,
    pub outcome: MatchOutcome,
}

/// Matches logical forms against one library.
#[derive(Debug, Clone)]
pub struct Matcher<'l> {
    library: &'l TemplateLibrary,
    config: MatcherConfig,
}

impl<'l> Matcher<'l> {
    pub fn new(library: &'l TemplateLibrary) -> Self {
        Matcher::with_config(library, MatcherConfig::default())
    }

    pub fn with_config(library: &'l TemplateLibrary, config: MatcherConfig) -> Self {
        Matcher { library, config }
    }

    /// Returns the first matching command with its bindings.
    pub fn match_form(&self, lf: &LogicalForm) -> Result<MatchOutcome, MatchError> {
        self.run(lf, false).map(|report| report.outcome)
    }

    /// Like [`match_form`](Self::match_form), but also reports the deepest
    /// mismatch of every command rejected before the outcome was decided.
    pub fn explain(&self, lf: &LogicalForm) -> Result<MatchReport, MatchError> {
        self.run(lf, true)
    }

    fn run(&self, lf: &LogicalForm, explain: bool) -> Result<MatchReport, MatchError> {
        let root = lf.root().ok_or_else(|| MatchError::MalformedGraph {
            reason: "logical form has no root".into(),
        })?;
        if lf.node(root).is_none() {
            return Err(MatchError::MalformedGraph {
                reason: format!("root {} is not in the graph", root),
            });
        }

        let mut search = Search {
            library: self.library,
            lf,
            config: &self.config,
            explain,
            trail: Trail::default(),
            path: Vec::new(),
            steps: 0,
            deepest: None,
        };
        let mut trials = Vec::new();

        for command in self.library.commands() {
            search.deepest = None;
            let mut matched = false;
            for pattern in &command.roots {
                search.trail.clear();
                search.path.clear();
                if search.node(*pattern, root, 0)? {
                    matched = true;
                    break;
                }
            }
            debug!(command = %command.name, matched, steps = search.steps, "command trial");

            if explain {
                trials.push(CommandTrial {
                    command: command.name.clone(),
                    matched,
                    mismatch: if matched { None } else { search.deepest.take() },
                });
            }
            if matched {
                return Ok(MatchReport {
                    trials,
                    outcome: MatchOutcome::Matched(CommandMatch {
                        command: command.name.clone(),
                        params: search.trail.params(),
                        groups: search.trail.groups(),
                    }),
                });
            }
        }

        Ok(MatchReport {
            trials,
            outcome: MatchOutcome::NoMatch,
        })
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

struct Search<'a> {
    library: &'a TemplateLibrary,
    lf: &'a LogicalForm,
    config: &'a MatcherConfig,
    explain: bool,
    trail: Trail,
    /// Graph nodes matched structurally on the way to the current node.
    path: Vec<NodeId>,
    steps: usize,
    deepest: Option<Mismatch>,
}

impl<'a> Search<'a> {
    /// Matches pattern `pid` against graph node `gid`. On failure the trail
    /// is left as it was found.
    fn node(&mut self, pid: PatternId, gid: NodeId, depth: usize) -> Result<bool, MatchError> {
        self.steps += 1;
        if self.steps > self.config.max_steps {
            return Err(MatchError::StepBudgetExhausted {
                limit: self.config.max_steps,
            });
        }
        if depth > self.config.max_depth {
            return Err(MatchError::DepthLimitExceeded {
                limit: self.config.max_depth,
            });
        }

        let library = self.library;
        let lf = self.lf;
        let pattern = library.node(pid);
        let node = lf.node(gid).ok_or_else(|| MatchError::MalformedGraph {
            reason: format!("node {} is not in the graph", gid),
        })?;
        trace!(pattern = %pid, node = %gid, depth, "match step");

        let mark = self.trail.mark();
        let structure = match &pattern.kind {
            PatternKind::Fuzzy => {
                let subtree = lf.subtree_within(gid, &self.path);
                self.trail.touch_all(&subtree);
                let text = lf.surface_text(&subtree);
                self.bind(pid, &text);
                return Ok(true);
            }
            PatternKind::Structural(structure) => structure,
        };

        if let Some(reason) = filter_mismatch(&structure.filters, node) {
            self.record(pid, gid, depth, reason);
            return Ok(false);
        }
        self.trail.touch(gid);
        self.path.push(gid);
        let matched = self.roles(&structure.roles, pid, gid, depth)?
            && self.alternatives(&structure.alternatives, pid, gid, depth)?;
        self.path.pop();
        if !matched {
            self.trail.rollback(mark);
            return Ok(false);
        }

        let value = if pattern.group.is_some() {
            self.trail.text_since(mark, lf)
        } else {
            node.value().unwrap_or_default().to_string()
        };
        self.bind(pid, &value);
        Ok(true)
    }

    fn bind(&mut self, pid: PatternId, value: &str) {
        let pattern = self.library.node(pid);
        if let Some(group) = &pattern.group {
            self.trail.bind_group(group, value);
        }
        for param in &pattern.map_params {
            self.trail.bind_param(param, value);
        }
    }

    /// All roles must match. Callers roll back on failure.
    fn roles(
        &mut self,
        roles: &[Role],
        pid: PatternId,
        gid: NodeId,
        depth: usize,
    ) -> Result<bool, MatchError> {
        for role in roles {
            if !self.role(role, pid, gid, depth)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn role(
        &mut self,
        role: &Role,
        pid: PatternId,
        gid: NodeId,
        depth: usize,
    ) -> Result<bool, MatchError> {
        let targets = self.lf.role_targets(gid, &role.name);
        if targets.is_empty() {
            self.record(
                pid,
                gid,
                depth,
                MismatchReason::MissingRole {
                    role: role.name.clone(),
                },
            );
            return Ok(false);
        }

        match &role.content {
            RoleContent::Component(child) => {
                for target in targets {
                    if self.node(*child, target, depth + 1)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            RoleContent::Literal(expected) => {
                let expected_lower = expected.to_lowercase();
                for target in targets {
                    let carried = self
                        .lf
                        .node(target)
                        .and_then(|node| node.literal.as_deref().or(node.word.as_deref()));
                    if carried.is_some_and(|value| value.to_lowercase() == expected_lower) {
                        self.trail.touch(target);
                        return Ok(true);
                    }
                }
                self.record(
                    pid,
                    gid,
                    depth,
                    MismatchReason::Literal {
                        role: role.name.clone(),
                        expected: expected.clone(),
                    },
                );
                Ok(false)
            }
            RoleContent::Alternatives(groups) => {
                for target in targets {
                    let mark = self.trail.mark();
                    self.trail.touch(target);
                    self.path.push(target);
                    let matched = self.alternatives(groups, pid, target, depth + 1)?;
                    self.path.pop();
                    if matched {
                        return Ok(true);
                    }
                    self.trail.rollback(mark);
                }
                Ok(false)
            }
        }
    }

    /// Exactly one rolegroup must match, tried in order. An empty list is
    /// trivially satisfied.
    fn alternatives(
        &mut self,
        groups: &[RoleGroup],
        pid: PatternId,
        gid: NodeId,
        depth: usize,
    ) -> Result<bool, MatchError> {
        if groups.is_empty() {
            return Ok(true);
        }
        let cap = self.config.max_alternatives.unwrap_or(usize::MAX);
        let mut tried = 0;
        for group in groups.iter().take(cap) {
            tried += 1;
            let mark = self.trail.mark();
            if self.roles(&group.roles, pid, gid, depth)? {
                return Ok(true);
            }
            self.trail.rollback(mark);
        }
        self.record(pid, gid, depth, MismatchReason::NoAlternative { tried });
        Ok(false)
    }

    fn record(&mut self, pattern: PatternId, node: NodeId, depth: usize, reason: MismatchReason) {
        if !self.explain {
            return;
        }
        let deeper = self
            .deepest
            .as_ref()
            .map_or(true, |current| depth > current.depth);
        if deeper {
            self.deepest = Some(Mismatch {
                pattern,
                node,
                depth,
                reason,
            });
        }
    }
}

fn filter_mismatch(filters: &Filters, node: &LfNode) -> Option<MismatchReason> {
    if let Some(expected) = &filters.indicator {
        if node.indicator.as_deref() != Some(expected.as_str()) {
            return Some(MismatchReason::Indicator {
                expected: expected.clone(),
                found: node.indicator.clone(),
            });
        }
    }
    if let Some(expected) = &filters.lf_type {
        if node.lf_type.as_deref() != Some(expected.as_str()) {
            return Some(MismatchReason::Type {
                expected: expected.clone(),
                found: node.lf_type.clone(),
            });
        }
    }
    if let Some(words) = &filters.words {
        let accepted = node.word.as_deref().is_some_and(|word| words.contains(word));
        if !accepted {
            return Some(MismatchReason::Word {
                expected: words.to_string(),
                found: node.word.clone(),
            });
        }
    }
    None
}
