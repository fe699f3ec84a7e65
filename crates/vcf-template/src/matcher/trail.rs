//! Binding trail with mark/rollback.
//!
//! Every binding and every graph node a pattern consumes is appended here.
//! A failed branch truncates the trail back to the [`Mark`] taken before it,
//! so partial bindings from abandoned alternatives never leak into a result.

use indexmap::IndexMap;

use vcf_core::graph::LogicalForm;
use vcf_core::id::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mark {
    params: usize,
    groups: usize,
    touched: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Trail {
    params: Vec<(String, String)>,
    groups: Vec<(String, String)>,
    touched: Vec<NodeId>,
}

impl Trail {
    pub(crate) fn mark(&self) -> Mark {
        Mark {
            params: self.params.len(),
            groups: self.groups.len(),
            touched: self.touched.len(),
        }
    }

    pub(crate) fn rollback(&mut self, mark: Mark) {
        self.params.truncate(mark.params);
        self.groups.truncate(mark.groups);
        self.touched.truncate(mark.touched);
    }

    pub(crate) fn clear(&mut self) {
        self.params.clear();
        self.groups.clear();
        self.touched.clear();
    }

    pub(crate) fn touch(&mut self, node: NodeId) {
        self.touched.push(node);
    }

    pub(crate) fn touch_all(&mut self, nodes: &[NodeId]) {
        self.touched.extend_from_slice(nodes);
    }

    pub(crate) fn bind_param(&mut self, name: &str, value: &str) {
        self.params.push((name.to_string(), value.to_string()));
    }

    pub(crate) fn bind_group(&mut self, name: &str, value: &str) {
        self.groups.push((name.to_string(), value.to_string()));
    }

    /// Surface text of the nodes consumed since `mark`.
    pub(crate) fn text_since(&self, mark: Mark, lf: &LogicalForm) -> String {
        lf.surface_text(&self.touched[mark.touched..])
    }

    /// Parameter bindings; a name bound twice keeps its last value.
    pub(crate) fn params(&self) -> IndexMap<String, String> {
        collapse(&self.params)
    }

    pub(crate) fn groups(&self) -> IndexMap<String, String> {
        collapse(&self.groups)
    }
}

fn collapse(bindings: &[(String, String)]) -> IndexMap<String, String> {
    let mut map = IndexMap::with_capacity(bindings.len());
    for (name, value) in bindings {
        map.insert(name.clone(), value.clone());
    }
    map
}
