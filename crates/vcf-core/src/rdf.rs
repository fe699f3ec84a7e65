//! Adapter from TRIPS RDF/XML parser output to a [`LogicalForm`].
//!
//! The parser emits one `rdf:Description` per term:
//!
//! ```xml
//! <rdf:Description rdf:ID="V1">
//!   <LF:indicator>SPEECHACT</LF:indicator>
//!   <LF:type>SA_REQUEST</LF:type>
//!   <role:CONTENT rdf:resource="#V2"/>
//! </rdf:Description>
//! ```
//!
//! `role:*` children either reference another description or carry a literal
//! value (`<role:TENSE>PRES</role:TENSE>`). The first description is the root
//! speech act. Descriptions are read in two passes: nodes first, then role
//! edges, so forward references are allowed.

use indexmap::IndexMap;

use crate::error::CoreError;
use crate::graph::LogicalForm;
use crate::id::NodeId;
use crate::node::LfNode;
use crate::xml::Element;

const DESCRIPTION: &str = "rdf:Description";
const ID_ATTR: &str = "rdf:ID";
const RESOURCE_ATTR: &str = "rdf:resource";
const ROLE_PREFIX: &str = "role";

/// Parses TRIPS RDF/XML into a logical form.
pub fn parse_rdf(src: &str) -> Result<LogicalForm, CoreError> {
    let root = Element::parse(src)?;
    from_rdf_element(&root)
}

/// Builds a logical form from an already-read RDF document.
pub fn from_rdf_element(root: &Element) -> Result<LogicalForm, CoreError> {
    let descriptions = if root.name == DESCRIPTION {
        vec![root]
    } else {
        root.descendants(DESCRIPTION)
    };
    if descriptions.is_empty() {
        return Err(CoreError::InvalidLogicalForm {
            reason: "no rdf:Description elements".into(),
        });
    }

    let mut lf = LogicalForm::new();
    let mut ids: IndexMap<&str, NodeId> = IndexMap::new();

    // Pass 1: one node per description.
    for description in &descriptions {
        let var = description
            .attr(ID_ATTR)
            .ok_or_else(|| CoreError::InvalidLogicalForm {
                reason: "rdf:Description without rdf:ID".into(),
            })?;
        if ids.contains_key(var) {
            return Err(CoreError::InvalidLogicalForm {
                reason: format!("duplicate rdf:ID '{}'", var),
            });
        }
        let node = read_node(description, var)?;
        let id = lf.add_node(node);
        ids.insert(var, id);
    }

    // Pass 2: role edges, in document order.
    for (description, (&var, &from)) in descriptions.iter().zip(ids.iter()) {
        for child in description.elements() {
            if child.prefix() != Some(ROLE_PREFIX) {
                continue;
            }
            let role = child.local_name();
            match child.attr(RESOURCE_ATTR) {
                Some(resource) => {
                    let target = resource.trim_start_matches('#');
                    let to = ids.get(target).copied().ok_or_else(|| {
                        CoreError::DanglingResource {
                            from: var.to_string(),
                            role: role.to_string(),
                            target: target.to_string(),
                        }
                    })?;
                    lf.add_role(from, role, to)?;
                }
                None => {
                    lf.add_literal(from, role, child.text())?;
                }
            }
        }
    }

    Ok(lf)
}

fn read_node(description: &Element, var: &str) -> Result<LfNode, CoreError> {
    let mut node = LfNode::default().with_var(var);
    let mut start = None;
    let mut end = None;
    for child in description.elements() {
        if child.prefix() == Some(ROLE_PREFIX) {
            continue;
        }
        let text = child.text();
        match child.local_name() {
            "indicator" => node.indicator = Some(text),
            "type" => node.lf_type = Some(text),
            "word" => node.word = Some(text),
            "start" => start = Some(parse_offset(var, "start", &text)?),
            "end" => end = Some(parse_offset(var, "end", &text)?),
            // Parser extras (sense, input text, ...) are not used for matching.
            _ => {}
        }
    }
    if let (Some(start), Some(end)) = (start, end) {
        node = node.with_span(start, end);
    }
    Ok(node)
}

fn parse_offset(var: &str, field: &str, text: &str) -> Result<u32, CoreError> {
    text.parse().map_err(|_| CoreError::InvalidLogicalForm {
        reason: format!("{} of '{}' is not an offset: '{}'", field, var, text),
    })
}
