//! Template compiler: XML sources in, immutable [`TemplateLibrary`] out.
//!
//! Compilation runs in three passes over the read element trees:
//!
//! 1. **Collect**: check the `<commands>` envelope of every source, gather
//!    free-standing definitions and commands, reject duplicate command names.
//! 2. **Index**: build one identifier table of every `id`-bearing component
//!    across all sources (ids are shared between the files of one set).
//! 3. **Lower**: turn components into arena nodes, definitions first, then
//!    commands, both in document order. `from_id` references resolve through
//!    a memo table so a reused component becomes one shared arena entry.
//!
//! Warnings are collected alongside the library and logged at `warn` level.
//! The compiler performs no I/O; callers hand it source text.

pub mod diagnostics;
pub(crate) mod params;

pub use diagnostics::{TemplateWarning, WarningKind};

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::{info, warn};

use vcf_core::error::CoreError;
use vcf_core::xml::Element;

use crate::error::TemplateError;
use crate::model::{
    parse_list, Command, Filters, PatternId, PatternKind, PatternNode, Role, RoleContent,
    RoleGroup, Structure, TemplateLibrary, WordSet,
};

const COMMANDS: &str = "commands";
const COMMAND: &str = "command";
const COMPONENT: &str = "component";
const ROLE: &str = "role";
const ROLEGROUP: &str = "rolegroup";

const COMPONENT_ATTRIBUTES: &[&str] = &[
    "id",
    "from_id",
    "indicator",
    "type",
    "word",
    "map_param",
    "group",
    "fuzzy",
];

/// Name given to the source of [`compile`].
pub const DEFAULT_SOURCE: &str = "<input>";

/// Output of a successful compilation.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub library: TemplateLibrary,
    pub warnings: Vec<TemplateWarning>,
}

/// Compiles a single template document.
pub fn compile(src: &str) -> Result<Compiled, TemplateError> {
    let mut compiler = TemplateCompiler::new();
    compiler.add_source(DEFAULT_SOURCE, src);
    compiler.compile()
}

/// Collects named template sources and compiles them as one set.
#[derive(Debug, Clone, Default)]
pub struct TemplateCompiler {
    sources: Vec<(String, String)>,
}

impl TemplateCompiler {
    pub fn new() -> Self {
        TemplateCompiler::default()
    }

    /// Adds a source. `name` is only used in diagnostics.
    pub fn add_source(&mut self, name: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.sources.push((name.into(), text.into()));
        self
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Compiles every added source into one library.
    pub fn compile(&self) -> Result<Compiled, TemplateError> {
        let mut documents = Vec::with_capacity(self.sources.len());
        for (name, text) in &self.sources {
            let root = Element::parse(text).map_err(|err| syntax_from_core(name, err))?;
            documents.push(Document {
                file: name.as_str(),
                root,
            });
        }

        let mut warnings = Vec::new();
        let collected = collect(&documents, &mut warnings)?;
        let ids = index(&documents)?;

        let mut lowering = Lowering {
            ids,
            nodes: Vec::new(),
            resolved: HashMap::new(),
            in_progress: Vec::new(),
            warnings,
        };

        let mut definitions = IndexMap::new();
        for site in &collected.definitions {
            let id = lowering.component(*site)?;
            if let Some(name) = site.element.attr("id") {
                definitions.insert(name.trim().to_string(), id);
            }
        }

        let mut commands = Vec::new();
        for command in &collected.commands {
            let mut roots = Vec::new();
            for root in &command.roots {
                roots.push(lowering.component(*root)?);
            }
            commands.push(Command {
                name: command.name.to_string(),
                roots,
            });
        }

        let Lowering {
            nodes,
            mut warnings,
            ..
        } = lowering;
        let library = TemplateLibrary::from_parts(nodes, definitions, commands);

        let used: HashSet<PatternId> = library
            .commands()
            .iter()
            .flat_map(|command| library.reachable(&command.roots))
            .collect();
        for site in &collected.definitions {
            let name = site.element.attr("id").unwrap_or_default().trim();
            let unused = library
                .definitions()
                .get(name)
                .is_some_and(|id| !used.contains(id));
            if unused {
                warnings.push(TemplateWarning::new(
                    WarningKind::UnusedDefinition,
                    site.file,
                    site.element.position,
                    format!("definition '{}' is not used by any command", name),
                ));
            }
        }

        for (command, site) in library.commands().iter().zip(&collected.commands) {
            for param in params::conflicting_params(&library, command) {
                warnings.push(TemplateWarning::new(
                    WarningKind::ConflictingParam,
                    site.file,
                    site.position,
                    format!(
                        "map_param '{}' can be bound twice in command '{}'; the last binding wins",
                        param, command.name
                    ),
                ));
            }
        }

        for warning in &warnings {
            warn!(rule = warning.kind.rule(), "{}", warning);
        }
        info!(
            sources = self.sources.len(),
            commands = library.commands().len(),
            definitions = library.definitions().len(),
            nodes = library.node_count(),
            warnings = warnings.len(),
            "compiled template library"
        );

        Ok(Compiled { library, warnings })
    }
}

// ---------------------------------------------------------------------------
// Pass 1: envelope
// ---------------------------------------------------------------------------

struct Document<'s> {
    file: &'s str,
    root: Element,
}

/// A component element and the source it came from.
#[derive(Clone, Copy)]
struct Site<'a> {
    file: &'a str,
    element: &'a Element,
}

struct CommandSite<'a> {
    file: &'a str,
    position: u64,
    name: &'a str,
    roots: Vec<Site<'a>>,
}

struct Collected<'a> {
    definitions: Vec<Site<'a>>,
    commands: Vec<CommandSite<'a>>,
}

fn collect<'a>(
    documents: &'a [Document<'_>],
    warnings: &mut Vec<TemplateWarning>,
) -> Result<Collected<'a>, TemplateError> {
    let mut collected = Collected {
        definitions: Vec::new(),
        commands: Vec::new(),
    };
    let mut names: HashSet<&str> = HashSet::new();

    for document in documents {
        let file = document.file;
        let root = &document.root;
        if root.name != COMMANDS {
            return Err(syntax(
                file,
                root.position,
                format!("expected <{}> root element, found <{}>", COMMANDS, root.name),
            ));
        }
        reject_text(file, root)?;
        warn_unknown_attributes(file, root, &[], warnings);

        for element in root.elements() {
            match element.name.as_str() {
                COMPONENT => {
                    if element.attr("from_id").is_some() || element.attr("id").is_none() {
                        return Err(invalid(
                            file,
                            element,
                            "id",
                            "a free-standing component must declare an id",
                        ));
                    }
                    collected.definitions.push(Site { file, element });
                }
                COMMAND => {
                    let name = element.attr("name").map(str::trim).ok_or_else(|| {
                        syntax(file, element.position, "<command> without a name")
                    })?;
                    if name.is_empty() {
                        return Err(invalid(file, element, "name", "command name is empty"));
                    }
                    if !names.insert(name) {
                        return Err(TemplateError::DuplicateCommand {
                            file: file.to_string(),
                            position: element.position,
                            name: name.to_string(),
                        });
                    }
                    warn_unknown_attributes(file, element, &["name"], warnings);
                    reject_text(file, element)?;

                    let mut roots = Vec::new();
                    for child in element.elements() {
                        if child.name != COMPONENT {
                            return Err(unexpected(file, child, COMMAND));
                        }
                        roots.push(Site {
                            file,
                            element: child,
                        });
                    }
                    if roots.is_empty() {
                        return Err(invalid(
                            file,
                            element,
                            "content",
                            "command has no root component",
                        ));
                    }
                    collected.commands.push(CommandSite {
                        file,
                        position: element.position,
                        name,
                        roots,
                    });
                }
                _ => return Err(unexpected(file, element, COMMANDS)),
            }
        }
    }
    Ok(collected)
}

// ---------------------------------------------------------------------------
// Pass 2: identifier table
// ---------------------------------------------------------------------------

fn index<'a>(documents: &'a [Document<'_>]) -> Result<IndexMap<&'a str, Site<'a>>, TemplateError> {
    let mut ids: IndexMap<&'a str, Site<'a>> = IndexMap::new();
    for document in documents {
        for element in document.root.descendants(COMPONENT) {
            let Some(id) = element.attr("id") else {
                continue;
            };
            let id = id.trim();
            if id.is_empty() {
                return Err(invalid(document.file, element, "id", "id is empty"));
            }
            if ids.contains_key(id) {
                return Err(TemplateError::DuplicateIdentifier {
                    file: document.file.to_string(),
                    position: element.position,
                    id: id.to_string(),
                });
            }
            ids.insert(
                id,
                Site {
                    file: document.file,
                    element,
                },
            );
        }
    }
    Ok(ids)
}

// ---------------------------------------------------------------------------
// Pass 3: lowering
// ---------------------------------------------------------------------------

struct Lowering<'a> {
    ids: IndexMap<&'a str, Site<'a>>,
    nodes: Vec<PatternNode>,
    resolved: HashMap<&'a str, PatternId>,
    /// Ids currently being lowered, outermost first.
    in_progress: Vec<&'a str>,
    warnings: Vec<TemplateWarning>,
}

impl<'a> Lowering<'a> {
    /// Lowers a `component` element, following `from_id` and sharing every
    /// id-bearing component.
    fn component(&mut self, site: Site<'a>) -> Result<PatternId, TemplateError> {
        let element = site.element;
        if let Some(target) = element.attr("from_id") {
            if element.attributes.len() > 1 || !element.children.is_empty() {
                return Err(invalid(
                    site.file,
                    element,
                    "from_id",
                    "a from_id reference cannot carry other attributes or content",
                ));
            }
            return self.resolve(site, target.trim());
        }
        match element.attr("id") {
            Some(id) => self.resolve(site, id.trim()),
            None => self.lower(site),
        }
    }

    fn resolve(&mut self, from: Site<'a>, id: &str) -> Result<PatternId, TemplateError> {
        if let Some(&resolved) = self.resolved.get(id) {
            return Ok(resolved);
        }
        let (&key, &target) = self.ids.get_key_value(id).ok_or_else(|| {
            TemplateError::UnresolvedReference {
                file: from.file.to_string(),
                position: from.element.position,
                id: id.to_string(),
            }
        })?;
        if let Some(start) = self.in_progress.iter().position(|open| *open == key) {
            let mut chain: Vec<String> = self.in_progress[start..]
                .iter()
                .map(|open| open.to_string())
                .collect();
            chain.push(key.to_string());
            return Err(TemplateError::CyclicReference { chain });
        }

        self.in_progress.push(key);
        let lowered = self.lower(target);
        self.in_progress.pop();
        let lowered = lowered?;
        self.resolved.insert(key, lowered);
        Ok(lowered)
    }

    /// Lowers the body of a component. Children are allocated before their
    /// parent.
    fn lower(&mut self, site: Site<'a>) -> Result<PatternId, TemplateError> {
        let Site { file, element } = site;
        reject_text(file, element)?;
        warn_unknown_attributes(file, element, COMPONENT_ATTRIBUTES, &mut self.warnings);

        let id = element.attr("id").map(|id| id.trim().to_string());
        let filters = Filters {
            indicator: non_empty(file, element, "indicator")?,
            lf_type: non_empty(file, element, "type")?,
            words: match element.attr("word") {
                Some(list) => Some(
                    WordSet::parse(list).map_err(|reason| invalid(file, element, "word", reason))?,
                ),
                None => None,
            },
        };
        let map_params = match element.attr("map_param") {
            Some(list) => parse_list(list).map_err(|reason| invalid(file, element, "map_param", reason))?,
            None => Vec::new(),
        };
        let group = non_empty(file, element, "group")?;
        let fuzzy = match element.attr("fuzzy").map(str::trim) {
            None | Some("False") | Some("false") => false,
            Some("True") | Some("true") => true,
            Some(other) => {
                return Err(invalid(
                    file,
                    element,
                    "fuzzy",
                    format!("expected True or False, found '{}'", other),
                ))
            }
        };

        let mut roles = Vec::new();
        let mut groups = Vec::new();
        for child in element.elements() {
            match child.name.as_str() {
                ROLE => roles.push(child),
                ROLEGROUP => groups.push(child),
                _ => return Err(unexpected(file, child, COMPONENT)),
            }
        }

        let kind = if fuzzy {
            if !roles.is_empty() || !groups.is_empty() {
                self.warnings.push(TemplateWarning::new(
                    WarningKind::FuzzyStructureIgnored,
                    file,
                    element.position,
                    "roles and rolegroups under a fuzzy component are ignored",
                ));
            }
            if !filters.is_empty() {
                self.warnings.push(TemplateWarning::new(
                    WarningKind::FuzzyFilterIgnored,
                    file,
                    element.position,
                    "indicator, type and word filters on a fuzzy component are ignored",
                ));
            }
            PatternKind::Fuzzy
        } else {
            let mut lowered_roles = Vec::with_capacity(roles.len());
            for role in roles {
                lowered_roles.push(self.role(file, role)?);
            }
            let mut alternatives = Vec::with_capacity(groups.len());
            for group in groups {
                alternatives.push(self.rolegroup(file, group)?);
            }
            PatternKind::Structural(Structure {
                filters,
                roles: lowered_roles,
                alternatives,
            })
        };

        let pattern = PatternId(self.nodes.len() as u32);
        self.nodes.push(PatternNode {
            id,
            map_params,
            group,
            kind,
        });
        Ok(pattern)
    }

    fn role(&mut self, file: &'a str, element: &'a Element) -> Result<Role, TemplateError> {
        let name = element
            .attr("name")
            .map(str::trim)
            .ok_or_else(|| syntax(file, element.position, "<role> without a name"))?;
        if name.is_empty() {
            return Err(invalid(file, element, "name", "role name is empty"));
        }
        warn_unknown_attributes(file, element, &["name"], &mut self.warnings);

        let mut components = Vec::new();
        let mut groups = Vec::new();
        for child in element.elements() {
            match child.name.as_str() {
                COMPONENT => components.push(child),
                ROLEGROUP => groups.push(child),
                _ => return Err(unexpected(file, child, ROLE)),
            }
        }
        let has_text = element.has_text();

        let content = match (components.as_slice(), groups.is_empty(), has_text) {
            ([component], true, false) => RoleContent::Component(self.component(Site {
                file,
                element: *component,
            })?),
            ([], true, true) => RoleContent::Literal(element.text()),
            ([], false, false) => {
                let mut alternatives = Vec::with_capacity(groups.len());
                for group in groups {
                    alternatives.push(self.rolegroup(file, group)?);
                }
                RoleContent::Alternatives(alternatives)
            }
            ([], true, false) => {
                return Err(invalid(file, element, "content", "role has no content"));
            }
            _ => {
                return Err(invalid(
                    file,
                    element,
                    "content",
                    "role content must be one component, a literal, or rolegroups",
                ));
            }
        };
        Ok(Role {
            name: name.to_string(),
            content,
        })
    }

    fn rolegroup(&mut self, file: &'a str, element: &'a Element) -> Result<RoleGroup, TemplateError> {
        reject_text(file, element)?;
        warn_unknown_attributes(file, element, &[], &mut self.warnings);
        let mut roles = Vec::new();
        for child in element.elements() {
            if child.name != ROLE {
                return Err(unexpected(file, child, ROLEGROUP));
            }
            roles.push(self.role(file, child)?);
        }
        if roles.is_empty() {
            return Err(invalid(file, element, "content", "rolegroup has no roles"));
        }
        Ok(RoleGroup { roles })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn syntax(file: &str, position: u64, message: impl Into<String>) -> TemplateError {
    TemplateError::Syntax {
        file: file.to_string(),
        position,
        message: message.into(),
    }
}

fn syntax_from_core(file: &str, err: CoreError) -> TemplateError {
    match err {
        CoreError::Xml { position, message } => syntax(file, position, message),
        other => syntax(file, 0, other.to_string()),
    }
}

fn invalid(
    file: &str,
    element: &Element,
    attribute: &str,
    reason: impl Into<String>,
) -> TemplateError {
    TemplateError::InvalidAttribute {
        file: file.to_string(),
        position: element.position,
        element: element.name.clone(),
        attribute: attribute.to_string(),
        reason: reason.into(),
    }
}

fn unexpected(file: &str, element: &Element, parent: &str) -> TemplateError {
    syntax(
        file,
        element.position,
        format!("unexpected <{}> inside <{}>", element.name, parent),
    )
}

fn reject_text(file: &str, element: &Element) -> Result<(), TemplateError> {
    if element.has_text() {
        return Err(syntax(
            file,
            element.position,
            format!("unexpected text inside <{}>", element.name),
        ));
    }
    Ok(())
}

fn non_empty(file: &str, element: &Element, attribute: &str) -> Result<Option<String>, TemplateError> {
    match element.attr(attribute) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => {
            Err(invalid(file, element, attribute, "value is empty"))
        }
        Some(value) => Ok(Some(value.trim().to_string())),
    }
}

fn warn_unknown_attributes(
    file: &str,
    element: &Element,
    known: &[&str],
    warnings: &mut Vec<TemplateWarning>,
) {
    for (key, _) in &element.attributes {
        // Namespace declarations are part of XML, not of the template.
        if key == "xmlns" || key.starts_with("xmlns:") || known.contains(&key.as_str()) {
            continue;
        }
        warnings.push(TemplateWarning::new(
            WarningKind::UnknownAttribute,
            file,
            element.position,
            format!("unknown attribute '{}' on <{}>", key, element.name),
        ));
    }
}
