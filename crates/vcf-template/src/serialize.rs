//! Writes a compiled library back out as template XML.
//!
//! Definitions come first, then commands, both in document order. An
//! id-bearing node is written in full the first time it is visited and as a
//! `from_id` reference afterwards; definitions are only ever written in full
//! at the top level. Within a component, roles precede rolegroups, which is
//! also the order the compiler allocates them in, so compiling the output
//! yields a library equal to the input.

use std::collections::HashSet;
use std::fmt::Write as _;

use quick_xml::escape::escape;

use crate::model::{PatternId, PatternKind, Role, RoleContent, RoleGroup, TemplateLibrary};

const INDENT: &str = "  ";

impl TemplateLibrary {
    /// Renders the library as a `<commands>` document.
    pub fn to_xml(&self) -> String {
        let mut writer = Writer {
            library: self,
            definitions: self.definitions().values().copied().collect(),
            written: HashSet::new(),
            out: String::new(),
        };
        writer.out.push_str("<commands>\n");
        for id in self.definitions().values() {
            writer.component(*id, 1, false);
        }
        for command in self.commands() {
            writer.line(1, &format!("<command name=\"{}\">", escape(command.name.as_str())));
            for root in &command.roots {
                writer.component(*root, 2, true);
            }
            writer.line(1, "</command>");
        }
        writer.out.push_str("</commands>\n");
        writer.out
    }
}

struct Writer<'a> {
    library: &'a TemplateLibrary,
    definitions: HashSet<PatternId>,
    written: HashSet<PatternId>,
    out: String,
}

impl Writer<'_> {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn component(&mut self, id: PatternId, depth: usize, nested: bool) {
        let node = self.library.node(id);
        if let Some(name) = &node.id {
            let reference = (nested && self.definitions.contains(&id)) || self.written.contains(&id);
            if reference {
                self.line(depth, &format!("<component from_id=\"{}\"/>", escape(name.as_str())));
                return;
            }
            self.written.insert(id);
        }

        let mut tag = String::from("<component");
        if let Some(name) = &node.id {
            push_attr(&mut tag, "id", name);
        }
        let structure = match &node.kind {
            PatternKind::Structural(structure) => {
                if let Some(indicator) = &structure.filters.indicator {
                    push_attr(&mut tag, "indicator", indicator);
                }
                if let Some(lf_type) = &structure.filters.lf_type {
                    push_attr(&mut tag, "type", lf_type);
                }
                if let Some(words) = &structure.filters.words {
                    push_attr(&mut tag, "word", &words.to_string());
                }
                Some(structure)
            }
            PatternKind::Fuzzy => None,
        };
        if !node.map_params.is_empty() {
            push_attr(&mut tag, "map_param", &node.map_params.join(","));
        }
        if let Some(group) = &node.group {
            push_attr(&mut tag, "group", group);
        }
        if structure.is_none() {
            push_attr(&mut tag, "fuzzy", "True");
        }

        match structure {
            Some(structure) if !structure.roles.is_empty() || !structure.alternatives.is_empty() => {
                tag.push('>');
                self.line(depth, &tag);
                self.roles(&structure.roles, depth + 1);
                self.groups(&structure.alternatives, depth + 1);
                self.line(depth, "</component>");
            }
            _ => {
                tag.push_str("/>");
                self.line(depth, &tag);
            }
        }
    }

    fn roles(&mut self, roles: &[Role], depth: usize) {
        for role in roles {
            let open = format!("<role name=\"{}\">", escape(role.name.as_str()));
            match &role.content {
                RoleContent::Literal(text) => {
                    self.line(depth, &format!("{}{}</role>", open, escape(text.as_str())));
                }
                RoleContent::Component(child) => {
                    self.line(depth, &open);
                    self.component(*child, depth + 1, true);
                    self.line(depth, "</role>");
                }
                RoleContent::Alternatives(groups) => {
                    self.line(depth, &open);
                    self.groups(groups, depth + 1);
                    self.line(depth, "</role>");
                }
            }
        }
    }

    fn groups(&mut self, groups: &[RoleGroup], depth: usize) {
        for group in groups {
            self.line(depth, "<rolegroup>");
            self.roles(&group.roles, depth + 1);
            self.line(depth, "</rolegroup>");
        }
    }
}

fn push_attr(tag: &mut String, key: &str, value: &str) {
    let _ = write!(tag, " {}=\"{}\"", key, escape(value));
}

#[cfg(test)]
mod tests {
    use crate::compiler::compile;

    const MOVE_LOC: &str = r#"<commands>
  <component id="col" word="left, right, center" map_param="col"/>
  <command name="GET_MOVE_LOC">
    <component indicator="SPEECHACT" type="SA_IDENTIFY">
      <rolegroup>
        <role name="CONTENT"><component from_id="col"/></role>
      </rolegroup>
      <role name="TENSE">PRES</role>
    </component>
  </command>
  <command name="SEARCH">
    <component type="SA_REQUEST">
      <role name="NEUTRAL"><component id="q" fuzzy="True" group="query" map_param="query"/></role>
      <role name="AFFECTED"><component from_id="q"/></role>
    </component>
  </command>
</commands>"#;

    #[test]
    fn writes_definitions_then_commands() {
        let library = compile(MOVE_LOC).unwrap().library;
        insta::assert_snapshot!(library.to_xml(), @r#"
        <commands>
          <component id="col" word="left,right,center" map_param="col"/>
          <command name="GET_MOVE_LOC">
            <component indicator="SPEECHACT" type="SA_IDENTIFY">
              <role name="TENSE">PRES</role>
              <rolegroup>
                <role name="CONTENT">
                  <component from_id="col"/>
                </role>
              </rolegroup>
            </component>
          </command>
          <command name="SEARCH">
            <component type="SA_REQUEST">
              <role name="NEUTRAL">
                <component id="q" map_param="query" group="query" fuzzy="True"/>
              </role>
              <role name="AFFECTED">
                <component from_id="q"/>
              </role>
            </component>
          </command>
        </commands>
        "#);
    }

    #[test]
    fn output_recompiles_to_an_equal_library() {
        let library = compile(MOVE_LOC).unwrap().library;
        let again = compile(&library.to_xml()).unwrap().library;
        assert_eq!(library, again);
    }

    #[test]
    fn escapes_attribute_and_literal_text() {
        let library = compile(
            r#"<commands><command name="A &amp; B">
              <component word="rock &amp; roll"><role name="MODE">&lt;fast&gt;</role></component>
            </command></commands>"#,
        )
        .unwrap()
        .library;
        let xml = library.to_xml();
        assert!(xml.contains(r#"name="A &amp; B""#));
        assert!(xml.contains("&lt;fast&gt;"));
        assert_eq!(compile(&xml).unwrap().library, library);
    }
}
