//! Detection of `map_param` names that two nodes of one command can bind in
//! the same successful match.
//!
//! Every node occurrence is tagged with the alternation choices on its path:
//! a list of `(site, alternative)` pairs, where the command's root list is
//! site 0 and each rolegroup alternation met during the walk gets a fresh
//! site. Two occurrences are exclusive only if they took different
//! alternatives at some shared site.

use indexmap::IndexMap;

use crate::model::{Command, PatternId, PatternKind, Role, RoleContent, RoleGroup, TemplateLibrary};

type Path = Vec<(u32, usize)>;

struct Walk<'a> {
    library: &'a TemplateLibrary,
    next_site: u32,
    occurrences: IndexMap<&'a str, Vec<Path>>,
}

/// Parameter names of `command` that can be bound twice, in first-seen order.
pub(crate) fn conflicting_params(library: &TemplateLibrary, command: &Command) -> Vec<String> {
    let mut walk = Walk {
        library,
        next_site: 1,
        occurrences: IndexMap::new(),
    };
    for (alternative, root) in command.roots.iter().enumerate() {
        walk.node(*root, &mut vec![(0, alternative)]);
    }

    walk.occurrences
        .iter()
        .filter(|(_, paths)| {
            paths.iter().enumerate().any(|(i, a)| {
                paths[i + 1..].iter().any(|b| !exclusive(a, b))
            })
        })
        .map(|(name, _)| name.to_string())
        .collect()
}

fn exclusive(a: &Path, b: &Path) -> bool {
    a.iter().any(|(site, choice)| {
        b.iter()
            .any(|(other_site, other_choice)| site == other_site && choice != other_choice)
    })
}

impl<'a> Walk<'a> {
    fn node(&mut self, id: PatternId, path: &mut Path) {
        let library = self.library;
        let node = library.node(id);
        for param in &node.map_params {
            self.occurrences
                .entry(param.as_str())
                .or_default()
                .push(path.clone());
        }
        if let PatternKind::Structural(structure) = &node.kind {
            self.roles(&structure.roles, path);
            self.alternatives(&structure.alternatives, path);
        }
    }

    fn roles(&mut self, roles: &'a [Role], path: &mut Path) {
        for role in roles {
            match &role.content {
                RoleContent::Component(child) => self.node(*child, path),
                RoleContent::Literal(_) => {}
                RoleContent::Alternatives(groups) => self.alternatives(groups, path),
            }
        }
    }

    fn alternatives(&mut self, groups: &'a [RoleGroup], path: &mut Path) {
        if groups.is_empty() {
            return;
        }
        let site = self.next_site;
        self.next_site += 1;
        for (choice, group) in groups.iter().enumerate() {
            path.push((site, choice));
            self.roles(&group.roles, path);
            path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;

    fn conflicts(src: &str) -> Vec<String> {
        let compiled = compile(src).unwrap();
        let library = &compiled.library;
        conflicting_params(library, &library.commands()[0])
    }

    #[test]
    fn params_on_different_alternatives_do_not_conflict() {
        let src = r#"<commands><command name="LOC">
          <component type="SA_REQUEST">
            <rolegroup>
              <role name="CONTENT"><component map_param="col"/></role>
              <role name="MOD"><component map_param="row"/></role>
            </rolegroup>
            <rolegroup>
              <role name="CONTENT"><component map_param="row,col"/></role>
            </rolegroup>
          </component>
        </command></commands>"#;
        assert!(conflicts(src).is_empty());
    }

    #[test]
    fn params_on_the_same_branch_conflict() {
        let src = r#"<commands><command name="LOC">
          <component type="SA_REQUEST" map_param="x">
            <role name="CONTENT"><component map_param="x"/></role>
          </component>
        </command></commands>"#;
        assert_eq!(conflicts(src), vec!["x".to_string()]);
    }

    #[test]
    fn params_on_different_roots_do_not_conflict() {
        let src = r#"<commands><command name="LOC">
          <component type="A" map_param="x"/>
          <component type="B" map_param="x"/>
        </command></commands>"#;
        assert!(conflicts(src).is_empty());
    }

    #[test]
    fn shared_definition_used_twice_conflicts() {
        let src = r#"<commands>
          <component id="thing" map_param="obj"/>
          <command name="PUT">
            <component type="PUT">
              <role name="AFFECTED"><component from_id="thing"/></role>
              <role name="RESULT"><component from_id="thing"/></role>
            </component>
          </command>
        </commands>"#;
        assert_eq!(conflicts(src), vec!["obj".to_string()]);
    }
}
