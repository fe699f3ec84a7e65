//! Non-fatal compiler diagnostics.
//!
//! Warnings never stop compilation. Each one names the rule that fired, the
//! source it came from and the byte offset of the offending element, so a
//! template author can jump straight to it.

use std::fmt;

use serde::Serialize;

/// The rule a [`TemplateWarning`] was raised by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WarningKind {
    /// A fuzzy component declares roles or rolegroups.
    FuzzyStructureIgnored,
    /// A fuzzy component declares `indicator`, `type` or `word`.
    FuzzyFilterIgnored,
    /// An attribute no template element understands.
    UnknownAttribute,
    /// A free-standing definition no command reaches.
    UnusedDefinition,
    /// One `map_param` bound by two nodes of a command that can match
    /// together.
    ConflictingParam,
}

impl WarningKind {
    /// Short kebab-case rule name used in rendered output.
    pub fn rule(self) -> &'static str {
        match self {
            WarningKind::FuzzyStructureIgnored => "fuzzy-structure-ignored",
            WarningKind::FuzzyFilterIgnored => "fuzzy-filter-ignored",
            WarningKind::UnknownAttribute => "unknown-attribute",
            WarningKind::UnusedDefinition => "unused-definition",
            WarningKind::ConflictingParam => "conflicting-param",
        }
    }
}

/// A compiler warning with its location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateWarning {
    pub kind: WarningKind,
    /// Name of the template source.
    pub file: String,
    /// Byte offset of the element the warning is about.
    pub position: u64,
    pub message: String,
}

impl TemplateWarning {
    pub(crate) fn new(
        kind: WarningKind,
        file: &str,
        position: u64,
        message: impl Into<String>,
    ) -> Self {
        TemplateWarning {
            kind,
            file: file.to_string(),
            position,
            message: message.into(),
        }
    }
}

impl fmt::Display for TemplateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}: warning[{}]: {}",
            self.file,
            self.position,
            self.kind.rule(),
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_location_and_rule() {
        let warning = TemplateWarning::new(
            WarningKind::UnknownAttribute,
            "move.xml",
            42,
            "unknown attribute 'colour' on <component>",
        );
        assert_eq!(
            warning.to_string(),
            "move.xml@42: warning[unknown-attribute]: unknown attribute 'colour' on <component>"
        );
    }
}
