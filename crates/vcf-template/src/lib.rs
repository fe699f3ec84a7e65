//! Voice-command templates: compile XML command templates into an immutable
//! [`TemplateLibrary`] and match parsed utterances against it.
//!
//! ```text
//! template XML ──► compiler ──► TemplateLibrary ──► Matcher ──► MatchOutcome
//!                                                     ▲
//!                                   LogicalForm ──────┘
//! ```

pub mod compiler;
pub mod error;
pub mod matcher;
pub mod model;
pub mod serialize;

pub use compiler::{compile, Compiled, TemplateCompiler, TemplateWarning, WarningKind};
pub use error::{MatchError, TemplateError};
pub use matcher::{
    CommandMatch, CommandTrial, MatchOutcome, MatchReport, Matcher, MatcherConfig, Mismatch,
    MismatchReason,
};
pub use model::{Command, PatternId, PatternKind, PatternNode, TemplateLibrary};
