//! Voice command framework CLI.
//!
//! Provides the `vcf` binary for working with command templates and parsed
//! utterances: `check` and `dump` compile template sets, `show` prints a
//! logical form, and `match` runs the matcher and prints its result as JSON.
//!
//! Exit codes: 0 = success or match, 1 = no match, 2 = template error,
//! 3 = I/O or input error.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use vcf_core::graph::LogicalForm;
use vcf_core::json::parse_json;
use vcf_core::rdf::parse_rdf;
use vcf_template::{Compiled, Matcher, MatcherConfig, TemplateCompiler};

/// Voice command template compiler and matcher.
#[derive(Parser)]
#[command(name = "vcf", about = "Voice command template compiler and matcher")]
struct Cli {
    /// Log at debug level (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Compile templates and report warnings and command signatures.
    Check {
        /// Template files or directories of `*.xml` files.
        #[arg(required = true)]
        templates: Vec<PathBuf>,
    },

    /// Print the resolved template library as XML.
    Dump {
        #[arg(required = true)]
        templates: Vec<PathBuf>,
    },

    /// Pretty-print a logical form.
    Show {
        /// Logical form file.
        lf: PathBuf,

        /// Input encoding (default: from the file extension).
        #[arg(short, long, value_enum)]
        format: Option<Format>,
    },

    /// Match a logical form against a template set.
    Match {
        /// Logical form file.
        lf: PathBuf,

        /// Template files or directories of `*.xml` files.
        #[arg(short, long, required = true, num_args = 1..)]
        templates: Vec<PathBuf>,

        /// Input encoding (default: from the file extension).
        #[arg(short, long, value_enum)]
        format: Option<Format>,

        /// Report why each rejected command failed.
        #[arg(long)]
        explain: bool,

        /// Maximum pattern nesting depth.
        #[arg(long)]
        max_depth: Option<usize>,

        /// Maximum match steps per utterance.
        #[arg(long)]
        max_steps: Option<usize>,

        /// Maximum rolegroup alternatives tried per alternation.
        #[arg(long)]
        max_alternatives: Option<usize>,
    },
}

/// Logical-form encodings.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// TRIPS RDF/XML.
    Rdf,
    /// serde JSON of the graph.
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match cli.command {
        Commands::Check { templates } => run_check(&templates),
        Commands::Dump { templates } => run_dump(&templates),
        Commands::Show { lf, format } => run_show(&lf, format),
        Commands::Match {
            lf,
            templates,
            format,
            explain,
            max_depth,
            max_steps,
            max_alternatives,
        } => {
            let defaults = MatcherConfig::default();
            let config = MatcherConfig {
                max_depth: max_depth.unwrap_or(defaults.max_depth),
                max_steps: max_steps.unwrap_or(defaults.max_steps),
                max_alternatives: max_alternatives.or(defaults.max_alternatives),
            };
            run_match(&lf, &templates, format, explain, config)
        }
    };
    process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

/// Execute the check subcommand.
fn run_check(paths: &[PathBuf]) -> i32 {
    let compiled = match load_templates(paths) {
        Ok(compiled) => compiled,
        Err(code) => return code,
    };

    for warning in &compiled.warnings {
        println!("{}", warning);
    }
    for (command, params) in compiled.library.signatures() {
        let params: Vec<&str> = params.iter().map(String::as_str).collect();
        println!("{}({})", command, params.join(", "));
    }
    println!(
        "{} command(s), {} definition(s), {} warning(s)",
        compiled.library.commands().len(),
        compiled.library.definitions().len(),
        compiled.warnings.len()
    );
    0
}

/// Execute the dump subcommand.
fn run_dump(paths: &[PathBuf]) -> i32 {
    match load_templates(paths) {
        Ok(compiled) => {
            print!("{}", compiled.library.to_xml());
            0
        }
        Err(code) => code,
    }
}

/// Execute the show subcommand.
fn run_show(path: &Path, format: Option<Format>) -> i32 {
    match load_form(path, format) {
        Ok(lf) => {
            println!("{}", lf);
            0
        }
        Err(code) => code,
    }
}

/// Execute the match subcommand.
///
/// Returns exit code: 0 = match, 1 = no match, 2 = template error,
/// 3 = I/O or input error.
fn run_match(
    lf_path: &Path,
    template_paths: &[PathBuf],
    format: Option<Format>,
    explain: bool,
    config: MatcherConfig,
) -> i32 {
    let compiled = match load_templates(template_paths) {
        Ok(compiled) => compiled,
        Err(code) => return code,
    };
    let lf = match load_form(lf_path, format) {
        Ok(lf) => lf,
        Err(code) => return code,
    };

    let matcher = Matcher::with_config(&compiled.library, config);
    let result = if explain {
        matcher
            .explain(&lf)
            .map(|report| (report.outcome.is_match(), serde_json::to_string_pretty(&report)))
    } else {
        matcher
            .match_form(&lf)
            .map(|outcome| (outcome.is_match(), serde_json::to_string_pretty(&outcome)))
    };

    match result {
        Ok((matched, json)) => {
            let json = json.unwrap_or_else(|e| {
                format!("{{\"error\": \"failed to serialize result: {}\"}}", e)
            });
            println!("{}", json);
            if matched {
                0
            } else {
                1
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            3
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Compiles every template file under `paths`. On failure the error has
/// already been reported and the exit code is returned.
fn load_templates(paths: &[PathBuf]) -> Result<Compiled, i32> {
    let files = match template_files(paths) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Err(3);
        }
    };

    let mut compiler = TemplateCompiler::new();
    for file in &files {
        let text = match fs::read_to_string(file) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("Error: failed to read '{}': {}", file.display(), e);
                return Err(3);
            }
        };
        debug!(file = %file.display(), "loaded template source");
        compiler.add_source(file.display().to_string(), text);
    }

    compiler.compile().map_err(|e| {
        eprintln!("Template error: {}", e);
        2
    })
}

/// Expands directories into their `*.xml` files, sorted by name.
fn template_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let entries = fs::read_dir(path)
                .map_err(|e| format!("failed to read directory '{}': {}", path.display(), e))?;
            let mut found = Vec::new();
            for entry in entries {
                let entry = entry
                    .map_err(|e| format!("failed to read directory '{}': {}", path.display(), e))?;
                let file = entry.path();
                if file.is_file() && file.extension().is_some_and(|ext| ext == "xml") {
                    found.push(file);
                }
            }
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    if files.is_empty() {
        return Err("no template files found".into());
    }
    Ok(files)
}

fn load_form(path: &Path, format: Option<Format>) -> Result<LogicalForm, i32> {
    let text = fs::read_to_string(path).map_err(|e| {
        eprintln!("Error: failed to read '{}': {}", path.display(), e);
        3
    })?;
    let format = format.unwrap_or_else(|| {
        if path.extension().is_some_and(|ext| ext == "json") {
            Format::Json
        } else {
            Format::Rdf
        }
    });
    let parsed = match format {
        Format::Rdf => parse_rdf(&text),
        Format::Json => parse_json(&text),
    };
    parsed.map_err(|e| {
        eprintln!("Error: invalid logical form '{}': {}", path.display(), e);
        3
    })
}
