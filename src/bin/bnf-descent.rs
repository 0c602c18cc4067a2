//! Parse a file with a BNF grammar and print the parse tree.
//!
//! Usage:
//!   bnf-descent grammar.bnf input.txt --format xml
//!   cat input.txt | bnf-descent grammar.bnf --format dot --case-insensitive

#![allow(clippy::print_stdout, clippy::print_stderr)]

use bnf_descent::render::{self, GraphvizVisitor, IndentedTextVisitor, XmlVisitor};
use bnf_descent::{Error, Grammar, ParseNode, RecursionLimit};
use clap::{Parser, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum Format {
    #[default]
    Xml,
    Dot,
    Txt,
    Json,
}

#[derive(Parser)]
#[command(name = "bnf-descent", version)]
#[command(about = "Parse text with a BNF grammar and print the parse tree")]
struct Args {
    /// Grammar file
    grammar: PathBuf,

    /// Input file; standard input when omitted
    input: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    format: Format,

    /// 0 errors only, 1 warnings, 2 info, 3 debug, 4 and up trace
    #[arg(long, default_value_t = 1)]
    verbosity: u8,

    /// Maximum rule nesting depth
    #[arg(long, default_value_t = bnf_descent::DEFAULT_MAX_RECURSION)]
    max_recursion: usize,

    /// Fail instead of backtracking when the nesting depth is exceeded
    #[arg(long)]
    strict_recursion: bool,

    /// Compare literals without regard to case
    #[arg(long)]
    case_insensitive: bool,

    /// Accept `<name>` placeholders in the input
    #[arg(long)]
    partial: bool,
}

/// Why the run failed, mapped onto the process exit code
enum Failure {
    NoParse,
    Io(PathBuf, io::Error),
    Recursion(usize),
    Grammar(Error),
    Runtime(String),
}

impl Failure {
    const fn exit_code(&self) -> u8 {
        match self {
            Failure::NoParse => 2,
            Failure::Io(..) => 3,
            Failure::Recursion(_) | Failure::Runtime(_) => 6,
            Failure::Grammar(_) => 7,
        }
    }
}

impl From<Error> for Failure {
    fn from(err: Error) -> Self {
        match err {
            Error::RecursionLimitExceeded(bound) => Failure::Recursion(bound),
            other => Failure::Grammar(other),
        }
    }
}

#[cfg(feature = "tracing")]
fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[cfg(not(feature = "tracing"))]
const fn init_tracing(_verbosity: u8) {}

/// Without `tracing`, higher verbosity prints a short summary to stderr
fn diagnostic(verbosity: u8, min: u8, message: impl FnOnce() -> String) {
    if cfg!(not(feature = "tracing")) && verbosity >= min {
        eprintln!("{}", message());
    }
}

fn read_input(path: Option<&PathBuf>) -> Result<String, Failure> {
    match path {
        Some(path) => fs::read_to_string(path).map_err(|e| Failure::Io(path.clone(), e)),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| Failure::Io(PathBuf::from("<stdin>"), e))?;
            Ok(text)
        }
    }
}

fn format_tree(tree: &ParseNode, format: Format) -> Result<String, Failure> {
    let output = match format {
        Format::Xml => render::render(tree, XmlVisitor::new())?,
        Format::Dot => render::render(tree, GraphvizVisitor::new())?,
        Format::Txt => render::render(tree, IndentedTextVisitor::new())?,
        Format::Json => {
            serde_json::to_string_pretty(tree).map_err(|e| Failure::Runtime(e.to_string()))?
        }
    };
    Ok(output)
}

fn run(args: &Args) -> Result<String, Failure> {
    let grammar_text =
        fs::read_to_string(&args.grammar).map_err(|e| Failure::Io(args.grammar.clone(), e))?;
    let grammar: Grammar = grammar_text.parse()?;
    grammar.validate()?;
    diagnostic(args.verbosity, 2, || {
        format!(
            "{}: {} rules",
            args.grammar.display(),
            grammar.rules_iter().count()
        )
    });

    let input = read_input(args.input.as_ref())?;
    diagnostic(args.verbosity, 3, || format!("input: {} bytes", input.len()));

    let recursion_limit = if args.strict_recursion {
        RecursionLimit::Fail
    } else {
        RecursionLimit::Backtrack
    };
    let parser = grammar
        .build_parser()
        .with_max_recursion(args.max_recursion)
        .with_case_sensitive(!args.case_insensitive)
        .with_partial_parsing(args.partial)
        .with_recursion_limit(recursion_limit);

    let tree = parser.parse(&input)?.ok_or(Failure::NoParse)?;
    format_tree(&tree, args.format)
}

fn main() -> ExitCode {
    // clap exits with status 2 on bad arguments, which collides with "no parse"
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            eprint!("{e}");
            return ExitCode::from(4);
        }
        Err(e) => {
            print!("{e}");
            return ExitCode::SUCCESS;
        }
    };
    init_tracing(args.verbosity);

    match run(&args) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(failure) => {
            match &failure {
                Failure::NoParse => eprintln!("input does not conform to the grammar"),
                Failure::Io(path, e) => eprintln!("{}: {e}", path.display()),
                Failure::Recursion(bound) => {
                    eprintln!("{}", Error::RecursionLimitExceeded(*bound));
                }
                Failure::Grammar(e) => eprintln!("{e}"),
                Failure::Runtime(e) => eprintln!("{e}"),
            }
            ExitCode::from(failure.exit_code())
        }
    }
}
