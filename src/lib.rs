#![doc = include_str!("../README.md")]

pub mod builder;
mod error;
mod grammar;
mod node;
mod parser;
mod parsers;
pub mod render;
mod rule;
mod token;
mod token_string;
mod tracing;

pub use crate::builder::{CallingConvention, ObjectBuilder, Stack, StackItem};
pub use crate::error::Error;
pub use crate::grammar::Grammar;
pub use crate::node::{ParseNode, ParseNodeVisitor};
pub use crate::parser::{DEFAULT_MAX_RECURSION, GrammarParser, ParserOptions, RecursionLimit};
pub use crate::render::OutputFormatVisitor;
pub use crate::rule::Rule;
pub use crate::token::{EPSILON, PrefixMatch, RegexTerminal, Token};
pub use crate::token_string::TokenString;

pub(crate) use hashbrown::HashMap;

/// Read grammar text into a `Grammar`.
///
/// # Errors
///
/// Returns `Error::InvalidGrammar` if a rule is malformed or unterminated.
pub fn grammar_from_text(text: &str) -> Result<Grammar, Error> {
    text.parse()
}

/// Parse `text` with `grammar` under default options. `Ok(None)` means the
/// text does not conform to the grammar.
///
/// # Errors
///
/// See [`GrammarParser::parse`].
pub fn parse(grammar: &Grammar, text: &str) -> Result<Option<ParseNode>, Error> {
    grammar.build_parser().parse(text)
}
