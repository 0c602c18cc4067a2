use std::error;
use std::fmt;
use std::str;

use nom::{Err, error::ErrorKind};

/// Everything that can go wrong while loading a grammar, parsing with it, or
/// folding a parse tree into an object.
///
/// An input that simply does not conform to a grammar is *not* an error: the
/// parser reports it as `Ok(None)`.
#[derive(PartialEq, Eq, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Malformed rule or grammar text
    InvalidGrammar(String),
    /// A non-terminal is referenced but never defined
    UndefinedSymbol(String),
    /// The grammar has no rule to start parsing from
    NoStartRule,
    /// The recursion bound was reached while matching under [`crate::RecursionLimit::Fail`]
    RecursionLimitExceeded(usize),
    /// A tree builder could not produce its object
    BuildError(String),
    /// A visitor aborted a parse tree traversal
    VisitError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidGrammar(s) | Error::BuildError(s) | Error::VisitError(s) => {
                write!(f, "{s}")
            }
            Error::UndefinedSymbol(s) => write!(f, "Cannot find rule for token <{s}>"),
            Error::NoStartRule => write!(f, "No start rule could be found"),
            Error::RecursionLimitExceeded(bound) => write!(
                f,
                "Maximum number of recursion steps ({bound}) reached. If the input string is indeed valid, try increasing the limit."
            ),
        }
    }
}

impl error::Error for Error {}

impl From<nom::error::Error<&str>> for Error {
    fn from(err: nom::error::Error<&str>) -> Self {
        Error::InvalidGrammar(format!("Parsing error: {err:?}"))
    }
}

impl From<Err<nom::error::Error<&str>>> for Error {
    fn from(err: Err<nom::error::Error<&str>>) -> Self {
        Error::InvalidGrammar(format!("Parsing error: {err:?}"))
    }
}

impl From<(&'_ str, ErrorKind)> for Error {
    fn from(err: (&str, ErrorKind)) -> Self {
        let string = format!("Parsing error: {:?}\n {:?}", err.1, err.0);
        Error::InvalidGrammar(string)
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::InvalidGrammar(format!("Invalid regular expression: {err}"))
    }
}
