use crate::error::Error;
use crate::parsers;
use crate::token::Token;
use hashbrown::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One alternative of a rule: an ordered sequence of `Token`s.
///
/// A *try-last* (sticky) alternative is always kept behind the ordinary
/// alternatives of its rule, whatever order it was declared in.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct TokenString {
    pub(crate) tokens: Vec<Token>,
    #[cfg_attr(feature = "serde", serde(default))]
    try_last: bool,
}

impl TokenString {
    /// Construct a new, empty `TokenString`
    #[must_use]
    pub const fn new() -> TokenString {
        TokenString {
            tokens: vec![],
            try_last: false,
        }
    }

    /// Construct a `TokenString` from `Token`s
    #[must_use]
    pub const fn from_parts(v: Vec<Token>) -> TokenString {
        TokenString {
            tokens: v,
            try_last: false,
        }
    }

    /// Construct a try-last `TokenString` from `Token`s
    #[must_use]
    pub const fn sticky(v: Vec<Token>) -> TokenString {
        TokenString {
            tokens: v,
            try_last: true,
        }
    }

    /// Add `Token` to the end of the `TokenString`
    pub fn add_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// Remove the first occurrence of `Token` from the `TokenString`
    pub fn remove_token(&mut self, token: &Token) -> Option<Token> {
        self.tokens
            .iter()
            .position(|x| x == token)
            .map(|pos| self.tokens.remove(pos))
    }

    /// Get iterator of `Token`s within the `TokenString`
    pub fn tokens_iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Whether this alternative is tried after all ordinary ones
    #[must_use]
    pub const fn try_last(&self) -> bool {
        self.try_last
    }

    pub const fn set_try_last(&mut self, try_last: bool) {
        self.try_last = try_last;
    }

    /// The distinct terminal tokens appearing in this alternative
    #[must_use]
    pub fn terminal_tokens(&self) -> HashSet<&Token> {
        self.tokens.iter().filter(|t| t.is_terminal()).collect()
    }
}

impl PartialEq for TokenString {
    fn eq(&self, other: &Self) -> bool {
        self.tokens == other.tokens
    }
}

impl Eq for TokenString {}

impl Hash for TokenString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tokens.hash(state);
    }
}

impl fmt::Display for TokenString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let display = self
            .tokens
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" ");

        write!(f, "{display}")
    }
}

impl FromStr for TokenString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parsers::alternative(s)
    }
}

impl ops::Add<Token> for TokenString {
    type Output = TokenString;
    fn add(mut self, rhs: Token) -> Self::Output {
        self.add_token(rhs);
        self
    }
}

impl ops::Add<TokenString> for TokenString {
    type Output = TokenString;
    fn add(mut self, rhs: TokenString) -> Self::Output {
        self.tokens.extend(rhs.tokens);
        self
    }
}
