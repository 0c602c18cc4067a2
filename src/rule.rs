use crate::error::Error;
use crate::parsers;
use crate::token::{Token, nonterminal_name};
use crate::token_string::TokenString;
use hashbrown::HashSet;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A rule `<lhs> := alt1 | alt2 || sticky1`: a left-hand side non-terminal
/// and its ordered alternatives.
///
/// Alternatives are stored in trial order, so try-last alternatives always sit
/// after every ordinary one.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct Rule {
    lhs: String,
    alternatives: Vec<TokenString>,
}

impl Rule {
    /// Construct a new `Rule` with no alternatives
    #[must_use]
    pub fn new(lhs: &str) -> Rule {
        Rule {
            lhs: nonterminal_name(lhs).to_string(),
            alternatives: vec![],
        }
    }

    /// Construct a `Rule` from its alternatives, moving try-last ones to the end
    #[must_use]
    pub fn from_parts(lhs: &str, alternatives: Vec<TokenString>) -> Rule {
        let mut rule = Rule::new(lhs);
        for alt in alternatives {
            rule.add_alternative(alt);
        }
        rule
    }

    /// Name of the left-hand side, without angle brackets
    #[must_use]
    pub fn name(&self) -> &str {
        &self.lhs
    }

    /// The left-hand side as a `Token`
    #[must_use]
    pub fn left_hand_side(&self) -> Token {
        Token::Nonterminal(self.lhs.clone())
    }

    fn first_sticky(&self) -> usize {
        self.alternatives
            .iter()
            .position(TokenString::try_last)
            .unwrap_or(self.alternatives.len())
    }

    /// Append an alternative. An ordinary alternative lands before the
    /// try-last group; a try-last one lands at the very end.
    pub fn add_alternative(&mut self, alt: TokenString) {
        if alt.try_last() {
            self.alternatives.push(alt);
        } else {
            let at = self.first_sticky();
            self.alternatives.insert(at, alt);
        }
    }

    /// Insert an alternative at `index`, clamped so that try-last alternatives
    /// stay behind ordinary ones
    pub fn insert_alternative(&mut self, index: usize, alt: TokenString) {
        let first_sticky = self.first_sticky();
        let at = if alt.try_last() {
            index.clamp(first_sticky, self.alternatives.len())
        } else {
            index.min(first_sticky)
        };
        self.alternatives.insert(at, alt);
    }

    /// Remove an alternative from the rule
    ///
    /// If interested if the alternative was removed, then inspect the returned `Option`.
    pub fn remove_alternative(&mut self, alt: &TokenString) -> Option<TokenString> {
        self.alternatives
            .iter()
            .position(|x| x == alt)
            .map(|pos| self.alternatives.remove(pos))
    }

    /// Pull every alternative of `other` into this rule, in order
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidGrammar` if the two left-hand sides differ.
    pub fn merge(&mut self, other: Rule) -> Result<(), Error> {
        self.ensure_same_lhs(&other)?;
        self.absorb(other.alternatives);
        Ok(())
    }

    /// Pull every alternative of `other` into this rule, starting at `index`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidGrammar` if the two left-hand sides differ.
    pub fn merge_at(&mut self, index: usize, other: Rule) -> Result<(), Error> {
        self.ensure_same_lhs(&other)?;
        self.absorb_at(index, other.alternatives);
        Ok(())
    }

    pub(crate) fn absorb(&mut self, alternatives: Vec<TokenString>) {
        for alt in alternatives {
            self.add_alternative(alt);
        }
    }

    pub(crate) fn absorb_at(&mut self, index: usize, alternatives: Vec<TokenString>) {
        for (offset, alt) in alternatives.into_iter().enumerate() {
            self.insert_alternative(index.saturating_add(offset), alt);
        }
    }

    pub(crate) fn into_alternatives(self) -> Vec<TokenString> {
        self.alternatives
    }

    fn ensure_same_lhs(&self, other: &Rule) -> Result<(), Error> {
        if self.lhs == other.lhs {
            Ok(())
        } else {
            Err(Error::InvalidGrammar(format!(
                "Cannot merge rule <{}> into rule <{}>",
                other.lhs, self.lhs
            )))
        }
    }

    /// Get iterator of the rule's alternatives, in trial order
    pub fn alternatives_iter(&self) -> impl Iterator<Item = &TokenString> {
        self.alternatives.iter()
    }

    /// Get number of alternatives
    #[must_use]
    pub fn len(&self) -> usize {
        self.alternatives.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// The distinct terminal tokens appearing in any alternative
    #[must_use]
    pub fn terminal_tokens(&self) -> HashSet<&Token> {
        self.alternatives
            .iter()
            .flat_map(TokenString::terminal_tokens)
            .collect()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{}> :=", self.lhs)?;
        for (idx, alt) in self.alternatives.iter().enumerate() {
            let separator = match (idx, alt.try_last()) {
                (0, _) => "",
                (_, true) if !self.alternatives.get(idx - 1).is_some_and(TokenString::try_last) => {
                    " ||"
                }
                _ => " |",
            };
            write!(f, "{separator} {alt}")?;
        }
        Ok(())
    }
}

impl FromStr for Rule {
    type Err = Error;

    /// Parse a rule, with or without its terminating semicolon
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parsers::rule(s)
    }
}
