//! The rule table a parser is driven by.
//!
//! Grammar text is a sequence of rules, each terminated by a semicolon and
//! possibly spanning several lines. `#` starts a comment running to the end
//! of the line.
//!
//! # Examples
//!
//! ```rust
//! use bnf_descent::Grammar;
//!
//! let grammar: Grammar = "
//! # a DNA strand
//! <dna>  := <base> <dna> | <base> ;
//! <base> := A | C | G | T ;"
//!     .parse()
//!     .unwrap();
//!
//! assert_eq!(grammar.alternatives_of("dna"), vec!["<base> <dna>", "<base>"]);
//! ```

use crate::error::Error;
use crate::node::ParseNode;
use crate::parser::GrammarParser;
use crate::parsers;
use crate::rule::Rule;
use crate::token::{Token, nonterminal_name};
use hashbrown::HashSet;
use std::fmt;
use std::str;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An ordered collection of `Rule`s plus an optional designated start rule.
///
/// Rules are unique by left-hand side: adding a rule whose name is already
/// present merges its alternatives into the existing one.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct Grammar {
    rules: Vec<Rule>,
    #[cfg_attr(feature = "serde", serde(default))]
    start: Option<String>,
}

impl Grammar {
    /// Construct an empty `Grammar`
    #[must_use]
    pub const fn new() -> Grammar {
        Grammar {
            rules: vec![],
            start: None,
        }
    }

    /// Construct a `Grammar` from `Rule`s, merging rules that share a name
    #[must_use]
    pub fn from_parts(rules: Vec<Rule>) -> Grammar {
        let mut grammar = Grammar::new();
        for rule in rules {
            grammar.add_rule(rule);
        }
        grammar
    }

    fn rule_mut(&mut self, name: &str) -> Option<&mut Rule> {
        let name = nonterminal_name(name);
        self.rules.iter_mut().find(|rule| rule.name() == name)
    }

    /// Add a `Rule`, appending its alternatives to an existing rule of the
    /// same name if there is one
    pub fn add_rule(&mut self, rule: Rule) {
        match self.rule_mut(rule.name()) {
            Some(existing) => existing.absorb(rule.into_alternatives()),
            None => self.rules.push(rule),
        }
    }

    /// Add a `Rule`, inserting its alternatives at `index` of an existing rule
    /// of the same name if there is one
    pub fn add_rule_at(&mut self, index: usize, rule: Rule) {
        match self.rule_mut(rule.name()) {
            Some(existing) => existing.absorb_at(index, rule.into_alternatives()),
            None => self.rules.push(rule),
        }
    }

    /// Remove the rule named `name`, returning it if it was present
    pub fn remove_rule(&mut self, name: &str) -> Option<Rule> {
        let name = nonterminal_name(name);
        let position = self.rules.iter().position(|rule| rule.name() == name)?;
        if self.start.as_deref() == Some(name) {
            self.start = None;
        }
        Some(self.rules.remove(position))
    }

    /// Look up a rule by name; angle brackets are optional
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        let name = nonterminal_name(name);
        self.rules.iter().find(|rule| rule.name() == name)
    }

    /// Get iterator of the `Grammar`'s `Rule`s, in declaration order
    pub fn rules_iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// The rule parsing starts from: the one set explicitly, else the first declared
    #[must_use]
    pub fn start_rule(&self) -> Option<&Rule> {
        match &self.start {
            Some(name) => self.rule(name),
            None => self.rules.first(),
        }
    }

    /// Designate the rule parsing starts from
    ///
    /// # Errors
    ///
    /// Returns `Error::UndefinedSymbol` if the grammar has no rule of that name.
    pub fn set_start_rule(&mut self, name: &str) -> Result<(), Error> {
        let name = nonterminal_name(name);
        if self.rule(name).is_none() {
            return Err(Error::UndefinedSymbol(name.to_string()));
        }
        self.start = Some(name.to_string());
        Ok(())
    }

    /// Textual form of each alternative of the rule `name`, in trial order.
    /// An unknown name yields no alternatives.
    #[must_use]
    pub fn alternatives_of(&self, name: &str) -> Vec<String> {
        self.rule(name)
            .map(|rule| {
                rule.alternatives_iter()
                    .map(std::string::ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check that every non-terminal referenced by an alternative has a rule.
    ///
    /// # Errors
    ///
    /// Returns `Error::UndefinedSymbol` naming the first undefined non-terminal
    /// in declaration order.
    pub fn validate(&self) -> Result<(), Error> {
        let defined: HashSet<&str> = self.rules.iter().map(Rule::name).collect();
        let undefined = self
            .rules
            .iter()
            .flat_map(Rule::alternatives_iter)
            .flat_map(|alt| alt.tokens_iter())
            .find_map(|token| match token {
                Token::Nonterminal(name) if !defined.contains(name.as_str()) => Some(name),
                _ => None,
            });

        match undefined {
            Some(name) => Err(Error::UndefinedSymbol(name.clone())),
            None => Ok(()),
        }
    }

    /// The distinct terminal tokens used anywhere in the grammar
    #[must_use]
    pub fn terminal_tokens(&self) -> HashSet<&Token> {
        self.rules.iter().flat_map(Rule::terminal_tokens).collect()
    }

    /// Build a parser with default options for this grammar.
    ///
    /// ```rust
    /// use bnf_descent::Grammar;
    ///
    /// let grammar: Grammar = "<S> := a <S> | a;".parse().unwrap();
    /// let parser = grammar.build_parser().with_max_recursion(10);
    ///
    /// assert!(parser.parse("a a a")?.is_some());
    /// assert!(parser.parse("a b")?.is_none());
    /// # Ok::<(), bnf_descent::Error>(())
    /// ```
    #[must_use]
    pub fn build_parser(&self) -> GrammarParser<'_> {
        GrammarParser::new(self)
    }

    /// Parse `input` from the start rule with default options.
    ///
    /// # Errors
    ///
    /// See [`GrammarParser::parse`].
    pub fn parse(&self, input: &str) -> Result<Option<ParseNode>, Error> {
        self.build_parser().parse(input)
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{rule};")?;
        }
        Ok(())
    }
}

impl str::FromStr for Grammar {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parsers::grammar(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_string::TokenString;
    use quickcheck::{Arbitrary, Gen, QuickCheck, TestResult};

    impl Arbitrary for Grammar {
        fn arbitrary(g: &mut Gen) -> Self {
            let mut rules = Vec::<Rule>::arbitrary(g);
            // grammar must always have at least one rule
            if rules.is_empty() {
                rules.push(Rule::arbitrary(g));
            }
            Grammar::from_parts(rules)
        }
    }

    fn prop_to_string_and_back(gram: Grammar) -> TestResult {
        let to_string = gram.to_string();
        match to_string.parse::<Grammar>() {
            Ok(from_str) => TestResult::from_bool(from_str == gram),
            Err(e) => TestResult::error(format!("{gram} to string and back should be safe: {e}")),
        }
    }

    #[test]
    fn to_string_and_back() {
        QuickCheck::new()
            .tests(300)
            .r#gen(Gen::new(8usize))
            .quickcheck(prop_to_string_and_back as fn(Grammar) -> TestResult);
    }

    fn prop_add_rule_merges(first: Rule, second: Rule) -> TestResult {
        let second = Rule::from_parts(first.name(), second.into_alternatives());
        let mut expected = first.clone();
        expected.absorb(second.clone().into_alternatives());

        let mut grammar = Grammar::new();
        grammar.add_rule(first);
        grammar.add_rule(second);

        TestResult::from_bool(
            grammar.rules_iter().count() == 1 && grammar.rule(expected.name()) == Some(&expected),
        )
    }

    #[test]
    fn add_rule_merges() {
        QuickCheck::new().quickcheck(prop_add_rule_merges as fn(Rule, Rule) -> TestResult);
    }

    #[test]
    fn add_rule_at_inserts_into_existing() {
        let mut grammar: Grammar = "<S> := a | d;\n<T> := x;".parse().unwrap();
        grammar.add_rule_at(1, "<S> := b | c".parse().unwrap());
        grammar.add_rule_at(0, "<U> := u".parse().unwrap());

        assert_eq!(grammar.alternatives_of("S"), vec!["a", "b", "c", "d"]);
        let names: Vec<&str> = grammar.rules_iter().map(Rule::name).collect();
        assert_eq!(names, vec!["S", "T", "U"]);
    }

    #[test]
    fn add_rule_at_far_index_appends() {
        let mut grammar: Grammar = "<S> := a;".parse().unwrap();
        grammar.add_rule_at(usize::MAX, "<S> := b | c".parse().unwrap());
        assert_eq!(grammar.alternatives_of("S"), vec!["a", "b", "c"]);
    }

    #[test]
    fn alternatives_of_lists_sticky_last() {
        let grammar: Grammar = "<S> := x || y | z;\n<S> := w;".parse().unwrap();
        assert_eq!(grammar.alternatives_of("<S>"), vec!["x", "w", "y", "z"]);
        assert!(grammar.alternatives_of("nope").is_empty());
    }

    #[test]
    fn start_rule_defaults_to_first() {
        let mut grammar: Grammar = "<a> := x;\n<b> := y;".parse().unwrap();
        assert_eq!(grammar.start_rule().map(Rule::name), Some("a"));

        grammar.set_start_rule("<b>").unwrap();
        assert_eq!(grammar.start_rule().map(Rule::name), Some("b"));

        assert_eq!(
            grammar.set_start_rule("c"),
            Err(Error::UndefinedSymbol(String::from("c")))
        );
        assert_eq!(grammar.start_rule().map(Rule::name), Some("b"));
    }

    #[test]
    fn empty_grammar_has_no_start() {
        assert!(Grammar::new().start_rule().is_none());
    }

    #[test]
    fn remove_rule_clears_start() {
        let mut grammar: Grammar = "<a> := x;\n<b> := y;".parse().unwrap();
        grammar.set_start_rule("b").unwrap();

        assert!(grammar.remove_rule("<b>").is_some());
        assert!(grammar.remove_rule("b").is_none());
        assert_eq!(grammar.start_rule().map(Rule::name), Some("a"));
    }

    #[test]
    fn validate_reports_undefined() {
        let grammar: Grammar = "<S> := <A> <B>;\n<A> := a;".parse().unwrap();
        assert_eq!(
            grammar.validate(),
            Err(Error::UndefinedSymbol(String::from("B")))
        );

        let grammar: Grammar = "<S> := <A>;\n<A> := a;".parse().unwrap();
        assert_eq!(grammar.validate(), Ok(()));
    }

    #[test]
    fn terminal_tokens_of_grammar() {
        let grammar: Grammar = "<S> := ( <S> ) | <A>;\n<A> := a | (;".parse().unwrap();
        let terminals = grammar.terminal_tokens();
        assert_eq!(terminals.len(), 3);
        assert!(terminals.contains(&Token::terminal("a")));
    }

    #[test]
    fn display_terminates_rules() {
        let grammar = Grammar::from_parts(vec![
            Rule::from_parts(
                "S",
                vec![
                    TokenString::from_parts(vec![Token::nonterminal("A")]),
                    TokenString::sticky(vec![Token::Epsilon]),
                ],
            ),
            Rule::from_parts("A", vec![TokenString::from_parts(vec![Token::terminal("a")])]),
        ]);
        assert_eq!(grammar.to_string(), "<S> := <A> || ε;\n<A> := a;\n");
    }

    #[test]
    fn parse_error() {
        let grammar: Result<Grammar, _> = "<S> := a | ;".parse();
        assert!(matches!(grammar, Err(Error::InvalidGrammar(_))));
    }
}
