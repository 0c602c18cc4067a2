use crate::HashMap;
use crate::error::Error;
use crate::grammar::Grammar;
use crate::node::ParseNode;
use crate::rule::Rule;
use crate::token::{PrefixMatch, Token, nonterminal_name};
use crate::tracing;

/// Receives each node a rule derives along with the offset just past it, and
/// returns the finished tree once the rest of the parse succeeds
type Continuation<'k> = dyn FnMut(ParseNode, usize) -> Result<Option<ParseNode>, Error> + 'k;

/// Recursion bound used when none is configured
pub const DEFAULT_MAX_RECURSION: usize = 50;

/// What happens when matching would recurse deeper than the configured bound
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecursionLimit {
    /// Treat the too-deep attempt as an ordinary non-match and keep backtracking
    #[default]
    Backtrack,
    /// Abort the whole parse with `Error::RecursionLimitExceeded`
    Fail,
}

/// Settings scoped to one `GrammarParser`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct ParserOptions {
    /// Deepest rule nesting attempted; the start rule is at depth 0
    pub max_recursion: usize,
    /// Whether literal terminals compare case-sensitively. Regex terminals
    /// carry their own flags.
    pub case_sensitive: bool,
    /// Accept `<name>` written verbatim in the input in place of a derivation of `<name>`
    pub partial: bool,
    pub recursion_limit: RecursionLimit,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_recursion: DEFAULT_MAX_RECURSION,
            case_sensitive: true,
            partial: false,
            recursion_limit: RecursionLimit::default(),
        }
    }
}

/// A backtracking recursive-descent parser over a borrowed `Grammar`.
///
/// Alternatives are tried in their stored order and the first derivation
/// that leads to a successful parse of the whole input is kept, so ordering
/// is the only disambiguation. A rule whose first match strands the rest of
/// the parse is retried with its later alternatives. The parser never
/// mutates the grammar: any number of parsers, with differing options, may
/// share one grammar across threads.
///
/// # Example
///
/// ```rust
/// use bnf_descent::{Grammar, RecursionLimit};
///
/// let grammar: Grammar = "<S> := SELECT <attr> FROM <table>;
/// <attr>  := ^[a-z]+;
/// <table> := ^[a-z]+;"
///     .parse()
///     .unwrap();
///
/// let parser = grammar
///     .build_parser()
///     .with_case_sensitive(false)
///     .with_recursion_limit(RecursionLimit::Fail);
///
/// let tree = parser.parse("select a FROM t")?.expect("input conforms");
/// assert_eq!(tree.label(), "<S>");
/// # Ok::<(), bnf_descent::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct GrammarParser<'gram> {
    grammar: &'gram Grammar,
    rules_by_name: HashMap<&'gram str, &'gram Rule>,
    options: ParserOptions,
}

impl<'gram> GrammarParser<'gram> {
    /// Construct a new `GrammarParser` with default options.
    ///
    /// Undefined non-terminals are reported when a parse reaches them; use
    /// [`Grammar::validate`] to check for them up front.
    #[must_use]
    pub fn new(grammar: &'gram Grammar) -> Self {
        let _span = tracing::span!(tracing::Level::DEBUG, "GrammarParser_new").entered();

        let rules_by_name = grammar.rules_iter().map(|rule| (rule.name(), rule)).collect();
        Self {
            grammar,
            rules_by_name,
            options: ParserOptions::default(),
        }
    }

    #[must_use]
    pub const fn options(&self) -> &ParserOptions {
        &self.options
    }

    #[must_use]
    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_max_recursion(mut self, max_recursion: usize) -> Self {
        self.options.max_recursion = max_recursion;
        self
    }

    #[must_use]
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.options.case_sensitive = case_sensitive;
        self
    }

    #[must_use]
    pub fn with_partial_parsing(mut self, partial: bool) -> Self {
        self.options.partial = partial;
        self
    }

    #[must_use]
    pub fn with_recursion_limit(mut self, recursion_limit: RecursionLimit) -> Self {
        self.options.recursion_limit = recursion_limit;
        self
    }

    /// Parse `input` from the grammar's start rule.
    ///
    /// The whole input, surrounding whitespace aside, must be consumed. An
    /// input that does not conform to the grammar yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// - `Error::NoStartRule` if the grammar is empty
    /// - `Error::UndefinedSymbol` if matching reaches an undefined non-terminal
    /// - `Error::RecursionLimitExceeded` if the bound is hit under [`RecursionLimit::Fail`]
    pub fn parse(&self, input: &str) -> Result<Option<ParseNode>, Error> {
        let start = self.grammar.start_rule().ok_or(Error::NoStartRule)?;
        self.parse_from(start, input)
    }

    /// Parse `input` starting from the rule `start` instead of the start rule.
    ///
    /// # Errors
    ///
    /// As [`GrammarParser::parse`], with `Error::UndefinedSymbol` if `start`
    /// names no rule.
    pub fn parse_starting_with(
        &self,
        start: &str,
        input: &str,
    ) -> Result<Option<ParseNode>, Error> {
        let rule = self
            .grammar
            .rule(start)
            .ok_or_else(|| Error::UndefinedSymbol(nonterminal_name(start).to_string()))?;
        self.parse_from(rule, input)
    }

    fn parse_from(&self, start: &Rule, input: &str) -> Result<Option<ParseNode>, Error> {
        let _span = tracing::span!(
            tracing::Level::DEBUG,
            "GrammarParser_parse",
            start = start.name()
        )
        .entered();

        // the start rule must account for the whole input
        let mut accept_whole = |node: ParseNode, end: usize| -> Result<Option<ParseNode>, Error> {
            if remainder(input, end).trim().is_empty() {
                return Ok(Some(node));
            }
            tracing::event!(
                tracing::Level::DEBUG,
                consumed = end,
                "derivation left input unconsumed"
            );
            Ok(None)
        };

        self.match_rule(start, input, 0, 0, &mut accept_whole)
    }

    /// Match `rule` at byte offset `pos` of `input`, handing each node it
    /// derives, with the offset just past it, to `then`. Alternatives are
    /// retried until `then` accepts one.
    fn match_rule(
        &self,
        rule: &Rule,
        input: &str,
        pos: usize,
        depth: usize,
        then: &mut Continuation<'_>,
    ) -> Result<Option<ParseNode>, Error> {
        if depth > self.options.max_recursion {
            tracing::event!(
                tracing::Level::TRACE,
                rule = rule.name(),
                depth,
                "recursion bound reached"
            );
            return match self.options.recursion_limit {
                RecursionLimit::Backtrack => Ok(None),
                RecursionLimit::Fail => {
                    Err(Error::RecursionLimitExceeded(self.options.max_recursion))
                }
            };
        }

        let _span = tracing::span!(
            tracing::Level::TRACE,
            "match_rule",
            rule = rule.name(),
            depth
        )
        .entered();

        for alt in rule.alternatives_iter() {
            if alt.is_empty() {
                continue;
            }
            let mut children = Vec::with_capacity(alt.tokens.len());
            let parsed =
                self.match_tokens(rule, &alt.tokens, input, pos, depth, &mut children, then)?;
            if parsed.is_some() {
                return Ok(parsed);
            }
        }

        Ok(None)
    }

    /// Match the remaining `tokens` of one alternative of `rule`. `children`
    /// holds the nodes matched so far and is restored before returning.
    #[allow(clippy::too_many_arguments)]
    fn match_tokens(
        &self,
        rule: &Rule,
        tokens: &[Token],
        input: &str,
        pos: usize,
        depth: usize,
        children: &mut Vec<ParseNode>,
        then: &mut Continuation<'_>,
    ) -> Result<Option<ParseNode>, Error> {
        let Some((token, rest_tokens)) = tokens.split_first() else {
            let mut node = ParseNode::nonterminal(rule.name());
            for child in children.iter() {
                node.add_child(child.clone());
            }
            return then(node, pos);
        };

        let pos = skip_whitespace(input, pos);
        let rest = remainder(input, pos);
        let mark = children.len();

        let parsed = match token {
            Token::Epsilon => {
                // nothing after ε is tried
                children.push(ParseNode::leaf(""));
                self.match_tokens(rule, &[], input, pos, depth, children, then)?
            }
            Token::Nonterminal(name) => {
                let placeholder = token.to_string();
                if self.options.partial && rest.starts_with(&placeholder) {
                    children.push(ParseNode::leaf(&placeholder));
                    let end = pos + placeholder.len();
                    self.match_tokens(rule, rest_tokens, input, end, depth, children, then)?
                } else {
                    let Some(sub_rule) = self.rules_by_name.get(name.as_str()) else {
                        tracing::event!(
                            tracing::Level::ERROR,
                            symbol = name.as_str(),
                            "undefined symbol"
                        );
                        return Err(Error::UndefinedSymbol(name.clone()));
                    };
                    self.match_rule(sub_rule, input, pos, depth + 1, &mut |child, end| {
                        children.push(child);
                        let parsed =
                            self.match_tokens(rule, rest_tokens, input, end, depth, children, then);
                        children.truncate(mark);
                        parsed
                    })?
                }
            }
            terminal => match self.match_terminal(terminal, rest) {
                Some((len, leaves)) => {
                    children.extend(leaves);
                    self.match_tokens(rule, rest_tokens, input, pos + len, depth, children, then)?
                }
                None => None,
            },
        };

        children.truncate(mark);
        Ok(parsed)
    }

    /// Leaves for a terminal matched at the start of `rest`, and the number of
    /// bytes it consumed. Terminals never match empty text.
    fn match_terminal(&self, terminal: &Token, rest: &str) -> Option<(usize, Vec<ParseNode>)> {
        if rest.is_empty() {
            return None;
        }

        if let Token::Regex(regex) = terminal {
            let (len, blocks) = regex.match_with_captures(rest).filter(|(len, _)| *len > 0)?;
            let mut leaves = Vec::with_capacity(blocks.len() + 1);
            leaves.push(ParseNode::leaf(rest.get(..len).unwrap_or_default()));
            leaves.extend(blocks.iter().map(String::as_str).map(ParseNode::leaf));
            return Some((len, leaves));
        }

        match terminal.match_prefix(rest, self.options.case_sensitive) {
            PrefixMatch::Matched(len) if len > 0 => {
                Some((len, vec![ParseNode::leaf(rest.get(..len).unwrap_or_default())]))
            }
            PrefixMatch::Undersized => {
                tracing::event!(tracing::Level::TRACE, "input too short for terminal");
                None
            }
            PrefixMatch::Matched(_) | PrefixMatch::Mismatch => None,
        }
    }
}

fn remainder(input: &str, pos: usize) -> &str {
    input.get(pos..).unwrap_or_default()
}

fn skip_whitespace(input: &str, pos: usize) -> usize {
    let rest = remainder(input, pos);
    pos + (rest.len() - rest.trim_start().len())
}
