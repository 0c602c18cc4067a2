use crate::error::Error;
use crate::parsers;
use regex::Regex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The glyph written in grammar text for the empty string
pub const EPSILON: &str = "ε";

/// Alternative epsilon glyph (lunate epsilon), accepted when reading grammars
pub const EPSILON_LUNATE: &str = "ϵ";

/// Outcome of matching a terminal against the start of the remaining input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefixMatch {
    /// The token consumed this many bytes
    Matched(usize),
    /// The input is long enough but does not start with the token
    Mismatch,
    /// The input is shorter than the token, so it cannot possibly match
    Undersized,
}

impl PrefixMatch {
    /// Number of bytes consumed, if the token matched
    #[must_use]
    pub const fn consumed(self) -> Option<usize> {
        match self {
            PrefixMatch::Matched(len) => Some(len),
            PrefixMatch::Mismatch | PrefixMatch::Undersized => None,
        }
    }
}

/// A terminal described by a regular expression.
///
/// Identity is the pattern text; the compiled forms are derived from it.
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(try_from = "String", into = "String")
)]
pub struct RegexTerminal {
    pattern: String,
    regex: Regex,
    full: Regex,
}

impl RegexTerminal {
    /// Compile a regex terminal from its pattern
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidGrammar` if the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        let regex = Regex::new(pattern)?;
        let full = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            full,
        })
    }

    /// The pattern text, as written in the grammar
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Number of capturing groups in the pattern
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.regex.captures_len().saturating_sub(1)
    }

    fn match_prefix(&self, input: &str) -> PrefixMatch {
        match self.regex.find(input) {
            Some(m) if m.start() == 0 => PrefixMatch::Matched(m.end()),
            _ => PrefixMatch::Mismatch,
        }
    }

    /// Text of each capturing group for the match at the start of `input`, in
    /// group order. Groups that did not participate yield an empty string.
    #[must_use]
    pub fn capture_blocks(&self, input: &str) -> Vec<String> {
        self.match_with_captures(input)
            .map(|(_, blocks)| blocks)
            .unwrap_or_default()
    }

    /// Length of the match at the start of `input` together with its capture
    /// blocks, from a single run of the regex
    pub(crate) fn match_with_captures(&self, input: &str) -> Option<(usize, Vec<String>)> {
        let captures = self.regex.captures(input)?;
        let whole = captures.get(0).filter(|m| m.start() == 0)?;
        let blocks = captures
            .iter()
            .skip(1)
            .map(|group| group.map_or_else(String::new, |g| g.as_str().to_string()))
            .collect();
        Some((whole.end(), blocks))
    }
}

impl TryFrom<String> for RegexTerminal {
    type Error = Error;

    fn try_from(pattern: String) -> Result<Self, Self::Error> {
        Self::new(&pattern)
    }
}

impl From<RegexTerminal> for String {
    fn from(regex: RegexTerminal) -> Self {
        regex.pattern
    }
}

/// A symbol of a grammar
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum Token {
    /// A literal matched verbatim
    Terminal(String),
    /// A terminal matched by a regular expression anchored at the cursor
    Regex(RegexTerminal),
    /// Any run of non-whitespace characters
    Word(String),
    /// The empty string
    Epsilon,
    /// A reference to a rule, by name (without angle brackets)
    Nonterminal(String),
}

impl Token {
    /// Construct a literal terminal
    #[must_use]
    pub fn terminal(literal: &str) -> Self {
        Token::Terminal(literal.to_string())
    }

    /// Construct a non-terminal; surrounding angle brackets are optional
    #[must_use]
    pub fn nonterminal(name: &str) -> Self {
        Token::Nonterminal(nonterminal_name(name).to_string())
    }

    /// Construct a regex terminal
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidGrammar` if the pattern does not compile.
    pub fn regex(pattern: &str) -> Result<Self, Error> {
        RegexTerminal::new(pattern).map(Token::Regex)
    }

    /// Construct a generic word terminal
    #[must_use]
    pub fn word(label: &str) -> Self {
        Token::Word(label.to_string())
    }

    /// The token's text: literal, pattern, label, epsilon glyph or rule name
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Token::Terminal(s) | Token::Word(s) | Token::Nonterminal(s) => s,
            Token::Regex(r) => r.pattern(),
            Token::Epsilon => EPSILON,
        }
    }

    /// Whether this token is consumed directly from the input
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Token::Nonterminal(_))
    }

    #[must_use]
    pub const fn is_nonterminal(&self) -> bool {
        matches!(self, Token::Nonterminal(_))
    }

    #[must_use]
    pub const fn is_epsilon(&self) -> bool {
        matches!(self, Token::Epsilon)
    }

    /// Whether `other` is accepted by this token as a grammar element.
    ///
    /// Literals compare by text, regex terminals accept any token whose text
    /// the whole pattern matches, word terminals accept anything.
    #[must_use]
    pub fn matches(&self, other: &Token) -> bool {
        match self {
            Token::Terminal(s) => other.is_terminal() && other.label() == s,
            Token::Regex(r) => r.full.is_match(other.label()),
            Token::Word(_) => true,
            Token::Epsilon => other.is_epsilon(),
            Token::Nonterminal(s) => matches!(other, Token::Nonterminal(o) if o == s),
        }
    }

    /// Match this token against the start of `input`.
    ///
    /// Non-terminals carry no matching logic of their own and never match.
    #[must_use]
    pub fn match_prefix(&self, input: &str, case_sensitive: bool) -> PrefixMatch {
        match self {
            Token::Terminal(literal) => match_literal(literal, input, case_sensitive),
            Token::Regex(r) => r.match_prefix(input),
            Token::Word(_) => {
                PrefixMatch::Matched(input.find(char::is_whitespace).unwrap_or(input.len()))
            }
            Token::Epsilon => PrefixMatch::Matched(0),
            Token::Nonterminal(_) => PrefixMatch::Mismatch,
        }
    }
}

fn match_literal(literal: &str, input: &str, case_sensitive: bool) -> PrefixMatch {
    let width = literal.chars().count();
    let boundary = input
        .char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(input.len()))
        .nth(width);
    let Some(prefix) = boundary.and_then(|end| input.get(..end)) else {
        return PrefixMatch::Undersized;
    };
    let equal = if case_sensitive {
        prefix == literal
    } else {
        prefix.to_lowercase() == literal.to_lowercase()
    };
    if equal {
        PrefixMatch::Matched(prefix.len())
    } else {
        PrefixMatch::Mismatch
    }
}

/// Strip the angle brackets from a non-terminal reference, if present
#[must_use]
pub fn nonterminal_name(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(trimmed)
}

const fn discriminant(token: &Token) -> u8 {
    match token {
        Token::Terminal(_) => 0,
        Token::Regex(_) => 1,
        Token::Word(_) => 2,
        Token::Epsilon => 3,
        Token::Nonterminal(_) => 4,
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        discriminant(self) == discriminant(other) && self.label() == other.label()
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        discriminant(self).hash(state);
        self.label().hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Nonterminal(s) => write!(f, "<{s}>"),
            _ => write!(f, "{}", self.label()),
        }
    }
}

impl FromStr for Token {
    type Err = Error;

    /// Classify a single grammar word the way rule text is read
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parsers::classify_word(s.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};

    impl Arbitrary for Token {
        fn arbitrary(g: &mut Gen) -> Self {
            let text: String = String::arbitrary(g)
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .collect();
            let text = if text.is_empty() {
                String::from("t")
            } else {
                text
            };
            match u8::arbitrary(g) % 3 {
                0 => Token::Terminal(text),
                1 => Token::Nonterminal(text),
                _ => Token::Epsilon,
            }
        }
    }

    #[test]
    fn literal_matches_prefix() {
        let token = Token::terminal("SELECT");
        assert_eq!(
            token.match_prefix("SELECT a FROM t", true),
            PrefixMatch::Matched(6)
        );
    }

    #[test]
    fn literal_mismatch_differs_from_undersized() {
        let token = Token::terminal("FROM");
        assert_eq!(token.match_prefix("WHERE", true), PrefixMatch::Mismatch);
        assert_eq!(token.match_prefix("FR", true), PrefixMatch::Undersized);
        assert_eq!(token.match_prefix("FR", true).consumed(), None);
    }

    #[test]
    fn literal_case_insensitive() {
        let token = Token::terminal("select");
        assert_eq!(token.match_prefix("SELECT a", true), PrefixMatch::Mismatch);
        assert_eq!(
            token.match_prefix("SELECT a", false),
            PrefixMatch::Matched(6)
        );
    }

    #[test]
    fn literal_unicode_width() {
        let token = Token::terminal("∃");
        assert_eq!(
            token.match_prefix("∃ x", true),
            PrefixMatch::Matched("∃".len())
        );
        assert_eq!(token.match_prefix("", true), PrefixMatch::Undersized);
    }

    #[test]
    fn regex_matches_only_at_cursor() {
        let token = Token::regex("^[0-9]+").unwrap();
        assert_eq!(token.match_prefix("123 abc", true), PrefixMatch::Matched(3));
        assert_eq!(token.match_prefix("abc 123", true), PrefixMatch::Mismatch);

        let unanchored = Token::regex("[0-9]+").unwrap();
        assert_eq!(
            unanchored.match_prefix("abc 123", true),
            PrefixMatch::Mismatch
        );
    }

    #[test]
    fn regex_capture_blocks() {
        let regex = RegexTerminal::new("^(a)(b)(c)?").unwrap();
        assert_eq!(regex.group_count(), 3);
        assert_eq!(
            regex.capture_blocks("abd"),
            vec![String::from("a"), String::from("b"), String::new()]
        );
        assert_eq!(
            regex.match_with_captures("abd"),
            Some((2, vec![String::from("a"), String::from("b"), String::new()]))
        );
        assert!(regex.capture_blocks("xab").is_empty());
    }

    #[test]
    fn regex_captures_only_at_start() {
        let unanchored = RegexTerminal::new("[0-9]+").unwrap();
        assert_eq!(unanchored.match_with_captures("42 x"), Some((2, vec![])));
        assert_eq!(unanchored.match_with_captures("x 42"), None);
    }

    #[test]
    fn invalid_regex() {
        assert!(matches!(
            Token::regex("^(oops"),
            Err(Error::InvalidGrammar(_))
        ));
    }

    #[test]
    fn word_stops_at_whitespace() {
        let token = Token::word("string");
        assert_eq!(token.match_prefix("abc def", true), PrefixMatch::Matched(3));
        assert_eq!(token.match_prefix("abc", true), PrefixMatch::Matched(3));
    }

    #[test]
    fn epsilon_always_matches_empty() {
        assert_eq!(Token::Epsilon.match_prefix("", true), PrefixMatch::Matched(0));
        assert_eq!(
            Token::Epsilon.match_prefix("abc", true),
            PrefixMatch::Matched(0)
        );
    }

    #[test]
    fn token_vs_token() {
        assert!(Token::terminal("foo").matches(&Token::terminal("foo")));
        assert!(!Token::terminal("foo").matches(&Token::nonterminal("foo")));
        assert!(Token::regex("^[a-z]+").unwrap().matches(&Token::terminal("abc")));
        assert!(!Token::regex("^[a-z]+").unwrap().matches(&Token::terminal("abc1")));
        assert!(Token::word("x").matches(&Token::nonterminal("anything")));
        assert!(Token::Epsilon.matches(&Token::Epsilon));
        assert!(Token::nonterminal("<A>").matches(&Token::nonterminal("A")));
    }

    #[test]
    fn identity_is_text() {
        assert_eq!(Token::terminal("a"), Token::terminal("a"));
        assert_ne!(Token::terminal("a"), Token::nonterminal("a"));
        assert_eq!(Token::regex("^a").unwrap(), Token::regex("^a").unwrap());

        let set: hashbrown::HashSet<Token> = [Token::terminal("("), Token::terminal("(")]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn display() {
        assert_eq!(Token::nonterminal("S").to_string(), "<S>");
        assert_eq!(Token::terminal("(").to_string(), "(");
        assert_eq!(Token::Epsilon.to_string(), EPSILON);
        assert_eq!(Token::regex("^a+").unwrap().to_string(), "^a+");
    }

    #[test]
    fn parse_words() {
        assert_eq!("<dna>".parse::<Token>(), Ok(Token::nonterminal("dna")));
        assert_eq!("ε".parse::<Token>(), Ok(Token::Epsilon));
        assert_eq!("ϵ".parse::<Token>(), Ok(Token::Epsilon));
        assert_eq!("FROM".parse::<Token>(), Ok(Token::terminal("FROM")));
        assert_eq!("^[0-9]+".parse::<Token>(), Token::regex("^[0-9]+"));
        assert!("a<b>".parse::<Token>().is_err());
    }

    #[test]
    fn names_strip_brackets() {
        assert_eq!(nonterminal_name("<S>"), "S");
        assert_eq!(nonterminal_name("S"), "S");
        assert_eq!(nonterminal_name(" <S> "), "S");
    }
}
