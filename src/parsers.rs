use crate::error::Error;
use crate::grammar::Grammar;
use crate::rule::Rule;
use crate::token::{EPSILON, EPSILON_LUNATE, Token};
use crate::token_string::TokenString;
use crate::tracing;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till1, take_while_m_n},
    character::complete::{self, anychar, multispace0},
    combinator::{all_consuming, map_opt},
    multi::{fold_many0, many0},
    sequence::{delimited, preceded},
};

/// Separates the left- and right-hand sides of a rule
pub const RULE_SEPARATOR: &str = ":=";
/// Separates alternatives
pub const ALTERNATIVE_SEPARATOR: &str = "|";
/// Introduces the try-last group of alternatives
pub const STICKY_SEPARATOR: &str = "||";
/// Terminates a rule in grammar text
pub const RULE_TERMINATOR: char = ';';
/// Starts a comment running to the end of the line
pub const COMMENT: char = '#';

fn bracketed_name(input: &str) -> IResult<&str, &str> {
    delimited(
        complete::char('<'),
        take_till1(|c: char| c == '>'),
        complete::char('>'),
    )
    .parse(input)
}

fn rule_head(input: &str) -> IResult<&str, &str> {
    delimited(
        multispace0,
        bracketed_name,
        (multispace0, tag(RULE_SEPARATOR)),
    )
    .parse(input)
}

fn words(input: &str) -> IResult<&str, Vec<&str>> {
    let (input, words) =
        many0(preceded(multispace0, take_till1(char::is_whitespace))).parse(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, words))
}

fn unicode_escape(input: &str) -> IResult<&str, char> {
    map_opt(
        preceded(
            tag("\\u"),
            take_while_m_n(4, 4, |c: char| c.is_ascii_hexdigit()),
        ),
        |hex: &str| u32::from_str_radix(hex, 16).ok().and_then(char::from_u32),
    )
    .parse(input)
}

/// Replace `\uXXXX` escapes with the characters they denote
pub(crate) fn unescape(input: &str) -> Result<String, Error> {
    let (_, unescaped) = all_consuming(fold_many0(
        alt((unicode_escape, anychar)),
        String::new,
        |mut acc, c| {
            acc.push(c);
            acc
        },
    ))
    .parse(input)?;
    Ok(unescaped)
}

/// Classify one whitespace-free word of a rule's right-hand side
pub(crate) fn classify_word(word: &str) -> Result<Token, Error> {
    if word.is_empty() {
        return Err(Error::InvalidGrammar(String::from(
            "Trying to create an empty terminal token",
        )));
    }
    if word == EPSILON || word == EPSILON_LUNATE {
        return Ok(Token::Epsilon);
    }
    if word.starts_with('<') {
        return match all_consuming(bracketed_name).parse(word) {
            Ok((_, name)) => Ok(Token::Nonterminal(name.to_string())),
            Err(_) => Err(Error::InvalidGrammar(format!(
                "The expression '{word}' is not a well-formed non-terminal"
            ))),
        };
    }
    if word.contains('<') {
        return Err(Error::InvalidGrammar(format!(
            "The expression '{word}' contains tokens that are not separated by spaces"
        )));
    }
    if word.starts_with('^') {
        return Token::regex(word);
    }
    Ok(Token::Terminal(unescape(word)?))
}

fn alternative_from_words(words: &[&str], try_last: bool) -> Result<TokenString, Error> {
    if words.is_empty() {
        return Err(Error::InvalidGrammar(String::from(
            "Alternative of BNF rule is empty",
        )));
    }
    let tokens = words
        .iter()
        .map(|word| classify_word(word))
        .collect::<Result<Vec<_>, _>>()?;
    let mut alt = TokenString::from_parts(tokens);
    alt.set_try_last(try_last);
    Ok(alt)
}

/// Parse a single alternative, e.g. `( <S> )`
pub(crate) fn alternative(input: &str) -> Result<TokenString, Error> {
    let (_, words) = all_consuming(words).parse(input)?;
    alternative_from_words(&words, false)
}

/// Parse the right-hand side of a rule into its alternatives
fn alternatives(rhs: &str) -> Result<Vec<TokenString>, Error> {
    // a regex right-hand side is one alternative, spaces and bars included
    if rhs.starts_with('^') {
        return Ok(vec![TokenString::from_parts(vec![Token::regex(rhs)?])]);
    }

    let (_, words) = all_consuming(words).parse(rhs)?;
    let mut alternatives = vec![];
    let mut current: Vec<&str> = vec![];
    let mut sticky = false;

    for word in words {
        match word {
            ALTERNATIVE_SEPARATOR => {
                alternatives.push(alternative_from_words(&current, sticky)?);
                current.clear();
            }
            STICKY_SEPARATOR => {
                if sticky {
                    return Err(Error::InvalidGrammar(String::from(
                        "A BNF rule can only have one group of try-last alternatives",
                    )));
                }
                alternatives.push(alternative_from_words(&current, sticky)?);
                current.clear();
                sticky = true;
            }
            _ => current.push(word),
        }
    }
    alternatives.push(alternative_from_words(&current, sticky)?);

    Ok(alternatives)
}

/// Parse one rule, `<lhs> := alt1 | alt2 || sticky`, with an optional
/// terminating semicolon
pub(crate) fn rule(input: &str) -> Result<Rule, Error> {
    let text = input.trim();
    let text = text.strip_suffix(RULE_TERMINATOR).unwrap_or(text);

    if text.matches(RULE_SEPARATOR).count() != 1 {
        return Err(Error::InvalidGrammar(format!(
            "Cannot find left- and right-hand side of BNF rule '{text}'"
        )));
    }

    let (rhs, lhs) = rule_head(text).map_err(|e| {
        Error::InvalidGrammar(format!("Invalid left-hand side in BNF rule '{text}': {e}"))
    })?;

    let rhs = rhs.trim();
    if rhs.is_empty() {
        return Err(Error::InvalidGrammar(format!(
            "Right-hand side of BNF rule <{lhs}> is empty"
        )));
    }

    Ok(Rule::from_parts(lhs, alternatives(rhs)?))
}

/// Parse grammar text: `;`-terminated rules, possibly spanning several lines,
/// with `#` comments running to the end of a line
pub(crate) fn grammar(input: &str) -> Result<Grammar, Error> {
    let _span = tracing::span!(tracing::Level::DEBUG, "parsers::grammar").entered();

    let mut grammar = Grammar::new();
    let mut current = String::new();

    for line in input.lines() {
        let line = line.split_once(COMMENT).map_or(line, |(code, _)| code).trim();
        if line.is_empty() {
            continue;
        }
        current.push(' ');
        current.push_str(line);
        if line.ends_with(RULE_TERMINATOR) {
            grammar.add_rule(rule(&current)?);
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        return Err(Error::InvalidGrammar(format!(
            "Error parsing rule {leftover}: missing terminating '{RULE_TERMINATOR}'"
        )));
    }

    Ok(grammar)
}
