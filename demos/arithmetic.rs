//! Example: evaluate arithmetic expressions by folding their parse trees
//!
//! Each rule with a handler turns the values its children left on the stack
//! into one number; `<exp>` has none and simply passes its child through.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use bnf_descent::{Error, Grammar, ObjectBuilder, StackItem};

fn operands(rule: &str, args: &[StackItem<f64>]) -> Result<(f64, f64), Error> {
    match args {
        [StackItem::Object(l), StackItem::Object(r)] => Ok((*l, *r)),
        _ => Err(Error::BuildError(format!("<{rule}> expects two operands"))),
    }
}

fn main() {
    let grammar: Grammar = match include_str!("../tests/fixtures/arithmetic.bnf").parse() {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Failed to create grammar from BNF string: {e}");
            return;
        }
    };

    let mut calculator = ObjectBuilder::<f64>::new()
        .pop("num", |args| match args.as_slice() {
            [StackItem::Text(digits)] => digits
                .parse()
                .map(Some)
                .map_err(|e| Error::BuildError(format!("{e}"))),
            _ => Err(Error::BuildError(String::from("<num> expects its digits"))),
        })
        .pop_clean("add", |args| operands("add", &args).map(|(l, r)| Some(l + r)))
        .pop_clean("sub", |args| operands("sub", &args).map(|(l, r)| Some(l - r)))
        .pop_clean("mul", |args| operands("mul", &args).map(|(l, r)| Some(l * r)));

    for input in ["(2 + 3)", "((7 - 2) * (1 + 1))", "(4 *)", "(1 + (2 * (3 - 4)))"] {
        let tree = match grammar.parse(input) {
            Ok(tree) => tree,
            Err(e) => {
                eprintln!("{input}: {e}");
                continue;
            }
        };
        match calculator.build(tree.as_ref()) {
            Ok(Some(value)) => println!("{input} = {value}"),
            Ok(None) => println!("{input}: nothing to evaluate"),
            Err(e) => println!("{input}: {e}"),
        }
    }
}
