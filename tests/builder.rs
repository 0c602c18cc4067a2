#![cfg(test)]

use bnf_descent::{CallingConvention, Error, Grammar, ObjectBuilder, Stack, StackItem};
use std::cell::Cell;
use std::sync::LazyLock;

static ARITHMETIC: LazyLock<Grammar> =
    LazyLock::new(|| include_str!("fixtures/arithmetic.bnf").parse().unwrap());

static LTL: LazyLock<Grammar> =
    LazyLock::new(|| include_str!("fixtures/ltl.bnf").parse().unwrap());

fn number(args: Vec<StackItem<i64>>) -> Result<Option<i64>, Error> {
    match args.as_slice() {
        [StackItem::Text(digits)] => digits
            .parse()
            .map(Some)
            .map_err(|e| Error::BuildError(format!("{e}"))),
        _ => Err(Error::BuildError(format!("bad <num> operands: {args:?}"))),
    }
}

fn binary(
    op: fn(i64, i64) -> i64,
) -> impl FnMut(Vec<StackItem<i64>>) -> Result<Option<i64>, Error> {
    move |args| match args.as_slice() {
        [StackItem::Object(l), StackItem::Object(r)] => Ok(Some(op(*l, *r))),
        _ => Err(Error::BuildError(format!("bad operands: {args:?}"))),
    }
}

fn calculator<'a>() -> ObjectBuilder<'a, i64> {
    ObjectBuilder::new()
        .pop("num", number)
        .pop_clean("add", binary(|l, r| l + r))
        .pop_clean("sub", binary(|l, r| l - r))
        .pop_clean("mul", binary(|l, r| l * r))
}

#[test]
fn evaluate_arithmetic() {
    let mut builder = calculator();
    let cases = [
        ("7", 7),
        ("(1 + 2)", 3),
        ("((10 - 4) * (2 + 3))", 30),
        ("(100 - (1 - (2 - 3)))", 98),
    ];
    for (input, expected) in cases {
        let tree = ARITHMETIC.parse(input).unwrap();
        assert_eq!(builder.build(tree.as_ref()), Ok(Some(expected)), "{input}");
    }
}

#[test]
fn builder_is_reusable_and_starts_fresh() {
    let mut builder = calculator();
    let first = ARITHMETIC.parse("(2 * 21)").unwrap();
    let second = ARITHMETIC.parse("(1 + 1)").unwrap();
    assert_eq!(builder.build(first.as_ref()), Ok(Some(42)));
    assert_eq!(builder.build(second.as_ref()), Ok(Some(2)));
    assert_eq!(builder.build(first.as_ref()), Ok(Some(42)));
}

#[test]
fn failed_parse_cannot_be_built() {
    let mut builder = calculator();
    let tree = ARITHMETIC.parse("(1 +)").unwrap();
    assert!(tree.is_none());
    assert!(matches!(builder.build(tree.as_ref()), Err(Error::BuildError(_))));
}

#[test]
fn handler_errors_propagate() {
    let mut builder = calculator().pop("num", |_| {
        Err(Error::BuildError(String::from("numbers are forbidden")))
    });
    let tree = ARITHMETIC.parse("(1 + 2)").unwrap();
    assert_eq!(
        builder.build(tree.as_ref()),
        Err(Error::BuildError(String::from("numbers are forbidden")))
    );
}

#[test]
fn text_left_on_top_is_an_error() {
    // without a <num> handler the digits stay on the stack as text
    let mut builder = ObjectBuilder::<i64>::new();
    let tree = ARITHMETIC.parse("12").unwrap();
    assert!(matches!(builder.build(tree.as_ref()), Err(Error::BuildError(_))));
}

#[test]
fn conventions() {
    let builder = calculator().raw("<exp>", |_stack: &mut Stack<i64>| Ok(()));
    assert_eq!(builder.convention("num"), Some(CallingConvention::Pop));
    assert_eq!(builder.convention("<add>"), Some(CallingConvention::PopClean));
    assert_eq!(builder.convention("exp"), Some(CallingConvention::Raw));
    assert_eq!(builder.convention("div"), None);
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Formula {
    Atom(String),
    Not(Box<Formula>),
    Globally(Box<Formula>),
    Next(Box<Formula>),
    And(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
    Implies(Box<Formula>, Box<Formula>),
}

fn pop_object(stack: &mut Stack<Formula>) -> Result<Formula, Error> {
    stack
        .pop()
        .and_then(StackItem::into_object)
        .ok_or_else(|| Error::BuildError(String::from("expected a formula")))
}

fn pop_text(stack: &mut Stack<Formula>) -> Result<String, Error> {
    match stack.pop() {
        Some(StackItem::Text(text)) => Ok(text),
        _ => Err(Error::BuildError(String::from("expected a token"))),
    }
}

/// `( <phi> op <phi> )` with raw stack access: five values, last child on top
fn raw_binary(
    make: fn(Box<Formula>, Box<Formula>) -> Formula,
) -> impl FnMut(&mut Stack<Formula>) -> Result<(), Error> {
    move |stack| {
        pop_text(stack)?;
        let right = pop_object(stack)?;
        pop_text(stack)?;
        let left = pop_object(stack)?;
        pop_text(stack)?;
        stack.push(StackItem::Object(make(Box::new(left), Box::new(right))));
        Ok(())
    }
}

fn unary(
    make: fn(Box<Formula>) -> Formula,
) -> impl FnMut(Vec<StackItem<Formula>>) -> Result<Option<Formula>, Error> {
    move |args| match args.into_iter().next() {
        Some(StackItem::Object(inner)) => Ok(Some(make(Box::new(inner)))),
        _ => Err(Error::BuildError(String::from("expected one operand"))),
    }
}

fn formula_builder<'a>() -> ObjectBuilder<'a, Formula> {
    ObjectBuilder::new()
        .pop("atom", |args| {
            Ok(args
                .first()
                .and_then(StackItem::as_text)
                .map(|name| Formula::Atom(name.to_string())))
        })
        .pop_clean("not", unary(Formula::Not))
        .pop_clean("glob", unary(Formula::Globally))
        .pop_clean("next", unary(Formula::Next))
        .raw("and", raw_binary(Formula::And))
        .raw("or", raw_binary(Formula::Or))
        .raw("implies", raw_binary(Formula::Implies))
}

#[test]
fn build_ltl_syntax_tree() {
    use Formula::*;
    let atom = |name: &str| Box::new(Atom(name.to_string()));

    let tree = LTL.parse("G (req -> X (ack v !req))").unwrap();
    let formula = formula_builder().build(tree.as_ref()).unwrap();

    assert_eq!(
        formula,
        Some(Globally(Box::new(Implies(
            atom("req"),
            Box::new(Next(Box::new(Or(atom("ack"), Box::new(Not(atom("req"))))))),
        ))))
    );
}

#[test]
fn hooks_run_around_each_build() {
    let builds = Cell::new(0);
    let mut builder = formula_builder()
        .on_pre_visit(|| builds.set(builds.get() + 1))
        .on_post_visit(|mut stack| {
            // keep the outermost formula, wrapped in a negation
            Ok(stack
                .pop()
                .and_then(StackItem::into_object)
                .map(|f| Formula::Not(Box::new(f))))
        });

    let tree = LTL.parse("p").unwrap();
    let built = builder.build(tree.as_ref()).unwrap();
    assert_eq!(
        built,
        Some(Formula::Not(Box::new(Formula::Atom(String::from("p")))))
    );
    builder.build(tree.as_ref()).unwrap();
    drop(builder);
    assert_eq!(builds.get(), 2);
}
