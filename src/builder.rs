//! Fold a finished parse tree into a caller-defined object.
//!
//! An [`ObjectBuilder`] walks the tree in postfix order with an evaluation
//! stack. Terminal leaves push their text. A non-terminal with a registered
//! handler consumes the values its children left on the stack and may push a
//! result; a non-terminal without one leaves the stack untouched, so its
//! children's values flow through to the enclosing rule.
//!
//! ```rust
//! use bnf_descent::{Error, Grammar, ObjectBuilder, StackItem};
//!
//! let grammar: Grammar = "<exp> := <add> | <num>;
//! <add> := ( <exp> + <exp> );
//! <num> := ^[0-9]+;"
//!     .parse()?;
//! let tree = grammar.parse("(1 + (2 + 3))")?;
//!
//! let mut builder = ObjectBuilder::<i64>::new()
//!     .pop("num", |args| match args.as_slice() {
//!         [StackItem::Text(digits)] => digits
//!             .parse()
//!             .map(Some)
//!             .map_err(|e| Error::BuildError(format!("{e}"))),
//!         _ => Err(Error::BuildError(String::from("<num> expects its digits"))),
//!     })
//!     .pop_clean("add", |args| match args.as_slice() {
//!         [StackItem::Object(l), StackItem::Object(r)] => Ok(Some(l + r)),
//!         _ => Err(Error::BuildError(String::from("<add> expects two operands"))),
//!     });
//!
//! assert_eq!(builder.build(tree.as_ref())?, Some(6));
//! # Ok::<(), bnf_descent::Error>(())
//! ```

use crate::HashMap;
use crate::error::Error;
use crate::node::{ParseNode, ParseNodeVisitor};
use crate::token::nonterminal_name;
use crate::tracing;

/// A value on the evaluation stack: the text of a terminal leaf, or an
/// object produced by a handler
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackItem<T> {
    Text(String),
    Object(T),
}

impl<T> StackItem<T> {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StackItem::Text(text) => Some(text),
            StackItem::Object(_) => None,
        }
    }

    #[must_use]
    pub const fn as_object(&self) -> Option<&T> {
        match self {
            StackItem::Object(object) => Some(object),
            StackItem::Text(_) => None,
        }
    }

    #[must_use]
    pub fn into_object(self) -> Option<T> {
        match self {
            StackItem::Object(object) => Some(object),
            StackItem::Text(_) => None,
        }
    }
}

/// How a handler receives its operands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallingConvention {
    /// The handler gets the whole stack and pops and pushes as it sees fit
    Raw,
    /// One value per child of the node is popped and handed over, left to right
    Pop,
    /// As `Pop`, but values that came from terminal leaves are dropped
    PopClean,
}

/// The evaluation stack; the top is the last element
pub type Stack<T> = Vec<StackItem<T>>;

type RawFn<'a, T> = Box<dyn FnMut(&mut Stack<T>) -> Result<(), Error> + 'a>;
type PopFn<'a, T> = Box<dyn FnMut(Vec<StackItem<T>>) -> Result<Option<T>, Error> + 'a>;
type PreVisitFn<'a> = Box<dyn FnMut() + 'a>;
type PostVisitFn<'a, T> = Box<dyn FnMut(Stack<T>) -> Result<Option<T>, Error> + 'a>;

enum Handler<'a, T> {
    Raw(RawFn<'a, T>),
    Pop { clean: bool, handler: PopFn<'a, T> },
}

impl<T> Handler<'_, T> {
    const fn convention(&self) -> CallingConvention {
        match self {
            Handler::Raw(_) => CallingConvention::Raw,
            Handler::Pop { clean: false, .. } => CallingConvention::Pop,
            Handler::Pop { clean: true, .. } => CallingConvention::PopClean,
        }
    }
}

/// A table of per-rule handlers that folds parse trees into `T`s.
///
/// Handlers are keyed by rule name (angle brackets optional); registering a
/// second handler for the same rule replaces the first. Every [`build`]
/// starts from a fresh stack.
///
/// [`build`]: ObjectBuilder::build
pub struct ObjectBuilder<'a, T> {
    handlers: HashMap<String, Handler<'a, T>>,
    pre_visit: Option<PreVisitFn<'a>>,
    post_visit: Option<PostVisitFn<'a, T>>,
}

impl<T> Default for ObjectBuilder<'_, T> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            pre_visit: None,
            post_visit: None,
        }
    }
}

impl<T> std::fmt::Debug for ObjectBuilder<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut rules: Vec<_> = self
            .handlers
            .iter()
            .map(|(rule, handler)| (rule.as_str(), handler.convention()))
            .collect();
        rules.sort_unstable_by_key(|(rule, _)| *rule);
        f.debug_struct("ObjectBuilder")
            .field("handlers", &rules)
            .finish_non_exhaustive()
    }
}

fn handler_key(rule: &str) -> String {
    format!("<{}>", nonterminal_name(rule))
}

impl<'a, T> ObjectBuilder<'a, T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler that manipulates the stack directly. It should pop
    /// one value per child of the node and push at most one result.
    #[must_use]
    pub fn raw(
        mut self,
        rule: &str,
        handler: impl FnMut(&mut Stack<T>) -> Result<(), Error> + 'a,
    ) -> Self {
        self.handlers
            .insert(handler_key(rule), Handler::Raw(Box::new(handler)));
        self
    }

    /// Register a handler receiving one value per child of the node, in
    /// order. A returned object is pushed onto the stack.
    #[must_use]
    pub fn pop(
        mut self,
        rule: &str,
        handler: impl FnMut(Vec<StackItem<T>>) -> Result<Option<T>, Error> + 'a,
    ) -> Self {
        self.handlers.insert(
            handler_key(rule),
            Handler::Pop {
                clean: false,
                handler: Box::new(handler),
            },
        );
        self
    }

    /// As [`ObjectBuilder::pop`], but only the values of children that are
    /// themselves non-terminals are handed over.
    #[must_use]
    pub fn pop_clean(
        mut self,
        rule: &str,
        handler: impl FnMut(Vec<StackItem<T>>) -> Result<Option<T>, Error> + 'a,
    ) -> Self {
        self.handlers.insert(
            handler_key(rule),
            Handler::Pop {
                clean: true,
                handler: Box::new(handler),
            },
        );
        self
    }

    /// Run `hook` at the start of every build
    #[must_use]
    pub fn on_pre_visit(mut self, hook: impl FnMut() + 'a) -> Self {
        self.pre_visit = Some(Box::new(hook));
        self
    }

    /// Produce the result from the final stack instead of taking its top
    #[must_use]
    pub fn on_post_visit(
        mut self,
        hook: impl FnMut(Stack<T>) -> Result<Option<T>, Error> + 'a,
    ) -> Self {
        self.post_visit = Some(Box::new(hook));
        self
    }

    /// The calling convention registered for `rule`, if any
    #[must_use]
    pub fn convention(&self, rule: &str) -> Option<CallingConvention> {
        self.handlers
            .get(&handler_key(rule))
            .map(Handler::convention)
    }

    /// Fold `tree` into a `T`.
    ///
    /// Without a post-visit hook the result is the object on top of the
    /// final stack, or `None` if the stack is empty.
    ///
    /// # Errors
    ///
    /// `Error::BuildError` if `tree` is absent, if a node has fewer values on
    /// the stack than children, or if the final top of the stack is text.
    /// Errors returned by handlers or hooks are passed through.
    pub fn build<'t>(
        &mut self,
        tree: impl Into<Option<&'t ParseNode>>,
    ) -> Result<Option<T>, Error> {
        let Some(tree) = tree.into() else {
            return Err(Error::BuildError(String::from("The input tree is absent")));
        };
        let _span = tracing::span!(tracing::Level::DEBUG, "ObjectBuilder_build").entered();

        if let Some(pre_visit) = self.pre_visit.as_mut() {
            pre_visit();
        }

        let mut visitor = BuildVisitor {
            handlers: &mut self.handlers,
            stack: Stack::new(),
        };
        tree.postfix_accept(&mut visitor)?;
        let stack = visitor.stack;

        match self.post_visit.as_mut() {
            Some(post_visit) => post_visit(stack),
            None => top_of_stack(stack),
        }
    }
}

fn top_of_stack<T>(mut stack: Stack<T>) -> Result<Option<T>, Error> {
    match stack.pop() {
        None => Ok(None),
        Some(StackItem::Object(object)) => Ok(Some(object)),
        Some(StackItem::Text(text)) => Err(Error::BuildError(format!(
            "Expected a built object on top of the stack, found text '{text}'"
        ))),
    }
}

struct BuildVisitor<'h, 'a, T> {
    handlers: &'h mut HashMap<String, Handler<'a, T>>,
    stack: Stack<T>,
}

impl<T> ParseNodeVisitor for BuildVisitor<'_, '_, T> {
    fn visit(&mut self, node: &ParseNode) -> Result<(), Error> {
        if !node.is_nonterminal() {
            self.stack.push(StackItem::Text(node.label().to_string()));
            return Ok(());
        }

        let Some(handler) = self.handlers.get_mut(node.label()) else {
            return Ok(());
        };

        match handler {
            Handler::Raw(handler) => handler(&mut self.stack),
            Handler::Pop { clean, handler } => {
                let arity = node.children_iter().count();
                let Some(split) = self.stack.len().checked_sub(arity) else {
                    return Err(Error::BuildError(format!(
                        "{} expects {arity} values but the stack holds {}",
                        node.label(),
                        self.stack.len()
                    )));
                };
                let popped = self.stack.split_off(split);
                let args = if *clean {
                    popped
                        .into_iter()
                        .zip(node.children_iter())
                        .filter(|(_, child)| child.is_nonterminal())
                        .map(|(arg, _)| arg)
                        .collect()
                } else {
                    popped
                };
                if let Some(object) = handler(args)? {
                    self.stack.push(StackItem::Object(object));
                }
                Ok(())
            }
        }
    }
}
