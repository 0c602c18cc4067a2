use crate::error::Error;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A node of a parse tree.
///
/// Non-terminal nodes are labelled `<name>` and carry that label as their
/// value; terminal leaves hold the matched input text and no value. Each node
/// owns its children outright.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct ParseNode {
    label: String,
    #[cfg_attr(feature = "serde", serde(default))]
    value: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    children: Vec<ParseNode>,
}

/// Callbacks driven by [`ParseNode::prefix_accept`] and [`ParseNode::postfix_accept`]
pub trait ParseNodeVisitor {
    /// Called once per node. An error aborts the traversal.
    ///
    /// # Errors
    ///
    /// Whatever the visitor decides; conventionally `Error::VisitError`.
    fn visit(&mut self, node: &ParseNode) -> Result<(), Error>;

    /// Called when the traversal leaves a node
    fn pop(&mut self) {}
}

impl ParseNode {
    pub(crate) fn nonterminal(name: &str) -> Self {
        let label = format!("<{name}>");
        Self {
            value: Some(label.clone()),
            label,
            children: vec![],
        }
    }

    pub(crate) fn leaf(text: &str) -> Self {
        Self {
            label: text.to_string(),
            value: None,
            children: vec![],
        }
    }

    pub(crate) fn add_child(&mut self, child: ParseNode) {
        self.children.push(child);
    }

    /// The matched text of a leaf, or `<name>` for a non-terminal
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Set for non-terminal nodes only
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Whether this node is the expansion of a rule
    #[must_use]
    pub const fn is_nonterminal(&self) -> bool {
        self.value.is_some()
    }

    /// A copy of this node's children, in order
    #[must_use]
    pub fn children(&self) -> Vec<ParseNode> {
        self.children.clone()
    }

    /// Iterate this node's children without copying them
    pub fn children_iter(&self) -> impl Iterator<Item = &ParseNode> {
        self.children.iter()
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in the tree rooted here, this one included
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(ParseNode::size).sum::<usize>()
    }

    /// Deep copy of the tree rooted here
    #[must_use]
    pub fn duplicate(&self) -> ParseNode {
        self.clone()
    }

    /// Visit this node, then each child subtree, then pop.
    ///
    /// # Errors
    ///
    /// Stops at, and returns, the first error raised by `visitor.visit`.
    pub fn prefix_accept<V: ParseNodeVisitor + ?Sized>(
        &self,
        visitor: &mut V,
    ) -> Result<(), Error> {
        visitor.visit(self)?;
        for child in &self.children {
            child.prefix_accept(visitor)?;
        }
        visitor.pop();
        Ok(())
    }

    /// Visit each child subtree, then this node, then pop.
    ///
    /// # Errors
    ///
    /// Stops at, and returns, the first error raised by `visitor.visit`.
    pub fn postfix_accept<V: ParseNodeVisitor + ?Sized>(
        &self,
        visitor: &mut V,
    ) -> Result<(), Error> {
        for child in &self.children {
            child.postfix_accept(visitor)?;
        }
        visitor.visit(self)?;
        visitor.pop();
        Ok(())
    }

    /// Nodes reached by a `.`-separated path of labels, starting with this
    /// node's own label.
    ///
    /// A segment `label[i]` only follows the `i`-th child with that label; a
    /// plain `label` follows all of them. A final `*` selects every child of
    /// the nodes reached so far.
    ///
    /// ```rust
    /// use bnf_descent::Grammar;
    ///
    /// let grammar: Grammar = "<S> := <A> <A>;\n<A> := a | b;".parse().unwrap();
    /// let tree = grammar.parse("a b")?.expect("input conforms");
    ///
    /// assert_eq!(tree.select("<S>.<A>").len(), 2);
    /// let second = tree.select_first("<S>.<A>[1].*").expect("second <A> has a child");
    /// assert_eq!(second.label(), "b");
    /// # Ok::<(), bnf_descent::Error>(())
    /// ```
    #[must_use]
    pub fn select(&self, path: &str) -> Vec<&ParseNode> {
        let segments: Vec<&str> = path.split('.').collect();
        let mut selected = vec![];
        select_into(std::slice::from_ref(self), &segments, &mut selected);
        selected
    }

    /// The first node [`ParseNode::select`] would return
    #[must_use]
    pub fn select_first(&self, path: &str) -> Option<&ParseNode> {
        self.select(path).into_iter().next()
    }
}

fn split_index(segment: &str) -> (&str, Option<usize>) {
    segment
        .strip_suffix(']')
        .and_then(|s| s.rsplit_once('['))
        .and_then(|(label, index)| index.parse().ok().map(|i| (label, Some(i))))
        .unwrap_or((segment, None))
}

fn select_into<'a>(nodes: &'a [ParseNode], segments: &[&str], selected: &mut Vec<&'a ParseNode>) {
    let Some((segment, rest)) = segments.split_first() else {
        return;
    };
    if *segment == "*" && rest.is_empty() {
        selected.extend(nodes);
        return;
    }

    let (label, index) = split_index(segment);
    let matching = nodes
        .iter()
        .filter(|node| node.label == label)
        .enumerate()
        .filter(|(i, _)| index.is_none_or(|wanted| wanted == *i))
        .map(|(_, node)| node);

    for node in matching {
        if rest.is_empty() {
            selected.push(node);
        } else {
            select_into(&node.children, rest, selected);
        }
    }
}

// A set of column indices, used for tracking which columns are active when formatting a `ParseNode`
type ParseNodeFormatSet = std::collections::HashSet<usize>;

impl ParseNode {
    fn fmt_tree(
        &self,
        f: &mut fmt::Formatter<'_>,
        depth_format_set: &mut ParseNodeFormatSet,
        depth: usize,
        is_last_child: bool,
    ) -> fmt::Result {
        // set the current column index as "active" while children are printed
        if !self.children.is_empty() {
            depth_format_set.insert(depth);
        }

        Self::fmt_node_prefix(f, depth_format_set, depth, is_last_child)?;

        if self.is_nonterminal() {
            writeln!(f, "{}", self.label)?;
        } else {
            writeln!(f, "\"{}\"", self.label)?;
        }

        let child_depth = depth + 1;
        let last_child_idx = self.children.len().saturating_sub(1);

        for (idx, child) in self.children.iter().enumerate() {
            let is_last_child = idx == last_child_idx;
            if is_last_child {
                depth_format_set.remove(&depth);
            }
            child.fmt_tree(f, depth_format_set, child_depth, is_last_child)?;
        }

        Ok(())
    }

    fn fmt_node_prefix(
        f: &mut fmt::Formatter,
        depth_format_set: &ParseNodeFormatSet,
        depth: usize,
        is_last_child: bool,
    ) -> fmt::Result {
        const CHILD_PREFIX: &str = "├── ";
        const GRANDCHILD_PREFIX: &str = "│   ";
        const LAST_CHILD_PREFIX: &str = "└── ";
        const LAST_GRANDCHILD_PREFIX: &str = "    ";

        for idx in 0..depth {
            let prefix = if (idx + 1) == depth {
                if is_last_child {
                    LAST_CHILD_PREFIX
                } else {
                    CHILD_PREFIX
                }
            } else if depth_format_set.contains(&idx) {
                GRANDCHILD_PREFIX
            } else {
                LAST_GRANDCHILD_PREFIX
            };
            write!(f, "{prefix}")?;
        }

        Ok(())
    }
}

impl fmt::Display for ParseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, &mut ParseNodeFormatSet::new(), 0, true)
    }
}
