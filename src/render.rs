//! Text renderings of a finished parse tree.
//!
//! Each renderer is a [`ParseNodeVisitor`] driven by
//! [`ParseNode::prefix_accept`]; none of them needs the grammar.

use crate::error::Error;
use crate::node::{ParseNode, ParseNodeVisitor};

/// A visitor that accumulates a textual rendering of the nodes it visits
pub trait OutputFormatVisitor: ParseNodeVisitor {
    /// The rendering of everything visited so far
    fn to_output_string(&self) -> String;
}

/// Walk `tree` in prefix order with `visitor` and return its rendering.
///
/// ```rust
/// use bnf_descent::{Grammar, render::{self, IndentedTextVisitor}};
///
/// let grammar: Grammar = "<S> := a <T>;\n<T> := b;".parse().unwrap();
/// let tree = grammar.parse("a b")?.expect("input conforms");
///
/// let text = render::render(&tree, IndentedTextVisitor::new())?;
/// assert_eq!(text, "<S>\n a\n <T>\n  b\n");
/// # Ok::<(), bnf_descent::Error>(())
/// ```
///
/// # Errors
///
/// Whatever the visitor's `visit` returns.
pub fn render<V: OutputFormatVisitor>(tree: &ParseNode, mut visitor: V) -> Result<String, Error> {
    tree.prefix_accept(&mut visitor)?;
    Ok(visitor.to_output_string())
}

/// One node per line, indented by one space per level of depth
#[derive(Debug, Default)]
pub struct IndentedTextVisitor {
    depth: usize,
    output: String,
}

impl IndentedTextVisitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ParseNodeVisitor for IndentedTextVisitor {
    fn visit(&mut self, node: &ParseNode) -> Result<(), Error> {
        let label = node.value().unwrap_or_else(|| node.label());
        self.output.extend(std::iter::repeat_n(' ', self.depth));
        self.output.push_str(label);
        self.output.push('\n');
        self.depth += 1;
        Ok(())
    }

    fn pop(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

impl OutputFormatVisitor for IndentedTextVisitor {
    fn to_output_string(&self) -> String {
        self.output.clone()
    }
}

/// A Graphviz DOT digraph with one vertex per node and parent-to-child edges
#[derive(Debug, Default)]
pub struct GraphvizVisitor {
    next_id: usize,
    parents: Vec<usize>,
    body: String,
}

impl GraphvizVisitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn dot_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

impl ParseNodeVisitor for GraphvizVisitor {
    fn visit(&mut self, node: &ParseNode) -> Result<(), Error> {
        let id = self.next_id;
        self.next_id += 1;

        let shape = if node.is_nonterminal() {
            "ellipse"
        } else {
            "box"
        };
        self.body.push_str(&format!(
            "  n{id} [label=\"{}\", shape={shape}];\n",
            dot_escape(node.label())
        ));
        if let Some(parent) = self.parents.last() {
            self.body.push_str(&format!("  n{parent} -> n{id};\n"));
        }
        self.parents.push(id);
        Ok(())
    }

    fn pop(&mut self) {
        self.parents.pop();
    }
}

impl OutputFormatVisitor for GraphvizVisitor {
    fn to_output_string(&self) -> String {
        format!("digraph G {{\n{}}}\n", self.body)
    }
}

/// An XML document: rules become elements named after the rule, matched text
/// becomes token elements
#[derive(Debug)]
pub struct XmlVisitor {
    top_element: String,
    token_element: String,
    open: Vec<Option<String>>,
    body: String,
}

impl Default for XmlVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlVisitor {
    pub const DEFAULT_TOP_ELEMENT: &'static str = "parsetree";
    pub const DEFAULT_TOKEN_ELEMENT: &'static str = "token";

    #[must_use]
    pub fn new() -> Self {
        Self::with_element_names(Self::DEFAULT_TOP_ELEMENT, Self::DEFAULT_TOKEN_ELEMENT)
    }

    /// Use `top` for the document element and `token` for matched text
    #[must_use]
    pub fn with_element_names(top: &str, token: &str) -> Self {
        Self {
            top_element: element_name(top),
            token_element: element_name(token),
            open: vec![],
            body: String::new(),
        }
    }

    fn indent(&mut self) {
        let depth = self.open.len() + 1;
        self.body.extend(std::iter::repeat_n(' ', depth * 2));
    }
}

/// An XML name for a rule: brackets dropped, other characters that cannot
/// appear in a name replaced by `_`
fn element_name(label: &str) -> String {
    let name: String = crate::token::nonterminal_name(label)
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match name.chars().next() {
        Some(first) if first.is_alphabetic() || first == '_' => name,
        _ => format!("_{name}"),
    }
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl ParseNodeVisitor for XmlVisitor {
    fn visit(&mut self, node: &ParseNode) -> Result<(), Error> {
        self.indent();
        if node.is_nonterminal() {
            let name = element_name(node.label());
            self.body.push_str(&format!("<{name}>\n"));
            self.open.push(Some(name));
        } else {
            let token = &self.token_element;
            let text = xml_escape(node.label());
            self.body.push_str(&format!("<{token}>{text}</{token}>\n"));
            self.open.push(None);
        }
        Ok(())
    }

    fn pop(&mut self) {
        if let Some(Some(name)) = self.open.pop() {
            self.indent();
            self.body.push_str(&format!("</{name}>\n"));
        }
    }
}

impl OutputFormatVisitor for XmlVisitor {
    fn to_output_string(&self) -> String {
        let top = &self.top_element;
        format!("<{top}>\n{}</{top}>\n", self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;
    use insta::assert_snapshot;

    fn tree() -> ParseNode {
        let grammar: Grammar = "<S> := <A> & <B>;
        <A> := ^(x)y;
        <B> := \"q\" | ε;"
            .parse()
            .unwrap();
        grammar.parse("xy & \"q\"").unwrap().unwrap()
    }

    #[test]
    fn indented_text() {
        let text = render(&tree(), IndentedTextVisitor::new()).unwrap();
        assert_snapshot!(text, @r#"
        <S>
         <A>
          xy
          x
         &
         <B>
          "q"
        "#);
    }

    #[test]
    fn graphviz() {
        let dot = render(&tree(), GraphvizVisitor::new()).unwrap();
        assert_snapshot!(dot, @r#"
        digraph G {
          n0 [label="<S>", shape=ellipse];
          n1 [label="<A>", shape=ellipse];
          n0 -> n1;
          n2 [label="xy", shape=box];
          n1 -> n2;
          n3 [label="x", shape=box];
          n1 -> n3;
          n4 [label="&", shape=box];
          n0 -> n4;
          n5 [label="<B>", shape=ellipse];
          n0 -> n5;
          n6 [label="\"q\"", shape=box];
          n5 -> n6;
        }
        "#);
    }

    #[test]
    fn xml() {
        let xml = render(&tree(), XmlVisitor::new()).unwrap();
        assert_snapshot!(xml, @r#"
        <parsetree>
          <S>
            <A>
              <token>xy</token>
              <token>x</token>
            </A>
            <token>&amp;</token>
            <B>
              <token>&quot;q&quot;</token>
            </B>
          </S>
        </parsetree>
        "#);
    }

    #[test]
    fn xml_custom_element_names() {
        let grammar: Grammar = "<my rule> := ε;".parse().unwrap();
        let tree = grammar.parse("").unwrap().unwrap();
        let xml = render(&tree, XmlVisitor::with_element_names("<doc>", "leaf")).unwrap();
        assert_eq!(
            xml,
            "<doc>\n  <my_rule>\n    <leaf></leaf>\n  </my_rule>\n</doc>\n"
        );
    }

    #[test]
    fn element_names_are_sanitised() {
        assert_eq!(element_name("<expr>"), "expr");
        assert_eq!(element_name("1st"), "_1st");
        assert_eq!(element_name("a b"), "a_b");
    }

    #[test]
    fn escapes() {
        assert_eq!(xml_escape("a<b>&'\""), "a&lt;b&gt;&amp;&apos;&quot;");
        assert_eq!(dot_escape("say \"hi\" \\"), "say \\\"hi\\\" \\\\");
    }

    #[test]
    fn renderers_are_reusable_through_the_trait() {
        let tree = tree();
        let renderers: Vec<Box<dyn OutputFormatVisitor>> = vec![
            Box::new(IndentedTextVisitor::new()),
            Box::new(GraphvizVisitor::new()),
            Box::new(XmlVisitor::new()),
        ];
        for mut renderer in renderers {
            tree.prefix_accept(renderer.as_mut()).unwrap();
            assert!(renderer.to_output_string().contains("<S>"));
        }
    }
}
