//! Example: parse a first-order temporal logic formula and print its parse
//! tree as a Graphviz digraph
//!
//! Pipe the output through `dot -Tsvg` to get a picture.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use bnf_descent::Grammar;
use bnf_descent::render::{self, GraphvizVisitor};

const LTL_FO: &str = r#"
<phi>      := <glob> | <next> | <not> | <and> | <or> | <implies> | <forall> | <exists> | <eq> | <paren> ;
<glob>     := G <phi> ;
<next>     := X <phi> ;
<not>      := ¬ <phi> ;
<and>      := ( <phi> ∧ <phi> ) ;
<or>       := ( <phi> ∨ <phi> ) ;
<implies>  := ( <phi> → <phi> ) ;
<forall>   := ( ∀ <var> ∈ <path> : <phi> ) ;
<exists>   := ( ∃ <var> ∈ <path> : <phi> ) ;
<eq>       := ( <term> = <term> ) ;
<paren>    := ( <phi> ) ;
<term>     := <var> | <constant> ;
<var>      := ^[a-z]\w* ;
<constant> := ^"[^"]*" ;
<path>     := ^(/\w+)+ ;
"#;

fn main() {
    let grammar: Grammar = match LTL_FO.parse() {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Failed to create grammar from BNF string: {e}");
            return;
        }
    };

    let formula = "G (∀ x ∈ /path/to/pingus : (∀ y ∈ /x/position : ((x = \"0\") → (X (∃ z ∈ /y/abcd : ((z = x) ∨ (z = y)))))))";

    match grammar.parse(formula) {
        Ok(Some(tree)) => match render::render(&tree, GraphvizVisitor::new()) {
            Ok(dot) => println!("{dot}"),
            Err(e) => eprintln!("Could not render the parse tree: {e}"),
        },
        Ok(None) => eprintln!("Grammar could not parse the formula"),
        Err(e) => eprintln!("Parsing failed: {e}"),
    }
}
