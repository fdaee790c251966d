#![allow(dead_code)]

use formula_params::{parse, CellSet, Context, Expression, ParamNode};

pub fn grid() -> CellSet {
    CellSet::new(100, 26)
}

pub fn ctx() -> Context {
    Context::new()
        .with_param("arg1", 10i64)
        .with_param("label", "total")
}

pub fn parse_tree(text: &str) -> ParamNode<Expression> {
    parse::<Expression>(text, &grid(), &ctx())
        .unwrap()
        .expect("expected a parameter tree")
}

/// Compact rendering of a tree's structure: branches as `<sep>[child,...]`, omitted
/// arguments as `_`, leaves as their expression text.
pub fn shape(node: Option<&ParamNode<Expression>>) -> String {
    let Some(node) = node else {
        return "_".to_string();
    };
    match node {
        ParamNode::Leaf(exp) => exp.to_string(),
        ParamNode::Branch { level, children } => {
            let children: Vec<String> = children.iter().map(|c| shape(c.as_ref())).collect();
            let sep = level.as_char().expect("branch level has a separator");
            format!("{sep}[{}]", children.join(","))
        }
    }
}
