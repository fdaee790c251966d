mod common;

use std::borrow::Cow;

use common::{ctx, grid, parse_tree, shape};
use formula_params::{
    parse_with_options, CellRef, Expression, ParamError, ParamNode, ParseOptions, Separator,
    Value,
};
use pretty_assertions::assert_eq;

fn unoptimized(text: &str) -> ParamNode<Expression> {
    let options = ParseOptions {
        optimize: false,
        ..ParseOptions::default()
    };
    parse_with_options::<Expression>(text, &grid(), &ctx(), options)
        .unwrap()
        .expect("expected a parameter tree")
}

fn texts(exprs: &[Option<&Expression>]) -> Vec<String> {
    exprs
        .iter()
        .map(|e| e.map_or_else(|| "_".to_string(), ToString::to_string))
        .collect()
}

#[test]
fn leaf_expression_requires_a_leaf() {
    let tree = parse_tree("x");
    assert_eq!(tree.leaf_expression().unwrap().to_string(), "x");

    let tree = parse_tree("x,y");
    assert_eq!(
        tree.leaf_expression().unwrap_err(),
        ParamError::InvalidParameter { function: None }
    );
}

#[test]
#[should_panic(expected = "leaf parameter has no sub-parameter")]
fn indexing_a_leaf_panics() {
    let tree = parse_tree("x");
    let _ = tree.sub(0);
}

#[test]
fn all_leaf_expressions_preserve_positions() {
    let tree = parse_tree("a,,b");
    let mut leaves = Vec::new();
    tree.all_leaf_expressions(&mut leaves);
    assert_eq!(texts(&leaves), vec!["a", "_", "b"]);

    let tree = parse_tree("a:b,c:;e");
    let mut leaves = Vec::new();
    tree.all_leaf_expressions(&mut leaves);
    assert_eq!(texts(&leaves), vec!["a", "b", "c", "_", "e"]);

    // Appends to what the caller already collected.
    let tree = parse_tree("z");
    tree.all_leaf_expressions(&mut leaves);
    assert_eq!(leaves.len(), 6);
}

#[test]
fn to_array_flattens_flat_argument_lists() {
    let tree = parse_tree("a, b + 1, 3");
    let args = tree.to_array("sum", false).unwrap();
    assert_eq!(texts(&args), vec!["a", "b+1", "3"]);

    let tree = parse_tree("x");
    assert_eq!(texts(&tree.to_array("abs", false).unwrap()), vec!["x"]);
}

#[test]
fn to_array_rejects_missing_arguments_unless_allowed() {
    let tree = parse_tree("a,,b");
    assert_eq!(
        tree.to_array("top", false).unwrap_err(),
        ParamError::InvalidParameter {
            function: Some("top".into())
        }
    );
    assert_eq!(
        texts(&tree.to_array("top", true).unwrap()),
        vec!["a", "_", "b"]
    );
}

#[test]
fn to_array_rejects_nested_groups() {
    let tree = parse_tree("a:b,c");
    for can_null in [false, true] {
        let err = tree.to_array("pos", can_null).unwrap_err();
        assert_eq!(err.to_string(), "pos: invalid parameter");
    }
}

#[test]
fn create_borrows_a_single_child() {
    let tree = parse_tree("a,b:c,d");
    let sub = tree.create(1, 2).unwrap();
    assert!(matches!(sub, Cow::Borrowed(_)));
    assert!(std::ptr::eq(&*sub, tree.sub(1).unwrap()));
    assert_eq!(shape(Some(&*sub)), ":[b,c]");
}

#[test]
fn create_builds_a_branch_for_wider_ranges() {
    let tree = parse_tree("a,b:c,d");
    let sub = tree.create(1, 3).unwrap();
    assert!(matches!(sub, Cow::Owned(_)));
    assert_eq!(sub.level(), Some(Separator::Comma));
    assert_eq!(shape(Some(&*sub)), ",[:[b,c],d]");
    assert_eq!(sub.children(), &tree.children()[1..3]);
}

#[test]
fn create_edge_cases() {
    let tree = parse_tree("a,,b");
    assert!(tree.create(1, 2).is_none());
    assert!(tree.create(2, 5).is_none());
    assert!(tree.create(2, 1).is_none());

    let leaf = parse_tree("x");
    let same = leaf.create(0, 1).unwrap();
    assert!(std::ptr::eq(&*same, &leaf));
    assert!(leaf.create(1, 2).is_none());
}

#[test]
fn create_on_an_empty_range_is_an_empty_group() {
    let tree = parse_tree("a,b");
    let rest = tree.create(1, 1).unwrap();
    assert!(matches!(rest, Cow::Owned(_)));
    assert_eq!(rest.level(), Some(Separator::Comma));
    assert_eq!(rest.sub_size(), 0);
    assert_eq!(rest.to_string(), "");

    // The arguments after the first of a one-argument call.
    let tree = parse_tree("a:b");
    let rest = tree.create(2, 2).unwrap();
    assert_eq!(rest.level(), Some(Separator::Colon));
    assert_eq!(rest.sub_size(), 0);
    assert!(tree.create(3, 3).is_none());
}

#[test]
fn contains_param_searches_the_whole_tree() {
    let tree = parse_tree("x; y, f(1, arg1 * 2)");
    assert!(tree.contains_param("arg1"));
    assert!(tree.contains_param("x"));
    assert!(!tree.contains_param("label"));
}

#[test]
fn used_params_and_fields_split_on_the_context() {
    let tree = parse_tree("arg1 * 2, amount; f(label, arg1), 'Unit Price',");
    let ctx = ctx();

    let mut params = Vec::new();
    tree.used_params(&ctx, &mut params);
    assert_eq!(params, vec!["arg1", "label"]);

    let mut fields = Vec::new();
    tree.used_fields(&ctx, &mut fields);
    assert_eq!(fields, vec!["amount", "Unit Price"]);
}

#[test]
fn used_cells_include_call_arguments() {
    let tree = parse_tree("A1 + B2, sum(A1:C3)");
    let mut cells = Vec::new();
    tree.used_cells(&mut cells);
    assert_eq!(
        cells,
        vec![CellRef::new(0, 0), CellRef::new(1, 1), CellRef::new(2, 2)]
    );
}

#[test]
fn optimize_reports_constant_trees() {
    let ctx = ctx();

    let mut tree = unoptimized("1,2,3");
    assert!(tree.optimize(&ctx));

    let mut tree = unoptimized("x,2,3");
    assert!(!tree.optimize(&ctx));

    // Omitted arguments contribute nothing.
    let mut tree = unoptimized("1,,3");
    assert!(tree.optimize(&ctx));

    // Parameters are runtime values even when the context binds them.
    let mut tree = unoptimized("arg1");
    assert!(!tree.optimize(&ctx));
}

#[test]
fn optimize_folds_every_leaf_in_place() {
    let ctx = ctx();
    let mut tree = unoptimized("x, 1+1; \"a\" & 2");
    assert_eq!(tree.to_string(), "x,1+1;\"a\"&2");
    assert!(!tree.optimize(&ctx));
    assert_eq!(tree.to_string(), "x,2;\"a2\"");

    let Some(ParamNode::Leaf(exp)) = tree.sub(1) else {
        panic!("expected a leaf");
    };
    assert_eq!(exp.constant(), Some(&Value::Text("a2".into())));
}

#[test]
fn optimize_leaves_failed_folds_unchanged() {
    let ctx = ctx();
    let mut tree = unoptimized("1/0, 2");
    assert!(!tree.optimize(&ctx));
    assert_eq!(tree.to_string(), "1/0,2");

    // Operands folded before the failing division keep their folded form.
    let mut tree = unoptimized("(1+1)+(1/0), 3*2");
    assert!(!tree.optimize(&ctx));
    assert_eq!(tree.to_string(), "2+(1/0),6");
}

#[test]
fn calls_are_not_constant_but_their_arguments_fold() {
    let ctx = ctx();
    let mut tree = unoptimized("f(1+1), 2");
    assert!(!tree.optimize(&ctx));
    assert_eq!(tree.to_string(), "f(2),2");
}
