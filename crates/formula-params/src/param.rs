//! Parameter trees.
//!
//! A function call's argument text parses into a [`ParamNode`]: either a single leaf
//! expression, or a branch grouping its children at one separator level. Child slots are
//! `Option`s; `None` is an argument that was left out (`f(a,,b)`) and keeps its position.

use std::borrow::Cow;
use std::fmt;

use crate::error::{ParamError, ParamResult};
use crate::expression::LeafExpression;
use crate::separator::{ParamType, Separator};

#[derive(Debug, Clone, PartialEq)]
pub enum ParamNode<E> {
    Branch {
        level: Separator,
        children: Vec<Option<ParamNode<E>>>,
    },
    Leaf(E),
}

impl<E> ParamNode<E> {
    pub fn is_leaf(&self) -> bool {
        matches!(self, ParamNode::Leaf(_))
    }

    pub fn param_type(&self) -> ParamType {
        match self {
            ParamNode::Branch { level, .. } => ParamType::Separator(*level),
            ParamNode::Leaf(_) => ParamType::Normal,
        }
    }

    /// Separator level of a branch; `None` for a leaf.
    pub fn level(&self) -> Option<Separator> {
        match self {
            ParamNode::Branch { level, .. } => Some(*level),
            ParamNode::Leaf(_) => None,
        }
    }

    /// Child slots of a branch. A leaf has none.
    pub fn children(&self) -> &[Option<ParamNode<E>>] {
        match self {
            ParamNode::Branch { children, .. } => children,
            ParamNode::Leaf(_) => &[],
        }
    }

    pub fn sub_size(&self) -> usize {
        self.children().len()
    }

    /// Child at `index`, `None` when that argument was omitted.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.sub_size()`. A leaf has no children, so indexing one always
    /// panics.
    pub fn sub(&self, index: usize) -> Option<&ParamNode<E>> {
        match self {
            ParamNode::Branch { children, .. } => children[index].as_ref(),
            ParamNode::Leaf(_) => panic!("leaf parameter has no sub-parameter {index}"),
        }
    }

    /// The expression of a leaf.
    pub fn leaf_expression(&self) -> ParamResult<&E> {
        match self {
            ParamNode::Leaf(exp) => Ok(exp),
            ParamNode::Branch { .. } => Err(ParamError::invalid_parameter(None)),
        }
    }

    /// Appends every leaf expression reachable from this node, left to right.
    ///
    /// Omitted arguments contribute a `None` so positions line up with the source text.
    pub fn all_leaf_expressions<'a>(&'a self, out: &mut Vec<Option<&'a E>>) {
        match self {
            ParamNode::Leaf(exp) => out.push(Some(exp)),
            ParamNode::Branch { children, .. } => {
                for child in children {
                    match child {
                        Some(child) => child.all_leaf_expressions(out),
                        None => out.push(None),
                    }
                }
            }
        }
    }

    /// Flattens one level of children into an argument array.
    ///
    /// Only flat argument lists are accepted: a child that is itself a separator group fails
    /// with [`ParamError::InvalidParameter`], as does an omitted argument unless `can_null` is
    /// set. A leaf yields a one-element array.
    pub fn to_array(&self, function: &str, can_null: bool) -> ParamResult<Vec<Option<&E>>> {
        match self {
            ParamNode::Leaf(exp) => Ok(vec![Some(exp)]),
            ParamNode::Branch { children, .. } => children
                .iter()
                .map(|child| match child {
                    Some(ParamNode::Leaf(exp)) => Ok(Some(exp)),
                    Some(ParamNode::Branch { .. }) => {
                        Err(ParamError::invalid_parameter(Some(function)))
                    }
                    None if can_null => Ok(None),
                    None => Err(ParamError::invalid_parameter(Some(function))),
                })
                .collect(),
        }
    }
}

impl<E: Clone> ParamNode<E> {
    /// Children `start..end` as a node of their own.
    ///
    /// A range covering exactly one child borrows that child (which may be an omitted
    /// argument, giving `None`). Any other range builds a new branch at the same level; an
    /// empty range gives an empty branch, so `create(1, n)` on a one-argument call is an empty
    /// group rather than `None`. On a leaf only `start == 0` is meaningful and borrows the leaf
    /// itself. Reversed or out-of-range bounds give `None`.
    pub fn create(&self, start: usize, end: usize) -> Option<Cow<'_, ParamNode<E>>> {
        match self {
            ParamNode::Leaf(_) => (start == 0).then_some(Cow::Borrowed(self)),
            ParamNode::Branch { level, children } => {
                if start > end {
                    return None;
                }
                let range = children.get(start..end)?;
                if let [only] = range {
                    return only.as_ref().map(Cow::Borrowed);
                }
                Some(Cow::Owned(ParamNode::Branch {
                    level: *level,
                    children: range.to_vec(),
                }))
            }
        }
    }
}

impl<E: LeafExpression> ParamNode<E> {
    /// Whether the named parameter is referenced anywhere below this node.
    pub fn contains_param(&self, name: &str) -> bool {
        match self {
            ParamNode::Leaf(exp) => exp.contains_param(name),
            ParamNode::Branch { children, .. } => children
                .iter()
                .flatten()
                .any(|child| child.contains_param(name)),
        }
    }

    pub fn used_params(&self, ctx: &E::Context, out: &mut Vec<String>) {
        match self {
            ParamNode::Leaf(exp) => exp.used_params(ctx, out),
            ParamNode::Branch { children, .. } => {
                for child in children.iter().flatten() {
                    child.used_params(ctx, out);
                }
            }
        }
    }

    pub fn used_fields(&self, ctx: &E::Context, out: &mut Vec<String>) {
        match self {
            ParamNode::Leaf(exp) => exp.used_fields(ctx, out),
            ParamNode::Branch { children, .. } => {
                for child in children.iter().flatten() {
                    child.used_fields(ctx, out);
                }
            }
        }
    }

    pub fn used_cells(&self, out: &mut Vec<E::Cell>) {
        match self {
            ParamNode::Leaf(exp) => exp.used_cells(out),
            ParamNode::Branch { children, .. } => {
                for child in children.iter().flatten() {
                    child.used_cells(out);
                }
            }
        }
    }

    /// Constant-folds every leaf in place and reports whether the whole subtree is constant.
    ///
    /// Every child is visited even after one turns out to be non-constant. Omitted arguments
    /// count as constant. A leaf whose folding fails counts as non-constant; the node that
    /// failed keeps its form, but sub-expressions folded before the failure stay folded
    /// (`(1+1)+(1/0)` becomes `2+(1/0)`).
    pub fn optimize(&mut self, ctx: &E::Context) -> bool {
        match self {
            ParamNode::Leaf(exp) => match exp.optimize(ctx) {
                Ok(()) => exp.is_constant(),
                Err(err) => {
                    log::debug!("leaf parameter not folded: {err}");
                    false
                }
            },
            ParamNode::Branch { children, .. } => children
                .iter_mut()
                .flatten()
                .fold(true, |all, child| child.optimize(ctx) && all),
        }
    }
}

/// Renders the tree back to parameter text, joining children with their separator.
impl<E: fmt::Display> fmt::Display for ParamNode<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamNode::Leaf(exp) => fmt::Display::fmt(exp, f),
            ParamNode::Branch { level, children } => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        if let Some(ch) = level.as_char() {
                            write!(f, "{ch}")?;
                        }
                    }
                    if let Some(child) = child {
                        fmt::Display::fmt(child, f)?;
                    }
                }
                Ok(())
            }
        }
    }
}
