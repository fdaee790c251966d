//! Leaf expressions.
//!
//! The parameter tree only needs a handful of operations from the expression behind each
//! leaf; [`LeafExpression`] is that seam. [`Expression`] is the implementation used by this
//! crate: a small formula language over a [`CellSet`] and a [`Context`].

mod fold;
mod syntax;

pub use syntax::MAX_NESTING;

use std::borrow::Cow;
use std::fmt;

use crate::context::Context;
use crate::error::{ParamResult, ParseError, Span};
use crate::grid::{CellRef, CellSet};
use crate::param::ParamNode;
use crate::parser::ParseOptions;
use crate::value::Value;

/// Operations a parameter tree requires from the expressions at its leaves.
pub trait LeafExpression: Sized {
    type Grid: ?Sized;
    type Context: ?Sized;
    type Cell;

    /// Parses one leaf span. Syntax errors abort the enclosing parameter parse.
    fn compile(
        text: &str,
        grid: &Self::Grid,
        ctx: &Self::Context,
        options: &ParseOptions,
    ) -> ParamResult<Self>;

    /// Like [`compile`](Self::compile) for the argument text of a call nested `depth` levels
    /// inside another leaf. Implementations that recurse into call arguments use `depth` to
    /// bound that recursion.
    fn compile_nested(
        text: &str,
        grid: &Self::Grid,
        ctx: &Self::Context,
        options: &ParseOptions,
        depth: usize,
    ) -> ParamResult<Self> {
        let _ = depth;
        Self::compile(text, grid, ctx, options)
    }

    /// Constant-folds the expression in place.
    fn optimize(&mut self, ctx: &Self::Context) -> ParamResult<()>;

    /// Whether the expression has been reduced to a literal.
    fn is_constant(&self) -> bool;

    fn contains_param(&self, name: &str) -> bool;

    fn used_params(&self, ctx: &Self::Context, out: &mut Vec<String>);

    fn used_fields(&self, ctx: &Self::Context, out: &mut Vec<String>);

    fn used_cells(&self, out: &mut Vec<Self::Cell>);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
    Equals,
    NotEquals,
    Less,
    LessEquals,
    Greater,
    GreaterEquals,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Concat => "&",
            BinaryOp::Equals => "==",
            BinaryOp::NotEquals => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEquals => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEquals => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// A bare name. It is a parameter when the context binds it and a field otherwise.
    Ident(String),
    /// A quoted field name: `'Unit Price'`.
    Field(String),
    /// `#`, the current row.
    CurrentRow,
    Cell(CellRef),
    Sequence(Vec<Expr>),
    Paren(Box<Expr>),
    Call {
        name: String,
        params: Option<Box<ParamNode<Expression>>>,
    },
    Member {
        target: Box<Expr>,
        name: String,
    },
    MemberCall {
        target: Box<Expr>,
        name: String,
        params: Option<Box<ParamNode<Expression>>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Visits this node and every node below it, including the leaves of call arguments.
    pub fn walk(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match self {
            Expr::Literal(_)
            | Expr::Ident(_)
            | Expr::Field(_)
            | Expr::CurrentRow
            | Expr::Cell(_) => {}
            Expr::Sequence(items) => {
                for item in items {
                    item.walk(f);
                }
            }
            Expr::Paren(inner) => inner.walk(f),
            Expr::Call { params, .. } => walk_params(params.as_deref(), f),
            Expr::Member { target, .. } => target.walk(f),
            Expr::MemberCall { target, params, .. } => {
                target.walk(f);
                walk_params(params.as_deref(), f);
            }
            Expr::Unary { operand, .. } => operand.walk(f),
            Expr::Binary { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
        }
    }
}

fn walk_params(params: Option<&ParamNode<Expression>>, f: &mut impl FnMut(&Expr)) {
    let Some(params) = params else {
        return;
    };
    let mut leaves = Vec::new();
    params.all_leaf_expressions(&mut leaves);
    for leaf in leaves.into_iter().flatten() {
        leaf.root().walk(f);
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => f.write_str(&value.to_literal()),
            Expr::Ident(name) => f.write_str(name),
            Expr::Field(name) => write!(f, "'{}'", name.replace('\'', "\\'")),
            Expr::CurrentRow => f.write_str("#"),
            Expr::Cell(cell) => write!(f, "{cell}"),
            Expr::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Expr::Paren(inner) => write!(f, "({inner})"),
            Expr::Call { name, params } => write!(f, "{name}({})", DisplayParams(params)),
            Expr::Member { target, name } => write!(f, "{target}.{name}"),
            Expr::MemberCall {
                target,
                name,
                params,
            } => write!(f, "{target}.{name}({})", DisplayParams(params)),
            Expr::Unary { op, operand } => match op {
                UnaryOp::Negate => write!(f, "-{operand}"),
                UnaryOp::Not => write!(f, "!{operand}"),
            },
            Expr::Binary { op, left, right } => write!(f, "{left}{}{right}", op.symbol()),
        }
    }
}

struct DisplayParams<'a>(&'a Option<Box<ParamNode<Expression>>>);

impl fmt::Display for DisplayParams<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(params) => write!(f, "{params}"),
            None => Ok(()),
        }
    }
}

/// A parsed leaf of a parameter tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    root: Expr,
}

impl Expression {
    pub fn new(root: Expr) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    pub fn into_root(self) -> Expr {
        self.root
    }

    /// The folded value when the expression is a literal.
    pub fn constant(&self) -> Option<&Value> {
        match &self.root {
            Expr::Literal(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.root, f)
    }
}

impl LeafExpression for Expression {
    type Grid = CellSet;
    type Context = Context;
    type Cell = CellRef;

    fn compile(
        text: &str,
        grid: &CellSet,
        ctx: &Context,
        options: &ParseOptions,
    ) -> ParamResult<Self> {
        Self::compile_nested(text, grid, ctx, options, 0)
    }

    fn compile_nested(
        text: &str,
        grid: &CellSet,
        ctx: &Context,
        options: &ParseOptions,
        depth: usize,
    ) -> ParamResult<Self> {
        let source = if options.macro_expansion {
            expand_macros(text, ctx)?
        } else {
            Cow::Borrowed(text)
        };
        let root = syntax::parse(&source, grid, ctx, options, depth)?;
        let mut expression = Expression { root };
        if options.optimize {
            if let Err(err) = expression.optimize(ctx) {
                log::debug!("leaving {text:?} unfolded: {err}");
            }
        }
        Ok(expression)
    }

    fn optimize(&mut self, ctx: &Context) -> ParamResult<()> {
        fold::fold(&mut self.root, ctx)
    }

    fn is_constant(&self) -> bool {
        matches!(self.root, Expr::Literal(_))
    }

    fn contains_param(&self, name: &str) -> bool {
        let mut found = false;
        self.root.walk(&mut |expr| {
            if matches!(expr, Expr::Ident(ident) if ident == name) {
                found = true;
            }
        });
        found
    }

    fn used_params(&self, ctx: &Context, out: &mut Vec<String>) {
        self.root.walk(&mut |expr| {
            if let Expr::Ident(name) = expr {
                if ctx.has_param(name) {
                    push_unique(out, name.clone());
                }
            }
        });
    }

    fn used_fields(&self, ctx: &Context, out: &mut Vec<String>) {
        self.root.walk(&mut |expr| match expr {
            Expr::Ident(name) if !ctx.has_param(name) => push_unique(out, name.clone()),
            Expr::Field(name) => push_unique(out, name.clone()),
            _ => {}
        });
    }

    fn used_cells(&self, out: &mut Vec<CellRef>) {
        self.root.walk(&mut |expr| {
            if let Expr::Cell(cell) = expr {
                push_unique(out, *cell);
            }
        });
    }
}

fn push_unique<T: PartialEq>(out: &mut Vec<T>, item: T) {
    if !out.contains(&item) {
        out.push(item);
    }
}

/// Replaces every `${name}` with the plain text of context parameter `name`.
fn expand_macros<'a>(text: &'a str, ctx: &Context) -> ParamResult<Cow<'a, str>> {
    if !text.contains("${") {
        return Ok(Cow::Borrowed(text));
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut offset = 0usize;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let Some(len) = rest[start..].find('}') else {
            return Err(ParseError::new(
                "unterminated macro",
                Span::new(offset + start, text.len()),
            )
            .into());
        };
        let end = start + len;
        let name = rest[start + 2..end].trim();
        let Some(value) = ctx.param(name) else {
            return Err(ParseError::new(
                format!("unknown macro {name:?}"),
                Span::new(offset + start, offset + end + 1),
            )
            .into());
        };
        out.push_str(&value.to_string());
        offset += end + 1;
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    Ok(Cow::Owned(out))
}
