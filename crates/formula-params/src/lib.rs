#![forbid(unsafe_code)]
#![deny(unreachable_patterns)]

//! Function-parameter trees for grid formulas.
//!
//! The text between a function call's parentheses is decomposed into a tree of argument
//! groups by [`parse`]. Three separators nest, coarsest first: `;` groups, `,` arguments and
//! `:` pairs. Separators inside quoted strings, parenthesized sub-expressions, `[...]` and
//! `{...}` literals, or after a `\` escape never split.
//!
//! ```text
//! a:b,c:d;e:f   =>   ';' [ ',' [ ':' [a, b], ':' [c, d] ], ':' [e, f] ]
//! ```
//!
//! Only the levels that actually occur produce branches: `x,y` is a flat `,` group and `x` is
//! a single leaf. Omitted arguments (`f(a,,b)`) stay in the tree as empty slots so argument
//! positions are preserved.
//!
//! Leaves hold expressions behind the [`LeafExpression`] trait. [`Expression`] is the bundled
//! implementation, resolving names against a [`CellSet`] and a [`Context`].

pub mod context;
pub mod error;
pub mod expression;
pub mod grid;
pub mod param;
pub mod parser;
pub mod scan;
pub mod separator;
pub mod value;

pub use crate::context::Context;
pub use crate::error::{ParamError, ParamResult, ParseError, Span};
pub use crate::expression::{BinaryOp, Expr, Expression, LeafExpression, UnaryOp, MAX_NESTING};
pub use crate::grid::{CellRef, CellSet};
pub use crate::param::ParamNode;
pub use crate::parser::{parse, parse_with_macro, parse_with_options, ParseOptions};
pub use crate::scan::{has_separator, ArgumentTokenizer};
pub use crate::separator::{ParamType, Separator};
pub use crate::value::Value;
