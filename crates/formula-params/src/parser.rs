//! Parameter tree construction.
//!
//! Parameter text uses up to three nested separators, from coarsest to finest `;`, `,` and
//! `:`. A span is split on the coarsest separator that actually occurs in it at top level, and
//! each piece is parsed again starting one level finer. Levels that never occur are skipped, so
//! `a,b` is a flat comma group and `x` is a bare leaf. Text under a colon is never split.

use serde::{Deserialize, Serialize};

use crate::error::{ParamError, ParamResult};
use crate::expression::LeafExpression;
use crate::param::ParamNode;
use crate::scan::{has_separator, ArgumentTokenizer};
use crate::separator::Separator;

/// Options forwarded to the expression parser for every leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Expand `${name}` macros before parsing leaf text.
    pub macro_expansion: bool,
    /// Constant-fold leaf expressions as they are built.
    pub optimize: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            macro_expansion: false,
            optimize: true,
        }
    }
}

/// Parses function-call argument text without macro expansion.
///
/// Returns `Ok(None)` when `text` is blank.
pub fn parse<E: LeafExpression>(
    text: &str,
    grid: &E::Grid,
    ctx: &E::Context,
) -> ParamResult<Option<ParamNode<E>>> {
    parse_with_options(text, grid, ctx, ParseOptions::default())
}

pub fn parse_with_macro<E: LeafExpression>(
    text: &str,
    grid: &E::Grid,
    ctx: &E::Context,
    macro_expansion: bool,
) -> ParamResult<Option<ParamNode<E>>> {
    let options = ParseOptions {
        macro_expansion,
        ..ParseOptions::default()
    };
    parse_with_options(text, grid, ctx, options)
}

/// Parses function-call argument text into a parameter tree.
///
/// The first leaf the expression parser rejects aborts the whole parse. Spans in the resulting
/// syntax error are byte offsets into `text`.
pub fn parse_with_options<E: LeafExpression>(
    text: &str,
    grid: &E::Grid,
    ctx: &E::Context,
    options: ParseOptions,
) -> ParamResult<Option<ParamNode<E>>> {
    parse_nested(text, grid, ctx, options, 0)
}

/// Parses the argument text of a call found `depth` calls deep inside another leaf.
pub(crate) fn parse_nested<E: LeafExpression>(
    text: &str,
    grid: &E::Grid,
    ctx: &E::Context,
    options: ParseOptions,
    depth: usize,
) -> ParamResult<Option<ParamNode<E>>> {
    let builder = Builder {
        grid,
        ctx,
        options,
        depth,
    };
    builder.parse_at(text, 0, Separator::None)
}

struct Builder<'a, E: LeafExpression> {
    grid: &'a E::Grid,
    ctx: &'a E::Context,
    options: ParseOptions,
    depth: usize,
}

impl<E: LeafExpression> Builder<'_, E> {
    /// Parses `text`, which starts at byte `offset` of the text handed to [`parse`], one level
    /// below `parent`.
    fn parse_at(
        &self,
        text: &str,
        offset: usize,
        parent: Separator,
    ) -> ParamResult<Option<ParamNode<E>>> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let offset = offset + (text.len() - text.trim_start().len());
        let text = trimmed;

        let level = parent
            .deeper()
            .find(|level| level.as_char().is_some_and(|ch| has_separator(text, ch)));
        let Some(level) = level else {
            return self.leaf(text, offset).map(Some);
        };
        let Some(separator) = level.as_char() else {
            unreachable!("{level:?} has no separator character");
        };
        log::trace!("splitting {text:?} at {level:?}");

        let mut tokens = ArgumentTokenizer::new(text, separator);
        let mut children = Vec::new();
        while let Some((start, token)) = tokens.next_with_offset() {
            children.push(self.parse_at(token, offset + start, level)?);
        }
        Ok(Some(ParamNode::Branch { level, children }))
    }

    fn leaf(&self, text: &str, offset: usize) -> ParamResult<ParamNode<E>> {
        E::compile_nested(text, self.grid, self.ctx, &self.options, self.depth)
            .map(ParamNode::Leaf)
            .map_err(|err| match err {
                ParamError::Syntax(err) => ParamError::Syntax(err.add_offset(offset)),
                other => other,
            })
    }
}
