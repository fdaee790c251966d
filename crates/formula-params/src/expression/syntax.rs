use crate::context::Context;
use crate::error::{ParamError, ParamResult, ParseError, Span};
use crate::expression::{BinaryOp, Expr, Expression, UnaryOp};
use crate::grid::CellSet;
use crate::param::ParamNode;
use crate::parser::{parse_nested, ParseOptions};
use crate::scan::scan_parenthesis;
use crate::value::Value;

/// Deepest nesting of calls, parentheses, sequence literals and unary operators accepted in
/// one expression, counting calls across their argument trees.
pub const MAX_NESTING: usize = 64;

#[derive(Clone, Debug, PartialEq)]
enum TokenKind {
    Number(f64),
    String(String),
    QuotedField(String),
    Ident(String),
    Hash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Ampersand,
    AndAnd,
    OrOr,
    Bang,
    EqEq,
    NotEquals,
    Less,
    LessEquals,
    Greater,
    GreaterEquals,
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
struct Token {
    kind: TokenKind,
    span: Span,
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn consume_while<F>(&mut self, mut predicate: F) -> &'a str
    where
        F: FnMut(char) -> bool,
    {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            self.bump();
        }
        let input = self.input;
        &input[start..self.pos]
    }

    fn error(&self, message: impl Into<String>, start: usize) -> ParseError {
        ParseError::new(message, Span::new(start, self.pos))
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.consume_while(char::is_whitespace);
        let start = self.pos;
        let kind = self.next_kind(start)?;
        Ok(Token {
            kind,
            span: Span::new(start, self.pos),
        })
    }

    /// Consumes `second` if it follows, choosing between a two- and a one-character token.
    fn pair(&mut self, second: char, double: TokenKind, single: TokenKind) -> TokenKind {
        if self.peek() == Some(second) {
            self.bump();
            double
        } else {
            single
        }
    }

    fn next_kind(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        let Some(ch) = self.bump() else {
            return Ok(TokenKind::Eof);
        };

        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '#' => TokenKind::Hash,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '&' => self.pair('&', TokenKind::AndAnd, TokenKind::Ampersand),
            '!' => self.pair('=', TokenKind::NotEquals, TokenKind::Bang),
            '<' => self.pair('=', TokenKind::LessEquals, TokenKind::Less),
            '>' => self.pair('=', TokenKind::GreaterEquals, TokenKind::Greater),
            '=' => {
                if self.bump() != Some('=') {
                    return Err(self.error("expected '==' for comparison", start));
                }
                TokenKind::EqEq
            }
            '|' => {
                if self.bump() != Some('|') {
                    return Err(self.error("expected '||'", start));
                }
                TokenKind::OrOr
            }
            '"' => TokenKind::String(self.quoted('"', start)?),
            '\'' => TokenKind::QuotedField(self.quoted('\'', start)?),
            '{' => return Err(self.error("block literals are not supported", start)),
            c if c.is_ascii_digit() => self.number(start)?,
            c if is_ident_start(c) => {
                self.consume_while(is_ident_part);
                TokenKind::Ident(self.input[start..self.pos].to_string())
            }
            other => return Err(self.error(format!("unexpected character {other:?}"), start)),
        };
        Ok(kind)
    }

    fn quoted(&mut self, quote: char, start: usize) -> Result<String, ParseError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string", start)),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    None => return Err(self.error("unterminated string", start)),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(c) => out.push(c),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        self.consume_while(|c| c.is_ascii_digit() || c == '.');
        // Exponent notation like `1e3` / `1E-3`.
        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            let digits = self.consume_while(|c| c.is_ascii_digit());
            if digits.is_empty() {
                return Err(self.error("expected exponent digits", start));
            }
        }
        let text = &self.input[start..self.pos];
        text.parse()
            .map(TokenKind::Number)
            .map_err(|_| self.error(format!("invalid number {text:?}"), start))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: Token,
    grid: &'a CellSet,
    ctx: &'a Context,
    options: ParseOptions,
    depth: usize,
}

/// Parses one leaf. `depth` is the nesting already used by the calls enclosing `input`.
pub(super) fn parse(
    input: &str,
    grid: &CellSet,
    ctx: &Context,
    options: &ParseOptions,
    depth: usize,
) -> ParamResult<Expr> {
    let mut lexer = Lexer::new(input);
    let lookahead = lexer.next_token()?;
    let mut parser = Parser {
        lexer,
        lookahead,
        grid,
        ctx,
        // Call arguments are cut from text whose macros were already expanded.
        options: ParseOptions {
            macro_expansion: false,
            ..*options
        },
        depth,
    };
    parser.parse()
}

impl<'a> Parser<'a> {
    fn bump(&mut self) -> ParamResult<Token> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.lookahead, next))
    }

    fn unexpected(&self) -> ParamError {
        let message = match &self.lookahead.kind {
            TokenKind::Eof => "unexpected end of expression".to_string(),
            other => format!("unexpected token {other:?}"),
        };
        ParseError::new(message, self.lookahead.span).into()
    }

    fn too_deep(&self) -> ParamError {
        ParseError::new(
            format!("expression nesting exceeds the {MAX_NESTING}-level limit"),
            self.lookahead.span,
        )
        .into()
    }

    /// Runs `parse` one nesting level deeper, failing at the lookahead once the limit is hit.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParamResult<T>) -> ParamResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.too_deep());
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn expect(&mut self, kind: TokenKind) -> ParamResult<()> {
        if self.lookahead.kind == kind {
            self.bump()?;
            Ok(())
        } else {
            Err(ParseError::new(
                format!("expected {kind:?}, found {:?}", self.lookahead.kind),
                self.lookahead.span,
            )
            .into())
        }
    }

    fn parse(&mut self) -> ParamResult<Expr> {
        let expr = self.parse_expr(0)?;
        if self.lookahead.kind != TokenKind::Eof {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    fn parse_expr(&mut self, min_prec: u8) -> ParamResult<Expr> {
        let mut left = self.parse_prefix()?;
        while let Some((op, prec)) = self.infix_binding_power() {
            if prec < min_prec {
                break;
            }
            self.bump()?;
            let right = self.parse_expr(prec + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_prefix(&mut self) -> ParamResult<Expr> {
        let expr = match &self.lookahead.kind {
            TokenKind::Minus | TokenKind::Bang => {
                return self.nested(|p| {
                    let op = if p.bump()?.kind == TokenKind::Minus {
                        UnaryOp::Negate
                    } else {
                        UnaryOp::Not
                    };
                    let operand = p.parse_expr(7)?;
                    Ok(Expr::Unary {
                        op,
                        operand: Box::new(operand),
                    })
                });
            }
            TokenKind::Number(n) => {
                let n = *n;
                self.bump()?;
                Expr::Literal(Value::Number(n))
            }
            TokenKind::String(s) => {
                let s = s.clone();
                self.bump()?;
                Expr::Literal(Value::Text(s))
            }
            TokenKind::QuotedField(name) => {
                let name = name.clone();
                self.bump()?;
                Expr::Field(name)
            }
            TokenKind::Hash => {
                self.bump()?;
                Expr::CurrentRow
            }
            TokenKind::Ident(_) => self.parse_ident_like()?,
            TokenKind::LParen => self.nested(|p| {
                p.bump()?;
                let inner = p.parse_expr(0)?;
                p.expect(TokenKind::RParen)?;
                Ok(Expr::Paren(Box::new(inner)))
            })?,
            TokenKind::LBracket => self.nested(Self::parse_sequence)?,
            _ => return Err(self.unexpected()),
        };
        self.parse_postfix(expr)
    }

    fn parse_sequence(&mut self) -> ParamResult<Expr> {
        self.expect(TokenKind::LBracket)?;
        let mut items = Vec::new();
        if self.lookahead.kind != TokenKind::RBracket {
            loop {
                items.push(self.parse_expr(0)?);
                if self.lookahead.kind == TokenKind::Comma {
                    self.bump()?;
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Expr::Sequence(items))
    }

    fn parse_ident_like(&mut self) -> ParamResult<Expr> {
        let token = self.bump()?;
        let name = match token.kind {
            TokenKind::Ident(name) => name,
            other => {
                return Err(ParseError::new(
                    format!("expected identifier, found {other:?}"),
                    token.span,
                )
                .into())
            }
        };

        if self.lookahead.kind == TokenKind::LParen {
            let params = self.parse_call_params()?;
            return Ok(Expr::Call { name, params });
        }

        match name.as_str() {
            "true" => return Ok(Expr::Literal(Value::Bool(true))),
            "false" => return Ok(Expr::Literal(Value::Bool(false))),
            "null" => return Ok(Expr::Literal(Value::Null)),
            _ => {}
        }
        if let Some(cell) = self.grid.cell(&name) {
            return Ok(Expr::Cell(cell));
        }
        if name.contains('$') {
            return Err(ParseError::new(
                format!("invalid cell reference {name:?}"),
                token.span,
            )
            .into());
        }
        Ok(Expr::Ident(name))
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> ParamResult<Expr> {
        while self.lookahead.kind == TokenKind::Dot {
            self.bump()?;
            let token = self.bump()?;
            let name = match token.kind {
                TokenKind::Ident(name) => name,
                other => {
                    return Err(ParseError::new(
                        format!("expected member name, found {other:?}"),
                        token.span,
                    )
                    .into())
                }
            };
            expr = if self.lookahead.kind == TokenKind::LParen {
                Expr::MemberCall {
                    target: Box::new(expr),
                    name,
                    params: self.parse_call_params()?,
                }
            } else {
                Expr::Member {
                    target: Box::new(expr),
                    name,
                }
            };
        }
        Ok(expr)
    }

    /// Parses the argument text of a call into its own parameter tree.
    ///
    /// The lookahead must be the opening parenthesis. The raw text up to the matching `)` is
    /// handed to the parameter parser as-is; the lexer resumes after the `)`.
    fn parse_call_params(&mut self) -> ParamResult<Option<Box<ParamNode<Expression>>>> {
        if self.depth >= MAX_NESTING {
            return Err(self.too_deep());
        }
        let open = self.lookahead.span.start;
        let input = self.lexer.input;
        let Some(close) = scan_parenthesis(input, open) else {
            return Err(ParseError::new(
                "unterminated function call",
                Span::new(open, input.len()),
            )
            .into());
        };

        let args_offset = open + 1;
        let params = parse_nested::<Expression>(
            &input[args_offset..close],
            self.grid,
            self.ctx,
            self.options,
            self.depth + 1,
        )
        .map_err(|err| match err {
            ParamError::Syntax(err) => ParamError::Syntax(err.add_offset(args_offset)),
            other => other,
        })?;

        self.lexer.pos = close + 1;
        self.bump()?;
        Ok(params.map(Box::new))
    }

    fn infix_binding_power(&self) -> Option<(BinaryOp, u8)> {
        // Higher binds tighter:
        //   * / %  >  + -  >  &  >  comparisons  >  &&  >  ||
        match self.lookahead.kind {
            TokenKind::OrOr => Some((BinaryOp::Or, 1)),
            TokenKind::AndAnd => Some((BinaryOp::And, 2)),
            TokenKind::EqEq => Some((BinaryOp::Equals, 3)),
            TokenKind::NotEquals => Some((BinaryOp::NotEquals, 3)),
            TokenKind::Less => Some((BinaryOp::Less, 3)),
            TokenKind::LessEquals => Some((BinaryOp::LessEquals, 3)),
            TokenKind::Greater => Some((BinaryOp::Greater, 3)),
            TokenKind::GreaterEquals => Some((BinaryOp::GreaterEquals, 3)),
            TokenKind::Ampersand => Some((BinaryOp::Concat, 4)),
            TokenKind::Plus => Some((BinaryOp::Add, 5)),
            TokenKind::Minus => Some((BinaryOp::Subtract, 5)),
            TokenKind::Star => Some((BinaryOp::Multiply, 6)),
            TokenKind::Slash => Some((BinaryOp::Divide, 6)),
            TokenKind::Percent => Some((BinaryOp::Modulo, 6)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_kinds(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token.kind == TokenKind::Eof {
                return out;
            }
            out.push(token.kind);
        }
    }

    #[test]
    fn lexes_operators_and_literals() {
        assert_eq!(
            lex_kinds("a>=1.5e1 && 'x y'!=\"q\\\"\""),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::GreaterEquals,
                TokenKind::Number(15.0),
                TokenKind::AndAnd,
                TokenKind::QuotedField("x y".into()),
                TokenKind::NotEquals,
                TokenKind::String("q\"".into()),
            ]
        );
    }

    #[test]
    fn lexer_errors_carry_spans() {
        let mut lexer = Lexer::new("1 = 2");
        lexer.next_token().unwrap();
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.span, Span::new(2, 4));

        let mut lexer = Lexer::new("  {a}");
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.message, "block literals are not supported");
        assert_eq!(err.span, Span::new(2, 3));
    }

    #[test]
    fn binary_operators_follow_precedence() {
        let grid = CellSet::new(10, 10);
        let ctx = Context::new();
        let options = ParseOptions {
            optimize: false,
            ..ParseOptions::default()
        };
        let expr = parse("1+2*x", &grid, &ctx, &options, 0).unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(Expr::Literal(Value::Number(1.0))),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Multiply,
                    left: Box::new(Expr::Literal(Value::Number(2.0))),
                    right: Box::new(Expr::Ident("x".into())),
                }),
            }
        );
    }

    #[test]
    fn nested_call_errors_point_into_the_outer_text() {
        let grid = CellSet::new(10, 10);
        let ctx = Context::new();
        let err = parse("f(1, 2 +)", &grid, &ctx, &ParseOptions::default(), 0).unwrap_err();
        let ParamError::Syntax(err) = err else {
            panic!("expected syntax error, got {err:?}");
        };
        assert_eq!(err.span, Span::new(8, 8));
    }

    #[test]
    fn nesting_is_limited() {
        let grid = CellSet::new(10, 10);
        let ctx = Context::new();
        let options = ParseOptions::default();

        let ok = format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert!(parse(&ok, &grid, &ctx, &options, 0).is_ok());

        let deep = format!("{}1{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        let err = parse(&deep, &grid, &ctx, &options, 0).unwrap_err();
        let ParamError::Syntax(err) = err else {
            panic!("expected syntax error, got {err:?}");
        };
        assert_eq!(err.span, Span::new(MAX_NESTING, MAX_NESTING + 1));

        // Depth already used by enclosing calls counts against the limit.
        assert!(parse("-1", &grid, &ctx, &options, MAX_NESTING).is_err());
        assert!(parse("1", &grid, &ctx, &options, MAX_NESTING).is_ok());
    }
}
