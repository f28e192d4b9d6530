//! Expression parsing using Pratt parsing (precedence climbing).

use latte_core::{FloatLit, ParseErrorKind, Span, SyntaxError};
use latte_scanner::{Delimiter, Element, Token, TokenKind};

use super::Parser;
use crate::ast::*;
use crate::cursor::{ElementCursor, Group};

impl Parser {
    /// Parse an expression, consuming only operators that bind at least as
    /// tightly as `min_bp`.
    pub(super) fn expr(&mut self, cursor: &mut ElementCursor<'_, '_>, min_bp: u8) -> Result<Expr, SyntaxError> {
        let mut lhs = self.prefix(cursor)?;

        loop {
            let Some(token) = cursor.peek_token().copied() else {
                break;
            };

            // Member access
            if token.is_symbol(".") {
                if POSTFIX_BINDING_POWER < min_bp {
                    break;
                }
                cursor.advance();
                let name = member_name(cursor)?;
                let span = lhs.span().to(name.span);
                lhs = Expr::Field(FieldExpr {
                    target: Box::new(lhs),
                    name: name.text.to_string(),
                    span,
                });
                continue;
            }

            // Call
            if token.kind == TokenKind::Open(Delimiter::Paren) {
                if POSTFIX_BINDING_POWER < min_bp {
                    break;
                }
                let group = cursor.expect_group(Delimiter::Paren)?;
                let args = self.args(&group)?;
                let span = lhs.span().to(group.span);
                lhs = Expr::Call(CallExpr {
                    callee: Box::new(lhs),
                    args,
                    span,
                });
                continue;
            }

            // Cast
            if token.is_keyword("as") {
                if CAST_BINDING_POWER < min_bp {
                    break;
                }
                cursor.advance();
                let ty = self.type_ref(cursor)?;
                let span = lhs.span().to(ty.span());
                lhs = Expr::Cast(CastExpr {
                    expr: Box::new(lhs),
                    ty,
                    span,
                });
                continue;
            }

            if let Some(op) = BinaryOp::from_token(&token) {
                let (l_bp, r_bp) = op.binding_power();
                if l_bp < min_bp {
                    break;
                }
                cursor.advance();
                let rhs = self.expr(cursor, r_bp)?;
                let span = lhs.span().to(rhs.span());
                lhs = Expr::Binary(BinaryExpr {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                    span,
                });
                continue;
            }

            break;
        }

        Ok(lhs)
    }

    /// A complete expression occupying the rest of the cursor.
    pub(super) fn full_expr(&mut self, cursor: &mut ElementCursor<'_, '_>) -> Result<Expr, SyntaxError> {
        let expr = self.expr(cursor, 0)?;
        cursor.expect_end()?;
        Ok(expr)
    }

    /// One argument per line of the group.
    pub(super) fn args(&mut self, group: &Group<'_, '_>) -> Result<Vec<Expr>, SyntaxError> {
        group
            .lines()
            .iter()
            .map(|line| self.full_expr(&mut ElementCursor::of_line(line)))
            .collect()
    }

    fn prefix(&mut self, cursor: &mut ElementCursor<'_, '_>) -> Result<Expr, SyntaxError> {
        let token = match cursor.peek() {
            None => return Err(cursor.error(ParseErrorKind::ExpectedExpression, "expected an expression")),
            Some(Element::Layer(_)) => {
                return Err(cursor.error(ParseErrorKind::ExpectedExpression, "unexpected block"));
            }
            Some(Element::Token(token)) => *token,
        };
        let span = token.span;

        match token.kind {
            TokenKind::Number => {
                cursor.advance();
                Ok(Expr::literal(number(&token, false)?, span))
            }
            TokenKind::Str => {
                cursor.advance();
                Ok(Expr::literal(Literal::Str(token.text.to_string()), span))
            }
            TokenKind::Bool => {
                cursor.advance();
                let value = matches!(token.text, "true" | "yes");
                Ok(Expr::literal(Literal::Bool(value), span))
            }
            TokenKind::Keyword => match token.text {
                "null" => {
                    cursor.advance();
                    Ok(Expr::literal(Literal::Null, span))
                }
                "this" => {
                    cursor.advance();
                    Ok(Expr::This(span))
                }
                "new" => self.new_expr(cursor),
                _ => Err(cursor.error(
                    ParseErrorKind::ExpectedExpression,
                    format!("unexpected keyword '{}'", token.text),
                )),
            },
            TokenKind::Name => {
                if cursor.peek_token_nth(1).is_some_and(|t| t.is_symbol("->")) {
                    return self.single_param_lambda(cursor);
                }
                self.name_or_path(cursor)
            }
            TokenKind::Open(Delimiter::Paren) => {
                let after = cursor.group_len().and_then(|n| cursor.peek_token_nth(n));
                if after.is_some_and(|t| t.is_symbol("->")) {
                    return self.lambda(cursor);
                }
                let group = cursor.expect_group(Delimiter::Paren)?;
                match group.lines() {
                    [line] => self.full_expr(&mut ElementCursor::of_line(line)),
                    _ => Err(SyntaxError::parse(
                        ParseErrorKind::ExpectedExpression,
                        "expected one expression in parentheses",
                        group.span,
                    )),
                }
            }
            TokenKind::Open(Delimiter::Bracket) => self.collection(cursor),
            TokenKind::Symbol => {
                let Some(op) = UnaryOp::from_token(&token) else {
                    return Err(cursor.error(
                        ParseErrorKind::ExpectedExpression,
                        format!("unexpected '{}'", token.text),
                    ));
                };
                cursor.advance();

                // Fold `-literal` so the most negative values are representable.
                if op == UnaryOp::Neg
                    && let Some(next) = cursor.peek_token().copied()
                    && next.kind == TokenKind::Number
                {
                    cursor.advance();
                    return Ok(Expr::literal(number(&next, true)?, span.to(next.span)));
                }

                let operand = self.expr(cursor, UnaryOp::BINDING_POWER)?;
                let span = span.to(operand.span());
                Ok(Expr::Unary(UnaryExpr {
                    op,
                    operand: Box::new(operand),
                    span,
                }))
            }
            _ => Err(cursor.error(
                ParseErrorKind::ExpectedExpression,
                format!("unexpected '{}'", token.text),
            )),
        }
    }

    /// `a`, or `a::b::C` written with the scope separator.
    fn name_or_path(&mut self, cursor: &mut ElementCursor<'_, '_>) -> Result<Expr, SyntaxError> {
        let first = cursor.expect_name()?;
        if !cursor.check_symbol("::") {
            return Ok(Expr::name(first.text, first.span));
        }
        let mut segments = vec![first.text.to_string()];
        let mut span = first.span;
        while cursor.eat_symbol("::") {
            let segment = cursor.expect_name()?;
            span = span.to(segment.span);
            segments.push(segment.text.to_string());
        }
        Ok(Expr::Path(Path::new(segments, span)))
    }

    fn new_expr(&mut self, cursor: &mut ElementCursor<'_, '_>) -> Result<Expr, SyntaxError> {
        let start = cursor.span();
        cursor.advance();
        let ty = self.type_ref(cursor)?;
        let args = match cursor.eat_group(Delimiter::Paren)? {
            Some(group) => self.args(&group)?,
            None => Vec::new(),
        };
        Ok(Expr::New(NewExpr {
            ty,
            args,
            span: start.to(cursor.last_span()),
        }))
    }

    /// `x -> body`
    fn single_param_lambda(&mut self, cursor: &mut ElementCursor<'_, '_>) -> Result<Expr, SyntaxError> {
        let name = cursor.expect_name()?;
        let param = Param {
            modifiers: Modifiers::empty(),
            name: name.text.to_string(),
            ty: None,
            span: name.span,
        };
        cursor.expect_symbol("->")?;
        self.lambda_body(cursor, vec![param], name.span)
    }

    /// `(a, b) -> body`
    fn lambda(&mut self, cursor: &mut ElementCursor<'_, '_>) -> Result<Expr, SyntaxError> {
        let group = cursor.expect_group(Delimiter::Paren)?;
        let params = self.params(&group)?;
        cursor.expect_symbol("->")?;
        self.lambda_body(cursor, params, group.span)
    }

    fn lambda_body(
        &mut self,
        cursor: &mut ElementCursor<'_, '_>,
        params: Vec<Param>,
        start: Span,
    ) -> Result<Expr, SyntaxError> {
        let body = match cursor.eat_block() {
            Some(block) => LambdaBody::Block(self.block(block)),
            None if cursor.is_at_end() => LambdaBody::Block(Vec::new()),
            None => LambdaBody::Expr(Box::new(self.expr(cursor, 0)?)),
        };
        Ok(Expr::Lambda(LambdaExpr {
            params,
            body,
            span: start.to(cursor.last_span()),
        }))
    }

    /// `[a, b]` list or `["k": v]` map. `[:]` is the empty map.
    fn collection(&mut self, cursor: &mut ElementCursor<'_, '_>) -> Result<Expr, SyntaxError> {
        let group = cursor.expect_group(Delimiter::Bracket)?;
        let lines = group.lines();

        let is_map = lines.iter().any(|line| {
            line.elements
                .iter()
                .any(|e| e.as_token().is_some_and(|t| t.is_symbol(":")))
        });
        if !is_map {
            let items = lines
                .iter()
                .map(|line| self.full_expr(&mut ElementCursor::of_line(line)))
                .collect::<Result<_, _>>()?;
            return Ok(Expr::List(ListExpr { items, span: group.span }));
        }

        let mut entries = Vec::new();
        for line in lines {
            let mut entry = ElementCursor::of_line(line);
            if entry.check_symbol(":") && entry.peek_nth(1).is_none() {
                continue;
            }
            let key = self.expr(&mut entry, 0)?;
            entry.expect_symbol(":")?;
            let value = self.full_expr(&mut entry)?;
            entries.push((key, value));
        }
        Ok(Expr::Map(MapExpr {
            entries,
            span: group.span,
        }))
    }
}

/// Names after `.` may be keywords or modifiers (`x.type`, `t.val`).
fn member_name<'ast>(cursor: &mut ElementCursor<'_, 'ast>) -> Result<Token<'ast>, SyntaxError> {
    match cursor.peek_token().copied() {
        Some(t) if matches!(t.kind, TokenKind::Name | TokenKind::Keyword | TokenKind::Modifier | TokenKind::Bool) => {
            cursor.advance();
            Ok(t)
        }
        _ => Err(cursor.error(ParseErrorKind::ExpectedIdentifier, "expected a member name")),
    }
}

/// Numeric literal. Integers that do not fit in an `int` become `long`.
fn number(token: &Token<'_>, negative: bool) -> Result<Literal, SyntaxError> {
    let invalid = || SyntaxError::parse(ParseErrorKind::InvalidLiteral, format!("invalid number '{}'", token.text), token.span);
    let text = token.text.replace('_', "");
    let sign = if negative { "-" } else { "" };

    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        let (digits, long) = match hex.strip_suffix(['l', 'L']) {
            Some(digits) => (digits, true),
            None => (hex, false),
        };
        let value = i64::from_str_radix(digits, 16).map_err(|_| invalid())?;
        let value = if negative { -value } else { value };
        return match i32::try_from(value) {
            Ok(v) if !long => Ok(Literal::Int(v)),
            _ => Ok(Literal::Long(value)),
        };
    }

    let last = text.chars().last().unwrap_or('0').to_ascii_lowercase();
    let body = if matches!(last, 'l' | 'f' | 'd') { &text[..text.len() - 1] } else { text.as_str() };
    let signed = format!("{sign}{body}");

    match last {
        'l' => signed.parse().map(Literal::Long).map_err(|_| invalid()),
        'f' => signed.parse::<f64>().map(|v| Literal::Float(FloatLit::from(v))).map_err(|_| invalid()),
        'd' => signed.parse::<f64>().map(|v| Literal::Double(FloatLit::from(v))).map_err(|_| invalid()),
        _ if body.contains(['.', 'e', 'E']) => signed
            .parse::<f64>()
            .map(|v| Literal::Double(FloatLit::from(v)))
            .map_err(|_| invalid()),
        _ => {
            let value: i64 = signed.parse().map_err(|_| invalid())?;
            Ok(match i32::try_from(value) {
                Ok(v) => Literal::Int(v),
                Err(_) => Literal::Long(value),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::test_support::parse_expr;

    fn binary(expr: &Expr) -> (&Expr, BinaryOp, &Expr) {
        match expr {
            Expr::Binary(b) => (&b.left, b.op, &b.right),
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn precedence() {
        let expr = parse_expr("1 + 2 * 3");
        let (left, op, right) = binary(&expr);
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(left, Expr::Literal(LiteralExpr { value: Literal::Int(1), .. })));
        assert_eq!(binary(right).1, BinaryOp::Mul);
    }

    #[test]
    fn left_associative() {
        let expr = parse_expr("o + 1 + i");
        let (left, _, right) = binary(&expr);
        assert!(matches!(left, Expr::Binary(_)));
        assert!(matches!(right, Expr::Name(n) if n.name == "i"));
    }

    #[test]
    fn literals() {
        assert!(matches!(parse_expr("10L"), Expr::Literal(LiteralExpr { value: Literal::Long(10), .. })));
        assert!(matches!(parse_expr("1.5"), Expr::Literal(LiteralExpr { value: Literal::Double(_), .. })));
        assert!(matches!(parse_expr("2f"), Expr::Literal(LiteralExpr { value: Literal::Float(_), .. })));
        assert!(matches!(parse_expr("-2147483648"), Expr::Literal(LiteralExpr { value: Literal::Int(i32::MIN), .. })));
        assert!(matches!(parse_expr("3000000000"), Expr::Literal(LiteralExpr { value: Literal::Long(3_000_000_000), .. })));
        assert!(matches!(parse_expr("0xFF"), Expr::Literal(LiteralExpr { value: Literal::Int(255), .. })));
        assert!(matches!(parse_expr("yes"), Expr::Literal(LiteralExpr { value: Literal::Bool(true), .. })));
        assert!(matches!(parse_expr("'abc'"), Expr::Literal(LiteralExpr { value: Literal::Str(ref s), .. }) if s == "abc"));
    }

    #[test]
    fn calls_fields_and_paths() {
        match parse_expr("System.currentTimeMillis()") {
            Expr::Call(call) => {
                assert!(call.args.is_empty());
                assert_eq!(call.callee.as_path_segments(), Some(vec!["System".into(), "currentTimeMillis".into()]));
            }
            other => panic!("unexpected {other:?}"),
        }
        match parse_expr("java::util::LinkedList()") {
            Expr::Call(call) => assert!(matches!(*call.callee, Expr::Path(ref p) if p.segments.len() == 3)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn casts_bind_tighter_than_arithmetic() {
        let expr = parse_expr("1 + x as long");
        let (_, op, right) = binary(&expr);
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(right, Expr::Cast(_)));
    }

    #[test]
    fn lambdas() {
        match parse_expr("(o)->o+1+i") {
            Expr::Lambda(l) => {
                assert_eq!(l.params.len(), 1);
                assert!(matches!(l.body, LambdaBody::Expr(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(parse_expr("()->1"), Expr::Lambda(ref l) if l.params.is_empty()));
        assert!(matches!(parse_expr("x -> x"), Expr::Lambda(ref l) if l.params[0].name == "x"));
        assert!(matches!(parse_expr("(a:int, b) -> a"), Expr::Lambda(ref l) if l.params[0].ty.is_some()));
    }

    #[test]
    fn block_lambda() {
        match parse_expr("(x) -> {\n return x\n}") {
            Expr::Lambda(l) => assert!(matches!(l.body, LambdaBody::Block(ref b) if b.len() == 1)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn collections() {
        assert!(matches!(parse_expr("[1, 2, 3]"), Expr::List(ref l) if l.items.len() == 3));
        assert!(matches!(parse_expr("[]"), Expr::List(ref l) if l.items.is_empty()));
        assert!(matches!(parse_expr("['a':1, 'b':2]"), Expr::Map(ref m) if m.entries.len() == 2));
        assert!(matches!(parse_expr("[:]"), Expr::Map(ref m) if m.entries.is_empty()));
    }

    #[test]
    fn unary_and_new() {
        assert!(matches!(parse_expr("!a"), Expr::Unary(ref u) if u.op == UnaryOp::Not));
        assert!(matches!(parse_expr("new Object"), Expr::New(ref n) if n.args.is_empty()));
        assert!(matches!(parse_expr("new StringBuilder('x')"), Expr::New(ref n) if n.args.len() == 1));
    }
}
