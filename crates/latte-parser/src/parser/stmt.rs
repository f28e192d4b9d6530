//! Statement parsing.

use latte_core::{ParseErrorKind, Span, SyntaxError};
use latte_scanner::{Delimiter, ElementTree, Line, TokenKind};

use super::Parser;
use crate::ast::*;
use crate::cursor::ElementCursor;

impl Parser {
    /// Parse the lines of a block. Bad statements are reported and skipped.
    pub(super) fn block(&mut self, tree: &ElementTree<'_>) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        let lines = tree.lines();
        let mut index = 0;
        while index < lines.len() {
            match self.stmt(lines, &mut index) {
                Ok(stmt) => stmts.push(stmt),
                Err(error) => self.report(error),
            }
        }
        stmts
    }

    fn body(&mut self, cursor: &mut ElementCursor<'_, '_>) -> Result<Vec<Stmt>, SyntaxError> {
        let body = cursor.eat_block().map(|block| self.block(block)).unwrap_or_default();
        cursor.expect_end()?;
        Ok(body)
    }

    /// Parse the statement at `lines[*index]`, advancing past every line it
    /// uses (an `if` also takes its `elseif`/`else` lines).
    pub(super) fn stmt(&mut self, lines: &[Line<'_>], index: &mut usize) -> Result<Stmt, SyntaxError> {
        let line = &lines[*index];
        *index += 1;
        let mut cursor = ElementCursor::of_line(line);
        let span = cursor.span();
        let Some(first) = cursor.peek_token().copied() else {
            return Err(cursor.error(ParseErrorKind::InvalidStatement, "expected a statement"));
        };

        match (first.kind, first.text) {
            (TokenKind::Keyword, "return") => {
                cursor.advance();
                let value = if cursor.is_at_end() {
                    None
                } else {
                    Some(self.full_expr(&mut cursor)?)
                };
                Ok(Stmt::Return(ReturnStmt {
                    value,
                    span: span.to(cursor.last_span()),
                }))
            }
            (TokenKind::Keyword, "if") => self.if_stmt(lines, index, cursor),
            (TokenKind::Keyword, "elseif" | "else") => Err(cursor.error(
                ParseErrorKind::DanglingElse,
                format!("'{}' without a preceding 'if'", first.text),
            )),
            (TokenKind::Keyword, "while") => {
                cursor.advance();
                let cond = self.expr(&mut cursor, 0)?;
                let body = self.body(&mut cursor)?;
                Ok(Stmt::While(WhileStmt { cond, body, span }))
            }
            (TokenKind::Keyword, "for") => {
                cursor.advance();
                let var = cursor.expect_name()?;
                if !cursor.eat_keyword("in") {
                    return Err(cursor.error(ParseErrorKind::ExpectedToken, "expected 'in'"));
                }
                let iterable = self.expr(&mut cursor, 0)?;
                let body = self.body(&mut cursor)?;
                Ok(Stmt::For(ForStmt {
                    var: var.text.to_string(),
                    iterable,
                    body,
                    span,
                }))
            }
            (TokenKind::Keyword, "try") => self.try_stmt(lines, index, cursor),
            (TokenKind::Keyword, "catch" | "finally") => Err(cursor.error(
                ParseErrorKind::InvalidStatement,
                format!("'{}' without a preceding 'try'", first.text),
            )),
            (TokenKind::Keyword, "throw") => {
                cursor.advance();
                let value = self.full_expr(&mut cursor)?;
                Ok(Stmt::Throw(ThrowStmt { value, span }))
            }
            (TokenKind::Keyword, "break") => {
                cursor.advance();
                cursor.expect_end()?;
                Ok(Stmt::Break(span))
            }
            (TokenKind::Keyword, "continue") => {
                cursor.advance();
                cursor.expect_end()?;
                Ok(Stmt::Continue(span))
            }
            (TokenKind::Symbol, "...") => {
                cursor.advance();
                cursor.expect_end()?;
                Ok(Stmt::Pass(span))
            }
            (TokenKind::Modifier, "synchronized")
                if cursor.peek_token_nth(1).is_some_and(|t| t.kind == TokenKind::Open(Delimiter::Paren)) =>
            {
                self.synchronized(cursor)
            }
            (TokenKind::Modifier, _) => self.modified_stmt(cursor),
            (TokenKind::Name, _) => self.name_stmt(cursor),
            _ => self.expr_stmt(cursor),
        }
    }

    fn if_stmt(
        &mut self,
        lines: &[Line<'_>],
        index: &mut usize,
        mut cursor: ElementCursor<'_, '_>,
    ) -> Result<Stmt, SyntaxError> {
        let span = cursor.span();
        cursor.advance();
        let cond = self.expr(&mut cursor, 0)?;
        let body = self.body(&mut cursor)?;
        let mut branches = vec![IfBranch { cond, body, span }];
        let mut else_body = None;

        while let Some(line) = lines.get(*index) {
            let mut next = ElementCursor::of_line(line);
            let branch_span = next.span();
            if next.eat_keyword("elseif") {
                *index += 1;
                let cond = self.expr(&mut next, 0)?;
                let body = self.body(&mut next)?;
                branches.push(IfBranch {
                    cond,
                    body,
                    span: branch_span,
                });
            } else if next.eat_keyword("else") {
                *index += 1;
                // `else if` is the same as `elseif`.
                if next.eat_keyword("if") {
                    let cond = self.expr(&mut next, 0)?;
                    let body = self.body(&mut next)?;
                    branches.push(IfBranch {
                        cond,
                        body,
                        span: branch_span,
                    });
                    continue;
                }
                else_body = Some(self.body(&mut next)?);
                break;
            } else {
                break;
            }
        }

        Ok(Stmt::If(IfStmt {
            branches,
            else_body,
            span,
        }))
    }

    /// `try`, then an optional `catch e` line and an optional `finally`
    /// line. At least one of the two has to be there.
    fn try_stmt(
        &mut self,
        lines: &[Line<'_>],
        index: &mut usize,
        mut cursor: ElementCursor<'_, '_>,
    ) -> Result<Stmt, SyntaxError> {
        let span = cursor.span();
        cursor.advance();
        let body = self.body(&mut cursor)?;

        let mut catch = None;
        if let Some(line) = lines.get(*index) {
            let mut next = ElementCursor::of_line(line);
            let catch_span = next.span();
            if next.eat_keyword("catch") {
                *index += 1;
                let var = next.expect_name()?;
                let body = self.body(&mut next)?;
                catch = Some(CatchClause {
                    var: var.text.to_string(),
                    body,
                    span: catch_span,
                });
            }
        }

        let mut finally = None;
        if let Some(line) = lines.get(*index) {
            let mut next = ElementCursor::of_line(line);
            if next.eat_keyword("finally") {
                *index += 1;
                finally = Some(self.body(&mut next)?);
            }
        }

        if catch.is_none() && finally.is_none() {
            return Err(SyntaxError::parse(
                ParseErrorKind::InvalidStatement,
                "'try' needs a 'catch' or a 'finally'",
                span,
            ));
        }
        Ok(Stmt::Try(TryStmt {
            body,
            catch,
            finally,
            span,
        }))
    }

    fn synchronized(&mut self, mut cursor: ElementCursor<'_, '_>) -> Result<Stmt, SyntaxError> {
        let span = cursor.span();
        cursor.advance();
        let group = cursor.expect_group(Delimiter::Paren)?;
        if group.is_empty() {
            return Err(SyntaxError::parse(
                ParseErrorKind::InvalidStatement,
                "synchronized needs at least one lock",
                group.span,
            ));
        }
        let locks = self.args(&group)?;
        let body = self.body(&mut cursor)?;
        Ok(Stmt::Synchronized(SyncStmt { locks, body, span }))
    }

    /// `def f(...)`, `val x = e`, `var x : T`
    fn modified_stmt(&mut self, mut cursor: ElementCursor<'_, '_>) -> Result<Stmt, SyntaxError> {
        let span = cursor.span();
        let modifiers = self.modifiers(&mut cursor)?;
        if modifiers.contains(Modifiers::DEF) {
            return Ok(Stmt::InnerFn(self.function(&mut cursor, modifiers, span)?));
        }
        if !modifiers.intersects(Modifiers::VAL | Modifiers::VAR) || !(modifiers - Modifiers::VAL - Modifiers::VAR).is_empty() {
            return Err(SyntaxError::parse(
                ParseErrorKind::InvalidModifier,
                "only 'val', 'var' and 'def' are allowed on local declarations",
                span,
            ));
        }
        let name = cursor.expect_name()?;
        self.local(cursor, name.text, modifiers.contains(Modifiers::VAL), span)
    }

    fn local(
        &mut self,
        mut cursor: ElementCursor<'_, '_>,
        name: &str,
        immutable: bool,
        span: Span,
    ) -> Result<Stmt, SyntaxError> {
        let ty = if cursor.eat_symbol(":") {
            Some(self.type_ref(&mut cursor)?)
        } else {
            None
        };
        let value = if cursor.eat_symbol("=") {
            Some(self.full_expr(&mut cursor)?)
        } else {
            cursor.expect_end()?;
            None
        };
        Ok(Stmt::Local(LocalStmt {
            name: name.to_string(),
            ty,
            value,
            immutable,
            span: span.to(cursor.last_span()),
        }))
    }

    /// Statements starting with a name: `x : T = e`, `inner(a) = e`, or an
    /// expression / assignment.
    fn name_stmt(&mut self, mut cursor: ElementCursor<'_, '_>) -> Result<Stmt, SyntaxError> {
        let span = cursor.span();

        if cursor.peek_token_nth(1).is_some_and(|t| t.is_symbol(":")) {
            let name = cursor.expect_name()?;
            return self.local(cursor, name.text, false, span);
        }

        if is_function_header(&cursor) {
            let decl = self.function(&mut cursor, Modifiers::empty(), span)?;
            return Ok(Stmt::InnerFn(decl));
        }

        self.expr_stmt(cursor)
    }

    fn expr_stmt(&mut self, mut cursor: ElementCursor<'_, '_>) -> Result<Stmt, SyntaxError> {
        let span = cursor.span();
        let expr = self.expr(&mut cursor, 0)?;
        let Some(op) = cursor.peek_token().and_then(AssignOp::from_token) else {
            cursor.expect_end()?;
            return Ok(Stmt::Expr(expr));
        };
        if !matches!(expr, Expr::Name(_) | Expr::Field(_)) {
            return Err(SyntaxError::parse(
                ParseErrorKind::InvalidStatement,
                "invalid assignment target",
                expr.span(),
            ));
        }
        cursor.advance();
        let value = self.full_expr(&mut cursor)?;
        Ok(Stmt::Assign(AssignStmt {
            target: expr,
            op,
            span: span.to(value.span()),
            value,
        }))
    }
}

/// `name(params)` followed by `:`, `=` or a block declares a function.
pub(super) fn is_function_header(cursor: &ElementCursor<'_, '_>) -> bool {
    if !cursor.check_kind(TokenKind::Name) {
        return false;
    }
    let mut ahead = ElementCursor::new(&cursor.rest()[1..]);
    let Some(len) = ahead.group_len() else {
        return false;
    };
    if !ahead.check_open(Delimiter::Paren) {
        return false;
    }
    for _ in 0..len {
        ahead.advance();
    }
    ahead.check_symbol(":") || ahead.check_symbol("=") || ahead.check_block()
}
