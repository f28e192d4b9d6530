//! Top-level and member declarations.

use latte_core::{ParseErrorKind, Span, SyntaxError};
use latte_scanner::{Delimiter, ElementTree, Line, TokenKind};

use super::Parser;
use super::stmt::is_function_header;
use crate::ast::*;
use crate::cursor::ElementCursor;

impl Parser {
    pub(super) fn unit(&mut self, tree: &ElementTree<'_>) -> CompilationUnit {
        let mut unit = CompilationUnit::default();
        for line in tree.lines() {
            if let Err(error) = self.top_level(line, &mut unit) {
                self.report(error);
            }
        }
        unit
    }

    fn top_level(&mut self, line: &Line<'_>, unit: &mut CompilationUnit) -> Result<(), SyntaxError> {
        let mut cursor = ElementCursor::of_line(line);
        let span = cursor.span();

        if cursor.eat_keyword("package") {
            if unit.package.is_some() || !unit.imports.is_empty() || !unit.types.is_empty() {
                return Err(SyntaxError::parse(
                    ParseErrorKind::InvalidDeclaration,
                    "package must be the first declaration",
                    span,
                ));
            }
            let path = self.path(&mut cursor)?;
            cursor.expect_end()?;
            unit.package = Some(path);
            return Ok(());
        }

        if cursor.eat_keyword("import") {
            loop {
                unit.imports.push(self.import(&mut cursor)?);
                if !cursor.eat_separator() {
                    break;
                }
            }
            return cursor.expect_end();
        }

        let modifiers = self.modifiers(&mut cursor)?;
        if cursor.eat_keyword("class") {
            let class = self.class(&mut cursor, modifiers, span)?;
            unit.types.push(TypeDecl::Class(class));
            Ok(())
        } else if cursor.eat_keyword("interface") {
            let interface = self.interface(&mut cursor, modifiers, span)?;
            unit.types.push(TypeDecl::Interface(interface));
            Ok(())
        } else {
            Err(cursor.error(
                ParseErrorKind::InvalidDeclaration,
                "expected 'package', 'import', 'class' or 'interface'",
            ))
        }
    }

    /// `a::b::C`, `a::b::_`
    fn import(&mut self, cursor: &mut ElementCursor<'_, '_>) -> Result<ImportDecl, SyntaxError> {
        let start = cursor.span();
        let mut path = self.path(cursor)?;
        let wildcard = path.last() == "_";
        if wildcard {
            path.segments.pop();
        }
        if path.segments.is_empty() {
            return Err(SyntaxError::parse(ParseErrorKind::ExpectedIdentifier, "empty import", start));
        }
        let span = start.to(cursor.last_span());
        Ok(ImportDecl { path, wildcard, span })
    }

    // =========================================
    // Classes
    // =========================================

    fn class(
        &mut self,
        cursor: &mut ElementCursor<'_, '_>,
        modifiers: Modifiers,
        span: Span,
    ) -> Result<ClassDecl, SyntaxError> {
        let name = cursor.expect_name()?;
        let params = match cursor.eat_group(Delimiter::Paren)? {
            Some(group) => self.params(&group)?,
            None => Vec::new(),
        };
        let parents = if cursor.eat_symbol(":") { self.parents(cursor)? } else { Vec::new() };

        let mut members = Vec::new();
        if let Some(body) = cursor.eat_block() {
            self.members(body, false, &mut members);
        }
        cursor.expect_end()?;

        Ok(ClassDecl {
            modifiers,
            name: name.text.to_string(),
            params,
            parents,
            members,
            span,
        })
    }

    /// `Base(args), Iface, ...`
    fn parents(&mut self, cursor: &mut ElementCursor<'_, '_>) -> Result<Vec<ParentRef>, SyntaxError> {
        let mut parents = Vec::new();
        loop {
            let ty = self.path(cursor)?;
            let args = match cursor.eat_group(Delimiter::Paren)? {
                Some(group) => Some(self.args(&group)?),
                None => None,
            };
            let span = ty.span.to(cursor.last_span());
            parents.push(ParentRef { ty, args, span });
            if !cursor.eat_separator() {
                return Ok(parents);
            }
        }
    }

    fn members(&mut self, body: &ElementTree<'_>, in_static: bool, members: &mut Vec<Member>) {
        let lines = body.lines();
        let mut index = 0;
        while index < lines.len() {
            let line = &lines[index];
            let mut cursor = ElementCursor::of_line(line);

            // `static` on its own line opens a section of static members.
            if cursor.check_keyword("static") && cursor.peek_nth(1).is_none_or(|e| e.as_layer().is_some() && cursor.peek_nth(2).is_none()) {
                index += 1;
                cursor.advance();
                if let Some(section) = cursor.eat_block() {
                    self.members(section, true, members);
                }
                continue;
            }

            if is_member_declaration(&cursor) {
                index += 1;
                match self.member(&mut cursor, in_static) {
                    Ok(member) => members.push(member),
                    Err(error) => self.report(error),
                }
                continue;
            }

            let span = line.span;
            let stmt = match self.stmt(lines, &mut index) {
                Ok(stmt) => stmt,
                Err(error) => {
                    self.report(error);
                    continue;
                }
            };
            match members.last_mut() {
                Some(Member::Init(block)) if block.is_static == in_static => block.body.push(stmt),
                _ => members.push(Member::Init(InitBlock {
                    is_static: in_static,
                    body: vec![stmt],
                    span,
                })),
            }
        }
    }

    fn member(&mut self, cursor: &mut ElementCursor<'_, '_>, in_static: bool) -> Result<Member, SyntaxError> {
        let span = cursor.span();
        let mut modifiers = self.modifiers(cursor)?;
        if in_static {
            modifiers |= Modifiers::STATIC;
        }

        let is_method = modifiers.contains(Modifiers::DEF) || is_function_header(cursor) || {
            // `abstract f(x)` has no body to tell it apart from a field.
            cursor.peek_token_nth(1).is_some_and(|t| t.kind == TokenKind::Open(Delimiter::Paren))
        };
        if is_method {
            return Ok(Member::Method(self.function(cursor, modifiers, span)?));
        }

        let name = cursor.expect_name()?;
        let ty = if cursor.eat_symbol(":") { Some(self.type_ref(cursor)?) } else { None };
        let init = if cursor.eat_symbol("=") { Some(self.full_expr(cursor)?) } else { None };
        cursor.expect_end()?;
        Ok(Member::Field(FieldDecl {
            modifiers,
            name: name.text.to_string(),
            ty,
            init,
            span: span.to(cursor.last_span()),
        }))
    }

    /// `name[(params)][: Type] [= expr | block]`, after the modifiers.
    pub(super) fn function(
        &mut self,
        cursor: &mut ElementCursor<'_, '_>,
        modifiers: Modifiers,
        span: Span,
    ) -> Result<FnDecl, SyntaxError> {
        let name = cursor.expect_name()?;
        let params = match cursor.eat_group(Delimiter::Paren)? {
            Some(group) => self.params(&group)?,
            None => Vec::new(),
        };
        let ret = if cursor.eat_symbol(":") { Some(self.type_ref(cursor)?) } else { None };

        let body = if cursor.eat_symbol("=") {
            FnBody::Expr(self.full_expr(cursor)?)
        } else if let Some(block) = cursor.eat_block() {
            FnBody::Block(self.block(block))
        } else {
            FnBody::None
        };
        cursor.expect_end()?;

        Ok(FnDecl {
            modifiers,
            name: name.text.to_string(),
            params,
            ret,
            body,
            span,
        })
    }

    // =========================================
    // Interfaces
    // =========================================

    fn interface(
        &mut self,
        cursor: &mut ElementCursor<'_, '_>,
        modifiers: Modifiers,
        span: Span,
    ) -> Result<InterfaceDecl, SyntaxError> {
        let name = cursor.expect_name()?;
        let mut parents = Vec::new();
        if cursor.eat_symbol(":") {
            loop {
                parents.push(self.path(cursor)?);
                if !cursor.eat_separator() {
                    break;
                }
            }
        }

        let mut methods = Vec::new();
        if let Some(body) = cursor.eat_block() {
            for line in body.lines() {
                let mut member = ElementCursor::of_line(line);
                let span = member.span();
                let result = self
                    .modifiers(&mut member)
                    .and_then(|modifiers| self.function(&mut member, modifiers | Modifiers::ABSTRACT, span));
                match result {
                    Ok(method) if !method.is_abstract() => self.report(SyntaxError::parse(
                        ParseErrorKind::InvalidDeclaration,
                        format!("interface method '{}' cannot have a body", method.name),
                        method.span,
                    )),
                    Ok(method) => methods.push(method),
                    Err(error) => self.report(error),
                }
            }
        }
        cursor.expect_end()?;

        Ok(InterfaceDecl {
            modifiers,
            name: name.text.to_string(),
            parents,
            methods,
            span,
        })
    }
}

/// Whether a class-body line declares a field or method rather than being
/// an initializer statement.
fn is_member_declaration(cursor: &ElementCursor<'_, '_>) -> bool {
    let Some(first) = cursor.peek_token() else {
        return false;
    };
    if first.is_keyword("static") {
        return true;
    }
    if first.kind == TokenKind::Modifier {
        // `synchronized(a) ...` is a statement; `synchronized def f` is not.
        let opens_pair = cursor.peek_token_nth(1).is_some_and(|t| t.kind == TokenKind::Open(Delimiter::Paren));
        return !(first.text == "synchronized" && opens_pair);
    }
    if first.kind != TokenKind::Name {
        return false;
    }
    if is_function_header(cursor) {
        return true;
    }
    match cursor.peek_token_nth(1) {
        None => cursor.peek_nth(1).is_none(),
        Some(next) => next.is_symbol(":") || next.is_symbol("="),
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::test_support::{parse_unit, parse_unit_err};

    #[test]
    fn package_and_imports() {
        let unit = parse_unit("package a::b\nimport java::util::_\nimport java.util.Collections._, x::Y\nclass A");
        assert_eq!(unit.package.as_ref().map(|p| p.segments.len()), Some(2));
        assert_eq!(unit.imports.len(), 3);
        assert!(unit.imports[0].wildcard);
        assert_eq!(unit.imports[1].path.to_string(), "java.util.Collections");
        assert!(unit.imports[1].wildcard);
        assert!(!unit.imports[2].wildcard);
        assert_eq!(unit.imports[2].line(), 3);
    }

    #[test]
    fn class_header() {
        let unit = parse_unit("class A(a, public b:int):B(a), java::io::Serializable\n    protected x=1");
        let TypeDecl::Class(class) = &unit.types[0] else { panic!("expected a class") };
        assert_eq!(class.name, "A");
        assert_eq!(class.params.len(), 2);
        assert!(class.params[1].modifiers.contains(Modifiers::PUBLIC));
        assert_eq!(class.parents.len(), 2);
        assert_eq!(class.parents[0].args.as_ref().map(Vec::len), Some(1));
        assert!(class.parents[1].args.is_none());
        assert!(matches!(&class.members[0], Member::Field(f) if f.modifiers.contains(Modifiers::PROTECTED)));
    }

    #[test]
    fn methods_in_both_styles() {
        let unit = parse_unit(
            "class T\n  def f_int(i:int):int=i\n  method(a,b):Unit\n    a.i+=1\n  static\n    g()=1\n    h = 2\n  def x = 1",
        );
        let TypeDecl::Class(class) = &unit.types[0] else { panic!("expected a class") };
        let methods: Vec<_> = class.methods().collect();
        assert_eq!(methods.len(), 4);
        assert!(matches!(methods[0].ret, Some(TypeRef::Primitive(..))));
        assert!(matches!(methods[1].ret, Some(TypeRef::Unit(_))));
        assert!(methods[2].is_static());
        assert!(!methods[3].is_static());
        let fields: Vec<_> = class.fields().collect();
        assert_eq!(fields.len(), 1);
        assert!(fields[0].modifiers.contains(Modifiers::STATIC));
    }

    #[test]
    fn init_statements_are_grouped() {
        let unit = parse_unit("class T\n  x = 1\n  println(x)\n  println(2)\n  static\n    println(3)");
        let TypeDecl::Class(class) = &unit.types[0] else { panic!("expected a class") };
        let inits: Vec<_> = class
            .members
            .iter()
            .filter_map(|m| match m {
                Member::Init(b) => Some(b),
                _ => None,
            })
            .collect();
        assert_eq!(inits.len(), 2);
        assert_eq!(inits[0].body.len(), 2);
        assert!(inits[1].is_static);
    }

    #[test]
    fn interfaces() {
        let unit = parse_unit("interface IntParamReturnInt\n  def x(i:int):int");
        assert!(matches!(&unit.types[0], TypeDecl::Interface(i) if i.methods[0].is_abstract()));
        let errors = parse_unit_err("interface Bad\n  def y = 1");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn stray_top_level_statement_is_an_error() {
        let errors = parse_unit_err("x = 1\nclass A\nreturn 2");
        assert_eq!(errors.len(), 2);
    }
}
