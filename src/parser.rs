//! Parser for Cinder
//!
//! Recursive descent over statements, precedence climbing over expressions.
//! Running out of tokens and reaching the `Eof` token are treated the same:
//! there is no current token.

use crate::ast::{BinaryOp, Expr, Literal, PostfixOp, Program, Stmt, UnaryOp};
use crate::error::{CinderError, ErrorKind, Result};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Span, Token, TokenKind};
use tracing::{debug, trace};

/// The parser state
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    /// Create a new parser from tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    /// Parse the tokens into a program
    pub fn parse(&mut self) -> Result<Program> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            let start = self.current;
            let stmt = self.statement()?;
            self.ensure_progress(start, "program")?;
            self.terminator(&stmt)?;
            statements.push(stmt);
        }

        debug!(statements = statements.len(), "parsed program");
        Ok(Program::new(statements))
    }

    // ==================== Statements ====================

    fn statement(&mut self) -> Result<Stmt> {
        ensure_sufficient_stack(|| self.statement_inner())
    }

    fn statement_inner(&mut self) -> Result<Stmt> {
        let Some(token) = self.peek() else {
            return Err(self.error_expected("statement"));
        };
        trace!(token = %token.kind, line = token.span.line, "statement");

        match &token.kind {
            TokenKind::Ident(_) => self.identifier_statement(),
            TokenKind::Var => self.var_declaration(),
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::Func => self.function_declaration(),
            TokenKind::Return => self.return_statement(),
            other => Err(CinderError::at(
                ErrorKind::UnexpectedToken(other.to_string()),
                token.span,
            )),
        }
    }

    /// A statement ends with `;` unless it just closed its own `end`.
    fn terminator(&mut self, stmt: &Stmt) -> Result<()> {
        if self.match_token(&TokenKind::Semicolon) || closes_with_end(stmt) {
            Ok(())
        } else {
            Err(self.error_expected("';'"))
        }
    }

    /// Statements up to (not including) one of `terminators`.
    fn block(&mut self, construct: &'static str, terminators: &[TokenKind]) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();

        while !self.is_at_end() && !terminators.iter().any(|t| self.check(t)) {
            let start = self.current;
            let stmt = self.statement()?;
            self.ensure_progress(start, construct)?;
            self.terminator(&stmt)?;
            stmts.push(stmt);
        }

        Ok(stmts)
    }

    fn ensure_progress(&self, start: usize, construct: &'static str) -> Result<()> {
        if self.current == start {
            return Err(CinderError::new(
                ErrorKind::ParserStalled(construct),
                Some(self.current_span()),
            ));
        }
        Ok(())
    }

    /// `x = expr`, `f(args)` or `xs[i] = expr`
    fn identifier_statement(&mut self) -> Result<Stmt> {
        let (name, span) = self.expect_ident("identifier")?;

        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Equal) => {
                self.advance();
                let value = self.expression()?;
                Ok(Stmt::Assign { name, value, span })
            }
            Some(TokenKind::LeftParen) => {
                let expr = self.finish_call(name, span)?;
                Ok(Stmt::Expr { expr })
            }
            Some(TokenKind::LeftBracket) => {
                // the last subscript is the one assigned through
                let mut array = Expr::Variable { name, span };
                let mut index = self.subscript()?;
                while self.check(&TokenKind::LeftBracket) {
                    array = Expr::Index {
                        array: Box::new(array),
                        index: Box::new(index),
                        span,
                    };
                    index = self.subscript()?;
                }

                self.expect(&TokenKind::Equal, "'=' after index target")?;
                let value = self.expression()?;
                Ok(Stmt::IndexAssign { array, index, value, span })
            }
            _ => Err(self.error_expected("'=', '(' or '[' after identifier")),
        }
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let span = self.advance_span(); // 'var'

        let (name, _) = self.expect_ident("variable name")?;
        self.expect(&TokenKind::Equal, "'=' and an initializer after variable name")?;
        let initializer = self.expression()?;

        Ok(Stmt::VarDecl { name, initializer, span })
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        let span = self.advance_span(); // 'if'

        self.expect(&TokenKind::LeftParen, "'(' after 'if'")?;
        let condition = self.expression()?;
        self.expect(&TokenKind::RightParen, "')' after if condition")?;
        self.expect(&TokenKind::Colon, "':' before if body")?;

        let body = self.block("if", &[TokenKind::End, TokenKind::Else])?;

        let else_branch = if self.match_token(&TokenKind::Else) {
            if self.check(&TokenKind::If) {
                // the nested if owns the chain's closing 'end'
                Some(vec![self.if_statement()?])
            } else {
                self.expect(&TokenKind::Colon, "':' or 'if' after 'else'")?;
                let else_body = self.block("else", &[TokenKind::End])?;
                if else_body.is_empty() {
                    return Err(CinderError::at(ErrorKind::EmptyBody("else"), self.current_span()));
                }
                self.expect(&TokenKind::End, "'end' after else body")?;
                Some(else_body)
            }
        } else {
            self.expect(&TokenKind::End, "'end' after if body")?;
            None
        };

        Ok(Stmt::If { condition, body, else_branch, span })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        let span = self.advance_span(); // 'while'

        self.expect(&TokenKind::LeftParen, "'(' after 'while'")?;
        let condition = self.expression()?;
        self.expect(&TokenKind::RightParen, "')' after while condition")?;
        self.expect(&TokenKind::Colon, "':' before while body")?;

        let body = self.block("while", &[TokenKind::End])?;
        self.expect(&TokenKind::End, "'end' after while body")?;

        Ok(Stmt::While { condition, body, span })
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        let span = self.advance_span(); // 'for'

        self.expect(&TokenKind::LeftParen, "'(' after 'for'")?;
        if !self.check(&TokenKind::Var) {
            return Err(self.error_expected("'var' declaration in for loop"));
        }
        let init = self.var_declaration()?;
        self.expect(&TokenKind::Semicolon, "';' after for-loop declaration")?;
        let condition = self.expression()?;
        self.expect(&TokenKind::Semicolon, "';' after for-loop condition")?;
        let increment = self.for_increment()?;
        self.expect(&TokenKind::RightParen, "')' after for-loop increment")?;
        self.expect(&TokenKind::Colon, "':' before for body")?;

        let body = self.block("for", &[TokenKind::End])?;
        if body.is_empty() {
            return Err(CinderError::at(ErrorKind::EmptyBody("for"), self.current_span()));
        }
        self.expect(&TokenKind::End, "'end' after for body")?;

        Ok(Stmt::For {
            init: Box::new(init),
            condition,
            increment: Box::new(increment),
            body,
            span,
        })
    }

    /// `i++`, `i--`, `++i`, `--i` or `i = expr`; nothing else.
    fn for_increment(&mut self) -> Result<Stmt> {
        let invalid = |parser: &Self| CinderError::at(ErrorKind::InvalidIncrement, parser.current_span());

        match self.peek().map(|t| t.kind.clone()) {
            Some(TokenKind::Ident(name)) => {
                let span = self.advance_span();
                let op = match self.peek().map(|t| &t.kind) {
                    Some(TokenKind::PlusPlus) => PostfixOp::Increment,
                    Some(TokenKind::MinusMinus) => PostfixOp::Decrement,
                    Some(TokenKind::Equal) => {
                        self.advance();
                        let value = self.expression()?;
                        return Ok(Stmt::Assign { name, value, span });
                    }
                    _ => return Err(invalid(self)),
                };
                self.advance();
                Ok(Stmt::Expr {
                    expr: Expr::Postfix { name, op, span },
                })
            }
            Some(kind @ (TokenKind::PlusPlus | TokenKind::MinusMinus)) => {
                let span = self.advance_span();
                let Some(TokenKind::Ident(name)) = self.peek().map(|t| t.kind.clone()) else {
                    return Err(invalid(self));
                };
                let var_span = self.advance_span();
                let op = if kind == TokenKind::PlusPlus {
                    BinaryOp::Add
                } else {
                    BinaryOp::Sub
                };

                // ++i desugars to i = i + 1
                let value = Expr::Binary {
                    left: Box::new(Expr::Variable { name: name.clone(), span: var_span }),
                    op,
                    right: Box::new(Expr::Literal { value: Literal::Int(1), span }),
                    span,
                };
                Ok(Stmt::Assign { name, value, span })
            }
            _ => Err(invalid(self)),
        }
    }

    fn function_declaration(&mut self) -> Result<Stmt> {
        let span = self.advance_span(); // 'func'

        let (name, _) = self.expect_ident("function name")?;
        self.expect(&TokenKind::LeftParen, "'(' after function name")?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                let (param, param_span) = self.expect_ident("parameter name")?;
                if params.contains(&param) {
                    return Err(CinderError::at(ErrorKind::DuplicateParameter(param), param_span));
                }
                params.push(param);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(&TokenKind::RightParen, "')' after parameters")?;
        self.expect(&TokenKind::Colon, "':' before function body")?;

        let body = self.block("function", &[TokenKind::End])?;
        self.expect(&TokenKind::End, "'end' after function body")?;

        Ok(Stmt::Function { name, params, body, span })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let span = self.advance_span(); // 'return'

        let value = if self.check(&TokenKind::Semicolon) {
            Expr::Nothing { span }
        } else {
            self.expression()?
        };

        Ok(Stmt::Return { value, span })
    }

    // ==================== Expressions ====================

    pub fn expression(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.or_expr())
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut left = self.and_expr()?;

        while self.match_token(&TokenKind::Or) {
            let right = self.and_expr()?;
            left = binary(left, BinaryOp::Or, right);
        }

        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut left = self.comparison()?;

        while self.match_token(&TokenKind::And) {
            let right = self.comparison()?;
            left = binary(left, BinaryOp::And, right);
        }

        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut left = self.term()?;

        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::EqualEqual) => BinaryOp::Eq,
                Some(TokenKind::BangEqual) => BinaryOp::Ne,
                Some(TokenKind::Less) => BinaryOp::Lt,
                Some(TokenKind::LessEqual) => BinaryOp::Le,
                Some(TokenKind::Greater) => BinaryOp::Gt,
                Some(TokenKind::GreaterEqual) => BinaryOp::Ge,
                _ => break,
            };
            self.advance();

            let right = self.term()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut left = self.factor()?;

        loop {
            let op = if self.match_token(&TokenKind::Plus) {
                BinaryOp::Add
            } else if self.match_token(&TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };

            let right = self.factor()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut left = self.unary()?;

        loop {
            let op = if self.match_token(&TokenKind::Star) {
                BinaryOp::Mul
            } else if self.match_token(&TokenKind::Slash) {
                BinaryOp::Div
            } else {
                break;
            };

            let right = self.unary()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.unary_inner())
    }

    fn unary_inner(&mut self) -> Result<Expr> {
        let op = if self.check(&TokenKind::Minus) {
            UnaryOp::Neg
        } else if self.check(&TokenKind::Plus) {
            UnaryOp::Plus
        } else {
            return self.primary();
        };

        let span = self.advance_span();
        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            span,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error_expected("expression"));
        };
        let span = token.span;

        let literal = match token.kind {
            TokenKind::Int(n) => Literal::Int(n),
            TokenKind::Float(n) => Literal::Float(n),
            TokenKind::String(s) => Literal::String(s),
            TokenKind::True => Literal::Bool(true),
            TokenKind::False => Literal::Bool(false),
            TokenKind::Nothing => {
                self.advance();
                return Ok(Expr::Nothing { span });
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.check(&TokenKind::LeftParen) {
                    return self.finish_call(name, span);
                }
                return self.index_chain(Expr::Variable { name, span });
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(&TokenKind::RightParen, "')' after expression")?;
                return Ok(expr);
            }
            TokenKind::LeftBracket => return self.array_literal(),
            _ => return Err(self.error_expected("expression")),
        };

        self.advance();
        Ok(Expr::Literal { value: literal, span })
    }

    fn array_literal(&mut self) -> Result<Expr> {
        let span = self.advance_span(); // '['

        let mut elements = Vec::new();
        if !self.check(&TokenKind::RightBracket) {
            loop {
                elements.push(self.expression()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(&TokenKind::RightBracket, "']' after array elements")?;
        Ok(Expr::Array { elements, span })
    }

    /// Zero or more `[expr]` suffixes applied to `target`
    fn index_chain(&mut self, mut target: Expr) -> Result<Expr> {
        while self.check(&TokenKind::LeftBracket) {
            let index = self.subscript()?;
            let span = target.span();
            target = Expr::Index {
                array: Box::new(target),
                index: Box::new(index),
                span,
            };
        }
        Ok(target)
    }

    /// `[expr]`
    fn subscript(&mut self) -> Result<Expr> {
        self.expect(&TokenKind::LeftBracket, "'['")?;
        let index = self.expression()?;
        self.expect(&TokenKind::RightBracket, "']' after index")?;
        Ok(index)
    }

    fn finish_call(&mut self, name: String, span: Span) -> Result<Expr> {
        self.expect(&TokenKind::LeftParen, "'(' before arguments")?;

        let mut args = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                args.push(self.expression()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(&TokenKind::RightParen, "')' after arguments")?;
        Ok(Expr::Call { name, args, span })
    }

    // ==================== Helpers ====================

    /// The current token, or `None` once input is exhausted
    fn peek(&self) -> Option<&Token> {
        self.tokens
            .get(self.current)
            .filter(|t| t.kind != TokenKind::Eof)
    }

    fn is_at_end(&self) -> bool {
        self.peek().is_none()
    }

    fn advance(&mut self) -> Option<&Token> {
        if self.is_at_end() {
            return None;
        }
        self.current += 1;
        self.tokens.get(self.current - 1)
    }

    /// Consume the current token and return its span
    fn advance_span(&mut self) -> Span {
        let span = self.current_span();
        self.advance();
        span
    }

    /// Span of the current token, or of the end of input
    fn current_span(&self) -> Span {
        self.tokens
            .get(self.current)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or_default()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(&t.kind) == std::mem::discriminant(kind))
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<Span> {
        if self.check(kind) {
            Ok(self.advance_span())
        } else {
            Err(self.error_expected(expected))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<(String, Span)> {
        match self.peek() {
            Some(Token { kind: TokenKind::Ident(name), span, .. }) => {
                let found = (name.clone(), *span);
                self.advance();
                Ok(found)
            }
            _ => Err(self.error_expected(expected)),
        }
    }

    fn error_expected(&self, expected: &str) -> CinderError {
        match self.peek() {
            Some(token) => CinderError::at(
                ErrorKind::ExpectedToken {
                    expected: expected.to_string(),
                    found: token.kind.to_string(),
                },
                token.span,
            ),
            None => CinderError::at(
                ErrorKind::UnexpectedEof(expected.to_string()),
                self.current_span(),
            ),
        }
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    let span = left.span().to(right.span());
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
        span,
    }
}

fn closes_with_end(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::If { .. } | Stmt::While { .. } | Stmt::For { .. } | Stmt::Function { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn try_parse(source: &str) -> Result<Program> {
        let tokens = Lexer::new(source).tokenize()?;
        Parser::new(tokens).parse()
    }

    fn parse(source: &str) -> Program {
        try_parse(source).unwrap()
    }

    fn parse_err(source: &str) -> ErrorKind {
        try_parse(source).unwrap_err().kind
    }

    fn int(n: i64) -> Literal {
        Literal::Int(n)
    }

    /// Strip spans so shapes can be compared
    fn shape(expr: &Expr) -> String {
        match expr {
            Expr::Literal { value: Literal::Int(n), .. } => n.to_string(),
            Expr::Literal { value, .. } => format!("{:?}", value),
            Expr::Nothing { .. } => "Nothing".to_string(),
            Expr::Variable { name, .. } => name.clone(),
            Expr::Binary { left, op, right, .. } => {
                format!("({} {} {})", shape(left), op, shape(right))
            }
            Expr::Unary { op, operand, .. } => format!("({}{})", op, shape(operand)),
            Expr::Postfix { name, op, .. } => format!("{}{}", name, op),
            Expr::Call { name, args, .. } => {
                let args: Vec<String> = args.iter().map(shape).collect();
                format!("{}({})", name, args.join(", "))
            }
            Expr::Array { elements, .. } => {
                let elements: Vec<String> = elements.iter().map(shape).collect();
                format!("[{}]", elements.join(", "))
            }
            Expr::Index { array, index, .. } => format!("{}[{}]", shape(array), shape(index)),
        }
    }

    fn initializer(source: &str) -> String {
        let program = parse(source);
        match &program.statements[0] {
            Stmt::VarDecl { initializer, .. } => shape(initializer),
            other => panic!("expected var declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_var_declaration() {
        let program = parse("var x = 42;");
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0] {
            Stmt::VarDecl { name, initializer, .. } => {
                assert_eq!(name, "x");
                assert!(matches!(initializer, Expr::Literal { value, .. } if *value == int(42)));
            }
            _ => panic!("expected var declaration"),
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(initializer("var x = 2 + 3 * 4;"), "(2 + (3 * 4))");
        assert_eq!(initializer("var x = (2 + 3) * 4;"), "((2 + 3) * 4)");
        assert_eq!(initializer("var x = 1 - 2 - 3;"), "((1 - 2) - 3)");
        assert_eq!(
            initializer("var x = a < b and b < c or d;"),
            "(((a < b) and (b < c)) or d)"
        );
        assert_eq!(initializer("var x = 1 < 2 == true;"), "((1 < 2) == Bool(true))");
        assert_eq!(initializer("var x = -a * +b;"), "((-a) * (+b))");
        assert_eq!(initializer("var x = - -a;"), "(-(-a))");
    }

    #[test]
    fn test_primaries() {
        assert_eq!(
            initializer("var x = [1, f(2, y), xs[0][1], Nothing];"),
            "[1, f(2, y), xs[0][1], Nothing]"
        );
        assert_eq!(initializer("var x = [];"), "[]");
    }

    #[test]
    fn test_declaration_requires_initializer() {
        assert!(matches!(parse_err("var x;"), ErrorKind::ExpectedToken { .. }));
    }

    #[test]
    fn test_identifier_statements() {
        let program = parse("x = 1; f(1, 2); xs[0] = 3; grid[1][2] = 4;");
        assert!(matches!(program.statements[0], Stmt::Assign { .. }));
        assert!(matches!(program.statements[1], Stmt::Expr { expr: Expr::Call { .. } }));
        match &program.statements[2] {
            Stmt::IndexAssign { array, index, .. } => {
                assert_eq!(shape(array), "xs");
                assert_eq!(shape(index), "0");
            }
            other => panic!("expected index assignment, got {:?}", other),
        }
        match &program.statements[3] {
            Stmt::IndexAssign { array, .. } => assert_eq!(shape(array), "grid[1]"),
            other => panic!("expected index assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_expression_statement_is_rejected() {
        assert_eq!(parse_err("1 + 2;"), ErrorKind::UnexpectedToken("1".to_string()));
        assert!(matches!(parse_err("x + 2;"), ErrorKind::ExpectedToken { .. }));
        assert!(matches!(parse_err("x++;"), ErrorKind::ExpectedToken { .. }));
    }

    #[test]
    fn test_semicolon_required() {
        assert!(matches!(parse_err("var x = 1 var y = 2;"), ErrorKind::ExpectedToken { .. }));
        assert!(matches!(parse_err("var x = 1"), ErrorKind::UnexpectedEof(_)));
    }

    #[test]
    fn test_block_terminator_is_optional_after_end() {
        let source = "
            if (x) : y = 1; end
            while (x) : y = 2; end;
            func f() : return 1; end
            for (var i = 0; i < 3; i++) : y = i; end
            x = 3;
        ";
        assert_eq!(parse(source).statements.len(), 5);
    }

    #[test]
    fn test_if_else_chain() {
        let program = parse("if (a) : x = 1; else if (b) : x = 2; else : x = 3; end");
        assert_eq!(program.statements.len(), 1);
        let Stmt::If { else_branch: Some(else_branch), .. } = &program.statements[0] else {
            panic!("expected if with else");
        };
        assert_eq!(else_branch.len(), 1);
        let Stmt::If { else_branch: Some(inner_else), .. } = &else_branch[0] else {
            panic!("expected chained if");
        };
        assert_eq!(inner_else.len(), 1);
    }

    #[test]
    fn test_if_errors() {
        assert!(matches!(parse_err("if (a : x = 1; end"), ErrorKind::ExpectedToken { .. }));
        assert!(matches!(parse_err("if (a) x = 1; end"), ErrorKind::ExpectedToken { .. }));
        assert_eq!(parse_err("if (a) : x = 1; else : end"), ErrorKind::EmptyBody("else"));
        assert!(matches!(parse_err("if (a) : x = 1;"), ErrorKind::UnexpectedEof(_)));
    }

    #[test]
    fn test_for_increments() {
        let increment = |source: &str| match &parse(source).statements[0] {
            Stmt::For { increment, .. } => (**increment).clone(),
            other => panic!("expected for, got {:?}", other),
        };

        let post = increment("for (var i = 0; i < 3; i++) : x = i; end");
        assert!(matches!(
            post,
            Stmt::Expr { expr: Expr::Postfix { op: PostfixOp::Increment, .. } }
        ));

        let pre = increment("for (var i = 3; i > 0; --i) : x = i; end");
        match pre {
            Stmt::Assign { name, value, .. } => {
                assert_eq!(name, "i");
                assert_eq!(shape(&value), "(i - 1)");
            }
            other => panic!("expected desugared assignment, got {:?}", other),
        }

        let assign = increment("for (var i = 0; i < 9; i = i + 3) : x = i; end");
        assert!(matches!(assign, Stmt::Assign { .. }));
    }

    #[test]
    fn test_for_rejects_other_increments() {
        assert_eq!(
            parse_err("for (var i = 0; i < 3; f(i)) : x = i; end"),
            ErrorKind::InvalidIncrement
        );
        assert_eq!(
            parse_err("for (var i = 0; i < 3; 1) : x = i; end"),
            ErrorKind::InvalidIncrement
        );
        assert_eq!(
            parse_err("for (var i = 0; i < 3; ++1) : x = i; end"),
            ErrorKind::InvalidIncrement
        );
        assert_eq!(
            parse_err("for (var i = 0; i < 3; i++) : end"),
            ErrorKind::EmptyBody("for")
        );
        assert!(matches!(
            parse_err("for (i = 0; i < 3; i++) : x = i; end"),
            ErrorKind::ExpectedToken { .. }
        ));
    }

    #[test]
    fn test_function() {
        let program = parse("func add(a, b) : return a + b; end");
        match &program.statements[0] {
            Stmt::Function { name, params, body, .. } => {
                assert_eq!(name, "add");
                assert_eq!(params, &["a", "b"]);
                assert_eq!(body.len(), 1);
            }
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        assert_eq!(
            parse_err("func f(a, b, a) : return a; end"),
            ErrorKind::DuplicateParameter("a".to_string())
        );
    }

    #[test]
    fn test_deeply_nested_input() {
        let depth = 3000;
        let parens = format!("var x = {}1{};", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&parens).statements.len(), 1);

        let negations = format!("var x = {}1;", "- ".repeat(depth));
        assert_eq!(parse(&negations).statements.len(), 1);

        let blocks = format!("{}x = 1;{}", "if (x) : ".repeat(500), " end".repeat(500));
        assert_eq!(parse(&blocks).statements.len(), 1);
    }

    #[test]
    fn test_return_without_value() {
        let program = parse("func f() : return; end");
        let Stmt::Function { body, .. } = &program.statements[0] else {
            panic!("expected function");
        };
        assert!(matches!(body[0], Stmt::Return { value: Expr::Nothing { .. }, .. }));
    }

    #[test]
    fn test_array_trailing_comma_rejected() {
        assert!(matches!(parse_err("var xs = [1, 2,];"), ErrorKind::ExpectedToken { .. }));
    }

    #[test]
    fn test_stall_is_reported_distinctly() {
        let tokens = Lexer::new("x = 1;").tokenize().unwrap();
        let parser = Parser::new(tokens);
        let err = parser.ensure_progress(0, "while").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ParserStalled("while"));
    }

    #[test]
    fn test_exhausted_stream_without_eof_token() {
        let mut tokens = Lexer::new("var x = 1;").tokenize().unwrap();
        tokens.pop();
        let program = Parser::new(tokens).parse().unwrap();
        assert_eq!(program.statements.len(), 1);

        assert!(Parser::new(Vec::new()).parse().unwrap().statements.is_empty());
    }
}
