//! Recursive-descent parser for strategy scripts.
//!
//! Nesting is capped at `max_depth` so that neither parsing nor evaluation
//! can recurse without bound, and `break`/`continue` are rejected outside
//! loops at parse time.

use crate::ast::{AssignOp, BinaryOp, Expr, Literal, LogicalOp, Program, Stmt, UnaryOp};
use crate::error::ScriptError;
use crate::lexer::{syntax, tokenize, Position, Token, TokenKind};

/// Parse a complete script.
pub fn parse(source: &str, max_depth: usize) -> Result<Program, ScriptError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
        max_depth,
        loops: 0,
    };
    let mut body = Vec::new();
    while !parser.at(&TokenKind::Eof) {
        body.push(parser.statement()?);
    }
    Ok(Program { body })
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
    max_depth: usize,
    /// Enclosing loop count, for break/continue validation
    loops: usize,
}

impl Parser {
    // ── Token helpers ────────────────────────────────────────────────

    fn peek(&self) -> &TokenKind {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        // tokenize always ends with Eof, so clamp there
        let idx = (self.cursor + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn pos(&self) -> Position {
        self.tokens[self.cursor.min(self.tokens.len() - 1)].pos
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.cursor < self.tokens.len() - 1 {
            self.cursor += 1;
        }
        kind
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), ScriptError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ScriptError> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn unexpected(&self, expected: &str) -> ScriptError {
        let found = match self.peek() {
            TokenKind::Eof => "end of script".to_string(),
            other => format!("{:?}", other),
        };
        syntax(self.pos(), format!("expected {}, found {}", expected, found))
    }

    // ── Depth accounting ─────────────────────────────────────────────

    fn enter(&mut self) -> Result<(), ScriptError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ScriptError::TooDeep { limit: self.max_depth });
        }
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ScriptError>,
    ) -> Result<T, ScriptError> {
        self.enter()?;
        let result = f(self);
        self.leave(1);
        result
    }

    // ── Statements ───────────────────────────────────────────────────

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        self.nested(|p| p.statement_inner())
    }

    fn statement_inner(&mut self) -> Result<Stmt, ScriptError> {
        match self.peek() {
            TokenKind::LBrace => self.block(),
            TokenKind::Semi => {
                self.advance();
                Ok(Stmt::Empty)
            }
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::Break | TokenKind::Continue => {
                let pos = self.pos();
                let stmt = if self.advance() == TokenKind::Break {
                    Stmt::Break
                } else {
                    Stmt::Continue
                };
                if self.loops == 0 {
                    return Err(syntax(pos, "break/continue outside of a loop"));
                }
                self.end_statement();
                Ok(stmt)
            }
            TokenKind::Return => {
                self.advance();
                let value = match self.peek() {
                    TokenKind::Semi | TokenKind::RBrace | TokenKind::Eof => None,
                    _ => Some(self.expression()?),
                };
                self.end_statement();
                Ok(Stmt::Return(value))
            }
            TokenKind::Throw => {
                self.advance();
                let value = self.expression()?;
                self.end_statement();
                Ok(Stmt::Throw(value))
            }
            _ => {
                let stmt = self.simple_statement()?;
                self.end_statement();
                Ok(stmt)
            }
        }
    }

    /// Semicolons are optional
    fn end_statement(&mut self) {
        self.eat(&TokenKind::Semi);
    }

    /// Declarations, assignments and bare expressions: the forms allowed in
    /// a `for` header as well as on their own.
    fn simple_statement(&mut self) -> Result<Stmt, ScriptError> {
        match self.peek() {
            TokenKind::Let | TokenKind::Const => {
                let constant = self.advance() == TokenKind::Const;
                let name = self.expect_ident("variable name")?;
                let init = if self.eat(&TokenKind::Assign) {
                    Some(self.expression()?)
                } else {
                    None
                };
                if constant && init.is_none() {
                    return Err(syntax(self.pos(), format!("const '{}' needs an initializer", name)));
                }
                Ok(Stmt::Let { name, init, constant })
            }
            TokenKind::Ident(name) => {
                let name = name.clone();
                let op = match self.peek_at(1) {
                    TokenKind::Assign => Some(AssignOp::Set),
                    TokenKind::PlusAssign => Some(AssignOp::Add),
                    TokenKind::MinusAssign => Some(AssignOp::Sub),
                    TokenKind::PlusPlus | TokenKind::MinusMinus => {
                        let op = if self.peek_at(1) == &TokenKind::PlusPlus {
                            AssignOp::Add
                        } else {
                            AssignOp::Sub
                        };
                        self.advance();
                        self.advance();
                        return Ok(Stmt::Assign {
                            name,
                            op,
                            value: Expr::Literal(Literal::Number(1.0)),
                        });
                    }
                    _ => None,
                };
                match op {
                    Some(op) => {
                        self.advance();
                        self.advance();
                        let value = self.expression()?;
                        Ok(Stmt::Assign { name, op, value })
                    }
                    None => Ok(Stmt::Expr(self.expression()?)),
                }
            }
            _ => Ok(Stmt::Expr(self.expression()?)),
        }
    }

    fn block(&mut self) -> Result<Stmt, ScriptError> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut body = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            if self.at(&TokenKind::Eof) {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.statement()?);
        }
        self.advance();
        Ok(Stmt::Block(body))
    }

    fn if_statement(&mut self) -> Result<Stmt, ScriptError> {
        self.advance();
        self.expect(&TokenKind::LParen, "'(' after if")?;
        let test = self.expression()?;
        self.expect(&TokenKind::RParen, "')'")?;
        let consequent = Box::new(self.statement()?);
        let alternate = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If { test, consequent, alternate })
    }

    fn while_statement(&mut self) -> Result<Stmt, ScriptError> {
        self.advance();
        self.expect(&TokenKind::LParen, "'(' after while")?;
        let test = self.expression()?;
        self.expect(&TokenKind::RParen, "')'")?;
        let body = Box::new(self.loop_body()?);
        Ok(Stmt::While { test, body })
    }

    fn for_statement(&mut self) -> Result<Stmt, ScriptError> {
        self.advance();
        self.expect(&TokenKind::LParen, "'(' after for")?;
        let init = if self.at(&TokenKind::Semi) {
            None
        } else {
            Some(Box::new(self.simple_statement()?))
        };
        self.expect(&TokenKind::Semi, "';' in for header")?;
        let test = if self.at(&TokenKind::Semi) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&TokenKind::Semi, "';' in for header")?;
        let update = if self.at(&TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.simple_statement()?))
        };
        self.expect(&TokenKind::RParen, "')'")?;
        let body = Box::new(self.loop_body()?);
        Ok(Stmt::For { init, test, update, body })
    }

    fn loop_body(&mut self) -> Result<Stmt, ScriptError> {
        self.loops += 1;
        let body = self.statement();
        self.loops -= 1;
        body
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.nested(|p| p.conditional())
    }

    fn conditional(&mut self) -> Result<Expr, ScriptError> {
        let test = self.logical_or()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.expression()?;
        self.expect(&TokenKind::Colon, "':' in conditional")?;
        let alternate = self.expression()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn logical_or(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.logical_and()?;
        let mut levels = 0;
        while self.eat(&TokenKind::OrOr) {
            self.enter()?;
            levels += 1;
            let rhs = self.logical_and()?;
            lhs = Expr::Logical { op: LogicalOp::Or, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        self.leave(levels);
        Ok(lhs)
    }

    fn logical_and(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.equality()?;
        let mut levels = 0;
        while self.eat(&TokenKind::AndAnd) {
            self.enter()?;
            levels += 1;
            let rhs = self.equality()?;
            lhs = Expr::Logical { op: LogicalOp::And, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        self.leave(levels);
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr, ScriptError> {
        self.binary_chain(Self::relational, |kind| match kind {
            TokenKind::Eq => Some(BinaryOp::Eq),
            TokenKind::NotEq => Some(BinaryOp::NotEq),
            TokenKind::StrictEq => Some(BinaryOp::StrictEq),
            TokenKind::StrictNotEq => Some(BinaryOp::StrictNotEq),
            _ => None,
        })
    }

    fn relational(&mut self) -> Result<Expr, ScriptError> {
        self.binary_chain(Self::additive, |kind| match kind {
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Le => Some(BinaryOp::Le),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn additive(&mut self) -> Result<Expr, ScriptError> {
        self.binary_chain(Self::multiplicative, |kind| match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn multiplicative(&mut self) -> Result<Expr, ScriptError> {
        self.binary_chain(Self::unary, |kind| match kind {
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            TokenKind::Percent => Some(BinaryOp::Rem),
            _ => None,
        })
    }

    /// Left-associative chain of one precedence level. Every link deepens
    /// the tree, so it is charged against the depth limit.
    fn binary_chain(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, ScriptError>,
        operator: fn(&TokenKind) -> Option<BinaryOp>,
    ) -> Result<Expr, ScriptError> {
        let mut lhs = operand(self)?;
        let mut levels = 0;
        while let Some(op) = operator(self.peek()) {
            self.advance();
            self.enter()?;
            levels += 1;
            let rhs = operand(self)?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        self.leave(levels);
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        let op = match self.peek() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.nested(|p| p.unary())?;
        Ok(Expr::Unary { op, operand: Box::new(operand) })
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.primary()?;
        let mut levels = 0;
        loop {
            let next = match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.expect_ident("property name after '.'")?;
                    Expr::Member { object: Box::new(expr), property }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(&TokenKind::RBracket, "']'")?;
                    Expr::Index { object: Box::new(expr), index: Box::new(index) }
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.arguments()?;
                    Expr::Call { callee: Box::new(expr), args }
                }
                _ => break,
            };
            self.enter()?;
            levels += 1;
            expr = next;
        }
        self.leave(levels);
        Ok(expr)
    }

    /// Call arguments after '('; arrow functions are only legal here.
    fn arguments(&mut self) -> Result<Vec<Expr>, ScriptError> {
        let mut args = Vec::new();
        while !self.eat(&TokenKind::RParen) {
            let arg = match self.lambda_param() {
                Some(param) => {
                    let body = self.expression()?;
                    Expr::Lambda { param, body: Box::new(body) }
                }
                None => self.expression()?,
            };
            args.push(arg);
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RParen, "',' or ')' in argument list")?;
                break;
            }
        }
        Ok(args)
    }

    /// Consume `x =>` or `(x) =>` and return the parameter name
    fn lambda_param(&mut self) -> Option<String> {
        match (self.peek(), self.peek_at(1), self.peek_at(2), self.peek_at(3)) {
            (TokenKind::Ident(name), TokenKind::Arrow, _, _) => {
                let name = name.clone();
                self.advance();
                self.advance();
                Some(name)
            }
            (TokenKind::LParen, TokenKind::Ident(name), TokenKind::RParen, TokenKind::Arrow) => {
                let name = name.clone();
                for _ in 0..4 {
                    self.advance();
                }
                Some(name)
            }
            _ => None,
        }
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        let pos = self.pos();
        let expr = match self.advance() {
            TokenKind::Number(n) => Expr::Literal(Literal::Number(n)),
            TokenKind::Str(s) => Expr::Literal(Literal::Str(s)),
            TokenKind::True => Expr::Literal(Literal::Bool(true)),
            TokenKind::False => Expr::Literal(Literal::Bool(false)),
            TokenKind::Null => Expr::Literal(Literal::Null),
            TokenKind::Undefined => Expr::Literal(Literal::Undefined),
            TokenKind::Ident(name) => {
                if self.at(&TokenKind::Arrow) {
                    return Err(syntax(pos, "arrow functions are only allowed as call arguments"));
                }
                Expr::Ident(name)
            }
            TokenKind::LParen => {
                let inner = self.expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                inner
            }
            TokenKind::LBracket => {
                let mut items = Vec::new();
                while !self.eat(&TokenKind::RBracket) {
                    items.push(self.expression()?);
                    if !self.eat(&TokenKind::Comma) {
                        self.expect(&TokenKind::RBracket, "',' or ']' in array literal")?;
                        break;
                    }
                }
                Expr::Array(items)
            }
            TokenKind::Eof => return Err(syntax(pos, "unexpected end of script")),
            other => return Err(syntax(pos, format!("unexpected token {:?}", other))),
        };
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Program {
        parse(source, 64).unwrap_or_else(|e| panic!("{:?} failed to parse: {}", source, e))
    }

    #[test]
    fn test_return_literal() {
        let program = parse_ok("return 'C';");
        assert_eq!(
            program.body,
            vec![Stmt::Return(Some(Expr::Literal(Literal::Str("C".into()))))]
        );
    }

    #[test]
    fn test_empty_script() {
        assert!(parse_ok("").body.is_empty());
        assert!(parse_ok("// nothing here").body.is_empty());
    }

    #[test]
    fn test_precedence() {
        let program = parse_ok("return 1 + 2 * 3;");
        let Stmt::Return(Some(Expr::Binary { op: BinaryOp::Add, rhs, .. })) = &program.body[0]
        else {
            panic!("expected addition at the root: {:?}", program.body);
        };
        assert!(matches!(**rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_member_index_call_chain() {
        let program = parse_ok("return context.opponentHistory.slice(-10).length;");
        let Stmt::Return(Some(Expr::Member { object, property })) = &program.body[0] else {
            panic!("expected member access");
        };
        assert_eq!(property, "length");
        assert!(matches!(**object, Expr::Call { .. }));
    }

    #[test]
    fn test_lambda_argument() {
        let program = parse_ok("const n = xs.filter(m => m === 'C').length;");
        let Stmt::Let { init: Some(Expr::Member { object, .. }), .. } = &program.body[0] else {
            panic!("expected let with member init");
        };
        let Expr::Call { args, .. } = &**object else {
            panic!("expected call");
        };
        assert!(matches!(&args[0], Expr::Lambda { param, .. } if param == "m"));

        parse_ok("xs.some((m) => m === 'D');");
    }

    #[test]
    fn test_lambda_outside_call_rejected() {
        assert!(matches!(parse("const f = x => x;", 64), Err(ScriptError::Syntax { .. })));
    }

    #[test]
    fn test_assignment_forms() {
        let program = parse_ok("let i = 0; i = 2; i += 3; i -= 1; i++; i--;");
        let ops: Vec<_> = program
            .body
            .iter()
            .filter_map(|s| match s {
                Stmt::Assign { op, .. } => Some(*op),
                _ => None,
            })
            .collect();
        assert_eq!(
            ops,
            vec![AssignOp::Set, AssignOp::Add, AssignOp::Sub, AssignOp::Add, AssignOp::Sub]
        );
    }

    #[test]
    fn test_control_flow() {
        parse_ok(
            "let n = 0;
             for (let i = 0; i < 10; i++) { if (i % 2 === 0) continue; n += i; }
             while (true) { break; }
             if (n > 3) return 'D'; else return 'C';",
        );
    }

    #[test]
    fn test_break_outside_loop() {
        assert!(matches!(parse("break;", 64), Err(ScriptError::Syntax { .. })));
        assert!(matches!(parse("if (true) { continue; }", 64), Err(ScriptError::Syntax { .. })));
    }

    #[test]
    fn test_optional_semicolons() {
        parse_ok("const a = 1\nconst b = 2\nreturn a + b > 2 ? 'D' : 'C'");
    }

    #[test]
    fn test_const_requires_initializer() {
        assert!(matches!(parse("const a;", 64), Err(ScriptError::Syntax { .. })));
    }

    #[test]
    fn test_missing_paren() {
        let err = parse("if (true return 'C';", 64).unwrap_err();
        assert!(matches!(err, ScriptError::Syntax { line: 1, column: 10, .. }), "{:?}", err);
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let source = format!("return {}1{};", "(".repeat(500), ")".repeat(500));
        assert_eq!(parse(&source, 64), Err(ScriptError::TooDeep { limit: 64 }));
    }

    #[test]
    fn test_long_flat_chain_rejected() {
        let source = format!("return 1{};", " + 1".repeat(200));
        assert_eq!(parse(&source, 64), Err(ScriptError::TooDeep { limit: 64 }));
    }

    #[test]
    fn test_deep_unary_rejected() {
        let source = format!("return {}true;", "!".repeat(200));
        assert_eq!(parse(&source, 64), Err(ScriptError::TooDeep { limit: 64 }));
    }

    #[test]
    fn test_trailing_commas() {
        parse_ok("const xs = [1, 2, 3,]; return Math.max(1, 2,) > 1 ? 'D' : 'C';");
    }
}
