//=============================================
// krscript/parser.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Kr recursive descent parser implementation
// Objective: Transform token streams into AST nodes consumed by the interpreter
//=============================================

//=============================================
//            Section 1: Imports
//=============================================

use crate::ast::{
    Accessibility, AssignOp, BinaryOp, BlockStatement, ClassDecl, ClassMethod, ClassProperty,
    EnumDecl, EnumMember, Expr, ForInStatement, ForOfStatement, ForStatement, FunctionDecl,
    Identifier, IfStatement, MethodKind, ObjectProperty, Program, ReturnStatement, Stmt, TypeName,
    UnaryOp, VariableDecl, VariableKind,
};
use crate::symbol::Symbol;
use crate::tokenizer::{Position, Span, Token, TokenKind};

//=============================================
//            Section 2: Parse Errors
//=============================================

/// Parser error types
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        position: Position,
    },
    UnexpectedEndOfInput {
        expected: String,
        position: Position,
    },
    DuplicateModifier {
        modifier: String,
        position: Position,
    },
    InvalidSyntax {
        message: String,
        position: Position,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnexpectedToken {
                expected,
                found,
                position,
            } => {
                write!(
                    f,
                    "Expected {} but found {:?} at line {}, column {}",
                    expected, found, position.line, position.column
                )
            }
            ParseError::UnexpectedEndOfInput { expected, position } => {
                write!(
                    f,
                    "Unexpected end of input, expected {} at line {}, column {}",
                    expected, position.line, position.column
                )
            }
            ParseError::DuplicateModifier { modifier, position } => {
                write!(
                    f,
                    "Duplicate '{}' modifier at line {}, column {}",
                    modifier, position.line, position.column
                )
            }
            ParseError::InvalidSyntax { message, position } => {
                write!(
                    f,
                    "Invalid syntax: {} at line {}, column {}",
                    message, position.line, position.column
                )
            }
        }
    }
}

impl std::error::Error for ParseError {}

//=============================================
//            Section 3: Parser State
//=============================================

/// Recursive descent parser for Kr token streams
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    expr_depth: usize,
}

const MAX_EXPRESSION_DEPTH: usize = 2048;
const MAX_CALL_ARGUMENTS: usize = 255;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            expr_depth: 0,
        }
    }

    //=============================================
    //            Section 4: Statement Parsing
    //=============================================

    /// Parse a complete Kr program. Parsing stops at the first error.
    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let start = self.current_position();
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        let span = self.span_from(start);
        Ok(Program { body, span })
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek().kind {
            TokenKind::Const | TokenKind::Let => {
                let decl = self.parse_variable_declaration()?;
                self.consume_statement_terminator()?;
                Ok(Stmt::VariableDeclaration(decl))
            }
            TokenKind::Function => self.parse_function_declaration(),
            TokenKind::Enum => self.parse_enum_declaration(),
            TokenKind::Class => self.parse_class_declaration(),
            TokenKind::If => self.parse_if_statement().map(Stmt::If),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Break => {
                let span = self.advance().span;
                self.consume_statement_terminator()?;
                Ok(Stmt::Break { span })
            }
            TokenKind::Continue => {
                let span = self.advance().span;
                self.consume_statement_terminator()?;
                Ok(Stmt::Continue { span })
            }
            TokenKind::LeftBrace => Ok(Stmt::Block(self.parse_block_statement()?)),
            _ => self.parse_expression_statement(),
        }
    }

    /// Parse `const`/`let` name [: type] = expression, without the terminator.
    fn parse_variable_declaration(&mut self) -> Result<VariableDecl, ParseError> {
        let start = self.current_position();
        let kind = match self.advance().kind {
            TokenKind::Const => VariableKind::Const,
            _ => VariableKind::Let,
        };

        let mut name = self.consume_identifier("variable name")?;
        if self.check(TokenKind::Colon) {
            self.advance();
            name.type_annotation = Some(self.parse_type_annotation()?);
        }

        self.consume(TokenKind::Assign, "'='")?;
        let init = self.parse_expression()?;

        Ok(VariableDecl {
            kind,
            name,
            init,
            span: self.span_from(start),
        })
    }

    /// Parse function name(params) [: returnType] { body }
    fn parse_function_declaration(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_position();
        self.consume(TokenKind::Function, "'function'")?;
        let name = self.consume_identifier("function name")?;
        let parameters = self.parse_parameter_list()?;

        let return_type = if self.check(TokenKind::Colon) {
            self.advance();
            Some(self.parse_type_annotation()?)
        } else {
            None
        };

        let body = self.parse_block_statement()?;

        Ok(Stmt::FunctionDeclaration(FunctionDecl {
            name,
            parameters,
            return_type,
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_parameter_list(&mut self) -> Result<Vec<Identifier>, ParseError> {
        self.consume(TokenKind::LeftParen, "'('")?;
        let mut parameters = Vec::new();

        if !self.check(TokenKind::RightParen) {
            loop {
                let mut parameter = self.consume_identifier("parameter name")?;
                if self.check(TokenKind::Colon) {
                    self.advance();
                    parameter.type_annotation = Some(self.parse_type_annotation()?);
                }
                parameters.push(parameter);

                if !self.check(TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        self.consume(TokenKind::RightParen, "')' after parameters")?;
        Ok(parameters)
    }

    /// Parse enum Name { member (= expression)?, ... }
    fn parse_enum_declaration(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_position();
        self.consume(TokenKind::Enum, "'enum'")?;
        let name = self.consume_identifier("enum name")?;
        self.consume(TokenKind::LeftBrace, "'{' after enum name")?;

        let mut members = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            let member_start = self.current_position();
            let member_name = self.consume_identifier("enum member name")?;

            let initializer = if self.check(TokenKind::Assign) {
                self.advance();
                Some(self.parse_expression()?)
            } else {
                None
            };

            members.push(EnumMember {
                name: member_name,
                initializer,
                span: self.span_from(member_start),
            });

            if self.check(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.consume(TokenKind::RightBrace, "'}' after enum members")?;

        Ok(Stmt::EnumDeclaration(EnumDecl {
            name,
            members,
            span: self.span_from(start),
        }))
    }

    /// Parse class Name [extends Super] { members }
    ///
    /// A member is a constructor when named `constructor`, a method when its
    /// name is followed by `(`, and a field when followed by `=`. Each member
    /// takes at most one accessibility modifier and one each of
    /// `static`/`readonly`.
    fn parse_class_declaration(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_position();
        self.consume(TokenKind::Class, "'class'")?;
        let name = self.consume_identifier("class name")?;

        let superclass = if self.check(TokenKind::Extends) {
            self.advance();
            Some(self.consume_identifier("superclass name")?)
        } else {
            None
        };

        self.consume(TokenKind::LeftBrace, "'{' after class name")?;

        let mut constructors = Vec::new();
        let mut fields = Vec::new();
        let mut methods = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            let member_start = self.current_position();
            let (accessibility, is_static, is_readonly, member_name) =
                self.parse_member_modifiers()?;

            if self.check(TokenKind::LeftParen) {
                if is_readonly {
                    return Err(ParseError::InvalidSyntax {
                        message: "'readonly' is only valid on fields".to_string(),
                        position: member_start,
                    });
                }
                let kind = if member_name.name.as_str() == "constructor" {
                    MethodKind::Constructor
                } else {
                    MethodKind::Method
                };
                let parameters = self.parse_parameter_list()?;
                let return_type = if self.check(TokenKind::Colon) {
                    self.advance();
                    Some(self.parse_type_annotation()?)
                } else {
                    None
                };
                let body = self.parse_block_statement()?;
                let method = ClassMethod {
                    name: member_name,
                    parameters,
                    return_type,
                    body,
                    is_static,
                    accessibility,
                    kind,
                    span: self.span_from(member_start),
                };
                match kind {
                    MethodKind::Constructor => constructors.push(method),
                    MethodKind::Method => methods.push(method),
                }
            } else if self.check(TokenKind::Assign) {
                self.advance();
                let value = self.parse_expression()?;
                self.consume_statement_terminator()?;
                fields.push(ClassProperty {
                    name: member_name,
                    value: Some(value),
                    is_static,
                    is_readonly,
                    accessibility,
                    span: self.span_from(member_start),
                });
            } else {
                return Err(ParseError::UnexpectedToken {
                    expected: "'(' or '=' after class member name".to_string(),
                    found: self.peek().kind,
                    position: self.current_position(),
                });
            }
        }

        self.consume(TokenKind::RightBrace, "'}' after class body")?;

        Ok(Stmt::ClassDeclaration(ClassDecl {
            name,
            superclass,
            constructors,
            fields,
            methods,
            span: self.span_from(start),
        }))
    }

    /// Collect member modifiers and the member name. The modifier words are
    /// ordinary identifiers; a word directly followed by `(` or `=` is the
    /// member name, not a modifier.
    fn parse_member_modifiers(
        &mut self,
    ) -> Result<(Accessibility, bool, bool, Identifier), ParseError> {
        let mut accessibility: Option<Accessibility> = None;
        let mut is_static = false;
        let mut is_readonly = false;

        loop {
            let word = self.consume_identifier("class member name")?;
            if matches!(self.peek().kind, TokenKind::LeftParen | TokenKind::Assign) {
                return Ok((
                    accessibility.unwrap_or(Accessibility::Public),
                    is_static,
                    is_readonly,
                    word,
                ));
            }

            match word.name.as_str() {
                "public" | "protected" | "private" => {
                    if accessibility.is_some() {
                        return Err(ParseError::DuplicateModifier {
                            modifier: "accessibility".to_string(),
                            position: word.span.start,
                        });
                    }
                    accessibility = Some(match word.name.as_str() {
                        "public" => Accessibility::Public,
                        "protected" => Accessibility::Protected,
                        _ => Accessibility::Private,
                    });
                }
                "static" => {
                    if is_static {
                        return Err(ParseError::DuplicateModifier {
                            modifier: "static".to_string(),
                            position: word.span.start,
                        });
                    }
                    is_static = true;
                }
                "readonly" => {
                    if is_readonly {
                        return Err(ParseError::DuplicateModifier {
                            modifier: "readonly".to_string(),
                            position: word.span.start,
                        });
                    }
                    is_readonly = true;
                }
                other => {
                    return Err(ParseError::InvalidSyntax {
                        message: format!(
                            "class member '{}' must be followed by '(' or '='",
                            other
                        ),
                        position: word.span.start,
                    });
                }
            }
        }
    }

    /// Parse if (test) { } [else if ... | else { }]
    fn parse_if_statement(&mut self) -> Result<IfStatement, ParseError> {
        let start = self.current_position();
        self.consume(TokenKind::If, "'if'")?;
        self.consume(TokenKind::LeftParen, "'(' after 'if'")?;
        let test = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "')' after condition")?;

        let consequent = self.parse_block_statement()?;

        let alternate = if self.check(TokenKind::Else) {
            self.advance();
            if self.check(TokenKind::If) {
                Some(Box::new(Stmt::If(self.parse_if_statement()?)))
            } else {
                Some(Box::new(Stmt::Block(self.parse_block_statement()?)))
            }
        } else {
            None
        };

        Ok(IfStatement {
            test,
            consequent,
            alternate,
            span: self.span_from(start),
        })
    }

    /// Parse the three `for` forms.
    ///
    /// The loop header is ambiguous until after the initializer: a variable
    /// declaration is attempted first, and failing on `in`/`of` where `=` was
    /// required rewinds the cursor and re-synthesizes the loop variable as an
    /// untyped declaration with a `null` placeholder initializer.
    fn parse_for_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_position();
        self.consume(TokenKind::For, "'for'")?;
        self.consume(TokenKind::LeftParen, "'(' after 'for'")?;

        let checkpoint = self.current;

        if matches!(self.peek().kind, TokenKind::Const | TokenKind::Let) {
            match self.parse_variable_declaration() {
                Ok(decl) => return self.parse_classic_for(start, Stmt::VariableDeclaration(decl)),
                Err(err) => {
                    let found = match &err {
                        ParseError::UnexpectedToken {
                            found: found @ (TokenKind::In | TokenKind::Of),
                            ..
                        } => *found,
                        _ => return Err(err),
                    };
                    self.current = checkpoint;
                    let kind = match self.advance().kind {
                        TokenKind::Const => VariableKind::Const,
                        _ => VariableKind::Let,
                    };
                    let name = self.consume_identifier("loop variable")?;
                    if self.check(TokenKind::Colon) {
                        // The loop variable is re-synthesized untyped.
                        self.advance();
                        self.parse_type_annotation()?;
                    }
                    if !self.check(found) {
                        // The in/of came from somewhere inside the
                        // initializer, not the loop header.
                        return Err(err);
                    }
                    return self.parse_for_in_or_of(start, kind, name, found);
                }
            }
        }

        // Bare loop variable: `for (x in ...)` / `for (x of ...)`.
        if self.check(TokenKind::Identifier)
            && matches!(self.peek_next().kind, TokenKind::In | TokenKind::Of)
        {
            let name = self.consume_identifier("loop variable")?;
            let found = self.peek().kind;
            return self.parse_for_in_or_of(start, VariableKind::Let, name, found);
        }

        // Classic form with a plain expression initializer.
        let init_expr = self.parse_expression()?;
        let init = Stmt::Expression {
            span: init_expr.span(),
            expr: init_expr,
        };
        self.parse_classic_for(start, init)
    }

    fn parse_classic_for(&mut self, start: Position, init: Stmt) -> Result<Stmt, ParseError> {
        self.consume(TokenKind::Semicolon, "';' after loop initializer")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::Semicolon, "';' after loop condition")?;
        let update = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "')' after loop header")?;
        let body = self.parse_block_statement()?;

        Ok(Stmt::For(ForStatement {
            init: Box::new(init),
            condition,
            update,
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_for_in_or_of(
        &mut self,
        start: Position,
        kind: VariableKind,
        name: Identifier,
        separator: TokenKind,
    ) -> Result<Stmt, ParseError> {
        let left = VariableDecl {
            kind,
            span: name.span,
            init: Expr::NullLiteral { span: name.span },
            name,
        };

        self.advance(); // consume `in` / `of`
        let right = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "')' after loop header")?;
        let body = self.parse_block_statement()?;
        let span = self.span_from(start);

        Ok(match separator {
            TokenKind::In => Stmt::ForIn(ForInStatement {
                left,
                right,
                body,
                span,
            }),
            _ => Stmt::ForOf(ForOfStatement {
                left,
                right,
                body,
                span,
            }),
        })
    }

    /// Parse return [expression];
    fn parse_return_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_position();
        self.consume(TokenKind::Return, "'return'")?;

        let argument = if self.check(TokenKind::Semicolon)
            || self.check(TokenKind::RightBrace)
            || self.is_at_end()
        {
            None
        } else {
            Some(self.parse_expression()?)
        };

        self.consume_statement_terminator()?;

        Ok(Stmt::Return(ReturnStatement {
            argument,
            span: self.span_from(start),
        }))
    }

    /// Parse { statements }
    fn parse_block_statement(&mut self) -> Result<BlockStatement, ParseError> {
        let start = self.current_position();
        self.consume(TokenKind::LeftBrace, "'{'")?;

        let mut body = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        self.consume(TokenKind::RightBrace, "'}'")?;
        Ok(BlockStatement {
            body,
            span: self.span_from(start),
        })
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.parse_expression()?;
        let span = expr.span();
        self.consume_statement_terminator()?;
        Ok(Stmt::Expression { expr, span })
    }

    //=============================================
    //            Section 5: Expression Parsing
    //=============================================

    fn enter_expression(&mut self) -> Result<(), ParseError> {
        if self.expr_depth >= MAX_EXPRESSION_DEPTH {
            return Err(ParseError::InvalidSyntax {
                message: format!(
                    "expression recursion limit of {} exceeded",
                    MAX_EXPRESSION_DEPTH
                ),
                position: self.current_position(),
            });
        }
        self.expr_depth += 1;
        Ok(())
    }

    fn exit_expression(&mut self) {
        if self.expr_depth > 0 {
            self.expr_depth -= 1;
        }
    }

    /// Parse an expression, lowest precedence first.
    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.enter_expression()?;
        let result = self.parse_assignment();
        self.exit_expression();
        result
    }

    /// Assignment is right-associative and does not restrict its left side;
    /// evaluation rejects targets that are not identifiers or members.
    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_logical_or()?;

        if let Some(operator) = self.match_assign_op() {
            let span = expr.span();
            let value = self.parse_assignment()?;
            let span = span.merge(value.span());
            return Ok(Expr::Assignment {
                left: Box::new(expr),
                operator,
                right: Box::new(value),
                span,
            });
        }

        Ok(expr)
    }

    fn match_assign_op(&mut self) -> Option<AssignOp> {
        let op = match self.peek().kind {
            TokenKind::Assign => Some(AssignOp::Assign),
            TokenKind::PlusAssign => Some(AssignOp::Add),
            TokenKind::MinusAssign => Some(AssignOp::Subtract),
            TokenKind::StarAssign => Some(AssignOp::Multiply),
            TokenKind::SlashAssign => Some(AssignOp::Divide),
            TokenKind::PercentAssign => Some(AssignOp::Modulo),
            TokenKind::CaretAssign => Some(AssignOp::Power),
            _ => None,
        }?;
        self.advance();
        Some(op)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_logical_and()?;

        while self.check(TokenKind::Or) {
            self.advance();
            let right = self.parse_logical_and()?;
            expr = Self::binary(expr, BinaryOp::Or, right);
        }

        Ok(expr)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_equality()?;

        while self.check(TokenKind::And) {
            self.advance();
            let right = self.parse_equality()?;
            expr = Self::binary(expr, BinaryOp::And, right);
        }

        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_comparison()?;

        while let Some(op) =
            self.match_binary_op(&[TokenKind::EqualEqual, TokenKind::NotEqual])
        {
            let right = self.parse_comparison()?;
            expr = Self::binary(expr, op, right);
        }

        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_term()?;

        while let Some(op) = self.match_binary_op(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let right = self.parse_term()?;
            expr = Self::binary(expr, op, right);
        }

        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_factor()?;

        while let Some(op) = self.match_binary_op(&[TokenKind::Plus, TokenKind::Minus]) {
            let right = self.parse_factor()?;
            expr = Self::binary(expr, op, right);
        }

        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_unary()?;

        while let Some(op) = self.match_binary_op(&[
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Percent,
            TokenKind::Caret,
        ]) {
            let right = self.parse_unary()?;
            expr = Self::binary(expr, op, right);
        }

        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if let Some(op) = self.match_unary_op(&[TokenKind::Not, TokenKind::Minus]) {
            let start = self.previous_span().start;
            let right = self.parse_unary()?;
            let span = Span::new(start, right.span().end);
            return Ok(Expr::Unary {
                operator: op,
                right: Box::new(right),
                span,
            });
        }

        // Prefix increment/decrement desugars to a compound assignment.
        if matches!(self.peek().kind, TokenKind::Increment | TokenKind::Decrement) {
            let operator = if self.peek().kind == TokenKind::Increment {
                AssignOp::Add
            } else {
                AssignOp::Subtract
            };
            let op_span = self.advance().span;
            let target = self.parse_unary()?;
            let span = op_span.merge(target.span());
            return Ok(Self::step_assignment(target, operator, span));
        }

        self.parse_call()
    }

    /// Parse call, member, and index chains after a primary expression.
    fn parse_call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek().kind {
                TokenKind::LeftParen => {
                    let args = self.parse_argument_list()?;
                    expr = self.attach_call(expr, args)?;
                }
                TokenKind::Dot => {
                    self.advance();
                    let property = self.consume_identifier("property name after '.'")?;
                    let span = expr.span().merge(property.span);
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: Box::new(Expr::Identifier(property)),
                        span,
                    };
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    let close = self.consume(TokenKind::RightBracket, "']' after index")?;
                    let span = expr.span().merge(close);
                    expr = Expr::ArrayMember {
                        object: Box::new(expr),
                        index: Box::new(index),
                        span,
                    };
                }
                TokenKind::Increment | TokenKind::Decrement => {
                    let operator = if self.peek().kind == TokenKind::Increment {
                        AssignOp::Add
                    } else {
                        AssignOp::Subtract
                    };
                    let op_span = self.advance().span;
                    let span = expr.span().merge(op_span);
                    expr = Self::step_assignment(expr, operator, span);
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_argument_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.consume(TokenKind::LeftParen, "'('")?;
        let mut args = Vec::new();

        if !self.check(TokenKind::RightParen) {
            loop {
                if args.len() >= MAX_CALL_ARGUMENTS {
                    return Err(ParseError::InvalidSyntax {
                        message: format!("more than {} call arguments", MAX_CALL_ARGUMENTS),
                        position: self.current_position(),
                    });
                }
                args.push(self.parse_expression()?);
                if !self.check(TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        self.consume(TokenKind::RightParen, "')' after arguments")?;
        Ok(args)
    }

    /// Turn `expr(...)` into a call node. Only a bare name or the final
    /// member of a `.` chain can be called.
    fn attach_call(&mut self, expr: Expr, args: Vec<Expr>) -> Result<Expr, ParseError> {
        let call_end = self.previous_span().end;
        match expr {
            Expr::Identifier(callee) => {
                let span = Span::new(callee.span.start, call_end);
                Ok(Expr::Call { callee, args, span })
            }
            Expr::Member {
                object,
                property,
                span,
            } => match *property {
                Expr::Identifier(callee) => {
                    let call_span = Span::new(callee.span.start, call_end);
                    Ok(Expr::Member {
                        object,
                        property: Box::new(Expr::Call {
                            callee,
                            args,
                            span: call_span,
                        }),
                        span: Span::new(span.start, call_end),
                    })
                }
                other => Err(ParseError::InvalidSyntax {
                    message: "only a named member can be called".to_string(),
                    position: other.span().start,
                }),
            },
            other => Err(ParseError::InvalidSyntax {
                message: "call target must be a name or a member access".to_string(),
                position: other.span().start,
            }),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().clone();
        let span = token.span;

        match token.kind {
            TokenKind::Integer | TokenKind::Float => {
                self.advance();
                let value = token.lexeme.parse::<f64>().map_err(|_| {
                    ParseError::InvalidSyntax {
                        message: format!("unreadable number literal '{}'", token.lexeme),
                        position: span.start,
                    }
                })?;
                Ok(Expr::NumericLiteral { value, span })
            }
            TokenKind::Str => {
                self.advance();
                Ok(Expr::StringLiteral {
                    value: token.lexeme,
                    span,
                })
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                Ok(Expr::BooleanLiteral {
                    value: token.kind == TokenKind::True,
                    span,
                })
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::NullLiteral { span })
            }
            TokenKind::This => {
                self.advance();
                Ok(Expr::This { span })
            }
            TokenKind::Super => {
                self.advance();
                Ok(Expr::Super { span })
            }
            TokenKind::New => {
                self.advance();
                let class_name = self.consume_identifier("class name after 'new'")?;
                let args = self.parse_argument_list()?;
                let full_span = Span::new(span.start, self.previous_span().end);
                Ok(Expr::New {
                    class_name,
                    args,
                    span: full_span,
                })
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expr::Identifier(Identifier::new(
                    Symbol::from(token.lexeme),
                    span,
                )))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                let close = self.consume(TokenKind::RightParen, "')' after expression")?;
                Ok(Expr::Paren {
                    expr: Box::new(inner),
                    span: Span::new(span.start, close.end),
                })
            }
            TokenKind::LeftBracket => self.parse_array_or_range(),
            TokenKind::LeftBrace => self.parse_object_literal(),
            TokenKind::Eof => Err(ParseError::UnexpectedEndOfInput {
                expected: "expression".to_string(),
                position: span.start,
            }),
            _ => Err(ParseError::UnexpectedToken {
                expected: "expression".to_string(),
                found: token.kind,
                position: span.start,
            }),
        }
    }

    /// Parse `[a, b, c]` or `[start..end]` / `[start..step..end]`.
    ///
    /// Elements are collected first; the separator that follows the first
    /// element decides between an array literal and a range literal. Mixing
    /// the two separators is an error, as is a range arity other than 2 or 3.
    fn parse_array_or_range(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_position();
        self.consume(TokenKind::LeftBracket, "'['")?;

        let mut elements = Vec::new();
        let mut ranged = false;

        if !self.check(TokenKind::RightBracket) {
            loop {
                elements.push(self.parse_expression()?);
                if self.check(TokenKind::Comma) {
                    if ranged {
                        return Err(ParseError::InvalidSyntax {
                            message: "cannot mix ',' and '..' between brackets".to_string(),
                            position: self.current_position(),
                        });
                    }
                    self.advance();
                    continue;
                }
                if self.check(TokenKind::DotDot) {
                    if !ranged && elements.len() > 1 {
                        return Err(ParseError::InvalidSyntax {
                            message: "cannot mix ',' and '..' between brackets".to_string(),
                            position: self.current_position(),
                        });
                    }
                    ranged = true;
                    self.advance();
                    continue;
                }
                break;
            }
        }

        let close = self.consume(TokenKind::RightBracket, "']' after elements")?;
        let span = Span::new(start, close.end);

        if !ranged {
            return Ok(Expr::Array { elements, span });
        }

        let mut parts = elements.into_iter();
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(range_start), Some(end), None, None) => {
                let step = Expr::NumericLiteral { value: 1.0, span };
                Ok(Expr::Range {
                    start: Box::new(range_start),
                    step: Box::new(step),
                    end: Box::new(end),
                    span,
                })
            }
            (Some(range_start), Some(step), Some(end), None) => Ok(Expr::Range {
                start: Box::new(range_start),
                step: Box::new(step),
                end: Box::new(end),
                span,
            }),
            _ => Err(ParseError::InvalidSyntax {
                message: "a range takes 2 elements (start..end) or 3 (start..step..end)"
                    .to_string(),
                position: span.start,
            }),
        }
    }

    /// Parse `{ key: value, shorthand, ... }`.
    fn parse_object_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_position();
        self.consume(TokenKind::LeftBrace, "'{'")?;

        let mut properties = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            let key = self.consume_identifier("property name")?;

            let (value, shorthand) = if self.check(TokenKind::Colon) {
                self.advance();
                (self.parse_expression()?, false)
            } else {
                (Expr::Identifier(key.clone()), true)
            };

            let span = key.span.merge(value.span());
            properties.push(ObjectProperty {
                key,
                value,
                shorthand,
                span,
            });

            if self.check(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        let close = self.consume(TokenKind::RightBrace, "'}' after object literal")?;
        Ok(Expr::Object {
            properties,
            span: Span::new(start, close.end),
        })
    }

    //=============================================
    //            Section 6: Token Navigation
    //=============================================

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.current)
            .unwrap_or_else(|| self.tokens.last().expect("token stream ends with Eof"))
    }

    fn peek_next(&self) -> &Token {
        self.tokens
            .get(self.current + 1)
            .unwrap_or_else(|| self.tokens.last().expect("token stream ends with Eof"))
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn consume(&mut self, kind: TokenKind, expected: &str) -> Result<Span, ParseError> {
        if self.check(kind) {
            Ok(self.advance().span)
        } else if self.is_at_end() {
            Err(ParseError::UnexpectedEndOfInput {
                expected: expected.to_string(),
                position: self.current_position(),
            })
        } else {
            Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: self.peek().kind,
                position: self.current_position(),
            })
        }
    }

    fn consume_identifier(&mut self, expected: &str) -> Result<Identifier, ParseError> {
        if self.check(TokenKind::Identifier) {
            let token = self.advance();
            Ok(Identifier::new(Symbol::from(token.lexeme), token.span))
        } else if self.is_at_end() {
            Err(ParseError::UnexpectedEndOfInput {
                expected: expected.to_string(),
                position: self.current_position(),
            })
        } else {
            Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: self.peek().kind,
                position: self.current_position(),
            })
        }
    }

    /// Semicolons terminate statements but a closing brace or the end of the
    /// stream also counts, so trailing semicolons stay optional.
    fn consume_statement_terminator(&mut self) -> Result<(), ParseError> {
        if self.check(TokenKind::Semicolon) {
            self.advance();
            return Ok(());
        }
        if self.is_at_end() || self.check(TokenKind::RightBrace) {
            return Ok(());
        }
        Err(ParseError::UnexpectedToken {
            expected: "';'".to_string(),
            found: self.peek().kind,
            position: self.current_position(),
        })
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn current_position(&self) -> Position {
        self.peek().span.start
    }

    fn previous_span(&self) -> Span {
        if self.current == 0 {
            self.peek().span
        } else {
            self.tokens[self.current - 1].span
        }
    }

    fn span_from(&self, start: Position) -> Span {
        Span::new(start, self.previous_span().end)
    }

    fn parse_type_annotation(&mut self) -> Result<TypeName, ParseError> {
        let token = self.peek().clone();
        let annotation = match token.kind {
            TokenKind::BooleanType => TypeName::Boolean,
            TokenKind::IntegerType => TypeName::Integer,
            TokenKind::FloatType => TypeName::Float,
            TokenKind::StringType => TypeName::Str,
            TokenKind::VoidType => TypeName::Void,
            TokenKind::Identifier => TypeName::Named(Symbol::from(token.lexeme.clone())),
            _ => {
                return Err(ParseError::UnexpectedToken {
                    expected: "type annotation".to_string(),
                    found: token.kind,
                    position: token.span.start,
                });
            }
        };
        self.advance();
        Ok(annotation)
    }

    fn match_binary_op(&mut self, kinds: &[TokenKind]) -> Option<BinaryOp> {
        for kind in kinds {
            if self.check(*kind) {
                self.advance();
                return Some(match kind {
                    TokenKind::Plus => BinaryOp::Add,
                    TokenKind::Minus => BinaryOp::Subtract,
                    TokenKind::Star => BinaryOp::Multiply,
                    TokenKind::Slash => BinaryOp::Divide,
                    TokenKind::Percent => BinaryOp::Modulo,
                    TokenKind::Caret => BinaryOp::Power,
                    TokenKind::EqualEqual => BinaryOp::Equal,
                    TokenKind::NotEqual => BinaryOp::NotEqual,
                    TokenKind::Greater => BinaryOp::Greater,
                    TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                    TokenKind::Less => BinaryOp::Less,
                    TokenKind::LessEqual => BinaryOp::LessEqual,
                    TokenKind::And => BinaryOp::And,
                    TokenKind::Or => BinaryOp::Or,
                    _ => continue,
                });
            }
        }
        None
    }

    fn match_unary_op(&mut self, kinds: &[TokenKind]) -> Option<UnaryOp> {
        for kind in kinds {
            if self.check(*kind) {
                self.advance();
                return Some(match kind {
                    TokenKind::Not => UnaryOp::Not,
                    TokenKind::Minus => UnaryOp::Negate,
                    _ => continue,
                });
            }
        }
        None
    }

    fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
        let span = left.span().merge(right.span());
        Expr::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            span,
        }
    }

    /// `x++` / `x--` (either fixity) becomes `x += 1` / `x -= 1`.
    fn step_assignment(target: Expr, operator: AssignOp, span: Span) -> Expr {
        Expr::Assignment {
            left: Box::new(target),
            operator,
            right: Box::new(Expr::NumericLiteral { value: 1.0, span }),
            span,
        }
    }
}

//=============================================
// End Of krscript/parser.rs
//=============================================
// Notes:
// -[@TODOS] Give `struct` and `import` real grammar once the module story lands.
