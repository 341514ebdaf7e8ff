use std::fs;
use std::path::{Path, PathBuf};

use crate::ast::{
    Assign, AssignTarget, Binary, BinaryOperator, Block, Expression, Field, FieldKey,
    ForStatement, Function, FunctionCall, IfStatement, Import, IterableExpression, Literal,
    Statement,
};
use crate::error::SyntaxError;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// Identifiers the parser reclassifies as keywords. The lexer itself emits
/// them as plain `Name` tokens.
pub const KEYWORDS: &[&str] = &[
    "if", "else", "for", "break", "continue", "in", "not", "return",
];

/// Recursive-descent parser. Builds a whole-program `Block` via `parse`;
/// `read_statement` and `read_expression` are public for incremental and
/// tooling use. Tokens consumed so far are retained in a flat list for
/// hover/completion lookups.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    tokens: Vec<Token>,
    file: String,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::with_file(source, "")
    }

    pub fn with_file(source: &'a str, file: impl Into<String>) -> Self {
        let file = file.into();
        let mut lexer = Lexer::new(source, file.clone());
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            tokens: Vec::new(),
            file,
        }
    }

    /// All tokens consumed so far, in source order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn parse(&mut self) -> Result<Block, SyntaxError> {
        let position = self.current.position.clone();
        let mut block = Block {
            statements: Vec::new(),
            position,
        };
        while self.current.kind != TokenKind::Eof {
            match self.read_statement()? {
                Some(statement) => block.statements.push(statement),
                None => break,
            }
        }
        Ok(block)
    }

    pub fn read_statement(&mut self) -> Result<Option<Statement>, SyntaxError> {
        match self.current.kind {
            TokenKind::Eof => Ok(None),
            TokenKind::NewLine => {
                let token = self.advance();
                Ok(Some(Statement::NewLine {
                    position: token.position,
                }))
            }
            TokenKind::Comment => {
                let token = self.advance();
                Ok(Some(Statement::Comment {
                    text: token.text,
                    position: token.position,
                }))
            }
            // Quoted keys appear as assignments inside dict blocks: 'a-b' = 1
            TokenKind::Str => {
                let token = self.advance();
                self.expect(TokenKind::Eq, "=")?;
                let value = self.read_expression()?;
                Ok(Some(Statement::Assign(Assign {
                    target: AssignTarget::Variable {
                        name: token.text,
                        position: token.position.clone(),
                    },
                    value,
                    position: token.position,
                })))
            }
            TokenKind::Name => self.read_name_statement().map(Some),
            _ => Err(self.error(format!(
                "unexpected token [{}] at statement start",
                self.current
            ))),
        }
    }

    fn read_name_statement(&mut self) -> Result<Statement, SyntaxError> {
        let name = self.advance();
        match name.text.as_str() {
            "return" => {
                let value = if matches!(
                    self.current.kind,
                    TokenKind::NewLine | TokenKind::Eof | TokenKind::RBrace
                ) {
                    None
                } else {
                    Some(self.read_expression()?)
                };
                Ok(Statement::Return {
                    value,
                    position: name.position,
                })
            }
            "if" => self.read_if(name).map(Statement::If),
            "for" => self.read_for(name).map(Statement::For),
            "break" => Ok(Statement::Break {
                position: name.position,
            }),
            "continue" => Ok(Statement::Continue {
                position: name.position,
            }),
            _ if KEYWORDS.contains(&name.text.as_str()) => Err(SyntaxError::new(
                format!("keyword [{}] can not start a statement", name.text),
                name.position,
            )),
            _ => match self.current.kind {
                TokenKind::Eq => {
                    self.advance();
                    let value = self.read_expression()?;
                    Ok(Statement::Assign(Assign {
                        target: AssignTarget::Variable {
                            name: name.text,
                            position: name.position.clone(),
                        },
                        value,
                        position: name.position,
                    }))
                }
                TokenKind::LParen => {
                    self.advance();
                    self.read_function(name)
                }
                TokenKind::Dot => {
                    self.advance();
                    let field = Field {
                        target: name.text,
                        key: self.read_field_key()?,
                        position: name.position.clone(),
                    };
                    self.finish_field_statement(field)
                }
                TokenKind::LBracket => {
                    self.advance();
                    self.read_bracket_statement(name)
                }
                _ => Err(self.error(format!(
                    "unexpected token [{}] after [{}]",
                    self.current, name.text
                ))),
            },
        }
    }

    fn finish_field_statement(&mut self, field: Field) -> Result<Statement, SyntaxError> {
        let position = field.position.clone();
        if self.current.kind == TokenKind::Eq {
            self.advance();
            let value = self.read_expression()?;
            Ok(Statement::Assign(Assign {
                target: AssignTarget::Field(field),
                value,
                position,
            }))
        } else {
            let expression = self.continue_binary(Expression::Field(field))?;
            Ok(Statement::Expression(expression))
        }
    }

    fn read_bracket_statement(&mut self, name: Token) -> Result<Statement, SyntaxError> {
        match self.current.kind {
            TokenKind::Str => {
                let key = self.advance();
                self.expect(TokenKind::RBracket, "]")?;
                let field = Field {
                    target: name.text,
                    key: FieldKey::Quoted {
                        value: key.text,
                        position: key.position,
                    },
                    position: name.position,
                };
                self.finish_field_statement(field)
            }
            TokenKind::Name => {
                let key = self.advance();
                self.expect(TokenKind::RBracket, "]")?;
                let field = Field {
                    target: name.text,
                    key: FieldKey::Dynamic {
                        name: key.text,
                        position: key.position,
                    },
                    position: name.position,
                };
                self.finish_field_statement(field)
            }
            TokenKind::Int => {
                let token = self.advance();
                let index = self.parse_int(&token)?;
                self.expect(TokenKind::RBracket, "]")?;
                if self.current.kind == TokenKind::Eq {
                    self.advance();
                    let value = self.read_expression()?;
                    Ok(Statement::Assign(Assign {
                        target: AssignTarget::ListIndex {
                            name: name.text,
                            index,
                            position: name.position.clone(),
                        },
                        value,
                        position: name.position,
                    }))
                } else {
                    let expression = self.continue_binary(Expression::ListAccess {
                        name: name.text,
                        index,
                        position: name.position,
                    })?;
                    Ok(Statement::Expression(expression))
                }
            }
            _ => Err(self.error(format!(
                "expected field key or list index, found [{}]",
                self.current
            ))),
        }
    }

    fn read_if(&mut self, keyword: Token) -> Result<IfStatement, SyntaxError> {
        let condition = self.read_expression()?;
        self.expect(TokenKind::LBrace, "{")?;
        let body = self.read_block_until_rbrace()?;
        let mut item = IfStatement {
            condition,
            body,
            else_if: None,
            else_body: None,
            position: keyword.position,
        };
        if self.current.kind == TokenKind::Name && self.current.text == "else" {
            self.advance();
            if self.current.kind == TokenKind::Name && self.current.text == "if" {
                let nested = self.advance();
                item.else_if = Some(Box::new(self.read_if(nested)?));
            } else {
                self.expect(TokenKind::LBrace, "{")?;
                item.else_body = Some(self.read_block_until_rbrace()?);
            }
        }
        Ok(item)
    }

    fn read_for(&mut self, keyword: Token) -> Result<ForStatement, SyntaxError> {
        let (index_name, item_name, iterable) = if self.current.kind == TokenKind::Name {
            let index = self.advance();
            self.expect(TokenKind::Comma, ",")?;
            let item = self.expect(TokenKind::Name, "item name")?;
            if !(self.current.kind == TokenKind::Name && self.current.text == "in") {
                return Err(self.error("for must have an [in] part"));
            }
            self.advance();
            let iterable = self.expect(TokenKind::Name, "iterable name")?;
            (
                index.text,
                item.text,
                IterableExpression {
                    name: iterable.text,
                    position: iterable.position,
                },
            )
        } else {
            // Shorthand `for { ... }` iterates `items` as `index, item`.
            (
                "index".to_string(),
                "item".to_string(),
                IterableExpression {
                    name: "items".to_string(),
                    position: self.current.position.clone(),
                },
            )
        };
        self.expect(TokenKind::LBrace, "{")?;
        let body = self.read_block_until_rbrace()?;
        Ok(ForStatement {
            index_name,
            item_name,
            iterable,
            body,
            position: keyword.position,
        })
    }

    /// After `NAME (` — reads the argument list, then decides between a
    /// function definition (a `{` body follows), an import, and a plain call.
    fn read_function(&mut self, name: Token) -> Result<Statement, SyntaxError> {
        let mut arguments = Vec::new();
        loop {
            match self.current.kind {
                TokenKind::Comma | TokenKind::NewLine => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => {
                    return Err(self.error("unexpected end of file in argument list"));
                }
                _ => arguments.push(self.read_expression()?),
            }
        }
        if self.current.kind == TokenKind::LBrace {
            self.advance();
            let mut parameters = Vec::with_capacity(arguments.len());
            for argument in arguments {
                match argument {
                    Expression::Variable { name, .. } => parameters.push(name),
                    other => {
                        return Err(SyntaxError::new(
                            format!("function parameters must be names, found [{other}]"),
                            other.position().clone(),
                        ));
                    }
                }
            }
            let body = self.read_block_until_rbrace()?;
            return Ok(Statement::FunctionDef(Function {
                name: name.text,
                parameters,
                body,
                position: name.position,
            }));
        }
        if name.text == "import" {
            let import = self.read_import(name, arguments)?;
            return Ok(Statement::Expression(Expression::Import(import)));
        }
        Ok(Statement::Expression(Expression::Call(FunctionCall {
            name: name.text,
            arguments,
            position: name.position,
        })))
    }

    /// Resolve `import('<relative path>')` at parse time: the path is joined
    /// against the importing file's directory and the target file is read and
    /// recursively parsed.
    fn read_import(
        &mut self,
        name: Token,
        arguments: Vec<Expression>,
    ) -> Result<Import, SyntaxError> {
        let first = arguments.into_iter().next().ok_or_else(|| {
            SyntaxError::new("import module path can not be empty", name.position.clone())
        })?;
        let relative = match first {
            Expression::Literal {
                value: Literal::Str(path),
                ..
            } => path,
            other => {
                return Err(SyntaxError::new(
                    format!("import module path must be a string literal, found [{other}]"),
                    other.position().clone(),
                ));
            }
        };
        if !relative.starts_with('.') {
            return Err(SyntaxError::new(
                format!("import module path must be relative, got '{relative}'"),
                name.position.clone(),
            ));
        }
        let base: PathBuf = if self.file.is_empty() {
            std::env::current_dir().map_err(|_| {
                SyntaxError::new(
                    format!("import module path not found '{relative}'"),
                    name.position.clone(),
                )
            })?
        } else {
            Path::new(&self.file)
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        };
        let module_file = base.join(&relative);
        let source = fs::read_to_string(&module_file).map_err(|_| {
            SyntaxError::new(
                format!("import module path not found '{}'", module_file.display()),
                name.position.clone(),
            )
        })?;
        let mut module_parser = Parser::with_file(&source, module_file.to_string_lossy());
        let block = module_parser.parse()?;
        Ok(Import {
            module_path: relative,
            block,
            position: name.position,
        })
    }

    fn read_block_until_rbrace(&mut self) -> Result<Block, SyntaxError> {
        let position = self.current.position.clone();
        let mut block = Block {
            statements: Vec::new(),
            position,
        };
        loop {
            match self.current.kind {
                TokenKind::RBrace => {
                    self.advance();
                    return Ok(block);
                }
                TokenKind::Eof => {
                    return Err(self.error("unexpected end of file, expected [}]"));
                }
                _ => match self.read_statement()? {
                    Some(statement) => block.statements.push(statement),
                    None => return Err(self.error("unexpected end of file, expected [}]")),
                },
            }
        }
    }

    pub fn read_expression(&mut self) -> Result<Expression, SyntaxError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Int => {
                let value = self.parse_int(&token)?;
                self.continue_binary(Expression::Literal {
                    value: Literal::Int(value),
                    position: token.position,
                })
            }
            TokenKind::Str => self.continue_binary(Expression::Literal {
                value: Literal::Str(token.text),
                position: token.position,
            }),
            TokenKind::Name => self.read_name_expression(token),
            TokenKind::LParen => {
                let inner = self.read_expression()?;
                self.expect(TokenKind::RParen, ")")?;
                self.continue_binary(Expression::Sub {
                    inner: Box::new(inner),
                    position: token.position,
                })
            }
            TokenKind::LBrace => {
                let entries = self.read_block_until_rbrace()?;
                self.continue_binary(Expression::Dict {
                    entries,
                    position: token.position,
                })
            }
            TokenKind::LBracket => {
                let list = self.read_list(token)?;
                self.continue_binary(list)
            }
            // Unary plus is a no-op.
            TokenKind::Plus => self.read_expression(),
            _ => Err(SyntaxError::new(
                format!("expected expression, found [{token}]"),
                token.position,
            )),
        }
    }

    fn read_name_expression(&mut self, token: Token) -> Result<Expression, SyntaxError> {
        match token.text.as_str() {
            "true" => self.continue_binary(Expression::Boolean {
                value: true,
                position: token.position,
            }),
            "false" => self.continue_binary(Expression::Boolean {
                value: false,
                position: token.position,
            }),
            _ => match self.current.kind {
                TokenKind::LParen => {
                    self.advance();
                    let position = token.position.clone();
                    match self.read_function(token)? {
                        Statement::Expression(expression) => self.continue_binary(expression),
                        _ => Err(SyntaxError::new(
                            "function definition not allowed in expression",
                            position,
                        )),
                    }
                }
                TokenKind::Dot => {
                    self.advance();
                    let field = Field {
                        target: token.text,
                        key: self.read_field_key()?,
                        position: token.position,
                    };
                    self.continue_binary(Expression::Field(field))
                }
                TokenKind::LBracket => {
                    self.advance();
                    let expression = self.read_bracket_expression(token)?;
                    self.continue_binary(expression)
                }
                _ => self.continue_binary(Expression::Variable {
                    name: token.text,
                    position: token.position,
                }),
            },
        }
    }

    fn read_bracket_expression(&mut self, name: Token) -> Result<Expression, SyntaxError> {
        match self.current.kind {
            TokenKind::Str => {
                let key = self.advance();
                self.expect(TokenKind::RBracket, "]")?;
                Ok(Expression::Field(Field {
                    target: name.text,
                    key: FieldKey::Quoted {
                        value: key.text,
                        position: key.position,
                    },
                    position: name.position,
                }))
            }
            TokenKind::Name => {
                let key = self.advance();
                self.expect(TokenKind::RBracket, "]")?;
                Ok(Expression::Field(Field {
                    target: name.text,
                    key: FieldKey::Dynamic {
                        name: key.text,
                        position: key.position,
                    },
                    position: name.position,
                }))
            }
            TokenKind::Int => {
                let token = self.advance();
                let index = self.parse_int(&token)?;
                self.expect(TokenKind::RBracket, "]")?;
                Ok(Expression::ListAccess {
                    name: name.text,
                    index,
                    position: name.position,
                })
            }
            _ => Err(self.error(format!(
                "expected field key or list index, found [{}]",
                self.current
            ))),
        }
    }

    fn read_list(&mut self, open: Token) -> Result<Expression, SyntaxError> {
        let mut elements = Vec::new();
        loop {
            match self.current.kind {
                TokenKind::NewLine | TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RBracket => {
                    self.advance();
                    break;
                }
                TokenKind::LBrace => {
                    let brace = self.advance();
                    let entries = self.read_block_until_rbrace()?;
                    elements.push(Expression::Dict {
                        entries,
                        position: brace.position,
                    });
                }
                TokenKind::Eof => {
                    return Err(self.error("unexpected end of file, expected []]"));
                }
                _ => elements.push(self.read_expression()?),
            }
        }
        Ok(Expression::List {
            elements,
            position: open.position,
        })
    }

    fn read_field_key(&mut self) -> Result<FieldKey, SyntaxError> {
        let name = self.expect(TokenKind::Name, "field name")?;
        match self.current.kind {
            TokenKind::Dot => {
                self.advance();
                let inner = self.read_field_key()?;
                Ok(FieldKey::Nested(Box::new(Field {
                    target: name.text,
                    key: inner,
                    position: name.position,
                })))
            }
            TokenKind::LParen => {
                self.advance();
                let position = name.position.clone();
                match self.read_function(name)? {
                    Statement::Expression(Expression::Call(call)) => {
                        Ok(FieldKey::Call(Box::new(call)))
                    }
                    _ => Err(SyntaxError::new("invalid field call", position)),
                }
            }
            _ => Ok(FieldKey::Name {
                name: name.text,
                position: name.position,
            }),
        }
    }

    /// Continue `left` with a binary operator if one follows. The right
    /// operand recurses into `read_expression`, so chains associate to the
    /// right with no precedence table.
    fn continue_binary(&mut self, left: Expression) -> Result<Expression, SyntaxError> {
        let operator = if let Some(operator) = binary_operator_for(self.current.kind) {
            self.advance();
            operator
        } else if self.current.kind == TokenKind::Name && self.current.text == "in" {
            self.advance();
            BinaryOperator::In
        } else if self.current.kind == TokenKind::Name && self.current.text == "not" {
            self.advance();
            if self.current.kind == TokenKind::Name && self.current.text == "in" {
                self.advance();
                BinaryOperator::NotIn
            } else {
                return Err(self.error("expected [in] after [not]"));
            }
        } else {
            return Ok(left);
        };
        let position = left.position().clone();
        let right = self.read_expression()?;
        Ok(Expression::Binary(Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            position,
        }))
    }

    fn parse_int(&self, token: &Token) -> Result<i64, SyntaxError> {
        token.text.parse::<i64>().map_err(|_| {
            SyntaxError::new(
                format!("invalid integer literal '{}'", token.text),
                token.position.clone(),
            )
        })
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, SyntaxError> {
        if self.current.kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error(format!("expected [{what}], found [{}]", self.current)))
        }
    }

    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        let old = std::mem::replace(&mut self.current, next);
        self.tokens.push(old.clone());
        old
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.current.position.clone())
    }
}

fn binary_operator_for(kind: TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Plus => Some(BinaryOperator::Add),
        TokenKind::Minus => Some(BinaryOperator::Sub),
        TokenKind::Star => Some(BinaryOperator::Mul),
        TokenKind::Slash => Some(BinaryOperator::Div),
        TokenKind::Gt => Some(BinaryOperator::Gt),
        TokenKind::Gte => Some(BinaryOperator::Gte),
        TokenKind::Lt => Some(BinaryOperator::Lt),
        TokenKind::Lte => Some(BinaryOperator::Lte),
        TokenKind::EqEq => Some(BinaryOperator::Eq),
        TokenKind::NotEq => Some(BinaryOperator::NotEq),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(source: &str) -> Block {
        Parser::new(source).parse().expect("parse failed")
    }

    fn non_newline(block: &Block) -> Vec<&Statement> {
        block
            .statements
            .iter()
            .filter(|s| !matches!(s, Statement::NewLine { .. }))
            .collect()
    }

    #[test]
    fn parses_assignments_with_positions() {
        let block = parse("a = 1\nb=2\nc= a + b");
        let statements = non_newline(&block);
        assert_eq!(statements.len(), 3);
        let lines: Vec<usize> = statements.iter().map(|s| s.position().line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
        match statements[2] {
            Statement::Assign(assign) => match &assign.value {
                Expression::Binary(binary) => {
                    assert_eq!(binary.operator, BinaryOperator::Add);
                    assert!(matches!(&*binary.left, Expression::Variable { name, .. } if name == "a"));
                    assert!(matches!(&*binary.right, Expression::Variable { name, .. } if name == "b"));
                }
                other => panic!("expected binary expression, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn distinguishes_definition_from_call() {
        let block = parse("echo2(b){echo(b)} \n echo2(1)");
        let statements = non_newline(&block);
        match statements[0] {
            Statement::FunctionDef(function) => {
                assert_eq!(function.name, "echo2");
                assert_eq!(function.parameters, vec!["b".to_string()]);
            }
            other => panic!("expected function definition, got {other:?}"),
        }
        match statements[1] {
            Statement::Expression(Expression::Call(call)) => {
                assert_eq!(call.name, "echo2");
                assert_eq!(call.arguments.len(), 1);
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn chains_else_if_before_terminal_else() {
        let block = parse(indoc! {"
            if a > 0 {
                echo(1)
            } else if a == 0 {
                echo(2)
            } else {
                echo(3)
            }
        "});
        let statements = non_newline(&block);
        match statements[0] {
            Statement::If(item) => {
                assert!(item.else_body.is_none());
                let chained = item.else_if.as_ref().expect("missing else-if");
                assert!(chained.else_if.is_none());
                assert!(chained.else_body.is_some());
            }
            other => panic!("expected if statement, got {other:?}"),
        }
    }

    #[test]
    fn parses_for_with_explicit_and_default_names() {
        let block = parse("for i, row in rows {\necho(row)\n}");
        match non_newline(&block)[0] {
            Statement::For(item) => {
                assert_eq!(item.index_name, "i");
                assert_eq!(item.item_name, "row");
                assert_eq!(item.iterable.name, "rows");
            }
            other => panic!("expected for statement, got {other:?}"),
        }

        let block = parse("for {\nbreak\n}");
        match non_newline(&block)[0] {
            Statement::For(item) => {
                assert_eq!(item.index_name, "index");
                assert_eq!(item.item_name, "item");
                assert_eq!(item.iterable.name, "items");
            }
            other => panic!("expected for statement, got {other:?}"),
        }
    }

    #[test]
    fn expression_parsing_is_right_recursive_without_precedence() {
        // Deliberate: `2 * 3 + 4` associates as `2 * (3 + 4)`.
        let block = parse("x = 2 * 3 + 4");
        match non_newline(&block)[0] {
            Statement::Assign(assign) => match &assign.value {
                Expression::Binary(binary) => {
                    assert_eq!(binary.operator, BinaryOperator::Mul);
                    assert!(matches!(&*binary.right, Expression::Binary(inner)
                        if inner.operator == BinaryOperator::Add));
                }
                other => panic!("expected binary expression, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn parses_list_and_dict_literals() {
        let block = parse(indoc! {"
            xs = [1, 2,
                3]
            point = {
                x = 1
                y = 2
            }
        "});
        let statements = non_newline(&block);
        match statements[0] {
            Statement::Assign(assign) => match &assign.value {
                Expression::List { elements, .. } => assert_eq!(elements.len(), 3),
                other => panic!("expected list literal, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
        match statements[1] {
            Statement::Assign(assign) => match &assign.value {
                Expression::Dict { entries, .. } => {
                    let assigns = entries
                        .statements
                        .iter()
                        .filter(|s| matches!(s, Statement::Assign(_)))
                        .count();
                    assert_eq!(assigns, 2);
                }
                other => panic!("expected dict literal, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn parses_field_and_index_access_forms() {
        let block = parse("a.b = 1\nc = a.b\nd = a['k']\ne = xs[0]\na.run()");
        let statements = non_newline(&block);
        assert!(matches!(
            statements[0],
            Statement::Assign(Assign {
                target: AssignTarget::Field(_),
                ..
            })
        ));
        match statements[2] {
            Statement::Assign(assign) => assert!(matches!(
                &assign.value,
                Expression::Field(Field {
                    key: FieldKey::Quoted { value, .. },
                    ..
                }) if value == "k"
            )),
            other => panic!("expected assignment, got {other:?}"),
        }
        match statements[3] {
            Statement::Assign(assign) => assert!(matches!(
                &assign.value,
                Expression::ListAccess { name, index: 0, .. } if name == "xs"
            )),
            other => panic!("expected assignment, got {other:?}"),
        }
        assert!(matches!(
            statements[4],
            Statement::Expression(Expression::Field(Field {
                key: FieldKey::Call(_),
                ..
            }))
        ));
    }

    #[test]
    fn literals_continue_into_binary_expressions() {
        let block = parse(indoc! {"
            a = [1, 2] + [2, 3]
            b = {
                x = 1
            } + {
                x = 2
            }
            c = true == d
        "});
        let statements = non_newline(&block);
        match statements[0] {
            Statement::Assign(assign) => match &assign.value {
                Expression::Binary(binary) => {
                    assert_eq!(binary.operator, BinaryOperator::Add);
                    assert!(matches!(&*binary.left, Expression::List { .. }));
                    assert!(matches!(&*binary.right, Expression::List { .. }));
                }
                other => panic!("expected binary expression, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
        match statements[1] {
            Statement::Assign(assign) => assert!(matches!(
                &assign.value,
                Expression::Binary(binary)
                    if matches!(&*binary.left, Expression::Dict { .. })
                        && matches!(&*binary.right, Expression::Dict { .. })
            )),
            other => panic!("expected assignment, got {other:?}"),
        }
        match statements[2] {
            Statement::Assign(assign) => assert!(matches!(
                &assign.value,
                Expression::Binary(binary)
                    if matches!(&*binary.left, Expression::Boolean { value: true, .. })
            )),
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn stray_keywords_can_not_start_statements() {
        let error = Parser::new("else {\n}\n").parse().expect_err("expected error");
        assert!(error.message.contains("keyword [else]"));
        assert_eq!(error.position.line, 1);

        let error = Parser::new("a = 1\nin = 2\n")
            .parse()
            .expect_err("expected error");
        assert!(error.message.contains("keyword [in]"));
        assert_eq!(error.position.line, 2);
    }

    #[test]
    fn parses_membership_operators() {
        let block = parse("a = 2 in [2]\nb = 2 not in [2]");
        let statements = non_newline(&block);
        match statements[0] {
            Statement::Assign(assign) => assert!(matches!(
                &assign.value,
                Expression::Binary(binary) if binary.operator == BinaryOperator::In
            )),
            other => panic!("expected assignment, got {other:?}"),
        }
        match statements[1] {
            Statement::Assign(assign) => assert!(matches!(
                &assign.value,
                Expression::Binary(binary) if binary.operator == BinaryOperator::NotIn
            )),
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn reports_positioned_syntax_errors() {
        let error = Parser::new("a = ").parse().expect_err("expected error");
        assert!(error.message.contains("expected expression"));
        assert_eq!(error.position.line, 1);

        let error = Parser::new("if a > 1\n").parse().expect_err("expected error");
        assert!(error.message.contains("expected [{]"));
    }

    #[test]
    fn retains_consumed_tokens_for_tooling() {
        let mut parser = Parser::new("a = 1\n");
        parser.parse().expect("parse failed");
        let kinds: Vec<TokenKind> = parser.tokens().iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Name,
                TokenKind::Eq,
                TokenKind::Int,
                TokenKind::NewLine,
            ]
        );
    }

    #[test]
    fn resolves_imports_relative_to_the_importing_file() {
        let source = std::fs::read_to_string("demos/app.rill").expect("missing demo");
        let mut parser = Parser::with_file(&source, "demos/app.rill");
        let block = parser.parse().expect("parse failed");
        let import = block
            .statements
            .iter()
            .find_map(|s| match s {
                Statement::Assign(Assign {
                    value: Expression::Import(import),
                    ..
                }) => Some(import),
                _ => None,
            })
            .expect("missing import");
        assert_eq!(import.module_path, "./util.rill");
        assert!(!import.block.statements.is_empty());
    }

    #[test]
    fn rejects_non_relative_import_paths() {
        let error = Parser::new("import('util.rill')\n")
            .parse()
            .expect_err("expected error");
        assert!(error.message.contains("must be relative"));
    }
}
