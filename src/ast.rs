use std::fmt;

use serde::Serialize;

use crate::token::Position;

/// Ordered sequence of statements. A block is the body of the program, of a
/// function, of an if/for branch, and also the payload of a dict literal.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Statement {
    NewLine {
        position: Position,
    },
    Comment {
        text: String,
        position: Position,
    },
    Assign(Assign),
    FunctionDef(Function),
    If(IfStatement),
    For(ForStatement),
    Break {
        position: Position,
    },
    Continue {
        position: Position,
    },
    Return {
        value: Option<Expression>,
        position: Position,
    },
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assign {
    pub target: AssignTarget,
    pub value: Expression,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AssignTarget {
    Variable {
        name: String,
        position: Position,
    },
    Field(Field),
    ListIndex {
        name: String,
        index: i64,
        position: Position,
    },
}

/// A function definition. Function values carry only this static definition;
/// they do not capture enclosing bindings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Block,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Vec<Expression>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfStatement {
    pub condition: Expression,
    pub body: Block,
    pub else_if: Option<Box<IfStatement>>,
    pub else_body: Option<Block>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForStatement {
    pub index_name: String,
    pub item_name: String,
    pub iterable: IterableExpression,
    pub body: Block,
    pub position: Position,
}

/// The `in <name>` part of a for statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterableExpression {
    pub name: String,
    pub position: Position,
}

/// A module inclusion resolved at parse time: the referenced file has already
/// been read and parsed into `block`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Import {
    pub module_path: String,
    pub block: Block,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expression {
    Literal {
        value: Literal,
        position: Position,
    },
    Boolean {
        value: bool,
        position: Position,
    },
    Variable {
        name: String,
        position: Position,
    },
    Binary(Binary),
    Sub {
        inner: Box<Expression>,
        position: Position,
    },
    List {
        elements: Vec<Expression>,
        position: Position,
    },
    ListAccess {
        name: String,
        index: i64,
        position: Position,
    },
    /// `{ ... }` in expression position; interpreted as a dict by the
    /// evaluator when its statements are all assignments or functions.
    Dict {
        entries: Block,
        position: Position,
    },
    Field(Field),
    Call(FunctionCall),
    Import(Import),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Int(i64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binary {
    pub left: Box<Expression>,
    pub operator: BinaryOperator,
    pub right: Box<Expression>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    NotEq,
    In,
    NotIn,
}

/// Dotted or indexed access rooted at a named variable: `a.b`, `a['b']`,
/// `a[key]`, `a.b()`, `a.b.c`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub target: String,
    pub key: FieldKey,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldKey {
    /// `a.b` — static key.
    Name { name: String, position: Position },
    /// `a['b']` — quoted key.
    Quoted { value: String, position: Position },
    /// `a[k]` — the variable `k` holds the key string.
    Dynamic { name: String, position: Position },
    /// `a.b(...)` — call dispatched with `a` as `this`.
    Call(Box<FunctionCall>),
    /// `a.b.c` — resolution continues against the inner map.
    Nested(Box<Field>),
}

impl Statement {
    pub fn position(&self) -> &Position {
        match self {
            Statement::NewLine { position }
            | Statement::Comment { position, .. }
            | Statement::Break { position }
            | Statement::Continue { position }
            | Statement::Return { position, .. } => position,
            Statement::Assign(assign) => &assign.position,
            Statement::FunctionDef(function) => &function.position,
            Statement::If(item) => &item.position,
            Statement::For(item) => &item.position,
            Statement::Expression(expression) => expression.position(),
        }
    }
}

impl Expression {
    pub fn position(&self) -> &Position {
        match self {
            Expression::Literal { position, .. }
            | Expression::Boolean { position, .. }
            | Expression::Variable { position, .. }
            | Expression::Sub { position, .. }
            | Expression::List { position, .. }
            | Expression::ListAccess { position, .. }
            | Expression::Dict { position, .. } => position,
            Expression::Binary(binary) => &binary.position,
            Expression::Field(field) => &field.position,
            Expression::Call(call) => &call.position,
            Expression::Import(import) => &import.position,
        }
    }
}

/// Prefix every non-empty line with two spaces.
fn indent(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("  {}", line.trim_end())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl Block {
    /// Render the statements one per line, dropping leading newline tokens and
    /// collapsing any run of blank lines to exactly one.
    pub fn render_inner(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        let mut blanks = 0usize;
        for statement in &self.statements {
            match statement {
                Statement::NewLine { .. } => blanks += 1,
                other => {
                    if !lines.is_empty() && blanks >= 2 {
                        lines.push(String::new());
                    }
                    lines.push(other.to_string());
                    blanks = 0;
                }
            }
        }
        lines.join("\n")
    }

    /// Render as a braced, indented block.
    pub fn render_braced(&self) -> String {
        let inner = self.render_inner();
        if inner.is_empty() {
            "{\n}".to_string()
        } else {
            format!("{{\n{}\n}}", indent(&inner))
        }
    }

    /// Render a whole program: no surrounding braces, trailing newline.
    pub fn format_root(&self) -> String {
        let inner = self.render_inner();
        if inner.is_empty() {
            String::new()
        } else {
            format!("{inner}\n")
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render_braced())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::NewLine { .. } => writeln!(f),
            Statement::Comment { text, .. } => write!(f, "//{text}"),
            Statement::Assign(assign) => write!(f, "{assign}"),
            Statement::FunctionDef(function) => write!(f, "{function}"),
            Statement::If(item) => write!(f, "{item}"),
            Statement::For(item) => write!(f, "{item}"),
            Statement::Break { .. } => write!(f, "break"),
            Statement::Continue { .. } => write!(f, "continue"),
            Statement::Return { value, .. } => match value {
                Some(value) => write!(f, "return {value}"),
                None => write!(f, "return"),
            },
            Statement::Expression(expression) => write!(f, "{expression}"),
        }
    }
}

impl fmt::Display for Assign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.target, self.value)
    }
}

impl fmt::Display for AssignTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignTarget::Variable { name, .. } => write!(f, "{name}"),
            AssignTarget::Field(field) => write!(f, "{field}"),
            AssignTarget::ListIndex { name, index, .. } => write!(f, "{name}[{index}]"),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) {}",
            self.name,
            self.parameters.join(", "),
            self.body.render_braced()
        )
    }
}

impl Function {
    /// `name(a, b)` — used by tooling for signature help.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.parameters.join(", "))
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arguments = self
            .arguments
            .iter()
            .map(Expression::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({})", self.name, arguments)
    }
}

impl fmt::Display for IfStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if {} {}", self.condition, self.body.render_braced())?;
        if let Some(else_if) = &self.else_if {
            write!(f, " else {else_if}")?;
        }
        if let Some(else_body) = &self.else_body {
            write!(f, " else {}", else_body.render_braced())?;
        }
        Ok(())
    }
}

impl fmt::Display for ForStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "for {}, {} in {} {}",
            self.index_name,
            self.item_name,
            self.iterable.name,
            self.body.render_braced()
        )
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "import('{}')", self.module_path)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal { value, .. } => write!(f, "{value}"),
            Expression::Boolean { value, .. } => write!(f, "{value}"),
            Expression::Variable { name, .. } => write!(f, "{name}"),
            Expression::Binary(binary) => write!(f, "{binary}"),
            Expression::Sub { inner, .. } => write!(f, "({inner})"),
            Expression::List { elements, .. } => {
                let rendered = elements
                    .iter()
                    .map(Expression::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "[{rendered}]")
            }
            Expression::ListAccess { name, index, .. } => write!(f, "{name}[{index}]"),
            Expression::Dict { entries, .. } => write!(f, "{}", entries.render_braced()),
            Expression::Field(field) => write!(f, "{field}"),
            Expression::Call(call) => write!(f, "{call}"),
            Expression::Import(import) => write!(f, "{import}"),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Str(value) => write!(f, "'{value}'"),
        }
    }
}

impl fmt::Display for Binary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Gt => ">",
            BinaryOperator::Gte => ">=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Lte => "<=",
            BinaryOperator::Eq => "==",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::In => "in",
            BinaryOperator::NotIn => "not in",
        };
        write!(f, "{text}")
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            FieldKey::Name { name, .. } => write!(f, "{}.{}", self.target, name),
            FieldKey::Quoted { value, .. } => write!(f, "{}['{}']", self.target, value),
            FieldKey::Dynamic { name, .. } => write!(f, "{}[{}]", self.target, name),
            FieldKey::Call(call) => write!(f, "{}.{}", self.target, call),
            FieldKey::Nested(field) => write!(f, "{}.{}", self.target, field),
        }
    }
}
