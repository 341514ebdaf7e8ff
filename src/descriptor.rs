use serde::Serialize;

use crate::ast::{
    Assign, AssignTarget, Block, Expression, Field, FieldKey, ForStatement, Function,
    FunctionCall, IfStatement, Import, Literal, Statement,
};
use crate::token::Position;

/// Uniform AST summary for editor tooling: hover, outline and completion
/// consume this instead of matching on the AST enums directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptor {
    /// Stable node kind label, e.g. "Assign" or "BinaryExpression".
    pub node_type: &'static str,
    pub position: Position,
    /// The defining name, where the node has one.
    pub name: Option<String>,
    /// Source-shaped rendering of the node.
    pub text: String,
    pub children: Vec<Descriptor>,
}

impl Descriptor {
    fn new(node_type: &'static str, position: &Position, text: String) -> Self {
        Self {
            node_type,
            position: position.clone(),
            name: None,
            text,
            children: Vec::new(),
        }
    }

    fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn with_children(mut self, children: Vec<Descriptor>) -> Self {
        self.children = children;
        self
    }

    /// Depth-first search for the innermost descriptor covering a source
    /// coordinate.
    pub fn at(&self, line: usize, col: usize) -> Option<&Descriptor> {
        for child in &self.children {
            if let Some(found) = child.at(line, col) {
                return Some(found);
            }
        }
        let position = &self.position;
        if position.line == line && col >= position.col && col < position.col + position.length.max(1)
        {
            return Some(self);
        }
        None
    }
}

pub trait Describe {
    fn describe(&self) -> Descriptor;
}

impl Describe for Block {
    fn describe(&self) -> Descriptor {
        let children = self
            .statements
            .iter()
            .filter(|s| !matches!(s, Statement::NewLine { .. }))
            .map(Statement::describe)
            .collect();
        Descriptor::new("Block", &self.position, self.render_inner()).with_children(children)
    }
}

impl Describe for Statement {
    fn describe(&self) -> Descriptor {
        match self {
            Statement::NewLine { position } => Descriptor::new("NewLine", position, String::new()),
            Statement::Comment { text, position } => {
                Descriptor::new("Comment", position, format!("//{text}"))
            }
            Statement::Assign(assign) => assign.describe(),
            Statement::FunctionDef(function) => function.describe(),
            Statement::If(item) => item.describe(),
            Statement::For(item) => item.describe(),
            Statement::Break { position } => {
                Descriptor::new("Break", position, "break".to_string())
            }
            Statement::Continue { position } => {
                Descriptor::new("Continue", position, "continue".to_string())
            }
            Statement::Return { value, position } => {
                let children = value.iter().map(Expression::describe).collect();
                Descriptor::new("Return", position, self.to_string()).with_children(children)
            }
            Statement::Expression(expression) => expression.describe(),
        }
    }
}

impl Describe for Assign {
    fn describe(&self) -> Descriptor {
        let target = match &self.target {
            AssignTarget::Variable { name, position } => {
                Descriptor::new("Variable", position, name.clone()).named(name)
            }
            AssignTarget::Field(field) => field.describe(),
            AssignTarget::ListIndex { name, position, .. } => {
                Descriptor::new("ListAccess", position, self.target.to_string()).named(name)
            }
        };
        Descriptor::new("Assign", &self.position, self.to_string())
            .named(self.target.to_string())
            .with_children(vec![target, self.value.describe()])
    }
}

impl Describe for Function {
    fn describe(&self) -> Descriptor {
        Descriptor::new("Function", &self.position, self.signature())
            .named(&self.name)
            .with_children(vec![self.body.describe()])
    }
}

impl Describe for IfStatement {
    fn describe(&self) -> Descriptor {
        let mut children = vec![self.condition.describe(), self.body.describe()];
        if let Some(else_if) = &self.else_if {
            children.push(else_if.describe());
        }
        if let Some(else_body) = &self.else_body {
            children.push(else_body.describe());
        }
        Descriptor::new("IfStatement", &self.position, self.to_string()).with_children(children)
    }
}

impl Describe for ForStatement {
    fn describe(&self) -> Descriptor {
        let iterable = Descriptor::new(
            "IterableExpression",
            &self.iterable.position,
            self.iterable.name.clone(),
        )
        .named(&self.iterable.name);
        Descriptor::new("ForStatement", &self.position, self.to_string())
            .with_children(vec![iterable, self.body.describe()])
    }
}

impl Describe for FunctionCall {
    fn describe(&self) -> Descriptor {
        let children = self.arguments.iter().map(Expression::describe).collect();
        Descriptor::new("FunctionCall", &self.position, self.to_string())
            .named(&self.name)
            .with_children(children)
    }
}

impl Describe for Import {
    fn describe(&self) -> Descriptor {
        Descriptor::new("Import", &self.position, self.to_string())
            .named(&self.module_path)
            .with_children(vec![self.block.describe()])
    }
}

impl Describe for Field {
    fn describe(&self) -> Descriptor {
        let children = match &self.key {
            FieldKey::Name { .. } | FieldKey::Dynamic { .. } => Vec::new(),
            FieldKey::Quoted { value, position } => {
                vec![Descriptor::new("StringExpression", position, value.clone())]
            }
            FieldKey::Call(call) => vec![call.describe()],
            FieldKey::Nested(field) => vec![field.describe()],
        };
        Descriptor::new("Field", &self.position, self.to_string())
            .named(self.to_string())
            .with_children(children)
    }
}

impl Describe for Expression {
    fn describe(&self) -> Descriptor {
        match self {
            Expression::Literal { value, position } => {
                let descriptor = Descriptor::new("Literal", position, self.to_string());
                match value {
                    Literal::Str(text) => descriptor.named(text),
                    Literal::Int(_) => descriptor,
                }
            }
            Expression::Boolean { position, .. } => {
                Descriptor::new("Boolean", position, self.to_string())
            }
            Expression::Variable { name, position } => {
                Descriptor::new("Variable", position, name.clone()).named(name)
            }
            Expression::Binary(binary) => {
                Descriptor::new("BinaryExpression", &binary.position, self.to_string())
                    .named(binary.operator.to_string())
                    .with_children(vec![binary.left.describe(), binary.right.describe()])
            }
            Expression::Sub { inner, position } => {
                Descriptor::new("SubExpression", position, self.to_string())
                    .with_children(vec![inner.describe()])
            }
            Expression::List { elements, position } => {
                let children = elements.iter().map(Expression::describe).collect();
                Descriptor::new("List", position, self.to_string()).with_children(children)
            }
            Expression::ListAccess { name, position, .. } => {
                Descriptor::new("ListAccess", position, self.to_string()).named(name)
            }
            Expression::Dict { entries, position } => {
                Descriptor::new("Block", position, self.to_string())
                    .with_children(vec![entries.describe()])
            }
            Expression::Field(field) => field.describe(),
            Expression::Call(call) => call.describe(),
            Expression::Import(import) => import.describe(),
        }
    }
}
