use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::ast::{
    Assign, AssignTarget, Binary, BinaryOperator, Block, Expression, Field, FieldKey,
    ForStatement, Function, FunctionCall, IfStatement, Import, Literal, Statement,
};
use crate::builtins::Registry;
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::token::Position;

pub mod value;

pub use value::Value;

pub type Scope = HashMap<String, Value>;

/// Control-flow marker threaded through statement evaluation so `return`,
/// `break` and `continue` unwind to the construct that handles them.
#[derive(Debug, Clone, PartialEq)]
enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Tree-walking evaluator. Holds a stack of scopes (innermost last), the
/// native-function registry and an output buffer that `echo` and friends
/// append to.
pub struct Runtime {
    scopes: Vec<Scope>,
    builtins: Registry,
    current: Position,
    output: String,
}

impl Runtime {
    pub fn new(builtins: Registry) -> Self {
        Self::with_scope(builtins, Scope::new())
    }

    /// Start with pre-seeded global bindings, for hosts that inject values.
    pub fn with_scope(builtins: Registry, globals: Scope) -> Self {
        Self {
            scopes: vec![globals],
            builtins,
            current: Position::default(),
            output: String::new(),
        }
    }

    /// Evaluate a whole program. A top-level `return` yields its value;
    /// falling off the end yields `Nil`.
    pub fn run(&mut self, program: &Block) -> Result<Value, RuntimeError> {
        match self.eval_block(program)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
            Flow::Break => Err(self.error(RuntimeErrorKind::BreakOutsideLoop)),
            Flow::Continue => Err(self.error(RuntimeErrorKind::ContinueOutsideLoop)),
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    pub fn write_output(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// Position of the node currently being evaluated. Builtins use it to
    /// stamp their own errors.
    pub fn position(&self) -> &Position {
        &self.current
    }

    pub fn error(&self, kind: RuntimeErrorKind) -> RuntimeError {
        RuntimeError::new(kind, self.current.clone())
    }

    pub fn push_scope(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Bind in the innermost scope.
    pub fn assign(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    /// Search the scope stack from innermost to outermost.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn eval_block(&mut self, block: &Block) -> Result<Flow, RuntimeError> {
        for statement in &block.statements {
            match self.eval_statement(statement)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_statement(&mut self, statement: &Statement) -> Result<Flow, RuntimeError> {
        self.current = statement.position().clone();
        match statement {
            Statement::NewLine { .. } | Statement::Comment { .. } => Ok(Flow::Normal),
            Statement::Assign(assign) => {
                self.eval_assign(assign)?;
                Ok(Flow::Normal)
            }
            Statement::FunctionDef(function) => {
                self.assign(&function.name, Value::Function(Rc::new(function.clone())));
                Ok(Flow::Normal)
            }
            Statement::If(item) => self.eval_if(item),
            Statement::For(item) => self.eval_for(item),
            Statement::Break { .. } => Ok(Flow::Break),
            Statement::Continue { .. } => Ok(Flow::Continue),
            Statement::Return { value, .. } => {
                let value = match value {
                    Some(expression) => self.eval_expression(expression)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
            Statement::Expression(Expression::Import(import)) => {
                self.import_into_scope(import)?;
                Ok(Flow::Normal)
            }
            Statement::Expression(expression) => {
                self.eval_expression(expression)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn eval_assign(&mut self, assign: &Assign) -> Result<(), RuntimeError> {
        let value = self.eval_expression(&assign.value)?;
        self.current = assign.position.clone();
        match &assign.target {
            AssignTarget::Variable { name, .. } => {
                self.assign(name, value);
                Ok(())
            }
            AssignTarget::Field(field) => self.assign_field(field, value),
            AssignTarget::ListIndex { name, index, .. } => {
                let mut items = match self.lookup(name) {
                    Some(Value::List(items)) => items.clone(),
                    Some(other) => {
                        return Err(self.error(RuntimeErrorKind::NotAList {
                            name: name.clone(),
                            type_name: other.type_name().to_string(),
                        }));
                    }
                    None => {
                        return Err(self.error(RuntimeErrorKind::NotAList {
                            name: name.clone(),
                            type_name: "nil".to_string(),
                        }));
                    }
                };
                let slot = usize::try_from(*index)
                    .ok()
                    .filter(|i| *i < items.len())
                    .ok_or_else(|| {
                        self.error(RuntimeErrorKind::ListIndexOutOfBounds {
                            index: *index,
                            len: items.len(),
                        })
                    })?;
                items[slot] = value;
                self.assign(name, Value::List(items));
                Ok(())
            }
        }
    }

    /// `a.b = v` and `a['b'] = v`. A missing or nil target becomes a fresh
    /// dict, so `a.b = 1` works without declaring `a` first.
    fn assign_field(&mut self, field: &Field, value: Value) -> Result<(), RuntimeError> {
        match &field.key {
            FieldKey::Name { name: key, .. } | FieldKey::Quoted { value: key, .. } => {
                let mut map = match self.lookup(&field.target) {
                    Some(Value::Map(map)) => map.clone(),
                    Some(Value::Nil) | None => BTreeMap::new(),
                    Some(other) => {
                        return Err(self.error(RuntimeErrorKind::FieldAccessOnNonMap {
                            name: field.target.clone(),
                            type_name: other.type_name().to_string(),
                        }));
                    }
                };
                map.insert(key.clone(), value);
                self.assign(&field.target, Value::Map(map));
                Ok(())
            }
            _ => Err(self.error(RuntimeErrorKind::InvalidAssignTarget)),
        }
    }

    fn eval_if(&mut self, item: &IfStatement) -> Result<Flow, RuntimeError> {
        self.current = item.position.clone();
        let condition = self.eval_expression(&item.condition)?;
        match condition {
            Value::Bool(true) => self.eval_block(&item.body),
            Value::Bool(false) => {
                if let Some(else_if) = &item.else_if {
                    self.eval_if(else_if)
                } else if let Some(else_body) = &item.else_body {
                    self.eval_block(else_body)
                } else {
                    Ok(Flow::Normal)
                }
            }
            other => Err(RuntimeError::new(
                RuntimeErrorKind::ConditionNotBoolean {
                    type_name: other.type_name().to_string(),
                },
                item.condition.position().clone(),
            )),
        }
    }

    fn eval_for(&mut self, item: &ForStatement) -> Result<Flow, RuntimeError> {
        self.current = item.position.clone();
        let items = match self.lookup(&item.iterable.name) {
            Some(Value::List(items)) => items.clone(),
            Some(other) => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::IterableNotList {
                        name: item.iterable.name.clone(),
                        type_name: other.type_name().to_string(),
                    },
                    item.iterable.position.clone(),
                ));
            }
            None => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::IterableNotList {
                        name: item.iterable.name.clone(),
                        type_name: "nil".to_string(),
                    },
                    item.iterable.position.clone(),
                ));
            }
        };
        // Loop variables are bound in the enclosing scope, so accumulator
        // assignments in the body persist across iterations.
        for (index, element) in items.into_iter().enumerate() {
            self.assign(&item.index_name, Value::Int(index as i64));
            self.assign(&item.item_name, element);
            match self.eval_block(&item.body)? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_expression(&mut self, expression: &Expression) -> Result<Value, RuntimeError> {
        self.current = expression.position().clone();
        match expression {
            Expression::Literal { value, .. } => Ok(match value {
                Literal::Int(value) => Value::Int(*value),
                Literal::Str(value) => Value::Str(value.clone()),
            }),
            Expression::Boolean { value, .. } => Ok(Value::Bool(*value)),
            // Reading a name that was never bound yields nil.
            Expression::Variable { name, .. } => {
                Ok(self.lookup(name).cloned().unwrap_or(Value::Nil))
            }
            Expression::Binary(binary) => self.eval_binary(binary),
            Expression::Sub { inner, .. } => self.eval_expression(inner),
            Expression::List { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.eval_expression(element)?);
                }
                Ok(Value::List(items))
            }
            Expression::ListAccess {
                name,
                index,
                position,
            } => {
                let items = match self.lookup(name) {
                    Some(Value::List(items)) => items,
                    Some(other) => {
                        return Err(RuntimeError::new(
                            RuntimeErrorKind::NotAList {
                                name: name.clone(),
                                type_name: other.type_name().to_string(),
                            },
                            position.clone(),
                        ));
                    }
                    None => {
                        return Err(RuntimeError::new(
                            RuntimeErrorKind::NotAList {
                                name: name.clone(),
                                type_name: "nil".to_string(),
                            },
                            position.clone(),
                        ));
                    }
                };
                usize::try_from(*index)
                    .ok()
                    .and_then(|i| items.get(i))
                    .cloned()
                    .ok_or_else(|| {
                        RuntimeError::new(
                            RuntimeErrorKind::ListIndexOutOfBounds {
                                index: *index,
                                len: items.len(),
                            },
                            position.clone(),
                        )
                    })
            }
            Expression::Dict { entries, .. } => self
                .eval_entries(entries, RuntimeErrorKind::InvalidDictEntry)
                .map(Value::Map),
            Expression::Field(field) => self.eval_field(field),
            Expression::Call(call) => self.eval_function_call(call),
            Expression::Import(import) => self
                .eval_entries(&import.block, RuntimeErrorKind::InvalidModuleEntry)
                .map(Value::Map),
        }
    }

    /// Evaluate a dict or module block into a map. Only assignments and
    /// function definitions are allowed; newlines and comments are skipped.
    fn eval_entries(
        &mut self,
        block: &Block,
        invalid: RuntimeErrorKind,
    ) -> Result<BTreeMap<String, Value>, RuntimeError> {
        let mut map = BTreeMap::new();
        for statement in &block.statements {
            match statement {
                Statement::NewLine { .. } | Statement::Comment { .. } => {}
                Statement::Assign(assign) => match &assign.target {
                    AssignTarget::Variable { name, .. } => {
                        let value = self.eval_expression(&assign.value)?;
                        map.insert(name.clone(), value);
                    }
                    _ => {
                        return Err(RuntimeError::new(
                            invalid.clone(),
                            assign.position.clone(),
                        ));
                    }
                },
                Statement::FunctionDef(function) => {
                    map.insert(
                        function.name.clone(),
                        Value::Function(Rc::new(function.clone())),
                    );
                }
                other => {
                    return Err(RuntimeError::new(invalid.clone(), other.position().clone()));
                }
            }
        }
        Ok(map)
    }

    /// `import(...)` in statement position merges the module's bindings into
    /// the current scope.
    fn import_into_scope(&mut self, import: &Import) -> Result<(), RuntimeError> {
        self.current = import.position.clone();
        let map = self.eval_entries(&import.block, RuntimeErrorKind::InvalidModuleEntry)?;
        for (name, value) in map {
            self.assign(&name, value);
        }
        Ok(())
    }

    fn eval_field(&mut self, field: &Field) -> Result<Value, RuntimeError> {
        self.current = field.position.clone();
        let root = self.lookup(&field.target).cloned().unwrap_or(Value::Nil);
        let map = match root {
            Value::Map(map) => map,
            other => {
                return Err(self.error(RuntimeErrorKind::FieldAccessOnNonMap {
                    name: field.target.clone(),
                    type_name: other.type_name().to_string(),
                }));
            }
        };
        match &field.key {
            FieldKey::Name { name: key, .. } | FieldKey::Quoted { value: key, .. } => {
                Ok(map.get(key).cloned().unwrap_or(Value::Nil))
            }
            FieldKey::Dynamic { name, position } => {
                match self.lookup(name).cloned().unwrap_or(Value::Nil) {
                    Value::Str(key) => Ok(map.get(&key).cloned().unwrap_or(Value::Nil)),
                    other => Err(RuntimeError::new(
                        RuntimeErrorKind::DynamicKeyNotString {
                            name: name.clone(),
                            type_name: other.type_name().to_string(),
                        },
                        position.clone(),
                    )),
                }
            }
            // Method call: the member functions see the map's entries and the
            // map itself as `this`.
            FieldKey::Call(call) => {
                let mut scope: Scope = map.clone().into_iter().collect();
                scope.insert("this".to_string(), Value::Map(map));
                self.push_scope(scope);
                let result = self.eval_function_call(call);
                self.pop_scope();
                result
            }
            FieldKey::Nested(inner) => {
                self.push_scope(map.into_iter().collect());
                let result = self.eval_field(inner);
                self.pop_scope();
                result
            }
        }
    }

    /// Call resolution order: native registry, then a member of `this`, then
    /// a variable holding a function value.
    fn eval_function_call(&mut self, call: &FunctionCall) -> Result<Value, RuntimeError> {
        self.current = call.position.clone();
        let mut args = Vec::with_capacity(call.arguments.len());
        for argument in &call.arguments {
            args.push(self.eval_expression(argument)?);
        }
        self.current = call.position.clone();
        if let Some(native) = self.builtins.get(&call.name) {
            return native(self, args);
        }
        let this_member = match self.lookup("this") {
            Some(Value::Map(map)) => map.get(&call.name).cloned(),
            _ => None,
        };
        if let Some(value) = this_member {
            return self.call_value(&call.name, value, args, &call.position);
        }
        match self.lookup(&call.name).cloned() {
            Some(value) => self.call_value(&call.name, value, args, &call.position),
            None => Err(RuntimeError::new(
                RuntimeErrorKind::UndefinedFunction {
                    name: call.name.clone(),
                },
                call.position.clone(),
            )),
        }
    }

    fn call_value(
        &mut self,
        name: &str,
        value: Value,
        args: Vec<Value>,
        position: &Position,
    ) -> Result<Value, RuntimeError> {
        match value {
            Value::Function(function) => self.eval_function(&function, args),
            Value::Nil => Err(RuntimeError::new(
                RuntimeErrorKind::UndefinedFunction {
                    name: name.to_string(),
                },
                position.clone(),
            )),
            other => Err(RuntimeError::new(
                RuntimeErrorKind::NotCallable {
                    name: name.to_string(),
                    type_name: other.type_name().to_string(),
                },
                position.clone(),
            )),
        }
    }

    /// Apply a user-defined function. Extra arguments are ignored; missing
    /// ones are an arity error.
    fn eval_function(&mut self, function: &Function, args: Vec<Value>) -> Result<Value, RuntimeError> {
        if args.len() < function.parameters.len() {
            return Err(self.error(RuntimeErrorKind::ArityMismatch {
                name: function.name.clone(),
                expected: function.parameters.len(),
                found: args.len(),
            }));
        }
        self.push_scope(Scope::new());
        for (parameter, value) in function.parameters.iter().zip(args) {
            self.assign(parameter, value);
        }
        let flow = self.eval_block(&function.body);
        self.pop_scope();
        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
            Flow::Break => Err(self.error(RuntimeErrorKind::BreakOutsideLoop)),
            Flow::Continue => Err(self.error(RuntimeErrorKind::ContinueOutsideLoop)),
        }
    }

    fn eval_binary(&mut self, binary: &Binary) -> Result<Value, RuntimeError> {
        let left = self.eval_expression(&binary.left)?;
        let right = self.eval_expression(&binary.right)?;
        self.current = binary.position.clone();
        match binary.operator {
            BinaryOperator::In | BinaryOperator::NotIn => {
                let items = match right {
                    Value::List(items) => items,
                    other => {
                        return Err(self.error(RuntimeErrorKind::MembershipNotList {
                            type_name: other.type_name().to_string(),
                        }));
                    }
                };
                let mut found = false;
                for item in &items {
                    if self.values_equal(&left, item)? {
                        found = true;
                        break;
                    }
                }
                Ok(Value::Bool(if binary.operator == BinaryOperator::In {
                    found
                } else {
                    !found
                }))
            }
            BinaryOperator::Eq => self.values_equal(&left, &right).map(Value::Bool),
            BinaryOperator::NotEq => self.values_equal(&left, &right).map(|eq| Value::Bool(!eq)),
            BinaryOperator::Add => self.eval_add(left, right),
            BinaryOperator::Sub => self.eval_sub(left, right),
            BinaryOperator::Mul => match (&left, &right) {
                (Value::Int(l), Value::Int(r)) => self.checked_int(l.checked_mul(*r), "*"),
                _ => Err(self.operands_error(binary.operator, &left, &right)),
            },
            BinaryOperator::Div => match (&left, &right) {
                (Value::Int(_), Value::Int(0)) => {
                    Err(self.error(RuntimeErrorKind::DivisionByZero))
                }
                // checked_div also catches i64::MIN / -1.
                (Value::Int(l), Value::Int(r)) => self.checked_int(l.checked_div(*r), "/"),
                _ => Err(self.operands_error(binary.operator, &left, &right)),
            },
            BinaryOperator::Gt
            | BinaryOperator::Gte
            | BinaryOperator::Lt
            | BinaryOperator::Lte => match (&left, &right) {
                (Value::Int(l), Value::Int(r)) => Ok(Value::Bool(match binary.operator {
                    BinaryOperator::Gt => l > r,
                    BinaryOperator::Gte => l >= r,
                    BinaryOperator::Lt => l < r,
                    _ => l <= r,
                })),
                _ => Err(self.operands_error(binary.operator, &left, &right)),
            },
        }
    }

    fn checked_int(&self, result: Option<i64>, operator: &str) -> Result<Value, RuntimeError> {
        result.map(Value::Int).ok_or_else(|| {
            self.error(RuntimeErrorKind::IntegerOverflow {
                operator: operator.to_string(),
            })
        })
    }

    fn eval_add(&self, left: Value, right: Value) -> Result<Value, RuntimeError> {
        match (left, right) {
            (Value::Int(l), Value::Int(r)) => self.checked_int(l.checked_add(r), "+"),
            (Value::Str(l), Value::Str(r)) => Ok(Value::Str(l + &r)),
            (Value::List(l), Value::List(r)) => self.list_union(l, r),
            // Dict union is right-biased: the right operand wins on key clash.
            (Value::Map(l), Value::Map(r)) => {
                let mut result = l;
                result.extend(r);
                Ok(Value::Map(result))
            }
            (left, right) => Err(self.operands_error(BinaryOperator::Add, &left, &right)),
        }
    }

    fn eval_sub(&self, left: Value, right: Value) -> Result<Value, RuntimeError> {
        match (left, right) {
            (Value::Int(l), Value::Int(r)) => self.checked_int(l.checked_sub(r), "-"),
            (Value::List(l), Value::List(r)) => self.list_difference(l, r),
            // Dict difference drops entries whose key and value both match.
            (Value::Map(l), Value::Map(r)) => {
                let mut result = BTreeMap::new();
                for (key, value) in l {
                    let drop = match r.get(&key) {
                        Some(other) => self.values_equal(&value, other)?,
                        None => false,
                    };
                    if !drop {
                        result.insert(key, value);
                    }
                }
                Ok(Value::Map(result))
            }
            (left, right) => Err(self.operands_error(BinaryOperator::Sub, &left, &right)),
        }
    }

    /// List `+` is a union that preserves first-seen order and drops
    /// duplicates.
    fn list_union(&self, left: Vec<Value>, right: Vec<Value>) -> Result<Value, RuntimeError> {
        let mut result: Vec<Value> = Vec::new();
        for item in left.into_iter().chain(right) {
            let mut seen = false;
            for existing in &result {
                if self.values_equal(existing, &item)? {
                    seen = true;
                    break;
                }
            }
            if !seen {
                result.push(item);
            }
        }
        Ok(Value::List(result))
    }

    /// List `-` removes one occurrence from the left for each matching
    /// element on the right.
    fn list_difference(&self, left: Vec<Value>, right: Vec<Value>) -> Result<Value, RuntimeError> {
        let mut remaining = right;
        let mut result = Vec::new();
        for item in left {
            let mut matched = None;
            for (idx, candidate) in remaining.iter().enumerate() {
                if self.values_equal(&item, candidate)? {
                    matched = Some(idx);
                    break;
                }
            }
            match matched {
                Some(idx) => {
                    remaining.remove(idx);
                }
                None => result.push(item),
            }
        }
        Ok(Value::List(result))
    }

    fn values_equal(&self, left: &Value, right: &Value) -> Result<bool, RuntimeError> {
        value::values_equal(left, right).map_err(|kind| self.error(kind))
    }

    fn operands_error(
        &self,
        operator: BinaryOperator,
        left: &Value,
        right: &Value,
    ) -> RuntimeError {
        self.error(RuntimeErrorKind::UnsupportedOperands {
            operator: operator.to_string(),
            left: left.type_name().to_string(),
            right: right.type_name().to_string(),
        })
    }
}
