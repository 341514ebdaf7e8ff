use thiserror::Error;

use crate::token::Position;

/// Malformed token sequence. Always carries the offending token's position
/// and is returned from `Parser::parse`, never panicked.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{position}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub position: Position,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// Positioned evaluation failure, propagated up to the single recovery point
/// at `Runtime::run`.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{position}: {kind}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub position: Position,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, position: Position) -> Self {
        Self { kind, position }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeErrorKind {
    #[error("function [{name}] not defined")]
    UndefinedFunction { name: String },
    #[error("[{name}] is not a function, got {type_name}")]
    NotCallable { name: String, type_name: String },
    #[error("function {name} required {expected} args but {found} given")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("function [{name}] expected {expected}, got {got}")]
    InvalidArgument {
        name: String,
        expected: String,
        got: String,
    },
    #[error("if statement condition must be boolean, got {type_name}")]
    ConditionNotBoolean { type_name: String },
    #[error("operator [{operator}] not supported for types [{left}] and [{right}]")]
    UnsupportedOperands {
        operator: String,
        left: String,
        right: String,
    },
    #[error("equality not supported for type [{type_name}]")]
    UnsupportedEquality { type_name: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in [{operator}]")]
    IntegerOverflow { operator: String },
    #[error("right side of [in] must be a list, got {type_name}")]
    MembershipNotList { type_name: String },
    #[error("variable [{name}] is not a dict, got {type_name}")]
    FieldAccessOnNonMap { name: String, type_name: String },
    #[error("field key [{name}] must hold a string, got {type_name}")]
    DynamicKeyNotString { name: String, type_name: String },
    #[error("variable [{name}] is not a list, got {type_name}")]
    NotAList { name: String, type_name: String },
    #[error("list index {index} out of bounds, len {len}")]
    ListIndexOutOfBounds { index: i64, len: usize },
    #[error("for iterable [{name}] must be a list, got {type_name}")]
    IterableNotList { name: String, type_name: String },
    #[error("dict struct must only contain assignments and functions")]
    InvalidDictEntry,
    #[error("module must only contain assignments and functions")]
    InvalidModuleEntry,
    #[error("invalid assignment target")]
    InvalidAssignTarget,
    #[error("break outside of loop")]
    BreakOutsideLoop,
    #[error("continue outside of loop")]
    ContinueOutsideLoop,
    #[error("assertion failed")]
    AssertionFailed,
    #[error("{message}")]
    Other { message: String },
}
