pub mod ast;
pub mod builtins;
pub mod descriptor;
pub mod error;
pub mod format;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod token;

pub use builtins::{DuplicateBuiltin, NativeFn, Registry};
pub use descriptor::{Describe, Descriptor};
pub use error::{RuntimeError, RuntimeErrorKind, SyntaxError};
pub use format::format_source;
pub use interpreter::{Runtime, Scope, Value};
pub use lexer::{tokenize, Lexer};
pub use parser::Parser;
pub use token::{Position, Token, TokenKind};
