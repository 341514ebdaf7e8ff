use std::collections::HashMap;
use std::rc::Rc;
use std::time::SystemTime;

use thiserror::Error;

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::interpreter::{Runtime, Value};

/// Signature of a host-provided function. Natives receive the runtime so they
/// can write to the output buffer and stamp errors with the call position.
pub type NativeFn = Rc<dyn Fn(&mut Runtime, Vec<Value>) -> Result<Value, RuntimeError>>;

#[derive(Debug, Error)]
#[error("function [{0}] already registered")]
pub struct DuplicateBuiltin(pub String);

/// Name-indexed table of native functions, consulted before user definitions
/// when a call is resolved.
#[derive(Clone, Default)]
pub struct Registry {
    functions: HashMap<String, NativeFn>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard set of builtins every script gets.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.insert("echo", echo);
        registry.insert("echoln", echoln);
        registry.insert("len", len);
        registry.insert("typeof", type_of);
        registry.insert("assert", assert_true);
        registry.insert("str", to_str);
        registry.insert("int", to_int);
        registry.insert("now", now);
        registry
    }

    /// Add a host function. Registering over an existing name is refused so a
    /// host cannot silently shadow a default.
    pub fn register(&mut self, name: &str, function: NativeFn) -> Result<(), DuplicateBuiltin> {
        if self.functions.contains_key(name) {
            return Err(DuplicateBuiltin(name.to_string()));
        }
        self.functions.insert(name.to_string(), function);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<NativeFn> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted. Used for tooling completion.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    fn insert(
        &mut self,
        name: &str,
        function: fn(&mut Runtime, Vec<Value>) -> Result<Value, RuntimeError>,
    ) {
        self.functions.insert(name.to_string(), Rc::new(function));
    }
}

fn expect_arity(
    runtime: &Runtime,
    name: &str,
    args: &[Value],
    expected: usize,
) -> Result<(), RuntimeError> {
    if args.len() < expected {
        return Err(runtime.error(RuntimeErrorKind::ArityMismatch {
            name: name.to_string(),
            expected,
            found: args.len(),
        }));
    }
    Ok(())
}

fn argument_error(runtime: &Runtime, name: &str, expected: &str, got: &Value) -> RuntimeError {
    runtime.error(RuntimeErrorKind::InvalidArgument {
        name: name.to_string(),
        expected: expected.to_string(),
        got: got.type_name().to_string(),
    })
}

fn echo(runtime: &mut Runtime, args: Vec<Value>) -> Result<Value, RuntimeError> {
    for arg in &args {
        let rendered = arg.render();
        runtime.write_output(&rendered);
    }
    Ok(Value::Nil)
}

fn echoln(runtime: &mut Runtime, args: Vec<Value>) -> Result<Value, RuntimeError> {
    echo(runtime, args)?;
    runtime.write_output("\n");
    Ok(Value::Nil)
}

fn len(runtime: &mut Runtime, args: Vec<Value>) -> Result<Value, RuntimeError> {
    expect_arity(runtime, "len", &args, 1)?;
    match &args[0] {
        Value::Str(value) => Ok(Value::Int(value.chars().count() as i64)),
        Value::List(items) => Ok(Value::Int(items.len() as i64)),
        Value::Map(entries) => Ok(Value::Int(entries.len() as i64)),
        other => Err(argument_error(runtime, "len", "string, list or dict", other)),
    }
}

fn type_of(runtime: &mut Runtime, args: Vec<Value>) -> Result<Value, RuntimeError> {
    expect_arity(runtime, "typeof", &args, 1)?;
    Ok(Value::Str(args[0].type_name().to_string()))
}

fn assert_true(runtime: &mut Runtime, args: Vec<Value>) -> Result<Value, RuntimeError> {
    expect_arity(runtime, "assert", &args, 1)?;
    match &args[0] {
        Value::Bool(true) => Ok(Value::Nil),
        Value::Bool(false) => Err(runtime.error(RuntimeErrorKind::AssertionFailed)),
        other => Err(argument_error(runtime, "assert", "bool", other)),
    }
}

fn to_str(runtime: &mut Runtime, args: Vec<Value>) -> Result<Value, RuntimeError> {
    expect_arity(runtime, "str", &args, 1)?;
    Ok(Value::Str(args[0].render()))
}

fn to_int(runtime: &mut Runtime, args: Vec<Value>) -> Result<Value, RuntimeError> {
    expect_arity(runtime, "int", &args, 1)?;
    match &args[0] {
        Value::Int(value) => Ok(Value::Int(*value)),
        Value::Float(value) => Ok(Value::Int(*value as i64)),
        Value::Str(value) => value
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| argument_error(runtime, "int", "numeric string", &args[0])),
        other => Err(argument_error(runtime, "int", "int, float or string", other)),
    }
}

fn now(_runtime: &mut Runtime, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Time(SystemTime::now()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> Runtime {
        Runtime::new(Registry::with_defaults())
    }

    #[test]
    fn defaults_cover_the_standard_names() {
        let registry = Registry::with_defaults();
        for name in ["echo", "echoln", "len", "typeof", "assert", "str", "int", "now"] {
            assert!(registry.contains(name), "missing builtin {name}");
        }
    }

    #[test]
    fn refuses_duplicate_registration() {
        let mut registry = Registry::with_defaults();
        let result = registry.register("echo", Rc::new(|_, _| Ok(Value::Nil)));
        assert!(result.is_err());
        assert!(registry
            .register("shout", Rc::new(|_, _| Ok(Value::Nil)))
            .is_ok());
    }

    #[test]
    fn echo_renders_without_separator_and_echoln_appends_newline() {
        let mut rt = runtime();
        echo(&mut rt, vec![Value::Str("n: ".to_string()), Value::Int(5)]).unwrap();
        assert_eq!(rt.output(), "n: 5");
        echoln(&mut rt, vec![Value::Str("!".to_string())]).unwrap();
        assert_eq!(rt.output(), "n: 5!\n");
    }

    #[test]
    fn len_counts_chars_elements_and_entries() {
        let mut rt = runtime();
        assert_eq!(
            len(&mut rt, vec![Value::Str("héllo".to_string())]).unwrap(),
            Value::Int(5)
        );
        assert_eq!(
            len(&mut rt, vec![Value::List(vec![Value::Int(1)])]).unwrap(),
            Value::Int(1)
        );
        assert!(len(&mut rt, vec![Value::Int(3)]).is_err());
    }

    #[test]
    fn typeof_names_the_runtime_type() {
        let mut rt = runtime();
        assert_eq!(
            type_of(&mut rt, vec![Value::List(Vec::new())]).unwrap(),
            Value::Str("list".to_string())
        );
    }

    #[test]
    fn assert_accepts_only_booleans() {
        let mut rt = runtime();
        assert_eq!(assert_true(&mut rt, vec![Value::Bool(true)]).unwrap(), Value::Nil);
        assert!(matches!(
            assert_true(&mut rt, vec![Value::Bool(false)]).unwrap_err().kind,
            RuntimeErrorKind::AssertionFailed
        ));
        assert!(assert_true(&mut rt, vec![Value::Int(1)]).is_err());
    }

    #[test]
    fn int_converts_and_rejects() {
        let mut rt = runtime();
        assert_eq!(
            to_int(&mut rt, vec![Value::Str(" 42 ".to_string())]).unwrap(),
            Value::Int(42)
        );
        assert_eq!(to_int(&mut rt, vec![Value::Float(3.9)]).unwrap(), Value::Int(3));
        assert!(to_int(&mut rt, vec![Value::Str("4x".to_string())]).is_err());
    }
}
