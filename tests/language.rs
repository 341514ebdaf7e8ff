use std::rc::Rc;

use indoc::indoc;

use rill::{Parser, Registry, Runtime, RuntimeErrorKind, Value};

fn run(source: &str) -> (Value, String) {
    run_with(source, Registry::with_defaults())
}

fn run_with(source: &str, registry: Registry) -> (Value, String) {
    let block = Parser::new(source).parse().expect("parse failed");
    let mut runtime = Runtime::new(registry);
    let value = runtime.run(&block).expect("run failed");
    (value, runtime.take_output())
}

fn run_file(path: &str) -> (Value, String) {
    let source = std::fs::read_to_string(path).expect("missing script");
    let block = Parser::with_file(&source, path).parse().expect("parse failed");
    let mut runtime = Runtime::new(Registry::with_defaults());
    let value = runtime.run(&block).expect("run failed");
    (value, runtime.take_output())
}

#[test]
fn computes_fibonacci_recursively() {
    let (value, _) = run(indoc! {"
        fib(n) {
            if n < 2 {
                return n
            } else {
                return fib(n - 2) + fib(n - 1)
            }
        }
        return fib(10)
    "});
    assert_eq!(value, Value::Int(55));
}

#[test]
fn runs_the_fib_demo() {
    let (value, output) = run_file("demos/fib.rill");
    assert_eq!(value, Value::Nil);
    assert_eq!(output, "fib(10) = 55\n");
}

#[test]
fn import_expression_yields_a_module_dict() {
    let (value, output) = run_file("demos/app.rill");
    assert_eq!(value, Value::Int(5));
    assert_eq!(output, "hello\n");
}

#[test]
fn import_statement_merges_into_scope() {
    let (value, output) = run_file("demos/merge.rill");
    assert_eq!(value, Value::Int(42));
    assert_eq!(output, "hello\n");
}

#[test]
fn scripts_build_and_query_nested_data() {
    let (value, output) = run(indoc! {"
        config = {
            name = 'svc'
            ports = [80, 443]
            limits = {
                cpu = 2
            }
        }
        echoln(config.name, ' cpu=', config.limits.cpu)
        assert(443 in config.ports)
        assert(8080 not in config.ports)
        return len(config)
    "});
    assert_eq!(output, "svc cpu=2\n");
    assert_eq!(value, Value::Int(3));
}

#[test]
fn builtin_conversions_compose() {
    let (value, _) = run(indoc! {"
        n = int('41')
        s = str(n + 1)
        assert(typeof(s) == 'string')
        return s
    "});
    assert_eq!(value, Value::Str("42".to_string()));
}

#[test]
fn hosts_can_register_native_functions() {
    let mut registry = Registry::with_defaults();
    registry
        .register(
            "double",
            Rc::new(|runtime, args| match args.first() {
                Some(Value::Int(n)) => Ok(Value::Int(n * 2)),
                _ => Err(runtime.error(RuntimeErrorKind::InvalidArgument {
                    name: "double".to_string(),
                    expected: "int".to_string(),
                    got: args
                        .first()
                        .map(|v| v.type_name().to_string())
                        .unwrap_or_else(|| "nothing".to_string()),
                })),
            }),
        )
        .expect("register failed");
    let (value, _) = run_with("return double(21)", registry);
    assert_eq!(value, Value::Int(42));
}

#[test]
fn builtins_win_over_user_definitions() {
    let mut registry = Registry::with_defaults();
    registry
        .register("answer", Rc::new(|_, _| Ok(Value::Int(42))))
        .expect("register failed");
    let (value, _) = run_with(
        indoc! {"
            answer() {
                return 1
            }
            return answer()
        "},
        registry,
    );
    assert_eq!(value, Value::Int(42));
}

#[test]
fn runtime_errors_carry_script_positions() {
    let source = "a = 1\nb = a + 'x'\n";
    let block = Parser::with_file(source, "bad.rill").parse().expect("parse failed");
    let mut runtime = Runtime::new(Registry::with_defaults());
    let error = runtime.run(&block).expect_err("expected error");
    let message = error.to_string();
    assert!(message.starts_with("bad.rill:2:"), "got {message}");
    assert!(matches!(
        error.kind,
        RuntimeErrorKind::UnsupportedOperands { .. }
    ));
}

#[test]
fn assertion_failures_stop_the_script() {
    let block = Parser::new("assert(1 == 2)\necho('unreached')\n")
        .parse()
        .expect("parse failed");
    let mut runtime = Runtime::new(Registry::with_defaults());
    let error = runtime.run(&block).expect_err("expected error");
    assert!(matches!(error.kind, RuntimeErrorKind::AssertionFailed));
    assert_eq!(runtime.output(), "");
}

#[test]
fn quoted_and_dynamic_keys_read_the_same_entry() {
    let (value, _) = run(indoc! {"
        head = {
            'Content-Type' = 'text/plain'
        }
        key = 'Content-Type'
        assert(head['Content-Type'] == head[key])
        return head[key]
    "});
    assert_eq!(value, Value::Str("text/plain".to_string()));
}

#[test]
fn field_methods_dispatch_with_this() {
    let (value, output) = run(indoc! {"
        counter = {
            start = 10
            describe() {
                echoln('start=', start)
                return this.start + 1
            }
        }
        return counter.describe()
    "});
    assert_eq!(output, "start=10\n");
    assert_eq!(value, Value::Int(11));
}

#[test]
fn loops_compose_with_list_operators() {
    let (value, _) = run(indoc! {"
        seen = []
        values = [1, 2, 2, 3, 1]
        for i, v in values {
            seen = seen + [v]
        }
        return seen
    "});
    assert_eq!(
        value,
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
}

#[test]
fn formatting_matches_evaluation() {
    // A formatted program must evaluate identically to the original.
    let source = "f(n){\nreturn n+1\n}\nreturn f(2*3+4)\n";
    let formatted = rill::format_source(source, "").expect("format failed");
    let (original, _) = run(source);
    let (reformatted, _) = run(&formatted);
    assert_eq!(original, reformatted);
    assert_eq!(original, Value::Int(15));
}
