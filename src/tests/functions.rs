// Function declarations, closures, arity checking, and the print native.

use crate::interpreter::RuntimeError;
use crate::runtime::{run_kr_source, run_kr_source_expect_runtime_error};

#[test]
fn closures_see_later_mutation_of_captured_variables() {
    let output = run_kr_source(
        "let x = 1;\n\
         function f() { return x; }\n\
         x = 2;\n\
         print(f());",
    );
    assert_eq!(output, vec!["2"]);
}

#[test]
fn closures_capture_their_defining_environment() {
    let output = run_kr_source(
        "function makeCounter() {\n\
           let count = 0;\n\
           function tick() {\n\
             count = count + 1;\n\
             return count;\n\
           }\n\
           return tick;\n\
         }\n\
         let counter = makeCounter();\n\
         print(counter());\n\
         print(counter());\n\
         print(counter());",
    );
    assert_eq!(output, vec!["1", "2", "3"]);
}

#[test]
fn two_counters_do_not_share_state() {
    let output = run_kr_source(
        "function makeCounter() {\n\
           let count = 0;\n\
           function tick() {\n\
             count = count + 1;\n\
             return count;\n\
           }\n\
           return tick;\n\
         }\n\
         let a = makeCounter();\n\
         let b = makeCounter();\n\
         print(a());\n\
         print(a());\n\
         print(b());",
    );
    assert_eq!(output, vec!["1", "2", "1"]);
}

#[test]
fn recursion_works_through_the_binding() {
    let output = run_kr_source(
        "function fib(n: integer): integer {\n\
           if (n < 2) { return n; }\n\
           return fib(n - 1) + fib(n - 2);\n\
         }\n\
         print(fib(10));",
    );
    assert_eq!(output, vec!["55"]);
}

#[test]
fn arity_must_match_exactly() {
    let source = "function add(a, b) { return a + b; }\nadd(1);";
    let err = run_kr_source_expect_runtime_error(source);
    match err {
        RuntimeError::ArityMismatch { expected, found, .. } => {
            assert_eq!(expected, 2);
            assert_eq!(found, 1);
        }
        other => panic!("expected ArityMismatch, got {other:?}"),
    }
    assert!(
        run_kr_source_expect_runtime_error(
            "function add(a, b) { return a + b; }\nadd(1, 2, 3);"
        )
        .to_string()
        .contains("Expected 2 arguments")
    );
}

#[test]
fn a_body_without_return_yields_null() {
    let output = run_kr_source(
        "function log(x) { print(x); }\n\
         print(log('side effect'));",
    );
    assert_eq!(output, vec!["side effect", "null"]);
}

#[test]
fn arguments_evaluate_left_to_right() {
    let output = run_kr_source(
        "function pair(a, b) { return a + b; }\n\
         let trace = '';\n\
         function tag(label) {\n\
           trace = trace + label;\n\
           return label;\n\
         }\n\
         pair(tag('x'), tag('y'));\n\
         print(trace);",
    );
    assert_eq!(output, vec!["xy"]);
}

#[test]
fn calling_a_number_is_an_error() {
    let err = run_kr_source_expect_runtime_error("let n = 4;\nn(1);");
    assert!(matches!(err, RuntimeError::NotCallable { .. }));
}

#[test]
fn print_takes_exactly_one_argument() {
    let err = run_kr_source_expect_runtime_error("print('a', 'b');");
    assert!(matches!(
        err,
        RuntimeError::ArityMismatch { expected: 1, found: 2, .. }
    ));
}

#[test]
fn functions_are_first_class_values() {
    let output = run_kr_source(
        "function double(n) { return n * 2; }\n\
         let apply = {op: double};\n\
         print(apply.op(21));",
    );
    assert_eq!(output, vec!["42"]);
}
