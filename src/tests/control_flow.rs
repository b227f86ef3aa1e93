// Branching and the three loop forms, plus control-transfer signals.

use crate::interpreter::RuntimeError;
use crate::runtime::{run_kr_source, run_kr_source_expect_runtime_error};

#[test]
fn if_else_if_chain_picks_the_first_truthy_branch() {
    let output = run_kr_source(
        "let n = 15;\n\
         if (n < 10) { print('small'); }\n\
         else if (n < 20) { print('medium'); }\n\
         else { print('large'); }",
    );
    assert_eq!(output, vec!["medium"]);
}

#[test]
fn classic_for_counts_with_increment() {
    let output = run_kr_source("for (let i = 0; i < 3; i++) { print(i); }");
    assert_eq!(output, vec!["0", "1", "2"]);
}

#[test]
fn classic_for_accepts_an_expression_initializer() {
    let output = run_kr_source("let i = 0;\nfor (i = 5; i > 3; i--) { print(i); }");
    assert_eq!(output, vec!["5", "4"]);
}

#[test]
fn for_of_iterates_arrays() {
    let output = run_kr_source("for (let item of [10, 20, 30]) { print(item); }");
    assert_eq!(output, vec!["10", "20", "30"]);
}

#[test]
fn for_of_iterates_strings_by_character() {
    let output = run_kr_source("for (let ch of 'abc') { print(ch); }");
    assert_eq!(output, vec!["a", "b", "c"]);
}

#[test]
fn for_of_iterates_ranges() {
    let output = run_kr_source("for (let i of [1..5]) { print(i); }");
    assert_eq!(output, vec!["1", "2", "3", "4"]);
}

#[test]
fn stepped_range_skips_values() {
    let output = run_kr_source("for (let i of [0..3..10]) { print(i); }");
    assert_eq!(output, vec!["0", "3", "6", "9"]);
}

#[test]
fn descending_range_counts_down() {
    let output = run_kr_source("for (let i of [3..0-1..0]) { print(i); }");
    assert_eq!(output, vec!["3", "2", "1"]);
}

#[test]
fn for_in_iterates_object_keys_in_insertion_order() {
    let output = run_kr_source(
        "let scores = {alice: 3, bob: 7};\n\
         for (let name in scores) { print(name + ' ' + scores[name]); }",
    );
    assert_eq!(output, vec!["alice 3", "bob 7"]);
}

#[test]
fn for_in_iterates_enum_members() {
    let output = run_kr_source(
        "enum Color { Red, Green, Blue }\n\
         for (let name in Color) { print(name); }",
    );
    assert_eq!(output, vec!["Red", "Green", "Blue"]);
}

#[test]
fn break_and_continue_steer_loops() {
    let output = run_kr_source(
        "for (let i = 0; i < 5; i++) {\n\
           if (i == 2) { continue; }\n\
           if (i == 4) { break; }\n\
           print(i);\n\
         }",
    );
    assert_eq!(output, vec!["0", "1", "3"]);
}

#[test]
fn return_unwinds_through_nested_loops_to_the_call_frame() {
    let output = run_kr_source(
        "function firstEven(items) {\n\
           for (let item of items) {\n\
             if (item % 2 == 0) { return item; }\n\
           }\n\
           return null;\n\
         }\n\
         print(firstEven([3, 5, 8, 9]));\n\
         print(firstEven([1, 3]));",
    );
    assert_eq!(output, vec!["8", "null"]);
}

#[test]
fn top_level_return_is_an_error() {
    let err = run_kr_source_expect_runtime_error("return 5;");
    assert!(matches!(
        err,
        RuntimeError::ControlFlowOutsideContext {
            keyword: "return",
            ..
        }
    ));
}

#[test]
fn top_level_break_is_an_error() {
    let err = run_kr_source_expect_runtime_error("break;");
    assert!(matches!(
        err,
        RuntimeError::ControlFlowOutsideContext { keyword: "break", .. }
    ));
}

#[test]
fn for_in_rejects_arrays() {
    let err = run_kr_source_expect_runtime_error("for (let k in [1, 2]) { print(k); }");
    assert!(matches!(err, RuntimeError::TypeError { .. }));
}

#[test]
fn for_of_rejects_objects() {
    let err = run_kr_source_expect_runtime_error("for (let v of {a: 1}) { print(v); }");
    assert!(matches!(err, RuntimeError::TypeError { .. }));
}
