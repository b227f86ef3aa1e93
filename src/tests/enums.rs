// Enum declarations: auto-increment numbering and member access.

use crate::interpreter::RuntimeError;
use crate::runtime::{run_kr_source, run_kr_source_expect_runtime_error};

#[test]
fn members_auto_increment_from_zero() {
    let output = run_kr_source(
        "enum Direction { North, East, South, West }\n\
         print(Direction.North);\n\
         print(Direction.East);\n\
         print(Direction.West);",
    );
    assert_eq!(output, vec!["0", "1", "3"]);
}

#[test]
fn explicit_values_reset_the_counter() {
    let output = run_kr_source(
        "enum E { A, B, C = 5, D }\n\
         print(E.A);\n\
         print(E.B);\n\
         print(E.C);\n\
         print(E.D);",
    );
    assert_eq!(output, vec!["0", "1", "5", "6"]);
}

#[test]
fn string_members_leave_the_counter_untouched() {
    let output = run_kr_source(
        "enum Status { Ok = 'ready', Retry, Failed }\n\
         print(Status.Ok);\n\
         print(Status.Retry);\n\
         print(Status.Failed);",
    );
    assert_eq!(output, vec!["ready", "0", "1"]);
}

#[test]
fn member_access_by_bracket_key() {
    let output = run_kr_source(
        "enum E { A, B }\n\
         print(E['B']);",
    );
    assert_eq!(output, vec!["1"]);
}

#[test]
fn unknown_member_is_an_error_with_container_context() {
    let err = run_kr_source_expect_runtime_error("enum E { A }\nprint(E.Missing);");
    assert!(matches!(err, RuntimeError::UndefinedProperty { .. }));
    assert!(err.to_string().contains("Missing"));
}

#[test]
fn non_literal_member_values_are_rejected() {
    let err = run_kr_source_expect_runtime_error("enum E { A = [1, 2] }");
    assert!(matches!(err, RuntimeError::MalformedEnumMember { .. }));
}

#[test]
fn enums_are_shared_by_reference() {
    let output = run_kr_source(
        "enum E { A }\n\
         let alias = E;\n\
         print(alias == E);\n\
         print(alias.A);",
    );
    assert_eq!(output, vec!["true", "0"]);
}
