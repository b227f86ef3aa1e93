// Class declarations: fields, methods, constructors, statics, accessibility,
// readonly enforcement, and single inheritance with super dispatch.

use crate::interpreter::RuntimeError;
use crate::runtime::{run_kr_source, run_kr_source_expect_runtime_error};

#[test]
fn fields_initialize_and_methods_see_this() {
    let output = run_kr_source(
        "class Counter {\n\
           count = 0;\n\
           increment() {\n\
             this.count = this.count + 1;\n\
             return this.count;\n\
           }\n\
         }\n\
         let c = new Counter();\n\
         print(c.increment());\n\
         print(c.increment());\n\
         print(c.count);",
    );
    assert_eq!(output, vec!["1", "2", "2"]);
}

#[test]
fn constructor_runs_on_new() {
    let output = run_kr_source(
        "class Point {\n\
           x = 0;\n\
           y = 0;\n\
           constructor(x, y) {\n\
             this.x = x;\n\
             this.y = y;\n\
           }\n\
         }\n\
         let p = new Point(3, 4);\n\
         print(p.x + p.y);",
    );
    assert_eq!(output, vec!["7"]);
}

#[test]
fn constructors_overload_by_arity() {
    let output = run_kr_source(
        "class Vec {\n\
           x = 0;\n\
           y = 0;\n\
           constructor() {\n\
             this.x = 1;\n\
             this.y = 1;\n\
           }\n\
           constructor(x, y) {\n\
             this.x = x;\n\
             this.y = y;\n\
           }\n\
         }\n\
         let unit = new Vec();\n\
         let v = new Vec(3, 4);\n\
         print(unit.x + unit.y);\n\
         print(v.x + v.y);",
    );
    assert_eq!(output, vec!["2", "7"]);
}

#[test]
fn missing_constructor_arity_is_an_error() {
    let err = run_kr_source_expect_runtime_error(
        "class Vec {\n\
           constructor(x, y) { this.x = x; this.y = y; }\n\
         }\n\
         new Vec(1);",
    );
    match err {
        RuntimeError::NoMatchingConstructor { found, arities, .. } => {
            assert_eq!(found, 1);
            assert_eq!(arities, vec![2]);
        }
        other => panic!("expected NoMatchingConstructor, got {other:?}"),
    }
}

#[test]
fn static_members_live_on_the_class() {
    let output = run_kr_source(
        "class MathUtil {\n\
           static base = 10;\n\
           static twice(n) { return n * 2; }\n\
         }\n\
         print(MathUtil.base);\n\
         print(MathUtil.twice(4));\n\
         MathUtil.base = 20;\n\
         print(MathUtil.base);",
    );
    assert_eq!(output, vec!["10", "8", "20"]);
}

#[test]
fn readonly_fields_reject_writes_after_construction() {
    let output = run_kr_source(
        "class Config {\n\
           readonly limit = 0;\n\
           constructor(limit) { this.limit = limit; }\n\
         }\n\
         let c = new Config(9);\n\
         print(c.limit);",
    );
    assert_eq!(output, vec!["9"]);

    let err = run_kr_source_expect_runtime_error(
        "class Config {\n\
           readonly limit = 0;\n\
           constructor(limit) { this.limit = limit; }\n\
         }\n\
         let c = new Config(9);\n\
         c.limit = 10;",
    );
    assert!(matches!(err, RuntimeError::ReadonlyField { .. }));
}

#[test]
fn private_members_are_only_reachable_through_this() {
    let output = run_kr_source(
        "class Safe {\n\
           private secret = 42;\n\
           reveal() { return this.secret; }\n\
         }\n\
         let s = new Safe();\n\
         print(s.reveal());",
    );
    assert_eq!(output, vec!["42"]);

    let err = run_kr_source_expect_runtime_error(
        "class Safe {\n\
           private secret = 42;\n\
         }\n\
         let s = new Safe();\n\
         print(s.secret);",
    );
    assert!(matches!(err, RuntimeError::InaccessibleMember { .. }));
}

#[test]
fn methods_dispatch_dynamically_through_this() {
    let output = run_kr_source(
        "class Animal {\n\
           name = 'creature';\n\
           speak() { return 'some sound'; }\n\
           describe() { return this.name + ' says ' + this.speak(); }\n\
         }\n\
         class Dog extends Animal {\n\
           speak() { return 'woof'; }\n\
         }\n\
         let d = new Dog();\n\
         print(d.describe());",
    );
    assert_eq!(output, vec!["creature says woof"]);
}

#[test]
fn super_calls_the_parent_method() {
    let output = run_kr_source(
        "class Base {\n\
           greet() { return 'hello'; }\n\
         }\n\
         class Child extends Base {\n\
           greet() { return super.greet() + ' child'; }\n\
         }\n\
         let c = new Child();\n\
         print(c.greet());",
    );
    assert_eq!(output, vec!["hello child"]);
}

#[test]
fn subclasses_inherit_fields_and_methods() {
    let output = run_kr_source(
        "class Shape {\n\
           name = 'shape';\n\
           area() { return 0; }\n\
           describe() { return this.name + ' with area ' + this.area(); }\n\
         }\n\
         class Square extends Shape {\n\
           side = 0;\n\
           constructor(side) {\n\
             this.name = 'square';\n\
             this.side = side;\n\
           }\n\
           area() { return this.side * this.side; }\n\
         }\n\
         let s = new Square(4);\n\
         print(s.describe());",
    );
    assert_eq!(output, vec!["square with area 16"]);
}

#[test]
fn extending_a_non_class_is_an_error() {
    let err = run_kr_source_expect_runtime_error(
        "let notAClass = 4;\n\
         class Broken extends notAClass {\n\
           method() { return 0; }\n\
         }",
    );
    assert!(matches!(err, RuntimeError::TypeError { .. }));
}

#[test]
fn instances_are_shared_by_reference() {
    let output = run_kr_source(
        "class Box {\n\
           value = 0;\n\
         }\n\
         let a = new Box();\n\
         let b = a;\n\
         b.value = 5;\n\
         print(a.value);\n\
         print(a == b);",
    );
    assert_eq!(output, vec!["5", "true"]);
}

#[test]
fn new_on_a_non_class_is_an_error() {
    let err = run_kr_source_expect_runtime_error("let f = 1;\nnew f();");
    assert!(matches!(err, RuntimeError::TypeError { .. }));
}
