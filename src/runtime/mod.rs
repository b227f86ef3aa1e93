//==============================================
// File: runtime.rs
//==============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Shared runtime helpers for KrScript tests
// Objective: Run Kr sources through the full pipeline with captured output
//            and consistent assertions
//==============================================

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use crate::interpreter::{Interpreter, RuntimeError, ScriptError};
use crate::parser::Parser;
use crate::tokenizer::Tokenizer;

//==============================================
// Section 1.0 - Kr Test Harness
//==============================================

/// Run Kr source text through tokenize → parse → interpret and return
/// everything `print` produced. Panics on any pipeline failure.
pub fn run_kr_source(source: &str) -> Vec<String> {
    try_run_kr_source(source).unwrap_or_else(|err| panic!("script failed: {}", err))
}

/// Same as [`run_kr_source`] but surfaces the failure for error-path tests.
pub fn try_run_kr_source(source: &str) -> Result<Vec<String>, ScriptError> {
    let tokens = Tokenizer::new(source).tokenize()?;
    let program = Parser::new(tokens).parse()?;

    let sink = Rc::new(RefCell::new(Vec::new()));
    let mut interpreter = Interpreter::with_output(Rc::clone(&sink));
    interpreter.interpret(&program.body)?;

    let output = sink.borrow().clone();
    Ok(output)
}

/// Run the pipeline expecting an interpreter failure; panics if the script
/// lexes/parses incorrectly or runs to completion.
pub fn run_kr_source_expect_runtime_error(source: &str) -> RuntimeError {
    let tokens = Tokenizer::new(source)
        .tokenize()
        .unwrap_or_else(|err| panic!("tokenize failed: {}", err));
    let program = Parser::new(tokens)
        .parse()
        .unwrap_or_else(|err| panic!("parse failed: {}", err));

    let sink = Rc::new(RefCell::new(Vec::new()));
    let mut interpreter = Interpreter::with_output(sink);
    match interpreter.interpret(&program.body) {
        Ok(()) => panic!("expected a runtime error, script completed"),
        Err(err) => err,
    }
}

/// Run a `.kr` fixture relative to the crate root.
pub fn run_kr_fixture(relative_path: &str) -> Vec<String> {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let script_path = manifest_dir.join(relative_path);
    let source = fs::read_to_string(&script_path)
        .unwrap_or_else(|err| panic!("read {} failed: {}", script_path.display(), err));
    run_kr_source(&source)
}

//==============================================
// End of file
//==============================================
