//=====================================================
// File: main.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: KrScript command line driver
// Objective: Read a Kr source file, run the tokenize/parse/interpret
//            pipeline, and render coded errors with their source position
//=====================================================

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use krscript::ast::Program;
use krscript::interpreter::{Interpreter, ScriptError};
use krscript::parser::Parser;
use krscript::tokenizer::{Token, Tokenizer};

#[derive(Debug, ClapParser)]
#[command(
    name = "krscript",
    about = "Executes Kr source (.kr) files.",
    version
)]
struct Args {
    /// Path to a Kr source (.kr) file.
    script: PathBuf,

    /// Serialize the token stream and parse tree to JSON files next to the
    /// script.
    #[arg(long)]
    debug: bool,

    /// Pretty-print the parsed AST before execution.
    #[arg(long)]
    print_ast: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    run_source_file(&args.script, args.debug, args.print_ast)
}

fn run_source_file(path: &Path, debug: bool, print_ast: bool) -> Result<()> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let tokens = Tokenizer::new(&source)
        .tokenize()
        .map_err(|err| render_error(path, ScriptError::from(err)))?;

    if debug {
        write_tokens_dump(path, &tokens)?;
    }

    let program = Parser::new(tokens)
        .parse()
        .map_err(|err| render_error(path, ScriptError::from(err)))?;

    if debug {
        write_parse_tree_dump(path, &program)?;
    }

    if print_ast {
        println!("{:#?}", program);
    }

    let mut interpreter = Interpreter::new();
    interpreter
        .interpret(&program.body)
        .map_err(|err| render_error(path, ScriptError::from(err)))?;

    Ok(())
}

/// One line per error: code, message, and source position when known.
fn render_error(path: &Path, error: ScriptError) -> anyhow::Error {
    match error.span {
        Some(span) => anyhow!(
            "{} --> {}:{}:{}",
            error,
            path.display(),
            span.start.line,
            span.start.column
        ),
        None => anyhow!("{}", error),
    }
}

fn sibling_artifact(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "script".to_string());
    path.with_file_name(format!("{}-{}.json", stem, suffix))
}

fn write_tokens_dump(path: &Path, tokens: &[Token]) -> Result<()> {
    let artifact = sibling_artifact(path, "tokens");
    let json = serde_json::to_string_pretty(tokens).context("failed to serialize tokens")?;
    fs::write(&artifact, json)
        .with_context(|| format!("failed to write {}", artifact.display()))?;
    Ok(())
}

fn write_parse_tree_dump(path: &Path, program: &Program) -> Result<()> {
    let artifact = sibling_artifact(path, "parseTree");
    let json = serde_json::to_string_pretty(program).context("failed to serialize parse tree")?;
    fs::write(&artifact, json)
        .with_context(|| format!("failed to write {}", artifact.display()))?;
    Ok(())
}

//=====================================================
// End of file
//=====================================================
