//=============================================
// krscript/interpreter/errors.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Unified error surface for the Kr pipeline
// Objective: Collapse lexer, parser, and interpreter failures into one coded
//            error value for drivers to render
//=============================================

use thiserror::Error;

use crate::parser::ParseError;
use crate::tokenizer::{LexError, Span};

use super::RuntimeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Syntax,
    TypeMismatch,
    InvalidOperation,
    RuntimePanic,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Syntax => "E001",
            ErrorCode::TypeMismatch => "E003",
            ErrorCode::InvalidOperation => "E004",
            ErrorCode::RuntimePanic => "E005",
        }
    }
}

/// Any pipeline failure: an error code, a rendered message, and the source
/// span where one exists.
#[derive(Debug, Clone, Error)]
#[error("[{}] {message}", .code.as_str())]
pub struct ScriptError {
    pub code: ErrorCode,
    pub message: String,
    pub span: Option<Span>,
}

impl ScriptError {
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            code,
            message: message.into(),
            span,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl From<LexError> for ScriptError {
    fn from(value: LexError) -> Self {
        let position = match &value {
            LexError::InvalidStringCharacter { position, .. }
            | LexError::UnterminatedString { position }
            | LexError::MalformedNumber { position, .. }
            | LexError::UnmatchedCommentTerminator { position } => *position,
        };
        ScriptError::new(
            ErrorCode::Syntax,
            value.to_string(),
            Some(Span::point(position)),
        )
    }
}

impl From<ParseError> for ScriptError {
    fn from(value: ParseError) -> Self {
        let position = match &value {
            ParseError::UnexpectedToken { position, .. }
            | ParseError::UnexpectedEndOfInput { position, .. }
            | ParseError::DuplicateModifier { position, .. }
            | ParseError::InvalidSyntax { position, .. } => *position,
        };
        ScriptError::new(
            ErrorCode::Syntax,
            value.to_string(),
            Some(Span::point(position)),
        )
    }
}

impl From<RuntimeError> for ScriptError {
    fn from(value: RuntimeError) -> Self {
        ScriptError::new(
            runtime_error_code(&value),
            value.to_string(),
            Some(value.span()),
        )
    }
}

pub fn runtime_error_code(error: &RuntimeError) -> ErrorCode {
    match error {
        RuntimeError::TypeError { .. } => ErrorCode::TypeMismatch,
        RuntimeError::UndefinedVariable { .. }
        | RuntimeError::UndefinedProperty { .. }
        | RuntimeError::UndefinedIndex { .. }
        | RuntimeError::NotCallable { .. }
        | RuntimeError::ArityMismatch { .. }
        | RuntimeError::NoMatchingConstructor { .. }
        | RuntimeError::InvalidAssignmentTarget { .. }
        | RuntimeError::MalformedEnumMember { .. } => ErrorCode::InvalidOperation,
        RuntimeError::ReadonlyField { .. }
        | RuntimeError::InaccessibleMember { .. }
        | RuntimeError::ControlFlowOutsideContext { .. } => ErrorCode::RuntimePanic,
    }
}

//=============================================
// End Of krscript/interpreter/errors.rs
//=============================================
