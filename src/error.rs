//! Error taxonomy: lexical, syntactic, and semantic/runtime errors.
//!
//! One `thiserror`-derived enum per phase: a flat enum, one `#[error("...")]` format string per
//! variant, and small constructor helpers for variants with more than one field.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexError {
    #[error("Unexpected character '{ch}' at line {line}, column {col}")]
    Unexpected { ch: char, line: usize, col: usize },

    #[error("Indentation error at line {line}")]
    Indentation { line: usize },
}

impl LexError {
    pub fn unexpected(ch: char, line: usize, col: usize) -> Self {
        LexError::Unexpected { ch, line, col }
    }

    pub fn indentation(line: usize) -> Self {
        LexError::Indentation { line }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("Syntax error: {message} at line {line}, column {col}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, col: usize) -> Self {
        ParseError {
            message: message.into(),
            line,
            col,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("Type mismatch: '{name}' declared as {declared}, cannot assign value of type {actual}")]
    TypeMismatch {
        name: String,
        declared: String,
        actual: String,
    },

    #[error("Variable '{0}' used before declaration. Use DECLARE to declare variables first.")]
    UndeclaredVariable(String),

    #[error("Cannot modify constant '{0}'")]
    ConstantReassignment(String),

    #[error("Undefined type '{0}'")]
    UnknownType(String),

    #[error("Undefined routine '{0}'")]
    UnknownRoutine(String),

    #[error("'{name}' expects {expected} argument(s), got {got}")]
    ArgArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("BYREF parameter '{0}' must be bound to a variable, array element, or field")]
    ByRefRequiresVariable(String),

    #[error("Index {index} out of bounds [{lo}:{hi}] for '{name}'")]
    IndexOutOfBounds {
        name: String,
        index: i64,
        lo: i64,
        hi: i64,
    },

    #[error("Record '{name}' has no field '{field}'")]
    UnknownField { name: String, field: String },

    #[error("Division by zero")]
    ZeroDivision,

    #[error("Cannot convert value to requested type: {0}")]
    ValueConversion(String),

    #[error("Function '{0}' did not return a value")]
    MissingReturn(String),

    #[error("File '{0}' is not open")]
    FileNotOpen(String),

    #[error("File '{0}' is already open")]
    FileAlreadyOpen(String),

    #[error("File '{name}' is not open for {expected}")]
    FileModeMismatch { name: String, expected: &'static str },

    #[error("I/O error on file '{name}': {message}")]
    IoError { name: String, message: String },

    #[error("{name}: {message}")]
    BuiltinError { name: String, message: String },
}

impl EvalError {
    pub fn type_mismatch(
        name: impl Into<String>,
        declared: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        EvalError::TypeMismatch {
            name: name.into(),
            declared: declared.into(),
            actual: actual.into(),
        }
    }

    pub fn arg_arity(name: impl Into<String>, expected: usize, got: usize) -> Self {
        EvalError::ArgArityMismatch {
            name: name.into(),
            expected,
            got,
        }
    }

    pub fn index_out_of_bounds(name: impl Into<String>, index: i64, lo: i64, hi: i64) -> Self {
        EvalError::IndexOutOfBounds {
            name: name.into(),
            index,
            lo,
            hi,
        }
    }

    pub fn unknown_field(name: impl Into<String>, field: impl Into<String>) -> Self {
        EvalError::UnknownField {
            name: name.into(),
            field: field.into(),
        }
    }

    pub fn file_mode_mismatch(name: impl Into<String>, expected: &'static str) -> Self {
        EvalError::FileModeMismatch {
            name: name.into(),
            expected,
        }
    }

    pub fn io_error(name: impl Into<String>, message: impl Into<String>) -> Self {
        EvalError::IoError {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn builtin(name: impl Into<String>, message: impl Into<String>) -> Self {
        EvalError::BuiltinError {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Crate-level error unifying the three phases for the `parse`/`run` public contract.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}
