use thiserror::Error;

/// Error codes prefixed by phase: L = lexer, P = parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Lexer
    L001, // unexpected character
    L002, // malformed number literal

    // Parser
    P001, // unexpected token
    P002, // missing expected token
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L001 => "L001",
            Self::L002 => "L002",
            Self::P001 => "P001",
            Self::P002 => "P002",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A grammar mismatch. Parsing is fail-fast, so at most one is produced per input.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{code}] {line}:{column}: {message}")]
pub struct SyntaxError {
    pub code: ErrorCode,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(code: ErrorCode, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { code, line, column, message: message.into() }
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalErrorKind {
    #[error("unresolved identifier `{0}`")]
    UnresolvedIdentifier(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("operation `{op}` not supported for {left} and {right}")]
    OperationNotSupported {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("shape mismatch: `{op}` needs equal element counts, got {left} and {right}")]
    ShapeMismatch {
        op: &'static str,
        left: usize,
        right: usize,
    },

    #[error("property `{property}` not accessible on {target}")]
    PropertyNotAccessible {
        property: String,
        target: &'static str,
    },

    #[error("generate: {0}")]
    GenerateTypeError(String),

    #[error("`{name}` expects {expected} argument(s), got {got}")]
    ArityError {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("index {index} out of range for {len} element(s)")]
    IndexOutOfRange { index: f64, len: usize },

    #[error("call depth exceeded {0} nested calls")]
    RecursionLimit(usize),

    #[error("`{what}` would produce {requested} elements, the limit is {limit}")]
    TooManyElements {
        what: &'static str,
        requested: f64,
        limit: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[runtime] line {line}: {kind}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub line: usize,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, line: usize) -> Self {
        Self { kind, line }
    }

    pub fn type_mismatch(line: usize, msg: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::TypeMismatch(msg.into()), line)
    }

    pub fn arity(line: usize, name: impl Into<String>, expected: impl Into<String>, got: usize) -> Self {
        Self::new(
            EvalErrorKind::ArityError { name: name.into(), expected: expected.into(), got },
            line,
        )
    }
}

/// Anything `evaluate` can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("syntax error {0}")]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}
