pub mod builtins;
pub mod dialects;
pub mod engine;
pub mod exec;
pub mod value;

use hs_ast::Span;

pub use engine::Engine;
pub use value::Value;

// ── RuntimeError ───────────────────────────────────────────────

/// A runtime error produced during statement execution: wrong argument
/// count or type, unknown function or variable, unmet preconditions
/// (not connected), arithmetic faults, or a tripped loop ceiling.
///
/// Syntax problems never reach this type — the front-ends report those
/// before execution starts. Simulated-action failures (wrong payload,
/// insufficient skill) are not errors at all: they surface through the
/// builtin's own success flag.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub message: String,
    pub span: Option<Span>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        RuntimeError {
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(message: impl Into<String>, span: Span) -> Self {
        RuntimeError {
            message: message.into(),
            span: Some(span),
        }
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RuntimeError {}
