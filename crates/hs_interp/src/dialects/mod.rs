//! The six dialect front-ends. Each one owns its persistent variable
//! table and lowers source text into the shared statement vocabulary
//! (or, for the assembly dialect, its own instruction stream), then
//! drives the shared executor.

pub mod asm;
pub mod cppsharp;
pub mod markscript;
pub mod netscript;
pub mod novasec;
mod parser;
pub mod shellscript;

use hs_ast::diagnostic::{Diagnostic, SourceMap};

use crate::RuntimeError;

/// Render a syntax diagnostic against its source (rustc-style caret).
pub(crate) fn render_syntax(source: &str, diag: &Diagnostic) -> String {
    SourceMap::new(source).render(diag)
}

/// Render a runtime error, locating it in the source when it carries
/// a span.
pub(crate) fn render_runtime(source: &str, err: &RuntimeError) -> String {
    match err.span {
        Some(span) if !span.is_dummy() => {
            let (line, col) = SourceMap::new(source).line_col(span.start);
            format!("runtime error at line {}:{}: {}", line, col, err.message)
        }
        _ => format!("runtime error: {}", err.message),
    }
}
