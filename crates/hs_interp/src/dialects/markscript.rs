//! MarkScript: the literate dialect. A document is prose; `#` headers
//! name sections (lowered to labels), and fenced code blocks whose
//! info string is tagged `execute` hold NovaSec statement lists. All
//! other fences and every prose line are ignored.

use hs_ast::ast::Stmt;
use hs_ast::diagnostic::Diagnostic;
use hs_ast::{Span, Spanned};
use hs_sim::GameState;

use super::{novasec, render_runtime, render_syntax};
use crate::exec::{exec_stmts, Env, Vars};
use crate::RuntimeError;

pub struct MarkScript {
    vars: Vars,
}

impl MarkScript {
    pub fn new() -> Self {
        Self { vars: Vars::new() }
    }

    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    pub fn run(
        &mut self,
        source: &str,
        state: &mut GameState,
        output: &mut Vec<String>,
    ) -> Result<(), String> {
        let items = parse(source).map_err(|d| render_syntax(source, &d))?;

        for item in items {
            match item {
                Item::Section(label) => {
                    // Section headers lower to labels, which execute as
                    // no-ops; they keep document structure visible in
                    // the statement stream.
                    let mut env = Env {
                        vars: &mut self.vars,
                        state,
                        output,
                    };
                    let stmt = Spanned::new(Stmt::Label(label), Span::dummy());
                    exec_stmts(&mut env, &[stmt]).map_err(|e| render_runtime(source, &e))?;
                }
                Item::Block { base, stmts } => {
                    let mut env = Env {
                        vars: &mut self.vars,
                        state,
                        output,
                    };
                    exec_stmts(&mut env, &stmts).map_err(|e| {
                        let err = RuntimeError {
                            message: e.message,
                            span: e.span.map(|s| offset_span(s, base)),
                        };
                        render_runtime(source, &err)
                    })?;
                }
            }
        }
        Ok(())
    }
}

impl Default for MarkScript {
    fn default() -> Self {
        Self::new()
    }
}

fn offset_span(span: Span, base: usize) -> Span {
    if span.is_dummy() {
        span
    } else {
        Span::new(span.start + base, span.end + base)
    }
}

// ── Document scanning ───────────────────────────────────────────

enum Item {
    Section(String),
    Block {
        /// Byte offset of the block body in the full document.
        base: usize,
        stmts: Vec<Spanned<Stmt>>,
    },
}

fn parse(source: &str) -> Result<Vec<Item>, Diagnostic> {
    let mut items = Vec::new();
    let mut offset = 0;

    let mut fence: Option<(bool, usize, usize)> = None; // (execute, open_pos, body_start)
    let mut body_end = 0;

    for raw in source.split('\n') {
        let line_start = offset;
        offset += raw.len() + 1;
        let trimmed = raw.trim();

        if let Some((execute, _, body_start)) = fence {
            if trimmed.starts_with("```") {
                if execute {
                    let body = &source[body_start..body_end];
                    let stmts = novasec::parse(body)
                        .map_err(|d| Diagnostic::error(d.message, offset_span(d.span, body_start)))?;
                    if !stmts.is_empty() {
                        items.push(Item::Block {
                            base: body_start,
                            stmts,
                        });
                    }
                }
                fence = None;
            } else {
                body_end = line_start + raw.len();
            }
            continue;
        }

        if let Some(info) = trimmed.strip_prefix("```") {
            let execute = info
                .split_whitespace()
                .any(|tag| tag.eq_ignore_ascii_case("execute"));
            fence = Some((execute, line_start, offset.min(source.len())));
            body_end = offset.min(source.len());
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('#') {
            let name = header.trim_start_matches('#').trim();
            if !name.is_empty() {
                items.push(Item::Section(name.to_string()));
            }
        }
        // Everything else is prose.
    }

    if let Some((_, open_pos, _)) = fence {
        return Err(Diagnostic::error(
            "unterminated code fence",
            Span::new(open_pos, open_pos + 3),
        ));
    }

    Ok(items)
}
