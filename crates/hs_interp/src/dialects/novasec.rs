//! NovaSec: the Python-like dialect. Line structured, `#` comments,
//! indentation-delimited blocks, `if`/`else`, `while`, and
//! `for x in range(a[, b[, c]])`.

use hs_ast::ast::{AssignOp, RangeSpec, Stmt};
use hs_ast::diagnostic::Diagnostic;
use hs_ast::{Span, Spanned};
use hs_lexer::{LexOptions, Lexer, Token, TokenKind};
use hs_sim::GameState;

use super::parser::{offset_spans, TokenParser};
use super::{render_runtime, render_syntax};
use crate::exec::{exec_stmts, Env, Vars};

pub struct NovaSec {
    vars: Vars,
}

impl NovaSec {
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
        let stmts = parse(source).map_err(|d| render_syntax(source, &d))?;
        let mut env = Env {
            vars: &mut self.vars,
            state,
            output,
        };
        exec_stmts(&mut env, &stmts).map_err(|e| render_runtime(source, &e))
    }
}

impl Default for NovaSec {
    fn default() -> Self {
        Self::new()
    }
}

// ── Line scanning ───────────────────────────────────────────────

struct Line {
    indent: usize,
    /// Byte offset of the first non-whitespace character.
    start: usize,
    tokens: Vec<Token>,
}

fn scan_lines(source: &str) -> Result<Vec<Line>, Diagnostic> {
    let mut lines = Vec::new();
    let mut offset = 0;

    for raw in source.split('\n') {
        let line_start = offset;
        offset += raw.len() + 1;

        let mut indent = 0;
        let mut ws_bytes = 0;
        for ch in raw.chars() {
            match ch {
                ' ' => indent += 1,
                '\t' => indent += 4,
                _ => break,
            }
            ws_bytes += ch.len_utf8();
        }
        let content = &raw[ws_bytes..];
        if content.is_empty() || content.starts_with('#') {
            continue;
        }

        let mut tokens = Lexer::tokenize(content, LexOptions::lines());
        offset_spans(&mut tokens, line_start + ws_bytes);
        for tok in &tokens {
            if let TokenKind::Error(msg) = &tok.kind {
                return Err(Diagnostic::error(msg.clone(), tok.span));
            }
        }
        // Comment-only after lexing (e.g. trailing spaces) lexes to Eof.
        if matches!(tokens.first().map(|t| &t.kind), Some(TokenKind::Eof)) {
            continue;
        }

        lines.push(Line {
            indent,
            start: line_start + ws_bytes,
            tokens,
        });
    }

    Ok(lines)
}

// ── Parsing ─────────────────────────────────────────────────────

pub(crate) fn parse(source: &str) -> Result<Vec<Spanned<Stmt>>, Diagnostic> {
    let lines = scan_lines(source)?;
    let mut idx = 0;
    let stmts = parse_block(&lines, &mut idx, 0)?;
    if idx < lines.len() {
        let line = &lines[idx];
        return Err(Diagnostic::error(
            "unexpected indent",
            Span::new(line.start, line.start + 1),
        ));
    }
    Ok(stmts)
}

/// Parse statements at exactly `indent`, stopping at the first dedent.
fn parse_block(lines: &[Line], idx: &mut usize, indent: usize) -> Result<Vec<Spanned<Stmt>>, Diagnostic> {
    let mut stmts = Vec::new();

    while *idx < lines.len() {
        let line = &lines[*idx];
        if line.indent < indent {
            break;
        }
        if line.indent > indent {
            return Err(Diagnostic::error(
                "unexpected indent",
                Span::new(line.start, line.start + 1),
            ));
        }
        stmts.push(parse_line(lines, idx, indent)?);
    }

    Ok(stmts)
}

/// Parse the child block that must follow a `:` header.
fn parse_child_block(
    lines: &[Line],
    idx: &mut usize,
    parent_indent: usize,
    header_span: Span,
) -> Result<Vec<Spanned<Stmt>>, Diagnostic> {
    let Some(line) = lines.get(*idx) else {
        return Err(Diagnostic::error("expected an indented block", header_span));
    };
    if line.indent <= parent_indent {
        return Err(Diagnostic::error("expected an indented block", header_span));
    }
    parse_block(lines, idx, line.indent)
}

fn parse_line(lines: &[Line], idx: &mut usize, indent: usize) -> Result<Spanned<Stmt>, Diagnostic> {
    let line = &lines[*idx];
    let start = line.start;
    let mut parser = TokenParser::new(line.tokens.clone());

    match parser.peek() {
        TokenKind::If => {
            parser.advance();
            let cond = parser.parse_expr()?;
            parser.expect(&TokenKind::Colon)?;
            expect_line_end(&parser)?;
            let header_span = Span::new(start, cond.span.end);
            *idx += 1;

            let then_branch = parse_child_block(lines, idx, indent, header_span)?;
            let else_branch = parse_else(lines, idx, indent)?;

            Ok(Spanned::new(
                Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                },
                header_span,
            ))
        }
        TokenKind::While => {
            parser.advance();
            let cond = parser.parse_expr()?;
            parser.expect(&TokenKind::Colon)?;
            expect_line_end(&parser)?;
            let header_span = Span::new(start, cond.span.end);
            *idx += 1;

            let body = parse_child_block(lines, idx, indent, header_span)?;
            Ok(Spanned::new(Stmt::While { cond, body }, header_span))
        }
        TokenKind::For => {
            parser.advance();
            let (var, var_span) = parser.expect_ident()?;
            parser.expect(&TokenKind::In)?;
            if !parser.at_ident("range") {
                return Err(parser.error("for loops iterate over range(...)"));
            }
            parser.advance();
            let args = parser.parse_call_args()?;
            parser.expect(&TokenKind::Colon)?;
            expect_line_end(&parser)?;

            let range_span = args
                .iter()
                .map(|a| a.span)
                .fold(var_span, |acc, s| acc.merge(s));
            let header_span = Span::new(start, range_span.end);
            *idx += 1;

            let body = parse_child_block(lines, idx, indent, header_span)?;
            Ok(Spanned::new(
                Stmt::For {
                    var,
                    range: RangeSpec {
                        args,
                        span: range_span,
                    },
                    body,
                },
                header_span,
            ))
        }
        TokenKind::Else => Err(parser.error("'else' without a matching 'if'")),
        _ => {
            let stmt = parse_simple(&mut parser)?;
            let span = Span::new(start, parser.peek_span().start.max(start));
            *idx += 1;
            Ok(Spanned::new(stmt, span))
        }
    }
}

fn parse_else(
    lines: &[Line],
    idx: &mut usize,
    indent: usize,
) -> Result<Vec<Spanned<Stmt>>, Diagnostic> {
    let Some(line) = lines.get(*idx) else {
        return Ok(Vec::new());
    };
    if line.indent != indent || !matches!(line.tokens.first().map(|t| &t.kind), Some(TokenKind::Else))
    {
        return Ok(Vec::new());
    }

    let mut parser = TokenParser::new(line.tokens.clone());
    let else_tok = parser.advance();
    parser.expect(&TokenKind::Colon)?;
    expect_line_end(&parser)?;
    *idx += 1;

    parse_child_block(lines, idx, indent, else_tok.span)
}

/// Assignment or expression statement on a single line.
fn parse_simple(parser: &mut TokenParser) -> Result<Stmt, Diagnostic> {
    if matches!(parser.peek(), TokenKind::Ident(_))
        && matches!(
            parser.peek_at(1),
            TokenKind::Eq | TokenKind::PlusEq | TokenKind::MinusEq
        )
    {
        let (name, _) = parser.expect_ident()?;
        let op = match parser.advance().kind {
            TokenKind::Eq => AssignOp::Eq,
            TokenKind::PlusEq => AssignOp::PlusEq,
            TokenKind::MinusEq => AssignOp::MinusEq,
            _ => unreachable!(),
        };
        let value = parser.parse_expr()?;
        expect_line_end(parser)?;
        return Ok(Stmt::Assign {
            name,
            op,
            value,
            decl: None,
        });
    }

    let expr = parser.parse_expr()?;
    expect_line_end(parser)?;
    Ok(Stmt::Expr(expr))
}

fn expect_line_end(parser: &TokenParser) -> Result<(), Diagnostic> {
    if parser.at_eof() {
        Ok(())
    } else {
        Err(parser.error(format!(
            "unexpected {} at end of statement",
            parser.peek().describe()
        )))
    }
}

// Single-line statement parsing is also what MarkScript execute blocks
// use; see markscript.rs.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use hs_sim::tutorial;

    fn run(source: &str) -> (NovaSec, Vec<String>, Result<(), String>) {
        let mut front = NovaSec::new();
        let mut state = tutorial::new_session("ghost");
        state.reseed(1);
        let mut output = Vec::new();
        let result = front.run(source, &mut state, &mut output);
        (front, output, result)
    }

    #[test]
    fn assignment_and_print() {
        let (front, output, result) = run("x = 40 + 2\nprint(\"x is\", x)\n");
        assert!(result.is_ok());
        assert_eq!(front.vars().get("x"), Some(&Value::Int(42)));
        assert_eq!(output, vec!["x is 42"]);
    }

    #[test]
    fn if_else_by_indentation() {
        let source = "\
x = 10
if x > 5:
    print(\"big\")
else:
    print(\"small\")
print(\"after\")
";
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output, vec!["big", "after"]);
    }

    #[test]
    fn nested_blocks_reenter_outer_indent() {
        let source = "\
total = 0
for i in range(3):
    if i > 0:
        total += i
    total += 10
print(total)
";
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output, vec!["33"]);
    }

    #[test]
    fn while_loop_with_condition() {
        let source = "\
i = 0
while i < 3:
    i += 1
print(i)
";
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output, vec!["3"]);
    }

    #[test]
    fn runaway_while_is_terminated() {
        let (_, _, result) = run("while true:\n    x = 1\n");
        let err = result.unwrap_err();
        assert!(err.contains("exceeded"));
    }

    #[test]
    fn missing_block_is_syntax_error() {
        let (_, _, result) = run("if true:\nprint(\"no body\")\n");
        let err = result.unwrap_err();
        assert!(err.contains("expected an indented block"));
    }

    #[test]
    fn unexpected_indent_is_syntax_error() {
        let (_, _, result) = run("x = 1\n    y = 2\n");
        assert!(result.unwrap_err().contains("unexpected indent"));
    }

    #[test]
    fn else_without_if_is_syntax_error() {
        let (_, _, result) = run("else:\n    print(\"?\")\n");
        assert!(result.unwrap_err().contains("'else' without"));
    }

    #[test]
    fn syntax_error_aborts_before_any_builtin_runs() {
        let mut front = NovaSec::new();
        let mut state = tutorial::new_session("ghost");
        state.reseed(1);
        let mut output = Vec::new();
        // Line 1 would connect; line 2 is garbage. Nothing may run.
        let result = front.run(
            "connect(\"Gateway\", 22)\nif if:\n    x = 1\n",
            &mut state,
            &mut output,
        );
        assert!(result.is_err());
        assert!(output.is_empty());
        assert!(state.current_node().is_none());
        assert_eq!(state.detection_level, 0.0);
    }

    #[test]
    fn runtime_error_preserves_prior_side_effects() {
        let mut front = NovaSec::new();
        let mut state = tutorial::new_session("ghost");
        state.reseed(1);
        let mut output = Vec::new();
        let result = front.run(
            "connect(\"Gateway\", 22)\nboom(1)\nprint(\"never\")\n",
            &mut state,
            &mut output,
        );
        assert!(result.is_err());
        // The connect before the failure stands.
        assert_eq!(state.current_node().unwrap().name, "Gateway");
        assert!(output.iter().any(|l| l.contains("Connected")));
        assert!(!output.iter().any(|l| l.contains("never")));
    }

    #[test]
    fn variables_persist_across_runs() {
        let mut front = NovaSec::new();
        let mut state = tutorial::new_session("ghost");
        state.reseed(1);
        let mut output = Vec::new();
        front
            .run("counter = 1\n", &mut state, &mut output)
            .unwrap();
        output.clear();
        front
            .run("counter += 1\nprint(counter)\n", &mut state, &mut output)
            .unwrap();
        assert_eq!(output, vec!["2"]);
    }

    #[test]
    fn comments_and_blank_lines_ignored() {
        let source = "\
# setup
x = 1

# bump it
x += 1  # inline comment
print(x)
";
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output, vec!["2"]);
    }

    #[test]
    fn branch_on_builtin_success() {
        let source = "\
if connect(\"Gateway\", 22):
    print(\"in\")
else:
    print(\"blocked\")
";
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert!(output.iter().any(|l| l.contains("Connected")));
        assert_eq!(output.last().map(|s| s.as_str()), Some("in"));
    }
}
