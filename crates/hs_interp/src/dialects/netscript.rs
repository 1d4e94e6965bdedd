//! NetScript: the C-like dialect. Token-level operators with
//! two-character lookahead, parenthesized conditions, brace blocks,
//! `;`-terminated statements. `if`/`else` and `while` are fully
//! supported; `var` introduces a variable but plain assignment works
//! too.

use hs_ast::ast::{AssignOp, Expr, Stmt};
use hs_ast::diagnostic::Diagnostic;
use hs_ast::{Span, Spanned};
use hs_lexer::{LexOptions, Lexer, TokenKind};
use hs_sim::GameState;

use super::parser::TokenParser;
use super::{render_runtime, render_syntax};
use crate::exec::{exec_stmts, Env, Vars};

pub struct NetScript {
    vars: Vars,
}

impl NetScript {
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

impl Default for NetScript {
    fn default() -> Self {
        Self::new()
    }
}

// ── Parsing ─────────────────────────────────────────────────────

pub(crate) fn parse(source: &str) -> Result<Vec<Spanned<Stmt>>, Diagnostic> {
    let mut parser = TokenParser::new(Lexer::tokenize(source, LexOptions::braces()));
    parser.check_lex_errors()?;

    let mut stmts = Vec::new();
    while !parser.at_eof() {
        stmts.push(parse_stmt(&mut parser)?);
    }
    Ok(stmts)
}

fn parse_stmt(parser: &mut TokenParser) -> Result<Spanned<Stmt>, Diagnostic> {
    let start = parser.peek_span().start;

    match parser.peek() {
        TokenKind::If => {
            parser.advance();
            let cond = parse_paren_cond(parser)?;
            let then_branch = parse_block(parser)?;
            let else_branch = if matches!(parser.peek(), TokenKind::Else) {
                parser.advance();
                if matches!(parser.peek(), TokenKind::If) {
                    // `else if` chains as a single-statement else branch.
                    vec![parse_stmt(parser)?]
                } else {
                    parse_block(parser)?
                }
            } else {
                Vec::new()
            };
            let span = Span::new(start, cond.span.end);
            Ok(Spanned::new(
                Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                },
                span,
            ))
        }
        TokenKind::While => {
            parser.advance();
            let cond = parse_paren_cond(parser)?;
            let body = parse_block(parser)?;
            let span = Span::new(start, cond.span.end);
            Ok(Spanned::new(Stmt::While { cond, body }, span))
        }
        TokenKind::For => Err(parser.error("NetScript has no for loop; use while")),
        TokenKind::Ident(s) if s == "var" => {
            parser.advance();
            let (name, _) = parser.expect_ident()?;
            parser.expect(&TokenKind::Eq)?;
            let value = parser.parse_expr()?;
            parser.expect(&TokenKind::Semicolon)?;
            let span = Span::new(start, value.span.end);
            Ok(Spanned::new(
                Stmt::Assign {
                    name,
                    op: AssignOp::Eq,
                    value,
                    decl: None,
                },
                span,
            ))
        }
        TokenKind::Ident(_)
            if matches!(
                parser.peek_at(1),
                TokenKind::Eq | TokenKind::PlusEq | TokenKind::MinusEq
            ) =>
        {
            let (name, _) = parser.expect_ident()?;
            let op = match parser.advance().kind {
                TokenKind::Eq => AssignOp::Eq,
                TokenKind::PlusEq => AssignOp::PlusEq,
                TokenKind::MinusEq => AssignOp::MinusEq,
                _ => unreachable!(),
            };
            let value = parser.parse_expr()?;
            parser.expect(&TokenKind::Semicolon)?;
            let span = Span::new(start, value.span.end);
            Ok(Spanned::new(
                Stmt::Assign {
                    name,
                    op,
                    value,
                    decl: None,
                },
                span,
            ))
        }
        _ => {
            let expr = parser.parse_expr()?;
            parser.expect(&TokenKind::Semicolon)?;
            let span = expr.span;
            Ok(Spanned::new(Stmt::Expr(expr), span))
        }
    }
}

fn parse_paren_cond(parser: &mut TokenParser) -> Result<Spanned<Expr>, Diagnostic> {
    parser.expect(&TokenKind::LParen)?;
    let cond = parser.parse_expr()?;
    parser.expect(&TokenKind::RParen)?;
    Ok(cond)
}

fn parse_block(parser: &mut TokenParser) -> Result<Vec<Spanned<Stmt>>, Diagnostic> {
    parser.expect(&TokenKind::LBrace)?;
    let mut stmts = Vec::new();
    while !matches!(parser.peek(), TokenKind::RBrace | TokenKind::Eof) {
        stmts.push(parse_stmt(parser)?);
    }
    parser.expect(&TokenKind::RBrace)?;
    Ok(stmts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use hs_sim::tutorial;

    fn run(source: &str) -> (NetScript, Vec<String>, Result<(), String>) {
        let mut front = NetScript::new();
        let mut state = tutorial::new_session("ghost");
        state.reseed(1);
        let mut output = Vec::new();
        let result = front.run(source, &mut state, &mut output);
        (front, output, result)
    }

    #[test]
    fn var_declaration_and_arithmetic() {
        let (front, _, result) = run("var x = 6 * 7;");
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(front.vars().get("x"), Some(&Value::Int(42)));
    }

    #[test]
    fn if_else_with_two_char_operators() {
        let source = r#"
var x = 9;
if (x == 9 && x >= 5) {
    print("both");
} else {
    print("neither");
}
"#;
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output, vec!["both"]);
    }

    #[test]
    fn else_if_chain() {
        let source = r#"
var x = 2;
if (x == 1) {
    print("one");
} else if (x == 2) {
    print("two");
} else {
    print("many");
}
"#;
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output, vec!["two"]);
    }

    #[test]
    fn while_loop_counts() {
        let source = r#"
var i = 0;
while (i < 4) {
    i += 1;
}
print(i);
"#;
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output, vec!["4"]);
    }

    #[test]
    fn runaway_while_terminates() {
        let (_, _, result) = run("while (true) { }");
        assert!(result.unwrap_err().contains("exceeded"));
    }

    #[test]
    fn missing_semicolon_is_syntax_error() {
        let (_, _, result) = run("var x = 1");
        assert!(result.unwrap_err().contains("expected `;`"));
    }

    #[test]
    fn condition_requires_parens() {
        let (_, _, result) = run("if true { print(\"x\"); }");
        assert!(result.unwrap_err().contains("expected `(`"));
    }

    #[test]
    fn for_is_rejected_with_guidance() {
        let (_, _, result) = run("for (;;) { }");
        assert!(result.unwrap_err().contains("no for loop"));
    }

    #[test]
    fn builtins_uniform_across_dialects() {
        let source = r#"
if (connect("Gateway", 22)) {
    print("in");
}
"#;
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert!(output.iter().any(|l| l.contains("Connected to Gateway:22")));
        assert_eq!(output.last().map(|s| s.as_str()), Some("in"));
    }

    #[test]
    fn newlines_are_whitespace() {
        let source = "var x =\n    1 +\n    2;\nprint(x);";
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output, vec!["3"]);
    }

    #[test]
    fn first_error_stops_execution() {
        let source = r#"
print("one");
boom();
print("two");
"#;
        let (_, output, result) = run(source);
        assert!(result.is_err());
        assert_eq!(output, vec!["one"]);
    }
}
