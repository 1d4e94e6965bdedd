//! CppSharp: the C++-like dialect. Typed declarations (`int x = 5;`),
//! assignment, and call statements over the NetScript token grammar.
//! Control structures are intentionally unsupported: the language's
//! distinguishing feature is its declarations, and a script that needs
//! branching belongs in NetScript.

use hs_ast::ast::{AssignOp, DeclType, Stmt};
use hs_ast::diagnostic::Diagnostic;
use hs_ast::{Span, Spanned};
use hs_lexer::{LexOptions, Lexer, TokenKind};
use hs_sim::GameState;

use super::parser::TokenParser;
use super::{render_runtime, render_syntax};
use crate::exec::{exec_stmts, Env, Vars};

pub struct CppSharp {
    vars: Vars,
}

impl CppSharp {
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

impl Default for CppSharp {
    fn default() -> Self {
        Self::new()
    }
}

// ── Parsing ─────────────────────────────────────────────────────

fn decl_type(name: &str) -> Option<DeclType> {
    match name {
        "int" => Some(DeclType::Int),
        "float" | "double" => Some(DeclType::Float),
        "string" => Some(DeclType::Str),
        "bool" => Some(DeclType::Bool),
        _ => None,
    }
}

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

    match parser.peek().clone() {
        TokenKind::If | TokenKind::While | TokenKind::For => {
            Err(parser.error("control structures are not supported in CppSharp"))
        }
        TokenKind::Ident(word) => {
            // `int x = ...;` / `auto x = ...;`
            if let Some(decl) = decl_type(&word) {
                if matches!(parser.peek_at(1), TokenKind::Ident(_)) {
                    parser.advance();
                    return parse_decl(parser, start, Some(decl));
                }
            }
            if word == "auto" && matches!(parser.peek_at(1), TokenKind::Ident(_)) {
                parser.advance();
                return parse_decl(parser, start, None);
            }

            if matches!(
                parser.peek_at(1),
                TokenKind::Eq | TokenKind::PlusEq | TokenKind::MinusEq
            ) {
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
                return Ok(Spanned::new(
                    Stmt::Assign {
                        name,
                        op,
                        value,
                        decl: None,
                    },
                    span,
                ));
            }

            let expr = parser.parse_expr()?;
            parser.expect(&TokenKind::Semicolon)?;
            let span = expr.span;
            Ok(Spanned::new(Stmt::Expr(expr), span))
        }
        _ => {
            let expr = parser.parse_expr()?;
            parser.expect(&TokenKind::Semicolon)?;
            let span = expr.span;
            Ok(Spanned::new(Stmt::Expr(expr), span))
        }
    }
}

fn parse_decl(
    parser: &mut TokenParser,
    start: usize,
    decl: Option<DeclType>,
) -> Result<Spanned<Stmt>, Diagnostic> {
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
            decl,
        },
        span,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use hs_sim::tutorial;

    fn run(source: &str) -> (CppSharp, Vec<String>, Result<(), String>) {
        let mut front = CppSharp::new();
        let mut state = tutorial::new_session("ghost");
        state.reseed(1);
        let mut output = Vec::new();
        let result = front.run(source, &mut state, &mut output);
        (front, output, result)
    }

    #[test]
    fn typed_declarations() {
        let source = r#"
int port = 22;
string host = "Gateway";
bool ready = true;
float ratio = 1;
"#;
        let (front, _, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(front.vars().get("port"), Some(&Value::Int(22)));
        assert_eq!(front.vars().get("host"), Some(&Value::Str("Gateway".into())));
        assert_eq!(front.vars().get("ready"), Some(&Value::Bool(true)));
        // int literal widens into a declared float
        assert_eq!(front.vars().get("ratio"), Some(&Value::Float(1.0)));
    }

    #[test]
    fn declared_type_enforced_on_reassignment() {
        let (_, _, result) = run("int x = 1;\nx = \"oops\";");
        let err = result.unwrap_err();
        assert!(err.contains("cannot assign"));
        assert!(err.contains("int"));
    }

    #[test]
    fn auto_is_untyped() {
        let (front, _, result) = run("auto x = 1;\nx = \"fine\";");
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(front.vars().get("x"), Some(&Value::Str("fine".into())));
    }

    #[test]
    fn control_structures_are_rejected() {
        for source in ["if (1) { }", "while (1) { }", "for (;;) { }"] {
            let (_, _, result) = run(source);
            assert!(
                result
                    .unwrap_err()
                    .contains("control structures are not supported"),
                "{} should be rejected",
                source
            );
        }
    }

    #[test]
    fn builtin_calls_work() {
        let source = r#"
string host = "Gateway";
connect(host, 22);
print("done");
"#;
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert!(output.iter().any(|l| l.contains("Connected to Gateway:22")));
        assert_eq!(output.last().map(|s| s.as_str()), Some("done"));
    }

    #[test]
    fn type_names_still_usable_as_variables() {
        // `int` alone (not followed by an identifier) parses as a name.
        let (front, _, result) = run("auto int = 3;\nprint(int);");
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(front.vars().get("int"), Some(&Value::Int(3)));
    }
}
