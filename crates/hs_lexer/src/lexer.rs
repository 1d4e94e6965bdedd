use crate::cursor::Cursor;
use crate::token::{Token, TokenKind};
use hs_ast::Span;

/// Lexing behavior knobs that differ between dialects.
///
/// NetScript and CppSharp are brace/semicolon structured, so newlines are
/// plain whitespace and comments are `//`. NovaSec is line structured, so
/// newlines are tokens and comments are `#`.
#[derive(Debug, Clone, Copy)]
pub struct LexOptions {
    pub keep_newlines: bool,
    pub hash_comments: bool,
}

impl LexOptions {
    /// Brace dialects: newlines are whitespace, `//` comments.
    pub fn braces() -> Self {
        Self {
            keep_newlines: false,
            hash_comments: false,
        }
    }

    /// Line dialects: newlines are tokens, `#` comments.
    pub fn lines() -> Self {
        Self {
            keep_newlines: true,
            hash_comments: true,
        }
    }
}

/// Hand-written lexer with two-character lookahead for the compound
/// operators (`==`, `!=`, `<=`, `>=`, `&&`, `||`, `+=`, `-=`).
pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    opts: LexOptions,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, opts: LexOptions) -> Self {
        Self {
            cursor: Cursor::new(source),
            opts,
            done: false,
        }
    }

    /// Collect every token including the trailing `Eof`.
    pub fn tokenize(source: &'a str, opts: LexOptions) -> Vec<Token> {
        Lexer::new(source, opts).collect()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            if self.opts.keep_newlines {
                self.cursor
                    .eat_while(|ch| ch == ' ' || ch == '\t' || ch == '\r');
            } else {
                self.cursor.eat_while(|ch| ch.is_whitespace());
            }

            if self.opts.hash_comments {
                if self.cursor.peek() == Some('#') {
                    self.cursor.eat_while(|ch| ch != '\n');
                    continue;
                }
            } else if self.cursor.peek() == Some('/') && self.cursor.peek_next() == Some('/') {
                self.cursor.eat_while(|ch| ch != '\n');
                continue;
            }

            break;
        }
    }

    fn lex_string(&mut self) -> TokenKind {
        // Opening quote already consumed
        let mut value = String::new();
        loop {
            match self.cursor.advance() {
                None => return TokenKind::Error("unterminated string".into()),
                Some('"') => return TokenKind::Str(value),
                Some('\n') => return TokenKind::Error("unterminated string".into()),
                Some('\\') => match self.cursor.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('\\') => value.push('\\'),
                    Some('"') => value.push('"'),
                    Some(ch) => {
                        value.push('\\');
                        value.push(ch);
                    }
                    None => return TokenKind::Error("unterminated string escape".into()),
                },
                Some(ch) => value.push(ch),
            }
        }
    }

    fn lex_number(&mut self, start: usize) -> Token {
        // First digit already consumed.
        self.cursor.eat_while(|ch| ch.is_ascii_digit());

        // Fractional part: `.` must be followed by a digit.
        let mut is_float = false;
        if self.cursor.peek() == Some('.')
            && self.cursor.peek_next().is_some_and(|ch| ch.is_ascii_digit())
        {
            is_float = true;
            self.cursor.advance(); // .
            self.cursor.eat_while(|ch| ch.is_ascii_digit());
        }

        let end = self.cursor.pos();
        let text = self.cursor.slice(start, end);
        let span = Span::new(start, end);

        if is_float {
            match text.parse::<f64>() {
                Ok(f) => Token::new(TokenKind::Float(f), span),
                Err(_) => Token::new(
                    TokenKind::Error(format!("invalid float literal '{}'", text)),
                    span,
                ),
            }
        } else {
            match text.parse::<i64>() {
                Ok(n) => Token::new(TokenKind::Int(n), span),
                Err(_) => Token::new(
                    TokenKind::Error(format!("integer literal '{}' out of range", text)),
                    span,
                ),
            }
        }
    }

    fn lex_ident_or_keyword(&mut self, start: usize) -> Token {
        self.cursor
            .eat_while(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        let end = self.cursor.pos();
        let text = self.cursor.slice(start, end);
        let span = Span::new(start, end);

        let kind = match text {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "true" | "True" => TokenKind::True,
            "false" | "False" => TokenKind::False,
            "none" | "None" => TokenKind::None,
            _ => TokenKind::Ident(text.to_string()),
        };

        Token::new(kind, span)
    }

    /// Single- or two-character operator starting with `first`.
    fn lex_operator(&mut self, start: usize, first: char) -> Token {
        let followed_by_eq = self.cursor.peek() == Some('=');
        let kind = match first {
            '+' if followed_by_eq => {
                self.cursor.advance();
                TokenKind::PlusEq
            }
            '+' => TokenKind::Plus,
            '-' if followed_by_eq => {
                self.cursor.advance();
                TokenKind::MinusEq
            }
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '!' if followed_by_eq => {
                self.cursor.advance();
                TokenKind::BangEq
            }
            '!' => TokenKind::Bang,
            '=' if followed_by_eq => {
                self.cursor.advance();
                TokenKind::EqEq
            }
            '=' => TokenKind::Eq,
            '<' if followed_by_eq => {
                self.cursor.advance();
                TokenKind::LtEq
            }
            '<' => TokenKind::Lt,
            '>' if followed_by_eq => {
                self.cursor.advance();
                TokenKind::GtEq
            }
            '>' => TokenKind::Gt,
            '&' => {
                if self.cursor.peek() == Some('&') {
                    self.cursor.advance();
                    TokenKind::AmpAmp
                } else {
                    TokenKind::Error("unexpected character '&'".into())
                }
            }
            '|' => {
                if self.cursor.peek() == Some('|') {
                    self.cursor.advance();
                    TokenKind::PipePipe
                } else {
                    TokenKind::Pipe
                }
            }
            _ => TokenKind::Error(format!("unexpected character '{}'", first)),
        };
        Token::new(kind, Span::new(start, self.cursor.pos()))
    }

    fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let start = self.cursor.pos();
        let Some(ch) = self.cursor.advance() else {
            return Token::new(TokenKind::Eof, Span::new(start, start));
        };

        match ch {
            '\n' => Token::new(TokenKind::Newline, Span::new(start, self.cursor.pos())),

            '(' => Token::new(TokenKind::LParen, Span::new(start, self.cursor.pos())),
            ')' => Token::new(TokenKind::RParen, Span::new(start, self.cursor.pos())),
            '{' => Token::new(TokenKind::LBrace, Span::new(start, self.cursor.pos())),
            '}' => Token::new(TokenKind::RBrace, Span::new(start, self.cursor.pos())),
            '[' => Token::new(TokenKind::LBracket, Span::new(start, self.cursor.pos())),
            ']' => Token::new(TokenKind::RBracket, Span::new(start, self.cursor.pos())),
            ',' => Token::new(TokenKind::Comma, Span::new(start, self.cursor.pos())),
            ':' => Token::new(TokenKind::Colon, Span::new(start, self.cursor.pos())),
            ';' => Token::new(TokenKind::Semicolon, Span::new(start, self.cursor.pos())),

            '"' => {
                let kind = self.lex_string();
                Token::new(kind, Span::new(start, self.cursor.pos()))
            }

            ch if ch.is_ascii_digit() => self.lex_number(start),

            ch if ch.is_ascii_alphabetic() || ch == '_' => self.lex_ident_or_keyword(start),

            ch => self.lex_operator(start, ch),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        let tok = self.next_token();
        if tok.kind == TokenKind::Eof {
            self.done = true;
        }
        Some(tok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source, LexOptions::braces())
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn lex_lines(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source, LexOptions::lines())
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn simple_int() {
        assert_eq!(lex("42"), vec![TokenKind::Int(42), TokenKind::Eof]);
    }

    #[test]
    fn float_literal() {
        assert_eq!(lex("3.14"), vec![TokenKind::Float(3.14), TokenKind::Eof]);
    }

    #[test]
    fn int_followed_by_dot_is_not_float() {
        // `5.` with no fractional digit: the dot is an error token, not
        // part of the number.
        let toks = lex("5.");
        assert_eq!(toks[0], TokenKind::Int(5));
        assert!(matches!(toks[1], TokenKind::Error(_)));
    }

    #[test]
    fn string_with_escapes() {
        assert_eq!(
            lex(r#""hello\nworld""#),
            vec![TokenKind::Str("hello\nworld".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string_is_error() {
        let toks = lex("\"oops");
        assert!(matches!(toks[0], TokenKind::Error(_)));
    }

    #[test]
    fn reserved_keywords() {
        assert_eq!(
            lex("if else while for in true false none"),
            vec![
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::For,
                TokenKind::In,
                TokenKind::True,
                TokenKind::False,
                TokenKind::None,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn python_style_capitalized_literals() {
        assert_eq!(
            lex("True False None"),
            vec![
                TokenKind::True,
                TokenKind::False,
                TokenKind::None,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn soft_keywords_are_idents() {
        assert_eq!(
            lex("var range int connect"),
            vec![
                TokenKind::Ident("var".into()),
                TokenKind::Ident("range".into()),
                TokenKind::Ident("int".into()),
                TokenKind::Ident("connect".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn two_char_operators_need_lookahead() {
        assert_eq!(
            lex("== != <= >= && || += -="),
            vec![
                TokenKind::EqEq,
                TokenKind::BangEq,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::PlusEq,
                TokenKind::MinusEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn eq_vs_eqeq() {
        assert_eq!(
            lex("x = y == z"),
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Eq,
                TokenKind::Ident("y".into()),
                TokenKind::EqEq,
                TokenKind::Ident("z".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn single_amp_is_error() {
        let toks = lex("a & b");
        assert!(matches!(toks[1], TokenKind::Error(_)));
    }

    #[test]
    fn single_pipe_is_token() {
        assert_eq!(
            lex("a | b"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Pipe,
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn braces_mode_discards_newlines() {
        assert_eq!(
            lex("a\nb"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lines_mode_keeps_newlines() {
        assert_eq!(
            lex_lines("a\nb"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Newline,
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn slash_comments_in_braces_mode() {
        assert_eq!(
            lex("a // comment\nb"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn hash_comments_in_lines_mode() {
        assert_eq!(
            lex_lines("a # comment\nb"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Newline,
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn hash_is_not_a_comment_in_braces_mode() {
        let toks = lex("a # b");
        assert!(matches!(toks[1], TokenKind::Error(_)));
    }

    #[test]
    fn punctuation() {
        assert_eq!(
            lex("( ) { } , : ;"),
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Comma,
                TokenKind::Colon,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn call_expression_tokens() {
        assert_eq!(
            lex(r#"connect("Gateway", 22)"#),
            vec![
                TokenKind::Ident("connect".into()),
                TokenKind::LParen,
                TokenKind::Str("Gateway".into()),
                TokenKind::Comma,
                TokenKind::Int(22),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }
}
