//! ShellScript: the Unix-shell-like dialect. One command per line,
//! whitespace word splitting honoring quotes, `$VAR` expansion,
//! `NAME=value` assignment words, and `|` chaining that feeds each
//! command's output lines to the next command as trailing arguments.
//!
//! Splitting (and its syntax errors) happens for the whole script
//! before anything runs; `$VAR` resolution happens per line at
//! execution time so earlier assignments are visible.

use hs_ast::diagnostic::Diagnostic;
use hs_ast::Span;
use hs_sim::GameState;

use super::{render_runtime, render_syntax};
use crate::builtins;
use crate::exec::Vars;
use crate::value::Value;
use crate::RuntimeError;

pub struct ShellScript {
    vars: Vars,
}

impl ShellScript {
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
        let mut parsed = Vec::new();
        let mut offset = 0;
        for raw in source.split('\n') {
            let line_start = offset;
            offset += raw.len() + 1;
            let segments = split_line(raw, line_start).map_err(|d| render_syntax(source, &d))?;
            if !segments.is_empty() {
                parsed.push((line_start, segments));
            }
        }

        for (line_start, segments) in parsed {
            self.exec_line(segments, line_start, state, output)
                .map_err(|e| render_runtime(source, &e))?;
        }
        Ok(())
    }

    fn exec_line(
        &mut self,
        segments: Vec<Vec<Word>>,
        line_start: usize,
        state: &mut GameState,
        output: &mut Vec<String>,
    ) -> Result<(), RuntimeError> {
        // `NAME=value` as the entire command is an assignment.
        if segments.len() == 1 && segments[0].len() == 1 {
            let word = &segments[0][0];
            let text = word.resolve(&self.vars)?;
            if let Some((name, value)) = parse_assignment(word, &text) {
                self.vars.set(name, value);
                return Ok(());
            }
        }

        let mut piped: Vec<String> = Vec::new();
        let last = segments.len() - 1;
        for (i, words) in segments.iter().enumerate() {
            let Some(command) = words.first() else {
                return Err(RuntimeError::with_span(
                    "empty pipeline segment",
                    Span::new(line_start, line_start + 1),
                ));
            };
            let name = command.resolve(&self.vars)?;
            if !builtins::is_builtin(&name) {
                return Err(RuntimeError::with_span(
                    format!("unknown command '{}'", name),
                    command.span,
                ));
            }

            let mut args = Vec::with_capacity(words.len() - 1 + piped.len());
            for word in &words[1..] {
                let text = word.resolve(&self.vars)?;
                args.push(if word.quoted {
                    Value::Str(text)
                } else {
                    Value::from_word(&text)
                });
            }
            // Upstream output becomes trailing arguments.
            args.extend(piped.drain(..).map(Value::Str));

            let outcome = builtins::call_builtin(state, &name, &args)?;
            let mut lines = outcome.output;
            lines.extend(state.take_events());

            if i == last {
                output.extend(lines);
            } else {
                piped = lines;
            }
        }
        Ok(())
    }
}

impl Default for ShellScript {
    fn default() -> Self {
        Self::new()
    }
}

// ── Words ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Seg {
    Lit(String),
    /// `$NAME`, resolved at execution time.
    Var(String, Span),
}

#[derive(Debug, Clone)]
struct Word {
    segs: Vec<Seg>,
    /// Any part of the word was quoted: always a string value.
    quoted: bool,
    span: Span,
}

impl Word {
    fn resolve(&self, vars: &Vars) -> Result<String, RuntimeError> {
        let mut text = String::new();
        for seg in &self.segs {
            match seg {
                Seg::Lit(s) => text.push_str(s),
                Seg::Var(name, span) => match vars.get(name) {
                    Some(value) => text.push_str(&value.to_string()),
                    None => {
                        return Err(RuntimeError::with_span(
                            format!("unknown variable '${}'", name),
                            *span,
                        ))
                    }
                },
            }
        }
        Ok(text)
    }
}

/// `NAME=value` with a plain identifier before the `=`. The name must
/// come from literal text, not an expansion.
fn parse_assignment(word: &Word, resolved: &str) -> Option<(String, Value)> {
    if word.quoted {
        return None;
    }
    match word.segs.first() {
        Some(Seg::Lit(first)) if first.contains('=') => {}
        _ => return None,
    }
    let eq = resolved.find('=')?;
    let (name, rest) = resolved.split_at(eq);
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        || name.starts_with(|c: char| c.is_ascii_digit())
    {
        return None;
    }
    Some((name.to_string(), Value::from_word(&rest[1..])))
}

// ── Splitting ───────────────────────────────────────────────────

struct WordBuilder {
    segs: Vec<Seg>,
    lit: String,
    quoted: bool,
    started: bool,
    start: usize,
}

impl WordBuilder {
    fn new() -> Self {
        Self {
            segs: Vec::new(),
            lit: String::new(),
            quoted: false,
            started: false,
            start: 0,
        }
    }

    fn begin(&mut self, pos: usize) {
        if !self.started {
            self.started = true;
            self.start = pos;
        }
    }

    fn push_char(&mut self, pos: usize, ch: char) {
        self.begin(pos);
        self.lit.push(ch);
    }

    fn push_var(&mut self, pos: usize, name: String, span: Span) {
        self.begin(pos);
        if !self.lit.is_empty() {
            self.segs.push(Seg::Lit(std::mem::take(&mut self.lit)));
        }
        self.segs.push(Seg::Var(name, span));
    }

    fn finish(&mut self, end: usize, line_start: usize) -> Option<Word> {
        if !self.started {
            return None;
        }
        if !self.lit.is_empty() {
            self.segs.push(Seg::Lit(std::mem::take(&mut self.lit)));
        }
        let word = Word {
            segs: std::mem::take(&mut self.segs),
            quoted: self.quoted,
            span: Span::new(line_start + self.start, line_start + end),
        };
        self.quoted = false;
        self.started = false;
        Some(word)
    }
}

/// Split one line into pipeline segments of words. Returns an empty
/// vec for blank and comment-only lines.
fn split_line(line: &str, line_start: usize) -> Result<Vec<Vec<Word>>, Diagnostic> {
    let mut segments: Vec<Vec<Word>> = Vec::new();
    let mut words: Vec<Word> = Vec::new();
    let mut builder = WordBuilder::new();

    let mut chars = line.char_indices().peekable();
    while let Some((pos, ch)) = chars.next() {
        match ch {
            c if c.is_whitespace() => {
                words.extend(builder.finish(pos, line_start));
            }
            '#' if !builder.started => break,
            '|' => {
                words.extend(builder.finish(pos, line_start));
                if words.is_empty() {
                    return Err(Diagnostic::error(
                        "empty pipeline segment",
                        Span::new(line_start + pos, line_start + pos + 1),
                    ));
                }
                segments.push(std::mem::take(&mut words));
            }
            '"' => {
                builder.begin(pos);
                builder.quoted = true;
                let mut closed = false;
                while let Some((_, qch)) = chars.next() {
                    match qch {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some((_, 'n')) => builder.lit.push('\n'),
                            Some((_, 't')) => builder.lit.push('\t'),
                            Some((_, esc)) => builder.lit.push(esc),
                            None => builder.lit.push('\\'),
                        },
                        '$' => {
                            let name = take_var_name(&mut chars);
                            if name.is_empty() {
                                builder.lit.push('$');
                            } else {
                                let span =
                                    Span::new(line_start + pos, line_start + pos + name.len() + 1);
                                builder.push_var(pos, name, span);
                            }
                        }
                        other => builder.lit.push(other),
                    }
                }
                if !closed {
                    return Err(Diagnostic::error(
                        "unterminated string",
                        Span::new(line_start + pos, line_start + line.len()),
                    ));
                }
            }
            '\'' => {
                builder.begin(pos);
                builder.quoted = true;
                let mut closed = false;
                while let Some((_, qch)) = chars.next() {
                    if qch == '\'' {
                        closed = true;
                        break;
                    }
                    builder.lit.push(qch);
                }
                if !closed {
                    return Err(Diagnostic::error(
                        "unterminated string",
                        Span::new(line_start + pos, line_start + line.len()),
                    ));
                }
            }
            '$' => {
                let name = take_var_name(&mut chars);
                if name.is_empty() {
                    builder.push_char(pos, '$');
                } else {
                    let span = Span::new(line_start + pos, line_start + pos + name.len() + 1);
                    builder.push_var(pos, name, span);
                }
            }
            '\\' => match chars.next() {
                Some((_, esc)) => builder.push_char(pos, esc),
                None => builder.push_char(pos, '\\'),
            },
            other => builder.push_char(pos, other),
        }
    }

    words.extend(builder.finish(line.len(), line_start));
    if !words.is_empty() {
        segments.push(words);
    } else if !segments.is_empty() {
        // `cmd |` with nothing after the pipe.
        return Err(Diagnostic::error(
            "pipeline ends with '|'",
            Span::new(line_start, line_start + line.len()),
        ));
    }

    Ok(segments)
}

fn take_var_name(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> String {
    let mut name = String::new();
    while let Some((_, nch)) = chars.peek() {
        if nch.is_ascii_alphanumeric() || *nch == '_' {
            name.push(*nch);
            chars.next();
        } else {
            break;
        }
    }
    name
}
