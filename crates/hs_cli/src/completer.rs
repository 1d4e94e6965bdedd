use std::sync::{Arc, Mutex};

use reedline::{Completer, Span, Suggestion};

/// Candidate words refreshed from the shell after every command.
#[derive(Default)]
pub struct CompletionContext {
    pub builtins: Vec<String>,
    pub meta_commands: Vec<String>,
    pub dialects: Vec<String>,
    pub variables: Vec<String>,
}

pub struct ShellCompleter {
    context: Arc<Mutex<CompletionContext>>,
}

impl ShellCompleter {
    pub fn new(context: Arc<Mutex<CompletionContext>>) -> Self {
        Self { context }
    }
}

impl Completer for ShellCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let Ok(context) = self.context.lock() else {
            return Vec::new();
        };

        // The word being completed: back up to the previous separator.
        let before = &line[..pos];
        let word_start = before
            .rfind(|c: char| c.is_whitespace() || "(,\"".contains(c))
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &before[word_start..];
        if word.is_empty() {
            return Vec::new();
        }

        // After `:lang `, offer dialect names; a leading `:` means meta
        // commands; everything else gets builtins and variables.
        let candidates: Vec<&String> = if before.trim_start().starts_with(":lang ") {
            context.dialects.iter().collect()
        } else if word.starts_with(':') {
            context.meta_commands.iter().collect()
        } else {
            context
                .builtins
                .iter()
                .chain(context.variables.iter())
                .collect()
        };

        let stripped = word.strip_prefix(':').unwrap_or(word);
        let prefix = if word.starts_with(':') { ":" } else { "" };

        candidates
            .into_iter()
            .filter(|c| c.starts_with(stripped))
            .map(|c| Suggestion {
                value: format!("{}{}", prefix, c),
                description: None,
                style: None,
                extra: None,
                span: Span::new(word_start, pos),
                append_whitespace: false,
            })
            .collect()
    }
}
