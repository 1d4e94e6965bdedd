use std::sync::{Arc, Mutex};

use nu_ansi_term::{Color, Style};
use reedline::{
    default_emacs_keybindings, ColumnarMenu, DefaultHinter, Emacs, FileBackedHistory, KeyCode,
    KeyModifiers, Keybindings, MenuBuilder, Prompt, PromptEditMode, PromptHistorySearch,
    PromptHistorySearchStatus, Reedline, ReedlineEvent, ReedlineMenu, Signal as LineSignal,
};

use crate::commands::{Shell, Signal};
use crate::completer::{CompletionContext, ShellCompleter};

/// Prompt showing the active dialect, e.g. `novasec> `.
struct ShellPrompt {
    dialect: Arc<Mutex<String>>,
}

impl Prompt for ShellPrompt {
    fn render_prompt_left(&self) -> std::borrow::Cow<'_, str> {
        let dialect = self
            .dialect
            .lock()
            .map(|d| d.clone())
            .unwrap_or_else(|_| "hackscript".to_string());
        std::borrow::Cow::Owned(Color::Green.bold().paint(dialect).to_string())
    }

    fn render_prompt_right(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("> ")
    }

    fn render_prompt_multiline_indicator(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("... > ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> std::borrow::Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "(failed) ",
        };
        std::borrow::Cow::Owned(format!("{}search: ", prefix))
    }
}

/// Refresh completion candidates from the current shell state.
fn refresh_completions(shell: &Shell, ctx: &Arc<Mutex<CompletionContext>>) {
    let Ok(mut c) = ctx.lock() else {
        return;
    };
    c.builtins = hs_interp::builtins::BUILTIN_NAMES
        .iter()
        .map(|s| s.to_string())
        .collect();
    c.meta_commands = [
        "help", "lang", "seed", "status", "skills", "vars", "ransoms", "pay", "quit",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    c.dialects = hs_sim::DialectId::ALL.iter().map(|d| d.name().to_string()).collect();
    c.variables = shell
        .engine()
        .active_vars()
        .map(|vars| vars.names().map(|s| s.to_string()).collect())
        .unwrap_or_default();
}

/// Build the history file path, creating parent directories if needed.
fn history_path() -> Option<std::path::PathBuf> {
    let data_dir = data_dir()?.join("hackscript");
    std::fs::create_dir_all(&data_dir).ok()?;
    Some(data_dir.join("history.txt"))
}

/// Get the XDG data directory or fall back to ~/.local/share.
fn data_dir() -> Option<std::path::PathBuf> {
    std::env::var_os("XDG_DATA_HOME")
        .map(std::path::PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|h| std::path::PathBuf::from(h).join(".local/share"))
        })
}

/// Run the interactive REPL with reedline.
pub fn run_repl(mut shell: Shell) {
    let completion_ctx = Arc::new(Mutex::new(CompletionContext::default()));
    let prompt_dialect = Arc::new(Mutex::new(shell.dialect().name().to_string()));

    let completer = ShellCompleter::new(Arc::clone(&completion_ctx));
    let hinter = DefaultHinter::default().with_style(Style::new().fg(Color::DarkGray));
    let completion_menu = ColumnarMenu::default().with_name("completion_menu");

    let mut keybindings = default_emacs_keybindings();
    bind_tab_completion(&mut keybindings);

    let mut editor = Reedline::create()
        .with_completer(Box::new(completer))
        .with_hinter(Box::new(hinter))
        .with_menu(ReedlineMenu::EngineCompleter(Box::new(completion_menu)))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    if let Some(path) = history_path() {
        if let Ok(history) = FileBackedHistory::with_file(1000, path) {
            editor = editor.with_history(Box::new(history));
        }
    }

    let prompt = ShellPrompt {
        dialect: Arc::clone(&prompt_dialect),
    };

    println!("hackscript — :help for commands, :quit to leave");
    refresh_completions(&shell, &completion_ctx);

    loop {
        match editor.read_line(&prompt) {
            Ok(LineSignal::Success(buffer)) => {
                let result = shell.exec(&buffer);

                for line in shell.take_output() {
                    println!("{}", line);
                }

                match result {
                    Ok(Signal::Quit) => break,
                    Ok(Signal::Continue) => {}
                    Err(e) => eprintln!("{}", e),
                }

                refresh_completions(&shell, &completion_ctx);
                if let Ok(mut d) = prompt_dialect.lock() {
                    *d = shell.dialect().name().to_string();
                }
            }
            Ok(LineSignal::CtrlC) => {
                // Clear current line, continue
            }
            Ok(LineSignal::CtrlD) => break,
            Err(err) => {
                eprintln!("I/O error: {}", err);
                break;
            }
        }
    }
}

/// Bind Tab to open/cycle the completion menu.
fn bind_tab_completion(kb: &mut Keybindings) {
    kb.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::UntilFound(vec![
            ReedlineEvent::Menu("completion_menu".to_string()),
            ReedlineEvent::MenuNext,
        ]),
    );
    kb.add_binding(
        KeyModifiers::SHIFT,
        KeyCode::BackTab,
        ReedlineEvent::MenuPrevious,
    );
}
