//! The engine entry point the surrounding game shell talks to:
//! `set_dialect`, `interpret`, `get_output`, `get_error`. One engine
//! per session; each dialect keeps its own persistent interpreter
//! state inside.

use hs_sim::{DialectId, GameState};

use crate::dialects::asm::Texting2Exiting;
use crate::dialects::cppsharp::CppSharp;
use crate::dialects::markscript::MarkScript;
use crate::dialects::netscript::NetScript;
use crate::dialects::novasec::NovaSec;
use crate::dialects::shellscript::ShellScript;
use crate::exec::Vars;

/// Proficiency gained in the active dialect per successful run.
const PROFICIENCY_PER_RUN: f64 = 0.05;

pub struct Engine {
    state: GameState,
    novasec: NovaSec,
    netscript: NetScript,
    shellscript: ShellScript,
    cppsharp: CppSharp,
    markscript: MarkScript,
    asm: Texting2Exiting,
    output: Vec<String>,
    error: Option<String>,
}

impl Engine {
    pub fn new(state: GameState) -> Self {
        Self {
            state,
            novasec: NovaSec::new(),
            netscript: NetScript::new(),
            shellscript: ShellScript::new(),
            cppsharp: CppSharp::new(),
            markscript: MarkScript::new(),
            asm: Texting2Exiting::new(),
            output: Vec::new(),
            error: None,
        }
    }

    pub fn set_dialect(&mut self, dialect: DialectId) {
        self.state.active_dialect = dialect;
    }

    pub fn dialect(&self) -> DialectId {
        self.state.active_dialect
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// Variable table of the active dialect, for shells that display
    /// bindings. The assembly dialect has registers instead.
    pub fn active_vars(&self) -> Option<&Vars> {
        match self.state.active_dialect {
            DialectId::NovaSec => Some(self.novasec.vars()),
            DialectId::NetScript => Some(self.netscript.vars()),
            DialectId::ShellScript => Some(self.shellscript.vars()),
            DialectId::CppSharp => Some(self.cppsharp.vars()),
            DialectId::MarkScript => Some(self.markscript.vars()),
            DialectId::Texting2Exiting => None,
        }
    }

    /// Run a script in the active dialect. `true` means the interpreter
    /// ran to completion; simulated failures still return `true` and
    /// report through the output. On `false`, `get_error()` has the
    /// diagnostic and execution stopped at the first failing statement.
    pub fn interpret(&mut self, code: &str) -> bool {
        self.output.clear();
        self.error = None;

        let dialect = self.state.active_dialect;
        let result = match dialect {
            DialectId::NovaSec => self.novasec.run(code, &mut self.state, &mut self.output),
            DialectId::NetScript => self.netscript.run(code, &mut self.state, &mut self.output),
            DialectId::ShellScript => {
                self.shellscript.run(code, &mut self.state, &mut self.output)
            }
            DialectId::CppSharp => self.cppsharp.run(code, &mut self.state, &mut self.output),
            DialectId::MarkScript => self.markscript.run(code, &mut self.state, &mut self.output),
            DialectId::Texting2Exiting => self.asm.run(code, &mut self.state, &mut self.output),
        };

        // The command clock advances whether or not the script worked:
        // issuing it took a turn.
        self.state.tick_command();
        self.output.extend(self.state.take_events());

        match result {
            Ok(()) => {
                if let Some(specialization) = self
                    .state
                    .player
                    .gain_proficiency(dialect, PROFICIENCY_PER_RUN)
                {
                    self.output.push(format!(
                        "[SKILL] Your {} fluency unlocked the '{}' specialization.",
                        dialect, specialization
                    ));
                }
                true
            }
            Err(message) => {
                self.error = Some(message);
                false
            }
        }
    }

    pub fn get_output(&self) -> &[String] {
        &self.output
    }

    pub fn get_error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
