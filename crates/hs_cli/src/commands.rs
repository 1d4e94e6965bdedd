//! The shell layer above the engine: `:`-prefixed meta commands for
//! the player (dialect switching, seeding, introspection), everything
//! else handed to the active dialect's interpreter.

use hs_interp::Engine;
use hs_sim::{tutorial, DialectId, Skill};

/// What the caller should do after a line executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Continue,
    Quit,
}

pub struct Shell {
    engine: Engine,
    output: Vec<String>,
}

impl Shell {
    pub fn new(player_name: &str) -> Self {
        Self {
            engine: Engine::new(tutorial::new_session(player_name)),
            output: Vec::new(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn dialect(&self) -> DialectId {
        self.engine.dialect()
    }

    /// Drain lines produced by the last `exec`.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    /// Execute one line: a `:` meta command or dialect code.
    pub fn exec(&mut self, line: &str) -> Result<Signal, String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Signal::Continue);
        }
        if let Some(meta) = trimmed.strip_prefix(':') {
            return self.exec_meta(meta);
        }
        self.exec_code(line)
    }

    /// Execute a whole script (multi-line program) in the active dialect.
    pub fn exec_code(&mut self, code: &str) -> Result<Signal, String> {
        if self.engine.interpret(code) {
            self.output.extend(self.engine.get_output().iter().cloned());
            Ok(Signal::Continue)
        } else {
            self.output.extend(self.engine.get_output().iter().cloned());
            Err(self
                .engine
                .get_error()
                .unwrap_or("unknown interpreter failure")
                .to_string())
        }
    }

    fn exec_meta(&mut self, meta: &str) -> Result<Signal, String> {
        let mut words = meta.split_whitespace();
        let command = words.next().unwrap_or("");
        let args: Vec<&str> = words.collect();

        match command {
            "help" | "h" => {
                self.print_help();
                Ok(Signal::Continue)
            }
            "quit" | "q" | "exit" => Ok(Signal::Quit),
            "lang" => {
                match args.first() {
                    None => {
                        self.output
                            .push(format!("active dialect: {}", self.engine.dialect()));
                        let all: Vec<&str> =
                            DialectId::ALL.iter().map(|d| d.name()).collect();
                        self.output.push(format!("available: {}", all.join(", ")));
                        Ok(Signal::Continue)
                    }
                    Some(name) => match DialectId::parse(name) {
                        Some(dialect) => {
                            self.engine.set_dialect(dialect);
                            self.output.push(format!("dialect set to {}", dialect));
                            Ok(Signal::Continue)
                        }
                        None => Err(format!("unknown dialect '{}'", name)),
                    },
                }
            }
            "seed" => match args.first().map(|a| a.parse::<u64>()) {
                Some(Ok(seed)) => {
                    self.engine.state_mut().reseed(seed);
                    self.output.push(format!("rng seeded with {}", seed));
                    Ok(Signal::Continue)
                }
                _ => Err("usage: :seed <u64>".to_string()),
            },
            "status" => {
                // Straight to the builtin, independent of the active
                // dialect's syntax.
                let outcome =
                    hs_interp::builtins::call_builtin(self.engine.state_mut(), "status", &[])
                        .map_err(|e| e.to_string())?;
                self.output.extend(outcome.output);
                Ok(Signal::Continue)
            }
            "skills" => {
                let player = &self.engine.state().player;
                for skill in Skill::ALL {
                    self.output.push(format!(
                        "  {:<20} {:>4.1} (effective {:.1})",
                        skill.name(),
                        player.skill(skill),
                        player.effective_skill(skill)
                    ));
                }
                Ok(Signal::Continue)
            }
            "vars" => {
                match self.engine.active_vars() {
                    Some(vars) => {
                        let mut names: Vec<&str> = vars.names().collect();
                        names.sort_unstable();
                        if names.is_empty() {
                            self.output.push("no variables bound".to_string());
                        }
                        for name in names {
                            if let Some(value) = vars.get(name) {
                                self.output.push(format!("  {} = {}", name, value));
                            }
                        }
                    }
                    None => {
                        self.output
                            .push("the assembly dialect has registers, not variables".to_string());
                    }
                }
                Ok(Signal::Continue)
            }
            "ransoms" => {
                let ransoms = &self.engine.state().player.pending_ransoms;
                if ransoms.is_empty() {
                    self.output.push("no pending ransoms".to_string());
                }
                for (i, ransom) in ransoms.iter().enumerate() {
                    self.output.push(format!(
                        "  #{}: ${} due in {} commands ({})",
                        i, ransom.amount, ransom.deadline, ransom.consequence
                    ));
                }
                Ok(Signal::Continue)
            }
            "pay" => match args.first().map(|a| a.parse::<usize>()) {
                Some(Ok(index)) => {
                    self.engine.state_mut().pay_ransom(index)?;
                    let events = self.engine.state_mut().take_events();
                    self.output.extend(events);
                    Ok(Signal::Continue)
                }
                _ => Err("usage: :pay <index>".to_string()),
            },
            other => Err(format!("unknown command ':{}'; try :help", other)),
        }
    }

    fn print_help(&mut self) {
        self.output.extend(
            [
                "meta commands:",
                "  :lang [name]     show or switch the active dialect",
                "  :seed <n>        seed the session rng (deterministic runs)",
                "  :status          connection, risk meters, money",
                "  :skills          skill table with effective values",
                "  :vars            variables bound in the active dialect",
                "  :ransoms         pending ransom demands",
                "  :pay <i>         pay off a ransom",
                "  :quit            leave",
                "",
                "anything else is handed to the active dialect's interpreter.",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
    }
}
