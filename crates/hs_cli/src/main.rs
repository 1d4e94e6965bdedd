use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;
use std::process;

use hs_cli::commands::{Shell, Signal};
use hs_sim::DialectId;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    // Optional --lang <dialect> before the subcommand.
    let mut dialect = None;
    let mut rest: Vec<&str> = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--lang" {
            let Some(name) = iter.next() else {
                eprintln!("--lang requires a dialect name");
                process::exit(1);
            };
            match DialectId::parse(name) {
                Some(id) => dialect = Some(id),
                None => {
                    eprintln!("unknown dialect '{}'", name);
                    process::exit(1);
                }
            }
        } else {
            rest.push(arg.as_str());
        }
    }

    let mut shell = Shell::new("player");
    if let Some(dialect) = dialect {
        if shell.exec(&format!(":lang {}", dialect.name())).is_ok() {
            shell.take_output();
        }
    }

    match rest.first().copied() {
        Some("-c") => {
            if rest.len() != 2 {
                eprintln!("usage: hackscript [--lang <dialect>] -c <code>");
                process::exit(1);
            }
            run_program(shell, rest[1]);
        }
        Some("run") => {
            if rest.len() != 2 {
                eprintln!("usage: hackscript [--lang <dialect>] run <script>");
                process::exit(1);
            }
            run_files(shell, rest[1]);
        }
        Some(other) => {
            eprintln!("unknown subcommand: {}", other);
            eprintln!("usage: hackscript [--lang <dialect>] [-c <code> | run <script>]");
            process::exit(1);
        }
        None => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                hs_cli::repl::run_repl(shell);
            } else {
                run_pipe(shell);
            }
        }
    }
}

/// Pipe mode: one shell line at a time, no line editing.
fn run_pipe(mut shell: Shell) {
    let stdin = io::stdin();
    let mut had_error = false;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("read error: {}", e);
                process::exit(1);
            }
        };

        let result = shell.exec(&line);

        for out in shell.take_output() {
            println!("{}", out);
        }

        match result {
            Ok(Signal::Quit) => return,
            Ok(Signal::Continue) => {}
            Err(e) => {
                eprintln!("{}", e);
                had_error = true;
            }
        }
    }

    if had_error {
        process::exit(1);
    }
}

/// Execute one whole program in the active dialect.
fn run_program(mut shell: Shell, code: &str) {
    let result = shell.exec_code(code);
    for out in shell.take_output() {
        println!("{}", out);
    }
    if let Err(e) = result {
        eprintln!("{}", e);
        process::exit(1);
    }
}

/// Execute script files (with glob support), each as a whole program.
fn run_files(mut shell: Shell, pattern: &str) {
    let mut paths: Vec<PathBuf> = Vec::new();
    if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
        match glob::glob(pattern) {
            Ok(entries) => {
                for entry in entries {
                    match entry {
                        Ok(path) => paths.push(path),
                        Err(e) => {
                            eprintln!("glob error for '{}': {}", pattern, e);
                            process::exit(1);
                        }
                    }
                }
                if paths.is_empty() {
                    eprintln!("no files matched pattern '{}'", pattern);
                    process::exit(1);
                }
            }
            Err(e) => {
                eprintln!("invalid glob pattern '{}': {}", pattern, e);
                process::exit(1);
            }
        }
    } else {
        paths.push(PathBuf::from(pattern));
    }

    let mut had_error = false;
    for path in &paths {
        let code = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("cannot read '{}': {}", path.display(), e);
                process::exit(1);
            }
        };
        let result = shell.exec_code(&code);
        for out in shell.take_output() {
            println!("{}", out);
        }
        if let Err(e) = result {
            eprintln!("{}: {}", path.display(), e);
            had_error = true;
        }
    }
    if had_error {
        process::exit(1);
    }
}

fn print_usage() {
    println!(
        "\
hackscript — multi-dialect hacking-sim script engine

USAGE:
  hackscript                                Start the interactive shell
  hackscript -c <code>                      Run code in the active dialect
  hackscript run <script>                   Run a script file (glob ok)
  hackscript --lang <dialect> ...           Pick the starting dialect
  echo <lines> | hackscript                 Pipe mode (no line editing)

DIALECTS:
  novasec netscript shellscript cppsharp markscript texting2exiting

SHELL:
  Type ':help' inside the shell for meta commands."
    );
}
