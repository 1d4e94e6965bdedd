//! Scripted shell sessions: the same line-by-line flow pipe mode uses.

use hs_cli::commands::{Shell, Signal};

fn drive(shell: &mut Shell, lines: &[&str]) -> Vec<String> {
    let mut all_output = Vec::new();
    for line in lines {
        match shell.exec(line) {
            Ok(Signal::Quit) => break,
            Ok(Signal::Continue) => {}
            Err(e) => all_output.push(format!("error: {}", e)),
        }
        all_output.extend(shell.take_output());
    }
    all_output
}

#[test]
fn seeded_session_crosses_dialects() {
    let mut shell = Shell::new("ghost");
    let output = drive(
        &mut shell,
        &[
            ":seed 42",
            "connect(\"Gateway\", 22)",
            ":lang shellscript",
            "probe Gateway",
            ":lang asm",
            "mov ax, 7",
            "out ax",
        ],
    );
    let text = output.join("\n");
    assert!(text.contains("Connected to Gateway:22"));
    assert!(text.contains("22/tcp open"));
    assert!(text.contains('7'));
}

#[test]
fn errors_do_not_end_the_session() {
    let mut shell = Shell::new("ghost");
    let output = drive(
        &mut shell,
        &[
            ":seed 1",
            "this line is garbage",
            "print(\"still alive\")",
        ],
    );
    let text = output.join("\n");
    assert!(text.contains("error:"));
    assert!(text.contains("still alive"));
}

#[test]
fn quit_stops_processing() {
    let mut shell = Shell::new("ghost");
    let output = drive(&mut shell, &[":seed 1", ":quit", "print(\"never\")"]);
    assert!(!output.join("\n").contains("never"));
}

#[test]
fn status_reflects_session_state() {
    let mut shell = Shell::new("ghost");
    let output = drive(
        &mut shell,
        &[":seed 9", "connect(\"Gateway\", 22)", ":status"],
    );
    let text = output.join("\n");
    assert!(text.contains("Connected to Gateway"));
    assert!(text.contains("detection"));
}
