//! Texting2Exiting: the assembly-like dialect. Two passes — collect
//! `label:` positions, then execute mnemonics sequentially with an
//! instruction pointer, four general registers, comparison flags, a
//! byte-addressable memory array, and a bounded step budget.
//!
//! Builtins are reached through `call`: `call connect, "Gateway", 22`.
//! The zero flag is set to the call's simulated success, so `je` right
//! after a call branches on "it worked".

use hs_ast::diagnostic::Diagnostic;
use hs_ast::Span;
use hs_sim::GameState;

use super::{render_runtime, render_syntax};
use crate::builtins;
use crate::value::Value;
use crate::RuntimeError;

use std::collections::HashMap;

/// Step budget per `interpret()` call. The only cancellation mechanism
/// a runaway jump loop has.
pub const MAX_ASM_STEPS: usize = 10_000;

const MEMORY_SIZE: usize = 256;

// ── Machine ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reg {
    Ax,
    Bx,
    Cx,
    Dx,
}

impl Reg {
    fn parse(name: &str) -> Option<Reg> {
        match name {
            "ax" => Some(Reg::Ax),
            "bx" => Some(Reg::Bx),
            "cx" => Some(Reg::Cx),
            "dx" => Some(Reg::Dx),
            _ => None,
        }
    }
}

/// Register file, flags, stack pointer, and memory persist across
/// `interpret()` calls, the same way the other dialects keep their
/// variable tables.
pub struct Texting2Exiting {
    regs: [i64; 4],
    memory: [u8; MEMORY_SIZE],
    /// Grows downward; `MEMORY_SIZE` means empty.
    sp: usize,
    zero: bool,
    negative: bool,
}

impl Texting2Exiting {
    pub fn new() -> Self {
        Self {
            regs: [0; 4],
            memory: [0; MEMORY_SIZE],
            sp: MEMORY_SIZE,
            zero: false,
            negative: false,
        }
    }

    pub fn register(&self, name: &str) -> Option<i64> {
        Reg::parse(name).map(|r| self.regs[r as usize])
    }

    pub fn run(
        &mut self,
        source: &str,
        state: &mut GameState,
        output: &mut Vec<String>,
    ) -> Result<(), String> {
        let program = parse(source).map_err(|d| render_syntax(source, &d))?;
        self.execute(&program, state, output)
            .map_err(|e| render_runtime(source, &e))
    }

    fn execute(
        &mut self,
        program: &Program,
        state: &mut GameState,
        output: &mut Vec<String>,
    ) -> Result<(), RuntimeError> {
        let mut ip = 0usize;
        let mut steps = 0usize;

        while ip < program.instrs.len() {
            steps += 1;
            if steps > MAX_ASM_STEPS {
                return Err(RuntimeError::new(format!(
                    "program exceeded {} steps",
                    MAX_ASM_STEPS
                )));
            }

            let instr = &program.instrs[ip];
            ip += 1;

            match &instr.op {
                Op::Nop => {}
                Op::Hlt => break,
                Op::Mov(dst, src) => {
                    let value = self.read(src, instr.span)?;
                    self.write(dst, value, instr.span)?;
                }
                Op::Add(dst, src) | Op::Sub(dst, src) | Op::Mul(dst, src) | Op::Div(dst, src) => {
                    let a = self.read(dst, instr.span)?;
                    let b = self.read(src, instr.span)?;
                    let result = match instr.op {
                        Op::Add(..) => a.wrapping_add(b),
                        Op::Sub(..) => a.wrapping_sub(b),
                        Op::Mul(..) => a.wrapping_mul(b),
                        Op::Div(..) => {
                            if b == 0 {
                                return Err(RuntimeError::with_span(
                                    "division by zero",
                                    instr.span,
                                ));
                            }
                            a.wrapping_div(b)
                        }
                        _ => unreachable!(),
                    };
                    self.zero = result == 0;
                    self.negative = result < 0;
                    self.write(dst, result, instr.span)?;
                }
                Op::Cmp(a, b) => {
                    let a = self.read(a, instr.span)?;
                    let b = self.read(b, instr.span)?;
                    self.zero = a == b;
                    self.negative = a < b;
                }
                Op::Jmp(label) => ip = program.resolve(label, instr.span)?,
                Op::Je(label) => {
                    if self.zero {
                        ip = program.resolve(label, instr.span)?;
                    }
                }
                Op::Jne(label) => {
                    if !self.zero {
                        ip = program.resolve(label, instr.span)?;
                    }
                }
                Op::Jl(label) => {
                    if self.negative {
                        ip = program.resolve(label, instr.span)?;
                    }
                }
                Op::Jg(label) => {
                    if !self.zero && !self.negative {
                        ip = program.resolve(label, instr.span)?;
                    }
                }
                Op::Push(src) => {
                    let value = self.read(src, instr.span)?;
                    if self.sp == 0 {
                        return Err(RuntimeError::with_span("stack overflow", instr.span));
                    }
                    self.sp -= 1;
                    self.memory[self.sp] = value as u8;
                }
                Op::Pop(reg) => {
                    if self.sp >= MEMORY_SIZE {
                        return Err(RuntimeError::with_span("stack underflow", instr.span));
                    }
                    let value = self.memory[self.sp] as i64;
                    self.sp += 1;
                    self.regs[*reg as usize] = value;
                }
                Op::Out(src) => {
                    let value = self.read(src, instr.span)?;
                    output.push(value.to_string());
                }
                Op::Call { name, args } => {
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(match arg {
                            CallArg::Str(s) => Value::Str(s.clone()),
                            CallArg::Operand(op) => Value::Int(self.read(op, instr.span)?),
                        });
                    }
                    let outcome = builtins::call_builtin(state, name, &values)
                        .map_err(|e| match e.span {
                            Some(_) => e,
                            None => RuntimeError::with_span(e.message, instr.span),
                        })?;
                    output.extend(outcome.output);
                    output.extend(state.take_events());
                    // Success lands in the zero flag for je/jne.
                    self.zero = outcome.success;
                    self.negative = false;
                }
            }
        }

        Ok(())
    }

    fn read(&self, operand: &Operand, span: Span) -> Result<i64, RuntimeError> {
        match operand {
            Operand::Reg(reg) => Ok(self.regs[*reg as usize]),
            Operand::Imm(value) => Ok(*value),
            Operand::Mem(addr) => {
                let index = self.mem_index(addr, span)?;
                Ok(self.memory[index] as i64)
            }
        }
    }

    fn write(&mut self, operand: &Operand, value: i64, span: Span) -> Result<(), RuntimeError> {
        match operand {
            Operand::Reg(reg) => {
                self.regs[*reg as usize] = value;
                Ok(())
            }
            Operand::Mem(addr) => {
                let index = self.mem_index(addr, span)?;
                // Memory is byte wide; stores truncate.
                self.memory[index] = value as u8;
                Ok(())
            }
            Operand::Imm(_) => Err(RuntimeError::with_span(
                "cannot write to an immediate",
                span,
            )),
        }
    }

    fn mem_index(&self, addr: &MemAddr, span: Span) -> Result<usize, RuntimeError> {
        let raw = match addr {
            MemAddr::Imm(n) => *n,
            MemAddr::Reg(reg) => self.regs[*reg as usize],
        };
        if !(0..MEMORY_SIZE as i64).contains(&raw) {
            return Err(RuntimeError::with_span(
                format!("memory address {} out of range 0-{}", raw, MEMORY_SIZE - 1),
                span,
            ));
        }
        Ok(raw as usize)
    }
}

impl Default for Texting2Exiting {
    fn default() -> Self {
        Self::new()
    }
}

// ── Program representation ──────────────────────────────────────

#[derive(Debug, Clone)]
enum MemAddr {
    Imm(i64),
    Reg(Reg),
}

#[derive(Debug, Clone)]
enum Operand {
    Reg(Reg),
    Imm(i64),
    Mem(MemAddr),
}

#[derive(Debug, Clone)]
enum CallArg {
    Str(String),
    Operand(Operand),
}

#[derive(Debug, Clone)]
enum Op {
    Nop,
    Hlt,
    Mov(Operand, Operand),
    Add(Operand, Operand),
    Sub(Operand, Operand),
    Mul(Operand, Operand),
    Div(Operand, Operand),
    Cmp(Operand, Operand),
    Jmp(String),
    Je(String),
    Jne(String),
    Jl(String),
    Jg(String),
    Push(Operand),
    Pop(Reg),
    Out(Operand),
    Call { name: String, args: Vec<CallArg> },
}

struct Instr {
    op: Op,
    span: Span,
}

struct Program {
    instrs: Vec<Instr>,
    labels: HashMap<String, usize>,
}

impl Program {
    fn resolve(&self, label: &str, span: Span) -> Result<usize, RuntimeError> {
        self.labels.get(label).copied().ok_or_else(|| {
            RuntimeError::with_span(format!("unknown label '{}'", label), span)
        })
    }
}

// ── Parsing (pass 1) ────────────────────────────────────────────

fn parse(source: &str) -> Result<Program, Diagnostic> {
    let mut instrs = Vec::new();
    let mut labels = HashMap::new();
    let mut offset = 0;

    for raw in source.split('\n') {
        let line_start = offset;
        offset += raw.len() + 1;

        // `;` comments.
        let code = match raw.find(';') {
            Some(i) => &raw[..i],
            None => raw,
        };
        let trimmed = code.trim();
        if trimmed.is_empty() {
            continue;
        }
        let col = line_start + (code.len() - code.trim_start().len());
        let span = Span::new(col, col + trimmed.len());

        // `name:` collects a label at the next instruction index.
        if let Some(name) = trimmed.strip_suffix(':') {
            let name = name.trim();
            if name.is_empty() || !is_label_name(name) {
                return Err(Diagnostic::error("invalid label name", span));
            }
            if labels.insert(name.to_string(), instrs.len()).is_some() {
                return Err(Diagnostic::error(
                    format!("duplicate label '{}'", name),
                    span,
                ));
            }
            continue;
        }

        let op = parse_instruction(trimmed, span)?;
        instrs.push(Instr { op, span });
    }

    // Jump targets must exist: unknown labels are a parse error, not a
    // surprise at execution time.
    for instr in &instrs {
        if let Op::Jmp(l) | Op::Je(l) | Op::Jne(l) | Op::Jl(l) | Op::Jg(l) = &instr.op {
            if !labels.contains_key(l.as_str()) {
                return Err(Diagnostic::error(
                    format!("unknown label '{}'", l),
                    instr.span,
                ));
            }
        }
    }

    Ok(Program { instrs, labels })
}

fn is_label_name(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
}

fn parse_instruction(line: &str, span: Span) -> Result<Op, Diagnostic> {
    let (mnemonic, rest) = match line.find(char::is_whitespace) {
        Some(i) => (&line[..i], line[i..].trim()),
        None => (line, ""),
    };
    let operands = split_operands(rest, span)?;

    let op = match mnemonic {
        "nop" => expect_arity(&operands, 0, "nop", span).map(|_| Op::Nop)?,
        "hlt" => expect_arity(&operands, 0, "hlt", span).map(|_| Op::Hlt)?,
        "mov" | "add" | "sub" | "mul" | "div" | "cmp" => {
            expect_arity(&operands, 2, mnemonic, span)?;
            let a = parse_operand(&operands[0], span)?;
            let b = parse_operand(&operands[1], span)?;
            match mnemonic {
                "mov" => Op::Mov(a, b),
                "add" => Op::Add(a, b),
                "sub" => Op::Sub(a, b),
                "mul" => Op::Mul(a, b),
                "div" => Op::Div(a, b),
                "cmp" => Op::Cmp(a, b),
                _ => unreachable!(),
            }
        }
        "jmp" | "je" | "jne" | "jl" | "jg" => {
            expect_arity(&operands, 1, mnemonic, span)?;
            let label = operands[0].clone();
            if !is_label_name(&label) {
                return Err(Diagnostic::error(
                    format!("{} expects a label, got '{}'", mnemonic, label),
                    span,
                ));
            }
            match mnemonic {
                "jmp" => Op::Jmp(label),
                "je" => Op::Je(label),
                "jne" => Op::Jne(label),
                "jl" => Op::Jl(label),
                "jg" => Op::Jg(label),
                _ => unreachable!(),
            }
        }
        "push" => {
            expect_arity(&operands, 1, "push", span)?;
            Op::Push(parse_operand(&operands[0], span)?)
        }
        "pop" => {
            expect_arity(&operands, 1, "pop", span)?;
            match Reg::parse(&operands[0]) {
                Some(reg) => Op::Pop(reg),
                None => {
                    return Err(Diagnostic::error(
                        format!("pop expects a register, got '{}'", operands[0]),
                        span,
                    ))
                }
            }
        }
        "out" => {
            expect_arity(&operands, 1, "out", span)?;
            Op::Out(parse_operand(&operands[0], span)?)
        }
        "call" => {
            if operands.is_empty() {
                return Err(Diagnostic::error("call expects a function name", span));
            }
            let name = operands[0].clone();
            if !is_label_name(&name) {
                return Err(Diagnostic::error(
                    format!("call expects a function name, got '{}'", name),
                    span,
                ));
            }
            let mut args = Vec::new();
            for operand in &operands[1..] {
                if let Some(stripped) = operand
                    .strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                {
                    args.push(CallArg::Str(stripped.to_string()));
                } else {
                    args.push(CallArg::Operand(parse_operand(operand, span)?));
                }
            }
            Op::Call { name, args }
        }
        other => {
            return Err(Diagnostic::error(
                format!("unknown mnemonic '{}'", other),
                span,
            ))
        }
    };
    Ok(op)
}

/// Comma-split that keeps quoted strings whole.
fn split_operands(rest: &str, span: Span) -> Result<Vec<String>, Diagnostic> {
    let mut operands = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in rest.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push('"');
            }
            ',' if !in_quotes => {
                let text = current.trim().to_string();
                if text.is_empty() {
                    return Err(Diagnostic::error("empty operand", span));
                }
                operands.push(text);
                current.clear();
            }
            other => current.push(other),
        }
    }
    if in_quotes {
        return Err(Diagnostic::error("unterminated string", span));
    }
    let text = current.trim().to_string();
    if !text.is_empty() {
        operands.push(text);
    } else if !operands.is_empty() {
        return Err(Diagnostic::error("trailing comma", span));
    }
    Ok(operands)
}

fn expect_arity(
    operands: &[String],
    arity: usize,
    mnemonic: &str,
    span: Span,
) -> Result<(), Diagnostic> {
    if operands.len() == arity {
        Ok(())
    } else {
        Err(Diagnostic::error(
            format!(
                "{} expects {} operand{}, got {}",
                mnemonic,
                arity,
                if arity == 1 { "" } else { "s" },
                operands.len()
            ),
            span,
        ))
    }
}

fn parse_operand(text: &str, span: Span) -> Result<Operand, Diagnostic> {
    if let Some(reg) = Reg::parse(text) {
        return Ok(Operand::Reg(reg));
    }

    // Bracket syntax: `[12]` and `[bx]` address memory.
    if let Some(inner) = text.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        let inner = inner.trim();
        if let Some(reg) = Reg::parse(inner) {
            return Ok(Operand::Mem(MemAddr::Reg(reg)));
        }
        if let Ok(value) = parse_int(inner) {
            return Ok(Operand::Mem(MemAddr::Imm(value)));
        }
        return Err(Diagnostic::error(
            format!("invalid memory operand '[{}]'", inner),
            span,
        ));
    }

    match parse_int(text) {
        Ok(value) => Ok(Operand::Imm(value)),
        Err(()) => Err(Diagnostic::error(
            format!("invalid operand '{}'", text),
            span,
        )),
    }
}

fn parse_int(text: &str) -> Result<i64, ()> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).map_err(|_| ());
    }
    text.parse::<i64>().map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hs_sim::tutorial;

    fn run(source: &str) -> (Texting2Exiting, Vec<String>, Result<(), String>) {
        let mut machine = Texting2Exiting::new();
        let mut state = tutorial::new_session("ghost");
        state.reseed(1);
        let mut output = Vec::new();
        let result = machine.run(source, &mut state, &mut output);
        (machine, output, result)
    }

    #[test]
    fn mov_add_out() {
        let source = "\
mov ax, 40
mov bx, 2
add ax, bx
out ax
";
        let (machine, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(machine.register("ax"), Some(42));
        assert_eq!(output, vec!["42"]);
    }

    #[test]
    fn labels_collected_before_execution() {
        // Forward jump: the label is defined after its use site.
        let source = "\
jmp skip
out 1
skip:
out 2
";
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output, vec!["2"]);
    }

    #[test]
    fn countdown_loop_with_flags() {
        let source = "\
mov cx, 3
loop:
out cx
sub cx, 1
cmp cx, 0
jne loop
";
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output, vec!["3", "2", "1"]);
    }

    #[test]
    fn conditional_jumps_on_comparison() {
        let source = "\
mov ax, 5
cmp ax, 9
jl less
out 0
hlt
less:
out 1
";
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output, vec!["1"]);
    }

    #[test]
    fn memory_bracket_syntax() {
        let source = "\
mov [10], 77
mov bx, 10
mov ax, [bx]
out ax
";
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output, vec!["77"]);
    }

    #[test]
    fn memory_is_byte_wide() {
        let (machine, _, result) = run("mov [0], 300\nmov ax, [0]\n");
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(machine.register("ax"), Some(300 % 256));
    }

    #[test]
    fn push_pop_round_trip() {
        let source = "\
mov ax, 9
push ax
mov ax, 0
pop bx
out bx
";
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output, vec!["9"]);
    }

    #[test]
    fn pop_on_empty_stack_is_error() {
        let (_, _, result) = run("pop ax\n");
        assert!(result.unwrap_err().contains("stack underflow"));
    }

    #[test]
    fn runaway_jump_loop_hits_step_budget() {
        let (_, _, result) = run("spin:\njmp spin\n");
        assert!(result.unwrap_err().contains("exceeded"));
    }

    #[test]
    fn unknown_mnemonic_is_syntax_error() {
        let (_, _, result) = run("frob ax, 1\n");
        assert!(result.unwrap_err().contains("unknown mnemonic"));
    }

    #[test]
    fn unknown_jump_target_fails_at_parse_time() {
        let (_, output, result) = run("out 1\njmp nowhere\n");
        assert!(result.unwrap_err().contains("unknown label"));
        // Pass 1 rejects the program before anything runs.
        assert!(output.is_empty());
    }

    #[test]
    fn duplicate_label_rejected() {
        let (_, _, result) = run("a:\nnop\na:\n");
        assert!(result.unwrap_err().contains("duplicate label"));
    }

    #[test]
    fn call_reaches_builtins_and_sets_zero_flag() {
        let source = "\
call connect, \"Gateway\", 22
je connected
out 0
hlt
connected:
out 1
";
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert!(output.iter().any(|l| l.contains("Connected to Gateway:22")));
        assert_eq!(output.last().map(|s| s.as_str()), Some("1"));
    }

    #[test]
    fn call_failure_clears_zero_flag() {
        // Port 23 is closed on the Gateway: simulated refusal.
        let source = "\
call connect, \"Gateway\", 23
je yes
out 0
hlt
yes:
out 1
";
        let (_, output, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output.last().map(|s| s.as_str()), Some("0"));
    }

    #[test]
    fn registers_persist_across_runs() {
        let mut machine = Texting2Exiting::new();
        let mut state = tutorial::new_session("ghost");
        state.reseed(1);
        let mut output = Vec::new();
        machine.run("mov ax, 7\n", &mut state, &mut output).unwrap();
        machine.run("out ax\n", &mut state, &mut output).unwrap();
        assert_eq!(output, vec!["7"]);
    }

    #[test]
    fn hex_immediates() {
        let (machine, _, result) = run("mov ax, 0x10\n");
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(machine.register("ax"), Some(16));
    }

    #[test]
    fn comments_ignored() {
        let (_, output, result) = run("; setup\nout 5 ; print it\n");
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output, vec!["5"]);
    }
}
