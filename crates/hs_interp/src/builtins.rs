use std::time::Duration;

use hs_sim::exploit::{self, ExploitOutcome};
use hs_sim::{GameState, Skill};

use crate::value::Value;
use crate::RuntimeError;

// ── Call outcome ───────────────────────────────────────────────

/// What a builtin produced. `success` is the *simulated* result: a
/// refused connection or a bounced exploit is a successful interpreter
/// run that reports failure here (and usually costs detection).
#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub success: bool,
    pub output: Vec<String>,
}

impl CallOutcome {
    pub fn ok(line: impl Into<String>) -> Self {
        CallOutcome {
            success: true,
            output: vec![line.into()],
        }
    }

    pub fn ok_lines(output: Vec<String>) -> Self {
        CallOutcome {
            success: true,
            output,
        }
    }

    pub fn failed(line: impl Into<String>) -> Self {
        CallOutcome {
            success: false,
            output: vec![line.into()],
        }
    }
}

// ── Registry ───────────────────────────────────────────────────

/// Every name callable from script code, in help/completion order.
pub const BUILTIN_NAMES: &[&str] = &[
    "connect",
    "disconnect",
    "scan",
    "probe",
    "inject",
    "exploit",
    "decrypt",
    "encrypt",
    "extract",
    "download",
    "ls",
    "bypass",
    "setup_proxy",
    "social_engineer",
    "sleep",
    "status",
    "print",
    "echo",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Dispatch a builtin call by name. Arguments are already evaluated
/// and positional; every dialect funnels through here.
pub fn call_builtin(
    state: &mut GameState,
    name: &str,
    args: &[Value],
) -> Result<CallOutcome, RuntimeError> {
    match name {
        "connect" => builtin_connect(state, args),
        "disconnect" => builtin_disconnect(state, args),
        "scan" => builtin_scan(state, args),
        "probe" => builtin_probe(state, args),
        "inject" | "exploit" => builtin_inject(state, args),
        "decrypt" => builtin_decrypt(state, args),
        "encrypt" => builtin_encrypt(state, args),
        "extract" => builtin_extract(state, args),
        "download" => builtin_download(state, args),
        "ls" => builtin_ls(state, args),
        "bypass" => builtin_bypass(state, args),
        "setup_proxy" => builtin_setup_proxy(state, args),
        "social_engineer" => builtin_social_engineer(state, args),
        "sleep" => builtin_sleep(args),
        "status" => builtin_status(state, args),
        "print" | "echo" => builtin_print(args),
        _ => Err(RuntimeError::new(format!("unknown function '{}'", name))),
    }
}

// ── Argument helpers ───────────────────────────────────────────

fn want_str<'a>(args: &'a [Value], index: usize, builtin: &str) -> Result<&'a str, RuntimeError> {
    match args.get(index) {
        Some(Value::Str(s)) => Ok(s),
        Some(other) => Err(RuntimeError::new(format!(
            "{}() argument {} must be a string, got {}",
            builtin,
            index + 1,
            other.type_name()
        ))),
        None => Err(RuntimeError::new(format!(
            "{}() missing argument {}",
            builtin,
            index + 1
        ))),
    }
}

fn want_int(args: &[Value], index: usize, builtin: &str) -> Result<i64, RuntimeError> {
    match args.get(index) {
        Some(Value::Int(n)) => Ok(*n),
        Some(other) => Err(RuntimeError::new(format!(
            "{}() argument {} must be an integer, got {}",
            builtin,
            index + 1,
            other.type_name()
        ))),
        None => Err(RuntimeError::new(format!(
            "{}() missing argument {}",
            builtin,
            index + 1
        ))),
    }
}

fn want_number(args: &[Value], index: usize, builtin: &str) -> Result<f64, RuntimeError> {
    match args.get(index) {
        Some(value) => value.as_f64().ok_or_else(|| {
            RuntimeError::new(format!(
                "{}() argument {} must be a number, got {}",
                builtin,
                index + 1,
                value.type_name()
            ))
        }),
        None => Err(RuntimeError::new(format!(
            "{}() missing argument {}",
            builtin,
            index + 1
        ))),
    }
}

fn want_connected(state: &GameState, builtin: &str) -> Result<String, RuntimeError> {
    match state.current_node() {
        Some(node) => Ok(node.name.clone()),
        None => Err(RuntimeError::new(format!(
            "{}() requires an active connection",
            builtin
        ))),
    }
}

// ── Connection ─────────────────────────────────────────────────

/// `connect(target, port=22)`
///
/// Detection deltas, smallest to largest: success, invalid port,
/// unknown target. A closed port is a simulated refusal, not a runtime
/// error, and costs the most.
fn builtin_connect(state: &mut GameState, args: &[Value]) -> Result<CallOutcome, RuntimeError> {
    let target = want_str(args, 0, "connect")?.to_string();
    let port = if args.len() > 1 {
        want_int(args, 1, "connect")?
    } else {
        22
    };

    if state.network.is_none() {
        return Err(RuntimeError::new("connect() requires an active network"));
    }

    if !(1..=65535).contains(&port) {
        let penalty = state.risk.connect_invalid_port;
        state.increase_detection_level(penalty);
        return Err(RuntimeError::new(format!(
            "connect() port {} out of range 1-65535",
            port
        )));
    }

    let node_info = state
        .network
        .as_ref()
        .and_then(|n| n.node(&target))
        .map(|node| node.open_ports.get(&(port as u16)).cloned());

    match node_info {
        None => {
            let penalty = state.risk.connect_unknown_target;
            state.increase_detection_level(penalty);
            Err(RuntimeError::new(format!(
                "connect() unknown host '{}'",
                target
            )))
        }
        Some(None) => {
            let penalty = state.risk.connect_closed_port;
            state.increase_detection_level(penalty);
            Ok(CallOutcome::failed(format!(
                "Connection to {}:{} refused.",
                target, port
            )))
        }
        Some(Some(service)) => {
            state.set_current_node(target.clone());
            let cost = state.risk.connect_success;
            state.increase_detection_level(cost);
            Ok(CallOutcome::ok(format!(
                "Connected to {}:{} ({}).",
                target, port, service
            )))
        }
    }
}

/// `disconnect()`
fn builtin_disconnect(state: &mut GameState, _args: &[Value]) -> Result<CallOutcome, RuntimeError> {
    if state.current_node().is_none() {
        return Ok(CallOutcome::failed("Not connected.".to_string()));
    }
    state.disconnect();
    Ok(CallOutcome::ok("Disconnected. Detection trail cold."))
}

// ── Reconnaissance ─────────────────────────────────────────────

/// `scan(target?)`
///
/// Reveals only vulnerabilities the caller's scanning skill can see.
/// Always raises detection, more for unskilled scanners.
fn builtin_scan(state: &mut GameState, args: &[Value]) -> Result<CallOutcome, RuntimeError> {
    let target = if args.is_empty() {
        want_connected(state, "scan")?
    } else {
        want_str(args, 0, "scan")?.to_string()
    };

    let skill = state.player.effective_skill(Skill::Scanning);
    let visible: Vec<(String, u8)> = {
        let Some(network) = state.network.as_ref() else {
            return Err(RuntimeError::new("scan() requires an active network"));
        };
        let Some(node) = network.node(&target) else {
            return Err(RuntimeError::new(format!("scan() unknown host '{}'", target)));
        };
        node.vulnerabilities
            .iter()
            .filter(|v| (v.detection_difficulty as f64) <= skill)
            .map(|v| (v.name.clone(), v.exploit_difficulty))
            .collect()
    };

    // Lower skill means a louder scan.
    let cost = state.risk.scan_base * (1.0 + (10.0 - skill) / 10.0);
    state.increase_detection_level(cost);

    let mut output = vec![format!("Scanning {}...", target)];
    if visible.is_empty() {
        output.push("No vulnerabilities visible at your skill level.".to_string());
    } else {
        for (name, difficulty) in visible {
            output.push(format!("  vuln: {} (difficulty {})", name, difficulty));
        }
    }
    Ok(CallOutcome::ok_lines(output))
}

/// `probe(target?)` — port sweep; quieter than a full scan.
fn builtin_probe(state: &mut GameState, args: &[Value]) -> Result<CallOutcome, RuntimeError> {
    let target = if args.is_empty() {
        want_connected(state, "probe")?
    } else {
        want_str(args, 0, "probe")?.to_string()
    };

    let ports: Vec<(u16, String)> = {
        let Some(network) = state.network.as_ref() else {
            return Err(RuntimeError::new("probe() requires an active network"));
        };
        let Some(node) = network.node(&target) else {
            return Err(RuntimeError::new(format!(
                "probe() unknown host '{}'",
                target
            )));
        };
        node.open_ports
            .iter()
            .map(|(port, service)| (*port, service.clone()))
            .collect()
    };

    let cost = state.risk.probe_cost;
    state.increase_detection_level(cost);

    let mut output = vec![format!("Probing {}...", target)];
    for (port, service) in ports {
        output.push(format!("  {}/tcp open ({})", port, service));
    }
    Ok(CallOutcome::ok_lines(output))
}

// ── Exploitation ───────────────────────────────────────────────

/// `inject(vulnerability, payload)` / `exploit(vulnerability, payload)`
fn builtin_inject(state: &mut GameState, args: &[Value]) -> Result<CallOutcome, RuntimeError> {
    let vuln = want_str(args, 0, "inject")?.to_string();
    let payload = want_str(args, 1, "inject")?.to_string();
    want_connected(state, "inject")?;

    match exploit::resolve_exploit(state, &vuln, &payload) {
        ExploitOutcome::Success {
            message,
            already_applied,
        } => {
            let mut output = vec![message];
            if already_applied {
                output.push("(You already had that foothold.)".to_string());
            }
            Ok(CallOutcome::ok_lines(output))
        }
        ExploitOutcome::Failure => Ok(CallOutcome::failed(format!(
            "Exploit '{}' failed. Countermeasures logged the attempt.",
            vuln
        ))),
        ExploitOutcome::MissingVulnerability => Ok(CallOutcome::failed(format!(
            "No vulnerability named '{}' here. The noise did not go unnoticed.",
            vuln
        ))),
        ExploitOutcome::WrongPayload { expected } => Ok(CallOutcome::failed(format!(
            "Payload '{}' bounced off '{}' (expected {}). Very loud.",
            payload, vuln, expected
        ))),
    }
}

// ── Data operations ────────────────────────────────────────────

/// `decrypt(id)`
fn builtin_decrypt(state: &mut GameState, args: &[Value]) -> Result<CallOutcome, RuntimeError> {
    let id = want_str(args, 0, "decrypt")?.to_string();
    want_connected(state, "decrypt")?;

    let cost = state.risk.decrypt_attempt;
    state.increase_detection_level(cost);

    let Some(node) = state.current_node() else {
        return Err(RuntimeError::new("decrypt() requires an active connection"));
    };
    let Some(data) = node.encrypted_data.get(&id).cloned() else {
        return Ok(CallOutcome::failed(format!(
            "No encrypted data '{}' on this node.",
            id
        )));
    };

    if data.requires_access && !node.has_any_access() {
        return Ok(CallOutcome::failed(format!(
            "decrypt('{}'): insufficient access. Get a foothold first.",
            id
        )));
    }

    let skill = state.player.effective_skill(Skill::Cryptography);
    if skill < data.encryption_level as f64 {
        return Ok(CallOutcome::failed(format!(
            "Encryption level {} is beyond your cryptography skill.",
            data.encryption_level
        )));
    }

    Ok(CallOutcome::ok_lines(vec![
        format!("Decrypted '{}':", id),
        format!("  {}", data.plaintext),
    ]))
}

/// `encrypt(data, level)`
fn builtin_encrypt(state: &mut GameState, args: &[Value]) -> Result<CallOutcome, RuntimeError> {
    let data = want_str(args, 0, "encrypt")?.to_string();
    let level = want_int(args, 1, "encrypt")?;
    if !(1..=10).contains(&level) {
        return Err(RuntimeError::new("encrypt() level must be 1-10"));
    }

    let skill = state.player.effective_skill(Skill::Cryptography);
    if skill < level as f64 {
        return Ok(CallOutcome::failed(format!(
            "You cannot hold a level-{} cipher together yet.",
            level
        )));
    }

    // Player-facing flavor; the ciphertext is not stored anywhere.
    let mangled: String = data.chars().rev().collect();
    Ok(CallOutcome::ok(format!(
        "Encrypted at level {}: {}",
        level, mangled
    )))
}

/// `extract(data_type)` — requires a prior foothold.
fn builtin_extract(state: &mut GameState, args: &[Value]) -> Result<CallOutcome, RuntimeError> {
    let data_type = want_str(args, 0, "extract")?.to_string();
    want_connected(state, "extract")?;

    let has_access = state
        .current_node()
        .map(|n| n.has_any_access())
        .unwrap_or(false);
    if !has_access {
        return Ok(CallOutcome::failed(format!(
            "extract('{}'): insufficient access.",
            data_type
        )));
    }

    let cost = state.risk.extract_cost;
    state.increase_detection_level(cost);
    let menace = state.menace_for_current_target() * 0.5;
    if menace > 0.0 {
        state.increase_menace(menace);
    }

    Ok(CallOutcome::ok(format!(
        "Exfiltrated {} from the node. Copies are yours now.",
        data_type
    )))
}

/// `download(file)`
fn builtin_download(state: &mut GameState, args: &[Value]) -> Result<CallOutcome, RuntimeError> {
    let file = want_str(args, 0, "download")?.to_string();
    want_connected(state, "download")?;

    let has_access = state
        .current_node()
        .map(|n| n.has_any_access())
        .unwrap_or(false);
    if !has_access {
        return Ok(CallOutcome::failed(format!(
            "download('{}'): insufficient access.",
            file
        )));
    }

    let contents = state
        .current_node()
        .and_then(|n| n.files.get(&file).cloned());
    let Some(contents) = contents else {
        return Ok(CallOutcome::failed(format!("No file '{}' here.", file)));
    };

    let cost = state.risk.download_cost;
    state.increase_detection_level(cost);

    Ok(CallOutcome::ok_lines(vec![
        format!("Downloaded '{}':", file),
        format!("  {}", contents.lines().next().unwrap_or("")),
    ]))
}

/// `ls()`
fn builtin_ls(state: &mut GameState, _args: &[Value]) -> Result<CallOutcome, RuntimeError> {
    want_connected(state, "ls")?;
    let Some(node) = state.current_node() else {
        return Err(RuntimeError::new("ls() requires an active connection"));
    };
    let mut output = vec![format!("Files on {}:", node.name)];
    for name in node.files.keys() {
        output.push(format!("  {}", name));
    }
    for id in node.encrypted_data.keys() {
        output.push(format!("  {} (encrypted)", id));
    }
    Ok(CallOutcome::ok_lines(output))
}

// ── Evasion ────────────────────────────────────────────────────

/// `bypass(security_type)` — four named sub-operations, each with its
/// own skill check and side effects. `tracks` and `logs` are the only
/// ways scripts lower the menace meter.
fn builtin_bypass(state: &mut GameState, args: &[Value]) -> Result<CallOutcome, RuntimeError> {
    let security_type = want_str(args, 0, "bypass")?.to_string();

    match security_type.as_str() {
        "firewall" => {
            want_connected(state, "bypass")?;
            let (security, active) = match state.current_node() {
                Some(node) => (node.security_level, node.firewall_active),
                None => return Err(RuntimeError::new("bypass() requires a connection")),
            };
            if !active {
                return Ok(CallOutcome::ok("The firewall is already down."));
            }
            let skill = state.player.effective_skill(Skill::Exploitation);
            let chance = (0.4 + (skill - security as f64) * 0.1).clamp(0.05, 0.95);
            if state.chance(chance) {
                if let Some(node) = state.current_node_mut() {
                    node.firewall_active = false;
                }
                state.increase_detection_level(2.0);
                Ok(CallOutcome::ok("Firewall rules rewritten. You are invisible to it."))
            } else {
                let penalty = state.risk.bypass_failure;
                state.increase_detection_level(penalty);
                Ok(CallOutcome::failed("The firewall shrugged you off."))
            }
        }
        "ids" | "intrusion_detection" => {
            want_connected(state, "bypass")?;
            let skill = state.player.effective_skill(Skill::Anonymity);
            let chance = (0.35 + skill * 0.06).clamp(0.05, 0.95);
            if state.chance(chance) {
                state.detection_multiplier = 0.5;
                state.set_damp_timer(10);
                state.increase_detection_level(1.0);
                Ok(CallOutcome::ok(
                    "IDS signatures poisoned. Your traffic reads as noise for a while.",
                ))
            } else {
                let penalty = state.risk.bypass_failure;
                state.increase_detection_level(penalty);
                Ok(CallOutcome::failed("The IDS flagged your evasion attempt."))
            }
        }
        "logs" => {
            want_connected(state, "bypass")?;
            let skill = state.player.effective_skill(Skill::Forensics);
            let chance = (0.35 + skill * 0.06).clamp(0.05, 0.95);
            if state.chance(chance) {
                state.decrease_detection_level(10.0);
                state.decrease_menace(2.0);
                Ok(CallOutcome::ok("Audit logs scrubbed. The trail thins."))
            } else {
                let penalty = state.risk.bypass_failure;
                state.increase_detection_level(penalty);
                Ok(CallOutcome::failed(
                    "You tripped a canary entry while editing the logs.",
                ))
            }
        }
        "tracks" => {
            let skill = state.player.effective_skill(Skill::Anonymity);
            let chance = (0.4 + skill * 0.06).clamp(0.05, 0.95);
            if state.chance(chance) {
                state.decrease_menace(8.0);
                Ok(CallOutcome::ok(
                    "Old handles burned, relays rotated. Your name means less out there.",
                ))
            } else {
                let penalty = state.risk.bypass_failure;
                state.increase_detection_level(penalty);
                Ok(CallOutcome::failed("Someone archived what you tried to erase."))
            }
        }
        other => Err(RuntimeError::new(format!(
            "bypass() unknown security type '{}' (firewall, ids, logs, tracks)",
            other
        ))),
    }
}

/// `setup_proxy()` — route traffic through a disposable relay.
fn builtin_setup_proxy(state: &mut GameState, _args: &[Value]) -> Result<CallOutcome, RuntimeError> {
    let skill = state.player.effective_skill(Skill::Anonymity);
    let chance = (0.5 + skill * 0.05).clamp(0.05, 0.95);
    if state.chance(chance) {
        state.decrease_menace(4.0);
        state.decrease_detection_level(5.0);
        Ok(CallOutcome::ok("Proxy chain up. Your origin is three hops of nowhere."))
    } else {
        state.increase_detection_level(3.0);
        Ok(CallOutcome::failed("The relay leaked your real address briefly."))
    }
}

// ── Social ─────────────────────────────────────────────────────

const TECHNIQUES: &[(&str, f64)] = &[
    ("phishing", 0.10),
    ("pretexting", 0.0),
    ("baiting", -0.05),
    ("tailgating", -0.10),
    ("quid_pro_quo", 0.05),
];

/// `social_engineer(target, technique, info?)`
fn builtin_social_engineer(
    state: &mut GameState,
    args: &[Value],
) -> Result<CallOutcome, RuntimeError> {
    let target = want_str(args, 0, "social_engineer")?.to_string();
    let technique = want_str(args, 1, "social_engineer")?.to_string();
    let info = args.get(2).map(|v| v.to_string());

    let Some((_, modifier)) = TECHNIQUES.iter().find(|(name, _)| *name == technique) else {
        let known: Vec<&str> = TECHNIQUES.iter().map(|(n, _)| *n).collect();
        return Err(RuntimeError::new(format!(
            "social_engineer() unknown technique '{}' ({})",
            technique,
            known.join(", ")
        )));
    };

    let attempt = state.risk.social_attempt;
    state.increase_detection_level(attempt);

    let skill = state.player.effective_skill(Skill::SocialEngineering);
    let chance = (0.3 + skill * 0.05 + modifier).clamp(0.05, 0.95);

    if state.chance(chance) {
        // A named node's operator giving things up is a data foothold.
        let is_node = state
            .network
            .as_ref()
            .map(|n| n.node(&target).is_some())
            .unwrap_or(false);
        if is_node {
            if let Some(network) = state.network.as_mut() {
                if let Some(node) = network.node_mut(&target) {
                    node.apply_effect(hs_sim::VulnEffect::DataAccess);
                }
            }
        }
        let high_value = state
            .network
            .as_ref()
            .map(|n| n.network_type.is_high_value())
            .unwrap_or(false);
        if high_value {
            state.increase_menace(2.0);
        }
        let mut line = format!("{} fell for the {}.", target, technique);
        if let Some(info) = info {
            line.push_str(&format!(" You now know: {}.", info));
        }
        Ok(CallOutcome::ok(line))
    } else {
        let penalty = state.risk.social_failure;
        state.increase_detection_level(penalty);
        Ok(CallOutcome::failed(format!(
            "{} did not bite. They may report the attempt.",
            target
        )))
    }
}

// ── Meta ───────────────────────────────────────────────────────

const MAX_SLEEP_SECONDS: f64 = 5.0;

/// `sleep(seconds)` — blocks the single thread, capped. A pacing
/// device, not concurrency.
fn builtin_sleep(args: &[Value]) -> Result<CallOutcome, RuntimeError> {
    let seconds = want_number(args, 0, "sleep")?;
    if seconds < 0.0 {
        return Err(RuntimeError::new("sleep() duration must be non-negative"));
    }
    let capped = seconds.min(MAX_SLEEP_SECONDS);
    if capped > 0.0 {
        std::thread::sleep(Duration::from_secs_f64(capped));
    }
    Ok(CallOutcome::ok(format!("Slept {}s.", capped)))
}

/// `status()`
fn builtin_status(state: &mut GameState, _args: &[Value]) -> Result<CallOutcome, RuntimeError> {
    let mut output = Vec::new();
    match (state.network.as_ref(), state.current_node()) {
        (Some(network), Some(node)) => output.push(format!(
            "Connected to {} on {} ({}).",
            node.name,
            network.name,
            network.network_type.name()
        )),
        (Some(network), None) => {
            output.push(format!("On {} — not connected to a node.", network.name))
        }
        _ => output.push("No active network.".to_string()),
    }
    output.push(format!(
        "detection {:.1}  menace {:.1}  trace protection {:.1}",
        state.detection_level, state.player.menace_level, state.player.trace_protection
    ));
    output.push(format!(
        "money ${}  reputation {}  {} proficiency {:.2}",
        state.player.money,
        state.player.reputation,
        state.active_dialect,
        state.player.proficiency(state.active_dialect)
    ));
    if !state.player.pending_ransoms.is_empty() {
        output.push(format!(
            "pending ransoms: {}",
            state.player.pending_ransoms.len()
        ));
    }
    Ok(CallOutcome::ok_lines(output))
}

/// `print(values...)` / `echo(values...)`
fn builtin_print(args: &[Value]) -> Result<CallOutcome, RuntimeError> {
    let line = args
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    Ok(CallOutcome::ok(line))
}
