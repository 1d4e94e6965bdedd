use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::adversary::AdversaryTuning;
use crate::dialect::DialectId;
use crate::exploit::ExploitTuning;
use crate::network::{Network, NetworkNode};
use crate::player::Player;
use crate::risk::RiskTuning;

// ── Missions ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MissionObjective {
    pub description: String,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct Mission {
    pub name: String,
    pub objectives: Vec<MissionObjective>,
}

impl Mission {
    pub fn new(name: impl Into<String>, objectives: &[&str]) -> Self {
        Self {
            name: name.into(),
            objectives: objectives
                .iter()
                .map(|d| MissionObjective {
                    description: (*d).to_string(),
                    completed: false,
                })
                .collect(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.objectives.iter().all(|o| o.completed)
    }
}

// ── GameState ───────────────────────────────────────────────────

/// The single shared mutable simulation. One instance per game
/// session; every builtin runs with exclusive `&mut` access
/// (single-threaded, no locking).
#[derive(Debug)]
pub struct GameState {
    pub network: Option<Network>,
    current_node: Option<String>,
    pub player: Player,
    pub active_dialect: DialectId,

    /// Session-scoped risk of being noticed, 0-100.
    pub detection_level: f64,
    /// Global scale on detection deltas. Lowered temporarily by IDS
    /// bypass, raised temporarily after a high-alert threshold crossing.
    pub detection_multiplier: f64,
    pub(crate) alert_commands_left: u32,
    pub(crate) damp_commands_left: u32,

    pub missions: Vec<Mission>,

    pub risk: RiskTuning,
    pub exploit: ExploitTuning,
    pub adversary: AdversaryTuning,

    /// Player-visible warnings produced by the risk machine and the
    /// adversarial resolver. Drained into interpreter output.
    events: Vec<String>,
    commands: u64,
    /// Re-entrancy guard: consequences of an adversarial event must not
    /// trigger another poll.
    pub(crate) polling: bool,

    rng: StdRng,
}

impl GameState {
    pub fn new(player: Player) -> Self {
        Self {
            network: None,
            current_node: None,
            player,
            active_dialect: DialectId::NovaSec,
            detection_level: 0.0,
            detection_multiplier: 1.0,
            alert_commands_left: 0,
            damp_commands_left: 0,
            missions: Vec::new(),
            risk: RiskTuning::default(),
            exploit: ExploitTuning::default(),
            adversary: AdversaryTuning::default(),
            events: Vec::new(),
            commands: 0,
            polling: false,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_network(player: Player, network: Network) -> Self {
        let mut state = Self::new(player);
        state.network = Some(network);
        state
    }

    /// Reseed the session RNG for deterministic runs.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    // ── RNG draws ───────────────────────────────────────────────
    //
    // All randomness flows through these so a seeded session is fully
    // deterministic.

    /// Bernoulli draw with probability clamped to [0, 1].
    pub fn chance(&mut self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.rng.random_bool(p)
    }

    pub fn roll_f64(&mut self, lo: f64, hi: f64) -> f64 {
        if lo >= hi {
            return lo;
        }
        self.rng.random_range(lo..hi)
    }

    pub fn roll_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.random_range(0..len)
    }

    // ── Node access ─────────────────────────────────────────────

    pub fn current_node_name(&self) -> Option<&str> {
        self.current_node.as_deref()
    }

    pub fn current_node(&self) -> Option<&NetworkNode> {
        let name = self.current_node.as_deref()?;
        self.network.as_ref()?.node(name)
    }

    pub fn current_node_mut(&mut self) -> Option<&mut NetworkNode> {
        let name = self.current_node.clone()?;
        self.network.as_mut()?.node_mut(&name)
    }

    pub fn set_current_node(&mut self, name: impl Into<String>) {
        self.current_node = Some(name.into());
    }

    /// Temporarily damp detection (IDS bypass). The caller sets the
    /// multiplier; this arms the restore timer.
    pub fn set_damp_timer(&mut self, commands: u32) {
        self.damp_commands_left = commands;
    }

    /// Drop the connection and reset session-scoped detection.
    pub fn disconnect(&mut self) {
        self.current_node = None;
        self.detection_level = 0.0;
        self.detection_multiplier = 1.0;
        self.alert_commands_left = 0;
        self.damp_commands_left = 0;
    }

    /// Forced eviction: clear the session entirely and leave detection
    /// at a moderate baseline rather than zero.
    pub(crate) fn clear_session(&mut self) {
        self.current_node = None;
        self.network = None;
        self.detection_multiplier = 1.0;
        self.alert_commands_left = 0;
        self.damp_commands_left = 0;
    }

    // ── Events ──────────────────────────────────────────────────

    pub fn push_event(&mut self, line: impl Into<String>) {
        self.events.push(line.into());
    }

    pub fn take_events(&mut self) -> Vec<String> {
        std::mem::take(&mut self.events)
    }

    // ── Command ticks ───────────────────────────────────────────

    pub fn command_count(&self) -> u64 {
        self.commands
    }

    /// Advance the per-command clock: ages timed modifiers, activity
    /// tags, and ransom deadlines, and runs the periodic adversarial
    /// poll.
    pub fn tick_command(&mut self) {
        self.commands += 1;

        if self.alert_commands_left > 0 {
            self.alert_commands_left -= 1;
            if self.alert_commands_left == 0 {
                self.detection_multiplier = 1.0;
                self.push_event("The network's alert posture relaxes.".to_string());
            }
        }
        if self.damp_commands_left > 0 {
            self.damp_commands_left -= 1;
            if self.damp_commands_left == 0 && self.alert_commands_left == 0 {
                self.detection_multiplier = 1.0;
            }
        }

        self.player.decay_activities();
        self.expire_ransoms();

        if self.commands % self.risk.poll_interval == 0 {
            crate::adversary::poll_adversarial_event(self);
        }
    }

    fn expire_ransoms(&mut self) {
        let mut fired = Vec::new();
        for ransom in &mut self.player.pending_ransoms {
            ransom.deadline = ransom.deadline.saturating_sub(1);
            if ransom.deadline == 0 {
                fired.push(ransom.clone());
            }
        }
        self.player.pending_ransoms.retain(|r| r.deadline > 0);
        for ransom in fired {
            // Non-payment: the attacker follows through.
            self.player.money = (self.player.money - ransom.amount).max(0);
            self.player.increase_menace(10.0);
            self.push_event(format!(
                "[RANSOM] Deadline passed. {} Lost ${}.",
                ransom.consequence, ransom.amount
            ));
        }
    }

    /// Pay off a pending ransom by index.
    pub fn pay_ransom(&mut self, index: usize) -> Result<(), String> {
        let Some(ransom) = self.player.pending_ransoms.get(index) else {
            return Err(format!("no pending ransom #{}", index));
        };
        if self.player.money < ransom.amount {
            return Err(format!(
                "cannot afford ransom of ${} (have ${})",
                ransom.amount, self.player.money
            ));
        }
        let amount = ransom.amount;
        self.player.money -= amount;
        self.player.pending_ransoms.remove(index);
        self.push_event(format!("[RANSOM] Paid ${}. The demand is withdrawn.", amount));
        Ok(())
    }

    // ── Missions ────────────────────────────────────────────────

    /// Mark objectives satisfied by data leaked from `vuln_name` on
    /// `node_name`. Matches objectives whose description references the
    /// vulnerability by name.
    pub fn check_data_leaks(&mut self, node_name: &str, vuln_name: &str) {
        let mut satisfied = Vec::new();
        for mission in &mut self.missions {
            for objective in &mut mission.objectives {
                if !objective.completed && objective.description.contains(vuln_name) {
                    objective.completed = true;
                    satisfied.push(format!(
                        "[MISSION] {}: objective satisfied ({} @ {})",
                        mission.name, vuln_name, node_name
                    ));
                }
            }
        }
        for line in satisfied {
            self.push_event(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkType;

    fn state_with_node() -> GameState {
        let mut network = Network::new("TestNet", NetworkType::University, 2);
        network.nodes.push(NetworkNode::new("Gateway", "10.0.0.1", 2));
        network.entry_points.push("Gateway".into());
        GameState::with_network(Player::new("ghost"), network)
    }

    #[test]
    fn current_node_follows_connection() {
        let mut state = state_with_node();
        assert!(state.current_node().is_none());
        state.set_current_node("Gateway");
        assert_eq!(state.current_node().unwrap().name, "Gateway");
    }

    #[test]
    fn disconnect_resets_detection() {
        let mut state = state_with_node();
        state.set_current_node("Gateway");
        state.detection_level = 66.0;
        state.detection_multiplier = 1.5;
        state.disconnect();
        assert!(state.current_node().is_none());
        assert_eq!(state.detection_level, 0.0);
        assert_eq!(state.detection_multiplier, 1.0);
        // Network survives a plain disconnect.
        assert!(state.network.is_some());
    }

    #[test]
    fn seeded_rng_is_deterministic() {
        let mut a = state_with_node();
        let mut b = state_with_node();
        a.reseed(42);
        b.reseed(42);
        for _ in 0..32 {
            assert_eq!(a.chance(0.5), b.chance(0.5));
        }
    }

    #[test]
    fn chance_extremes_short_circuit() {
        let mut state = state_with_node();
        assert!(!state.chance(0.0));
        assert!(!state.chance(-1.0));
        assert!(state.chance(1.0));
        assert!(state.chance(2.0));
    }

    #[test]
    fn data_leak_marks_matching_objectives() {
        let mut state = state_with_node();
        state.missions.push(Mission::new(
            "First Blood",
            &["Leak credentials via sql_injection on the corporate gateway"],
        ));
        state.check_data_leaks("Gateway", "sql_injection");
        assert!(state.missions[0].is_complete());
        let events = state.take_events();
        assert_eq!(events.len(), 1);
        assert!(events[0].contains("First Blood"));
    }

    #[test]
    fn data_leak_ignores_unrelated_objectives() {
        let mut state = state_with_node();
        state
            .missions
            .push(Mission::new("Quiet Job", &["Extract the payroll database"]));
        state.check_data_leaks("Gateway", "sql_injection");
        assert!(!state.missions[0].is_complete());
    }

    #[test]
    fn ransom_expiry_applies_consequence() {
        let mut state = state_with_node();
        state.player.money = 1000;
        state.player.pending_ransoms.push(crate::player::RansomDemand {
            amount: 400,
            deadline: 2,
            consequence: "Your files were published.".into(),
        });
        state.tick_command();
        assert_eq!(state.player.pending_ransoms.len(), 1);
        state.tick_command();
        assert!(state.player.pending_ransoms.is_empty());
        assert_eq!(state.player.money, 600);
        assert!(state
            .take_events()
            .iter()
            .any(|e| e.contains("Deadline passed")));
    }

    #[test]
    fn pay_ransom_requires_funds() {
        let mut state = state_with_node();
        state.player.money = 100;
        state.player.pending_ransoms.push(crate::player::RansomDemand {
            amount: 400,
            deadline: 10,
            consequence: "x".into(),
        });
        assert!(state.pay_ransom(0).is_err());
        state.player.money = 500;
        assert!(state.pay_ransom(0).is_ok());
        assert_eq!(state.player.money, 100);
        assert!(state.player.pending_ransoms.is_empty());
    }
}
