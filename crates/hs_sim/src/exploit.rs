use crate::player::Skill;
use crate::state::GameState;

// ── Tuning ──────────────────────────────────────────────────────

/// Constants for the probabilistic exploit roll and its detection
/// penalties. Ordering invariant: `attempt < failure < missing_vuln <
/// wrong_payload`.
#[derive(Debug, Clone)]
pub struct ExploitTuning {
    pub base_chance: f64,
    pub per_skill_point: f64,
    pub min_chance: f64,
    pub max_chance: f64,

    pub attempt_detection: f64,
    pub failure_detection: f64,
    pub missing_vuln_detection: f64,
    pub wrong_payload_detection: f64,
}

impl Default for ExploitTuning {
    fn default() -> Self {
        Self {
            base_chance: 0.3,
            per_skill_point: 0.1,
            min_chance: 0.1,
            max_chance: 0.9,
            attempt_detection: 3.0,
            failure_detection: 8.0,
            missing_vuln_detection: 10.0,
            wrong_payload_detection: 12.0,
        }
    }
}

/// Probability of a successful exploit given effective skill against a
/// difficulty rating. Monotone non-decreasing in skill, clamped.
pub fn success_chance(effective_skill: f64, exploit_difficulty: u8, tuning: &ExploitTuning) -> f64 {
    let raw =
        tuning.base_chance + (effective_skill - exploit_difficulty as f64) * tuning.per_skill_point;
    raw.clamp(tuning.min_chance, tuning.max_chance)
}

// ── Resolution ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ExploitOutcome {
    /// The effect was applied (or already held, idempotently).
    Success {
        message: String,
        already_applied: bool,
    },
    /// The roll failed.
    Failure,
    /// No vulnerability of that name on the current node.
    MissingVulnerability,
    /// Payload tag did not match the vulnerability's requirement.
    WrongPayload { expected: String },
}

/// Resolve an exploit attempt against the current node.
///
/// The caller guarantees an active connection. All detection and menace
/// side effects are applied here; the caller only formats output.
pub fn resolve_exploit(state: &mut GameState, vuln_name: &str, payload: &str) -> ExploitOutcome {
    let Some(node) = state.current_node() else {
        return ExploitOutcome::MissingVulnerability;
    };
    let node_name = node.name.to_string();
    let Some(vuln) = node.vulnerability(vuln_name).cloned() else {
        let penalty = state.exploit.missing_vuln_detection;
        state.increase_detection_level(penalty);
        return ExploitOutcome::MissingVulnerability;
    };

    if vuln.required_payload != payload {
        let penalty = state.exploit.wrong_payload_detection;
        state.increase_detection_level(penalty);
        return ExploitOutcome::WrongPayload {
            expected: vuln.required_payload,
        };
    }

    let attempt = state.exploit.attempt_detection;
    state.increase_detection_level(attempt);

    // Language proficiency in the active dialect sharpens the exploit,
    // half a point of skill per two points of proficiency.
    let proficiency_bonus = (state.player.proficiency(state.active_dialect) / 2.0).floor();
    let skill = state.player.effective_skill(Skill::Exploitation) + proficiency_bonus;
    let chance = success_chance(skill, vuln.exploit_difficulty, &state.exploit);

    if state.chance(chance) {
        let applied = state
            .current_node_mut()
            .map(|node| node.apply_effect(vuln.effect))
            .unwrap_or(false);

        let menace = state.menace_for_current_target();
        if menace > 0.0 {
            state.increase_menace(menace);
        }
        // The tag alone (no extra menace) biases later adversarial
        // rolls; the fixed-delta channel is register_activity.
        match state.network.as_ref().map(|n| n.network_type) {
            Some(crate::network::NetworkType::Government)
            | Some(crate::network::NetworkType::Military) => {
                state.player.record_activity("government_hack");
            }
            Some(crate::network::NetworkType::Financial) => {
                state.player.record_activity("bank_hack");
            }
            _ => {}
        }
        if vuln.leaks_data {
            state.check_data_leaks(&node_name, &vuln.name);
        }

        ExploitOutcome::Success {
            message: vuln.success_message,
            already_applied: !applied,
        }
    } else {
        let penalty = state.exploit.failure_detection;
        state.increase_detection_level(penalty);
        ExploitOutcome::Failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Network, NetworkNode, NetworkType, VulnEffect, Vulnerability};
    use crate::player::Player;

    fn state() -> GameState {
        let mut node = NetworkNode::new("Gateway", "10.0.0.1", 2);
        node.vulnerabilities.push(Vulnerability {
            name: "weak_password".into(),
            detection_difficulty: 1,
            exploit_difficulty: 2,
            required_payload: "ssh_login".into(),
            effect: VulnEffect::RootAccess,
            success_message: "Password cracked.".into(),
            leaks_data: false,
        });
        let mut network = Network::new("TutorialNet", NetworkType::University, 2);
        network.nodes.push(node);
        network.entry_points.push("Gateway".into());
        let mut state = GameState::with_network(Player::new("ghost"), network);
        state.set_current_node("Gateway");
        state
    }

    #[test]
    fn chance_is_monotone_in_skill() {
        let tuning = ExploitTuning::default();
        let mut previous = 0.0;
        for skill in 0..=10 {
            let chance = success_chance(skill as f64, 5, &tuning);
            assert!(chance >= previous, "chance dropped at skill {}", skill);
            previous = chance;
        }
    }

    #[test]
    fn chance_is_clamped() {
        let tuning = ExploitTuning::default();
        assert_eq!(success_chance(0.0, 10, &tuning), 0.1);
        assert_eq!(success_chance(10.0, 1, &tuning), 0.9);
    }

    #[test]
    fn chance_matches_formula_midrange() {
        let tuning = ExploitTuning::default();
        // 0.3 + (5 - 3) * 0.1 = 0.5
        assert!((success_chance(5.0, 3, &tuning) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn wrong_payload_never_applies_effect() {
        let mut state = state();
        state.reseed(1);
        for _ in 0..50 {
            let outcome = resolve_exploit(&mut state, "weak_password", "usb_drop");
            assert!(matches!(outcome, ExploitOutcome::WrongPayload { .. }));
            assert!(!state.current_node().unwrap().root_access);
            // Keep the session alive for the next round.
            state.detection_level = 0.0;
        }
    }

    #[test]
    fn wrong_payload_costs_more_than_failed_roll() {
        let tuning = ExploitTuning::default();
        assert!(tuning.wrong_payload_detection > tuning.failure_detection);
        assert!(tuning.failure_detection > tuning.attempt_detection);
        assert!(tuning.missing_vuln_detection > tuning.attempt_detection);
    }

    #[test]
    fn missing_vulnerability_raises_detection() {
        let mut state = state();
        let outcome = resolve_exploit(&mut state, "heartbleed", "ssh_login");
        assert_eq!(outcome, ExploitOutcome::MissingVulnerability);
        assert!(state.detection_level > 0.0);
    }

    #[test]
    fn success_is_sticky_across_repeats() {
        let mut state = state();
        // Guarantee success on every roll.
        state.exploit.min_chance = 1.0;
        state.exploit.max_chance = 1.0;
        state.reseed(42);

        let first = resolve_exploit(&mut state, "weak_password", "ssh_login");
        assert!(matches!(
            first,
            ExploitOutcome::Success {
                already_applied: false,
                ..
            }
        ));
        assert!(state.current_node().unwrap().root_access);

        state.detection_level = 0.0;
        let second = resolve_exploit(&mut state, "weak_password", "ssh_login");
        assert!(matches!(
            second,
            ExploitOutcome::Success {
                already_applied: true,
                ..
            }
        ));
        assert!(state.current_node().unwrap().root_access);
    }

    #[test]
    fn failure_penalty_sits_between_attempt_and_wrong_payload() {
        let mut state = state();
        // Guarantee failure on every roll.
        state.exploit.min_chance = 0.0;
        state.exploit.max_chance = 0.0;
        state.reseed(9);
        // Neutralize damping for exact accounting.
        state.risk.anonymity_damp_per_point = 0.0;

        let outcome = resolve_exploit(&mut state, "weak_password", "ssh_login");
        assert_eq!(outcome, ExploitOutcome::Failure);
        let expected = state.exploit.attempt_detection + state.exploit.failure_detection;
        assert!((state.detection_level - expected).abs() < 1e-9);
    }

    #[test]
    fn high_value_success_raises_menace() {
        let mut state = state();
        state.network.as_mut().unwrap().network_type = NetworkType::Government;
        state.exploit.min_chance = 1.0;
        state.exploit.max_chance = 1.0;
        state.reseed(3);

        resolve_exploit(&mut state, "weak_password", "ssh_login");
        // Security 2 * government factor 1.8.
        assert!((state.player.menace_level - 3.6).abs() < 1e-9);
    }

    #[test]
    fn leaky_vulnerability_completes_missions() {
        let mut state = state();
        state
            .current_node_mut()
            .unwrap()
            .vulnerabilities
            .push(Vulnerability {
                name: "sql_injection".into(),
                detection_difficulty: 3,
                exploit_difficulty: 3,
                required_payload: "sql_payload".into(),
                effect: VulnEffect::DataAccess,
                success_message: "Dumped the users table.".into(),
                leaks_data: true,
            });
        state.missions.push(crate::state::Mission::new(
            "Leaky Faucet",
            &["Expose customer data through sql_injection"],
        ));
        state.exploit.min_chance = 1.0;
        state.exploit.max_chance = 1.0;
        state.reseed(5);

        resolve_exploit(&mut state, "sql_injection", "sql_payload");
        assert!(state.missions[0].is_complete());
    }
}
