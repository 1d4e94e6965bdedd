use crate::player::{RansomDemand, Skill};
use crate::state::GameState;

// ── Tuning ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AdversaryTuning {
    /// No white-hat roll below this menace level.
    pub white_hat_min_menace: f64,
    /// No black-hat roll below this menace level.
    pub black_hat_min_menace: f64,
    /// Probability gained per menace point above the respective minimum.
    pub white_hat_ramp: f64,
    pub black_hat_ramp: f64,
    /// Money at or above this marks the player as a lucrative target.
    pub wealth_threshold: i64,
    pub wealth_bonus: f64,
    /// Flat probability bonus while worm propagation is a live activity.
    pub worm_bonus: f64,
    /// Flat white-hat bonus per live institutional activity tag.
    pub institutional_bonus: f64,
    /// Equipment contribution to the defense score, per item.
    pub equipment_bonus: f64,
    /// Menace level at which failed black-hat defenses may leave a
    /// ransom demand behind.
    pub ransom_menace_threshold: f64,
    pub ransom_chance: f64,
}

impl Default for AdversaryTuning {
    fn default() -> Self {
        Self {
            white_hat_min_menace: 20.0,
            black_hat_min_menace: 50.0,
            white_hat_ramp: 0.005,
            black_hat_ramp: 0.006,
            wealth_threshold: 10_000,
            wealth_bonus: 0.10,
            worm_bonus: 0.15,
            institutional_bonus: 0.05,
            equipment_bonus: 2.0,
            ransom_menace_threshold: 70.0,
            ransom_chance: 0.5,
        }
    }
}

// ── Events ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackKind {
    /// Institutional detection/tracking: agencies and security firms.
    WhiteHat,
    /// Rival attackers after money, software, and scripts.
    BlackHat,
}

#[derive(Debug, Clone)]
pub struct AdversarialEvent {
    pub kind: AttackKind,
    pub defended: bool,
    pub attacker_skill: f64,
    pub defense_score: f64,
}

// ── Resolution ──────────────────────────────────────────────────

/// Roll for and resolve an adversarial counter-event.
///
/// Black-hat takes precedence over white-hat; below both menace
/// minimums nothing can happen. Consequences are applied to the state
/// directly; the returned event is for callers that want to inspect
/// the outcome (mostly tests).
pub fn poll_adversarial_event(state: &mut GameState) -> Option<AdversarialEvent> {
    if state.polling {
        return None;
    }
    state.polling = true;
    let event = roll_and_resolve(state);
    state.polling = false;
    event
}

fn roll_and_resolve(state: &mut GameState) -> Option<AdversarialEvent> {
    let kind = determine_kind(state)?;
    let attacker_skill = synthesize_attacker(state, kind);
    let defense_score = defense_score(state, kind);
    let defended = defense_score >= attacker_skill;

    if defended {
        resolve_defended(state, kind);
    } else {
        resolve_breached(state, kind);
    }

    Some(AdversarialEvent {
        kind,
        defended,
        attacker_skill,
        defense_score,
    })
}

fn determine_kind(state: &mut GameState) -> Option<AttackKind> {
    let menace = state.player.menace_level;
    let tuning = state.adversary.clone();

    if menace >= tuning.black_hat_min_menace {
        let mut chance = (menace - tuning.black_hat_min_menace) * tuning.black_hat_ramp;
        if state.player.money >= tuning.wealth_threshold {
            chance += tuning.wealth_bonus;
        }
        if state.player.has_recent_activity("worm_propagation") {
            chance += tuning.worm_bonus;
        }
        if state.chance(chance) {
            return Some(AttackKind::BlackHat);
        }
    }

    if menace >= tuning.white_hat_min_menace {
        let mut chance = (menace - tuning.white_hat_min_menace) * tuning.white_hat_ramp;
        for tag in ["government_hack", "bank_hack", "malware_deployment"] {
            if state.player.has_recent_activity(tag) {
                chance += tuning.institutional_bonus;
            }
        }
        if state.chance(chance) {
            return Some(AttackKind::WhiteHat);
        }
    }

    None
}

fn synthesize_attacker(state: &mut GameState, kind: AttackKind) -> f64 {
    let menace = state.player.menace_level;
    match kind {
        AttackKind::WhiteHat => menace / 10.0 + state.roll_f64(0.0, 5.0),
        AttackKind::BlackHat => {
            let mut skill = menace / 8.0 + state.roll_f64(0.0, 6.0);
            if state.player.money >= state.adversary.wealth_threshold {
                skill += 1.0;
            }
            if state.player.has_recent_activity("malware_deployment") {
                skill += 1.0;
            }
            skill
        }
    }
}

fn defense_score(state: &GameState, kind: AttackKind) -> f64 {
    let player = &state.player;
    let bonus = state.adversary.equipment_bonus;
    let mut score = player.effective_skill(Skill::CounterHacking)
        + player.effective_skill(Skill::Anonymity)
        + player.trace_protection;
    if player.equipment.vpn {
        score += bonus;
    }
    if player.equipment.firewall {
        score += bonus;
    }
    if kind == AttackKind::BlackHat && player.equipment.antivirus {
        score += bonus;
    }
    score
}

// ── Consequences ────────────────────────────────────────────────

fn resolve_defended(state: &mut GameState, kind: AttackKind) {
    state.player.trace_protection = (state.player.trace_protection + 1.0).min(10.0);
    if state.chance(0.4) {
        state.player.raise_skill(Skill::CounterHacking, 1.0);
        state.push_event("Fending off the attack taught you something (counter-hacking improved).".to_string());
    }

    match kind {
        AttackKind::WhiteHat => {
            state.push_event(
                "[DEFENDED] An investigation probed your traffic and found nothing. Trace protection improved."
                    .to_string(),
            );
        }
        AttackKind::BlackHat => {
            state.push_event(
                "[DEFENDED] A rival crew came for your stash and bounced off. Trace protection improved."
                    .to_string(),
            );
            if state.chance(0.3) {
                state.push_event(
                    "You traced the attack back and logged the rival's infrastructure.".to_string(),
                );
            } else if state.chance(0.3) {
                let sw = state.player.software_bonus(Skill::CounterHacking) + 0.5;
                state.player.set_software_bonus(Skill::CounterHacking, sw);
                state.push_event(
                    "You kept a copy of their toolkit (counter-hacking software improved).".to_string(),
                );
            }
        }
    }
}

fn resolve_breached(state: &mut GameState, kind: AttackKind) {
    let menace = state.player.menace_level;
    match kind {
        AttackKind::WhiteHat => {
            state.detection_level = (state.detection_level + 20.0).clamp(0.0, 100.0);
            state.push_event(
                "[BREACH] Investigators linked recent intrusions to you. Detection spiked.".to_string(),
            );
            if menace >= 60.0 {
                state.player.money = (state.player.money - 500).max(0);
                state.player.reputation -= 3;
                state.push_event(
                    "Legal fees and a burned alias cost you $500 and some standing.".to_string(),
                );
            }
            if menace >= 80.0 && !state.player.scripts.is_empty() {
                let idx = state.roll_index(state.player.scripts.len());
                let script = state.player.scripts.remove(idx);
                state.push_event(format!(
                    "A raid on a storage locker cost you the '{}' script.",
                    script
                ));
            }
        }
        AttackKind::BlackHat => {
            let cut = if menace >= 85.0 {
                0.30
            } else if menace >= 65.0 {
                0.20
            } else {
                0.10
            };
            let stolen = (state.player.money as f64 * cut) as i64;
            state.player.money -= stolen;
            state.push_event(format!(
                "[BREACH] A rival crew cleaned out part of your accounts (${} stolen).",
                stolen
            ));

            if menace >= 65.0 {
                if !state.player.scripts.is_empty() {
                    let idx = state.roll_index(state.player.scripts.len());
                    let script = state.player.scripts.remove(idx);
                    state.push_event(format!("They copied and wiped your '{}' script.", script));
                } else {
                    let sw = (state.player.software_bonus(Skill::Exploitation) - 1.0).max(0.0);
                    state.player.set_software_bonus(Skill::Exploitation, sw);
                    state.push_event("They trashed your exploit toolchain (software bonus lost).".to_string());
                }
            }
            if menace >= 85.0 {
                let dialect = state.active_dialect;
                state.player.lose_proficiency(dialect, 0.5);
                state.push_event(format!(
                    "Rebuilding from their sabotage set back your {} fluency.",
                    dialect
                ));
            }

            if menace >= state.adversary.ransom_menace_threshold
                && state.chance(state.adversary.ransom_chance)
            {
                let amount = 200 + (menace as i64) * 10;
                state.player.pending_ransoms.push(RansomDemand {
                    amount,
                    deadline: 20,
                    consequence: "Your stolen files were leaked.".into(),
                });
                state.push_event(format!(
                    "[RANSOM] They left a demand: ${} or your files go public.",
                    amount
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Network, NetworkNode, NetworkType};
    use crate::player::Player;

    fn state() -> GameState {
        let mut network = Network::new("CorpNet", NetworkType::Corporate, 3);
        network.nodes.push(NetworkNode::new("Gateway", "10.0.0.1", 4));
        network.entry_points.push("Gateway".into());
        let mut state = GameState::with_network(Player::new("ghost"), network);
        state.set_current_node("Gateway");
        state
    }

    #[test]
    fn no_events_at_zero_menace() {
        let mut state = state();
        state.reseed(1234);
        for _ in 0..500 {
            assert!(poll_adversarial_event(&mut state).is_none());
        }
    }

    #[test]
    fn no_black_hat_below_min_menace() {
        let mut state = state();
        state.reseed(99);
        state.player.menace_level = 49.0;
        // Stack every black-hat bonus; the menace gate must still hold.
        state.player.money = 1_000_000;
        state.player.record_activity("worm_propagation");
        for _ in 0..500 {
            if let Some(event) = poll_adversarial_event(&mut state) {
                assert_eq!(event.kind, AttackKind::WhiteHat);
            }
            state.player.menace_level = 49.0;
        }
    }

    #[test]
    fn black_hat_takes_precedence_at_high_menace() {
        let mut state = state();
        state.reseed(7);
        state.player.menace_level = 100.0;
        state.player.money = 1_000_000;
        state.player.record_activity("worm_propagation");
        // With menace 100: black chance = 50*0.006 + 0.10 + 0.15 = 0.55.
        let mut kinds = Vec::new();
        for _ in 0..200 {
            if let Some(event) = poll_adversarial_event(&mut state) {
                kinds.push(event.kind);
            }
            state.player.menace_level = 100.0;
        }
        assert!(kinds.iter().any(|k| *k == AttackKind::BlackHat));
    }

    #[test]
    fn strong_defense_always_holds() {
        let mut state = state();
        state.reseed(11);
        state.player.menace_level = 55.0;
        state.player.set_skill(Skill::CounterHacking, 10.0);
        state.player.set_skill(Skill::Anonymity, 10.0);
        state.player.trace_protection = 10.0;
        state.player.equipment.vpn = true;
        state.player.equipment.firewall = true;
        state.player.equipment.antivirus = true;
        // Max attacker skill: 100/8 + 6 + 1 + 1 = 20.5 < defense 36.
        for _ in 0..300 {
            if let Some(event) = poll_adversarial_event(&mut state) {
                assert!(event.defended, "defense {} vs attacker {}", event.defense_score, event.attacker_skill);
            }
            state.player.menace_level = 55.0;
            state.player.trace_protection = 10.0;
        }
    }

    #[test]
    fn defenseless_high_menace_breach_steals_money() {
        let mut state = state();
        state.reseed(21);
        state.player.menace_level = 100.0;
        state.player.money = 100_000;
        // Force a black-hat roll and a hopeless defense.
        state.adversary.black_hat_ramp = 1.0;
        state.player.set_skill(Skill::CounterHacking, 0.0);
        state.player.set_skill(Skill::Anonymity, 0.0);

        let event = poll_adversarial_event(&mut state).expect("forced black-hat event");
        assert_eq!(event.kind, AttackKind::BlackHat);
        assert!(!event.defended);
        assert!(state.player.money < 100_000);
    }

    #[test]
    fn failed_defense_at_high_menace_can_enqueue_ransom() {
        let mut state = state();
        state.reseed(31);
        state.player.menace_level = 90.0;
        state.player.money = 50_000;
        state.adversary.black_hat_ramp = 1.0;
        state.adversary.ransom_chance = 1.0;
        state.player.set_skill(Skill::CounterHacking, 0.0);
        state.player.set_skill(Skill::Anonymity, 0.0);

        let event = poll_adversarial_event(&mut state).expect("forced black-hat event");
        assert!(!event.defended);
        assert_eq!(state.player.pending_ransoms.len(), 1);
        assert!(state.player.pending_ransoms[0].amount > 0);
    }

    #[test]
    fn defended_attack_raises_trace_protection() {
        let mut state = state();
        state.reseed(41);
        state.player.menace_level = 60.0;
        state.adversary.white_hat_ramp = 1.0;
        state.adversary.black_hat_ramp = 0.0;
        state.player.set_skill(Skill::CounterHacking, 10.0);
        state.player.set_skill(Skill::Anonymity, 10.0);
        state.player.equipment.vpn = true;
        state.player.equipment.firewall = true;

        let before = state.player.trace_protection;
        let event = poll_adversarial_event(&mut state).expect("forced white-hat event");
        assert!(event.defended);
        assert_eq!(state.player.trace_protection, before + 1.0);
    }

    #[test]
    fn poll_guard_blocks_reentry() {
        let mut state = state();
        state.player.menace_level = 100.0;
        state.adversary.white_hat_ramp = 1.0;
        state.polling = true;
        assert!(poll_adversarial_event(&mut state).is_none());
    }
}
