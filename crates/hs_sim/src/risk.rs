use crate::state::GameState;

// ── Tuning ──────────────────────────────────────────────────────

/// Game-balance constants for the risk state machine. These values are
/// tuning, not algorithmic contracts; tests override them where
/// determinism matters.
#[derive(Debug, Clone)]
pub struct RiskTuning {
    /// Anonymity/VPN damping never reduces a detection delta below this
    /// fraction of the raw amount.
    pub detection_floor_factor: f64,
    /// Detection damping per point of effective anonymity skill.
    pub anonymity_damp_per_point: f64,
    /// Flat detection damping while a VPN is active.
    pub vpn_damp: f64,

    /// Crossing this level may harden the current node.
    pub hardening_threshold: f64,
    pub hardening_chance: f64,
    /// Crossing this level may put the network on high alert.
    pub alert_threshold: f64,
    pub alert_chance: f64,
    pub alert_multiplier: f64,
    pub alert_duration: u32,
    /// Reaching this level forces eviction.
    pub eviction_threshold: f64,
    /// Detection baseline after an eviction (moderate, not zero).
    pub eviction_baseline: f64,
    pub eviction_fine_per_difficulty: i64,
    pub eviction_reputation_loss: i64,

    /// Menace level where the adversarial probability ramp begins.
    pub menace_ramp_threshold: f64,
    /// Commands between periodic adversarial polls.
    pub poll_interval: u64,
    /// Single detection deltas at or above this trigger a synchronous
    /// adversarial poll.
    pub sync_poll_detection_delta: f64,
    /// Single menace deltas at or above this trigger a synchronous poll.
    pub sync_poll_menace_delta: f64,

    // Per-builtin detection deltas. Failure paths always cost more than
    // the success path of the same builtin.
    pub connect_success: f64,
    pub connect_invalid_port: f64,
    pub connect_unknown_target: f64,
    pub connect_closed_port: f64,
    pub scan_base: f64,
    pub probe_cost: f64,
    pub extract_cost: f64,
    pub download_cost: f64,
    pub decrypt_attempt: f64,
    pub social_attempt: f64,
    pub social_failure: f64,
    pub bypass_failure: f64,
}

impl Default for RiskTuning {
    fn default() -> Self {
        Self {
            detection_floor_factor: 0.25,
            anonymity_damp_per_point: 0.05,
            vpn_damp: 0.15,

            hardening_threshold: 50.0,
            hardening_chance: 0.3,
            alert_threshold: 75.0,
            alert_chance: 0.4,
            alert_multiplier: 1.5,
            alert_duration: 10,
            eviction_threshold: 90.0,
            eviction_baseline: 40.0,
            eviction_fine_per_difficulty: 150,
            eviction_reputation_loss: 5,

            menace_ramp_threshold: 40.0,
            poll_interval: 5,
            sync_poll_detection_delta: 15.0,
            sync_poll_menace_delta: 10.0,

            connect_success: 2.0,
            connect_invalid_port: 4.0,
            connect_unknown_target: 5.0,
            connect_closed_port: 6.0,
            scan_base: 6.0,
            probe_cost: 2.0,
            extract_cost: 4.0,
            download_cost: 3.0,
            decrypt_attempt: 2.0,
            social_attempt: 3.0,
            social_failure: 6.0,
            bypass_failure: 7.0,
        }
    }
}

/// Fixed menace deltas for named high-profile activities.
pub fn activity_menace_delta(tag: &str) -> Option<f64> {
    match tag {
        "bank_hack" => Some(15.0),
        "government_hack" => Some(20.0),
        "malware_deployment" => Some(10.0),
        "worm_propagation" => Some(25.0),
        _ => None,
    }
}

// ── Risk state machine ──────────────────────────────────────────

impl GameState {
    /// Raise the detection meter by a raw delta. The applied delta is
    /// scaled by the global multiplier and damped by anonymity skill and
    /// VPN equipment (never below the floor fraction of the raw value).
    /// Threshold crossings fire escalating consequences. Returns the
    /// applied delta.
    pub fn increase_detection_level(&mut self, raw: f64) -> f64 {
        if raw <= 0.0 || self.network.is_none() {
            return 0.0;
        }

        let anonymity = self.player.effective_skill(crate::player::Skill::Anonymity);
        let mut damp = 1.0 - anonymity * self.risk.anonymity_damp_per_point;
        if self.player.equipment.vpn {
            damp -= self.risk.vpn_damp;
        }
        let damp = damp.max(self.risk.detection_floor_factor);

        let delta = raw * self.detection_multiplier * damp;
        let before = self.detection_level;
        self.detection_level = (before + delta).clamp(0.0, 100.0);

        self.detection_consequences(before);

        if delta >= self.risk.sync_poll_detection_delta {
            crate::adversary::poll_adversarial_event(self);
        }
        delta
    }

    pub fn decrease_detection_level(&mut self, amount: f64) {
        self.detection_level = (self.detection_level - amount.max(0.0)).clamp(0.0, 100.0);
    }

    fn detection_consequences(&mut self, before: f64) {
        let after = self.detection_level;

        // Eviction first: at the critical threshold nothing else matters.
        if after >= self.risk.eviction_threshold {
            self.evict();
            return;
        }

        if before < self.risk.hardening_threshold
            && after >= self.risk.hardening_threshold
            && self.chance(self.risk.hardening_chance)
        {
            let hardened = self.current_node_mut().map(|node| {
                node.security_level = (node.security_level + 1).min(10);
                node.name.clone()
            });
            if let Some(name) = hardened {
                self.push_event(format!(
                    "[ALERT] {} has hardened its defenses (security level raised).",
                    name
                ));
            }
        }

        if before < self.risk.alert_threshold
            && after >= self.risk.alert_threshold
            && self.chance(self.risk.alert_chance)
        {
            self.detection_multiplier = self.risk.alert_multiplier;
            self.alert_commands_left = self.risk.alert_duration;
            self.push_event(
                "[ALERT] Intrusion countermeasures active: you are being watched closely."
                    .to_string(),
            );
        }
    }

    /// Critical-detection eviction: session torn down, money and
    /// reputation penalty, detection left at a moderate baseline.
    fn evict(&mut self) {
        let difficulty = self
            .network
            .as_ref()
            .map(|n| n.difficulty as i64)
            .unwrap_or(1);
        let fine = self.risk.eviction_fine_per_difficulty * difficulty;

        self.player.money = (self.player.money - fine).max(0);
        self.player.reputation -= self.risk.eviction_reputation_loss;
        self.clear_session();
        self.detection_level = self.risk.eviction_baseline;
        self.push_event(format!(
            "[EVICTED] You were traced and forcibly disconnected. Fined ${} and your reputation suffered.",
            fine
        ));
    }

    // ── Menace ──────────────────────────────────────────────────

    /// Raise the menace meter. A large enough applied delta triggers a
    /// synchronous adversarial poll.
    pub fn increase_menace(&mut self, amount: f64) -> f64 {
        let applied = self.player.increase_menace(amount);
        if applied > 0.0 && self.player.menace_level >= self.risk.menace_ramp_threshold {
            self.push_event(format!(
                "[WARNING] Your notoriety is attracting attention (menace {:.0}).",
                self.player.menace_level
            ));
        }
        if applied >= self.risk.sync_poll_menace_delta {
            crate::adversary::poll_adversarial_event(self);
        }
        applied
    }

    pub fn decrease_menace(&mut self, amount: f64) {
        self.player.decrease_menace(amount);
    }

    /// Record a named high-profile activity. Known tags carry their own
    /// fixed menace delta and an immediate player-visible warning.
    pub fn register_activity(&mut self, tag: &str) {
        self.player.record_activity(tag.to_string());
        if let Some(delta) = activity_menace_delta(tag) {
            self.push_event(format!(
                "[WARNING] Word of your {} is spreading.",
                tag.replace('_', " ")
            ));
            self.increase_menace(delta);
        }
    }

    /// Menace gained from compromising the current node, scaled by
    /// network type and node security. Zero when the target is not
    /// worth talking about.
    pub fn menace_for_current_target(&self) -> f64 {
        let Some(network) = self.network.as_ref() else {
            return 0.0;
        };
        let Some(node) = self.current_node() else {
            return 0.0;
        };
        if !network.network_type.is_high_value() {
            return 0.0;
        }
        node.security_level as f64 * network.network_type.menace_factor()
    }
}
