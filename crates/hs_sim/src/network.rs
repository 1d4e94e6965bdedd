use std::collections::BTreeMap;

// ── NetworkType ─────────────────────────────────────────────────

/// Broad classification of a network. Drives how much notoriety a
/// successful intrusion generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    Personal,
    University,
    Corporate,
    Financial,
    Government,
    Military,
}

impl NetworkType {
    pub fn name(self) -> &'static str {
        match self {
            NetworkType::Personal => "personal",
            NetworkType::University => "university",
            NetworkType::Corporate => "corporate",
            NetworkType::Financial => "financial",
            NetworkType::Government => "government",
            NetworkType::Military => "military",
        }
    }

    /// True for targets whose compromise attracts serious attention.
    pub fn is_high_value(self) -> bool {
        matches!(
            self,
            NetworkType::Corporate
                | NetworkType::Financial
                | NetworkType::Government
                | NetworkType::Military
        )
    }

    /// Menace scaling applied per point of node security on a successful
    /// high-profile action.
    pub fn menace_factor(self) -> f64 {
        match self {
            NetworkType::Personal => 0.5,
            NetworkType::University => 0.8,
            NetworkType::Corporate => 1.2,
            NetworkType::Financial => 1.5,
            NetworkType::Government => 1.8,
            NetworkType::Military => 2.0,
        }
    }
}

// ── Vulnerability ───────────────────────────────────────────────

/// What exploiting a vulnerability does to its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VulnEffect {
    RootAccess,
    DataAccess,
    FirewallDisabled,
}

#[derive(Debug, Clone)]
pub struct Vulnerability {
    pub name: String,
    /// How hard the weakness is to see with `scan` (1-10).
    pub detection_difficulty: u8,
    /// How hard the weakness is to exploit (1-10).
    pub exploit_difficulty: u8,
    /// Payload tag an exploit attempt must present.
    pub required_payload: String,
    pub effect: VulnEffect,
    pub success_message: String,
    /// Exploiting this leaks data that can satisfy mission objectives.
    pub leaks_data: bool,
}

// ── NetworkNode ─────────────────────────────────────────────────

/// A piece of encrypted loot stored on a node.
#[derive(Debug, Clone)]
pub struct EncryptedData {
    pub ciphertext: String,
    pub plaintext: String,
    pub encryption_level: u8,
    /// Requires `data_accessed` or `root_access` before decryption.
    pub requires_access: bool,
}

#[derive(Debug, Clone)]
pub struct NetworkNode {
    pub name: String,
    pub address: String,
    /// 1-10. Raised by defensive hardening, capped at 10.
    pub security_level: u8,
    // Access flags are monotonic within a session: once true they stay
    // true until an explicit session reset.
    pub root_access: bool,
    pub data_accessed: bool,
    pub firewall_active: bool,
    /// port -> service name
    pub open_ports: BTreeMap<u16, String>,
    /// filename -> contents
    pub files: BTreeMap<String, String>,
    /// data id -> encrypted payload
    pub encrypted_data: BTreeMap<String, EncryptedData>,
    pub vulnerabilities: Vec<Vulnerability>,
    /// Names of reachable nodes in the owning network.
    pub connections: Vec<String>,
}

impl NetworkNode {
    pub fn new(name: impl Into<String>, address: impl Into<String>, security_level: u8) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            security_level: security_level.clamp(1, 10),
            root_access: false,
            data_accessed: false,
            firewall_active: true,
            open_ports: BTreeMap::new(),
            files: BTreeMap::new(),
            encrypted_data: BTreeMap::new(),
            vulnerabilities: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn vulnerability(&self, name: &str) -> Option<&Vulnerability> {
        self.vulnerabilities.iter().find(|v| v.name == name)
    }

    pub fn has_any_access(&self) -> bool {
        self.root_access || self.data_accessed
    }

    /// Apply a vulnerability effect. Idempotent: re-applying an effect
    /// that already holds changes nothing and reports `false`.
    pub fn apply_effect(&mut self, effect: VulnEffect) -> bool {
        match effect {
            VulnEffect::RootAccess => {
                if self.root_access {
                    false
                } else {
                    self.root_access = true;
                    true
                }
            }
            VulnEffect::DataAccess => {
                if self.data_accessed {
                    false
                } else {
                    self.data_accessed = true;
                    true
                }
            }
            VulnEffect::FirewallDisabled => {
                if self.firewall_active {
                    self.firewall_active = false;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Reset session-scoped access state (new session, not mid-session).
    pub fn reset_access(&mut self) {
        self.root_access = false;
        self.data_accessed = false;
        self.firewall_active = true;
    }
}

// ── Network ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Network {
    pub name: String,
    pub network_type: NetworkType,
    /// Overall difficulty rating (1-10); scales eviction fines.
    pub difficulty: u8,
    pub entry_points: Vec<String>,
    pub nodes: Vec<NetworkNode>,
}

impl Network {
    pub fn new(name: impl Into<String>, network_type: NetworkType, difficulty: u8) -> Self {
        Self {
            name: name.into(),
            network_type,
            difficulty: difficulty.clamp(1, 10),
            entry_points: Vec::new(),
            nodes: Vec::new(),
        }
    }

    pub fn node(&self, name: &str) -> Option<&NetworkNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut NetworkNode> {
        self.nodes.iter_mut().find(|n| n.name == name)
    }

    /// Every node name referenced by a `connections` list or an entry
    /// point must exist in this network. Returns the dangling names.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut dangling = Vec::new();
        for entry in &self.entry_points {
            if self.node(entry).is_none() {
                dangling.push(entry.clone());
            }
        }
        for node in &self.nodes {
            for conn in &node.connections {
                if self.node(conn).is_none() {
                    dangling.push(format!("{} (from {})", conn, node.name));
                }
            }
        }
        if dangling.is_empty() {
            Ok(())
        } else {
            Err(dangling)
        }
    }
}
