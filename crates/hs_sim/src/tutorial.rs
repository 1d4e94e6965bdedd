//! The bundled tutorial network: a tiny university lab the game opens
//! with. Also the fixture most integration tests run against.

use crate::network::{
    EncryptedData, Network, NetworkNode, NetworkType, VulnEffect, Vulnerability,
};
use crate::player::Player;
use crate::state::{GameState, Mission};

pub fn tutorial_network() -> Network {
    let mut gateway = NetworkNode::new("Gateway", "10.13.37.1", 2);
    gateway.open_ports.insert(22, "ssh".into());
    gateway.open_ports.insert(80, "http".into());
    gateway.files.insert(
        "readme.txt".into(),
        "Welcome to the campus lab gateway. Do not share credentials.".into(),
    );
    gateway.encrypted_data.insert(
        "tutorial_data_1".into(),
        EncryptedData {
            ciphertext: "c2VjcmV0cw==".into(),
            plaintext: "lab admin password: hunter2".into(),
            encryption_level: 1,
            requires_access: true,
        },
    );
    gateway.vulnerabilities.push(Vulnerability {
        name: "weak_password".into(),
        detection_difficulty: 1,
        exploit_difficulty: 2,
        required_payload: "ssh_login".into(),
        effect: VulnEffect::RootAccess,
        success_message: "The default credentials still work. You are root.".into(),
        leaks_data: false,
    });
    gateway.vulnerabilities.push(Vulnerability {
        name: "sql_injection".into(),
        detection_difficulty: 3,
        exploit_difficulty: 4,
        required_payload: "sql_payload".into(),
        effect: VulnEffect::DataAccess,
        success_message: "The login form concatenates strings. The user table is yours.".into(),
        leaks_data: true,
    });
    gateway.connections.push("FileServer".into());

    let mut file_server = NetworkNode::new("FileServer", "10.13.37.2", 3);
    file_server.open_ports.insert(21, "ftp".into());
    file_server.open_ports.insert(445, "smb".into());
    file_server
        .files
        .insert("grades.csv".into(), "alice,A\nbob,C".into());
    file_server.vulnerabilities.push(Vulnerability {
        name: "anonymous_ftp".into(),
        detection_difficulty: 2,
        exploit_difficulty: 2,
        required_payload: "ftp_probe".into(),
        effect: VulnEffect::DataAccess,
        success_message: "Anonymous login accepted. The share is wide open.".into(),
        leaks_data: false,
    });
    file_server.connections.push("Gateway".into());

    let mut network = Network::new("CampusLab", NetworkType::University, 2);
    network.entry_points.push("Gateway".into());
    network.nodes.push(gateway);
    network.nodes.push(file_server);
    network
}

/// Fresh session against the tutorial network with the starter mission.
pub fn new_session(player_name: &str) -> GameState {
    let network = tutorial_network();
    debug_assert!(network.validate().is_ok());

    let mut state = GameState::with_network(Player::new(player_name), network);
    state.missions.push(Mission::new(
        "Open Doors",
        &[
            "Get root on the campus Gateway",
            "Leak the user table through sql_injection",
        ],
    ));
    state
}
