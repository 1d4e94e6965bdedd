pub mod adversary;
pub mod dialect;
pub mod exploit;
pub mod network;
pub mod player;
pub mod risk;
pub mod state;
pub mod tutorial;

pub use dialect::DialectId;
pub use network::{Network, NetworkNode, NetworkType, VulnEffect, Vulnerability};
pub use player::{Equipment, Player, RansomDemand, Skill};
pub use state::{GameState, Mission, MissionObjective};
