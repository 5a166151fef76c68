//! Agent card: the self-describing document served to protocol clients.

use serde::{Deserialize, Serialize};

use crate::skills::SkillEntry;

/// Capability flags advertised on the card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// Incremental status updates are streamed.
    pub streaming: bool,
    /// Push notifications are not offered.
    pub push_notifications: bool,
    /// Task state transitions are observable in order.
    pub state_transition_history: bool,
}

/// Provider block of the card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProvider {
    /// Operating organization.
    pub organization: String,
    /// Homepage of the provider.
    pub url: String,
}

/// The agent card served at `/.well-known/agent-card.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Display name.
    pub name: String,
    /// Short description of what the agent does.
    pub description: String,
    /// Base URL clients should send requests to.
    pub url: String,
    /// Provider block.
    pub provider: AgentProvider,
    /// Server version.
    pub version: String,
    /// Protocol revision implemented.
    pub protocol_version: String,
    /// Capability flags.
    pub capabilities: AgentCapabilities,
    /// Accepted request media types.
    pub default_input_modes: Vec<String>,
    /// Produced response media types.
    pub default_output_modes: Vec<String>,
    /// Skills discovered in the workspace.
    pub skills: Vec<SkillEntry>,
}

impl AgentCard {
    /// Build the card for this server instance.
    #[must_use]
    pub fn new(agent_name: &str, url: String, skills: Vec<SkillEntry>) -> Self {
        Self {
            name: agent_name.to_owned(),
            description: "Claude Code AI assistant for software engineering tasks".to_owned(),
            url,
            provider: AgentProvider {
                organization: "Claude Bridge".to_owned(),
                url: env!("CARGO_PKG_REPOSITORY").to_owned(),
            },
            version: env!("CARGO_PKG_VERSION").to_owned(),
            protocol_version: "1.0".to_owned(),
            capabilities: AgentCapabilities {
                streaming: true,
                push_notifications: false,
                state_transition_history: true,
            },
            default_input_modes: vec!["text/plain".to_owned()],
            default_output_modes: vec!["text/plain".to_owned()],
            skills,
        }
    }
}
