//! Commands exchanged between the orchestrator and a page context.

use serde::{Deserialize, Serialize};

use crate::state::RunState;

/// Default number of scroll steps during extraction.
pub const DEFAULT_MAX_SCROLLS: u32 = 50;

/// A request sent to a page context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum AgentCommand {
    /// Liveness probe answered by the base script.
    Ping,
    StartFollowAgent,
    StopFollowAgent,
    GetAgentStatus,
    CheckFollowStatus { username: String },
    FollowUser { username: String },
    UnfollowUser { username: String },
    ExtractUsernames {
        #[serde(default)]
        options: ExtractOptions,
    },
}

impl AgentCommand {
    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            AgentCommand::Ping => "ping",
            AgentCommand::StartFollowAgent => "startFollowAgent",
            AgentCommand::StopFollowAgent => "stopFollowAgent",
            AgentCommand::GetAgentStatus => "getAgentStatus",
            AgentCommand::CheckFollowStatus { .. } => "checkFollowStatus",
            AgentCommand::FollowUser { .. } => "followUser",
            AgentCommand::UnfollowUser { .. } => "unfollowUser",
            AgentCommand::ExtractUsernames { .. } => "extractUsernames",
        }
    }

    /// Commands that may outlive the default response deadline.
    pub fn is_long_running(&self) -> bool {
        matches!(
            self,
            AgentCommand::StartFollowAgent
                | AgentCommand::CheckFollowStatus { .. }
                | AgentCommand::FollowUser { .. }
                | AgentCommand::UnfollowUser { .. }
                | AgentCommand::ExtractUsernames { .. }
        )
    }

    /// Commands served by the agent script rather than the base script.
    pub fn needs_agent(&self) -> bool {
        !matches!(self, AgentCommand::Ping | AgentCommand::ExtractUsernames { .. })
    }
}

/// Options for `extractUsernames`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractOptions {
    #[serde(default = "default_max_scrolls")]
    pub max_scrolls: u32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_scrolls: DEFAULT_MAX_SCROLLS,
        }
    }
}

fn default_max_scrolls() -> u32 {
    DEFAULT_MAX_SCROLLS
}

/// Result of a follow-state check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowStatus {
    pub following: bool,
    /// The target follows the automated account back.
    #[serde(default)]
    pub follows_you: bool,
    /// No definitive indicator appeared before the check gave up.
    #[serde(default)]
    pub unsure: bool,
}

/// Outcome of an extraction pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractSummary {
    /// Unique profiles seen on the page.
    pub found: usize,
    pub added_to_queue: usize,
    pub total_in_queue: usize,
    pub page_type: String,
}

/// Response to an [`AgentCommand`]: `{success, ...}` or `{success: false, error}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    #[serde(default)]
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RunState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_status: Option<FollowStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractSummary>,
}

impl CommandResponse {
    /// Plain success.
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// Success carrying a human-readable message.
    pub fn ok_with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Failure carrying an error message.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_state(mut self, state: RunState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_follow_status(mut self, status: FollowStatus) -> Self {
        self.follow_status = Some(status);
        self
    }

    pub fn with_extraction(mut self, summary: ExtractSummary) -> Self {
        self.extraction = Some(summary);
        self
    }

    /// Convert into `Err(error)` when the response reports failure.
    pub fn into_result(self) -> Result<Self, String> {
        if self.success {
            Ok(self)
        } else {
            Err(self
                .error
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_names() {
        let json = serde_json::to_value(AgentCommand::StartFollowAgent).unwrap();
        assert_eq!(json["action"], "startFollowAgent");

        let json = serde_json::to_value(AgentCommand::CheckFollowStatus {
            username: "alice".into(),
        })
        .unwrap();
        assert_eq!(json["action"], "checkFollowStatus");
        assert_eq!(json["username"], "alice");

        for command in [
            AgentCommand::Ping,
            AgentCommand::StopFollowAgent,
            AgentCommand::GetAgentStatus,
            AgentCommand::FollowUser { username: "a".into() },
            AgentCommand::UnfollowUser { username: "a".into() },
            AgentCommand::ExtractUsernames {
                options: ExtractOptions::default(),
            },
        ] {
            let json = serde_json::to_value(&command).unwrap();
            assert_eq!(json["action"], command.name());
        }
    }

    #[test]
    fn test_extract_options_default_when_missing() {
        let command: AgentCommand =
            serde_json::from_str(r#"{"action":"extractUsernames"}"#).unwrap();
        assert_eq!(
            command,
            AgentCommand::ExtractUsernames {
                options: ExtractOptions { max_scrolls: 50 }
            }
        );
    }

    #[test]
    fn test_command_routing() {
        assert!(!AgentCommand::Ping.needs_agent());
        assert!(!AgentCommand::Ping.is_long_running());
        assert!(AgentCommand::GetAgentStatus.needs_agent());
        assert!(!AgentCommand::GetAgentStatus.is_long_running());
        assert!(AgentCommand::StartFollowAgent.is_long_running());
    }

    #[test]
    fn test_response_shapes() {
        let ok = serde_json::to_value(CommandResponse::ok_with_message("Agent stopped")).unwrap();
        assert_eq!(ok["success"], true);
        assert!(ok.get("error").is_none());

        let failed = CommandResponse::failure("No users left in the queue to follow.");
        assert_eq!(
            failed.clone().into_result().unwrap_err(),
            "No users left in the queue to follow."
        );
        let parsed: CommandResponse = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert!(!parsed.success);
        assert_eq!(parsed.error.as_deref(), Some("boom"));
    }
}
