//! Fire-and-forget forwarding of commands to the authority for execution.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::KeyBuilder;
use crate::store::KeyValueStore;

/// Command prefixes the authority owns. These are resolved and executed on
/// the proxy side, not locally.
const FORWARDED_PREFIXES: &[&str] = &[
    "rank",
    "grant",
    "permission",
    "perm",
    "vanish",
    "staffchat",
    "gmc",
    "gms",
    "gamemode",
];

/// Payload published on the command execution channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandRequest {
    pub player: String,
    pub command: String,
    #[serde(rename = "requestId")]
    pub request_id: Uuid,
}

/// Publishes command-execution requests to the authority.
///
/// No acknowledgment channel exists: a `true` return means the broker
/// accepted the publish, not that the backend executed the command.
pub struct CommandForwarder {
    store: Arc<dyn KeyValueStore>,
    keys: KeyBuilder,
}

impl CommandForwarder {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeyBuilder) -> Self {
        Self { store, keys }
    }

    /// Publish a command-execution request on behalf of `player_name`.
    /// Returns whether the publish succeeded; failures log and never error.
    pub async fn forward(&self, player_name: &str, command: &str) -> bool {
        let request = CommandRequest {
            player: player_name.to_string(),
            command: command.to_string(),
            request_id: Uuid::new_v4(),
        };

        let payload = match serde_json::to_string(&request) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(player = %player_name, error = %e, "Failed to encode command request");
                return false;
            }
        };

        let channel = self.keys.command_execute_channel();
        match self.store.publish(&channel, &payload).await {
            Ok(()) => {
                debug!(
                    player = %player_name,
                    command = %command,
                    request_id = %request.request_id,
                    "Forwarded command to authority"
                );
                true
            }
            Err(e) => {
                warn!(player = %player_name, command = %command, error = %e, "Command forward failed");
                false
            }
        }
    }

    /// Whether `command` belongs to the authority and should be forwarded
    /// instead of handled locally. Accepts an optional leading `/`.
    #[must_use]
    pub fn should_forward(command: &str) -> bool {
        let cmd = command.trim_start_matches('/').to_lowercase();
        FORWARDED_PREFIXES
            .iter()
            .any(|prefix| cmd.starts_with(prefix))
    }
}

impl std::fmt::Debug for CommandForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandForwarder").finish_non_exhaustive()
    }
}
