use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::access::{AccessRequest, Action, RequestSource, SubjectId};
use crate::channel::ChannelId;
use crate::error::Result;

/// Command received from the remote endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RemoteCommand {
    /// Ask for an actuator action on behalf of a subject
    AccessRequest {
        subject: SubjectId,
        actuator: ChannelId,
        action: Action,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sequence: Option<u64>,
    },
    /// A new stay token replaces the active one
    TokenUpdated { token: String },
    /// The active stay ended
    TokenRevoked,
}

impl RemoteCommand {
    pub fn parse(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }

    /// Build the access request carried by this command, if any
    pub fn into_access_request(self) -> Option<AccessRequest> {
        match self {
            Self::AccessRequest {
                subject,
                actuator,
                action,
                sequence,
            } => {
                let request = AccessRequest::new(subject, actuator, action, RequestSource::Remote);
                Some(match sequence {
                    Some(sequence) => request.with_sequence(sequence),
                    None => request,
                })
            }
            _ => None,
        }
    }
}

/// Receiver of inbound remote commands
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn on_command(&self, command: RemoteCommand) -> Result<()>;
}
