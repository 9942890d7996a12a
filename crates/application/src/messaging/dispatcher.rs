use async_trait::async_trait;
use domain::{CommandHandler, DomainError, RemoteCommand};
use tracing::info;

use crate::authorization::AccessIngress;
use crate::token::TokenService;

/// Routes remote commands to the access queue or the token service
pub struct CommandDispatcher {
    ingress: AccessIngress,
    tokens: TokenService,
}

impl CommandDispatcher {
    pub fn new(ingress: AccessIngress, tokens: TokenService) -> Self {
        Self { ingress, tokens }
    }
}

#[async_trait]
impl CommandHandler for CommandDispatcher {
    async fn on_command(&self, command: RemoteCommand) -> Result<(), DomainError> {
        match command {
            RemoteCommand::TokenUpdated { token } => self.tokens.update(&token),
            RemoteCommand::TokenRevoked => {
                self.tokens.revoke();
                Ok(())
            }
            access @ RemoteCommand::AccessRequest { .. } => {
                let Some(request) = access.into_access_request() else {
                    return Ok(());
                };
                info!(
                    request_id = %request.id,
                    subject = %request.subject,
                    actuator = %request.actuator,
                    sequence = ?request.sequence,
                    "Remote access request"
                );
                self.ingress.submit(request).await
            }
        }
    }
}
