use domain::{AccessRequest, Action, ChannelId, DomainError, RequestSource, SubjectId};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::authorization::AccessIngress;
use crate::token::TokenService;

/// One line from the physical interface (keypad, card reader bridge)
#[derive(Debug, Deserialize)]
struct LocalLine {
    /// Presented stay token, resolved through the token service
    #[serde(default)]
    credential: Option<String>,
    /// Already identified subject (service staff badge)
    #[serde(default)]
    subject: Option<String>,
    actuator: String,
    action: String,
}

/// Feeds newline-delimited JSON requests from a local device into the access queue
pub struct LocalInput<R> {
    reader: R,
    ingress: AccessIngress,
    tokens: TokenService,
}

impl<R: AsyncBufRead + Unpin> LocalInput<R> {
    pub fn new(reader: R, ingress: AccessIngress, tokens: TokenService) -> Self {
        Self {
            reader,
            ingress,
            tokens,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        let Self {
            reader,
            ingress,
            tokens,
        } = self;
        let mut lines = reader.lines();
        info!("⌨️ Local input started");

        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => break,
                line = lines.next_line() => line,
            };

            match line {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => {
                    let request = match parse_line(&line, &tokens) {
                        Ok(request) => request,
                        Err(e) => {
                            warn!(error = %e, "Ignoring local input line");
                            continue;
                        }
                    };
                    if ingress.submit(request).await.is_err() {
                        warn!("Access queue closed, local input stopping");
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Local input read failed");
                    break;
                }
            }
        }

        info!("Local input stopped");
    }
}

/// Turn one input line into a local access request
pub fn parse_line(line: &str, tokens: &TokenService) -> Result<AccessRequest, DomainError> {
    let raw: LocalLine = serde_json::from_str(line)
        .map_err(|e| DomainError::InvalidConfiguration(format!("malformed local request: {e}")))?;

    let subject = match (raw.credential, raw.subject) {
        (Some(credential), _) => tokens.resolve(&credential),
        (None, Some(subject)) => SubjectId::new(subject)?,
        (None, None) => SubjectId::unknown(),
    };
    let actuator = ChannelId::new(raw.actuator)?;
    let action: Action = raw.action.parse()?;

    Ok(AccessRequest::new(subject, actuator, action, RequestSource::Local))
}
