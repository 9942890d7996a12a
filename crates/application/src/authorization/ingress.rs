use domain::{AccessRequest, AuthorizationDecision, DomainError, DomainEvent, ReasonCode};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::telemetry::TelemetrySink;

/// A queued request plus the optional channel its decision is returned on
pub(crate) struct Submission {
    pub request: AccessRequest,
    pub reply: Option<oneshot::Sender<AuthorizationDecision>>,
}

impl Submission {
    /// Deny with `shutting-down`, report it and answer the requester
    pub(crate) fn refuse(self, telemetry: &TelemetrySink) -> AuthorizationDecision {
        let Submission { request, reply } = self;
        let decision = AuthorizationDecision::denied(request.id, ReasonCode::ShuttingDown);
        telemetry.emit(DomainEvent::access_decided(&request, &decision));
        if let Some(reply) = reply {
            let _ = reply.send(decision.clone());
        }
        decision
    }
}

/// Single entry point for access requests from every source.
///
/// Local inputs and the remote command channel hold clones of this handle
/// and feed the same bounded queue, which one executor consumes in arrival
/// order. Once the executor has stopped accepting work, requests are denied
/// `shutting-down` here and the denial is still reported.
#[derive(Clone)]
pub struct AccessIngress {
    tx: mpsc::Sender<Submission>,
    telemetry: TelemetrySink,
}

impl AccessIngress {
    pub(crate) fn new(tx: mpsc::Sender<Submission>, telemetry: TelemetrySink) -> Self {
        Self { tx, telemetry }
    }

    /// Queue a request without waiting for its decision.
    ///
    /// `QueueClosed` means the request was denied because the unit is
    /// shutting down; the source should stop feeding requests.
    pub async fn submit(&self, request: AccessRequest) -> Result<(), DomainError> {
        debug!(request_id = %request.id, source = ?request.source, "Access request queued");
        let submission = Submission {
            request,
            reply: None,
        };
        match self.tx.send(submission).await {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendError(submission)) => {
                self.reject(submission);
                Err(DomainError::QueueClosed)
            }
        }
    }

    /// Queue a request and wait for the decision
    pub async fn request(
        &self,
        request: AccessRequest,
    ) -> Result<AuthorizationDecision, DomainError> {
        let (reply, rx) = oneshot::channel();
        let submission = Submission {
            request,
            reply: Some(reply),
        };
        if let Err(mpsc::error::SendError(submission)) = self.tx.send(submission).await {
            return Ok(self.reject(submission));
        }
        rx.await.map_err(|_| DomainError::QueueClosed)
    }

    fn reject(&self, submission: Submission) -> AuthorizationDecision {
        warn!(
            request_id = %submission.request.id,
            subject = %submission.request.subject,
            "Access queue closed, request denied"
        );
        submission.refuse(&self.telemetry)
    }
}
