mod action;
mod decision;
mod request;
mod subject_id;

pub use action::Action;
pub use decision::{AuthorizationDecision, Outcome, ReasonCode};
pub use request::{AccessRequest, RequestId, RequestSource};
pub use subject_id::SubjectId;
