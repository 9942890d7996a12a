//! Authorization Engine: fail-closed decisions over the ordered access policy

pub mod evaluator;
pub mod executor;
pub mod ingress;

pub use evaluator::evaluate;
pub use executor::{AuthorizationExecutor, ExecutorSettings};
pub use ingress::AccessIngress;
