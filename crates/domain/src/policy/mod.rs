//! Access policy: ordered rules evaluated first-match-wins.

mod pattern;
mod predicate;
mod rule;
mod set;

pub use pattern::Pattern;
pub use predicate::{Operator, StatePredicate};
pub use rule::{Effect, PolicyRule};
pub use set::PolicySet;
