mod band;
mod state;
mod transition;

pub use band::{Band, ComfortRange};
pub use state::RoomState;
pub use transition::{StateTransition, TransitionCause};
