pub mod command_listener;
pub mod dispatcher;

pub use command_listener::{CommandListener, dispatch_payload};
pub use dispatcher::CommandDispatcher;
