//! Realtime chat over websockets.

pub mod dispatcher;
pub mod handler;
pub mod protocol;

pub use dispatcher::Dispatcher;
pub use protocol::{ClientAction, ServerEvent};
