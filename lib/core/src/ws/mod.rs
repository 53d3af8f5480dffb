pub mod protocol;
pub mod session;

pub use protocol::{ClientMessage, CloseCode, CloseFrame, Outbound, ServerMessage, WS_SUBPROTOCOL};
pub use session::{Phase, Session};
