//! Wire protocol shared with the proxy process.

pub mod codec;
mod message;
mod message_type;
mod properties;

pub use codec::{read_frame, write_frame, MAX_FRAME_LEN};
pub use message::ProxyMessage;
pub use message_type::{MessageKind, MessageType};
pub use properties::{names, Properties};
