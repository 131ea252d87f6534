//! Wire protocol for wspulse

pub mod clock;
pub mod error;
pub mod message;

pub use clock::now_nanos;
pub use error::{ProtocolError, Result as ProtocolResult};
pub use message::{generate_payload, BroadcastEvent, Message, RttRequest, RttResponse};
