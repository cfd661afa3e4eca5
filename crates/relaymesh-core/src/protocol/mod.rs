//! Protocol modules (frame codec, envelope, message ids).
//!
//! - Frame: `[type u8][length u16 BE][payload]`, the unit read off a socket.
//! - Envelope: the `{Id, Body}` JSON record carried in Raw/Auth payloads.
//! - Message id: `service.local` split used to decide local vs routed handling.
//!
//! All parsers are panic-free: malformed input is reported as `RelayError`.

pub mod envelope;
pub mod frame;
pub mod message_id;

pub use envelope::{decode_package, encode_package, Package};
pub use frame::{encode_frame, read_frame, Frame, FrameKind, FRAME_HEADER_LEN, MAX_PAYLOAD_LEN};
pub use message_id::{is_plain_identifier, split_message_id};
