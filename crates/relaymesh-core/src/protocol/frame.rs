//! Length-prefixed binary frames.
//!
//! Wire layout (big-endian):
//!
//! ```text
//! [1 byte type][2 byte length][length bytes payload]
//! ```
//!
//! Control frames (Close/Ping/Pong) never carry a payload; their length
//! field is ignored and nothing is allocated for them.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{RelayError, Result};

/// Header size: type byte + u16 length.
pub const FRAME_HEADER_LEN: usize = 3;

/// Payloads must be strictly shorter than this (32 KiB).
pub const MAX_PAYLOAD_LEN: usize = 32 << 10;

/// Frame type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// Envelope data.
    Raw = 0x01,
    /// Tail of the peer's send queue; the peer is going away.
    Close = 0xF0,
    Ping = 0xF1,
    Pong = 0xF2,
    /// Envelope data on the reserved authenticated lane.
    Auth = 0xF3,
}

impl FrameKind {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(FrameKind::Raw),
            0xF0 => Some(FrameKind::Close),
            0xF1 => Some(FrameKind::Ping),
            0xF2 => Some(FrameKind::Pong),
            0xF3 => Some(FrameKind::Auth),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Control frames are consumed without reading a payload.
    pub fn is_control(self) -> bool {
        matches!(self, FrameKind::Close | FrameKind::Ping | FrameKind::Pong)
    }
}

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Bytes,
}

impl Frame {
    pub fn control(kind: FrameKind) -> Self {
        Self { kind, payload: Bytes::new() }
    }

    pub fn raw(payload: impl Into<Bytes>) -> Self {
        Self { kind: FrameKind::Raw, payload: payload.into() }
    }
}

/// Read exactly one frame from `r`.
///
/// Errors from the underlying reader surface as `RelayError::Io`. A data
/// frame with a zero length is rejected but leaves the stream aligned; an
/// unknown type byte or an oversized length does not.
pub async fn read_frame<R>(r: &mut R) -> Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let mut head = [0u8; FRAME_HEADER_LEN];
    r.read_exact(&mut head).await?;

    let [ty, hi, lo] = head;
    let len = u16::from_be_bytes([hi, lo]) as usize;

    let kind = FrameKind::from_u8(ty).ok_or_else(|| RelayError::InvalidFrame {
        reason: format!("unknown frame type 0x{ty:02x}"),
        resync: false,
    })?;

    if kind.is_control() {
        if len > 0 {
            tracing::debug!(kind = ?kind, len, "control frame declares a length, ignored");
        }
        return Ok(Frame::control(kind));
    }

    if len == 0 {
        return Err(RelayError::InvalidFrame {
            reason: "empty data frame".into(),
            resync: true,
        });
    }
    if len >= MAX_PAYLOAD_LEN {
        return Err(RelayError::InvalidFrame {
            reason: format!("frame length {len} exceeds limit"),
            resync: false,
        });
    }

    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).await?;
    Ok(Frame { kind, payload: Bytes::from(buf) })
}

/// Prepend the 3-byte header to `payload`.
pub fn encode_frame(kind: FrameKind, payload: &[u8]) -> Result<Bytes> {
    if payload.len() >= MAX_PAYLOAD_LEN {
        return Err(RelayError::MessageTooLarge(payload.len()));
    }
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    buf.put_u8(kind.as_u8());
    buf.put_u16(payload.len() as u16);
    buf.put_slice(payload);
    Ok(buf.freeze())
}
