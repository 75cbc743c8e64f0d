//! Length-prefixed message framing.
//!
//! # Responsibilities
//! - Read exactly one wire message from a byte stream into an owned buffer
//! - Validate the declared length before allocating
//! - Distinguish a clean close between messages from a mid-message close

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Size of the fixed message header: length, request id, response-to, opcode.
pub const HEADER_LEN: usize = 16;

/// Opcode of the one message type this proxy interprets.
pub const OP_MSG: i32 = 2013;

/// Upper bound on a single message, matching the server's own limit.
/// A declared length beyond this is treated as stream corruption.
pub const MAX_MESSAGE_LEN: usize = 48 * 1024 * 1024;

/// Error type for framing operations.
#[derive(Debug, Error)]
pub enum WireError {
    /// The stream closed before a full message was available.
    #[error("stream closed mid-message ({got} of {want} bytes)")]
    ShortRead { got: usize, want: usize },

    /// The declared message length cannot describe a valid message.
    #[error("invalid declared message length {0}")]
    Framing(usize),

    /// The underlying read failed.
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Parsed fixed-size message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Total message length in bytes, header included.
    pub length: i32,
    /// Client-assigned request identifier.
    pub request_id: i32,
    /// Request id this message responds to (0 for requests).
    pub response_to: i32,
    /// Message opcode.
    pub op_code: i32,
}

impl MessageHeader {
    /// Parse the leading header fields out of a message buffer.
    ///
    /// Returns `None` if the buffer is shorter than a header.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        if raw.len() < HEADER_LEN {
            return None;
        }
        let field = |i: usize| i32::from_le_bytes(raw[i..i + 4].try_into().unwrap());
        Some(Self {
            length: field(0),
            request_id: field(4),
            response_to: field(8),
            op_code: field(12),
        })
    }
}

/// Read the next complete wire message from `src`.
///
/// Returns `Ok(None)` when the peer closes the stream on a message
/// boundary. A close after the first byte of a message is a
/// [`WireError::ShortRead`]. Consumes exactly the bytes of one message;
/// never reads past the declared length.
pub async fn read_message<R>(src: &mut R) -> Result<Option<Vec<u8>>, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        let n = src.read(&mut len_buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(WireError::ShortRead {
                got: filled,
                want: len_buf.len(),
            });
        }
        filled += n;
    }

    let declared = u32::from_le_bytes(len_buf) as usize;
    if declared < HEADER_LEN || declared > MAX_MESSAGE_LEN {
        return Err(WireError::Framing(declared));
    }

    let mut msg = vec![0u8; declared];
    msg[..4].copy_from_slice(&len_buf);
    let mut got = 4;
    while got < declared {
        let n = src.read(&mut msg[got..]).await?;
        if n == 0 {
            return Err(WireError::ShortRead {
                got,
                want: declared,
            });
        }
        got += n;
    }

    Ok(Some(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(body: &[u8]) -> Vec<u8> {
        let total = 16 + body.len();
        let mut msg = Vec::with_capacity(total);
        msg.extend_from_slice(&(total as i32).to_le_bytes());
        msg.extend_from_slice(&1i32.to_le_bytes());
        msg.extend_from_slice(&0i32.to_le_bytes());
        msg.extend_from_slice(&OP_MSG.to_le_bytes());
        msg.extend_from_slice(body);
        msg
    }

    #[tokio::test]
    async fn reads_one_message_exactly() {
        let first = frame(b"hello");
        let second = frame(b"world!");
        let mut stream: Vec<u8> = first.clone();
        stream.extend_from_slice(&second);

        let mut src = &stream[..];
        let got = read_message(&mut src).await.unwrap().unwrap();
        assert_eq!(got, first);
        // the second message is untouched in the stream
        assert_eq!(src, &second[..]);
    }

    #[tokio::test]
    async fn clean_close_between_messages() {
        let mut src: &[u8] = &[];
        assert!(read_message(&mut src).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn close_mid_message_is_short_read() {
        let msg = frame(b"payload");
        let mut src = &msg[..msg.len() - 3];
        match read_message(&mut src).await {
            Err(WireError::ShortRead { got, want }) => {
                // the count reflects how far into the body the stream got
                assert_eq!(got, msg.len() - 3);
                assert_eq!(want, msg.len());
            }
            other => panic!("expected ShortRead, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn close_mid_prefix_is_short_read() {
        let mut src: &[u8] = &[7, 0];
        match read_message(&mut src).await {
            Err(WireError::ShortRead { got: 2, want: 4 }) => {}
            other => panic!("expected ShortRead, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn declared_length_below_header_is_framing_error() {
        let mut src: &[u8] = &8i32.to_le_bytes();
        match read_message(&mut src).await {
            Err(WireError::Framing(8)) => {}
            other => panic!("expected Framing, got {other:?}"),
        }
    }

    #[test]
    fn header_parse_round_trip() {
        let msg = frame(&[]);
        let header = MessageHeader::parse(&msg).unwrap();
        assert_eq!(header.length as usize, msg.len());
        assert_eq!(header.request_id, 1);
        assert_eq!(header.response_to, 0);
        assert_eq!(header.op_code, OP_MSG);
        assert!(MessageHeader::parse(&msg[..10]).is_none());
    }
}
