//! Length-prefixed frame codec.
//!
//! Layout, all integers little endian:
//!
//! ```text
//! u32  frame length (bytes after this field)
//! i32  message type code
//! u64  request id
//! i32  property count
//! repeated:
//!   i32 key length, key bytes (UTF-8)
//!   i32 value length (-1 for null), value bytes (UTF-8)
//! ```

use super::{MessageType, Properties, ProxyMessage};
use crate::error::{CoreError, CoreResult};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame accepted from the wire.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

const HEADER_LEN: usize = 4 + 8 + 4;

/// Encode a message into a complete frame including the length prefix.
pub fn encode(message: &ProxyMessage) -> CoreResult<Bytes> {
    let mut body = BytesMut::with_capacity(64);
    body.put_i32_le(message.message_type.code());
    body.put_u64_le(message.request_id);
    body.put_i32_le(len_i32(message.properties.len())?);
    for (key, value) in message.properties.iter() {
        put_str(&mut body, Some(key))?;
        put_str(&mut body, value)?;
    }

    if body.len() > MAX_FRAME_LEN {
        return Err(CoreError::MalformedFrame(format!(
            "frame of {} bytes exceeds the {} byte limit",
            body.len(),
            MAX_FRAME_LEN
        )));
    }

    let mut frame = BytesMut::with_capacity(4 + body.len());
    frame.put_u32_le(body.len() as u32);
    frame.extend_from_slice(&body);
    Ok(frame.freeze())
}

/// Decode a frame body (everything after the length prefix).
pub fn decode(mut body: Bytes) -> CoreResult<ProxyMessage> {
    if body.len() < HEADER_LEN {
        return Err(CoreError::MalformedFrame(format!(
            "frame body of {} bytes is shorter than the header",
            body.len()
        )));
    }

    let code = body.get_i32_le();
    let message_type = MessageType::from_code(code).ok_or(CoreError::UnknownMessageType(code))?;
    let request_id = body.get_u64_le();
    let count = body.get_i32_le();
    if count < 0 {
        return Err(CoreError::MalformedFrame(format!(
            "negative property count {count}"
        )));
    }

    let mut properties = Properties::new();
    for _ in 0..count {
        let key = get_str(&mut body)?
            .ok_or_else(|| CoreError::MalformedFrame("null property name".to_string()))?;
        let value = get_str(&mut body)?;
        properties.set(&key, value);
    }

    if body.has_remaining() {
        return Err(CoreError::MalformedFrame(format!(
            "{} trailing bytes after properties",
            body.remaining()
        )));
    }

    Ok(ProxyMessage {
        message_type,
        request_id,
        properties,
    })
}

/// Read one frame. Returns `None` on a clean end of stream at a frame boundary.
pub async fn read_frame<R>(reader: &mut R) -> CoreResult<Option<ProxyMessage>>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 4];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        return Err(CoreError::MalformedFrame(format!(
            "announced frame length {len} exceeds the {MAX_FRAME_LEN} byte limit"
        )));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    decode(Bytes::from(body)).map(Some)
}

/// Write one frame and flush it.
pub async fn write_frame<W>(writer: &mut W, message: &ProxyMessage) -> CoreResult<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

fn len_i32(len: usize) -> CoreResult<i32> {
    i32::try_from(len).map_err(|_| CoreError::MalformedFrame(format!("length {len} overflows")))
}

fn put_str(buf: &mut BytesMut, value: Option<&str>) -> CoreResult<()> {
    match value {
        None => buf.put_i32_le(-1),
        Some(text) => {
            buf.put_i32_le(len_i32(text.len())?);
            buf.extend_from_slice(text.as_bytes());
        }
    }
    Ok(())
}

fn get_str(buf: &mut Bytes) -> CoreResult<Option<String>> {
    if buf.remaining() < 4 {
        return Err(CoreError::MalformedFrame("truncated length".to_string()));
    }
    let len = buf.get_i32_le();
    if len == -1 {
        return Ok(None);
    }
    if len < 0 || len as usize > buf.remaining() {
        return Err(CoreError::MalformedFrame(format!(
            "string length {len} out of bounds"
        )));
    }
    let raw = buf.split_to(len as usize);
    String::from_utf8(raw.to_vec())
        .map(Some)
        .map_err(|e| CoreError::MalformedFrame(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::names;

    fn sample() -> ProxyMessage {
        let mut message = ProxyMessage::new(MessageType::WorkflowExecuteRequest);
        message.request_id = 17;
        message.properties.set_string(names::WORKFLOW_TYPE, "HelloWorkflow");
        message.properties.set(names::DETAILS, None);
        message.properties.set_string(names::ARGS, "[\"Jeff\"]");
        message
    }

    #[test]
    fn test_encode_layout() {
        let frame = encode(&sample()).unwrap();
        let len = u32::from_le_bytes(frame[..4].try_into().unwrap()) as usize;
        assert_eq!(len, frame.len() - 4);
        assert_eq!(
            i32::from_le_bytes(frame[4..8].try_into().unwrap()),
            MessageType::WorkflowExecuteRequest.code()
        );
        assert_eq!(u64::from_le_bytes(frame[8..16].try_into().unwrap()), 17);
    }

    #[test]
    fn test_decode_preserves_order_and_nulls() {
        let frame = encode(&sample()).unwrap();
        let decoded = decode(frame.slice(4..)).unwrap();
        assert_eq!(decoded, sample());
        let keys: Vec<_> = decoded.properties.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![names::WORKFLOW_TYPE, names::DETAILS, names::ARGS]);
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let mut body = BytesMut::new();
        body.put_i32_le(4242);
        body.put_u64_le(1);
        body.put_i32_le(0);
        assert!(matches!(
            decode(body.freeze()),
            Err(CoreError::UnknownMessageType(4242))
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_frames() {
        let frame = encode(&sample()).unwrap();
        let truncated = frame.slice(4..frame.len() - 3);
        assert!(matches!(decode(truncated), Err(CoreError::MalformedFrame(_))));
        assert!(matches!(
            decode(Bytes::from_static(&[1, 0, 0])),
            Err(CoreError::MalformedFrame(_))
        ));
    }

    #[tokio::test]
    async fn test_stream_read_write() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_frame(&mut client, &sample()).await.unwrap();
        let ping = ProxyMessage::new(MessageType::PingRequest);
        write_frame(&mut client, &ping).await.unwrap();
        drop(client);

        assert_eq!(read_frame(&mut server).await.unwrap(), Some(sample()));
        assert_eq!(read_frame(&mut server).await.unwrap(), Some(ping));
        assert_eq!(read_frame(&mut server).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_oversized_length_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client
            .write_all(&((MAX_FRAME_LEN as u32) + 1).to_le_bytes())
            .await
            .unwrap();
        assert!(matches!(
            read_frame(&mut server).await,
            Err(CoreError::MalformedFrame(_))
        ));
    }
}
