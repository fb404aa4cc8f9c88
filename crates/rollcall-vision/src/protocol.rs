//! Wire protocol spoken with the face service.
//!
//! Messages are JSON, framed with a u32 little-endian length prefix.
//! One request, one response; frame streaming is pull-based — the
//! client asks for each frame, so the service's capture rate paces the
//! recognition loop and nothing ever queues up.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use rollcall_core::CapabilityError;

pub const DEFAULT_SOCKET_PATH: &str = "/run/rollcall/vision.sock";

/// Upper bound on a single framed message. Face encodings are tiny; a
/// larger frame means a confused or hostile peer.
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Request {
    /// Encode every face found in an image file on disk.
    EncodePhoto { path: String },
    /// Capture the next live frame and return its face encodings.
    NextFrame,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Response {
    /// Answer to `EncodePhoto`. Empty when the photo has no face.
    Encodings { faces: Vec<Vec<f32>> },
    /// Answer to `NextFrame`. Empty when the frame has no face.
    Frame { faces: Vec<Vec<f32>> },
    /// The capture stream is over (device closed or source exhausted).
    StreamEnd,
    Error { message: String },
}

pub fn write_message<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> Result<(), CapabilityError> {
    let data = serde_json::to_vec(msg)
        .map_err(|e| CapabilityError::Protocol(format!("encode: {e}")))?;
    writer.write_all(&(data.len() as u32).to_le_bytes())?;
    writer.write_all(&data)?;
    writer.flush()?;
    Ok(())
}

pub fn read_message<R: Read, T: for<'de> Deserialize<'de>>(reader: &mut R) -> Result<T, CapabilityError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_BYTES {
        return Err(CapabilityError::Protocol(format!(
            "message of {len} bytes exceeds the {MAX_MESSAGE_BYTES} byte cap"
        )));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    serde_json::from_slice(&buf).map_err(|e| CapabilityError::Protocol(format!("decode: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framed_round_trip() {
        let mut buf = Vec::new();
        let req = Request::EncodePhoto { path: "photos/r1.jpg".into() };
        write_message(&mut buf, &req).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let back: Request = read_message(&mut cursor).unwrap();
        assert!(matches!(back, Request::EncodePhoto { path } if path == "photos/r1.jpg"));
    }

    #[test]
    fn test_oversize_frame_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_MESSAGE_BYTES as u32 + 1).to_le_bytes());
        let mut cursor = std::io::Cursor::new(buf);
        let err = read_message::<_, Response>(&mut cursor).unwrap_err();
        assert!(matches!(err, CapabilityError::Protocol(_)));
    }

    #[test]
    fn test_garbage_payload_is_a_protocol_error() {
        let payload = b"not json";
        let mut buf = Vec::new();
        buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(payload);
        let mut cursor = std::io::Cursor::new(buf);
        let err = read_message::<_, Response>(&mut cursor).unwrap_err();
        assert!(matches!(err, CapabilityError::Protocol(_)));
    }
}
