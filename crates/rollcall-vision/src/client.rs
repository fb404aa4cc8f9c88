use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use rollcall_core::{CapabilityError, Encoding, FrameObservation, FrameStream, ReferenceEncoder};

use crate::protocol::{read_message, write_message, Request, Response};

const CONNECT_ATTEMPTS: u32 = 3;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(300);

/// Synchronous client for the face service. One request in flight at a
/// time, matching the single-operator model: the recognition loop blocks
/// on each frame.
#[derive(Debug)]
pub struct VisionClient {
    stream: UnixStream,
}

impl VisionClient {
    /// Connect to the service socket, retrying briefly in case the
    /// service is still coming up.
    pub fn connect<P: AsRef<Path>>(socket_path: P) -> Result<Self, CapabilityError> {
        let path = socket_path.as_ref();
        let mut last_err = None;
        for attempt in 1..=CONNECT_ATTEMPTS {
            match UnixStream::connect(path) {
                Ok(stream) => {
                    tracing::info!(socket = %path.display(), "connected to face service");
                    return Ok(Self { stream });
                }
                Err(err) => {
                    tracing::debug!(
                        socket = %path.display(),
                        attempt,
                        error = %err,
                        "face service connect failed"
                    );
                    last_err = Some(err);
                    if attempt < CONNECT_ATTEMPTS {
                        std::thread::sleep(CONNECT_RETRY_DELAY);
                    }
                }
            }
        }
        Err(CapabilityError::Io(last_err.expect("at least one attempt")))
    }

    pub fn from_stream(stream: UnixStream) -> Self {
        Self { stream }
    }

    fn request(&mut self, request: &Request) -> Result<Response, CapabilityError> {
        write_message(&mut self.stream, request)?;
        read_message(&mut self.stream)
    }
}

impl ReferenceEncoder for VisionClient {
    fn encode_photo(&mut self, photo_path: &str) -> Result<Vec<Encoding>, CapabilityError> {
        match self.request(&Request::EncodePhoto {
            path: photo_path.to_string(),
        })? {
            Response::Encodings { faces } => {
                Ok(faces.into_iter().map(Encoding::new).collect())
            }
            Response::Error { message } => Err(CapabilityError::Service(message)),
            other => Err(CapabilityError::Protocol(format!(
                "unexpected response to EncodePhoto: {other:?}"
            ))),
        }
    }
}

impl FrameStream for VisionClient {
    fn next_observation(&mut self) -> Result<Option<FrameObservation>, CapabilityError> {
        match self.request(&Request::NextFrame)? {
            Response::Frame { faces } => Ok(Some(FrameObservation {
                faces: faces.into_iter().map(Encoding::new).collect(),
            })),
            Response::StreamEnd => Ok(None),
            Response::Error { message } => Err(CapabilityError::Service(message)),
            other => Err(CapabilityError::Protocol(format!(
                "unexpected response to NextFrame: {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    /// Run a scripted service on the other end of a socketpair.
    fn scripted_service(responses: Vec<Response>) -> (VisionClient, thread::JoinHandle<Vec<Request>>) {
        let (client_end, mut service_end) = UnixStream::pair().unwrap();
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for response in responses {
                let req: Request = read_message(&mut service_end).unwrap();
                seen.push(req);
                write_message(&mut service_end, &response).unwrap();
            }
            seen
        });
        (VisionClient::from_stream(client_end), handle)
    }

    #[test]
    fn test_encode_photo_maps_faces() {
        let (mut client, handle) = scripted_service(vec![Response::Encodings {
            faces: vec![vec![0.1, 0.2], vec![0.3, 0.4]],
        }]);

        let encodings = client.encode_photo("photos/r1.jpg").unwrap();
        assert_eq!(encodings.len(), 2);
        assert_eq!(encodings[0].values, vec![0.1, 0.2]);

        let seen = handle.join().unwrap();
        assert!(matches!(&seen[0], Request::EncodePhoto { path } if path == "photos/r1.jpg"));
    }

    #[test]
    fn test_next_frame_and_stream_end() {
        let (mut client, handle) = scripted_service(vec![
            Response::Frame { faces: vec![vec![1.0]] },
            Response::Frame { faces: vec![] },
            Response::StreamEnd,
        ]);

        let first = client.next_observation().unwrap().unwrap();
        assert_eq!(first.faces.len(), 1);
        let second = client.next_observation().unwrap().unwrap();
        assert!(second.faces.is_empty());
        assert!(client.next_observation().unwrap().is_none());
        handle.join().unwrap();
    }

    #[test]
    fn test_service_error_surfaces() {
        let (mut client, handle) = scripted_service(vec![Response::Error {
            message: "camera unavailable".into(),
        }]);

        let err = client.next_observation().unwrap_err();
        assert!(matches!(err, CapabilityError::Service(msg) if msg == "camera unavailable"));
        handle.join().unwrap();
    }

    #[test]
    fn test_mismatched_response_is_a_protocol_error() {
        let (mut client, handle) = scripted_service(vec![Response::Frame { faces: vec![] }]);

        let err = client.encode_photo("photos/r1.jpg").unwrap_err();
        assert!(matches!(err, CapabilityError::Protocol(_)));
        handle.join().unwrap();
    }

    #[test]
    fn test_connect_fails_on_missing_socket() {
        let err = VisionClient::connect("/nonexistent/rollcall-vision.sock").unwrap_err();
        assert!(matches!(err, CapabilityError::Io(_)));
    }
}
