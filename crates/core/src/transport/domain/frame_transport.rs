use thiserror::Error;

use crate::shared::candidate::FaceBox;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("handshake aborted before a consumer connected")]
    HandshakeAborted,
    #[error("no active session")]
    NoSession,
    #[error("failed to serialize frame metadata: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("session closed: {0}")]
    SessionClosed(#[source] std::io::Error),
}

/// One frame's worth of data ready for the wire: compressed payload plus
/// the detection metadata the consumer renders with.
#[derive(Clone, Debug)]
pub struct AnnotatedFrame {
    pub width: u32,
    pub height: u32,
    pub face: Option<FaceBox>,
    pub angle_degrees: f32,
    pub payload: Vec<u8>,
}

/// Relays annotated frames to the single remote consumer.
///
/// `start_session` blocks (polling, cancellable) until a consumer is
/// bound; afterwards `send_frame` is called once per frame. A
/// `SessionClosed` error from `send_frame` ends the session loop;
/// loss-tolerant implementations absorb per-packet failures themselves
/// and only report conditions that make the session unusable.
pub trait FrameTransport: Send {
    fn start_session(&mut self) -> Result<(), TransportError>;

    fn send_frame(&mut self, frame: &AnnotatedFrame) -> Result<(), TransportError>;

    /// Releases the socket. Idempotent.
    fn close(&mut self);
}
