use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use serde::Serialize;

use crate::shared::constants::HANDSHAKE_POLL_INTERVAL;
use crate::transport::domain::frame_transport::{AnnotatedFrame, FrameTransport, TransportError};

/// Per-frame metadata record, serialized as JSON ahead of the payload.
#[derive(Serialize)]
struct StreamMeta {
    w: u32,
    h: u32,
    face: Option<[i32; 4]>,
    angle: f32,
}

/// Reliable-stream transport over TCP.
///
/// Each frame is one length-prefixed metadata record followed by one
/// length-prefixed compressed payload (both prefixes u32, network byte
/// order). The stream guarantees ordered, complete delivery, so no
/// fragmentation is needed, and blocking sends give natural backpressure:
/// a slow consumer stalls frame production instead of growing a queue.
pub struct StreamTransport {
    listener: Option<TcpListener>,
    stream: Option<TcpStream>,
    cancelled: Arc<AtomicBool>,
}

impl StreamTransport {
    pub fn new(bind_addr: SocketAddr, cancelled: Arc<AtomicBool>) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(bind_addr).map_err(|e| TransportError::Bind {
            addr: bind_addr.to_string(),
            source: e,
        })?;
        listener
            .set_nonblocking(true)
            .map_err(TransportError::SessionClosed)?;
        Ok(Self {
            listener: Some(listener),
            stream: None,
            cancelled,
        })
    }

    /// Address the listener is actually bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }
}

impl FrameTransport for StreamTransport {
    /// Polls for a single consumer connection. The listener stays
    /// non-blocking only for this accept loop; the accepted stream itself
    /// uses blocking sends.
    fn start_session(&mut self) -> Result<(), TransportError> {
        let listener = self.listener.as_ref().ok_or(TransportError::NoSession)?;

        log::info!(
            "waiting for consumer connection on {}",
            self.local_addr()
                .map_or_else(|| "<unbound>".to_string(), |a| a.to_string())
        );
        let (stream, peer) = loop {
            if self.cancelled.load(Ordering::Relaxed) {
                return Err(TransportError::HandshakeAborted);
            }
            match listener.accept() {
                Ok(accepted) => break accepted,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(HANDSHAKE_POLL_INTERVAL);
                }
                Err(e) => {
                    log::debug!("accept error: {e}");
                    thread::sleep(HANDSHAKE_POLL_INTERVAL);
                }
            }
        };

        stream
            .set_nonblocking(false)
            .map_err(TransportError::SessionClosed)?;
        if let Err(e) = stream.set_nodelay(true) {
            log::debug!("could not disable Nagle on {peer}: {e}");
        }
        log::info!("session established with {peer}");
        self.stream = Some(stream);
        Ok(())
    }

    /// Writes one framed record. Any write failure means the stream is
    /// dead (reset or broken pipe), which ends the session.
    fn send_frame(&mut self, frame: &AnnotatedFrame) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NoSession)?;

        let meta = StreamMeta {
            w: frame.width,
            h: frame.height,
            face: frame
                .face
                .map(|f| [f.x, f.y, f.width, f.height]),
            angle: frame.angle_degrees,
        };
        let meta_bytes = serde_json::to_vec(&meta)?;

        let mut header = [0u8; 8];
        header[0..4].copy_from_slice(&(meta_bytes.len() as u32).to_be_bytes());
        header[4..8].copy_from_slice(&(frame.payload.len() as u32).to_be_bytes());

        stream
            .write_all(&header)
            .and_then(|_| stream.write_all(&meta_bytes))
            .and_then(|_| stream.write_all(&frame.payload))
            .map_err(TransportError::SessionClosed)
    }

    fn close(&mut self) {
        self.stream = None;
        self.listener = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::candidate::FaceBox;
    use std::io::Read;
    use std::time::Duration;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    fn annotated(face: Option<FaceBox>, payload: Vec<u8>) -> AnnotatedFrame {
        AnnotatedFrame {
            width: 640,
            height: 480,
            face,
            angle_degrees: -7.25,
            payload,
        }
    }

    fn establish() -> (StreamTransport, TcpStream) {
        let mut transport =
            StreamTransport::new(loopback(), Arc::new(AtomicBool::new(false))).unwrap();
        let addr = transport.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        transport.start_session().unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        (transport, client)
    }

    fn read_record(client: &mut TcpStream) -> (serde_json::Value, Vec<u8>) {
        let mut header = [0u8; 8];
        client.read_exact(&mut header).unwrap();
        let meta_len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let payload_len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;

        let mut meta = vec![0u8; meta_len];
        client.read_exact(&mut meta).unwrap();
        let mut payload = vec![0u8; payload_len];
        client.read_exact(&mut payload).unwrap();
        (serde_json::from_slice(&meta).unwrap(), payload)
    }

    #[test]
    fn test_frame_with_face_round_trips() {
        let (mut transport, mut client) = establish();
        let payload = vec![42u8; 2048];
        transport
            .send_frame(&annotated(Some(FaceBox::new(5, 6, 70, 80)), payload.clone()))
            .unwrap();

        let (meta, received) = read_record(&mut client);
        assert_eq!(meta["w"], 640);
        assert_eq!(meta["h"], 480);
        assert_eq!(meta["face"], serde_json::json!([5, 6, 70, 80]));
        assert!((meta["angle"].as_f64().unwrap() + 7.25).abs() < 1e-6);
        assert_eq!(received, payload);
    }

    #[test]
    fn test_frame_without_face_serializes_null() {
        let (mut transport, mut client) = establish();
        transport.send_frame(&annotated(None, vec![1, 2, 3])).unwrap();

        let (meta, payload) = read_record(&mut client);
        assert!(meta["face"].is_null());
        assert_eq!(payload, vec![1, 2, 3]);
    }

    #[test]
    fn test_consecutive_frames_stay_framed() {
        let (mut transport, mut client) = establish();
        for i in 0..3u8 {
            transport
                .send_frame(&annotated(None, vec![i; (i as usize + 1) * 10]))
                .unwrap();
        }
        for i in 0..3u8 {
            let (_, payload) = read_record(&mut client);
            assert_eq!(payload, vec![i; (i as usize + 1) * 10]);
        }
    }

    #[test]
    fn test_send_after_disconnect_is_session_closed() {
        let (mut transport, client) = establish();
        drop(client);

        // The first send may land in the kernel buffer before the reset
        // is observed; a handful of large sends must surface the error.
        let mut saw_closed = false;
        for _ in 0..10 {
            match transport.send_frame(&annotated(None, vec![0u8; 1 << 20])) {
                Err(TransportError::SessionClosed(_)) => {
                    saw_closed = true;
                    break;
                }
                Ok(()) => continue,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(saw_closed, "disconnect never surfaced as SessionClosed");
    }

    #[test]
    fn test_send_without_session_is_error() {
        let mut transport =
            StreamTransport::new(loopback(), Arc::new(AtomicBool::new(false))).unwrap();
        assert!(matches!(
            transport.send_frame(&annotated(None, vec![1])),
            Err(TransportError::NoSession)
        ));
    }

    #[test]
    fn test_cancelled_handshake_aborts() {
        let cancelled = Arc::new(AtomicBool::new(true));
        let mut transport = StreamTransport::new(loopback(), cancelled).unwrap();
        assert!(matches!(
            transport.start_session(),
            Err(TransportError::HandshakeAborted)
        ));
    }
}
