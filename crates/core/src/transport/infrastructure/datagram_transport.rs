use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::shared::constants::{HANDSHAKE_POLL_INTERVAL, HANDSHAKE_REPLY, HANDSHAKE_REQUEST};
use crate::transport::domain::chunk::{split_payload, total_chunks, ChunkHeader, CHUNK_HEADER_LEN};
use crate::transport::domain::frame_transport::{AnnotatedFrame, FrameTransport, TransportError};

/// Loss-tolerant chunked transport over UDP.
///
/// The socket is bound at construction so an unusable endpoint fails
/// startup. The consumer initiates the session with a `START` datagram;
/// the server records the sender as the sole peer, replies `READY`, and
/// streams unsolicited frames from then on. There is no acknowledgement
/// and no retransmission: a lost chunk means the receiver abandons that
/// frame.
pub struct DatagramTransport {
    socket: Option<UdpSocket>,
    peer: Option<SocketAddr>,
    chunk_size: usize,
    next_frame_id: u16,
    cancelled: Arc<AtomicBool>,
}

impl DatagramTransport {
    pub fn new(
        bind_addr: SocketAddr,
        chunk_size: usize,
        cancelled: Arc<AtomicBool>,
    ) -> Result<Self, TransportError> {
        debug_assert!(chunk_size > 0, "chunk size must be positive");
        let socket = UdpSocket::bind(bind_addr).map_err(|e| TransportError::Bind {
            addr: bind_addr.to_string(),
            source: e,
        })?;
        socket
            .set_nonblocking(true)
            .map_err(TransportError::SessionClosed)?;
        Ok(Self {
            socket: Some(socket),
            peer: None,
            chunk_size,
            next_frame_id: 0,
            cancelled,
        })
    }

    /// Address the socket is actually bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// The next frame id to be stamped on outgoing chunks.
    pub fn next_frame_id(&self) -> u16 {
        self.next_frame_id
    }
}

impl FrameTransport for DatagramTransport {
    /// Busy-polls (non-blocking receive with a sleep backoff) for the
    /// handshake datagram, then binds the session to its sender.
    fn start_session(&mut self) -> Result<(), TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NoSession)?;

        log::info!(
            "waiting for consumer handshake on {}",
            self.local_addr()
                .map_or_else(|| "<unbound>".to_string(), |a| a.to_string())
        );
        let mut buf = [0u8; 16];
        let peer = loop {
            if self.cancelled.load(Ordering::Relaxed) {
                return Err(TransportError::HandshakeAborted);
            }
            match socket.recv_from(&mut buf) {
                Ok((n, addr)) if &buf[..n] == HANDSHAKE_REQUEST => break addr,
                Ok((n, addr)) => {
                    log::debug!("ignoring unexpected {n}-byte datagram from {addr}");
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(HANDSHAKE_POLL_INTERVAL);
                }
                Err(e) => {
                    log::debug!("handshake receive error: {e}");
                    thread::sleep(HANDSHAKE_POLL_INTERVAL);
                }
            }
        };

        if let Err(e) = socket.send_to(HANDSHAKE_REPLY, peer) {
            log::warn!("failed to send handshake reply to {peer}: {e}");
        }
        log::info!("session established with {peer}");
        self.peer = Some(peer);
        Ok(())
    }

    /// Fragments the payload and sends every chunk best-effort: a failed
    /// chunk is logged and the rest still go out, since the receiver
    /// abandons incomplete frames anyway.
    fn send_frame(&mut self, frame: &AnnotatedFrame) -> Result<(), TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NoSession)?;
        let peer = self.peer.ok_or(TransportError::NoSession)?;

        let total = total_chunks(frame.payload.len(), self.chunk_size);
        let frame_id = self.next_frame_id as u32;
        let mut packet = Vec::with_capacity(CHUNK_HEADER_LEN + self.chunk_size);

        for (index, chunk) in split_payload(&frame.payload, self.chunk_size).enumerate() {
            let header = ChunkHeader {
                frame_id,
                chunk_index: index as u32,
                total_chunks: total,
                chunk_len: chunk.len() as u32,
                total_len: frame.payload.len() as u32,
                face: frame.face,
                angle_degrees: frame.angle_degrees,
            };
            packet.clear();
            packet.extend_from_slice(&header.encode());
            packet.extend_from_slice(chunk);

            if let Err(e) = socket.send_to(&packet, peer) {
                log::warn!("frame {frame_id}: chunk {index}/{total} not sent: {e}");
            }
        }

        self.next_frame_id = self.next_frame_id.wrapping_add(1);
        Ok(())
    }

    fn close(&mut self) {
        self.socket = None;
        self.peer = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::candidate::FaceBox;
    use std::time::Duration;

    fn loopback() -> SocketAddr {
        // Port 0: the OS picks a free port, keeping tests parallel-safe.
        "127.0.0.1:0".parse().unwrap()
    }

    fn annotated(payload: Vec<u8>) -> AnnotatedFrame {
        AnnotatedFrame {
            width: 640,
            height: 480,
            face: Some(FaceBox::new(10, 20, 100, 120)),
            angle_degrees: 3.5,
            payload,
        }
    }

    /// Performs the handshake against a real socket pair; the transport is
    /// bound before the client sends, so the START datagram is queued when
    /// `start_session` first polls.
    fn establish(chunk_size: usize) -> (DatagramTransport, UdpSocket) {
        let mut transport =
            DatagramTransport::new(loopback(), chunk_size, Arc::new(AtomicBool::new(false)))
                .unwrap();
        let server_addr = transport.local_addr().unwrap();

        let client = UdpSocket::bind(loopback()).unwrap();
        client.send_to(HANDSHAKE_REQUEST, server_addr).unwrap();

        transport.start_session().unwrap();

        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let mut buf = [0u8; 16];
        let (n, _) = client.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], HANDSHAKE_REPLY);
        (transport, client)
    }

    fn recv_packets(client: &UdpSocket, count: usize) -> Vec<Vec<u8>> {
        let mut packets = Vec::new();
        let mut buf = vec![0u8; 65_536];
        for _ in 0..count {
            let (n, _) = client.recv_from(&mut buf).unwrap();
            packets.push(buf[..n].to_vec());
        }
        packets
    }

    #[test]
    fn test_handshake_then_single_chunk_frame() {
        let (mut transport, client) = establish(1000);
        transport.send_frame(&annotated(vec![7u8; 500])).unwrap();

        let packets = recv_packets(&client, 1);
        let header = ChunkHeader::decode(&packets[0]).unwrap();
        assert_eq!(header.frame_id, 0);
        assert_eq!(header.chunk_index, 0);
        assert_eq!(header.total_chunks, 1);
        assert_eq!(header.chunk_len, 500);
        assert_eq!(header.total_len, 500);
        assert_eq!(header.face, Some(FaceBox::new(10, 20, 100, 120)));
        assert_eq!(&packets[0][CHUNK_HEADER_LEN..], &[7u8; 500][..]);
    }

    #[test]
    fn test_multi_chunk_frame_reassembles() {
        let (mut transport, client) = establish(1000);
        let payload: Vec<u8> = (0..2500).map(|i| (i % 256) as u8).collect();
        transport.send_frame(&annotated(payload.clone())).unwrap();

        let mut packets = recv_packets(&client, 3);
        packets.sort_by_key(|p| ChunkHeader::decode(p).unwrap().chunk_index);

        let mut reassembled = Vec::new();
        for packet in &packets {
            let header = ChunkHeader::decode(packet).unwrap();
            assert_eq!(header.total_chunks, 3);
            assert_eq!(header.total_len, 2500);
            // Header metadata repeats identically on every chunk.
            assert_eq!(header.face, Some(FaceBox::new(10, 20, 100, 120)));
            reassembled.extend_from_slice(&packet[CHUNK_HEADER_LEN..]);
        }
        assert_eq!(reassembled, payload);
    }

    #[test]
    fn test_frame_id_increments_per_frame() {
        let (mut transport, client) = establish(1000);
        for _ in 0..3 {
            transport.send_frame(&annotated(vec![0u8; 10])).unwrap();
        }
        let packets = recv_packets(&client, 3);
        let ids: Vec<u32> = packets
            .iter()
            .map(|p| ChunkHeader::decode(p).unwrap().frame_id)
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_frame_id_wraps_at_65536() {
        let (mut transport, _client) = establish(1000);
        transport.next_frame_id = u16::MAX;
        transport.send_frame(&annotated(vec![0u8; 10])).unwrap();
        assert_eq!(transport.next_frame_id(), 0);
    }

    #[test]
    fn test_send_without_handshake_is_error() {
        let mut transport =
            DatagramTransport::new(loopback(), 1000, Arc::new(AtomicBool::new(false))).unwrap();
        let result = transport.send_frame(&annotated(vec![1, 2, 3]));
        assert!(matches!(result, Err(TransportError::NoSession)));
    }

    #[test]
    fn test_cancelled_handshake_aborts() {
        let cancelled = Arc::new(AtomicBool::new(true));
        let mut transport = DatagramTransport::new(loopback(), 1000, cancelled).unwrap();
        assert!(matches!(
            transport.start_session(),
            Err(TransportError::HandshakeAborted)
        ));
    }

    #[test]
    fn test_non_handshake_datagram_ignored() {
        let mut transport =
            DatagramTransport::new(loopback(), 1000, Arc::new(AtomicBool::new(false))).unwrap();
        let server_addr = transport.local_addr().unwrap();

        let client = UdpSocket::bind(loopback()).unwrap();
        client.send_to(b"HELLO", server_addr).unwrap();
        client.send_to(HANDSHAKE_REQUEST, server_addr).unwrap();

        transport.start_session().unwrap();
        assert!(transport.peer.is_some());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut transport =
            DatagramTransport::new(loopback(), 1000, Arc::new(AtomicBool::new(false))).unwrap();
        transport.close();
        transport.close();
        assert!(matches!(
            transport.send_frame(&annotated(vec![1])),
            Err(TransportError::NoSession)
        ));
    }
}
