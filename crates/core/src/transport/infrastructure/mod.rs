pub mod datagram_transport;
pub mod stream_transport;
