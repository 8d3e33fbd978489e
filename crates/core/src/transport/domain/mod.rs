pub mod chunk;
pub mod frame_transport;
