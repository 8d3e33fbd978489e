//! Realtime face detection, verification, and frame streaming.
//!
//! The library is organized around a single synchronous session loop:
//! frames flow from a [`video::domain::frame_source::FrameSource`] through
//! the proposal/verification pipeline, get annotated with a face box and
//! head angle, and are relayed to one remote consumer through a
//! [`transport::domain::frame_transport::FrameTransport`].
//!
//! Domain modules hold traits and pure logic; infrastructure modules hold
//! the crate-backed adapters.

pub mod detection;
pub mod pipeline;
pub mod shared;
pub mod transport;
pub mod video;
