use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5006;

/// Maximum payload bytes per datagram chunk, kept below the practical
/// ~65000-byte datagram ceiling with headroom for the chunk header.
pub const MAX_CHUNK_PAYLOAD: usize = 60_000;

pub const HANDSHAKE_REQUEST: &[u8] = b"START";
pub const HANDSHAKE_REPLY: &[u8] = b"READY";

/// Sleep between polls while waiting for a consumer to initiate a session.
pub const HANDSHAKE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Side length the verifier resizes candidate regions to before descriptor
/// extraction. Must match the resolution the artifacts were trained at.
pub const TRAINING_RESOLUTION: u32 = 128;

/// Below this many descriptors a region cannot form a reliable histogram;
/// the verifier rejects it without consulting the classifier.
pub const MIN_DESCRIPTORS: usize = 5;

pub const DEFAULT_IOU_THRESHOLD: f64 = 0.3;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.0;
pub const DEFAULT_MIN_FACE_SIZE: u32 = 80;

/// Minimum eye-detection side length considered by the angle estimator.
pub const MIN_EYE_SIZE: u32 = 15;

pub const DEFAULT_JPEG_QUALITY: u8 = 70;
pub const DEFAULT_TARGET_FPS: f64 = 30.0;
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(1);

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

pub const CODEBOOK_FILENAME: &str = "codebook.json";
pub const CLASSIFIER_FILENAME: &str = "classifier.json";

/// Denominator guard used by histogram normalization and IoU.
pub const EPSILON: f64 = 1e-6;
