//! Wire framing for the chunked datagram protocol.
//!
//! Every chunk of a frame carries the full 44-byte header, so a receiver
//! can recover frame-level metadata (size, face box, angle) from any
//! chunk that happens to arrive; there is no privileged chunk 0.
//! All header fields are little-endian.

use thiserror::Error;

use crate::shared::candidate::FaceBox;

/// 6 u32 + 4 i32 + 1 f32, 4 bytes each.
pub const CHUNK_HEADER_LEN: usize = 44;

#[derive(Error, Debug, PartialEq)]
pub enum ChunkDecodeError {
    #[error("packet too short for a chunk header: {0} bytes")]
    TooShort(usize),
}

/// Per-packet header of the chunked datagram protocol.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkHeader {
    pub frame_id: u32,
    pub chunk_index: u32,
    pub total_chunks: u32,
    pub chunk_len: u32,
    pub total_len: u32,
    pub face: Option<FaceBox>,
    pub angle_degrees: f32,
}

impl ChunkHeader {
    pub fn encode(&self) -> [u8; CHUNK_HEADER_LEN] {
        let face = self.face.unwrap_or(FaceBox::new(0, 0, 0, 0));
        let has_face: u32 = self.face.is_some() as u32;

        let mut buf = [0u8; CHUNK_HEADER_LEN];
        buf[0..4].copy_from_slice(&self.frame_id.to_le_bytes());
        buf[4..8].copy_from_slice(&self.chunk_index.to_le_bytes());
        buf[8..12].copy_from_slice(&self.total_chunks.to_le_bytes());
        buf[12..16].copy_from_slice(&self.chunk_len.to_le_bytes());
        buf[16..20].copy_from_slice(&self.total_len.to_le_bytes());
        buf[20..24].copy_from_slice(&has_face.to_le_bytes());
        buf[24..28].copy_from_slice(&face.x.to_le_bytes());
        buf[28..32].copy_from_slice(&face.y.to_le_bytes());
        buf[32..36].copy_from_slice(&face.width.to_le_bytes());
        buf[36..40].copy_from_slice(&face.height.to_le_bytes());
        buf[40..44].copy_from_slice(&self.angle_degrees.to_le_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ChunkDecodeError> {
        if bytes.len() < CHUNK_HEADER_LEN {
            return Err(ChunkDecodeError::TooShort(bytes.len()));
        }
        let u32_at = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        let i32_at = |i: usize| i32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);

        let has_face = u32_at(20) != 0;
        let face = has_face.then(|| FaceBox::new(i32_at(24), i32_at(28), i32_at(32), i32_at(36)));

        Ok(Self {
            frame_id: u32_at(0),
            chunk_index: u32_at(4),
            total_chunks: u32_at(8),
            chunk_len: u32_at(12),
            total_len: u32_at(16),
            face,
            angle_degrees: f32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]),
        })
    }
}

/// Number of chunks a payload fragments into: `ceil(len / chunk_size)`.
/// An empty payload needs no packets at all.
pub fn total_chunks(payload_len: usize, chunk_size: usize) -> u32 {
    debug_assert!(chunk_size > 0, "chunk size must be positive");
    payload_len.div_ceil(chunk_size) as u32
}

/// Splits a payload into successive chunks of at most `chunk_size` bytes.
pub fn split_payload(payload: &[u8], chunk_size: usize) -> impl Iterator<Item = &[u8]> {
    debug_assert!(chunk_size > 0, "chunk size must be positive");
    payload.chunks(chunk_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn header_with_face() -> ChunkHeader {
        ChunkHeader {
            frame_id: 12345,
            chunk_index: 2,
            total_chunks: 7,
            chunk_len: 60000,
            total_len: 125000,
            face: Some(FaceBox::new(-4, 10, 120, 140)),
            angle_degrees: -12.5,
        }
    }

    #[test]
    fn test_header_round_trip_with_face() {
        let header = header_with_face();
        let decoded = ChunkHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_header_round_trip_without_face() {
        let header = ChunkHeader {
            face: None,
            angle_degrees: 0.0,
            ..header_with_face()
        };
        let decoded = ChunkHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
        assert!(decoded.face.is_none());
    }

    #[test]
    fn test_encoded_layout_is_little_endian() {
        let header = header_with_face();
        let bytes = header.encode();
        assert_eq!(&bytes[0..4], &12345u32.to_le_bytes());
        // has_face flag.
        assert_eq!(&bytes[20..24], &1u32.to_le_bytes());
        // Negative face x survives as i32.
        assert_eq!(&bytes[24..28], &(-4i32).to_le_bytes());
    }

    #[test]
    fn test_missing_face_encodes_zero_rect() {
        let header = ChunkHeader {
            face: None,
            ..header_with_face()
        };
        let bytes = header.encode();
        assert_eq!(&bytes[20..40], &[0u8; 20]);
    }

    #[test]
    fn test_decode_short_packet() {
        let result = ChunkHeader::decode(&[0u8; 10]);
        assert_eq!(result, Err(ChunkDecodeError::TooShort(10)));
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(59_999, 1)]
    #[case(60_000, 1)]
    #[case(60_001, 2)]
    #[case(125_000, 3)]
    #[case(600_000, 10)]
    fn test_total_chunks(#[case] payload_len: usize, #[case] expected: u32) {
        assert_eq!(total_chunks(payload_len, 60_000), expected);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(999)]
    #[case(1000)]
    #[case(1001)]
    #[case(10_000)]
    fn test_split_round_trip(#[case] size: usize) {
        let chunk_size = 1000;
        let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();

        let chunks: Vec<&[u8]> = split_payload(&payload, chunk_size).collect();
        assert_eq!(chunks.len() as u32, total_chunks(size, chunk_size));

        let reassembled: Vec<u8> = chunks.concat();
        assert_eq!(reassembled, payload);
    }

    #[test]
    fn test_split_chunk_lengths() {
        let payload = vec![0u8; 125_000];
        let lengths: Vec<usize> = split_payload(&payload, 60_000).map(|c| c.len()).collect();
        assert_eq!(lengths, vec![60_000, 60_000, 5_000]);
    }

    #[test]
    fn test_all_chunks_within_bound() {
        let payload = vec![0u8; 123_456];
        for chunk in split_payload(&payload, 60_000) {
            assert!(chunk.len() <= 60_000);
            assert!(!chunk.is_empty());
        }
    }
}
