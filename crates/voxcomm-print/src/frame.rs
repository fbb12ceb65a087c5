// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binary chunk frames for the file upload sub-protocol.
//
// The file is cut into 4096-byte chunks. Each chunk travels in one frame:
//
//   offset  size  field
//   0       4     magic 5A 5A A5 A5
//   4       4     sequence number
//   8       4     logical (unpadded) chunk length
//   12      4     CRC-32 of the padded chunk
//   16      4096  chunk bytes, zero-padded
//
// The numeric fields are the little-endian encoding with its bytes reversed,
// which puts the most significant byte first.

use crate::checksum::checksum;

/// Payload size of every frame.
pub const CHUNK_SIZE: usize = 4096;

/// Marker at the start of every frame.
pub const FRAME_MAGIC: [u8; 4] = [0x5A, 0x5A, 0xA5, 0xA5];

/// Size of the frame header.
pub const HEADER_LEN: usize = 16;

/// Size of a whole frame on the wire.
pub const FRAME_LEN: usize = HEADER_LEN + CHUNK_SIZE;

/// A contiguous slice of the source file and its position in the upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Ordinal position in the file, starting at 0.
    pub sequence: u32,
    /// Unpadded chunk bytes; at most `CHUNK_SIZE`.
    pub data: &'a [u8],
}

impl Chunk<'_> {
    /// Length before padding, as sent in the header.
    pub fn logical_len(&self) -> usize {
        self.data.len()
    }

    /// Build the wire frame for this chunk.
    pub fn encode(&self) -> Vec<u8> {
        encode(self.sequence, self.data)
    }
}

/// Split `data` into upload chunks, in file order.
///
/// All chunks are `CHUNK_SIZE` long except possibly the last.
pub fn chunks(data: &[u8]) -> impl ExactSizeIterator<Item = Chunk<'_>> {
    data.chunks(CHUNK_SIZE)
        .enumerate()
        .map(|(i, data)| Chunk { sequence: i as u32, data })
}

/// Number of frames needed to carry `len` bytes.
pub fn chunk_count(len: usize) -> usize {
    len.div_ceil(CHUNK_SIZE)
}

/// Encode one chunk as a frame.
///
/// The chunk is zero-padded to `CHUNK_SIZE` first; the checksum covers the
/// padded buffer while the length field carries the unpadded length.
///
/// # Panics
///
/// Panics if `chunk` is longer than `CHUNK_SIZE`.
pub fn encode(sequence: u32, chunk: &[u8]) -> Vec<u8> {
    assert!(
        chunk.len() <= CHUNK_SIZE,
        "chunk of {} bytes exceeds frame payload size",
        chunk.len()
    );

    let mut frame = Vec::with_capacity(FRAME_LEN);
    frame.extend_from_slice(&FRAME_MAGIC);
    frame.extend_from_slice(&reversed_le(sequence));
    frame.extend_from_slice(&reversed_le(chunk.len() as u32));
    // Placeholder, filled once the payload is padded.
    frame.extend_from_slice(&[0; 4]);
    frame.extend_from_slice(chunk);
    frame.resize(FRAME_LEN, 0);

    let crc = checksum(&frame[HEADER_LEN..]);
    frame[12..HEADER_LEN].copy_from_slice(&reversed_le(crc));
    frame
}

/// Little-endian bytes of `value`, emitted last byte first.
fn reversed_le(value: u32) -> [u8; 4] {
    let mut bytes = value.to_le_bytes();
    bytes.reverse();
    bytes
}

/// Decoded frame header.
///
/// The client never receives frames; this exists for inspecting captured
/// traffic and for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub sequence: u32,
    pub logical_len: u32,
    pub checksum: u32,
}

impl FrameHeader {
    /// Parse the header at the start of `bytes`. Returns `None` when the
    /// buffer is short or the magic does not match.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN || bytes[..4] != FRAME_MAGIC {
            return None;
        }
        let field = |at: usize| {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&bytes[at..at + 4]);
            raw.reverse();
            u32::from_le_bytes(raw)
        };
        Some(Self {
            sequence: field(4),
            logical_len: field(8),
            checksum: field(12),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_matches_firmware() {
        let frame = encode(0x0102_0304, &[0xAB; 0x10]);
        assert_eq!(&frame[..4], &FRAME_MAGIC);
        assert_eq!(&frame[4..8], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&frame[8..12], &[0x00, 0x00, 0x00, 0x10]);
        assert_eq!(frame.len(), FRAME_LEN);
    }

    #[test]
    fn checksum_covers_padded_buffer() {
        let data = b"G1 X10 Y10\n";
        let frame = encode(2, data);
        let mut padded = data.to_vec();
        padded.resize(CHUNK_SIZE, 0);

        let header = FrameHeader::parse(&frame).unwrap();
        assert_eq!(header.checksum, checksum(&padded));
        assert_ne!(header.checksum, checksum(data));
        assert_eq!(header.logical_len as usize, data.len());
        assert_eq!(&frame[HEADER_LEN..HEADER_LEN + data.len()], data);
        assert!(frame[HEADER_LEN + data.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn header_fields_are_reversed_little_endian() {
        let frame = encode(7, &[1; CHUNK_SIZE]);
        let crc = checksum(&[1; CHUNK_SIZE]);
        let mut seq = [0u8; 4];
        seq.copy_from_slice(&frame[4..8]);
        seq.reverse();
        assert_eq!(u32::from_le_bytes(seq), 7);
        assert_eq!(&frame[12..16], &crc.to_be_bytes());
    }

    #[test]
    fn parse_rejects_bad_magic_and_short_input() {
        let mut frame = encode(0, b"x");
        assert!(FrameHeader::parse(&frame[..10]).is_none());
        frame[0] = 0;
        assert!(FrameHeader::parse(&frame).is_none());
    }

    #[test]
    fn nine_thousand_bytes_make_three_chunks() {
        let data = vec![0x47u8; 9000];
        let lens: Vec<usize> = chunks(&data).map(|c| c.logical_len()).collect();
        assert_eq!(lens, vec![4096, 4096, 808]);
        assert_eq!(chunk_count(data.len()), 3);

        let last = chunks(&data).last().unwrap();
        assert_eq!(last.sequence, 2);
        assert_eq!(last.encode().len(), FRAME_LEN);
    }

    #[test]
    fn exact_multiple_has_full_last_chunk() {
        let data = vec![0u8; CHUNK_SIZE * 2];
        let all: Vec<Chunk<'_>> = chunks(&data).collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].logical_len(), CHUNK_SIZE);
        assert_eq!(chunk_count(data.len()), 2);
    }

    #[test]
    fn every_chunk_round_trips_through_header() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        for chunk in chunks(&data) {
            let frame = chunk.encode();
            let header = FrameHeader::parse(&frame).unwrap();
            assert_eq!(header.sequence, chunk.sequence);
            assert_eq!(header.logical_len as usize, chunk.logical_len());
            assert_eq!(header.checksum, checksum(&frame[HEADER_LEN..]));
        }
    }

    #[test]
    #[should_panic(expected = "exceeds frame payload size")]
    fn oversized_chunk_panics() {
        encode(0, &[0; CHUNK_SIZE + 1]);
    }
}
