//! monitor.rs
//! Receiver-side observer of the wire: splits the byte stream on frame
//! delimiters, reverses the stuffing, and checks start byte + CRC before
//! handing frames up. Keeps good/bad counters for the run summary.

use crate::unit::cobs;
use crate::unit::crc::crc16_ccitt;
use crate::unit::frame::{FRAME_CRC_LEN, FRAME_HEADER_LEN, FRAME_PAYLOAD_MAX, FRAME_START};

/// One validated frame off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub kind: u8,
    pub seq: u8,
    pub payload: Vec<u8>,
}

/// Incremental deframer. Feed it raw wire bytes in any chunking.
#[derive(Debug, Default)]
pub struct WireMonitor {
    acc: Vec<u8>,
    pub frames_ok: u64,
    pub frames_bad: u64,
}

impl WireMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume wire bytes; returns every frame completed by this chunk.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<DecodedFrame> {
        let mut out = Vec::new();
        for &b in bytes {
            if b != 0 {
                self.acc.push(b);
                continue;
            }
            if self.acc.is_empty() {
                continue;
            }
            match Self::decode_one(&self.acc) {
                Some(f) => {
                    self.frames_ok += 1;
                    out.push(f);
                }
                None => self.frames_bad += 1,
            }
            self.acc.clear();
        }
        out
    }

    fn decode_one(body: &[u8]) -> Option<DecodedFrame> {
        let mut raw = [0u8; FRAME_HEADER_LEN + FRAME_PAYLOAD_MAX + FRAME_CRC_LEN];
        let n = cobs::decode(body, &mut raw)?;
        if n < FRAME_HEADER_LEN + FRAME_CRC_LEN || raw[0] != FRAME_START {
            return None;
        }

        let kind = raw[1];
        let seq = raw[2];
        let len = raw[3] as usize;
        if n != FRAME_HEADER_LEN + len + FRAME_CRC_LEN {
            return None;
        }

        let want = crc16_ccitt(&raw[1..4 + len]);
        let got = raw[4 + len] as u16 | (raw[4 + len + 1] as u16) << 8;
        if want != got {
            return None;
        }

        Some(DecodedFrame {
            kind,
            seq,
            payload: raw[4..4 + len].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::frame::PendingFrame;

    fn staged_bytes(kind: u8, seq: u8, payload: &[u8]) -> Vec<u8> {
        let mut f = PendingFrame::new();
        f.load(kind, seq, payload).unwrap();
        f.unsent().to_vec()
    }

    #[test]
    fn decodes_a_frame_split_across_feeds() {
        let bytes = staged_bytes(2, 5, &[0xDE, 0xAD]);
        let mut m = WireMonitor::new();

        let (a, b) = bytes.split_at(3);
        assert!(m.feed(a).is_empty());
        let frames = m.feed(b);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind, 2);
        assert_eq!(frames[0].seq, 5);
        assert_eq!(frames[0].payload, vec![0xDE, 0xAD]);
        assert_eq!(m.frames_ok, 1);
        assert_eq!(m.frames_bad, 0);
    }

    #[test]
    fn corrupt_body_counts_bad_and_resynchronizes() {
        let mut bytes = staged_bytes(3, 0, &[0x01]);
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        if bytes[mid] == 0 {
            bytes[mid] = 1;
        }

        let mut m = WireMonitor::new();
        m.feed(&bytes);
        assert_eq!(m.frames_bad, 1);

        // the next frame still decodes
        let frames = m.feed(&staged_bytes(3, 1, &[0x02]));
        assert_eq!(frames.len(), 1);
        assert_eq!(m.frames_ok, 1);
    }

    #[test]
    fn round_trips_a_zero_heavy_payload() {
        let payload = [0u8; 64];
        let frames = WireMonitor::new().feed(&staged_bytes(4, 9, &payload));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, payload.to_vec());
    }
}
