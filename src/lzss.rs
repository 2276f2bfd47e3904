//! Ring-buffer LZSS used by the per-stage `.lz` files.
//!
//! Header (8 bytes, little endian):
//!   Source size (4 bytes), including the header
//!   Destination size (4 bytes)
//! Data:
//!   Flags (1 byte), consumed from the LSB.
//!     If flag is 1: copy one literal byte.
//!     If flag is 0: back-reference (2 bytes):
//!       offset = b0 | (b1 & 0xF0) << 4
//!       length = (b1 & 0x0F) + 2
//!       Copy length + 1 bytes out of the ring buffer, starting at offset.

use crate::stream::read_u32_le;
use crate::ExtractError;

pub const HEADER_SIZE: usize = 8;
pub const RING_SIZE: usize = 4096;
pub const RING_START: usize = 4078;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LzssHeader {
    pub source_size: u32,
    pub destination_size: u32,
}

pub fn parse_header(buffer: &[u8]) -> Result<LzssHeader, ExtractError> {
    let source_size = read_u32_le(buffer, 0)?;
    let destination_size = read_u32_le(buffer, 4)?;

    if source_size as usize <= HEADER_SIZE || destination_size == 0 {
        return Err(ExtractError::MalformedCompressedBlob { source_size, destination_size });
    }

    Ok(LzssHeader { source_size, destination_size })
}

/// Empty if the header is short or inconsistent.
/// A truncated stream leaves the tail of the output zeroed.
pub fn decompress(buffer: &[u8]) -> Vec<u8> {
    let header = match parse_header(buffer) {
        Ok(h) => h,
        Err(e) => {
            log::debug!("lzss: {}", e);
            return Vec::new();
        }
    };

    let src_end = (header.source_size as usize).min(buffer.len());
    let src = &buffer[HEADER_SIZE..src_end];
    let mut dst = vec![0u8; header.destination_size as usize];

    let mut ring = [0u8; RING_SIZE];
    let mut ring_pos = RING_START;
    let mut src_pos = 0;
    let mut dst_pos = 0;
    let mut flags = 0u32;

    'decode: loop {
        flags >>= 1;
        if flags & 0x100 == 0 {
            let Some(&b) = src.get(src_pos) else { break };
            flags = b as u32 | 0xFF00;
            src_pos += 1;
        }

        if flags & 1 != 0 {
            let Some(&byte) = src.get(src_pos) else { break };
            src_pos += 1;
            if dst_pos >= dst.len() { break }

            dst[dst_pos] = byte;
            ring[ring_pos] = byte;
            ring_pos = (ring_pos + 1) % RING_SIZE;
            dst_pos += 1;
        } else {
            if src_pos + 1 >= src.len() { break }
            let lo = src[src_pos] as usize;
            let hi = src[src_pos + 1] as usize;
            src_pos += 2;

            let offset = lo | (hi & 0xF0) << 4;
            let length = (hi & 0x0F) + 2;

            for i in 0..length + 1 {
                if dst_pos >= dst.len() { break 'decode }

                let byte = ring[(offset + i) % RING_SIZE];
                dst[dst_pos] = byte;
                ring[ring_pos] = byte;
                ring_pos = (ring_pos + 1) % RING_SIZE;
                dst_pos += 1;
            }
        }
    }

    if dst_pos < dst.len() {
        log::debug!("lzss: stream ended after {} of {} bytes", dst_pos, dst.len());
    }

    dst
}
