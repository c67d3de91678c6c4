//! Wire format of voice datagrams.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|X|  CC   |M|     PT      |       sequence number         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           timestamp                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                             SSRC                              |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     0xBEDE (if X)             |     extension length          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! | ciphertext ...  | auth tag (16 bytes) | nonce trailer (mode)  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Every function here is pure: headers and packets are built into fresh
//! buffers and decoding only borrows from the datagram.

pub mod clock;
mod error;

pub use self::clock::SequenceClock;
pub use self::error::{PacketError, PacketErrorType};

use crate::crypto::{AeadError, SealedPayload, TAG_LEN, VoiceGroupCrypto};

/// Size of the fixed RTP header.
pub const HEADER_LEN: usize = 12;

/// Size of the header when the extension flag is set.
pub const EXTENDED_HEADER_LEN: usize = 16;

/// Anything shorter cannot hold a header plus a single payload byte.
pub const MIN_PACKET_LEN: usize = 13;

/// Version 2, no padding, no extension, no CSRCs.
pub const VERSION_FLAGS: u8 = 0x80;

/// Dynamic payload type used for Opus.
pub const PAYLOAD_TYPE: u8 = 0x78;

/// Marker of a one-byte header extension block.
pub const EXTENSION_MARKER: [u8; 2] = [0xBE, 0xDE];

/// Ciphertext size of the empty keepalive packets voice servers send.
pub const KEEPALIVE_CIPHERTEXT_LEN: usize = 20;

const EXTENSION_FLAG: u8 = 0x10;

// RTCP packet types 200..=204 land here once the marker bit is masked off.
const RTCP_PAYLOAD_TYPES: std::ops::RangeInclusive<u8> = 72..=76;

/// Fixed fields of a received header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    /// Either [`HEADER_LEN`] or [`EXTENDED_HEADER_LEN`].
    pub header_len: usize,
}

/// Encrypted sections of a datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPayload<'a> {
    pub ciphertext: &'a [u8],
    pub tag: &'a [u8],
    pub nonce_material: &'a [u8],
}

/// A decrypted voice packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    /// Opus frame with any header extension removed.
    pub payload: Vec<u8>,
}

#[must_use]
pub fn encode_header(sequence: u16, timestamp: u32, ssrc: u32) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[0] = VERSION_FLAGS;
    header[1] = PAYLOAD_TYPE;
    header[2..4].copy_from_slice(&sequence.to_be_bytes());
    header[4..8].copy_from_slice(&timestamp.to_be_bytes());
    header[8..12].copy_from_slice(&ssrc.to_be_bytes());
    header
}

pub fn decode_header(datagram: &[u8]) -> Result<RtpHeader, PacketError> {
    let Some(&flags) = datagram.first() else {
        return Err(PacketError::malformed(0));
    };

    let header_len = if flags & EXTENSION_FLAG == 0 {
        HEADER_LEN
    } else {
        EXTENDED_HEADER_LEN
    };

    if datagram.len() < header_len {
        return Err(PacketError::malformed(datagram.len()));
    }

    Ok(RtpHeader {
        sequence: u16::from_be_bytes([datagram[2], datagram[3]]),
        timestamp: u32::from_be_bytes([datagram[4], datagram[5], datagram[6], datagram[7]]),
        ssrc: u32::from_be_bytes([datagram[8], datagram[9], datagram[10], datagram[11]]),
        header_len,
    })
}

pub fn split_payload(
    datagram: &[u8],
    header_len: usize,
    trailer_len: usize,
) -> Result<SplitPayload<'_>, PacketError> {
    let malformed = || PacketError::malformed(datagram.len());

    let sealed = datagram.get(header_len..).ok_or_else(malformed)?;
    let tag_end = sealed.len().checked_sub(trailer_len).ok_or_else(malformed)?;
    let ciphertext_end = tag_end.checked_sub(TAG_LEN).ok_or_else(malformed)?;

    Ok(SplitPayload {
        ciphertext: &sealed[..ciphertext_end],
        tag: &sealed[ciphertext_end..tag_end],
        nonce_material: &sealed[tag_end..],
    })
}

/// Drops a leading `0xBEDE` extension block of `4 * words` bytes.
pub fn strip_extension(plaintext: &[u8]) -> Result<&[u8], PacketError> {
    let [0xBE, 0xDE, high, low, ..] = *plaintext else {
        return Ok(plaintext);
    };

    skip_extension_body(plaintext, u16::from_be_bytes([high, low]))
}

/// Drops the `4 * words` bytes of extension elements at the start of the
/// plaintext.
fn skip_extension_body(plaintext: &[u8], words: u16) -> Result<&[u8], PacketError> {
    plaintext
        .get(usize::from(words) * 4..)
        .ok_or(PacketError {
            kind: PacketErrorType::Extension { words },
            source: None,
        })
}

/// Concatenates a header and a sealed payload into a datagram.
#[must_use]
pub fn encode_packet(header: &[u8], sealed: &SealedPayload) -> Vec<u8> {
    let mut packet = Vec::with_capacity(header.len() + sealed.body.len() + sealed.trailer.len());
    packet.extend_from_slice(header);
    packet.extend_from_slice(&sealed.body);
    packet.extend_from_slice(&sealed.trailer);
    packet
}

/// Parses, decrypts and unwraps a received voice datagram.
pub fn decode_packet(datagram: &[u8], crypto: &VoiceGroupCrypto) -> Result<RtpPacket, PacketError> {
    if datagram.len() < MIN_PACKET_LEN {
        return Err(PacketError::malformed(datagram.len()));
    }

    if RTCP_PAYLOAD_TYPES.contains(&(datagram[1] & 0x7F)) {
        return Err(PacketError {
            kind: PacketErrorType::Rtcp,
            source: None,
        });
    }

    let header = decode_header(datagram)?;
    let split = split_payload(datagram, header.header_len, crypto.mode().trailer_len())?;

    let plaintext = crypto
        .decrypt(
            split.ciphertext,
            split.tag,
            &datagram[..header.header_len],
            split.nonce_material,
        )
        .map_err(|source| decrypt_error(split.ciphertext.len(), source))?;

    // With the extension flag set, the marker and length word travel in
    // the authenticated header and only the elements are encrypted.
    let payload = if header.header_len == EXTENDED_HEADER_LEN {
        let words = u16::from_be_bytes([datagram[14], datagram[15]]);
        skip_extension_body(&plaintext, words)?
    } else {
        strip_extension(&plaintext)?
    };
    let payload = payload.to_vec();
    Ok(RtpPacket {
        sequence: header.sequence,
        timestamp: header.timestamp,
        ssrc: header.ssrc,
        payload,
    })
}

fn decrypt_error(ciphertext_len: usize, source: AeadError) -> PacketError {
    let kind = if ciphertext_len == KEEPALIVE_CIPHERTEXT_LEN {
        PacketErrorType::Keepalive
    } else {
        PacketErrorType::Decrypt { ciphertext_len }
    };

    PacketError {
        kind,
        source: Some(Box::new(source)),
    }
}
