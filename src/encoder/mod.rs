//! Streaming content transfer encodings
//!
//! Every codec keeps the state needed to resume at an arbitrary chunk
//! boundary, so content can be pushed through in pieces of any size and
//! still produce the same bytes as a single call. Encoded output goes into
//! a [`LineBuffer`], which takes care of line folding.
//!
//! ```rust
//! use relaymail::encoder::{Base64Codec, LineBuffer, TransferEncoder};
//!
//! let mut codec = Base64Codec::new();
//! let mut out = LineBuffer::new();
//! codec.encode(b"M", &mut out);
//! codec.encode(b"a", &mut out);
//! codec.finish(&mut out);
//! assert_eq!(out.as_bytes(), b"TWE=");
//! ```

use std::{error::Error as StdError, fmt};

pub use self::{
    base64::Base64Codec,
    eight_bit::EightBitCodec,
    line_buffer::{LineBuffer, WordScheme, ENCODED_WORD_LINE_LEN, MAX_LINE_LEN},
    quoted_printable::QuotedPrintableCodec,
};

mod base64;
mod eight_bit;
mod line_buffer;
mod quoted_printable;

/// A stateful content transfer encoding
///
/// A value holds the state of one stream and must not be shared between streams.
pub trait TransferEncoder {
    /// Encodes all of `input` into `out`, returning the number of bytes written
    ///
    /// Incomplete groups may be held back until the next call or [`TransferEncoder::finish`].
    fn encode(&mut self, input: &[u8], out: &mut LineBuffer) -> usize;

    /// Writes out whatever the encoder held back, ending the stream
    fn finish(&mut self, out: &mut LineBuffer) -> usize;

    /// Decodes `buf` in place
    ///
    /// The decoded bytes are written to the front of `buf` and their count is
    /// returned. Partial escapes or groups are kept for the next call.
    fn decode(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError>;

    /// Checks that the decoded stream did not end in the middle of a group or escape
    fn finish_decoding(&mut self) -> Result<(), DecodeError>;
}

/// Runtime selected codec
#[derive(Debug, Clone)]
pub enum Codec {
    Base64(Base64Codec),
    QuotedPrintable(QuotedPrintableCodec),
    EightBit(EightBitCodec),
}

impl TransferEncoder for Codec {
    fn encode(&mut self, input: &[u8], out: &mut LineBuffer) -> usize {
        match self {
            Codec::Base64(codec) => codec.encode(input, out),
            Codec::QuotedPrintable(codec) => codec.encode(input, out),
            Codec::EightBit(codec) => codec.encode(input, out),
        }
    }

    fn finish(&mut self, out: &mut LineBuffer) -> usize {
        match self {
            Codec::Base64(codec) => codec.finish(out),
            Codec::QuotedPrintable(codec) => codec.finish(out),
            Codec::EightBit(codec) => codec.finish(out),
        }
    }

    fn decode(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        match self {
            Codec::Base64(codec) => codec.decode(buf),
            Codec::QuotedPrintable(codec) => codec.decode(buf),
            Codec::EightBit(codec) => codec.decode(buf),
        }
    }

    fn finish_decoding(&mut self) -> Result<(), DecodeError> {
        match self {
            Codec::Base64(codec) => codec.finish_decoding(),
            Codec::QuotedPrintable(codec) => codec.finish_decoding(),
            Codec::EightBit(codec) => codec.finish_decoding(),
        }
    }
}

impl Codec {
    /// Line buffer matching the codec: pass-through content is never folded
    pub fn line_buffer(&self) -> LineBuffer {
        match self {
            Codec::EightBit(_) => LineBuffer::unfolded(),
            _ => LineBuffer::new(),
        }
    }
}

/// Encodes a whole buffer in one go
pub fn encode_all<E: TransferEncoder + ?Sized>(codec: &mut E, input: &[u8], out: &mut LineBuffer) -> usize {
    codec.encode(input, out) + codec.finish(out)
}

/// Decodes a whole buffer in one go
pub fn decode_all<E: TransferEncoder + ?Sized>(codec: &mut E, input: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut buf = input.to_vec();
    let len = codec.decode(&mut buf)?;
    codec.finish_decoding()?;
    buf.truncate(len);
    Ok(buf)
}

/// Malformed encoded content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// A byte outside of the encoding alphabet
    InvalidByte(u8),
    /// A `=` not followed by two hex digits or a line break
    InvalidEscape(u8),
    /// The content ended in the middle of a group or escape
    Truncated,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidByte(byte) => write!(f, "invalid byte 0x{byte:02X} in encoded content"),
            DecodeError::InvalidEscape(byte) => write!(f, "invalid escape sequence at byte 0x{byte:02X}"),
            DecodeError::Truncated => f.write_str("encoded content ended unexpectedly"),
        }
    }
}

impl StdError for DecodeError {}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn xorshift_bytes(len: usize, mut seed: u32) -> Vec<u8> {
        (0..len)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                seed as u8
            })
            .collect()
    }

    fn round_trip(make: fn() -> Codec, input: &[u8], encode_chunk: usize, decode_chunk: usize) {
        let mut encoder = make();
        let mut out = encoder.line_buffer();
        for chunk in input.chunks(encode_chunk) {
            encoder.encode(chunk, &mut out);
        }
        encoder.finish(&mut out);
        let encoded = out.into_bytes();

        for line in encoded.split(|&b| b == b'\n') {
            assert!(line.len() <= MAX_LINE_LEN + 1, "line of {} bytes", line.len());
        }

        let mut decoder = make();
        let mut decoded = Vec::new();
        for chunk in encoded.chunks(decode_chunk) {
            let mut buf = chunk.to_vec();
            let n = decoder.decode(&mut buf).unwrap();
            decoded.extend_from_slice(&buf[..n]);
        }
        decoder.finish_decoding().unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn round_trip_regardless_of_chunking() {
        let makers: [fn() -> Codec; 2] = [
            || Codec::Base64(Base64Codec::new()),
            || Codec::QuotedPrintable(QuotedPrintableCodec::new()),
        ];
        let mut inputs = vec![
            Vec::new(),
            b"Man".to_vec(),
            b"trailing space \r\nand tab\t\r\n".to_vec(),
            b"lone\rcr and lone\nlf\r".to_vec(),
            "naïve café, ünïcödé".repeat(20).into_bytes(),
        ];
        inputs.push(xorshift_bytes(2048, 0x9E37_79B9));
        inputs.push(xorshift_bytes(333, 7));

        for make in makers {
            for input in &inputs {
                for (enc, dec) in [(1, 1), (2, 3), (3, 7), (64, 5), (4096, 4096)] {
                    round_trip(make, input, enc, dec);
                }
            }
        }
    }

    #[test]
    fn dot_stuffing_round_trip() {
        let input = b".one\r\n..two\r\nthree.\r\n.".to_vec();
        for chunk in [1, 2, 5] {
            round_trip(|| Codec::EightBit(EightBitCodec::dot_stuffing()), &input, chunk, chunk);
        }
    }

    #[test]
    fn one_shot_helpers() {
        let mut out = LineBuffer::new();
        assert_eq!(encode_all(&mut Base64Codec::new(), b"Ma", &mut out), 4);
        assert_eq!(out.as_bytes(), b"TWE=");
        assert_eq!(decode_all(&mut Base64Codec::new(), b"TWFu").unwrap(), b"Man");
    }
}
