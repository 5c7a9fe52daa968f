use super::{DecodeError, LineBuffer, TransferEncoder};

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const INVALID: u8 = 0xFF;
const SKIP: u8 = 0xFE;
const PAD: u8 = 0xFD;

static DECODE_TABLE: [u8; 256] = decode_table();

const fn decode_table() -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    // Folding artifacts
    table[b'\r' as usize] = SKIP;
    table[b'\n' as usize] = SKIP;
    table[b' ' as usize] = SKIP;
    table[b'\t' as usize] = SKIP;
    table[b'=' as usize] = PAD;
    table
}

/// Streaming base64 codec, standard alphabet with `=` padding
///
/// Encoding defers an incomplete 3-byte group until the next call, so
/// padding only ever appears after [`TransferEncoder::finish`].
#[derive(Debug, Clone, Default)]
pub struct Base64Codec {
    pending: [u8; 2],
    pending_len: usize,
    acc: u32,
    bits: u32,
}

impl Base64Codec {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(out: &mut LineBuffer, quad: &[u8; 4]) {
        if out.needs_fold(quad.len()) {
            out.fold();
        }
        out.append(quad);
    }

    fn encode_group(group: [u8; 3]) -> [u8; 4] {
        let n = (u32::from(group[0]) << 16) | (u32::from(group[1]) << 8) | u32::from(group[2]);
        [
            ALPHABET[(n >> 18) as usize & 0x3F],
            ALPHABET[(n >> 12) as usize & 0x3F],
            ALPHABET[(n >> 6) as usize & 0x3F],
            ALPHABET[n as usize & 0x3F],
        ]
    }
}

impl TransferEncoder for Base64Codec {
    fn encode(&mut self, mut input: &[u8], out: &mut LineBuffer) -> usize {
        let start = out.len();

        if self.pending_len > 0 {
            let missing = 3 - self.pending_len;
            if input.len() < missing {
                self.pending[self.pending_len..self.pending_len + input.len()]
                    .copy_from_slice(input);
                self.pending_len += input.len();
                return 0;
            }
            let mut group = [0; 3];
            group[..self.pending_len].copy_from_slice(&self.pending[..self.pending_len]);
            group[self.pending_len..].copy_from_slice(&input[..missing]);
            Self::emit(out, &Self::encode_group(group));
            input = &input[missing..];
            self.pending_len = 0;
        }

        let mut chunks = input.chunks_exact(3);
        for chunk in &mut chunks {
            Self::emit(out, &Self::encode_group([chunk[0], chunk[1], chunk[2]]));
        }
        let rest = chunks.remainder();
        self.pending[..rest.len()].copy_from_slice(rest);
        self.pending_len = rest.len();

        out.len() - start
    }

    fn finish(&mut self, out: &mut LineBuffer) -> usize {
        let quad = match self.pending_len {
            1 => {
                let mut quad = Self::encode_group([self.pending[0], 0, 0]);
                quad[2] = b'=';
                quad[3] = b'=';
                quad
            }
            2 => {
                let mut quad = Self::encode_group([self.pending[0], self.pending[1], 0]);
                quad[3] = b'=';
                quad
            }
            _ => return 0,
        };
        self.pending_len = 0;
        Self::emit(out, &quad);
        quad.len()
    }

    fn decode(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        let mut written = 0;
        for i in 0..buf.len() {
            let byte = buf[i];
            match DECODE_TABLE[byte as usize] {
                INVALID => return Err(DecodeError::InvalidByte(byte)),
                SKIP => {}
                PAD => {
                    self.acc = 0;
                    self.bits = 0;
                }
                sextet => {
                    self.acc = (self.acc << 6) | u32::from(sextet);
                    self.bits += 6;
                    if self.bits >= 8 {
                        self.bits -= 8;
                        buf[written] = (self.acc >> self.bits) as u8;
                        written += 1;
                        self.acc &= (1 << self.bits) - 1;
                    }
                }
            }
        }
        Ok(written)
    }

    fn finish_decoding(&mut self) -> Result<(), DecodeError> {
        let bits = self.bits;
        self.acc = 0;
        self.bits = 0;
        // A single sextet can't carry a whole byte
        if bits == 6 {
            Err(DecodeError::Truncated)
        } else {
            Ok(())
        }
    }
}
