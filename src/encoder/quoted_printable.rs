use super::{DecodeError, LineBuffer, TransferEncoder};

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Streaming quoted-printable codec
///
/// Body mode keeps CRLF line breaks and soft-breaks long lines with a
/// trailing `=`. Encoded-word mode implements the `Q` variant of
/// [RFC 2047](https://tools.ietf.org/html/rfc2047#section-4.2), where a
/// space is written as `_` and folding goes through the wrapper of the
/// [`LineBuffer`].
#[derive(Debug, Clone, Default)]
pub struct QuotedPrintableCodec {
    escape_line_breaks: bool,
    encoded_word: bool,
    pending_cr: bool,
    pending_space: Option<u8>,
    state: DecodeState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum DecodeState {
    #[default]
    Normal,
    Equals,
    Hex(u8),
    EqualsCr,
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

impl QuotedPrintableCodec {
    /// Body content codec
    pub fn new() -> Self {
        Self::default()
    }

    /// `Q` codec for encoded words
    pub fn encoded_word() -> Self {
        Self {
            escape_line_breaks: true,
            encoded_word: true,
            ..Self::default()
        }
    }

    /// Encode CR and LF as `=0D` and `=0A` instead of keeping them as line breaks
    pub fn escape_line_breaks(mut self, escape: bool) -> Self {
        self.escape_line_breaks = escape;
        self
    }

    fn needs_escape(&self, byte: u8) -> bool {
        match byte {
            b'=' => true,
            b'\t' => self.encoded_word,
            b'?' | b'_' => self.encoded_word,
            0..=0x1F | 0x7F..=0xFF => true,
            _ => false,
        }
    }

    fn emit(&self, out: &mut LineBuffer, token: &[u8]) {
        if self.encoded_word {
            if out.needs_fold(token.len()) {
                out.fold();
            }
        } else if out.needs_fold(token.len() + 1) {
            // Soft line break, the `=` counts against the line length
            out.append(b"=\r\n");
        }
        out.append(token);
    }

    fn emit_escaped(&self, out: &mut LineBuffer, byte: u8) {
        self.emit(
            out,
            &[b'=', HEX[usize::from(byte >> 4)], HEX[usize::from(byte & 0x0F)]],
        );
    }

    fn emit_byte(&self, out: &mut LineBuffer, byte: u8) {
        if self.encoded_word && byte == b' ' {
            self.emit(out, b"_");
        } else if self.needs_escape(byte) {
            self.emit_escaped(out, byte);
        } else {
            self.emit(out, &[byte]);
        }
    }

    /// Whitespace followed by something visible can stay literal
    fn flush_space(&mut self, out: &mut LineBuffer) {
        if let Some(space) = self.pending_space.take() {
            self.emit(out, &[space]);
        }
    }

    /// Whitespace at the end of a line would get lost in transit
    fn flush_trailing_space(&mut self, out: &mut LineBuffer) {
        if let Some(space) = self.pending_space.take() {
            self.emit_escaped(out, space);
        }
    }
}

impl TransferEncoder for QuotedPrintableCodec {
    fn encode(&mut self, input: &[u8], out: &mut LineBuffer) -> usize {
        let start = out.len();
        let keep_breaks = !self.escape_line_breaks && !self.encoded_word;

        for &byte in input {
            if self.pending_cr {
                self.pending_cr = false;
                if byte == b'\n' {
                    self.flush_trailing_space(out);
                    out.append_crlf();
                    continue;
                }
                self.flush_space(out);
                self.emit_escaped(out, b'\r');
            }

            match byte {
                b'\r' if keep_breaks => self.pending_cr = true,
                b' ' | b'\t' if !self.encoded_word => {
                    self.flush_space(out);
                    self.pending_space = Some(byte);
                }
                _ => {
                    self.flush_space(out);
                    self.emit_byte(out, byte);
                }
            }
        }

        out.len() - start
    }

    fn finish(&mut self, out: &mut LineBuffer) -> usize {
        let start = out.len();
        if self.pending_cr {
            self.pending_cr = false;
            self.flush_space(out);
            self.emit_escaped(out, b'\r');
        }
        self.flush_trailing_space(out);
        out.len() - start
    }

    fn decode(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        let mut written = 0;
        for i in 0..buf.len() {
            let byte = buf[i];
            let output = match self.state {
                DecodeState::Normal => match byte {
                    b'=' => {
                        self.state = DecodeState::Equals;
                        None
                    }
                    b'_' if self.encoded_word => Some(b' '),
                    _ => Some(byte),
                },
                DecodeState::Equals => match byte {
                    b'\r' => {
                        self.state = DecodeState::EqualsCr;
                        None
                    }
                    b'\n' => {
                        self.state = DecodeState::Normal;
                        None
                    }
                    _ => {
                        let high = hex_value(byte).ok_or(DecodeError::InvalidEscape(byte))?;
                        self.state = DecodeState::Hex(high);
                        None
                    }
                },
                DecodeState::Hex(high) => {
                    let low = hex_value(byte).ok_or(DecodeError::InvalidEscape(byte))?;
                    self.state = DecodeState::Normal;
                    Some((high << 4) | low)
                }
                DecodeState::EqualsCr => {
                    if byte != b'\n' {
                        return Err(DecodeError::InvalidEscape(byte));
                    }
                    self.state = DecodeState::Normal;
                    None
                }
            };
            if let Some(output) = output {
                buf[written] = output;
                written += 1;
            }
        }
        Ok(written)
    }

    fn finish_decoding(&mut self) -> Result<(), DecodeError> {
        let state = std::mem::take(&mut self.state);
        if state == DecodeState::Normal {
            Ok(())
        } else {
            Err(DecodeError::Truncated)
        }
    }
}
