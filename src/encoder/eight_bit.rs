use super::{DecodeError, LineBuffer, TransferEncoder};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum LineState {
    /// Column 0, the start of the stream counts as one
    #[default]
    LineStart,
    Middle,
    SawCr,
}

impl LineState {
    fn next(self, byte: u8) -> Self {
        match (self, byte) {
            (_, b'\r') => LineState::SawCr,
            (LineState::SawCr, b'\n') => LineState::LineStart,
            _ => LineState::Middle,
        }
    }
}

/// Pass-through codec for 7bit, 8bit and binary content
///
/// With dot-stuffing enabled, every line starting with `.` gets a second
/// one, as required for the SMTP `DATA` phase
/// ([RFC 5321 section 4.5.2](https://tools.ietf.org/html/rfc5321#section-4.5.2)).
#[derive(Debug, Clone, Default)]
pub struct EightBitCodec {
    dot_stuffing: bool,
    state: LineState,
}

impl EightBitCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec doubling leading dots
    pub fn dot_stuffing() -> Self {
        Self {
            dot_stuffing: true,
            state: LineState::LineStart,
        }
    }

    /// Whether the last byte seen ended a line
    pub fn at_line_start(&self) -> bool {
        self.state == LineState::LineStart
    }
}

impl TransferEncoder for EightBitCodec {
    fn encode(&mut self, input: &[u8], out: &mut LineBuffer) -> usize {
        let start = out.len();
        let mut from = 0;
        for (i, &byte) in input.iter().enumerate() {
            if self.dot_stuffing && byte == b'.' && self.state == LineState::LineStart {
                out.append(&input[from..i]);
                out.append_byte(b'.');
                from = i;
            }
            self.state = self.state.next(byte);
        }
        out.append(&input[from..]);
        out.len() - start
    }

    fn finish(&mut self, _out: &mut LineBuffer) -> usize {
        0
    }

    fn decode(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        if !self.dot_stuffing {
            return Ok(buf.len());
        }
        let mut written = 0;
        for i in 0..buf.len() {
            let byte = buf[i];
            if byte == b'.' && self.state == LineState::LineStart {
                self.state = LineState::Middle;
                continue;
            }
            self.state = self.state.next(byte);
            buf[written] = byte;
            written += 1;
        }
        Ok(written)
    }

    fn finish_decoding(&mut self) -> Result<(), DecodeError> {
        self.state = LineState::LineStart;
        Ok(())
    }
}
