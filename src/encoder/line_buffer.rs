use std::io::{self, Write};

/// Default maximum line length of encoded body content, excluding the CRLF
pub const MAX_LINE_LEN: usize = 76;
/// Maximum line length used while an encoded-word wrapper is open
pub const ENCODED_WORD_LINE_LEN: usize = 70;

const ENCODED_WORD_SUFFIX: &[u8] = b"?=";

/// Encoded-word scheme, see [RFC 2047](https://tools.ietf.org/html/rfc2047#section-4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordScheme {
    /// `B` encoding, base64
    Base64,
    /// `Q` encoding, quoted-printable variant
    Q,
}

impl WordScheme {
    fn letter(self) -> char {
        match self {
            WordScheme::Base64 => 'B',
            WordScheme::Q => 'Q',
        }
    }
}

/// Growable output buffer keeping track of the current line length
///
/// Encoders append to it and ask it for folding decisions. When an
/// encoded-word wrapper is open, folding closes the current word and
/// opens a new one on the continuation line, so every physical line stays
/// a valid `=?charset?X?...?=` sequence.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    bytes: Vec<u8>,
    line_len: usize,
    /// Line length right after the last fold, nothing is gained by folding below it
    indent: usize,
    max_line_len: usize,
    word_prefix: Option<String>,
    /// Line length to restore once the encoded word is closed
    outer_max_line_len: usize,
}

impl LineBuffer {
    /// Creates a buffer folding at [`MAX_LINE_LEN`]
    pub fn new() -> Self {
        Self::with_max_line_len(MAX_LINE_LEN)
    }

    /// Creates a buffer folding at `max_line_len` columns
    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self {
            bytes: Vec::new(),
            line_len: 0,
            indent: 0,
            max_line_len,
            word_prefix: None,
            outer_max_line_len: max_line_len,
        }
    }

    /// Creates a buffer that never folds
    pub fn unfolded() -> Self {
        Self::with_max_line_len(usize::MAX)
    }

    /// Starts the buffer on a column other than zero, used for header values
    /// written after `Name: `
    pub fn starting_at(mut self, column: usize) -> Self {
        self.line_len = column;
        self.indent = column;
        self
    }

    pub fn max_line_len(&self) -> usize {
        self.max_line_len
    }

    /// Length of the line currently being written
    pub fn line_len(&self) -> usize {
        self.line_len
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether an encoded-word wrapper is currently open
    pub fn in_encoded_word(&self) -> bool {
        self.word_prefix.is_some()
    }

    /// Columns still available on the current line, once the wrapper suffix is accounted for
    pub fn remaining(&self) -> usize {
        self.max_line_len
            .saturating_sub(self.line_len)
            .saturating_sub(self.suffix_len())
    }

    fn suffix_len(&self) -> usize {
        if self.word_prefix.is_some() {
            ENCODED_WORD_SUFFIX.len()
        } else {
            0
        }
    }

    /// Whether `n` more bytes would overflow the line and folding would help
    pub fn needs_fold(&self, n: usize) -> bool {
        self.line_len > self.indent && n > self.remaining()
    }

    /// Appends raw bytes, tracking line breaks
    pub fn append(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
        match bytes.iter().rposition(|&b| b == b'\n') {
            Some(pos) => {
                self.line_len = bytes.len() - pos - 1;
                self.indent = 0;
            }
            None => self.line_len += bytes.len(),
        }
    }

    pub fn append_byte(&mut self, byte: u8) {
        self.append(&[byte]);
    }

    pub fn append_crlf(&mut self) {
        self.append(b"\r\n");
    }

    /// Breaks the current line
    ///
    /// Inside an encoded word this writes `?=`, CRLF, a single space and the
    /// word prefix again, otherwise a bare CRLF.
    pub fn fold(&mut self) {
        match &self.word_prefix {
            Some(prefix) => {
                self.bytes.extend_from_slice(ENCODED_WORD_SUFFIX);
                self.bytes.extend_from_slice(b"\r\n ");
                self.bytes.extend_from_slice(prefix.as_bytes());
                self.line_len = 1 + prefix.len();
            }
            None => {
                self.bytes.extend_from_slice(b"\r\n");
                self.line_len = 0;
            }
        }
        self.indent = self.line_len;
    }

    /// Opens an encoded word, writing its `=?charset?X?` prefix
    pub fn begin_encoded_word(&mut self, charset: &str, scheme: WordScheme) {
        let prefix = format!("=?{}?{}?", charset, scheme.letter());
        self.append(prefix.as_bytes());
        self.indent = self.line_len;
        self.outer_max_line_len = self.max_line_len;
        self.max_line_len = self.max_line_len.min(ENCODED_WORD_LINE_LEN);
        self.word_prefix = Some(prefix);
    }

    /// Closes the encoded word opened by [`LineBuffer::begin_encoded_word`]
    pub fn end_encoded_word(&mut self) {
        if self.word_prefix.take().is_some() {
            self.append(ENCODED_WORD_SUFFIX);
            self.max_line_len = self.outer_max_line_len;
        }
    }

    /// Takes the accumulated bytes, keeping the line state
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    /// Writes the accumulated bytes out, keeping the line state
    pub fn flush_to<W: Write + ?Sized>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.bytes)?;
        self.bytes.clear();
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}
