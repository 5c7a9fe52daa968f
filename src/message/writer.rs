use std::io::{self, Write};

use crate::{
    encoder::{LineBuffer, TransferEncoder, WordScheme},
    message::{
        header::{EntityHeaders, Headers},
        Body, Message, MessageBody, MultiPart, Part, SinglePart,
    },
};

/// Bytes of content pushed through a codec at once
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Serializes messages and MIME entity trees
///
/// Headers are folded and encoded, bodies are encoded on the fly with the
/// codec their `Content-Transfer-Encoding` names, so the full encoded
/// message never needs to be held in memory.
///
/// ```
/// use relaymail::message::{MimeWriter, SinglePart};
///
/// # fn main() -> std::io::Result<()> {
/// let part = SinglePart::plain("Hello!");
/// let mut out = Vec::new();
/// MimeWriter::new(&mut out).write_single(&part)?;
/// assert!(out.ends_with(b"\r\n\r\nHello!"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MimeWriter<W> {
    inner: W,
    scheme: WordScheme,
}

impl<W: Write> MimeWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            scheme: WordScheme::Base64,
        }
    }

    /// Encoded word flavor used for non-ASCII header text
    pub fn word_scheme(mut self, scheme: WordScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Writes a complete message: its headers, then its body
    pub fn write_message(&mut self, message: &Message) -> io::Result<()> {
        self.write_headers(message.headers())?;
        match message.body() {
            MessageBody::Mime(part) => self.write_part(part),
            MessageBody::Raw(body) => {
                self.inner.write_all(b"\r\n")?;
                self.write_body(body)
            }
        }
    }

    pub fn write_part(&mut self, part: &Part) -> io::Result<()> {
        match part {
            Part::Single(part) => self.write_single(part),
            Part::Multi(part) => self.write_multi(part),
        }
    }

    /// Headers, blank line, encoded content
    pub fn write_single(&mut self, part: &SinglePart) -> io::Result<()> {
        self.write_entity_headers(part.entity_headers())?;
        self.inner.write_all(b"\r\n")?;
        self.write_body(part.body())
    }

    /// Headers, blank line, then the children between boundary lines
    ///
    /// Without children the delimiter and close delimiter are still written.
    pub fn write_multi(&mut self, part: &MultiPart) -> io::Result<()> {
        self.write_entity_headers(part.entity_headers())?;
        self.inner.write_all(b"\r\n")?;

        let boundary = part.boundary().as_bytes();
        self.write_delimiter(b"", boundary, b"\r\n")?;
        for (i, child) in part.parts().iter().enumerate() {
            if i > 0 {
                self.write_delimiter(b"\r\n", boundary, b"\r\n")?;
            }
            self.write_part(child)?;
        }
        self.write_delimiter(b"\r\n", boundary, b"--\r\n")
    }

    fn write_delimiter(&mut self, before: &[u8], boundary: &[u8], after: &[u8]) -> io::Result<()> {
        self.inner.write_all(before)?;
        self.inner.write_all(b"--")?;
        self.inner.write_all(boundary)?;
        self.inner.write_all(after)
    }

    fn write_entity_headers(&mut self, headers: &EntityHeaders) -> io::Result<()> {
        self.write_headers(&headers.materialized())
    }

    fn write_headers(&mut self, headers: &Headers) -> io::Result<()> {
        let mut buf = LineBuffer::new();
        headers.write_to(&mut buf, self.scheme);
        buf.flush_to(&mut self.inner)
    }

    fn write_body(&mut self, body: &Body) -> io::Result<()> {
        let mut codec = body.encoding().codec();
        let mut buf = codec.line_buffer();
        for chunk in body.as_bytes().chunks(CHUNK_SIZE) {
            codec.encode(chunk, &mut buf);
            buf.flush_to(&mut self.inner)?;
        }
        codec.finish(&mut buf);
        buf.flush_to(&mut self.inner)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::message::header::{ContentTransferEncoding, ContentType, Subject};

    /// Fails once `limit` bytes were written
    struct Limited {
        written: usize,
        limit: usize,
    }

    impl Write for Limited {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.written + buf.len() > self.limit {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "full"));
            }
            self.written += buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn large_body_is_chunked_and_folded() {
        let content: Vec<u8> = (0..CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        let part = SinglePart::builder()
            .header(ContentType::parse("application/octet-stream").unwrap())
            .body(content.clone());

        let mut out = Vec::new();
        MimeWriter::new(&mut out).write_single(&part).unwrap();
        let text = String::from_utf8(out).unwrap();
        let (_, encoded) = text.split_once("\r\n\r\n").unwrap();

        assert!(encoded.split("\r\n").all(|line| line.len() <= 76));
        let joined: String = encoded.split("\r\n").collect();
        use base64::Engine;
        assert_eq!(
            base64::engine::general_purpose::STANDARD.decode(joined).unwrap(),
            content
        );
    }

    #[test]
    fn q_encoded_headers() {
        let part = SinglePart::builder()
            .header(Subject::from(String::from("café")))
            .header(ContentTransferEncoding::SevenBit)
            .body(String::from("hi"));

        let mut out = Vec::new();
        MimeWriter::new(&mut out)
            .word_scheme(WordScheme::Q)
            .write_single(&part)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Subject: =?utf-8?Q?caf=C3=A9?=\r\nContent-Transfer-Encoding: 7bit\r\n\r\nhi"
        );
    }

    #[test]
    fn pending_typed_headers_are_written() {
        let mut part = SinglePart::plain("x");
        part.headers_mut().set_content_type(ContentType::TEXT_HTML);
        assert!(part.entity_headers().is_dirty());

        let formatted = String::from_utf8(part.formatted()).unwrap();
        assert!(formatted.starts_with("Content-Type: text/html; charset=utf-8\r\n"));
    }

    #[test]
    fn write_errors_propagate() {
        let part = SinglePart::plain("x".repeat(100));
        let mut writer = MimeWriter::new(Limited {
            written: 0,
            limit: 40,
        });
        assert!(writer.write_single(&part).is_err());
    }
}
