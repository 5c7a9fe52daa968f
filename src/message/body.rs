use std::ops::Deref;

use crate::message::header::ContentTransferEncoding;

/// Lines of `7bit` content longer than this are sent quoted-printable
const SEVEN_BIT_LINE_LEN: usize = 76;
/// Hard limit of [RFC5321](https://tools.ietf.org/html/rfc5321#section-4.5.3.1.6), CRLF excluded
const EIGHT_BIT_LINE_LEN: usize = 998;

/// Raw content of a [`SinglePart`](super::SinglePart) and the transfer
/// encoding it will be written with
///
/// The content is kept unencoded: it is pushed through the matching codec
/// while the message is written, so a part can be written several times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    buf: Vec<u8>,
    encoding: ContentTransferEncoding,
}

/// Either a `Vec<u8>` or a `String`
///
/// Text should be passed as a `String`: its line endings are normalized to
/// CRLF and it can use the readable `7bit` and `quoted-printable` encodings,
/// while binary content always goes as `base64`.
#[derive(Debug, Clone)]
pub enum MaybeString {
    Binary(Vec<u8>),
    String(String),
}

impl Body {
    /// Picks the most compact of `7bit`, `quoted-printable` and `base64` for `buf`
    pub fn new<B: Into<MaybeString>>(buf: B) -> Self {
        let mut buf: MaybeString = buf.into();
        buf.normalize_crlf();
        let encoding = buf.encoding(false);
        Self {
            buf: buf.into(),
            encoding,
        }
    }

    /// Uses `encoding`, failing with the content when it can't represent it
    ///
    /// `7bit` needs short ASCII lines, `8bit` allows UTF-8 and lines up to
    /// 998 bytes. The other encodings accept anything.
    pub fn new_with_encoding<B: Into<MaybeString>>(
        buf: B,
        encoding: ContentTransferEncoding,
    ) -> Result<Self, Vec<u8>> {
        let mut buf: MaybeString = buf.into();
        buf.normalize_crlf();

        let best = buf.encoding(true);
        let ok = match encoding {
            ContentTransferEncoding::SevenBit => best == ContentTransferEncoding::SevenBit,
            ContentTransferEncoding::EightBit => matches!(
                best,
                ContentTransferEncoding::SevenBit | ContentTransferEncoding::EightBit
            ),
            ContentTransferEncoding::QuotedPrintable
            | ContentTransferEncoding::Base64
            | ContentTransferEncoding::Binary => true,
        };
        if !ok {
            return Err(buf.into());
        }
        Ok(Self {
            buf: buf.into(),
            encoding,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn encoding(&self) -> ContentTransferEncoding {
        self.encoding
    }

    /// Unencoded content
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    /// Whether sending this body needs the `8BITMIME` extension
    pub fn is_eight_bit(&self) -> bool {
        matches!(
            self.encoding,
            ContentTransferEncoding::EightBit | ContentTransferEncoding::Binary
        )
    }
}

impl MaybeString {
    /// Suggests a `Content-Transfer-Encoding`, never `binary`
    fn encoding(&self, supports_utf8: bool) -> ContentTransferEncoding {
        match self {
            Self::Binary(_) => ContentTransferEncoding::Base64,
            Self::String(s) => {
                let longest_line = s.split("\r\n").map(str::len).max().unwrap_or(0);
                let clean = !s.bytes().any(|b| b == 0) && !has_bare_line_break(s.as_bytes());
                if clean && s.is_ascii() && longest_line <= SEVEN_BIT_LINE_LEN {
                    ContentTransferEncoding::SevenBit
                } else if clean && supports_utf8 && longest_line <= EIGHT_BIT_LINE_LEN {
                    ContentTransferEncoding::EightBit
                } else if quoted_printable_is_smaller(s.as_bytes()) {
                    ContentTransferEncoding::QuotedPrintable
                } else {
                    ContentTransferEncoding::Base64
                }
            }
        }
    }

    fn normalize_crlf(&mut self) {
        if let Self::String(s) = self {
            if has_bare_line_break(s.as_bytes()) {
                *s = s.replace("\r\n", "\n").replace('\r', "\n").replace('\n', "\r\n");
            }
        }
    }
}

fn has_bare_line_break(buf: &[u8]) -> bool {
    buf.iter().enumerate().any(|(i, &b)| match b {
        b'\n' => i == 0 || buf[i - 1] != b'\r',
        b'\r' => buf.get(i + 1) != Some(&b'\n'),
        _ => false,
    })
}

/// Compares the approximate output sizes of both encodings
fn quoted_printable_is_smaller(buf: &[u8]) -> bool {
    let escaped = buf
        .iter()
        .filter(|&&b| b == b'=' || (b < 0x20 && b != b'\t' && b != b'\r' && b != b'\n') || b >= 0x7F)
        .count();
    let qp = buf.len() + escaped * 2;
    let base64 = buf.len().div_ceil(3) * 4;
    qp <= base64
}

/// Something that can become a [`Body`]
///
/// With `encoding` set to `None` the encoding is picked automatically.
/// Pre-built bodies ignore `encoding`.
pub trait IntoBody {
    fn into_body(self, encoding: Option<ContentTransferEncoding>) -> Body;
}

impl<T> IntoBody for T
where
    T: Into<MaybeString>,
{
    /// A requested encoding that can't represent the content falls back to
    /// the automatic choice
    fn into_body(self, encoding: Option<ContentTransferEncoding>) -> Body {
        match encoding {
            Some(encoding) => Body::new_with_encoding(self, encoding)
                .unwrap_or_else(|buf| Body::new(MaybeString::from_vec(buf))),
            None => Body::new(self),
        }
    }
}

impl IntoBody for Body {
    fn into_body(self, _encoding: Option<ContentTransferEncoding>) -> Body {
        self
    }
}

impl MaybeString {
    /// Keeps text as text
    fn from_vec(buf: Vec<u8>) -> Self {
        match String::from_utf8(buf) {
            Ok(s) => Self::String(s),
            Err(e) => Self::Binary(e.into_bytes()),
        }
    }
}

impl AsRef<[u8]> for Body {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

impl From<Vec<u8>> for MaybeString {
    #[inline]
    fn from(b: Vec<u8>) -> Self {
        Self::Binary(b)
    }
}

impl From<String> for MaybeString {
    #[inline]
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for MaybeString {
    #[inline]
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<MaybeString> for Vec<u8> {
    #[inline]
    fn from(s: MaybeString) -> Self {
        match s {
            MaybeString::Binary(b) => b,
            MaybeString::String(s) => s.into(),
        }
    }
}

impl Deref for MaybeString {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        match self {
            Self::Binary(b) => b,
            Self::String(s) => s.as_bytes(),
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn seven_bit_detect() {
        let body = Body::new(String::from("Hello, world!"));
        assert_eq!(body.encoding(), ContentTransferEncoding::SevenBit);
        assert_eq!(body.as_bytes(), b"Hello, world!");
    }

    #[test]
    fn long_lines_go_quoted_printable() {
        let body = Body::new("Hello, world!".repeat(100));
        assert_eq!(body.encoding(), ContentTransferEncoding::QuotedPrintable);
    }

    #[test]
    fn mostly_non_ascii_goes_base64() {
        let body = Body::new(String::from("Привет, мир!"));
        assert_eq!(body.encoding(), ContentTransferEncoding::Base64);
        let body = Body::new(String::from("Hello, wörld!"));
        assert_eq!(body.encoding(), ContentTransferEncoding::QuotedPrintable);
    }

    #[test]
    fn binary_goes_base64() {
        let body = Body::new(vec![b'a'; 10]);
        assert_eq!(body.encoding(), ContentTransferEncoding::Base64);
    }

    #[test]
    fn line_endings_normalized() {
        let body = Body::new(String::from("one\ntwo\r\nthree\rfour\n"));
        assert_eq!(body.as_bytes(), b"one\r\ntwo\r\nthree\r\nfour\r\n");
        let binary = Body::new(b"one\ntwo".to_vec());
        assert_eq!(binary.as_bytes(), b"one\ntwo");
    }

    #[test]
    fn explicit_encoding_checked() {
        assert!(Body::new_with_encoding("Привет", ContentTransferEncoding::SevenBit).is_err());
        let body = Body::new_with_encoding("Привет", ContentTransferEncoding::EightBit).unwrap();
        assert!(body.is_eight_bit());
        assert!(Body::new_with_encoding("x".repeat(1200), ContentTransferEncoding::EightBit).is_err());
        assert!(Body::new_with_encoding(vec![0, 1, 2], ContentTransferEncoding::Base64).is_ok());
    }

    #[test]
    fn fallback_when_requested_encoding_is_invalid() {
        let body = "Привет".into_body(Some(ContentTransferEncoding::SevenBit));
        assert_eq!(body.encoding(), ContentTransferEncoding::Base64);
    }
}
