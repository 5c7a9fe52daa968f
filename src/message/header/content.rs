use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use super::{Header, HeaderName};
use crate::{
    encoder::{Base64Codec, Codec, EightBitCodec, QuotedPrintableCodec},
    BoxError,
};

/// `Content-Transfer-Encoding` of an entity
///
/// Defined in [RFC2045](https://tools.ietf.org/html/rfc2045#section-6).
/// The message builder chooses the most compact encoding for each body, so
/// this rarely needs to be set by hand.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ContentTransferEncoding {
    SevenBit,
    QuotedPrintable,
    #[default]
    Base64,
    /// Requires the `8BITMIME` extension
    EightBit,
    Binary,
}

impl ContentTransferEncoding {
    /// Codec turning raw content into this encoding
    pub fn codec(self) -> Codec {
        match self {
            Self::QuotedPrintable => Codec::QuotedPrintable(QuotedPrintableCodec::new()),
            Self::Base64 => Codec::Base64(Base64Codec::new()),
            Self::SevenBit | Self::EightBit | Self::Binary => Codec::EightBit(EightBitCodec::new()),
        }
    }
}

impl Display for ContentTransferEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Self::SevenBit => "7bit",
            Self::QuotedPrintable => "quoted-printable",
            Self::Base64 => "base64",
            Self::EightBit => "8bit",
            Self::Binary => "binary",
        })
    }
}

impl FromStr for ContentTransferEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7bit" => Ok(Self::SevenBit),
            "quoted-printable" => Ok(Self::QuotedPrintable),
            "base64" => Ok(Self::Base64),
            "8bit" => Ok(Self::EightBit),
            "binary" => Ok(Self::Binary),
            _ => Err(s.into()),
        }
    }
}

impl Header for ContentTransferEncoding {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("Content-Transfer-Encoding")
    }

    fn parse(s: &str) -> Result<Self, BoxError> {
        Ok(s.parse()?)
    }

    fn display(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::message::header::Headers;

    #[test]
    fn format_content_transfer_encoding() {
        let mut headers = Headers::new();
        headers.set(ContentTransferEncoding::SevenBit);
        assert_eq!(headers.to_string(), "Content-Transfer-Encoding: 7bit\r\n");
        headers.set(ContentTransferEncoding::Base64);
        assert_eq!(headers.to_string(), "Content-Transfer-Encoding: base64\r\n");
    }

    #[test]
    fn parse_content_transfer_encoding() {
        let mut headers = Headers::new();
        headers.set_raw(ContentTransferEncoding::name(), "Quoted-Printable".into());
        assert_eq!(
            headers.get::<ContentTransferEncoding>(),
            Some(ContentTransferEncoding::QuotedPrintable)
        );
        headers.set_raw(ContentTransferEncoding::name(), "x-uuencode".into());
        assert_eq!(headers.get::<ContentTransferEncoding>(), None);
    }

    #[test]
    fn codec_selection() {
        assert!(matches!(ContentTransferEncoding::Base64.codec(), Codec::Base64(_)));
        assert!(matches!(
            ContentTransferEncoding::QuotedPrintable.codec(),
            Codec::QuotedPrintable(_)
        ));
        assert!(matches!(ContentTransferEncoding::Binary.codec(), Codec::EightBit(_)));
    }
}
