use std::{
    error::Error as StdError,
    fmt::{self, Display},
    str::FromStr,
};

use mime::Mime;

use super::{Header, HeaderName};
use crate::BoxError;

/// `Content-Type` of an entity
///
/// Defined in [RFC2045](https://tools.ietf.org/html/rfc2045#section-5)
#[derive(Debug, Clone, PartialEq)]
pub struct ContentType(Mime);

impl ContentType {
    /// `text/plain; charset=utf-8`
    pub const TEXT_PLAIN: ContentType = Self::from_mime(mime::TEXT_PLAIN_UTF_8);

    /// `text/html; charset=utf-8`
    pub const TEXT_HTML: ContentType = Self::from_mime(mime::TEXT_HTML_UTF_8);

    pub fn parse(s: &str) -> Result<ContentType, ContentTypeErr> {
        s.parse().map(Self).map_err(ContentTypeErr)
    }

    pub(crate) const fn from_mime(mime: Mime) -> Self {
        Self(mime)
    }

    pub fn mime(&self) -> &Mime {
        &self.0
    }

    /// Whether this is a `multipart/*` type
    pub fn is_multipart(&self) -> bool {
        self.0.type_() == mime::MULTIPART
    }

    pub fn boundary(&self) -> Option<&str> {
        self.0.get_param(mime::BOUNDARY).map(|b| b.as_str())
    }

    pub fn charset(&self) -> Option<&str> {
        self.0.get_param(mime::CHARSET).map(|c| c.as_str())
    }
}

impl Header for ContentType {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("Content-Type")
    }

    fn parse(s: &str) -> Result<Self, BoxError> {
        Ok(Self::parse(s)?)
    }

    fn display(&self) -> String {
        self.0.to_string()
    }
}

impl FromStr for ContentType {
    type Err = ContentTypeErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Mime> for ContentType {
    fn from(mime: Mime) -> Self {
        Self(mime)
    }
}

/// An error occurred while parsing a [`ContentType`]
#[derive(Debug)]
pub struct ContentTypeErr(mime::FromStrError);

impl StdError for ContentTypeErr {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.0)
    }
}

impl Display for ContentTypeErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
