//! Headers widely used in email messages

use std::{
    borrow::Cow,
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    ops::Deref,
};

pub use self::{
    content::*, content_disposition::*, content_type::*, date::*, entity::*, mailbox::*,
    special::*, textual::*,
};
pub(crate) use self::writer::write_header;
use crate::{
    encoder::{LineBuffer, WordScheme},
    BoxError,
};

mod content;
mod content_disposition;
mod content_type;
mod date;
mod entity;
mod mailbox;
mod special;
mod textual;
mod writer;

/// A typed header
///
/// `parse` receives the raw, unfolded value and `display` gives it back.
/// Encoding of non-ASCII text and folding only happen when the header is
/// written out.
pub trait Header: Clone {
    fn name() -> HeaderName;

    fn parse(s: &str) -> Result<Self, BoxError>;

    fn display(&self) -> String;
}

/// An ordered set of headers
///
/// Lookups ignore the case of the name. A name may appear several times:
/// [`Headers::insert_raw`] appends another occurrence while
/// [`Headers::set_raw`] replaces them all.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: Vec<(HeaderName, String)>,
}

impl Headers {
    #[inline]
    pub const fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            headers: Vec::with_capacity(capacity),
        }
    }

    /// Parses the first occurrence of `H`
    pub fn get<H: Header>(&self) -> Option<H> {
        self.get_raw(&H::name()).and_then(|raw| H::parse(raw).ok())
    }

    /// Sets `H`, replacing any previous occurrence
    pub fn set<H: Header>(&mut self, header: H) {
        self.set_raw(H::name(), header.display());
    }

    /// Removes every occurrence of `H`, returning the first one
    pub fn remove<H: Header>(&mut self) -> Option<H> {
        self.remove_raw(&H::name())
            .and_then(|raw| H::parse(&raw).ok())
    }

    pub fn has<H: Header>(&self) -> bool {
        self.has_raw(&H::name())
    }

    pub fn has_raw(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Raw value of the first occurrence of `name`
    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Raw values of every occurrence of `name`, in insertion order
    pub fn get_all_raw<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Appends an occurrence of `name`, keeping the existing ones
    pub fn insert_raw(&mut self, name: HeaderName, value: String) {
        self.headers.push((name, value));
    }

    /// Replaces the first occurrence of `name` in place and drops the others,
    /// or appends it
    pub fn set_raw(&mut self, name: HeaderName, value: String) {
        let mut value = Some(value);
        self.headers.retain_mut(|(n, v)| {
            if !n.eq_ignore_ascii_case(&name) {
                return true;
            }
            match value.take() {
                Some(new) => {
                    *v = new;
                    true
                }
                None => false,
            }
        });
        if let Some(value) = value {
            self.headers.push((name, value));
        }
    }

    /// Removes every occurrence of `name`, returning the first value
    pub fn remove_raw(&mut self, name: &str) -> Option<String> {
        let mut first = None;
        self.headers.retain_mut(|(n, v)| {
            if !n.eq_ignore_ascii_case(name) {
                return true;
            }
            if first.is_none() {
                first = Some(std::mem::take(v));
            }
            false
        });
        first
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &str)> {
        self.headers.iter().map(|(name, value)| (name, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.headers.clear();
    }

    /// Appends all headers, folded and encoded, to `out`
    pub fn write_to(&self, out: &mut LineBuffer, scheme: WordScheme) {
        for (name, value) in &self.headers {
            match mailbox::encode_raw_addresses(name, value) {
                Some(encoded) => write_header(out, name, &encoded, scheme),
                None => write_header(out, name, value, scheme),
            }
        }
    }
}

impl Display for Headers {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut out = LineBuffer::new();
        self.write_to(&mut out, WordScheme::Base64);
        f.write_str(&String::from_utf8_lossy(out.as_bytes()))
    }
}

/// A header name
///
/// Printable ASCII without `:` nor whitespace, at most 76 characters.
#[derive(Debug, Clone)]
pub struct HeaderName(Cow<'static, str>);

impl HeaderName {
    const fn is_valid(bytes: &[u8]) -> bool {
        if bytes.is_empty() || bytes.len() > 76 {
            return false;
        }
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            if b <= b' ' || b >= 0x7F || b == b':' {
                return false;
            }
            i += 1;
        }
        true
    }

    pub fn new_from_ascii(ascii: String) -> Result<Self, InvalidHeaderName> {
        if Self::is_valid(ascii.as_bytes()) {
            Ok(Self(Cow::Owned(ascii)))
        } else {
            Err(InvalidHeaderName)
        }
    }

    /// Checked at compile time when used in a const context
    pub const fn new_from_ascii_str(ascii: &'static str) -> Self {
        assert!(Self::is_valid(ascii.as_bytes()), "invalid header name");
        Self(Cow::Borrowed(ascii))
    }
}

impl Display for HeaderName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self)
    }
}

impl Deref for HeaderName {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for HeaderName {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq for HeaderName {
    fn eq(&self, other: &HeaderName) -> bool {
        self.eq_ignore_ascii_case(other)
    }
}

impl PartialEq<&str> for HeaderName {
    fn eq(&self, other: &&str) -> bool {
        self.eq_ignore_ascii_case(other)
    }
}

/// A header name with forbidden characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidHeaderName;

impl Display for InvalidHeaderName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("invalid header name")
    }
}

impl StdError for InvalidHeaderName {}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn name(s: &'static str) -> HeaderName {
        HeaderName::new_from_ascii_str(s)
    }

    #[test]
    fn header_names() {
        assert_eq!(HeaderName::new_from_ascii("X-Duck".into()).unwrap(), "X-Duck");
        assert!(HeaderName::new_from_ascii("From:".into()).is_err());
        assert!(HeaderName::new_from_ascii("Date ".into()).is_err());
        assert!(HeaderName::new_from_ascii("✉️".into()).is_err());
        assert!(HeaderName::new_from_ascii(String::new()).is_err());
    }

    #[test]
    #[should_panic]
    fn invalid_static_name() {
        let _ = name("From:");
    }

    #[test]
    fn case_insensitive_lookup() {
        let mut headers = Headers::new();
        headers.insert_raw(name("X-Receiver"), "a@example.com".into());
        assert_eq!(headers.get_raw("x-receiver"), Some("a@example.com"));
        assert!(headers.has_raw("X-RECEIVER"));
    }

    #[test]
    fn raw_value_outlives_the_name() {
        let mut headers = Headers::new();
        headers.insert_raw(name("X-Receiver"), "a@example.com".into());
        let value = {
            let lookup = String::from("x-receiver");
            headers.get_raw(&lookup)
        };
        assert_eq!(value, Some("a@example.com"));
    }

    #[test]
    fn multi_valued_keep_order() {
        let mut headers = Headers::new();
        headers.insert_raw(name("X-Receiver"), "a@example.com".into());
        headers.insert_raw(name("Subject"), "hi".into());
        headers.insert_raw(name("x-receiver"), "b@example.com".into());

        let all: Vec<&str> = headers.get_all_raw("X-Receiver").collect();
        assert_eq!(all, ["a@example.com", "b@example.com"]);
        assert_eq!(
            headers.to_string(),
            "X-Receiver: a@example.com\r\nSubject: hi\r\nx-receiver: b@example.com\r\n"
        );
    }

    #[test]
    fn set_replaces_in_place() {
        let mut headers = Headers::new();
        headers.insert_raw(name("A"), "1".into());
        headers.insert_raw(name("B"), "2".into());
        headers.insert_raw(name("A"), "3".into());
        headers.set_raw(name("a"), "4".into());
        assert_eq!(headers.to_string(), "A: 4\r\nB: 2\r\n");
        headers.set_raw(name("C"), "5".into());
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn remove_all_occurrences() {
        let mut headers = Headers::new();
        headers.insert_raw(name("A"), "1".into());
        headers.insert_raw(name("A"), "2".into());
        assert_eq!(headers.remove_raw("a"), Some("1".into()));
        assert!(headers.is_empty());
        assert_eq!(headers.remove_raw("a"), None);
    }
}
